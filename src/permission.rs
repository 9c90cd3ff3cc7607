//! Structured permission keys and effective permission sets

use std::collections::HashSet;
use std::fmt;

/// Ownership scope appended to a base permission name.
///
/// The declaration order is the evaluation order: `Any` first, then the
/// ownership-qualified variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    Any,
    Own,
    Assigned,
    Reported,
}

impl Qualifier {
    pub const ALL: [Qualifier; 4] = [Qualifier::Any, Qualifier::Own, Qualifier::Assigned, Qualifier::Reported];

    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Any => "any",
            Qualifier::Own => "own",
            Qualifier::Assigned => "assigned",
            Qualifier::Reported => "reported",
        }
    }

    pub fn parse(s: &str) -> Option<Qualifier> {
        Qualifier::ALL.into_iter().find(|q| q.as_str() == s)
    }
}

/// `resource` + `base` + optional qualifier, e.g.
/// `player.reports` / `update.assign` / `own`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionKey {
    pub resource: String,
    pub base: String,
    pub qualifier: Option<Qualifier>,
}

impl PermissionKey {
    /// Split a permission name on its last segment if that segment is a
    /// qualifier. `view.comments` stays unqualified.
    pub fn parse(resource: &str, permission: &str) -> PermissionKey {
        let (base, qualifier) = match permission.rsplit_once('.') {
            Some((base, last)) => match Qualifier::parse(last) {
                Some(q) => (base, Some(q)),
                None => (permission, None),
            },
            None => (permission, None),
        };
        PermissionKey { resource: resource.to_string(), base: base.to_string(), qualifier }
    }

    pub fn new(resource: &str, base: &str, qualifier: Option<Qualifier>) -> PermissionKey {
        PermissionKey { resource: resource.to_string(), base: base.to_string(), qualifier }
    }

    /// Permission name as stored in role grants
    pub fn permission(&self) -> String {
        match self.qualifier {
            Some(q) => format!("{}.{}", self.base, q.as_str()),
            None => self.base.clone(),
        }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.permission())
    }
}

/// Allowed (resource, permission) pairs after inheritance and role union.
/// Anything not present is denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    allowed: HashSet<(String, String)>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&mut self, resource: &str, permission: &str) {
        self.allowed.insert((resource.to_string(), permission.to_string()));
    }

    pub fn extend(&mut self, other: &PermissionSet) {
        self.allowed.extend(other.allowed.iter().cloned());
    }

    pub fn has(&self, resource: &str, permission: &str) -> bool {
        self.allowed.contains(&(resource.to_string(), permission.to_string()))
    }

    pub fn has_key(&self, key: &PermissionKey) -> bool {
        self.has(&key.resource, &key.permission())
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
