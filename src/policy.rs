//! Policy evaluation: a pure decision over a permission snapshot and
//! ownership facts resolved by the caller.

use tracing::trace;

use crate::error::{BanError, Result};
use crate::model::PlayerId;
use crate::ownership::Ownership;
use crate::permission::{PermissionKey, PermissionSet, Qualifier};

/// What an operation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any authenticated caller
    LoggedIn,
    /// One exact permission. A non-`any` qualifier also needs its ownership fact.
    Exact(PermissionKey),
    /// `base.any`, else `base.own`, `base.assigned`, `base.reported`;
    /// each variant alone is sufficient.
    Variants { resource: String, base: String },
}

impl Requirement {
    pub fn exact(resource: &str, permission: &str) -> Requirement {
        Requirement::Exact(PermissionKey::parse(resource, permission))
    }

    pub fn variants(resource: &str, base: &str) -> Requirement {
        Requirement::Variants { resource: resource.to_string(), base: base.to_string() }
    }
}

/// Internal reason for a denial. Only ever logged; callers see one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotLoggedIn,
    Permission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(_) => Err(BanError::Denied),
        }
    }
}

fn granted(perms: &PermissionSet, key: &PermissionKey, ownership: Option<&Ownership>) -> bool {
    if !perms.has_key(key) {
        return false;
    }
    match key.qualifier {
        None | Some(Qualifier::Any) => true,
        Some(q) => ownership.is_some_and(|o| o.satisfies(q)),
    }
}

/// `authorize(account, resource, permission, scope)`.
///
/// `perms` is the caller's snapshot for the target server; `ownership`
/// is present when the record is already loaded.
pub fn authorize(
    perms: &PermissionSet,
    caller: Option<&PlayerId>,
    req: &Requirement,
    ownership: Option<&Ownership>,
) -> Decision {
    let decision = match req {
        Requirement::LoggedIn => match caller {
            Some(_) => Decision::Allow,
            None => Decision::Deny(DenyReason::NotLoggedIn),
        },
        Requirement::Exact(key) => {
            if granted(perms, key, ownership) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::Permission)
            }
        }
        Requirement::Variants { resource, base } => {
            let hit = Qualifier::ALL
                .into_iter()
                .map(|q| PermissionKey::new(resource, base, Some(q)))
                .find(|key| granted(perms, key, ownership));
            match hit {
                Some(_) => Decision::Allow,
                None => Decision::Deny(DenyReason::Permission),
            }
        }
    };
    trace!(?caller, ?req, ?decision, "authorize");
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn perms(grants: &[&str]) -> PermissionSet {
        let mut s = PermissionSet::new();
        for g in grants {
            s.allow("player.reports", g);
        }
        s
    }

    #[test]
    fn any_ignores_ownership() {
        let req = Requirement::variants("player.reports", "update.assign");
        let p = perms(&["update.assign.any"]);
        assert!(authorize(&p, None, &req, None).is_allowed());
        assert!(authorize(&p, None, &req, Some(&Ownership::default())).is_allowed());
    }

    #[test]
    fn qualified_needs_fact() {
        let req = Requirement::variants("player.reports", "update.assign");
        let p = perms(&["update.assign.own"]);
        let me = Uuid::new_v4();
        let own = Ownership { is_own: true, is_actor: true, ..Default::default() };
        assert!(authorize(&p, Some(&me), &req, Some(&own)).is_allowed());
        assert_eq!(
            authorize(&p, Some(&me), &req, Some(&Ownership { is_assigned: true, ..Default::default() })),
            Decision::Deny(DenyReason::Permission)
        );
        assert!(!authorize(&p, Some(&me), &req, None).is_allowed());
    }

    #[test]
    fn qualifiers_are_or() {
        let req = Requirement::variants("player.reports", "update.assign");
        let p = perms(&["update.assign.own", "update.assign.assigned"]);
        let assigned = Ownership { is_assigned: true, ..Default::default() };
        assert!(authorize(&p, None, &req, Some(&assigned)).is_allowed());
    }

    #[test]
    fn exact_unqualified() {
        let mut p = PermissionSet::new();
        p.allow("servers", "manage");
        assert!(authorize(&p, None, &Requirement::exact("servers", "manage"), None).is_allowed());
        assert!(!authorize(&p, None, &Requirement::exact("player.bans", "view"), None).is_allowed());
    }

    #[test]
    fn logged_in() {
        let p = PermissionSet::new();
        assert_eq!(authorize(&p, None, &Requirement::LoggedIn, None), Decision::Deny(DenyReason::NotLoggedIn));
        assert!(authorize(&p, Some(&Uuid::new_v4()), &Requirement::LoggedIn, None).is_allowed());
        assert_eq!(Decision::Deny(DenyReason::NotLoggedIn).into_result().unwrap_err().to_string(),
            crate::constants::DENIED_MESSAGE);
    }
}
