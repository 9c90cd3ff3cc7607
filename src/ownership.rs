//! Ownership facts for row-level permission qualifiers

use crate::model::{PlayerId, Punishment, Report, ReportComment};
use crate::permission::Qualifier;

/// Relationship fields of a protected record
pub trait Owned {
    fn actor(&self) -> PlayerId;
    fn player(&self) -> PlayerId;
    fn assignee(&self) -> Option<PlayerId> {
        None
    }
}

impl Owned for Punishment {
    fn actor(&self) -> PlayerId {
        self.actor
    }
    fn player(&self) -> PlayerId {
        self.player
    }
}

impl Owned for Report {
    fn actor(&self) -> PlayerId {
        self.actor
    }
    fn player(&self) -> PlayerId {
        self.player
    }
    fn assignee(&self) -> Option<PlayerId> {
        self.assignee
    }
}

/// Comments have no subject; their author stands in for both fields.
impl Owned for ReportComment {
    fn actor(&self) -> PlayerId {
        self.actor
    }
    fn player(&self) -> PlayerId {
        self.actor
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ownership {
    pub is_own: bool,
    pub is_assigned: bool,
    pub is_reported: bool,
    pub is_actor: bool,
}

impl Ownership {
    /// Whether the fact behind a qualifier holds. `Any` needs no fact.
    pub fn satisfies(&self, q: Qualifier) -> bool {
        match q {
            Qualifier::Any => true,
            Qualifier::Own => self.is_own,
            Qualifier::Assigned => self.is_assigned,
            Qualifier::Reported => self.is_reported,
        }
    }
}

/// Compare `account` against an already-loaded record. No lookups.
pub fn resolve_ownership<E: Owned + ?Sized>(entity: &E, account: &PlayerId) -> Ownership {
    let is_actor = entity.actor() == *account;
    Ownership {
        is_own: is_actor,
        is_assigned: entity.assignee().as_ref() == Some(account),
        is_reported: entity.player() == *account,
        is_actor,
    }
}
