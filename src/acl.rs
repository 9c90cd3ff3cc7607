//! ACL projections attached to records so clients know which actions to offer.
//!
//! Each field is one call to the policy evaluator with the record's
//! ownership facts. Callers pass a snapshot fetched once per request, so
//! projecting a whole list never re-resolves role inheritance.

use serde::Serialize;

use crate::constants::PLAYER_REPORTS;
use crate::model::{PlayerId, RecordType, Report, ReportComment};
use crate::ownership::{resolve_ownership, Owned, Ownership};
use crate::permission::{PermissionSet, Qualifier};
use crate::policy::{authorize, Requirement};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityAcl {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    pub actor: bool,
    pub yours: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerReportAcl {
    pub state: bool,
    pub comment: bool,
    pub assign: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityTypeAcl {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerServerAcl {
    pub bans: EntityTypeAcl,
    pub kicks: EntityTypeAcl,
    pub mutes: EntityTypeAcl,
    pub notes: EntityTypeAcl,
    pub warnings: EntityTypeAcl,
}

fn facts<E: Owned>(entity: &E, caller: Option<&PlayerId>) -> Option<Ownership> {
    caller.map(|c| resolve_ownership(entity, c))
}

fn allowed(perms: &PermissionSet, caller: Option<&PlayerId>, req: Requirement, o: Option<&Ownership>) -> bool {
    authorize(perms, caller, &req, o).is_allowed()
}

/// ACL of a ban, kick, mute, note or warning
pub fn entity_acl<E: Owned>(perms: &PermissionSet, caller: Option<&PlayerId>, resource: &str, entity: &E) -> EntityAcl {
    let o = facts(entity, caller);
    EntityAcl {
        create: allowed(perms, caller, Requirement::exact(resource, "create"), o.as_ref()),
        update: allowed(perms, caller, Requirement::variants(resource, "update"), o.as_ref()),
        delete: allowed(perms, caller, Requirement::variants(resource, "delete"), o.as_ref()),
        actor: o.is_some_and(|o| o.is_actor),
        yours: o.is_some_and(|o| o.is_reported),
    }
}

/// ACL of a report comment. Comments are never edited, only deleted.
pub fn comment_acl(perms: &PermissionSet, caller: Option<&PlayerId>, comment: &ReportComment) -> EntityAcl {
    let o = facts(comment, caller);
    EntityAcl {
        create: false,
        update: false,
        delete: allowed(perms, caller, Requirement::variants(PLAYER_REPORTS, "delete.comment"), o.as_ref()),
        actor: o.is_some_and(|o| o.is_actor),
        yours: o.is_some_and(|o| o.is_actor),
    }
}

pub fn report_acl(perms: &PermissionSet, caller: Option<&PlayerId>, report: &Report) -> PlayerReportAcl {
    let o = facts(report, caller);
    let can = |base: &str| allowed(perms, caller, Requirement::variants(PLAYER_REPORTS, base), o.as_ref());
    PlayerReportAcl {
        state: can("update.state"),
        comment: can("comment"),
        assign: can("update.assign"),
        delete: can("delete"),
    }
}

/// Whether any qualified variant of `base` is granted, ignoring ownership
fn any_variant(perms: &PermissionSet, resource: &str, base: &str) -> bool {
    Qualifier::ALL.into_iter().any(|q| perms.has(resource, &format!("{}.{}", base, q.as_str())))
}

pub fn entity_type_acl(perms: &PermissionSet, kind: RecordType) -> EntityTypeAcl {
    let resource = kind.resource();
    EntityTypeAcl {
        create: perms.has(resource, "create"),
        update: any_variant(perms, resource, "update"),
        delete: any_variant(perms, resource, "delete"),
    }
}

/// What the viewer may do with each record type on one server
pub fn player_server_acl(perms: &PermissionSet) -> PlayerServerAcl {
    PlayerServerAcl {
        bans: entity_type_acl(perms, RecordType::PlayerBan),
        kicks: entity_type_acl(perms, RecordType::PlayerKick),
        mutes: entity_type_acl(perms, RecordType::PlayerMute),
        notes: entity_type_acl(perms, RecordType::PlayerNote),
        warnings: entity_type_acl(perms, RecordType::PlayerWarning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PLAYER_BANS;
    use crate::model::Punishment;
    use uuid::Uuid;

    fn ban(actor: PlayerId, player: PlayerId) -> Punishment {
        Punishment {
            id: 1,
            kind: RecordType::PlayerBan,
            server: "1".into(),
            player,
            actor,
            reason: "grief".into(),
            created: 0,
            updated: 0,
            expires: 0,
            soft: false,
            points: 0.0,
        }
    }

    #[test]
    fn own_update_only_on_own_records() {
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        let mut p = PermissionSet::new();
        p.allow(PLAYER_BANS, "update.own");

        let mine = entity_acl(&p, Some(&me), PLAYER_BANS, &ban(me, other));
        assert!(mine.update && mine.actor && !mine.delete && !mine.yours);

        let theirs = entity_acl(&p, Some(&me), PLAYER_BANS, &ban(other, me));
        assert!(!theirs.update && !theirs.actor && theirs.yours);
    }

    #[test]
    fn projection_is_idempotent() {
        let me = Uuid::new_v4();
        let mut p = PermissionSet::new();
        p.allow(PLAYER_BANS, "delete.any");
        let b = ban(Uuid::new_v4(), me);
        assert_eq!(entity_acl(&p, Some(&me), PLAYER_BANS, &b), entity_acl(&p, Some(&me), PLAYER_BANS, &b));
    }

    #[test]
    fn type_acl() {
        let mut p = PermissionSet::new();
        p.allow(PLAYER_BANS, "create");
        p.allow(PLAYER_BANS, "update.own");
        let acl = player_server_acl(&p);
        assert_eq!(acl.bans, EntityTypeAcl { create: true, update: true, delete: false });
        assert_eq!(acl.mutes, EntityTypeAcl::default());
    }
}
