//! Bootstrap and built-in roles

use tracing::info;

use crate::constants::*;
use crate::db::Store;
use crate::error::{err, BanError, Result};
use crate::model::{PlayerId, Role};
use crate::resources::resources;

/// Check if the built-in roles have been created
pub fn is_bootstrapped(store: &Store) -> Result<bool> {
    store.read(|d, tx| Ok(d.meta.get(tx, "boot").map_err(err)?.is_some()))
}

/// Guest: what anyone may see. Logged In extends Guest; Admin extends Logged In
/// and holds every registered permission.
pub fn default_roles() -> Vec<Role> {
    let guest = Role { id: ROLE_GUEST, name: "Guest".into(), parent: None, ..Default::default() }
        .grant(PLAYER_BANS, "view", true)
        .grant(PLAYER_KICKS, "view", true)
        .grant(PLAYER_MUTES, "view", true)
        .grant(PLAYER_WARNINGS, "view", true);

    let logged_in = Role { id: ROLE_LOGGED_IN, name: "Logged In".into(), parent: Some(ROLE_GUEST), ..Default::default() }
        .grant(PLAYER_REPORTS, "view.reported", true)
        .grant(PLAYER_REPORTS, "view.own", true)
        .grant(PLAYER_REPORTS, "comment.own", true)
        .grant(PLAYER_REPORTS, "delete.comment.own", true);

    let mut admin = Role { id: ROLE_ADMIN, name: "Admin".into(), parent: Some(ROLE_LOGGED_IN), ..Default::default() };
    for r in resources() {
        for p in r.permissions {
            admin = admin.grant(r.name, p, true);
        }
    }

    vec![guest, logged_in, admin]
}

/// Create the built-in roles, optionally making `root` an admin.
pub fn bootstrap(store: &Store, root: Option<&PlayerId>) -> Result<()> {
    if is_bootstrapped(store)? {
        return Err(BanError::Invalid("Already bootstrapped".into()));
    }
    store.transact(|tx| {
        for role in default_roles() {
            tx.put_role(&role)?;
        }
        tx.set_next_id("role", ROLE_ADMIN + 1)?;
        if let Some(root) = root {
            tx.assign_role(root, ROLE_ADMIN)?;
        }
        tx.put_meta("boot", "1")
    })?;
    info!(root = ?root, "bootstrapped built-in roles");
    Ok(())
}
