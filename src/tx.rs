//! Transaction wrapper for writes

use heed::RwTxn;
use tracing::error;

use crate::db::{decode, encode, player_record_key, record_key, Dbs};
use crate::error::{err, BanError, Result};
use crate::model::{Account, Player, PlayerId, Role, Server};

/// Write transaction. Tracks whether role data changed so the store can
/// drop cached permission snapshots after commit.
pub struct Tx<'a> {
    txn: RwTxn<'a>,
    dbs: &'a Dbs,
    roles_changed: bool,
}

impl<'a> Tx<'a> {
    #[inline]
    pub(crate) fn new(txn: RwTxn<'a>, dbs: &'a Dbs) -> Self {
        Tx { txn, dbs, roles_changed: false }
    }

    /// Commit, returning whether roles or role assignments changed
    #[inline]
    pub(crate) fn commit(self) -> Result<bool> {
        self.txn.commit().map_err(err)?;
        Ok(self.roles_changed)
    }

    // === Roles ===

    pub fn get_role(&mut self, id: u64) -> Result<Option<Role>> {
        let d = self.dbs;
        match d.roles.get(&self.txn, &id).map_err(err)? {
            Some(b) => Ok(Some(decode(b)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a role. Rejects parents that don't exist or would close a cycle.
    pub fn put_role(&mut self, role: &Role) -> Result<()> {
        if let Some(parent) = role.parent {
            if self.get_role(parent)?.is_none() {
                return Err(BanError::RoleNotFound(parent));
            }
            self.no_cycle(role.id, parent)?;
        }
        let d = self.dbs;
        d.roles.put(&mut self.txn, &role.id, &encode(role)?).map_err(err)?;
        self.roles_changed = true;
        Ok(())
    }

    /// Create a role with the next free id
    pub fn create_role(&mut self, mut role: Role) -> Result<Role> {
        role.id = self.next_id("role")?;
        self.put_role(&role)?;
        Ok(role)
    }

    /// Delete a role, its assignments, and re-parent its children to its own parent
    pub fn delete_role(&mut self, id: u64) -> Result<Option<Role>> {
        let Some(role) = self.get_role(id)? else { return Ok(None) };
        let d = self.dbs;

        for player in d.player_roles.list_rev(&self.txn, id)? {
            d.player_roles.del(&mut self.txn, &player, id)?;
        }
        let stale: Vec<String> = self.server_role_keys(|_, _, r| r == id)?;
        for k in stale {
            d.server_roles.delete(&mut self.txn, &k).map_err(err)?;
        }

        let mut children = Vec::new();
        for item in d.roles.iter(&self.txn).map_err(err)? {
            let (_, b) = item.map_err(err)?;
            let child: Role = decode(b)?;
            if child.parent == Some(id) {
                children.push(child);
            }
        }
        for mut child in children {
            child.parent = role.parent;
            d.roles.put(&mut self.txn, &child.id, &encode(&child)?).map_err(err)?;
        }

        d.roles.delete(&mut self.txn, &id).map_err(err)?;
        self.roles_changed = true;
        Ok(Some(role))
    }

    /// Give a player a global role
    pub fn assign_role(&mut self, player: &PlayerId, role: u64) -> Result<()> {
        let d = self.dbs;
        d.player_roles.put(&mut self.txn, player, role)?;
        self.roles_changed = true;
        Ok(())
    }

    /// Give a player a role on one server only
    pub fn assign_server_role(&mut self, player: &PlayerId, server: &str, role: u64) -> Result<()> {
        let d = self.dbs;
        let k = format!("{}/{}/{}", player, server, role);
        d.server_roles.put(&mut self.txn, &k, &role).map_err(err)?;
        self.roles_changed = true;
        Ok(())
    }

    /// Drop every global and server role held by a player
    pub fn clear_player_roles(&mut self, player: &PlayerId) -> Result<()> {
        let d = self.dbs;
        for role in d.player_roles.list_fwd(&self.txn, player)? {
            d.player_roles.del(&mut self.txn, player, role)?;
        }
        let p = player.to_string();
        let stale = self.server_role_keys(|pl, _, _| pl == p)?;
        for k in stale {
            d.server_roles.delete(&mut self.txn, &k).map_err(err)?;
        }
        self.roles_changed = true;
        Ok(())
    }

    fn server_role_keys<F: Fn(&str, &str, u64) -> bool>(&mut self, keep: F) -> Result<Vec<String>> {
        let d = self.dbs;
        let mut r = Vec::new();
        for item in d.server_roles.iter(&self.txn).map_err(err)? {
            let (k, role) = item.map_err(err)?;
            let mut parts = k.splitn(3, '/');
            if let (Some(pl), Some(server)) = (parts.next(), parts.next()) {
                if keep(pl, server, role) {
                    r.push(k.to_string());
                }
            }
        }
        Ok(r)
    }

    fn no_cycle(&mut self, role: u64, parent: u64) -> Result<()> {
        if role == parent {
            return Err(BanError::Invalid("A role cannot be its own parent".into()));
        }
        let mut cur = parent;
        let mut seen = std::collections::HashSet::new();
        while seen.insert(cur) {
            match self.get_role(cur)?.and_then(|r| r.parent) {
                Some(p) if p == role => return Err(BanError::Invalid("Role parent would create an inheritance cycle".into())),
                Some(p) => cur = p,
                None => return Ok(()),
            }
        }
        error!(role = cur, "existing role inheritance cycle");
        Err(BanError::CycleDetected(cur))
    }

    // === Servers & players ===

    pub fn get_server(&mut self, id: &str) -> Result<Option<Server>> {
        let d = self.dbs;
        match d.servers.get(&self.txn, id).map_err(err)? {
            Some(b) => Ok(Some(decode(b)?)),
            None => Ok(None),
        }
    }

    pub fn put_server(&mut self, server: &Server) -> Result<()> {
        let d = self.dbs;
        d.servers.put(&mut self.txn, &server.id, &encode(server)?).map_err(err)
    }

    /// Remove a server with its players, records and server-scoped roles
    pub fn delete_server(&mut self, id: &str) -> Result<bool> {
        let d = self.dbs;
        if !d.servers.delete(&mut self.txn, id).map_err(err)? {
            return Ok(false);
        }
        let pfx = format!("{}/", id);
        let mut keys = Vec::new();
        for db in [d.players, d.records] {
            for item in db.prefix_iter(&self.txn, &pfx).map_err(err)? {
                let (k, _) = item.map_err(err)?;
                keys.push((db, k.to_string()));
            }
        }
        for (db, k) in keys {
            db.delete(&mut self.txn, &k).map_err(err)?;
        }
        let stale = self.server_role_keys(|_, server, _| server == id)?;
        for k in stale {
            d.server_roles.delete(&mut self.txn, &k).map_err(err)?;
        }
        self.roles_changed = true;
        Ok(true)
    }

    pub fn put_player(&mut self, server: &str, player: &Player) -> Result<()> {
        let d = self.dbs;
        d.players
            .put(&mut self.txn, &player_record_key(server, &player.id), &encode(player)?)
            .map_err(err)
    }

    pub fn player_exists(&mut self, server: &str, player: &PlayerId) -> Result<bool> {
        let d = self.dbs;
        Ok(d.players.get(&self.txn, &player_record_key(server, player)).map_err(err)?.is_some())
    }

    pub fn put_account(&mut self, account: &Account) -> Result<()> {
        let d = self.dbs;
        d.accounts.put(&mut self.txn, &account.id.to_string(), &encode(account)?).map_err(err)
    }

    pub fn put_meta(&mut self, key: &str, value: &str) -> Result<()> {
        let d = self.dbs;
        d.meta.put(&mut self.txn, key, value).map_err(err)
    }

    pub(crate) fn put_session(&mut self, hash: &str, value: &str) -> Result<()> {
        let d = self.dbs;
        d.sessions.put(&mut self.txn, hash, value).map_err(err)
    }

    pub(crate) fn delete_session(&mut self, hash: &str) -> Result<bool> {
        let d = self.dbs;
        d.sessions.delete(&mut self.txn, hash).map_err(err)
    }

    // === Records ===

    pub fn get_record<T: serde::de::DeserializeOwned>(&mut self, server: &str, table: &str, id: u64) -> Result<Option<T>> {
        let d = self.dbs;
        match d.records.get(&self.txn, &record_key(server, table, id)).map_err(err)? {
            Some(b) => Ok(Some(decode(b)?)),
            None => Ok(None),
        }
    }

    /// All records of one table on one server, as seen by this txn
    pub fn list_records<T: serde::de::DeserializeOwned>(&mut self, server: &str, table: &str) -> Result<Vec<T>> {
        let d = self.dbs;
        let pfx = format!("{}/{}/", server, table);
        let mut r = Vec::new();
        for item in d.records.prefix_iter(&self.txn, &pfx).map_err(err)? {
            let (_, b) = item.map_err(err)?;
            r.push(decode(b)?);
        }
        Ok(r)
    }

    pub fn put_record<T: serde::Serialize>(&mut self, server: &str, table: &str, id: u64, v: &T) -> Result<()> {
        let d = self.dbs;
        d.records.put(&mut self.txn, &record_key(server, table, id), &encode(v)?).map_err(err)
    }

    pub fn delete_record(&mut self, server: &str, table: &str, id: u64) -> Result<bool> {
        let d = self.dbs;
        d.records.delete(&mut self.txn, &record_key(server, table, id)).map_err(err)
    }

    /// Next id for a named counter (`role`, `server`, `{server}/{table}`)
    pub fn next_id(&mut self, counter: &str) -> Result<u64> {
        let d = self.dbs;
        let k = format!("next_id:{}", counter);
        let id = d.meta
            .get(&self.txn, &k)
            .map_err(err)?
            .and_then(|s| s.parse().ok())
            .unwrap_or(1u64);
        self.set_next_id(counter, id + 1)?;
        Ok(id)
    }

    pub(crate) fn set_next_id(&mut self, counter: &str, id: u64) -> Result<()> {
        let d = self.dbs;
        d.meta.put(&mut self.txn, &format!("next_id:{}", counter), &id.to_string()).map_err(err)
    }
}
