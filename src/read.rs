//! Read operations (no permission checks, direct LMDB access)

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::db::{decode, player_record_key, record_key, Store};
use crate::error::{err, Result};
use crate::model::{Account, Player, PlayerId, Role, Server, ServerRole};
use crate::roles::RoleTable;

impl Store {
    /// Global roles held by a player
    pub fn player_roles(&self, player: &PlayerId) -> Result<Vec<u64>> {
        self.read(|d, tx| d.player_roles.list_fwd(tx, player))
    }

    /// Server-scoped roles held by a player
    pub fn player_server_roles(&self, player: &PlayerId) -> Result<Vec<ServerRole>> {
        let pfx = format!("{}/", player);
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.server_roles.prefix_iter(tx, &pfx).map_err(err)? {
                let (k, role) = item.map_err(err)?;
                if let Some(server) = k[pfx.len()..].split('/').next() {
                    r.push(ServerRole { server: server.to_string(), role });
                }
            }
            Ok(r)
        })
    }

    pub fn get_role(&self, id: u64) -> Result<Option<Role>> {
        self.read(|d, tx| match d.roles.get(tx, &id).map_err(err)? {
            Some(b) => Ok(Some(decode(b)?)),
            None => Ok(None),
        })
    }

    /// All roles in id order
    pub fn list_roles(&self) -> Result<Vec<Role>> {
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.roles.iter(tx).map_err(err)? {
                let (_, b) = item.map_err(err)?;
                r.push(decode(b)?);
            }
            Ok(r)
        })
    }

    /// Every role loaded into an arena, read in one transaction
    pub fn role_table(&self) -> Result<RoleTable> {
        Ok(RoleTable::new(self.list_roles()?))
    }

    pub fn get_server(&self, id: &str) -> Result<Option<Server>> {
        self.read(|d, tx| match d.servers.get(tx, id).map_err(err)? {
            Some(b) => Ok(Some(decode(b)?)),
            None => Ok(None),
        })
    }

    pub fn list_servers(&self) -> Result<Vec<Server>> {
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.servers.iter(tx).map_err(err)? {
                let (_, b) = item.map_err(err)?;
                r.push(decode(b)?);
            }
            Ok(r)
        })
    }

    pub fn get_player(&self, server: &str, id: &PlayerId) -> Result<Option<Player>> {
        self.read(|d, tx| match d.players.get(tx, &player_record_key(server, id)).map_err(err)? {
            Some(b) => Ok(Some(decode(b)?)),
            None => Ok(None),
        })
    }

    pub fn get_account(&self, id: &PlayerId) -> Result<Option<Account>> {
        self.read(|d, tx| match d.accounts.get(tx, &id.to_string()).map_err(err)? {
            Some(b) => Ok(Some(decode(b)?)),
            None => Ok(None),
        })
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.accounts.iter(tx).map_err(err)? {
                let (_, b) = item.map_err(err)?;
                r.push(decode(b)?);
            }
            Ok(r)
        })
    }

    /// Players with an account or any role assignment, in id order
    pub fn known_players(&self) -> Result<Vec<PlayerId>> {
        self.read(|d, tx| {
            let mut ids = BTreeSet::new();
            for item in d.accounts.iter(tx).map_err(err)? {
                let (k, _) = item.map_err(err)?;
                ids.insert(Uuid::parse_str(k).map_err(err)?);
            }
            for item in d.player_roles.fwd.iter(tx).map_err(err)? {
                let (k, _) = item.map_err(err)?;
                if k.len() == 24 {
                    ids.insert(Uuid::from_slice(&k[..16]).map_err(err)?);
                }
            }
            for item in d.server_roles.iter(tx).map_err(err)? {
                let (k, _) = item.map_err(err)?;
                if let Some(p) = k.split('/').next() {
                    ids.insert(Uuid::parse_str(p).map_err(err)?);
                }
            }
            Ok(ids.into_iter().collect())
        })
    }

    /// Every player seen on one server
    pub fn list_players(&self, server: &str) -> Result<Vec<Player>> {
        let pfx = format!("{}/", server);
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.players.prefix_iter(tx, &pfx).map_err(err)? {
                let (_, b) = item.map_err(err)?;
                r.push(decode(b)?);
            }
            Ok(r)
        })
    }

    /// Servers a player has been seen on
    pub fn player_servers(&self, player: &PlayerId) -> Result<Vec<(Server, Player)>> {
        let mut r = Vec::new();
        for server in self.list_servers()? {
            if let Some(p) = self.get_player(&server.id, player)? {
                r.push((server, p));
            }
        }
        Ok(r)
    }

    pub fn get_record<T: DeserializeOwned>(&self, server: &str, table: &str, id: u64) -> Result<Option<T>> {
        self.read(|d, tx| match d.records.get(tx, &record_key(server, table, id)).map_err(err)? {
            Some(b) => Ok(Some(decode(b)?)),
            None => Ok(None),
        })
    }

    /// All records of one table on one server, in id order
    pub fn list_records<T: DeserializeOwned>(&self, server: &str, table: &str) -> Result<Vec<T>> {
        let pfx = format!("{}/{}/", server, table);
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.records.prefix_iter(tx, &pfx).map_err(err)? {
                let (_, b) = item.map_err(err)?;
                r.push(decode(b)?);
            }
            Ok(r)
        })
    }
}
