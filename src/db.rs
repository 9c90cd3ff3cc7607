//! Database handles and the shared store

use std::path::Path;

use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{err, Result};
use crate::model::PlayerId;
use crate::roles::PermissionCache;
use crate::tx::Tx;

// Database type aliases
pub type Db = Database<Bytes, U64<byteorder::BigEndian>>;
pub type DbJson = Database<Str, Bytes>;
pub type DbRoles = Database<U64<byteorder::BigEndian>, Bytes>;

/// 24-byte key: player uuid followed by a big-endian u64
#[inline]
pub fn player_key(player: &PlayerId, n: u64) -> Vec<u8> {
    let mut k = Vec::with_capacity(24);
    k.extend_from_slice(player.as_bytes());
    k.extend_from_slice(&n.to_be_bytes());
    k
}

/// 24-byte key: big-endian u64 followed by a player uuid
#[inline]
pub fn rev_player_key(n: u64, player: &PlayerId) -> Vec<u8> {
    let mut k = Vec::with_capacity(24);
    k.extend_from_slice(&n.to_be_bytes());
    k.extend_from_slice(player.as_bytes());
    k
}

/// `{server}/{table}/{id}` with a zero-padded id so prefix scans come back in id order
#[inline]
pub fn record_key(server: &str, table: &str, id: u64) -> String {
    format!("{}/{}/{:020}", server, table, id)
}

/// Id counter for one table of one server
#[inline]
pub fn counter(server: &str, table: &str) -> String {
    format!("{}/{}", server, table)
}

#[inline]
pub fn player_record_key(server: &str, player: &PlayerId) -> String {
    format!("{}/{}", server, player)
}

pub fn encode<T: Serialize>(v: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(v).map_err(err)
}

pub fn decode<T: DeserializeOwned>(b: &[u8]) -> Result<T> {
    serde_json::from_slice(b).map_err(err)
}

/// Bidirectional player/role index: fwd[player,role] and rev[role,player] stay in sync
pub struct BiPair {
    pub fwd: Db,
    pub rev: Db,
}

impl BiPair {
    #[inline]
    pub fn put(&self, tx: &mut RwTxn, player: &PlayerId, role: u64) -> Result<()> {
        self.fwd.put(tx, &player_key(player, role), &1).map_err(err)?;
        self.rev.put(tx, &rev_player_key(role, player), &1).map_err(err)
    }

    #[inline]
    pub fn del(&self, tx: &mut RwTxn, player: &PlayerId, role: u64) -> Result<bool> {
        let r = self.fwd.delete(tx, &player_key(player, role)).map_err(err)?;
        self.rev.delete(tx, &rev_player_key(role, player)).map_err(err)?;
        Ok(r)
    }

    /// Roles held by a player
    pub fn list_fwd(&self, tx: &RoTxn, player: &PlayerId) -> Result<Vec<u64>> {
        let mut r = Vec::new();
        for item in self.fwd.prefix_iter(tx, player.as_bytes()).map_err(err)? {
            let (k, _) = item.map_err(err)?;
            if k.len() == 24 {
                let mut b = [0u8; 8];
                b.copy_from_slice(&k[16..24]);
                r.push(u64::from_be_bytes(b));
            }
        }
        Ok(r)
    }

    /// Players holding a role
    pub fn list_rev(&self, tx: &RoTxn, role: u64) -> Result<Vec<PlayerId>> {
        let mut r = Vec::new();
        for item in self.rev.prefix_iter(tx, &role.to_be_bytes()).map_err(err)? {
            let (k, _) = item.map_err(err)?;
            if k.len() == 24 {
                r.push(Uuid::from_slice(&k[8..24]).map_err(err)?);
            }
        }
        Ok(r)
    }
}

/// All database handles
pub struct Dbs {
    pub roles: DbRoles,
    pub player_roles: BiPair,
    /// `{player}/{server}/{role}` -> role
    pub server_roles: Database<Str, U64<byteorder::BigEndian>>,
    pub servers: DbJson,
    /// `{server}/{player}` -> player
    pub players: DbJson,
    /// `{server}/{table}/{id}` -> record
    pub records: DbJson,
    pub accounts: DbJson,
    pub sessions: Database<Str, Str>,
    pub meta: Database<Str, Str>,
}

/// LMDB-backed store shared by every request.
///
/// Reads run in their own read transaction; writes go through [`Store::transact`].
/// The effective-permission cache is dropped whenever a committed
/// transaction touched roles or role assignments.
pub struct Store {
    env: Env,
    dbs: Dbs,
    pub(crate) cache: PermissionCache,
}

impl Store {
    /// Open (creating if needed) the database directory
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(1 << 30)
                .max_dbs(11)
                .open(path)
                .map_err(err)?
        };
        let mut tx = env.write_txn().map_err(err)?;
        let dbs = Dbs {
            roles: env.create_database(&mut tx, Some("roles")).map_err(err)?,
            player_roles: BiPair {
                fwd: env.create_database(&mut tx, Some("player_roles")).map_err(err)?,
                rev: env.create_database(&mut tx, Some("role_players")).map_err(err)?,
            },
            server_roles: env.create_database(&mut tx, Some("server_roles")).map_err(err)?,
            servers: env.create_database(&mut tx, Some("servers")).map_err(err)?,
            players: env.create_database(&mut tx, Some("players")).map_err(err)?,
            records: env.create_database(&mut tx, Some("records")).map_err(err)?,
            accounts: env.create_database(&mut tx, Some("accounts")).map_err(err)?,
            sessions: env.create_database(&mut tx, Some("sessions")).map_err(err)?,
            meta: env.create_database(&mut tx, Some("meta")).map_err(err)?,
        };
        tx.commit().map_err(err)?;
        debug!(path = %path.display(), "store opened");
        Ok(Store { env, dbs, cache: PermissionCache::new() })
    }

    /// Execute a read-only operation
    #[inline]
    pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let tx = self.env.read_txn().map_err(err)?;
        f(&self.dbs, &tx)
    }

    /// Run multiple writes in a single transaction. Nothing is committed if `f` fails.
    pub fn transact<T, F: FnOnce(&mut Tx) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = Tx::new(self.env.write_txn().map_err(err)?, &self.dbs);
        let r = f(&mut tx)?;
        if tx.commit()? {
            self.cache.invalidate();
        }
        Ok(r)
    }
}
