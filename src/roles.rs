//! Role inheritance and effective permission snapshots
//!
//! Roles form a forest through `parent` ids. A role's effective grants are
//! its own grants layered over every ancestor's, nearer role winning a
//! (resource, permission) conflict. An account's snapshot for a server is
//! the union over all roles it holds there.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, error, warn};

use crate::constants::{MAX_CACHED_SNAPSHOTS, ROLE_GUEST, ROLE_LOGGED_IN};
use crate::db::Store;
use crate::error::{BanError, Result};
use crate::model::{PlayerId, Role};
use crate::permission::PermissionSet;

/// Arena of roles keyed by id; parents are ids, never references.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    roles: HashMap<u64, Role>,
}

impl RoleTable {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        RoleTable { roles: roles.into_iter().map(|r| (r.id, r)).collect() }
    }

    /// The role followed by its ancestors, nearest first.
    ///
    /// A chain that revisits a role, or runs longer than the number of
    /// known roles, is an integrity failure.
    pub fn chain(&self, id: u64) -> Result<Vec<&Role>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = Some(id);
        while let Some(rid) = cur {
            if !seen.insert(rid) || out.len() > self.roles.len() {
                error!(role = id, at = rid, "role inheritance cycle");
                return Err(BanError::CycleDetected(rid));
            }
            let Some(role) = self.roles.get(&rid) else {
                if rid != id {
                    warn!(role = id, parent = rid, "role parent does not exist");
                }
                break;
            };
            out.push(role);
            cur = role.parent;
        }
        Ok(out)
    }

    /// Effective grants of a single role after inheritance
    pub fn resolve(&self, id: u64) -> Result<PermissionSet> {
        let mut merged: BTreeMap<(&str, &str), bool> = BTreeMap::new();
        for role in self.chain(id)?.into_iter().rev() {
            for (resource, perms) in &role.grants {
                for (perm, allowed) in perms {
                    merged.insert((resource.as_str(), perm.as_str()), *allowed);
                }
            }
        }
        let mut set = PermissionSet::new();
        for ((resource, perm), allowed) in merged {
            if allowed {
                set.allow(resource, perm);
            }
        }
        Ok(set)
    }

    /// Union of the effective grants of every listed role
    pub fn effective(&self, role_ids: &[u64]) -> Result<PermissionSet> {
        let mut set = PermissionSet::new();
        for &id in role_ids {
            set.extend(&self.resolve(id)?);
        }
        Ok(set)
    }
}

type CacheKey = (Option<PlayerId>, Option<String>);

/// Shared cache of effective-permission snapshots.
///
/// `generation` increments on every invalidation; a snapshot computed
/// under an older generation is returned but never stored. The map is
/// emptied once it holds `MAX_CACHED_SNAPSHOTS` entries.
#[derive(Default)]
pub struct PermissionCache {
    entries: RwLock<HashMap<CacheKey, Arc<PermissionSet>>>,
    generation: AtomicU64,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<PermissionSet>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn insert(&self, key: CacheKey, generation: u64, set: Arc<PermissionSet>) {
        if let Ok(mut entries) = self.entries.write() {
            if self.generation() != generation {
                return;
            }
            if entries.len() >= MAX_CACHED_SNAPSHOTS && !entries.contains_key(&key) {
                debug!(entries = entries.len(), "permission cache full, clearing");
                entries.clear();
            }
            entries.insert(key, set);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn invalidate(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
        debug!("permission cache invalidated");
    }
}

impl Store {
    /// Role ids that apply to `account` on `server`.
    ///
    /// Anonymous callers hold only the guest role; every account holds the
    /// logged-in role plus its global roles and the roles scoped to `server`.
    pub fn role_ids_for(&self, account: Option<&PlayerId>, server: Option<&str>) -> Result<Vec<u64>> {
        let Some(account) = account else { return Ok(vec![ROLE_GUEST]) };
        let mut ids = vec![ROLE_LOGGED_IN];
        ids.extend(self.player_roles(account)?);
        if let Some(server) = server {
            ids.extend(self.player_server_roles(account)?.into_iter().filter(|sr| sr.server == server).map(|sr| sr.role));
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// `effectivePermissions(account, server)`, served from the cache when possible.
    ///
    /// Guests and unknown servers resolve to the global snapshot, so the
    /// cache only ever holds keys for real accounts on real servers.
    pub fn effective_permissions(&self, account: Option<&PlayerId>, server: Option<&str>) -> Result<Arc<PermissionSet>> {
        let server = match (account, server) {
            (Some(_), Some(s)) if self.get_server(s)?.is_some() => Some(s),
            _ => None,
        };
        let key: CacheKey = (account.copied(), server.map(str::to_string));
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let generation = self.cache.generation();
        let ids = self.role_ids_for(account, server)?;
        let set = Arc::new(self.role_table()?.effective(&ids)?);
        debug!(?account, ?server, roles = ?ids, grants = set.len(), "permissions resolved");
        self.cache.insert(key, generation, set.clone());
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: u64, parent: Option<u64>) -> Role {
        Role { id, name: format!("r{}", id), parent, ..Default::default() }
    }

    #[test]
    fn child_inherits_parent_grant() {
        let t = RoleTable::new([role(1, None).grant("player.bans", "view", true), role(2, Some(1))]);
        assert!(t.resolve(2).unwrap().has("player.bans", "view"));
    }

    #[test]
    fn nearer_role_overrides() {
        let t = RoleTable::new([
            role(1, None).grant("player.bans", "view", true),
            role(2, Some(1)).grant("player.bans", "view", false),
            role(3, Some(2)),
        ]);
        assert!(!t.resolve(2).unwrap().has("player.bans", "view"));
        assert!(!t.resolve(3).unwrap().has("player.bans", "view"));
        assert!(t.resolve(1).unwrap().has("player.bans", "view"));
    }

    #[test]
    fn cycle_is_detected() {
        let t = RoleTable::new([role(1, Some(3)), role(2, Some(1)), role(3, Some(2))]);
        assert!(matches!(t.resolve(1), Err(BanError::CycleDetected(_))));
        assert!(matches!(t.effective(&[2]), Err(BanError::CycleDetected(_))));
    }

    #[test]
    fn union_across_roles() {
        let t = RoleTable::new([
            role(1, None).grant("player.bans", "view", true),
            role(2, None).grant("player.mutes", "view", true).grant("player.bans", "view", false),
        ]);
        let s = t.effective(&[1, 2]).unwrap();
        assert!(s.has("player.bans", "view"));
        assert!(s.has("player.mutes", "view"));
    }

    #[test]
    fn cache_ignores_made_up_servers() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::open(dir.path().join("banman.mdb")).unwrap();
        crate::bootstrap::bootstrap(&store, None).unwrap();
        let player = uuid::Uuid::new_v4();

        for i in 0..500 {
            let server = format!("nope-{}", i);
            store.effective_permissions(None, Some(&server)).unwrap();
            store.effective_permissions(Some(&player), Some(&server)).unwrap();
        }
        assert_eq!(store.cache.len(), 2);
    }

    #[test]
    fn cache_is_bounded() {
        let cache = PermissionCache::new();
        let set = Arc::new(PermissionSet::default());
        for i in 0..MAX_CACHED_SNAPSHOTS + 10 {
            cache.insert((None, Some(i.to_string())), 0, set.clone());
        }
        assert!(cache.len() <= MAX_CACHED_SNAPSHOTS);
        assert!(!cache.is_empty());
    }

    #[test]
    fn unknown_role_grants_nothing() {
        let t = RoleTable::new([role(1, None).grant("servers", "manage", true)]);
        assert!(t.effective(&[42]).unwrap().is_empty());
    }
}
