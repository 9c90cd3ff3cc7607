//! Per-request caller identity and permission snapshots

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use crate::db::Store;
use crate::error::Result;
use crate::model::PlayerId;
use crate::ownership::{resolve_ownership, Owned, Ownership};
use crate::permission::PermissionSet;
use crate::policy::{authorize, Decision, Requirement};
use crate::session;

/// Everything authorization needs for one request.
///
/// Snapshots are fetched at most once per server per request and reused
/// for every field and row the request touches.
pub struct RequestContext<'s> {
    store: &'s Store,
    caller: Option<PlayerId>,
    snapshots: Mutex<HashMap<Option<String>, Arc<PermissionSet>>>,
}

impl<'s> RequestContext<'s> {
    pub fn anonymous(store: &'s Store) -> Self {
        Self::new(store, None)
    }

    pub fn for_player(store: &'s Store, player: PlayerId) -> Self {
        Self::new(store, Some(player))
    }

    /// Caller from a session token. Missing, unknown or expired tokens make an anonymous request.
    pub fn from_token(store: &'s Store, token: Option<&str>) -> Self {
        let caller = token.and_then(|t| match session::validate_session(store, t) {
            Ok(player) => Some(player),
            Err(e) => {
                debug!(error = %e, "session rejected");
                None
            }
        });
        Self::new(store, caller)
    }

    fn new(store: &'s Store, caller: Option<PlayerId>) -> Self {
        RequestContext { store, caller, snapshots: Mutex::new(HashMap::new()) }
    }

    pub fn store(&self) -> &'s Store {
        self.store
    }

    pub fn caller(&self) -> Option<&PlayerId> {
        self.caller.as_ref()
    }

    /// Effective permissions of the caller on `server` (global roles only when `None`)
    pub fn permissions(&self, server: Option<&str>) -> Result<Arc<PermissionSet>> {
        let key = server.map(str::to_string);
        if let Some(hit) = self.snapshots.lock().ok().and_then(|s| s.get(&key).cloned()) {
            return Ok(hit);
        }
        let set = self.store.effective_permissions(self.caller.as_ref(), server)?;
        if let Ok(mut s) = self.snapshots.lock() {
            s.insert(key, set.clone());
        }
        Ok(set)
    }

    /// Evaluate and fail with the uniform denial
    pub fn authorize(&self, server: Option<&str>, req: &Requirement, ownership: Option<&Ownership>) -> Result<()> {
        let perms = self.permissions(server)?;
        authorize(&perms, self.caller.as_ref(), req, ownership).into_result()
    }

    /// Evaluate against a loaded record's ownership facts
    pub fn authorize_entity<E: Owned>(&self, server: Option<&str>, req: &Requirement, entity: &E) -> Result<()> {
        let ownership = self.caller.as_ref().map(|c| resolve_ownership(entity, c));
        self.authorize(server, req, ownership.as_ref())
    }

    /// Boolean form for projections. Any internal error is a denial.
    pub fn check(&self, server: Option<&str>, req: &Requirement, ownership: Option<&Ownership>) -> bool {
        match self.permissions(server) {
            Ok(perms) => authorize(&perms, self.caller.as_ref(), req, ownership) == Decision::Allow,
            Err(e) => {
                error!(error = %e, "permission evaluation failed, denying");
                false
            }
        }
    }
}

