//! Operation dispatch
//!
//! [`Panel::execute`] is the single entry point for every named operation:
//! the gate admits (or rejects) the call, then the matching handler loads
//! records, finishes any record-scoped check and does the work.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::context::RequestContext;
use crate::db::Store;
use crate::error::{BanError, ErrorKind, Result};
use crate::gate;
use crate::model::{PlayerId, Server};

/// Reports which tables and console players exist in a game server's own database.
///
/// The panel never talks to game databases itself; deployments plug in a
/// probe that does.
pub trait TableProbe: Send + Sync {
    /// Logical names of configured tables missing from the server database
    fn missing_tables(&self, server: &Server) -> Result<Vec<String>>;

    /// Whether `player` is present in the physical `table`
    fn player_exists(&self, server: &Server, table: &str, player: &PlayerId) -> Result<bool>;
}

/// Probe that takes the server configuration at its word
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustConfig;

impl TableProbe for TrustConfig {
    fn missing_tables(&self, _: &Server) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn player_exists(&self, _: &Server, _: &str, _: &PlayerId) -> Result<bool> {
        Ok(true)
    }
}

pub struct Panel {
    store: Arc<Store>,
    pub(crate) probe: Arc<dyn TableProbe>,
}

impl Panel {
    pub fn new(store: Arc<Store>) -> Self {
        Panel { store, probe: Arc::new(TrustConfig) }
    }

    pub fn with_probe<P: TableProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Request context for a session token (anonymous when absent or invalid)
    pub fn context(&self, token: Option<&str>) -> RequestContext<'_> {
        RequestContext::from_token(&self.store, token)
    }

    /// Run one operation for the caller in `ctx`
    pub fn execute(&self, ctx: &RequestContext, operation: &str, args: Value) -> Result<Value> {
        let adm = gate::admit(ctx, operation, &args)?;
        let r = match operation {
            // Reports
            "report" => self.report(ctx, &adm, args),
            "listReports" => self.list_reports(ctx, &adm, args),
            "reportStates" => self.report_states(args),
            "assignReport" => self.assign_report(ctx, &adm, args),
            "reportState" => self.report_state(ctx, &adm, args),
            "createReportComment" => self.create_report_comment(ctx, &adm, args),
            "deleteReportComment" => self.delete_report_comment(ctx, &adm, args),
            // Punishments
            "playerBan" | "playerKick" | "playerMute" | "playerNote" | "playerWarning" => {
                self.punishment(ctx, &adm, operation, args)
            }
            "listBans" | "listKicks" | "listMutes" | "listNotes" | "listWarnings" => {
                self.list_punishments(ctx, &adm, operation, args)
            }
            "createPlayerBan" | "createPlayerMute" | "createPlayerNote" | "createPlayerWarning" => {
                self.create_punishment(ctx, &adm, operation, args)
            }
            "updatePlayerBan" | "updatePlayerMute" | "updatePlayerNote" | "updatePlayerWarning" => {
                self.update_punishment(ctx, &adm, operation, args)
            }
            "deletePunishmentRecord" => self.delete_punishment_record(ctx, &adm, args),
            // Servers
            "servers" => self.servers(ctx),
            "server" => self.server(ctx, args),
            "createServer" => self.create_server(args),
            "updateServer" => self.update_server(args),
            "deleteServer" => self.delete_server(args),
            // Roles
            "roles" => self.roles(args),
            "role" => self.role(args),
            "resources" => self.resources(),
            "createRole" => self.create_role(args),
            "updateRole" => self.update_role(args),
            "deleteRole" => self.delete_role(args),
            "assignRole" => self.assign_role(args),
            "assignServerRole" => self.assign_server_role(args),
            "setRoles" => self.set_roles(args),
            "listPlayers" => self.list_players(args),
            // Account
            "me" => self.me(ctx),
            "player" => self.player(ctx, args),
            "setEmail" => self.set_email(ctx, args),
            _ => Err(BanError::Invalid(format!("Unknown operation {}", operation))),
        };
        r.inspect_err(|e| match e.kind() {
            ErrorKind::Integrity | ErrorKind::Internal => error!(operation, error = %e, "operation failed"),
            _ => debug!(operation, error = %e, "operation rejected"),
        })
    }

    pub(crate) fn require_server(&self, id: &str) -> Result<Server> {
        self.store.get_server(id)?.ok_or_else(|| BanError::ServerNotFound(id.to_string()))
    }

    pub(crate) fn require_player(&self, server: &str, player: &PlayerId) -> Result<()> {
        match self.store.get_player(server, player)? {
            Some(_) => Ok(()),
            None => Err(BanError::PlayerNotFound(*player)),
        }
    }
}

/// `{data}` on success, `{data: null, errors: [{message, kind}]}` otherwise
pub fn respond(result: Result<Value>) -> Value {
    match result {
        Ok(data) => json!({ "data": data }),
        Err(e) => json!({
            "data": null,
            "errors": [{ "message": e.public_message(), "kind": e.kind() }],
        }),
    }
}

/// `serverId` argument of an operation the gate did not scope
pub(crate) fn arg_server(args: &Value) -> Result<String> {
    gate::scope_server(gate::ScopeSource::Arg("serverId"), args)
        .ok_or_else(|| BanError::Invalid("Missing server id".into()))
}

pub(crate) fn parse<T: DeserializeOwned>(args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| BanError::Invalid(e.to_string()))
}

/// Serialize a record and attach its `acl`
pub(crate) fn with_acl<T: Serialize, A: Serialize>(record: &T, acl: A) -> Result<Value> {
    let mut v = to_object(record)?;
    v.insert("acl".into(), to_value(acl)?);
    Ok(Value::Object(v))
}

pub(crate) fn to_value<T: Serialize>(v: T) -> Result<Value> {
    serde_json::to_value(v).map_err(|e| BanError::Storage(e.to_string()))
}

pub(crate) fn to_object<T: Serialize>(v: &T) -> Result<Map<String, Value>> {
    match to_value(v)? {
        Value::Object(m) => Ok(m),
        other => Err(BanError::Storage(format!("expected object, got {}", other))),
    }
}

/// Slice one page out of a filtered list
pub(crate) fn page<T>(items: Vec<T>, limit: Option<usize>, offset: Option<usize>) -> Vec<T> {
    let offset = offset.unwrap_or(0);
    let limit = limit.unwrap_or(crate::constants::DEFAULT_PAGE_SIZE).min(crate::constants::MAX_PAGE_SIZE);
    items.into_iter().skip(offset).take(limit).collect()
}
