//! Field authorization gate
//!
//! Every operation and protected field is declared once in
//! [`DECLARATIONS`]. The gate resolves the server scope from request
//! arguments (or from the parent object, for fields), then either decides
//! immediately or hands back an [`Admission`] that still needs the loaded
//! record before it can decide.

use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::*;
use crate::context::RequestContext;
use crate::error::{BanError, Result};
use crate::model::RecordType;
use crate::ownership::Owned;
use crate::policy::Requirement;

/// Where the server id for scoping comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSource {
    /// Global check, no server scope
    None,
    /// Top-level argument, e.g. `serverId`
    Arg(&'static str),
    /// Dotted path into an input object, e.g. `input.server`
    InputPath(&'static str),
    /// Field of the parent object, for field-level rules
    Parent(&'static str),
}

/// Resource named directly, or picked by a `RecordType` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Fixed(&'static str),
    RecordTypeArg(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Public,
    /// `@allowIfLoggedIn`
    LoggedIn,
    /// `@allowIf(resource, permission, serverVar | serverSrc)`
    AllowIf { resource: &'static str, permission: &'static str, server: ScopeSource },
    /// Ownership-qualified: decided once the record is loaded, any → own → assigned → reported
    AllowIfEntity { resource: ResourceRef, base: &'static str, server: ScopeSource },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Query,
    Mutation,
    Field,
}

#[derive(Debug, Clone, Copy)]
pub struct Declaration {
    pub name: &'static str,
    pub kind: Kind,
    pub rule: Rule,
}

const fn q(name: &'static str, rule: Rule) -> Declaration {
    Declaration { name, kind: Kind::Query, rule }
}
const fn m(name: &'static str, rule: Rule) -> Declaration {
    Declaration { name, kind: Kind::Mutation, rule }
}
const fn f(name: &'static str, rule: Rule) -> Declaration {
    Declaration { name, kind: Kind::Field, rule }
}
const fn allow(resource: &'static str, permission: &'static str, server: ScopeSource) -> Rule {
    Rule::AllowIf { resource, permission, server }
}
const fn entity(resource: &'static str, base: &'static str) -> Rule {
    Rule::AllowIfEntity { resource: ResourceRef::Fixed(resource), base, server: ScopeSource::Arg("serverId") }
}

const MANAGE: Rule = allow(SERVERS, "manage", ScopeSource::None);
const SERVER_ID: ScopeSource = ScopeSource::Arg("serverId");
const INPUT_SERVER: ScopeSource = ScopeSource::InputPath("input.server");
const PARENT_SERVER: ScopeSource = ScopeSource::Parent("server");

pub const DECLARATIONS: &[Declaration] = &[
    // Queries
    q("servers", Rule::Public),
    q("server", Rule::Public),
    q("player", Rule::Public),
    q("me", Rule::Public),
    q("reportStates", Rule::Public),
    q("listPlayers", MANAGE),
    q("roles", MANAGE),
    q("role", MANAGE),
    q("resources", MANAGE),
    q("playerBan", allow(PLAYER_BANS, "view", SERVER_ID)),
    q("playerKick", allow(PLAYER_KICKS, "view", SERVER_ID)),
    q("playerMute", allow(PLAYER_MUTES, "view", SERVER_ID)),
    q("playerNote", allow(PLAYER_NOTES, "view", SERVER_ID)),
    q("playerWarning", allow(PLAYER_WARNINGS, "view", SERVER_ID)),
    q("report", entity(PLAYER_REPORTS, "view")),
    q("listReports", allow(PLAYER_REPORTS, "view.any", SERVER_ID)),
    q("listBans", allow(PLAYER_BANS, "view", SERVER_ID)),
    q("listKicks", allow(PLAYER_KICKS, "view", SERVER_ID)),
    q("listMutes", allow(PLAYER_MUTES, "view", SERVER_ID)),
    q("listNotes", allow(PLAYER_NOTES, "view", SERVER_ID)),
    q("listWarnings", allow(PLAYER_WARNINGS, "view", SERVER_ID)),
    // Mutations
    m("deletePunishmentRecord", Rule::AllowIfEntity {
        resource: ResourceRef::RecordTypeArg("type"),
        base: "delete",
        server: SERVER_ID,
    }),
    m("createPlayerNote", allow(PLAYER_NOTES, "create", INPUT_SERVER)),
    m("updatePlayerNote", entity(PLAYER_NOTES, "update")),
    m("createPlayerBan", allow(PLAYER_BANS, "create", INPUT_SERVER)),
    m("updatePlayerBan", entity(PLAYER_BANS, "update")),
    m("createPlayerMute", allow(PLAYER_MUTES, "create", INPUT_SERVER)),
    m("updatePlayerMute", entity(PLAYER_MUTES, "update")),
    m("createPlayerWarning", allow(PLAYER_WARNINGS, "create", INPUT_SERVER)),
    m("updatePlayerWarning", entity(PLAYER_WARNINGS, "update")),
    m("createServer", MANAGE),
    m("updateServer", MANAGE),
    m("deleteServer", MANAGE),
    m("createRole", MANAGE),
    m("updateRole", MANAGE),
    m("deleteRole", MANAGE),
    m("assignRole", MANAGE),
    m("assignServerRole", MANAGE),
    m("setRoles", MANAGE),
    m("assignReport", entity(PLAYER_REPORTS, "update.assign")),
    m("reportState", entity(PLAYER_REPORTS, "update.state")),
    m("createReportComment", entity(PLAYER_REPORTS, "comment")),
    m("deleteReportComment", entity(PLAYER_REPORTS, "delete.comment")),
    m("setEmail", Rule::LoggedIn),
    // Fields
    f("Server.host", MANAGE),
    f("Server.port", MANAGE),
    f("Server.database", MANAGE),
    f("Server.user", MANAGE),
    f("Server.console", MANAGE),
    f("Server.tables", MANAGE),
    f("Player.email", MANAGE),
    f("Player.roles", MANAGE),
    f("Player.serverRoles", MANAGE),
    f("PlayerServer.bans", allow(PLAYER_BANS, "view", PARENT_SERVER)),
    f("PlayerServer.kicks", allow(PLAYER_KICKS, "view", PARENT_SERVER)),
    f("PlayerServer.mutes", allow(PLAYER_MUTES, "view", PARENT_SERVER)),
    f("PlayerServer.notes", allow(PLAYER_NOTES, "view", PARENT_SERVER)),
    f("PlayerServer.warnings", allow(PLAYER_WARNINGS, "view", PARENT_SERVER)),
    f("PlayerServer.alts", allow(PLAYER_ALTS, "view", PARENT_SERVER)),
    f("PlayerServer.ip", allow(PLAYER_IPS, "view", ScopeSource::None)),
    f("PlayerReport.comments", allow(PLAYER_REPORTS, "view.comments", PARENT_SERVER)),
    f("PlayerReport.serverLogs", allow(PLAYER_REPORTS, "view.serverlogs", PARENT_SERVER)),
    f("PlayerReport.commands", allow(PLAYER_REPORTS, "view.commands", PARENT_SERVER)),
];

pub fn declaration(name: &str) -> Option<&'static Declaration> {
    DECLARATIONS.iter().find(|d| d.name == name)
}

/// Follow a dotted path (`input.server`) into a JSON object
pub fn resolve_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(root, |v, seg| v.get(seg))
}

/// Server ids arrive as strings or numbers; both scope the same server
fn as_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn scope_server(source: ScopeSource, args: &Value) -> Option<String> {
    match source {
        ScopeSource::None => None,
        ScopeSource::Arg(name) => args.get(name).and_then(as_id),
        ScopeSource::InputPath(path) => resolve_path(args, path).and_then(as_id),
        ScopeSource::Parent(field) => match args.get(field) {
            Some(Value::Object(o)) => o.get("id").and_then(as_id),
            Some(v) => as_id(v),
            None => None,
        },
    }
}

/// Outcome of the pre-execution check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Resolved (and, for record rules, verified) server scope
    pub server: Option<String>,
    /// Set when the decision waits on the loaded record
    pub pending: Option<Requirement>,
}

impl Admission {
    /// Finish a record-scoped check against the loaded record.
    /// A no-op when the gate already decided.
    pub fn authorize_entity<E: Owned>(&self, ctx: &RequestContext, entity: &E) -> Result<()> {
        match &self.pending {
            Some(req) => ctx.authorize_entity(self.server.as_deref(), req, entity),
            None => Ok(()),
        }
    }

    /// Server id of a scoped operation
    pub fn server(&self) -> Result<&str> {
        self.server.as_deref().ok_or_else(|| BanError::Invalid("Missing server id".into()))
    }
}

/// Check an operation before any business logic runs.
///
/// Mutations need a session. Record-scoped rules verify the server
/// exists before anything else, since the record can't be loaded without
/// it; plain rules decide straight away and leave existence checks to the
/// handler.
pub fn admit(ctx: &RequestContext, operation: &str, args: &Value) -> Result<Admission> {
    let decl = declaration(operation)
        .filter(|d| d.kind != Kind::Field)
        .ok_or_else(|| BanError::Invalid(format!("Unknown operation {}", operation)))?;

    if decl.kind == Kind::Mutation && ctx.caller().is_none() {
        debug!(operation, "mutation without session");
        return Err(BanError::Denied);
    }

    match decl.rule {
        Rule::Public => Ok(Admission { server: None, pending: None }),
        Rule::LoggedIn => {
            ctx.authorize(None, &Requirement::LoggedIn, None)?;
            Ok(Admission { server: None, pending: None })
        }
        Rule::AllowIf { resource, permission, server } => {
            let server = scope_server(server, args);
            ctx.authorize(server.as_deref(), &Requirement::exact(resource, permission), None)
                .inspect_err(|_| warn!(operation, caller = ?ctx.caller(), "denied"))?;
            Ok(Admission { server, pending: None })
        }
        Rule::AllowIfEntity { resource, base, server } => {
            let server = scope_server(server, args)
                .ok_or_else(|| BanError::Invalid("Missing server id".into()))?;
            if ctx.store().get_server(&server)?.is_none() {
                return Err(BanError::ServerNotFound(server));
            }
            let resource = match resource {
                ResourceRef::Fixed(r) => r,
                ResourceRef::RecordTypeArg(arg) => args
                    .get(arg)
                    .and_then(Value::as_str)
                    .and_then(RecordType::parse)
                    .map(RecordType::resource)
                    .ok_or_else(|| BanError::Invalid(format!("Invalid {}", arg)))?,
            };
            Ok(Admission { server: Some(server), pending: Some(Requirement::variants(resource, base)) })
        }
    }
}

/// Whether a protected field is visible. `parent` is the object owning the field.
///
/// Denied fields are redacted by the caller rather than failing the operation.
pub fn field_allowed(ctx: &RequestContext, field: &str, parent: &Value) -> bool {
    let Some(decl) = declaration(field).filter(|d| d.kind == Kind::Field) else {
        return true;
    };
    match decl.rule {
        Rule::Public => true,
        Rule::LoggedIn => ctx.caller().is_some(),
        Rule::AllowIf { resource, permission, server } => {
            let server = scope_server(server, parent);
            ctx.check(server.as_deref(), &Requirement::exact(resource, permission), None)
        }
        Rule::AllowIfEntity { .. } => false,
    }
}
