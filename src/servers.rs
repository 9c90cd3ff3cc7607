//! Game server configuration

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::constants::*;
use crate::context::RequestContext;
use crate::db::counter;
use crate::error::{BanError, Result};
use crate::gate;
use crate::model::{default_tables, now, Player, PlayerId, ReportState, Server, ServerTables};
use crate::panel::{parse, to_object, to_value, Panel};
use crate::tx::Tx;

const PROTECTED_FIELDS: [&str; 6] = ["host", "port", "database", "user", "console", "tables"];

#[derive(Deserialize)]
struct ServerInput {
    name: String,
    host: String,
    port: u16,
    database: String,
    user: String,
    console: PlayerId,
    #[serde(default)]
    tables: ServerTables,
}

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
struct CreateArgs {
    input: ServerInput,
}

#[derive(Deserialize)]
struct UpdateArgs {
    id: String,
    input: ServerInput,
}

fn required(field: &str, v: &str) -> Result<()> {
    if v.trim().is_empty() {
        return Err(BanError::Invalid(format!("{} is required", field)));
    }
    Ok(())
}

impl ServerInput {
    fn into_server(self, id: String) -> Result<Server> {
        required("Name", &self.name)?;
        required("Host", &self.host)?;
        required("Database", &self.database)?;
        required("User", &self.user)?;
        if self.name.chars().count() > MAX_SERVER_NAME_LEN {
            return Err(BanError::Invalid(format!("Name must be at most {} characters", MAX_SERVER_NAME_LEN)));
        }
        let mut tables = default_tables();
        tables.extend(self.tables);
        Ok(Server {
            id,
            name: self.name.trim().to_string(),
            host: self.host,
            port: self.port,
            database: self.database,
            user: self.user,
            console: self.console,
            tables,
        })
    }
}

/// Console player is the actor of punishments issued from the game console
fn put_console(tx: &mut Tx, server: &Server) -> Result<()> {
    if tx.player_exists(&server.id, &server.console)? {
        return Ok(());
    }
    tx.put_player(&server.id, &Player { id: server.console, name: "Console".into(), last_seen: now(), ip: None })
}

impl Panel {
    /// Server as the caller may see it: connection details are redacted unless permitted
    fn server_view(&self, ctx: &RequestContext, server: &Server) -> Result<Value> {
        let mut v: Map<String, Value> = to_object(server)?;
        let parent = Value::Object(v.clone());
        for field in PROTECTED_FIELDS {
            if !gate::field_allowed(ctx, &format!("Server.{}", field), &parent) {
                v.insert(field.into(), Value::Null);
            }
        }
        Ok(Value::Object(v))
    }

    pub(crate) fn servers(&self, ctx: &RequestContext) -> Result<Value> {
        let views = self
            .store()
            .list_servers()?
            .iter()
            .map(|s| self.server_view(ctx, s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(views))
    }

    pub(crate) fn server(&self, ctx: &RequestContext, args: Value) -> Result<Value> {
        let a: IdArgs = parse(args)?;
        match self.store().get_server(&a.id)? {
            Some(s) => self.server_view(ctx, &s),
            None => Ok(Value::Null),
        }
    }

    /// Name must be unique, configured tables must exist, and the console
    /// player must be in the server's players table.
    fn validate_server(&self, server: &Server) -> Result<()> {
        let clash = self
            .store()
            .list_servers()?
            .into_iter()
            .any(|s| s.id != server.id && s.name.eq_ignore_ascii_case(&server.name));
        if clash {
            return Err(BanError::DuplicateServerName);
        }

        let missing = self.probe.missing_tables(server)?;
        if !missing.is_empty() {
            return Err(BanError::TablesMissing(missing));
        }

        let players = server.table(PLAYERS_TABLE);
        if !self.probe.player_exists(server, &players, &server.console)? {
            return Err(BanError::ConsoleNotFound(players));
        }
        Ok(())
    }

    pub(crate) fn create_server(&self, args: Value) -> Result<Value> {
        let CreateArgs { input } = parse(args)?;
        // Validated with a placeholder id; the real one is only taken on success
        let mut server = input.into_server(String::new())?;
        self.validate_server(&server)?;

        let server = self.store().transact(|tx| {
            server.id = tx.next_id("server")?.to_string();
            tx.put_server(&server)?;
            for (id, name) in DEFAULT_REPORT_STATES {
                tx.put_record(&server.id, REPORT_STATES_TABLE, *id, &ReportState { id: *id, name: name.to_string() })?;
            }
            tx.set_next_id(&counter(&server.id, REPORT_STATES_TABLE), DEFAULT_REPORT_STATES.len() as u64 + 1)?;
            put_console(tx, &server)?;
            Ok(server)
        })?;
        info!(id = %server.id, name = %server.name, "server created");
        to_value(server)
    }

    pub(crate) fn update_server(&self, args: Value) -> Result<Value> {
        let UpdateArgs { id, input } = parse(args)?;
        self.require_server(&id)?;
        let server = input.into_server(id)?;
        self.validate_server(&server)?;

        self.store().transact(|tx| {
            tx.put_server(&server)?;
            put_console(tx, &server)
        })?;
        info!(id = %server.id, "server updated");
        to_value(server)
    }

    pub(crate) fn delete_server(&self, args: Value) -> Result<Value> {
        let IdArgs { id } = parse(args)?;
        self.require_server(&id)?;
        self.store().transact(|tx| tx.delete_server(&id))?;
        info!(%id, "server deleted");
        to_value(id)
    }
}
