//! The caller's own account and public player profiles

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::acl::{entity_acl, player_server_acl};
use crate::context::RequestContext;
use crate::error::{BanError, Result};
use crate::gate;
use crate::model::{Account, Player, PlayerId, Punishment, RecordType};
use crate::panel::{parse, to_value, with_acl, Panel};

#[derive(Deserialize)]
struct EmailArgs {
    email: String,
}

#[derive(Deserialize)]
struct PlayerArgs {
    id: PlayerId,
}

/// Loose shape check: one `@`, something before it, a dotted domain after it
pub fn valid_email(email: &str) -> bool {
    if email.len() > 255 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() > 1
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

impl Panel {
    pub(crate) fn me(&self, ctx: &RequestContext) -> Result<Value> {
        let Some(caller) = ctx.caller() else {
            return Ok(Value::Null);
        };
        let account = self.store().get_account(caller)?;
        Ok(json!({
            "id": caller,
            "email": account.as_ref().and_then(|a| a.email.clone()),
            "hasAccount": account.is_some(),
        }))
    }

    pub(crate) fn set_email(&self, ctx: &RequestContext, args: Value) -> Result<Value> {
        let EmailArgs { email } = parse(args)?;
        let caller = *ctx.caller().ok_or(BanError::Denied)?;
        let email = email.trim().to_string();
        if !valid_email(&email) {
            return Err(BanError::Invalid("Invalid email address".into()));
        }
        let taken = self
            .store()
            .list_accounts()?
            .into_iter()
            .any(|a| a.id != caller && a.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(&email)));
        if taken {
            return Err(BanError::Invalid("Email address already in use".into()));
        }

        self.store().transact(|tx| tx.put_account(&Account { id: caller, email: Some(email) }))?;
        info!(player = %caller, "email updated");
        self.me(ctx)
    }

    /// Other players on the server sharing this player's address
    fn alts(&self, ctx: &RequestContext, server: &str, player: &Player, parent: &Value) -> Result<Value> {
        if !gate::field_allowed(ctx, "PlayerServer.alts", parent) {
            return Ok(Value::Null);
        }
        let Some(ip) = &player.ip else {
            return Ok(json!([]));
        };
        let alts: Vec<Value> = self
            .store()
            .list_players(server)?
            .into_iter()
            .filter(|p| p.id != player.id && p.ip.as_ref() == Some(ip))
            .map(|p| json!({ "id": p.id, "name": p.name }))
            .collect();
        Ok(Value::Array(alts))
    }

    /// Player profile: one entry per server the player has been seen on,
    /// with record lists redacted where the caller may not view them.
    pub(crate) fn player(&self, ctx: &RequestContext, args: Value) -> Result<Value> {
        let PlayerArgs { id } = parse(args)?;
        let seen = self.store().player_servers(&id)?;
        let Some(name) = seen.first().map(|(_, p)| p.name.clone()) else {
            return Ok(Value::Null);
        };

        let mut servers = Vec::new();
        for (server, player) in &seen {
            let perms = ctx.permissions(Some(&server.id))?;
            let parent = json!({ "server": server.id });
            let mut entry = Map::new();
            entry.insert("server".into(), json!({ "id": server.id, "name": server.name }));
            entry.insert("lastSeen".into(), json!(player.last_seen));
            let ip = match gate::field_allowed(ctx, "PlayerServer.ip", &parent) {
                true => json!(player.ip),
                false => Value::Null,
            };
            entry.insert("ip".into(), ip);
            entry.insert("alts".into(), self.alts(ctx, &server.id, player, &parent)?);
            for (field, kind) in [
                ("bans", RecordType::PlayerBan),
                ("kicks", RecordType::PlayerKick),
                ("mutes", RecordType::PlayerMute),
                ("notes", RecordType::PlayerNote),
                ("warnings", RecordType::PlayerWarning),
            ] {
                let v = if gate::field_allowed(ctx, &format!("PlayerServer.{}", field), &parent) {
                    let rows = self
                        .store()
                        .list_records::<Punishment>(&server.id, kind.table())?
                        .into_iter()
                        .filter(|p| p.player == id)
                        .map(|p| with_acl(&p, entity_acl(&perms, ctx.caller(), kind.resource(), &p)))
                        .collect::<Result<Vec<_>>>()?;
                    Value::Array(rows)
                } else {
                    Value::Null
                };
                entry.insert(field.into(), v);
            }
            entry.insert("acl".into(), to_value(player_server_acl(&perms))?);
            servers.push(Value::Object(entry));
        }

        let mut profile = Map::new();
        profile.insert("id".into(), json!(id));
        profile.insert("name".into(), json!(name));
        profile.insert("servers".into(), Value::Array(servers));
        let visible = |field: &str| gate::field_allowed(ctx, &format!("Player.{}", field), &Value::Null);
        let email = match visible("email") {
            true => json!(self.store().get_account(&id)?.and_then(|a| a.email)),
            false => Value::Null,
        };
        let roles = match visible("roles") {
            true => to_value(self.store().player_roles(&id)?)?,
            false => Value::Null,
        };
        let server_roles = match visible("serverRoles") {
            true => to_value(self.store().player_server_roles(&id)?)?,
            false => Value::Null,
        };
        profile.insert("email".into(), email);
        profile.insert("roles".into(), roles);
        profile.insert("serverRoles".into(), server_roles);
        Ok(Value::Object(profile))
    }
}
