//! Bans, kicks, mutes, notes and warnings

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::acl::entity_acl;
use crate::constants::MAX_REASON_LEN;
use crate::context::RequestContext;
use crate::db::counter;
use crate::error::{BanError, Result};
use crate::gate::Admission;
use crate::model::{now, PlayerId, Punishment, RecordType};
use crate::panel::{page, parse, to_value, with_acl, Panel};

fn record_type(operation: &str) -> Result<RecordType> {
    let t = match operation {
        "playerBan" | "listBans" | "createPlayerBan" | "updatePlayerBan" => RecordType::PlayerBan,
        "playerKick" | "listKicks" => RecordType::PlayerKick,
        "playerMute" | "listMutes" | "createPlayerMute" | "updatePlayerMute" => RecordType::PlayerMute,
        "playerNote" | "listNotes" | "createPlayerNote" | "updatePlayerNote" => RecordType::PlayerNote,
        "playerWarning" | "listWarnings" | "createPlayerWarning" | "updatePlayerWarning" => {
            RecordType::PlayerWarning
        }
        _ => return Err(BanError::Invalid(format!("Unknown operation {}", operation))),
    };
    Ok(t)
}

#[derive(Deserialize)]
struct IdArgs {
    id: u64,
}

#[derive(Deserialize)]
struct ListArgs {
    actor: Option<PlayerId>,
    player: Option<PlayerId>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Deserialize)]
struct CreateArgs {
    input: CreateInput,
}

#[derive(Deserialize)]
struct CreateInput {
    player: PlayerId,
    #[serde(alias = "message")]
    reason: String,
    #[serde(default)]
    expires: u64,
    #[serde(default)]
    soft: bool,
    #[serde(default)]
    points: f64,
}

#[derive(Deserialize)]
struct UpdateArgs {
    id: u64,
    input: UpdateInput,
}

#[derive(Deserialize)]
struct UpdateInput {
    #[serde(alias = "message")]
    reason: String,
    expires: Option<u64>,
    soft: Option<bool>,
    points: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteArgs {
    id: u64,
    #[serde(rename = "type")]
    kind: RecordType,
    #[serde(default = "keep_by_default")]
    keep_history: bool,
}

fn keep_by_default() -> bool {
    true
}

fn check_reason(reason: &str) -> Result<()> {
    if reason.trim().is_empty() || reason.chars().count() > MAX_REASON_LEN {
        return Err(BanError::Invalid(format!("Reason must be between 1 and {} characters", MAX_REASON_LEN)));
    }
    Ok(())
}

fn is_active(p: &Punishment, at: u64) -> bool {
    p.expires == 0 || p.expires > at
}

impl Panel {
    fn load_punishment(&self, server: &str, kind: RecordType, id: u64) -> Result<Punishment> {
        self.store()
            .get_record(server, kind.table(), id)?
            .ok_or(BanError::RecordNotFound { kind: kind.label(), id })
    }

    fn punishment_view(&self, ctx: &RequestContext, server: &str, p: &Punishment) -> Result<Value> {
        let perms = ctx.permissions(Some(server))?;
        with_acl(p, entity_acl(&perms, ctx.caller(), p.kind.resource(), p))
    }

    pub(crate) fn punishment(&self, ctx: &RequestContext, adm: &Admission, operation: &str, args: Value) -> Result<Value> {
        let kind = record_type(operation)?;
        let a: IdArgs = parse(args)?;
        let server = adm.server()?;
        self.require_server(server)?;
        let p = self.load_punishment(server, kind, a.id)?;
        self.punishment_view(ctx, server, &p)
    }

    pub(crate) fn list_punishments(&self, ctx: &RequestContext, adm: &Admission, operation: &str, args: Value) -> Result<Value> {
        let kind = record_type(operation)?;
        let a: ListArgs = parse(args)?;
        let server = adm.server()?;
        self.require_server(server)?;

        let mut rows: Vec<Punishment> = self
            .store()
            .list_records::<Punishment>(server, kind.table())?
            .into_iter()
            .filter(|p| a.actor.map_or(true, |x| p.actor == x))
            .filter(|p| a.player.map_or(true, |x| p.player == x))
            .collect();
        rows.sort_by(|x, y| (y.created, y.id).cmp(&(x.created, x.id)));
        let total = rows.len();

        let perms = ctx.permissions(Some(server))?;
        let records = page(rows, a.limit, a.offset)
            .iter()
            .map(|p| with_acl(p, entity_acl(&perms, ctx.caller(), kind.resource(), p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({ "total": total, "records": records }))
    }

    pub(crate) fn create_punishment(&self, ctx: &RequestContext, adm: &Admission, operation: &str, args: Value) -> Result<Value> {
        let kind = record_type(operation)?;
        let CreateArgs { input } = parse(args)?;
        let server = adm.server()?;
        self.require_server(server)?;
        self.require_player(server, &input.player)?;
        check_reason(&input.reason)?;
        let actor = *ctx.caller().ok_or(BanError::Denied)?;

        let t = now();
        let p = self.store().transact(|tx| {
            // Must share the write txn with the insert
            if matches!(kind, RecordType::PlayerBan | RecordType::PlayerMute) {
                let existing = tx.list_records::<Punishment>(server, kind.table())?;
                if existing.iter().any(|p| p.player == input.player && is_active(p, t)) {
                    return Err(BanError::Invalid(format!(
                        "Player already has an active {} on this server",
                        kind.label().to_lowercase()
                    )));
                }
            }
            let id = tx.next_id(&counter(server, kind.table()))?;
            let p = Punishment {
                id,
                kind,
                server: server.to_string(),
                player: input.player,
                actor,
                reason: input.reason.trim().to_string(),
                created: t,
                updated: t,
                expires: input.expires,
                soft: input.soft,
                points: input.points,
            };
            tx.put_record(server, kind.table(), id, &p)?;
            Ok(p)
        })?;
        info!(server, kind = kind.label(), id = p.id, player = %p.player, "punishment created");
        self.punishment_view(ctx, server, &p)
    }

    pub(crate) fn update_punishment(&self, ctx: &RequestContext, adm: &Admission, operation: &str, args: Value) -> Result<Value> {
        let kind = record_type(operation)?;
        let UpdateArgs { id, input } = parse(args)?;
        let server = adm.server()?;
        let mut p = self.load_punishment(server, kind, id)?;
        adm.authorize_entity(ctx, &p)?;
        check_reason(&input.reason)?;

        p.reason = input.reason.trim().to_string();
        p.expires = input.expires.unwrap_or(p.expires);
        p.soft = input.soft.unwrap_or(p.soft);
        p.points = input.points.unwrap_or(p.points);
        p.updated = now();
        self.store().transact(|tx| tx.put_record(server, kind.table(), p.id, &p))?;
        info!(server, kind = kind.label(), id = p.id, "punishment updated");
        self.punishment_view(ctx, server, &p)
    }

    /// Delete a record, optionally moving it into its history table first
    pub(crate) fn delete_punishment_record(&self, ctx: &RequestContext, adm: &Admission, args: Value) -> Result<Value> {
        let a: DeleteArgs = parse(args)?;
        let server = adm.server()?;
        let p = self.load_punishment(server, a.kind, a.id)?;
        adm.authorize_entity(ctx, &p)?;

        let history = a.kind.history_table().filter(|_| a.keep_history);
        self.store().transact(|tx| {
            if let Some(table) = history {
                let id = tx.next_id(&counter(server, table))?;
                let mut old = p.clone();
                old.id = id;
                old.updated = now();
                tx.put_record(server, table, id, &old)?;
            }
            tx.delete_record(server, a.kind.table(), p.id)
        })?;
        info!(server, kind = a.kind.label(), id = p.id, kept = history.is_some(), "punishment deleted");
        to_value(p.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_map_to_types() {
        assert_eq!(record_type("listKicks").unwrap(), RecordType::PlayerKick);
        assert_eq!(record_type("updatePlayerNote").unwrap(), RecordType::PlayerNote);
        assert!(record_type("createPlayerKick").is_err());
    }

    #[test]
    fn reasons() {
        assert!(check_reason("griefing spawn").is_ok());
        assert!(check_reason("  ").is_err());
        assert!(check_reason(&"x".repeat(MAX_REASON_LEN + 1)).is_err());
    }
}
