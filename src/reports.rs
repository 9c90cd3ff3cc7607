//! Player report operations

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::acl::{comment_acl, report_acl};
use crate::constants::*;
use crate::context::RequestContext;
use crate::db::counter;
use crate::error::{BanError, Result};
use crate::gate::{self, Admission};
use crate::model::{now, PlayerId, Report, ReportCommand, ReportComment, ReportServerLog, ReportState};
use crate::panel::{arg_server, page, parse, to_object, to_value, with_acl, Panel};

#[derive(Deserialize)]
struct ReportArgs {
    id: u64,
}

#[derive(Deserialize)]
struct ListReportsArgs {
    actor: Option<PlayerId>,
    assigned: Option<PlayerId>,
    player: Option<PlayerId>,
    state: Option<u64>,
    limit: Option<usize>,
    offset: Option<usize>,
    order: Option<Order>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
enum Order {
    #[serde(rename = "created_ASC")]
    CreatedAsc,
    #[default]
    #[serde(rename = "created_DESC")]
    CreatedDesc,
}

#[derive(Deserialize)]
struct AssignArgs {
    report: u64,
    player: PlayerId,
}

#[derive(Deserialize)]
struct StateArgs {
    report: u64,
    state: u64,
}

#[derive(Deserialize)]
struct CommentArgs {
    report: u64,
    input: CommentInput,
}

#[derive(Deserialize)]
struct CommentInput {
    #[serde(alias = "comment")]
    message: String,
}

#[derive(Deserialize)]
struct DeleteCommentArgs {
    #[serde(alias = "id")]
    comment: u64,
}

impl Panel {
    fn load_report(&self, server: &str, id: u64) -> Result<Report> {
        self.store()
            .get_record(server, REPORTS_TABLE, id)?
            .ok_or(BanError::ReportNotFound(id))
    }

    /// Report with its ACL and, when the caller may see them, its comments
    fn report_view(&self, ctx: &RequestContext, server: &str, report: &Report) -> Result<Value> {
        let perms = ctx.permissions(Some(server))?;
        let mut v = to_object(report)?;
        v.insert("acl".into(), to_value(report_acl(&perms, ctx.caller(), report))?);

        let parent = json!({ "server": server });
        let comments = if gate::field_allowed(ctx, "PlayerReport.comments", &parent) {
            let mut rows = Vec::new();
            for c in self.store().list_records::<ReportComment>(server, REPORT_COMMENTS_TABLE)? {
                if c.report == report.id {
                    rows.push(with_acl(&c, comment_acl(&perms, ctx.caller(), &c))?);
                }
            }
            Value::Array(rows)
        } else {
            Value::Null
        };
        v.insert("comments".into(), comments);

        let logs = if gate::field_allowed(ctx, "PlayerReport.serverLogs", &parent) {
            let rows: Vec<ReportServerLog> = self
                .store()
                .list_records::<ReportServerLog>(server, REPORT_LOGS_TABLE)?
                .into_iter()
                .filter(|l| l.report == report.id)
                .collect();
            to_value(rows)?
        } else {
            Value::Null
        };
        v.insert("serverLogs".into(), logs);

        let commands = if gate::field_allowed(ctx, "PlayerReport.commands", &parent) {
            let rows: Vec<ReportCommand> = self
                .store()
                .list_records::<ReportCommand>(server, REPORT_COMMANDS_TABLE)?
                .into_iter()
                .filter(|c| c.report == report.id)
                .collect();
            to_value(rows)?
        } else {
            Value::Null
        };
        v.insert("commands".into(), commands);
        Ok(Value::Object(v))
    }

    pub(crate) fn report(&self, ctx: &RequestContext, adm: &Admission, args: Value) -> Result<Value> {
        let a: ReportArgs = parse(args)?;
        let server = adm.server()?;
        let report = self.load_report(server, a.id)?;
        adm.authorize_entity(ctx, &report)?;
        self.report_view(ctx, server, &report)
    }

    pub(crate) fn list_reports(&self, ctx: &RequestContext, adm: &Admission, args: Value) -> Result<Value> {
        let a: ListReportsArgs = parse(args)?;
        let server = adm.server()?;
        self.require_server(server)?;

        let mut rows: Vec<Report> = self
            .store()
            .list_records::<Report>(server, REPORTS_TABLE)?
            .into_iter()
            .filter(|r| a.actor.map_or(true, |p| r.actor == p))
            .filter(|r| a.assigned.map_or(true, |p| r.assignee == Some(p)))
            .filter(|r| a.player.map_or(true, |p| r.player == p))
            .filter(|r| a.state.map_or(true, |s| r.state == s))
            .collect();
        match a.order.unwrap_or_default() {
            Order::CreatedAsc => rows.sort_by_key(|r| (r.created, r.id)),
            Order::CreatedDesc => rows.sort_by(|x, y| (y.created, y.id).cmp(&(x.created, x.id))),
        }
        let total = rows.len();

        // One snapshot for every row
        let perms = ctx.permissions(Some(server))?;
        let records = page(rows, a.limit, a.offset)
            .iter()
            .map(|r| with_acl(r, report_acl(&perms, ctx.caller(), r)))
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({ "total": total, "records": records }))
    }

    pub(crate) fn report_states(&self, args: Value) -> Result<Value> {
        let server = arg_server(&args)?;
        self.require_server(&server)?;
        let states: Vec<ReportState> = self.store().list_records(&server, REPORT_STATES_TABLE)?;
        to_value(states)
    }

    /// Assign a report. Order: server, report, permission, then the assignee must exist.
    pub(crate) fn assign_report(&self, ctx: &RequestContext, adm: &Admission, args: Value) -> Result<Value> {
        let a: AssignArgs = parse(args)?;
        let server = adm.server()?;
        let mut report = self.load_report(server, a.report)?;
        adm.authorize_entity(ctx, &report)?;
        self.require_player(server, &a.player)?;

        report.assignee = Some(a.player);
        report.state = REPORT_STATE_ASSIGNED;
        report.updated = now();
        self.store().transact(|tx| tx.put_record(server, REPORTS_TABLE, report.id, &report))?;
        info!(server, report = report.id, assignee = %a.player, "report assigned");
        self.report_view(ctx, server, &report)
    }

    pub(crate) fn report_state(&self, ctx: &RequestContext, adm: &Admission, args: Value) -> Result<Value> {
        let a: StateArgs = parse(args)?;
        let server = adm.server()?;
        let mut report = self.load_report(server, a.report)?;
        adm.authorize_entity(ctx, &report)?;
        if self.store().get_record::<ReportState>(server, REPORT_STATES_TABLE, a.state)?.is_none() {
            return Err(BanError::ReportStateNotFound(a.state));
        }

        report.state = a.state;
        report.updated = now();
        self.store().transact(|tx| tx.put_record(server, REPORTS_TABLE, report.id, &report))?;
        info!(server, report = report.id, state = a.state, "report state changed");
        self.report_view(ctx, server, &report)
    }

    pub(crate) fn create_report_comment(&self, ctx: &RequestContext, adm: &Admission, args: Value) -> Result<Value> {
        let a: CommentArgs = parse(args)?;
        let server = adm.server()?;
        let report = self.load_report(server, a.report)?;
        adm.authorize_entity(ctx, &report)?;

        let message = a.input.message.trim();
        if message.is_empty() || message.chars().count() > MAX_REASON_LEN {
            return Err(BanError::Invalid(format!("Comment must be between 1 and {} characters", MAX_REASON_LEN)));
        }
        let actor = *ctx.caller().ok_or(BanError::Denied)?;
        let t = now();
        let comment = self.store().transact(|tx| {
            let id = tx.next_id(&counter(server, REPORT_COMMENTS_TABLE))?;
            let c = ReportComment {
                id,
                server: server.to_string(),
                report: report.id,
                actor,
                message: message.to_string(),
                created: t,
                updated: t,
            };
            tx.put_record(server, REPORT_COMMENTS_TABLE, id, &c)?;
            Ok(c)
        })?;

        let perms = ctx.permissions(Some(server))?;
        with_acl(&comment, comment_acl(&perms, ctx.caller(), &comment))
    }

    pub(crate) fn delete_report_comment(&self, ctx: &RequestContext, adm: &Admission, args: Value) -> Result<Value> {
        let a: DeleteCommentArgs = parse(args)?;
        let server = adm.server()?;
        let comment: ReportComment = self
            .store()
            .get_record(server, REPORT_COMMENTS_TABLE, a.comment)?
            .ok_or(BanError::CommentNotFound(a.comment))?;
        adm.authorize_entity(ctx, &comment)?;

        self.store().transact(|tx| tx.delete_record(server, REPORT_COMMENTS_TABLE, comment.id))?;
        info!(server, comment = comment.id, "report comment deleted");
        to_value(comment)
    }
}
