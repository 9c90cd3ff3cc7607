//! Operation gate: sessions, scoping and field redaction

mod common;

use banman::constants::*;
use banman::{now, respond, BanError, RecordType, ReportCommand, ReportServerLog, Role};
use common::*;
use serde_json::{json, Value};

const MUTATIONS: &[&str] = &[
    "createPlayerBan",
    "updatePlayerBan",
    "deletePunishmentRecord",
    "createServer",
    "deleteServer",
    "createRole",
    "deleteRole",
    "setRoles",
    "assignReport",
    "reportState",
    "createReportComment",
    "deleteReportComment",
    "setEmail",
];

#[test]
fn every_mutation_needs_a_session() {
    let env = setup();
    let server = env.server("Survival");
    for op in MUTATIONS {
        let r = env.run(None, op, json!({ "id": 1, "serverId": server, "input": { "server": server } }));
        assert!(matches!(r, Err(BanError::Denied)), "{} was not denied", op);
    }
}

#[test]
fn denial_envelope_is_uniform() {
    let env = setup();
    let a = respond(env.run(None, "createRole", json!({ "input": { "name": "x" } })));
    let b = respond(env.run(None, "deleteServer", json!({ "id": "1" })));
    assert_eq!(a, b);
    assert_eq!(a["data"], Value::Null);
    assert_eq!(a["errors"][0]["message"], json!(DENIED_MESSAGE));
    assert_eq!(a["errors"][0]["kind"], json!("authorization"));
}

#[test]
fn unknown_operation_rejected() {
    let env = setup();
    let r = env.run(Some(env.admin), "dropDatabase", json!({}));
    assert!(matches!(r, Err(BanError::Invalid(_))));
    // Field rules are not callable operations
    let r = env.run(Some(env.admin), "Server.host", json!({}));
    assert!(matches!(r, Err(BanError::Invalid(_))));
}

#[test]
fn server_scope_cannot_be_borrowed() {
    let env = setup();
    let s1 = env.server("Survival");
    let s2 = env.server("Creative");
    let me = env.player(&s1, "me");
    let victim = env.player(&s2, "victim");

    env.store()
        .transact(|tx| {
            let role = tx.create_role(Role { name: "Noter".into(), ..Default::default() }.grant(PLAYER_NOTES, "create", true))?;
            tx.assign_server_role(&me, &s1, role.id)
        })
        .unwrap();

    let ok = env.run(Some(me), "createPlayerNote", json!({ "input": { "server": s1, "player": me, "message": "note" } }));
    assert!(ok.is_ok());
    let r = env.run(Some(me), "createPlayerNote", json!({ "input": { "server": s2, "player": victim, "message": "note" } }));
    assert_denied(r);
}

#[test]
fn missing_scope_argument_is_denied_not_defaulted() {
    let env = setup();
    let server = env.server("Survival");
    let me = env.player(&server, "me");
    env.store().transact(|tx| tx.assign_server_role(&me, &server, ROLE_ADMIN)).unwrap();

    // Without serverId the check runs against global roles only
    assert_denied(env.run(Some(me), "listReports", json!({})));
    assert!(env.run(Some(me), "listReports", json!({ "serverId": server })).is_ok());
}

#[test]
fn record_type_argument_picks_resource() {
    let env = setup();
    let server = env.server("Survival");
    let me = env.player(&server, "me");
    env.grant(me, &[(PLAYER_MUTES, "delete.any")]);
    let ban = env.punishment(&server, RecordType::PlayerBan, me, me);
    let mute = env.punishment(&server, RecordType::PlayerMute, me, me);

    assert_denied(env.run(Some(me), "deletePunishmentRecord", json!({ "id": ban, "serverId": server, "type": "PlayerBan" })));
    assert!(env.run(Some(me), "deletePunishmentRecord", json!({ "id": mute, "serverId": server, "type": "PlayerMute" })).is_ok());

    let r = env.run(Some(me), "deletePunishmentRecord", json!({ "id": mute, "serverId": server, "type": "PlayerPin" }));
    assert!(matches!(r, Err(BanError::Invalid(_))));
}

#[test]
fn server_connection_fields_redacted() {
    let env = setup();
    let server = env.server("Survival");
    let me = env.player(&server, "me");

    for caller in [None, Some(me)] {
        let v = env.run(caller, "server", json!({ "id": server })).unwrap();
        assert_eq!(v["name"], json!("Survival"));
        for field in ["host", "port", "database", "user", "console", "tables"] {
            assert!(v[field].is_null(), "{} leaked", field);
        }
    }

    let v = env.run(Some(env.admin), "servers", json!({})).unwrap();
    assert_eq!(v[0]["host"], json!("127.0.0.1"));
    assert_eq!(v[0]["tables"]["players"], json!("bm_players"));
}

#[test]
fn player_record_lists_follow_view_grants() {
    let env = setup();
    let server = env.server("Survival");
    let p = env.player(&server, "p");
    env.punishment(&server, RecordType::PlayerBan, p, p);
    env.punishment(&server, RecordType::PlayerNote, p, p);

    let v = env.run(None, "player", json!({ "id": p })).unwrap();
    let entry = &v["servers"][0];
    assert_eq!(entry["bans"].as_array().unwrap().len(), 1);
    // Guests may not view notes
    assert!(entry["notes"].is_null());
    assert!(v["email"].is_null());
    assert_eq!(entry["acl"]["bans"], json!({ "create": false, "update": false, "delete": false }));

    let v = env.run(Some(env.admin), "player", json!({ "id": p })).unwrap();
    assert_eq!(v["servers"][0]["notes"].as_array().unwrap().len(), 1);
    assert_eq!(v["servers"][0]["acl"]["notes"], json!({ "create": true, "update": true, "delete": true }));
}

#[test]
fn report_logs_and_commands_need_their_grants() {
    let env = setup();
    let server = env.server("Survival");
    let (me, other) = (env.player(&server, "me"), env.player(&server, "other"));
    env.grant(me, &[(PLAYER_REPORTS, "view.any"), (PLAYER_REPORTS, "view.commands")]);
    let report = env.report(&server, other, other, None);
    env.store()
        .transact(|tx| {
            let log = ReportServerLog { id: 1, report, message: "<other> found diamonds".into(), created: now() };
            tx.put_record(&server, REPORT_LOGS_TABLE, 1, &log)?;
            let cmd = ReportCommand {
                id: 1,
                report,
                actor: other,
                command: "/fly".into(),
                args: None,
                created: now(),
                updated: now(),
            };
            tx.put_record(&server, REPORT_COMMANDS_TABLE, 1, &cmd)
        })
        .unwrap();

    let v = env.run(Some(me), "report", json!({ "id": report, "serverId": server })).unwrap();
    assert!(v["serverLogs"].is_null());
    assert_eq!(v["commands"][0]["command"], json!("/fly"));

    let v = env.run(Some(env.admin), "report", json!({ "id": report, "serverId": server })).unwrap();
    assert_eq!(v["serverLogs"][0]["message"], json!("<other> found diamonds"));
}

#[test]
fn addresses_and_alts_need_their_grants() {
    let env = setup();
    let server = env.server("Survival");
    let main = env.player_from(&server, "main", Some("10.0.0.7"));
    let alt = env.player_from(&server, "alt", Some("10.0.0.7"));
    env.player_from(&server, "stranger", Some("10.0.0.8"));
    let me = env.player(&server, "me");

    let v = env.run(Some(me), "player", json!({ "id": main })).unwrap();
    assert!(v["servers"][0]["ip"].is_null());
    assert!(v["servers"][0]["alts"].is_null());

    env.grant(me, &[(PLAYER_ALTS, "view")]);
    let v = env.run(Some(me), "player", json!({ "id": main })).unwrap();
    assert!(v["servers"][0]["ip"].is_null());
    assert_eq!(v["servers"][0]["alts"], json!([{ "id": alt, "name": "alt" }]));

    let v = env.run(Some(env.admin), "player", json!({ "id": main })).unwrap();
    assert_eq!(v["servers"][0]["ip"], json!("10.0.0.7"));
}
