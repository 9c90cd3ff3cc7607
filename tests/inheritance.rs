//! Role inheritance, overrides and the permission cache

mod common;

use banman::constants::*;
use std::sync::Arc;

use banman::db::DbRoles;
use banman::{bootstrap, respond, BanError, Panel, RequestContext, Role, Store};
use common::*;
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

#[test]
fn child_inherits_and_overrides() {
    let env = setup();
    let server = env.server("Survival");
    let player = env.player(&server, "mod");

    let (parent, child) = env
        .store()
        .transact(|tx| {
            let parent = tx.create_role(
                Role { name: "Parent".into(), ..Default::default() }
                    .grant(PLAYER_NOTES, "view", true)
                    .grant(PLAYER_NOTES, "create", true),
            )?;
            let child = tx.create_role(
                Role { name: "Child".into(), parent: Some(parent.id), ..Default::default() }
                    .grant(PLAYER_NOTES, "create", false),
            )?;
            tx.assign_role(&player, child.id)?;
            Ok((parent.id, child.id))
        })
        .unwrap();
    assert_ne!(parent, child);

    let perms = env.store().effective_permissions(Some(&player), Some(&server)).unwrap();
    assert!(perms.has(PLAYER_NOTES, "view"));
    assert!(!perms.has(PLAYER_NOTES, "create"));

    let r = env.run(Some(player), "listNotes", json!({ "serverId": server }));
    assert!(r.is_ok());
    let r = env.run(Some(player), "createPlayerNote", json!({ "input": { "server": server, "player": player, "message": "hi" } }));
    assert_denied(r);
}

#[test]
fn builtin_chain_guest_logged_in_admin() {
    let env = setup();
    let anon = env.store().effective_permissions(None, None).unwrap();
    assert!(anon.has(PLAYER_BANS, "view"));
    assert!(!anon.has(PLAYER_REPORTS, "view.own"));

    let user = Uuid::new_v4();
    let logged_in = env.store().effective_permissions(Some(&user), None).unwrap();
    assert!(logged_in.has(PLAYER_BANS, "view"));
    assert!(logged_in.has(PLAYER_REPORTS, "view.own"));
    assert!(!logged_in.has(SERVERS, "manage"));

    let admin = env.store().effective_permissions(Some(&env.admin), None).unwrap();
    assert!(admin.has(SERVERS, "manage"));
    assert!(admin.has(PLAYER_REPORTS, "update.assign.any"));
}

#[test]
fn cycle_is_rejected_on_update() {
    let env = setup();
    let a = env.run(Some(env.admin), "createRole", json!({ "input": { "name": "A" } })).unwrap();
    let a = a["id"].as_u64().unwrap();
    let b = env
        .run(Some(env.admin), "createRole", json!({ "input": { "name": "B", "parent": a } }))
        .unwrap();
    let b = b["id"].as_u64().unwrap();

    let r = env.run(Some(env.admin), "updateRole", json!({ "id": a, "input": { "name": "A", "parent": b } }));
    assert!(matches!(r, Err(BanError::Invalid(_))));

    let r = env.run(Some(env.admin), "updateRole", json!({ "id": a, "input": { "name": "A", "parent": a } }));
    assert!(matches!(r, Err(BanError::Invalid(_))));
}

#[test]
fn server_roles_only_apply_on_their_server() {
    let env = setup();
    let s1 = env.server("Survival");
    let s2 = env.server("Creative");
    let player = env.player(&s1, "mod");

    let role = env
        .run(
            Some(env.admin),
            "createRole",
            json!({ "input": { "name": "Reports", "resources": [
                { "name": PLAYER_REPORTS, "permissions": [{ "name": "view.any", "allowed": true }] }
            ] } }),
        )
        .unwrap();
    let role = role["id"].as_u64().unwrap();
    env.run(Some(env.admin), "assignServerRole", json!({ "players": [player], "role": role, "serverId": s1 }))
        .unwrap();

    assert!(env.run(Some(player), "listReports", json!({ "serverId": s1 })).is_ok());
    assert_denied(env.run(Some(player), "listReports", json!({ "serverId": s2 })));
}

#[test]
fn role_changes_take_effect_immediately() {
    let env = setup();
    let server = env.server("Survival");
    let player = env.player(&server, "mod");

    assert_denied(env.run(Some(player), "listReports", json!({ "serverId": server })));

    // Warms the cache, then the grant must invalidate it
    let before = env.store().effective_permissions(Some(&player), Some(&server)).unwrap();
    assert!(!before.has(PLAYER_REPORTS, "view.any"));
    let role = env.grant(player, &[(PLAYER_REPORTS, "view.any")]);
    assert!(env.run(Some(player), "listReports", json!({ "serverId": server })).is_ok());

    env.run(Some(env.admin), "deleteRole", json!({ "id": role })).unwrap();
    assert_denied(env.run(Some(player), "listReports", json!({ "serverId": server })));
}

#[test]
fn stored_cycle_is_a_uniform_denial() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("banman.mdb");
    let player = Uuid::new_v4();
    let (a, b) = {
        let store = Store::open(&path).unwrap();
        bootstrap(&store, None).unwrap();
        store
            .transact(|tx| {
                let a = tx.create_role(Role { name: "A".into(), ..Default::default() })?;
                let b = tx.create_role(Role { name: "B".into(), parent: Some(a.id), ..Default::default() })?;
                tx.assign_role(&player, b.id)?;
                Ok((a, b))
            })
            .unwrap()
    };

    // Write A -> B straight into the roles table, past the cycle check
    {
        let env = unsafe { heed::EnvOpenOptions::new().map_size(1 << 30).max_dbs(11).open(&path).unwrap() };
        let mut wtxn = env.write_txn().unwrap();
        let roles: DbRoles = env.open_database(&wtxn, Some("roles")).unwrap().unwrap();
        let looped = Role { parent: Some(b.id), ..a };
        roles.put(&mut wtxn, &looped.id, &serde_json::to_vec(&looped).unwrap()).unwrap();
        wtxn.commit().unwrap();
        env.prepare_for_closing().wait();
    }

    let store = Arc::new(Store::open(&path).unwrap());
    let panel = Panel::new(store.clone());
    let ctx = RequestContext::for_player(&store, player);
    let r = panel.execute(&ctx, "roles", json!({}));
    assert!(matches!(r, Err(BanError::CycleDetected(_))));
    let body = respond(r);
    assert_eq!(body["data"], serde_json::Value::Null);
    assert_eq!(body["errors"][0]["message"], json!(DENIED_MESSAGE));
    assert_eq!(body["errors"][0]["kind"], json!("integrity"));

    // Callers outside the loop are unaffected
    let anon = RequestContext::anonymous(&store);
    assert!(panel.execute(&anon, "servers", json!({})).is_ok());
}
