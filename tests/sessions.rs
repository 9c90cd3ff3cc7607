//! Session tokens and request contexts built from them

mod common;

use banman::constants::*;
use banman::{create_session, revoke_session, validate_session, BanError, RequestContext};
use common::*;
use serde_json::json;
use uuid::Uuid;

#[test]
fn session_roundtrip() {
    let env = setup();
    let player = Uuid::new_v4();
    let token = create_session(env.store(), &player, None).unwrap();
    assert_eq!(validate_session(env.store(), &token).unwrap(), player);

    assert!(revoke_session(env.store(), &token).unwrap());
    assert!(!revoke_session(env.store(), &token).unwrap());
    assert!(matches!(validate_session(env.store(), &token), Err(BanError::Invalid(_))));
}

#[test]
fn expired_session_rejected() {
    let env = setup();
    let player = Uuid::new_v4();
    let live = create_session(env.store(), &player, Some(3600)).unwrap();
    assert!(validate_session(env.store(), &live).is_ok());

    // A zero TTL expires as soon as the clock moves on
    let stale = create_session(env.store(), &player, Some(0)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1100));
    assert!(matches!(validate_session(env.store(), &stale), Err(BanError::Invalid(m)) if m == "Session expired"));
}

#[test]
fn huge_ttl_never_expires() {
    let env = setup();
    let player = Uuid::new_v4();
    let token = create_session(env.store(), &player, Some(u64::MAX)).unwrap();
    assert_eq!(validate_session(env.store(), &token).unwrap(), player);
}

#[test]
fn bad_token_makes_anonymous_caller() {
    let env = setup();
    let ctx = RequestContext::from_token(env.store(), Some("deadbeef"));
    assert!(ctx.caller().is_none());
    let ctx = RequestContext::from_token(env.store(), None);
    assert!(ctx.caller().is_none());

    // Anonymous, so the mutation is denied rather than failing on the token
    let r = env.panel.execute(&ctx, "createRole", json!({ "input": { "name": "x" } }));
    assert_denied(r);
}

#[test]
fn token_carries_the_admin_grant() {
    let env = setup();
    let token = create_session(env.store(), &env.admin, None).unwrap();
    let ctx = env.panel.context(Some(&token));
    assert_eq!(ctx.caller(), Some(&env.admin));

    let v = env.panel.execute(&ctx, "createRole", json!({ "input": { "name": "Helper" } })).unwrap();
    assert_eq!(v["name"], json!("Helper"));

    revoke_session(env.store(), &token).unwrap();
    let ctx = env.panel.context(Some(&token));
    assert_denied(env.panel.execute(&ctx, "deleteRole", json!({ "id": v["id"] })));
}

#[test]
fn snapshot_reused_within_request() {
    let env = setup();
    let ctx = RequestContext::for_player(env.store(), env.admin);
    let a = ctx.permissions(None).unwrap();
    let b = ctx.permissions(None).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert!(a.has(SERVERS, "manage"));
}
