//! Shared fixtures: one bootstrapped store per test in its own temp dir

#![allow(dead_code)]

use std::sync::Arc;

use banman::constants::*;
use banman::db::counter;
use banman::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

pub struct TestEnv {
    pub panel: Panel,
    pub admin: Uuid,
    _dir: TempDir,
}

pub fn setup() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path().join("banman.mdb")).unwrap());
    let admin = Uuid::new_v4();
    bootstrap(&store, Some(&admin)).unwrap();
    TestEnv { panel: Panel::new(store), admin, _dir: dir }
}

pub fn setup_with_probe<P: TableProbe + 'static>(probe: P) -> TestEnv {
    let env = setup();
    TestEnv { panel: env.panel.with_probe(probe), admin: env.admin, _dir: env._dir }
}

pub fn server_input(name: &str) -> Value {
    json!({
        "name": name,
        "host": "127.0.0.1",
        "port": 3306,
        "database": "bans",
        "user": "minecraft",
        "console": Uuid::new_v4(),
    })
}

impl TestEnv {
    pub fn store(&self) -> &Store {
        self.panel.store()
    }

    pub fn run(&self, caller: Option<Uuid>, op: &str, args: Value) -> Result<Value> {
        let ctx = match caller {
            Some(p) => RequestContext::for_player(self.store(), p),
            None => RequestContext::anonymous(self.store()),
        };
        self.panel.execute(&ctx, op, args)
    }

    /// Create a server through the API as the admin, returning its id
    pub fn server(&self, name: &str) -> String {
        let v = self.run(Some(self.admin), "createServer", json!({ "input": server_input(name) })).unwrap();
        v["id"].as_str().unwrap().to_string()
    }

    /// A player seen on `server`
    pub fn player(&self, server: &str, name: &str) -> Uuid {
        self.player_from(server, name, None)
    }

    /// A player seen on `server`, joining from `ip`
    pub fn player_from(&self, server: &str, name: &str, ip: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        let player = Player { id, name: name.into(), last_seen: now(), ip: ip.map(str::to_string) };
        self.store().transact(|tx| tx.put_player(server, &player)).unwrap();
        id
    }

    pub fn report(&self, server: &str, actor: Uuid, player: Uuid, assignee: Option<Uuid>) -> u64 {
        self.store()
            .transact(|tx| {
                let id = tx.next_id(&counter(server, REPORTS_TABLE))?;
                let t = now();
                let r = Report {
                    id,
                    server: server.into(),
                    player,
                    actor,
                    assignee,
                    reason: "xray".into(),
                    state: 1,
                    created: t,
                    updated: t,
                };
                tx.put_record(server, REPORTS_TABLE, id, &r)?;
                Ok(id)
            })
            .unwrap()
    }

    pub fn punishment(&self, server: &str, kind: RecordType, actor: Uuid, player: Uuid) -> u64 {
        self.store()
            .transact(|tx| {
                let id = tx.next_id(&counter(server, kind.table()))?;
                let t = now();
                let p = Punishment {
                    id,
                    kind,
                    server: server.into(),
                    player,
                    actor,
                    reason: "spam".into(),
                    created: t,
                    updated: t,
                    expires: 0,
                    soft: false,
                    points: 0.0,
                };
                tx.put_record(server, kind.table(), id, &p)?;
                Ok(id)
            })
            .unwrap()
    }

    /// Give `player` a fresh global role holding exactly `perms`
    pub fn grant(&self, player: Uuid, perms: &[(&str, &str)]) -> u64 {
        let role = perms
            .iter()
            .fold(Role { name: "custom".into(), ..Default::default() }, |r, (res, p)| r.grant(res, p, true));
        self.store()
            .transact(|tx| {
                let role = tx.create_role(role)?;
                tx.assign_role(&player, role.id)?;
                Ok(role.id)
            })
            .unwrap()
    }
}

pub fn assert_denied(r: Result<Value>) {
    match r {
        Err(e) => {
            assert!(matches!(e, BanError::Denied), "expected denial, got {:?}", e);
            assert_eq!(e.public_message(), DENIED_MESSAGE);
            assert_eq!(e.kind(), ErrorKind::Authorization);
        }
        Ok(v) => panic!("expected denial, got {}", v),
    }
}
