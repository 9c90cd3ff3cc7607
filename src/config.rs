//! Runtime configuration from the environment

use std::env;

use uuid::Uuid;

use crate::model::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// LMDB directory (`BANMAN_DB`)
    pub db_path: String,
    /// HTTP listen port (`PORT`)
    pub port: u16,
    /// Session lifetime in seconds, `None` = never expires (`BANMAN_SESSION_TTL`)
    pub session_ttl: Option<u64>,
    /// Player made Admin on first start (`BANMAN_ROOT`)
    pub root: Option<PlayerId>,
}

impl Default for Config {
    fn default() -> Self {
        Config { db_path: "./data/banman.mdb".into(), port: 3000, session_ttl: Some(60 * 60 * 24 * 7), root: None }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep their defaults
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Self {
        let d = Config::default();
        Config {
            db_path: get("BANMAN_DB").unwrap_or(d.db_path),
            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(d.port),
            session_ttl: match get("BANMAN_SESSION_TTL").as_deref() {
                Some("0") => None,
                Some(v) => v.parse().ok().or(d.session_ttl),
                None => d.session_ttl,
            },
            root: get("BANMAN_ROOT").and_then(|r| Uuid::parse_str(r.trim()).ok()),
        }
    }
}
