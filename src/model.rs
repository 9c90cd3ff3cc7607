//! Stored records: servers, players, punishments, reports, roles

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::*;

pub type PlayerId = Uuid;

/// Logical table name -> physical table name for one game server
pub type ServerTables = BTreeMap<String, String>;

pub fn default_tables() -> ServerTables {
    TABLES.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub console: PlayerId,
    pub tables: ServerTables,
}

impl Server {
    /// Physical name of a logical table, falling back to the default
    pub fn table(&self, logical: &str) -> String {
        self.tables
            .get(logical)
            .cloned()
            .or_else(|| TABLES.iter().find(|(k, _)| *k == logical).map(|(_, v)| v.to_string()))
            .unwrap_or_else(|| logical.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub last_seen: u64,
    /// Last address the player joined from
    #[serde(default)]
    pub ip: Option<String>,
}

/// Punishment record kinds (GraphQL `RecordType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    PlayerBan,
    PlayerKick,
    PlayerMute,
    PlayerNote,
    PlayerWarning,
}

impl RecordType {
    pub const ALL: [RecordType; 5] = [
        RecordType::PlayerBan,
        RecordType::PlayerKick,
        RecordType::PlayerMute,
        RecordType::PlayerNote,
        RecordType::PlayerWarning,
    ];

    pub fn resource(self) -> &'static str {
        match self {
            RecordType::PlayerBan => PLAYER_BANS,
            RecordType::PlayerKick => PLAYER_KICKS,
            RecordType::PlayerMute => PLAYER_MUTES,
            RecordType::PlayerNote => PLAYER_NOTES,
            RecordType::PlayerWarning => PLAYER_WARNINGS,
        }
    }

    /// Logical table holding active records
    pub fn table(self) -> &'static str {
        match self {
            RecordType::PlayerBan => "playerBans",
            RecordType::PlayerKick => "playerKicks",
            RecordType::PlayerMute => "playerMutes",
            RecordType::PlayerNote => "playerNotes",
            RecordType::PlayerWarning => "playerWarnings",
        }
    }

    /// Logical table receiving soft-deleted records, if the kind keeps one
    pub fn history_table(self) -> Option<&'static str> {
        match self {
            RecordType::PlayerBan => Some("playerBanRecords"),
            RecordType::PlayerMute => Some("playerMuteRecords"),
            RecordType::PlayerKick | RecordType::PlayerWarning => Some("playerHistory"),
            RecordType::PlayerNote => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordType::PlayerBan => "Ban",
            RecordType::PlayerKick => "Kick",
            RecordType::PlayerMute => "Mute",
            RecordType::PlayerNote => "Note",
            RecordType::PlayerWarning => "Warning",
        }
    }

    pub fn parse(s: &str) -> Option<RecordType> {
        RecordType::ALL.into_iter().find(|t| format!("{:?}", t) == s)
    }
}

/// Ban, kick, mute, note or warning. Notes keep their text in `reason`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Punishment {
    pub id: u64,
    pub kind: RecordType,
    pub server: String,
    pub player: PlayerId,
    pub actor: PlayerId,
    pub reason: String,
    pub created: u64,
    pub updated: u64,
    /// 0 = permanent
    pub expires: u64,
    #[serde(default)]
    pub soft: bool,
    #[serde(default)]
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: u64,
    pub server: String,
    pub player: PlayerId,
    pub actor: PlayerId,
    pub assignee: Option<PlayerId>,
    pub reason: String,
    pub state: u64,
    pub created: u64,
    pub updated: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportComment {
    pub id: u64,
    pub server: String,
    pub report: u64,
    pub actor: PlayerId,
    pub message: String,
    pub created: u64,
    pub updated: u64,
}

/// Server log line captured when a report was filed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportServerLog {
    pub id: u64,
    pub report: u64,
    pub message: String,
    pub created: u64,
}

/// Command the reported player ran shortly before the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCommand {
    pub id: u64,
    pub report: u64,
    pub actor: PlayerId,
    pub command: String,
    pub args: Option<String>,
    pub created: u64,
    pub updated: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportState {
    pub id: u64,
    pub name: String,
}

/// Role as stored: grants are `resource -> permission -> allowed`.
/// An explicit `false` overrides an ancestor's `true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
    pub parent: Option<u64>,
    pub grants: BTreeMap<String, BTreeMap<String, bool>>,
}

impl Role {
    pub fn grant(mut self, resource: &str, permission: &str, allowed: bool) -> Self {
        self.grants
            .entry(resource.to_string())
            .or_default()
            .insert(permission.to_string(), allowed);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerRole {
    pub server: String,
    pub role: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: PlayerId,
    pub email: Option<String>,
}

pub fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
