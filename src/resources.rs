//! Registry of known resources and the permission names valid under each

use serde::Serialize;

use crate::constants::*;

const PUNISHMENT_PERMS: &[&str] = &["view", "create", "update.own", "update.any", "delete.own", "delete.any"];

const REPORT_PERMS: &[&str] = &[
    "view.any", "view.own", "view.assigned", "view.reported",
    "update.assign.any", "update.assign.own", "update.assign.assigned", "update.assign.reported",
    "update.state.any", "update.state.own", "update.state.assigned", "update.state.reported",
    "comment.any", "comment.own", "comment.assigned", "comment.reported",
    "delete.any", "delete.own", "delete.assigned", "delete.reported",
    "delete.comment.any", "delete.comment.own",
    "view.comments", "view.serverlogs", "view.commands",
];

const RESOURCES: &[(&str, &[&str])] = &[
    (SERVERS, &["manage"]),
    (PLAYER_ALTS, &["view"]),
    (PLAYER_BANS, PUNISHMENT_PERMS),
    (PLAYER_HISTORY, &["view"]),
    (PLAYER_IPS, &["view"]),
    (PLAYER_KICKS, PUNISHMENT_PERMS),
    (PLAYER_MUTES, PUNISHMENT_PERMS),
    (PLAYER_NOTES, PUNISHMENT_PERMS),
    (PLAYER_REPORTS, REPORT_PERMS),
    (PLAYER_WARNINGS, PUNISHMENT_PERMS),
];

#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub name: &'static str,
    pub permissions: &'static [&'static str],
}

/// All registered resources in declaration order
pub fn resources() -> Vec<Resource> {
    RESOURCES.iter().map(|&(name, permissions)| Resource { name, permissions }).collect()
}

pub fn is_resource(name: &str) -> bool {
    RESOURCES.iter().any(|(n, _)| *n == name)
}

pub fn is_permission(resource: &str, permission: &str) -> bool {
    RESOURCES.iter().any(|(n, ps)| *n == resource && ps.contains(&permission))
}
