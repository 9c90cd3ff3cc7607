//! Resource names, built-in role ids and table names

/// The only message a denied caller ever sees.
pub const DENIED_MESSAGE: &str =
    "You do not have permission to perform this action, please contact your server administrator";

// Resources
pub const SERVERS: &str = "servers";
pub const PLAYER_ALTS: &str = "player.alts";
pub const PLAYER_BANS: &str = "player.bans";
pub const PLAYER_HISTORY: &str = "player.history";
pub const PLAYER_IPS: &str = "player.ips";
pub const PLAYER_KICKS: &str = "player.kicks";
pub const PLAYER_MUTES: &str = "player.mutes";
pub const PLAYER_NOTES: &str = "player.notes";
pub const PLAYER_REPORTS: &str = "player.reports";
pub const PLAYER_WARNINGS: &str = "player.warnings";

// Built-in roles (bootstrap always creates these)
pub const ROLE_GUEST: u64 = 1;
pub const ROLE_LOGGED_IN: u64 = 2;
pub const ROLE_ADMIN: u64 = 3;

/// Snapshots held by the permission cache before it starts over
pub const MAX_CACHED_SNAPSHOTS: usize = 4096;

/// Logical table name -> default physical table name
pub const TABLES: &[(&str, &str)] = &[
    ("players", "bm_players"),
    ("playerBans", "bm_player_bans"),
    ("playerBanRecords", "bm_player_ban_records"),
    ("playerMutes", "bm_player_mutes"),
    ("playerMuteRecords", "bm_player_mute_records"),
    ("playerKicks", "bm_player_kicks"),
    ("playerNotes", "bm_player_notes"),
    ("playerHistory", "bm_player_history"),
    ("playerReports", "bm_player_reports"),
    ("playerReportLocations", "bm_player_report_locations"),
    ("playerReportStates", "bm_player_report_states"),
    ("playerReportCommands", "bm_player_report_commands"),
    ("playerReportComments", "bm_player_report_comments"),
    ("playerWarnings", "bm_player_warnings"),
    ("ipBans", "bm_ip_bans"),
    ("ipBanRecords", "bm_ip_ban_records"),
    ("ipMutes", "bm_ip_mutes"),
    ("ipMuteRecords", "bm_ip_mute_records"),
    ("ipRangeBans", "bm_ip_range_bans"),
    ("ipRangeBanRecords", "bm_ip_range_ban_records"),
    ("playerPins", "bm_player_pins"),
    ("serverLogs", "bm_server_logs"),
    ("playerReportLogs", "bm_report_logs"),
];

/// Report states every new server starts with
pub const DEFAULT_REPORT_STATES: &[(u64, &str)] =
    &[(1, "Open"), (2, "Assigned"), (3, "Resolved"), (4, "Closed")];

pub const MAX_REASON_LEN: usize = 255;
pub const MAX_SERVER_NAME_LEN: usize = 20;
pub const MAX_ROLE_NAME_LEN: usize = 20;

/// Rows returned by list operations when no limit is given
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 50;

/// Logical tables the panel itself reads and writes
pub const REPORTS_TABLE: &str = "playerReports";
pub const REPORT_COMMENTS_TABLE: &str = "playerReportComments";
pub const REPORT_STATES_TABLE: &str = "playerReportStates";
pub const REPORT_LOGS_TABLE: &str = "playerReportLogs";
pub const REPORT_COMMANDS_TABLE: &str = "playerReportCommands";
pub const PLAYERS_TABLE: &str = "players";

/// State a report moves to once someone is assigned
pub const REPORT_STATE_ASSIGNED: u64 = 2;
