//! Error types for the authorization core

use serde::Serialize;
use thiserror::Error;

use crate::constants::DENIED_MESSAGE;

/// Which part of request handling produced an error.
///
/// Every kind is reported to clients with the same HTTP status; the kind
/// lets callers tell a denial apart from a missing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authorization,
    ScopeResolution,
    Domain,
    Integrity,
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum BanError {
    /// Caller lacks the required grant. The message never varies.
    #[error("{}", DENIED_MESSAGE)]
    Denied,

    #[error("Server {0} does not exist")]
    ServerNotFound(String),

    #[error("Report {0} does not exist")]
    ReportNotFound(u64),

    #[error("Player {0} does not exist")]
    PlayerNotFound(uuid::Uuid),

    #[error("Comment {0} does not exist")]
    CommentNotFound(u64),

    #[error("Report state {0} does not exist")]
    ReportStateNotFound(u64),

    #[error("{kind} {id} does not exist")]
    RecordNotFound { kind: &'static str, id: u64 },

    #[error("Role {0} does not exist")]
    RoleNotFound(u64),

    #[error("A server with this name already exists")]
    DuplicateServerName,

    #[error("Tables do not exist in the database: {}", .0.join(", "))]
    TablesMissing(Vec<String>),

    #[error("Console UUID not found in {0} table")]
    ConsoleNotFound(String),

    #[error("May not delete default roles")]
    DefaultRole,

    #[error("{0}")]
    Invalid(String),

    /// Role parent chain revisits a role or never terminates.
    #[error("Role inheritance cycle detected at role {0}")]
    CycleDetected(u64),

    #[error("{0}")]
    Storage(String),
}

impl BanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BanError::Denied => ErrorKind::Authorization,
            BanError::ServerNotFound(_) => ErrorKind::ScopeResolution,
            BanError::CycleDetected(_) => ErrorKind::Integrity,
            BanError::Storage(_) => ErrorKind::Internal,
            _ => ErrorKind::Domain,
        }
    }

    /// Message safe to show to the caller. Internal failures are reported
    /// as denials so nothing about the store leaks out.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Integrity | ErrorKind::Internal => DENIED_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type alias for authorization core operations
pub type Result<T> = std::result::Result<T, BanError>;

/// Convert any error to a storage error
pub fn err<E: std::error::Error>(e: E) -> BanError {
    BanError::Storage(e.to_string())
}
