//! Banman - role-based authorization for a multi-server ban management panel
//!
//! Roles carry `resource:permission` grants and inherit from a parent role.
//! Every operation is declared in the [`gate`] with the permission it needs;
//! ownership-qualified permissions (`.own`, `.assigned`, `.reported`) are
//! decided against the loaded record. Records carry an ACL so clients know
//! which actions to offer.
//!
//! ```no_run
//! use std::sync::Arc;
//! use banman::{bootstrap, Panel, Store};
//! use serde_json::json;
//!
//! let store = Arc::new(Store::open("./data/banman.mdb")?);
//! bootstrap(&store, None)?;
//! let panel = Panel::new(store);
//! let ctx = panel.context(None);
//! let servers = panel.execute(&ctx, "servers", json!({}))?;
//! # Ok::<(), banman::BanError>(())
//! ```

pub mod acl;
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod context;
pub mod db;
pub mod error;
pub mod gate;
pub mod model;
pub mod ownership;
pub mod panel;
pub mod permission;
pub mod policy;
pub mod resources;
pub mod roles;
pub mod session;
pub mod tx;

mod account;
mod admin;
mod punishments;
mod read;
mod reports;
mod servers;

pub use account::valid_email;
pub use bootstrap::{bootstrap, default_roles, is_bootstrapped};
pub use config::Config;
pub use context::RequestContext;
pub use db::Store;
pub use error::{BanError, ErrorKind, Result};
pub use model::*;
pub use panel::{respond, Panel, TableProbe, TrustConfig};
pub use permission::{PermissionKey, PermissionSet, Qualifier};
pub use policy::{authorize, Decision, Requirement};
pub use session::{create_session, revoke_session, validate_session};
pub use tx::Tx;
