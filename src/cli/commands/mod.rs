//! One module per command group.

pub mod audit_cmd;
pub mod auth;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod update;
