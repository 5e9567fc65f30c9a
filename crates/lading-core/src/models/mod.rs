//! Data models and configuration.

pub mod config;
pub mod record;
pub mod table;
