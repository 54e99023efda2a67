//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Database: SQLite persistence for the modules
//! - Http: Shared client for web lookups
//! - Adapters: Network integrations (IRC, console)

pub mod adapters;
pub mod config;
pub mod database;
pub mod http;
