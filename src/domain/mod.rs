//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Messages, replies, commands and the channel roster
//! - Traits: Abstractions for infrastructure (Connection, ReplySink)

pub mod entities;
pub mod traits;
