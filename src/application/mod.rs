//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: The bot event loop and the membership tracker
//! - Errors: Domain-specific errors
//! - Messaging: Dispatching, parsing and reply throttling

pub mod errors;
pub mod services;
pub mod messaging;
