//! Application services - Business logic orchestration

pub mod bot_service;
pub mod membership;

pub use bot_service::BotService;
pub use membership::{MembershipTracker, RosterState};
