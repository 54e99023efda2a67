//! Domain entities - Core business objects with no external dependencies

pub mod message;
pub mod command;
pub mod roster;

pub use message::{InboundMessage, Origin, OutboundReply};
pub use command::{
    Command, CommandHandler, CommandRegistration, HandlerRegistry, HandlerResult, HelpIndex,
    PassiveHandler, PassiveRegistration,
};
pub use roster::MembershipRoster;
