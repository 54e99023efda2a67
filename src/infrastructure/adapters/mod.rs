//! Connection adapters

pub mod console;
pub mod irc;

pub use console::ConsoleConnection;
pub use irc::IrcConnection;
