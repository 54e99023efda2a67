//! goxxx - a single-channel IRC bot
//!
//! Layers follow the usual split:
//! - `domain`: messages, commands, the roster and the seams to the network
//! - `application`: dispatch, reply pacing, membership and the event loop
//! - `infrastructure`: IRC and console transports, config, SQLite, HTTP
//! - `modules`: the user-facing commands

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod modules;

#[cfg(test)]
pub(crate) mod testing;
