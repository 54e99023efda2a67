//! Domain traits - Abstractions for infrastructure implementations

pub mod connection;
pub mod sink;

pub use connection::{Connection, ConnectionEvent};
pub use sink::{NullSink, ReplySink};
