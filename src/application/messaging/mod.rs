//! Message handling - Dispatch, parsing and outbound pacing

pub mod dispatcher;
pub mod parser;
pub mod throttle;

pub use dispatcher::{DispatchHandle, MessageDispatcher};
pub use parser::MessageParser;
pub use throttle::{ReplyMode, ReplyThrottle, ThrottledSink};
