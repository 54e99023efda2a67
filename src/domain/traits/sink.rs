use async_trait::async_trait;

use crate::domain::entities::OutboundReply;

/// Where a handler puts its replies.
///
/// Handlers call `send` zero or more times per invocation. Delivery
/// failures are the sink's concern; handlers never see them.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, reply: OutboundReply);
}

/// Sink that discards everything, for handlers that never reply
pub struct NullSink;

#[async_trait]
impl ReplySink for NullSink {
    async fn send(&self, reply: OutboundReply) {
        tracing::trace!("Discarding reply for {:?}", reply.target);
    }
}
