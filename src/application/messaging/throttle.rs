//! Outbound flood control

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::application::errors::BotError;
use crate::domain::entities::OutboundReply;
use crate::domain::traits::{Connection, ReplySink};

/// Default spacing between two lines sent to the network
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Serializes every outbound line behind a minimum interval.
///
/// The lock guards the last-send timestamp together with the send
/// itself, so concurrent callers can never both see a stale timestamp.
/// Callers are not served in any particular order.
pub struct ReplyThrottle {
    connection: Arc<dyn Connection>,
    default_channel: String,
    min_interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl ReplyThrottle {
    pub fn new(
        connection: Arc<dyn Connection>,
        default_channel: impl Into<String>,
        min_interval: Duration,
    ) -> Self {
        Self {
            connection,
            default_channel: default_channel.into(),
            min_interval,
            last_sent: Mutex::new(None),
        }
    }

    pub fn default_channel(&self) -> &str {
        &self.default_channel
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Target a reply will be sent to
    pub fn resolve_target<'a>(&'a self, reply: &'a OutboundReply) -> &'a str {
        if reply.has_target() {
            &reply.target
        } else {
            &self.default_channel
        }
    }

    /// Wait for the interval to elapse, then send.
    ///
    /// The timestamp is recorded for every attempted send, successful or not.
    pub async fn send(&self, reply: &OutboundReply) -> Result<(), BotError> {
        let mut last_sent = self.last_sent.lock().await;

        if let Some(last) = *last_sent {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        let target = self.resolve_target(reply);
        let result = self.connection.send(target, &reply.text).await;
        *last_sent = Some(Instant::now());

        result
    }
}

/// How a sink interprets the target of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// Empty target goes to the channel, anything else goes direct
    Reply,
    /// Always the channel, ignoring the target
    ToChannel,
    /// Only direct replies; an empty target is dropped
    ToNick,
}

/// A [`ReplySink`] that feeds the shared throttle
pub struct ThrottledSink {
    throttle: Arc<ReplyThrottle>,
    mode: ReplyMode,
}

impl ThrottledSink {
    pub fn new(throttle: Arc<ReplyThrottle>, mode: ReplyMode) -> Self {
        Self { throttle, mode }
    }

    pub fn shared(throttle: &Arc<ReplyThrottle>, mode: ReplyMode) -> Arc<dyn ReplySink> {
        Arc::new(Self::new(throttle.clone(), mode))
    }

    fn route(&self, reply: OutboundReply) -> Option<OutboundReply> {
        match self.mode {
            ReplyMode::Reply => Some(reply),
            ReplyMode::ToChannel => Some(OutboundReply::to_channel(reply.text)),
            ReplyMode::ToNick if reply.has_target() => Some(reply),
            ReplyMode::ToNick => None,
        }
    }
}

#[async_trait]
impl ReplySink for ThrottledSink {
    async fn send(&self, reply: OutboundReply) {
        let Some(reply) = self.route(reply) else {
            tracing::debug!("Dropping untargeted reply on a direct-only sink");
            return;
        };
        if let Err(e) = self.throttle.send(&reply).await {
            tracing::warn!("Failed to send reply to {}: {}", self.throttle.resolve_target(&reply), e);
        }
    }
}
