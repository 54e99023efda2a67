use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::application::messaging::{DispatchHandle, MessageDispatcher, MessageParser};
use crate::application::services::MembershipTracker;
use crate::domain::traits::{Connection, ConnectionEvent};

/// Service gluing the connection's event stream to the core
pub struct BotService {
    connection: Arc<dyn Connection>,
    dispatcher: MessageDispatcher,
    membership: Arc<MembershipTracker>,
    parser: MessageParser,
    channel_key: Option<String>,
}

impl BotService {
    pub fn new(
        connection: Arc<dyn Connection>,
        dispatcher: MessageDispatcher,
        membership: Arc<MembershipTracker>,
        channel_key: Option<String>,
    ) -> Self {
        Self {
            connection,
            dispatcher,
            membership,
            parser: MessageParser::new(),
            channel_key,
        }
    }

    pub fn channel(&self) -> &str {
        self.membership.channel()
    }

    /// Process events until the connection drops or `shutdown` resolves
    pub async fn run<F>(&self, mut events: mpsc::Receiver<ConnectionEvent>, shutdown: F) -> Result<(), BotError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        return Err(BotError::Disconnected("event stream closed".to_string()));
                    };
                    // Handler tasks outlive this iteration on their own
                    drop(self.handle_event(event).await?);
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, leaving {}", self.channel());
                    self.connection.disconnect(Some("Goxxx exiting")).await?;
                    return Ok(());
                }
            }
        }
    }

    /// Handle one event. Inbound messages return their dispatch handle.
    pub async fn handle_event(&self, event: ConnectionEvent) -> Result<Option<DispatchHandle>, BotError> {
        match event {
            ConnectionEvent::Registered { nick } => {
                tracing::info!("Registered as {}, joining {}", nick, self.channel());
                self.connection
                    .join(self.channel(), self.channel_key.as_deref())
                    .await?;
            }
            ConnectionEvent::Message { from, target, text } => {
                if let Some(message) = self.parser.parse(&self.connection.nick(), &from, &target, &text) {
                    return Ok(Some(self.dispatcher.dispatch(message)));
                }
            }
            ConnectionEvent::Roster { channel, entries } => {
                self.membership.apply_roster(&channel, &entries);
            }
            ConnectionEvent::Joined { channel, nick } => {
                if nick.eq_ignore_ascii_case(&self.connection.nick()) {
                    tracing::info!("Joined {}", channel);
                } else {
                    tracing::debug!("{} joined {}", nick, channel);
                }
            }
            ConnectionEvent::Parted { channel, nick } => {
                if nick.eq_ignore_ascii_case(&self.connection.nick()) && channel.eq_ignore_ascii_case(self.channel()) {
                    tracing::warn!("Left {}", channel);
                    self.membership.invalidate();
                }
            }
            ConnectionEvent::Disconnected { reason } => {
                tracing::error!("Disconnected: {}", reason);
                return Err(BotError::Disconnected(reason));
            }
        }
        Ok(None)
    }
}
