use async_trait::async_trait;

use crate::application::errors::BotError;

/// Connection trait - abstraction for the chat network client
#[async_trait]
pub trait Connection: Send + Sync {
    /// Join a channel, optionally with its key
    async fn join(&self, channel: &str, key: Option<&str>) -> Result<(), BotError>;

    /// Send one line of text to a channel or a nickname
    async fn send(&self, target: &str, text: &str) -> Result<(), BotError>;

    /// Ask the server for the channel roster; the answer arrives later as
    /// a [`ConnectionEvent::Roster`].
    async fn query_roster(&self, channel: &str) -> Result<(), BotError>;

    /// Leave the network
    async fn disconnect(&self, reason: Option<&str>) -> Result<(), BotError>;

    /// The nickname the bot registered with
    fn nick(&self) -> String;
}

/// Events emitted by a connection for the bot to consume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Registration with the server is complete
    Registered { nick: String },
    /// A PRIVMSG to a channel or to the bot
    Message {
        from: String,
        target: String,
        text: String,
    },
    /// A complete roster for a channel (all NAMES parts aggregated)
    Roster {
        channel: String,
        entries: Vec<String>,
    },
    Joined { channel: String, nick: String },
    Parted { channel: String, nick: String },
    Disconnected { reason: String },
}
