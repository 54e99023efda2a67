use chrono::{DateTime, Utc};

/// Where an inbound line was posted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Posted in a channel the bot has joined
    Channel(String),
    /// Sent privately to the bot
    Direct,
}

/// One chat line received from the network
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub sender: String,
    pub origin: Origin,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, origin: Origin, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.into(),
            origin,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn in_channel(sender: impl Into<String>, channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender, Origin::Channel(channel.into()), text)
    }

    pub fn direct(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender, Origin::Direct, text)
    }

    /// Whitespace-separated words of the text
    pub fn fields(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    /// The trigger token used for command lookup
    pub fn first_token(&self) -> Option<&str> {
        self.text.split_whitespace().next()
    }

    /// Channel for channel messages, the sender for private ones
    pub fn reply_target(&self) -> &str {
        match &self.origin {
            Origin::Channel(channel) => channel,
            Origin::Direct => &self.sender,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.origin, Origin::Direct)
    }
}

/// A reply produced by a handler.
///
/// An empty `target` means "the configured channel".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub text: String,
    pub target: String,
}

impl OutboundReply {
    pub fn new(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: target.into(),
        }
    }

    pub fn to_channel(text: impl Into<String>) -> Self {
        Self::new(text, String::new())
    }

    pub fn has_target(&self) -> bool {
        !self.target.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_token_skips_leading_whitespace() {
        let msg = InboundMessage::in_channel("alice", "#chan", " \t  !m   bob hello ");
        assert_eq!(msg.first_token(), Some("!m"));
        assert_eq!(msg.fields(), vec!["!m", "bob", "hello"]);
    }

    #[test]
    fn test_first_token_of_blank_text() {
        let msg = InboundMessage::in_channel("alice", "#chan", "   ");
        assert_eq!(msg.first_token(), None);
    }

    #[test]
    fn test_reply_target() {
        let msg = InboundMessage::in_channel("alice", "#chan", "hi");
        assert_eq!(msg.reply_target(), "#chan");

        let msg = InboundMessage::direct("alice", "hi");
        assert_eq!(msg.reply_target(), "alice");
        assert!(msg.is_direct());
    }
}
