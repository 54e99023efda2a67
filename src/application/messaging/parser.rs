//! Message parser - Turns raw chat lines into structured messages

use crate::domain::entities::{InboundMessage, Origin};

/// Channel name prefixes defined by RFC 2811
const CHANNEL_PREFIXES: [char; 4] = ['#', '&', '+', '!'];

/// Parses incoming lines into [`InboundMessage`]s
#[derive(Debug, Default)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one PRIVMSG. Returns `None` for lines sent by `own_nick`,
    /// the nick the bot holds right now.
    pub fn parse(&self, own_nick: &str, from: &str, target: &str, text: &str) -> Option<InboundMessage> {
        if from.is_empty() || from.eq_ignore_ascii_case(own_nick) {
            return None;
        }

        let origin = if is_channel(target) {
            Origin::Channel(target.to_string())
        } else {
            Origin::Direct
        };

        Some(InboundMessage::new(from, origin, strip_action(text)))
    }
}

pub fn is_channel(target: &str) -> bool {
    target.starts_with(CHANNEL_PREFIXES)
}

// CTCP ACTION (/me) is stored as its plain text
fn strip_action(text: &str) -> &str {
    text.strip_prefix("\u{1}ACTION ")
        .map(|rest| rest.trim_end_matches('\u{1}'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_message() {
        let parser = MessageParser::new();
        let msg = parser.parse("goxxx", "alice", "#chan", "!m bob hi").unwrap();
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.origin, Origin::Channel("#chan".to_string()));
        assert_eq!(msg.text, "!m bob hi");
    }

    #[test]
    fn test_direct_message() {
        let parser = MessageParser::new();
        let msg = parser.parse("goxxx", "alice", "goxxx", "hello").unwrap();
        assert_eq!(msg.origin, Origin::Direct);
        assert_eq!(msg.reply_target(), "alice");
    }

    #[test]
    fn test_own_lines_are_ignored() {
        let parser = MessageParser::new();
        assert!(parser.parse("goxxx", "GoXXX", "#chan", "echo").is_none());
    }

    #[test]
    fn test_filter_follows_current_nick() {
        let parser = MessageParser::new();
        assert!(parser.parse("goxxx_", "goxxx", "#chan", "hi").is_some());
        assert!(parser.parse("goxxx_", "goxxx_", "#chan", "echo").is_none());
    }

    #[test]
    fn test_action_is_unwrapped() {
        let parser = MessageParser::new();
        let msg = parser.parse("goxxx", "alice", "#chan", "\u{1}ACTION waves\u{1}").unwrap();
        assert_eq!(msg.text, "waves");
    }
}
