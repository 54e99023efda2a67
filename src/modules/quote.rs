//! Quotes picked from what people recently said

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex_lite::Regex;

use super::{require_admin, ModuleContext};
use crate::application::errors::BotError;
use crate::application::messaging::ReplyMode;
use crate::application::services::MembershipTracker;
use crate::domain::entities::{Command, CommandHandler, HandlerRegistry, HandlerResult, InboundMessage, OutboundReply, PassiveHandler};
use crate::domain::traits::{NullSink, ReplySink};
use crate::infrastructure::database::{Database, Quote};

pub const MODULE: &str = "quote";

const HISTORY_SIZE: usize = 20;

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[.,;:!'"-]"#).expect("valid punctuation pattern"));

pub fn install(registry: &mut HandlerRegistry, ctx: &ModuleContext) {
    let sink = ctx.sink(ReplyMode::Reply);
    let history = Arc::new(History::default());

    registry.register_passive(MODULE, Arc::new(Remember { history: history.clone() }), Arc::new(NullSink));
    registry.register_command(
        Command::new(MODULE, Arc::new(FindQuotes { db: ctx.db.clone() }))
            .with_triggers(["!q", "!quote"])
            .with_help("!q/!quote <nick> [<part of message>]"),
        sink.clone(),
    );
    registry.register_command(
        Command::new(MODULE, Arc::new(FindAllQuotes { db: ctx.db.clone() }))
            .with_triggers(["!qa", "!quoteall"])
            .with_help("!qa/!quoteall [<part of message>]"),
        sink.clone(),
    );
    registry.register_command(
        Command::new(MODULE, Arc::new(AddQuote { db: ctx.db.clone(), history }))
            .with_triggers(["!aq", "!addquote"])
            .with_help("!aq/!addquote <nick> <part of message>"),
        sink.clone(),
    );
    registry.register_command(
        Command::new(
            MODULE,
            Arc::new(RemoveQuotes {
                db: ctx.db.clone(),
                membership: ctx.membership.clone(),
            }),
        )
        .with_triggers(["!rmq", "!rmquote"])
        .with_help("!rmq/!rmquote <nick> <part of the quote> (Admins only)"),
        sink.clone(),
    );
    registry.register_command(
        Command::new(MODULE, Arc::new(DailyQuote { db: ctx.db.clone() }))
            .with_triggers(["!dq"])
            .with_help("!dq (No parameter needed)"),
        sink,
    );
}

/// Punctuation to spaces, whitespace collapsed, lowercased
pub fn normalize(text: &str) -> String {
    PUNCTUATION
        .replace_all(text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn describe(quote: &Quote) -> String {
    format!("{} [{}, {}, quoted by {}]", quote.content, quote.user, quote.date, quote.sender)
}

/// Last messages of every nick, oldest first
#[derive(Default)]
struct History {
    by_nick: Mutex<HashMap<String, VecDeque<String>>>,
}

impl History {
    fn push(&self, nick: &str, text: &str) {
        let mut by_nick = self.by_nick.lock();
        let lines = by_nick.entry(nick.to_string()).or_default();
        if lines.len() == HISTORY_SIZE {
            lines.pop_front();
        }
        lines.push_back(text.to_string());
    }

    /// Newest remembered line of `nick` containing `pattern` once normalized
    fn find_newest(&self, nick: &str, pattern: &str) -> Option<String> {
        let by_nick = self.by_nick.lock();
        by_nick
            .get(nick)?
            .iter()
            .rev()
            .find(|line| normalize(line).contains(pattern))
            .cloned()
    }
}

struct Remember {
    history: Arc<History>,
}

#[async_trait]
impl PassiveHandler for Remember {
    async fn observe(&self, message: &InboundMessage, _sink: &dyn ReplySink) -> Result<(), BotError> {
        self.history.push(&message.sender, &message.text);
        Ok(())
    }
}

struct FindQuotes {
    db: Arc<Database>,
}

#[async_trait]
impl CommandHandler for FindQuotes {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 2 {
            return Ok(true);
        }

        let part = (fields.len() > 2).then(|| normalize(&fields[2..].join(" ")));
        for quote in self.db.quotes_of(fields[1], part.as_deref())? {
            sink.send(OutboundReply::new(describe(&quote), message.reply_target())).await;
        }
        Ok(true)
    }
}

struct FindAllQuotes {
    db: Arc<Database>,
}

#[async_trait]
impl CommandHandler for FindAllQuotes {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 2 {
            return Ok(true);
        }

        for quote in self.db.quotes_like(&normalize(&fields[1..].join(" ")))? {
            sink.send(OutboundReply::new(describe(&quote), message.reply_target())).await;
        }
        Ok(true)
    }
}

struct AddQuote {
    db: Arc<Database>,
    history: Arc<History>,
}

#[async_trait]
impl CommandHandler for AddQuote {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 3 {
            return Ok(false);
        }

        let nick = fields[1];
        let pattern = normalize(&fields[2..].join(" "));
        let Some(line) = self.history.find_newest(nick, &pattern) else {
            tracing::debug!("No recent line of {} matches \"{}\"", nick, pattern);
            return Ok(true);
        };

        let text = if self.db.quote_exists(nick, &line)? {
            format!("This quote is already present for the user \"{}\"", nick)
        } else {
            self.db.add_quote(nick, &line, &message.sender)?;
            tracing::info!("Quote of {} added by {}", nick, message.sender);
            format!("Quote \"{}\" added for nick \"{}\"", line, nick)
        };
        sink.send(OutboundReply::new(text, message.reply_target())).await;
        Ok(true)
    }
}

struct RemoveQuotes {
    db: Arc<Database>,
    membership: Arc<MembershipTracker>,
}

#[async_trait]
impl CommandHandler for RemoveQuotes {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 3 {
            return Ok(false);
        }
        if !require_admin(&self.membership, message, sink).await {
            return Ok(true);
        }

        let user = fields[1];
        let part = fields[2..].join(" ");
        if self.db.delete_quotes(user, &part)? > 0 {
            sink.send(OutboundReply::new(
                format!("Quote(s) matching \"%{}%\" removed for user \"{}\"", part, user),
                message.reply_target(),
            ))
            .await;
        }
        Ok(true)
    }
}

struct DailyQuote {
    db: Arc<Database>,
}

#[async_trait]
impl CommandHandler for DailyQuote {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let text = match self.db.quote_from_last_year()? {
            Some(quote) => describe(&quote),
            None => "There was no quote 1 year ago, losers!".to_string(),
        };
        sink.send(OutboundReply::new(text, message.reply_target())).await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnection, RecordingSink};

    fn msg(sender: &str, text: &str) -> InboundMessage {
        InboundMessage::in_channel(sender, "#goxxx", text)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Hello, World!  It's -- FINE.\n"), "hello world it s fine");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_history_keeps_last_lines() {
        let history = History::default();
        for i in 0..25 {
            history.push("bob", &format!("line {}", i));
        }
        assert_eq!(history.by_nick.lock()["bob"].len(), HISTORY_SIZE);
        assert_eq!(history.find_newest("bob", "line 1"), Some("line 19".to_string()));
        // Evicted
        assert_eq!(history.find_newest("bob", "line 4"), None);
        assert_eq!(history.find_newest("carol", "line"), None);
    }

    #[tokio::test]
    async fn test_add_and_list_quotes() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let history = Arc::new(History::default());
        let remember = Remember { history: history.clone() };
        remember.observe(&msg("bob", "Rust: it's FAST!"), &NullSink).await.unwrap();
        remember.observe(&msg("bob", "lunch?"), &NullSink).await.unwrap();

        let add = AddQuote { db: db.clone(), history };
        let sink = RecordingSink::new();
        add.handle(&msg("alice", "!aq bob FAST"), &sink).await.unwrap();
        add.handle(&msg("alice", "!aq bob it's fast"), &sink).await.unwrap();
        add.handle(&msg("alice", "!aq bob dinner"), &sink).await.unwrap();
        assert_eq!(
            sink.texts(),
            vec![
                "Quote \"Rust: it's FAST!\" added for nick \"bob\"".to_string(),
                "This quote is already present for the user \"bob\"".to_string(),
            ]
        );

        let find = FindQuotes { db: db.clone() };
        let sink = RecordingSink::new();
        find.handle(&msg("carol", "!q bob"), &sink).await.unwrap();
        find.handle(&msg("carol", "!q bob nope"), &sink).await.unwrap();
        find.handle(&msg("carol", "!q"), &sink).await.unwrap();
        let texts = sink.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("Rust: it's FAST! [bob, "));
        assert!(texts[0].ends_with(", quoted by alice]"));

        let all = FindAllQuotes { db };
        let sink = RecordingSink::new();
        all.handle(&InboundMessage::direct("carol", "!qa rust"), &sink).await.unwrap();
        assert_eq!(sink.replies().len(), 1);
        assert_eq!(sink.replies()[0].target, "carol");
    }

    #[tokio::test]
    async fn test_remove_quotes() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.add_quote("bob", "rust is fun", "alice").unwrap();
        let (_connection, membership) = MockConnection::tracker(&["@alice", "bob"]);
        let remove = RemoveQuotes { db: db.clone(), membership };

        let sink = RecordingSink::new();
        assert!(!remove.handle(&msg("alice", "!rmq bob"), &sink).await.unwrap());
        remove.handle(&msg("bob", "!rmq bob rust"), &sink).await.unwrap();
        remove.handle(&msg("alice", "!rmq bob rust"), &sink).await.unwrap();
        remove.handle(&msg("alice", "!rmq bob rust"), &sink).await.unwrap();
        let texts = sink.texts();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].ends_with("(Admin: \"alice\")"));
        assert_eq!(texts[1], "Quote(s) matching \"%rust%\" removed for user \"bob\"");
    }

    #[tokio::test]
    async fn test_daily_quote_without_history() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.add_quote("bob", "today", "alice").unwrap();
        let sink = RecordingSink::new();
        DailyQuote { db }.handle(&msg("carol", "!dq"), &sink).await.unwrap();
        assert_eq!(sink.texts(), vec!["There was no quote 1 year ago, losers!".to_string()]);
    }
}
