//! Bot modules
//!
//! Each module registers its commands and passive handlers with the
//! [`HandlerRegistry`]. `help` is always installed, last, so it can list
//! everything registered before it.

pub mod help;
pub mod memo;
pub mod pictures;
pub mod quote;
pub mod search;
pub mod webinfo;
pub mod xkcd;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::application::messaging::{ReplyMode, ReplyThrottle, ThrottledSink};
use crate::application::services::MembershipTracker;
use crate::domain::entities::{HandlerRegistry, InboundMessage, OutboundReply};
use crate::domain::traits::ReplySink;
use crate::infrastructure::database::Database;
use crate::infrastructure::http::HttpClient;

/// Liberal URL matcher (Gruber's "improved" pattern)
pub(crate) static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:https?://|www\d{0,3}[.]|[a-z0-9.\-]+[.][a-z]{2,4}/)(?:[^\s()<>]+|\(([^\s()<>]+|(\([^\s()<>]+\)))*\))+(?:\(([^\s()<>]+|(\([^\s()<>]+\)))*\)|[^\s`!()\[\]{};:'".,<>?«»“”‘’])"#,
    )
    .expect("valid URL pattern")
});

/// Everything a module may need
#[derive(Clone)]
pub struct ModuleContext {
    pub db: Arc<Database>,
    pub http: HttpClient,
    pub membership: Arc<MembershipTracker>,
    pub throttle: Arc<ReplyThrottle>,
}

impl ModuleContext {
    pub fn sink(&self, mode: ReplyMode) -> Arc<dyn ReplySink> {
        ThrottledSink::shared(&self.throttle, mode)
    }
}

/// Install the enabled modules, then `help`. Returns the names loaded.
pub fn install(registry: &mut HandlerRegistry, enabled: &[String], ctx: &ModuleContext) -> Vec<String> {
    let mut loaded = Vec::new();

    for name in enabled {
        match name.as_str() {
            "memo" => memo::install(registry, ctx),
            "webinfo" => webinfo::install(registry, ctx),
            "pictures" => pictures::install(registry, ctx),
            "quote" => quote::install(registry, ctx),
            "search" => search::install(registry, ctx),
            "xkcd" => xkcd::install(registry, ctx),
            other => {
                tracing::warn!("Unknown module \"{}\", skipping", other);
                continue;
            }
        }
        if !loaded.contains(name) {
            loaded.push(name.clone());
        }
    }

    help::install(registry, ctx);
    loaded.push("help".to_string());

    tracing::info!("Loaded modules: {}", loaded.join(", "));
    loaded
}

/// Refusal text listing who may run admin commands
pub(crate) fn admin_refusal(admins: &[String]) -> String {
    match admins {
        [] => "You need to be an administrator to run this command (No admin set!)".to_string(),
        [admin] => format!("You need to be an administrator to run this command (Admin: \"{}\")", admin),
        admins => format!(
            "You need to be an administrator to run this command (Admins: \"{}\")",
            admins.join(", ")
        ),
    }
}

/// Refresh the roster and check the sender is an admin; replies with the
/// refusal otherwise.
pub(crate) async fn require_admin(
    membership: &MembershipTracker,
    message: &InboundMessage,
    sink: &dyn ReplySink,
) -> bool {
    let roster = membership.refreshed_roster().await;
    if roster.is_admin(&message.sender) {
        return true;
    }

    tracing::info!("Refusing admin command from {}", message.sender);
    sink.send(OutboundReply::new(admin_refusal(roster.admins()), message.reply_target()))
        .await;
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnection, RecordingSink};

    #[test]
    fn test_admin_refusal() {
        assert!(admin_refusal(&[]).ends_with("(No admin set!)"));
        assert!(admin_refusal(&["alice".to_string()]).ends_with("(Admin: \"alice\")"));
        assert!(admin_refusal(&["alice".to_string(), "carol".to_string()])
            .ends_with("(Admins: \"alice, carol\")"));
    }

    #[test]
    fn test_url_regex() {
        let found: Vec<_> = URL_REGEX
            .find_iter("see https://example.com/a_(b) and www.rust-lang.org, or docs.rs/tokio.")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["https://example.com/a_(b)", "www.rust-lang.org", "docs.rs/tokio"]);
        assert!(!URL_REGEX.is_match("no links here"));
    }

    #[tokio::test]
    async fn test_require_admin() {
        let (_connection, tracker) = MockConnection::tracker(&["@alice", "bob"]);
        let sink = RecordingSink::new();

        let from_alice = InboundMessage::in_channel("alice", "#goxxx", "!rmpic x y");
        assert!(require_admin(&tracker, &from_alice, &sink).await);
        assert!(sink.replies().is_empty());

        let from_bob = InboundMessage::in_channel("bob", "#goxxx", "!rmpic x y");
        assert!(!require_admin(&tracker, &from_bob, &sink).await);
        assert_eq!(sink.replies()[0].target, "#goxxx");
        assert!(sink.texts()[0].ends_with("(Admin: \"alice\")"));
    }
}
