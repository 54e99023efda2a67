//! Link titles and the link history

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use url::Url;

use super::{ModuleContext, URL_REGEX};
use crate::application::errors::BotError;
use crate::application::messaging::ReplyMode;
use crate::domain::entities::{Command, CommandHandler, HandlerRegistry, HandlerResult, InboundMessage, OutboundReply, PassiveHandler};
use crate::domain::traits::ReplySink;
use crate::infrastructure::database::{Database, Link};
use crate::infrastructure::http::{collapse_whitespace, decode_entities, strip_tags, HttpClient};

/// Name the `!url`/`!urlt` help lines are filed under
pub const MODULE: &str = "url";

const MAX_URLS: usize = 10;
const SHORTENERS: [&str; 3] = ["t.co", "bit.ly", "goo.gl"];

static TITLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title pattern"));

pub fn install(registry: &mut HandlerRegistry, ctx: &ModuleContext) {
    let reply = ctx.sink(ReplyMode::Reply);

    registry.register_passive(
        "webinfo",
        Arc::new(LinkTitles {
            db: ctx.db.clone(),
            http: ctx.http.clone(),
        }),
        ctx.sink(ReplyMode::ToChannel),
    );
    registry.register_command(
        Command::new(MODULE, Arc::new(SearchLinks { db: ctx.db.clone(), by: SearchBy::Title }))
            .with_triggers(["!urlt"])
            .with_help("!urlt <search terms> => Return links with titles matching <search terms>"),
        reply.clone(),
    );
    registry.register_command(
        Command::new(MODULE, Arc::new(SearchLinks { db: ctx.db.clone(), by: SearchBy::Url }))
            .with_triggers(["!url"])
            .with_help("!url <search terms> => Return links with urls matching <search terms>"),
        reply,
    );
}

/// Up to ten URLs found in `text`, with a scheme and an ASCII host
pub fn find_urls(text: &str) -> Vec<Url> {
    let mut urls = Vec::new();
    for candidate in URL_REGEX.find_iter(text).take(MAX_URLS) {
        let candidate = candidate.as_str();
        let absolute = if candidate.contains("://") {
            candidate.to_string()
        } else {
            format!("http://{}", candidate)
        };
        match Url::parse(&absolute) {
            Ok(url) => urls.push(url),
            Err(e) => {
                tracing::debug!("Unparsable URL candidate {}: {}", candidate, e);
                break;
            }
        }
    }
    urls
}

/// Text of the first `<title>`, cleaned up; `None` when missing or empty
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_REGEX.captures(html)?.get(1)?.as_str();
    let title = collapse_whitespace(&decode_entities(&strip_tags(raw)));
    (!title.is_empty()).then_some(title)
}

fn is_shortener(url: &Url) -> bool {
    url.host_str().is_some_and(|host| SHORTENERS.contains(&host))
}

/// Passive handler posting the title of every link seen
struct LinkTitles {
    db: Arc<Database>,
    http: HttpClient,
}

#[async_trait]
impl PassiveHandler for LinkTitles {
    async fn observe(&self, message: &InboundMessage, sink: &dyn ReplySink) -> Result<(), BotError> {
        for url in find_urls(&message.text) {
            tracing::debug!("Detected URL: {}", url);

            let page = match self.http.fetch(url.as_str()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", url, e);
                    return Ok(());
                }
            };

            let known = self.db.find_link(url.as_str())?;
            if let Some(link) = &known {
                sink.send(OutboundReply::to_channel(format!(
                    "Link already posted by {} ({})",
                    link.user, link.date
                )))
                .await;
            }

            let title = extract_title(&page.body);
            match &title {
                Some(title) if is_shortener(&url) => {
                    sink.send(OutboundReply::to_channel(format!("{} ({})", title, page.final_url)))
                        .await;
                }
                Some(title) => sink.send(OutboundReply::to_channel(title.as_str())).await,
                None => tracing::debug!("No title found for {}", url),
            }

            if known.is_none() {
                self.db
                    .add_link(&message.sender, url.as_str(), title.as_deref().unwrap_or_default())?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum SearchBy {
    Url,
    Title,
}

struct SearchLinks {
    db: Arc<Database>,
    by: SearchBy,
}

fn describe(link: &Link) -> String {
    let title = if link.title.is_empty() { "No Title" } else { &link.title };
    format!("{} ({}) [Posted by {}, {}]", title, link.url, link.user, link.date)
}

#[async_trait]
impl CommandHandler for SearchLinks {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        if fields.len() < 2 {
            return Ok(false);
        }

        let search = fields[1..].join(" ");
        let (links, header) = match self.by {
            SearchBy::Url => (self.db.links_by_url(&search)?, "URLs matching"),
            SearchBy::Title => (self.db.links_by_title(&search)?, "Link found for"),
        };

        for link in links {
            sink.send(OutboundReply::new(
                format!("{} \"{}\" => {}", header, search, describe(&link)),
                message.reply_target(),
            ))
            .await;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    #[test]
    fn test_find_urls() {
        let urls = find_urls("look: https://www.rust-lang.org/learn and www.example.org!");
        let urls: Vec<_> = urls.iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["https://www.rust-lang.org/learn", "http://www.example.org/"]);
    }

    #[test]
    fn test_find_urls_converts_unicode_hosts() {
        let urls = find_urls("http://bücher.example/");
        assert_eq!(urls[0].host_str(), Some("xn--bcher-kva.example"));
    }

    #[test]
    fn test_find_urls_limit() {
        let text = (0..15).map(|i| format!("http://e{}.org/", i)).collect::<Vec<_>>().join(" ");
        assert_eq!(find_urls(&text).len(), MAX_URLS);
    }

    #[test]
    fn test_extract_title() {
        let html = "<html><head><TITLE lang=\"en\">\n  Tom &amp; Jerry\n  &#39;cartoons&#39;  </TITLE></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Tom & Jerry 'cartoons'"));
        assert_eq!(extract_title("<title><b>Bold</b> move</title>").as_deref(), Some("Bold move"));
        assert_eq!(extract_title("<title>   </title>"), None);
        assert_eq!(extract_title("<p>no title</p>"), None);
    }

    #[test]
    fn test_is_shortener() {
        assert!(is_shortener(&Url::parse("https://t.co/abc").unwrap()));
        assert!(!is_shortener(&Url::parse("https://tt.co/abc").unwrap()));
    }

    #[tokio::test]
    async fn test_search_links() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.add_link("alice", "https://docs.rs/tokio", "tokio - Rust").unwrap();
        db.add_link("bob", "https://example.org/", "").unwrap();

        let by_url = SearchLinks { db: db.clone(), by: SearchBy::Url };
        let sink = RecordingSink::new();
        by_url
            .handle(&InboundMessage::in_channel("carol", "#goxxx", "!url example"), &sink)
            .await
            .unwrap();
        let texts = sink.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("URLs matching \"example\" => No Title (https://example.org/) [Posted by bob, "));
        assert_eq!(sink.replies()[0].target, "#goxxx");

        let by_title = SearchLinks { db, by: SearchBy::Title };
        let sink = RecordingSink::new();
        by_title
            .handle(&InboundMessage::direct("carol", "!urlt tokio"), &sink)
            .await
            .unwrap();
        assert!(sink.texts()[0].starts_with("Link found for \"tokio\" => tokio - Rust (https://docs.rs/tokio)"));
        assert_eq!(sink.replies()[0].target, "carol");
    }
}
