//! XKCD comic lookup

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::ModuleContext;
use crate::application::errors::CommandError;
use crate::application::messaging::ReplyMode;
use crate::domain::entities::{Command, CommandHandler, HandlerRegistry, HandlerResult, InboundMessage, OutboundReply};
use crate::domain::traits::ReplySink;
use crate::infrastructure::http::HttpClient;

pub const MODULE: &str = "xkcd";

const LATEST_URL: &str = "https://xkcd.com/info.0.json";

#[derive(Debug, Clone, Deserialize)]
struct Comic {
    num: i64,
    title: String,
}

impl Comic {
    fn link(&self) -> String {
        format!("https://xkcd.com/{}/", self.num)
    }
}

pub fn install(registry: &mut HandlerRegistry, ctx: &ModuleContext) {
    registry.register_command(
        Command::new(MODULE, Arc::new(XkcdCommand { http: ctx.http.clone() }))
            .with_triggers(["!xkcd"])
            .with_help("!xkcd [<comic number>] => Return the last XKCD comic, or the one matching <comic number>"),
        ctx.sink(ReplyMode::Reply),
    );
}

struct XkcdCommand {
    http: HttpClient,
}

/// What the arguments ask for
#[derive(Debug, PartialEq, Eq)]
enum Request {
    Latest,
    Number(i64),
}

fn parse_request(fields: &[&str]) -> Option<Request> {
    match fields {
        [_] => Some(Request::Latest),
        [_, number, ..] => number.parse().ok().map(Request::Number),
        [] => None,
    }
}

#[async_trait]
impl CommandHandler for XkcdCommand {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let Some(request) = parse_request(&message.fields()) else {
            return Ok(false);
        };

        let latest: Comic = self.http.get_json(LATEST_URL).await?;
        let text = match request {
            Request::Latest => format!("Last XKCD Comic: {} => {}", latest.title, latest.link()),
            Request::Number(n) if n <= 0 || n > latest.num => format!("There is no XKCD comic #{}", n),
            Request::Number(n) => {
                let comic: Comic = self
                    .http
                    .get_json(&format!("https://xkcd.com/{}/info.0.json", n))
                    .await?;
                if comic.num != n {
                    return Err(CommandError::ExecutionFailed(format!(
                        "asked for comic #{}, got #{}",
                        n, comic.num
                    ))
                    .into());
                }
                format!("XKCD Comic #{}: {} => {}", comic.num, comic.title, comic.link())
            }
        };

        sink.send(OutboundReply::new(text, message.reply_target())).await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        assert_eq!(parse_request(&["!xkcd"]), Some(Request::Latest));
        assert_eq!(parse_request(&["!xkcd", "327"]), Some(Request::Number(327)));
        assert_eq!(parse_request(&["!xkcd", "-3"]), Some(Request::Number(-3)));
        assert_eq!(parse_request(&["!xkcd", "bobby"]), None);
    }

    #[test]
    fn test_comic_json() {
        let comic: Comic = serde_json::from_str(
            r#"{"num": 327, "title": "Exploits of a Mom", "img": "https://imgs.xkcd.com/comics/exploits_of_a_mom.png"}"#,
        )
        .unwrap();
        assert_eq!(comic.link(), "https://xkcd.com/327/");
        assert_eq!(comic.title, "Exploits of a Mom");
    }
}
