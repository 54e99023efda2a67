//! Web searches: DuckDuckGo, Wikipedia (EN and FR) and Urban Dictionary

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;

use super::ModuleContext;
use crate::application::messaging::ReplyMode;
use crate::domain::entities::{Command, CommandHandler, HandlerRegistry, HandlerResult, InboundMessage, OutboundReply};
use crate::domain::traits::ReplySink;
use crate::infrastructure::http::HttpClient;

pub const MODULE: &str = "search";

static DUCKDUCKGO_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a rel="nofollow" href="([^"]+)">"#).expect("valid link pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    DuckDuckGo,
    Wikipedia { lang: &'static str },
    UrbanDictionary,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::DuckDuckGo => "DuckDuckGo",
            Provider::Wikipedia { .. } => "Wikipedia",
            Provider::UrbanDictionary => "Urban Dictionary",
        }
    }

    /// Request URL for already title-cased terms
    pub fn url(&self, terms: &str) -> String {
        let terms = urlencoding::encode(terms);
        match self {
            Provider::DuckDuckGo => format!("https://duckduckgo.com/html/?q={}", terms),
            Provider::Wikipedia { lang } => format!(
                "https://{}.wikipedia.org/w/api.php?format=json&action=query&prop=extracts|info&exintro=&explaintext=&inprop=url&titles={}",
                lang, terms
            ),
            Provider::UrbanDictionary => format!("http://api.urbandictionary.com/v0/define?term={}", terms),
        }
    }

    /// Result lines found in a response body, best first
    pub fn parse(&self, body: &str) -> Vec<String> {
        match self {
            Provider::DuckDuckGo => parse_duckduckgo(body),
            Provider::Wikipedia { .. } => parse_wikipedia(body),
            Provider::UrbanDictionary => parse_urban(body),
        }
    }

    fn headline(&self, terms: &str, first: &str) -> String {
        match self {
            Provider::DuckDuckGo => format!("DuckDuckGo: Best result for \"{}\" => {}", terms, first),
            _ => format!("{} result for \"{}\" => {}", self.name(), terms, first),
        }
    }
}

pub fn install(registry: &mut HandlerRegistry, ctx: &ModuleContext) {
    let commands = [
        (
            Provider::DuckDuckGo,
            &["!d", "!dg", "!ddg"][..],
            "!d/!dg/!ddg <terms to search> => Search on DuckduckGo",
        ),
        (
            Provider::Wikipedia { lang: "en" },
            &["!w", "!wiki"][..],
            "!w/!wiki <terms to search> => Search on Wikipedia EN",
        ),
        (
            Provider::Wikipedia { lang: "fr" },
            &["!wf", "!wfr"][..],
            "!wf/!wfr <terms to search> => Search on Wikipedia FR",
        ),
        (
            Provider::UrbanDictionary,
            &["!u", "!ud"][..],
            "!u/!ud <terms to search> => Search on Urban Dictionary",
        ),
    ];

    let sink = ctx.sink(ReplyMode::Reply);
    for (provider, triggers, help) in commands {
        registry.register_command(
            Command::new(
                MODULE,
                Arc::new(SearchCommand {
                    provider,
                    http: ctx.http.clone(),
                }),
            )
            .with_triggers(triggers.iter().copied())
            .with_help(help),
            sink.clone(),
        );
    }
}

/// Uppercase the first letter of every word
pub fn title_case(terms: &str) -> String {
    terms
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn sentences(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_duckduckgo(html: &str) -> Vec<String> {
    DUCKDUCKGO_LINK
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| vec![m.as_str().to_string()])
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct WikipediaResponse {
    query: WikipediaQuery,
}

#[derive(Debug, Deserialize)]
struct WikipediaQuery {
    #[serde(default)]
    pages: BTreeMap<String, WikipediaPage>,
}

#[derive(Debug, Deserialize)]
struct WikipediaPage {
    #[serde(default)]
    extract: String,
    #[serde(default)]
    fullurl: String,
}

/// Page URL then the intro sentences; the "-1" page means no match
pub fn parse_wikipedia(json: &str) -> Vec<String> {
    let response: WikipediaResponse = match serde_json::from_str(json) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Invalid Wikipedia response: {}", e);
            return Vec::new();
        }
    };

    let mut lines = Vec::new();
    for (key, page) in response.query.pages {
        if key == "-1" || page.fullurl.is_empty() {
            continue;
        }
        lines.push(page.fullurl);
        lines.extend(sentences(&page.extract));
    }
    lines
}

#[derive(Debug, Deserialize)]
struct UrbanResponse {
    #[serde(default)]
    list: Vec<UrbanDefinition>,
}

#[derive(Debug, Deserialize)]
struct UrbanDefinition {
    definition: String,
    permalink: String,
}

/// Permalink then the sentences of the top definition
pub fn parse_urban(json: &str) -> Vec<String> {
    let response: UrbanResponse = match serde_json::from_str(json) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Invalid Urban Dictionary response: {}", e);
            return Vec::new();
        }
    };

    match response.list.into_iter().next() {
        Some(top) => std::iter::once(top.permalink)
            .chain(sentences(&top.definition))
            .collect(),
        None => Vec::new(),
    }
}

struct SearchCommand {
    provider: Provider,
    http: HttpClient,
}

impl SearchCommand {
    async fn search(&self, terms: &str) -> Vec<String> {
        let url = self.provider.url(&title_case(terms));
        match self.http.fetch(&url).await {
            Ok(page) => self.provider.parse(&page.body),
            Err(e) => {
                tracing::warn!("{} search for \"{}\" failed: {}", self.provider.name(), terms, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl CommandHandler for SearchCommand {
    async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) -> HandlerResult {
        let fields = message.fields();
        let target = message.reply_target();
        if fields.len() < 2 {
            let trigger = fields.first().copied().unwrap_or_default();
            sink.send(OutboundReply::new(
                format!("Search usage: {} \"terms to search for\"", trigger),
                target,
            ))
            .await;
            return Ok(false);
        }

        let terms = fields[1..].join(" ");
        let mut lines = self.search(&terms).await.into_iter();
        let Some(first) = lines.next() else {
            sink.send(OutboundReply::new(
                format!("{}: No result for \"{}\"", self.provider.name(), terms),
                target,
            ))
            .await;
            return Ok(true);
        };

        sink.send(OutboundReply::new(self.provider.headline(&terms, &first), target))
            .await;
        for line in lines {
            sink.send(OutboundReply::new(line, message.sender.as_str())).await;
        }
        Ok(true)
    }
}
