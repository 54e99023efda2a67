//! Shared HTTP client for the web-facing modules

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::application::errors::BotError;

pub const USER_AGENT: &str = "Goxxx/1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
/// Bytes kept from a response body, the rest is never read
pub const MAX_BODY_BYTES: usize = 512 * 1024;

/// A fetched document and where the redirects ended
#[derive(Debug, Clone)]
pub struct Page {
    pub final_url: String,
    pub body: String,
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` as text, truncated to [`MAX_BODY_BYTES`]; non-success statuses are errors
    pub async fn fetch(&self, url: &str) -> Result<Page, BotError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/json")
            .send()
            .await?
            .error_for_status()?;

        let final_url = response.url().to_string();
        let body = read_capped(response, MAX_BODY_BYTES).await?;
        Ok(Page { final_url, body })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BotError> {
        let page = self.fetch(url).await?;
        serde_json::from_str(&page.body).map_err(|e| BotError::Parse(format!("{}: {}", url, e)))
    }
}

async fn read_capped(mut response: Response, cap: usize) -> Result<String, BotError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if append_capped(&mut body, &chunk, cap) {
            tracing::debug!("Body of {} truncated at {} bytes", response.url(), cap);
            break;
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Append what fits under `cap`; true once the body is full
fn append_capped(body: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(body.len());
    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    body.len() >= cap
}

/// Collapse whitespace runs into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the handful of entities commonly found in titles
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Drop every `<...>` tag, keeping the text between them
pub fn strip_tags(html: &str) -> String {
    let mut in_tag = false;
    let mut result = String::with_capacity(html.len());
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace("\n"), "");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry &lt;3 &quot;hi&quot; it&#39;s"), "Tom & Jerry <3 \"hi\" it's");
        // No double decoding
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>bold</b> and <i>italic</i>"), "bold and italic");
    }

    #[test]
    fn test_append_capped() {
        let mut body = Vec::new();
        assert!(!append_capped(&mut body, b"abc", 5));
        assert!(append_capped(&mut body, b"defg", 5));
        assert_eq!(body, b"abcde");
    }

    #[tokio::test]
    async fn test_fetch_truncates_large_pages() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let body = format!("<title>Huge</title>{}", "x".repeat(2 * MAX_BODY_BYTES));
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            // The client hangs up once it has enough
            let _ = socket.write_all(body.as_bytes()).await;
        });

        let client = HttpClient::new(DEFAULT_TIMEOUT).unwrap();
        let page = client.fetch(&format!("http://{}/", address)).await.unwrap();
        assert_eq!(page.body.len(), MAX_BODY_BYTES);
        assert!(page.body.starts_with("<title>Huge</title>"));
    }

    #[test]
    fn test_client_builds() {
        assert!(HttpClient::new(DEFAULT_TIMEOUT).is_ok());
    }
}
