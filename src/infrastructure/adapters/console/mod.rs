//! Console adapter for development/testing
//!
//! Every stdin line is a channel message from the local operator; a line
//! starting with `/msg ` is sent to the bot directly. The operator is
//! always in the roster, as a channel admin.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::traits::{Connection, ConnectionEvent};

pub struct ConsoleConnection {
    nick: String,
    operator: String,
    events: mpsc::Sender<ConnectionEvent>,
}

impl ConsoleConnection {
    /// Start reading stdin and return the connection with its events
    pub fn start(nick: impl Into<String>, channel: impl Into<String>) -> (Self, mpsc::Receiver<ConnectionEvent>) {
        let nick = nick.into();
        let channel = channel.into();
        let operator = std::env::var("USER")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "operator".to_string());
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(read_stdin(nick.clone(), operator.clone(), channel, tx.clone()));

        (Self { nick, operator, events: tx }, rx)
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    async fn emit(&self, event: ConnectionEvent) -> Result<(), BotError> {
        self.events
            .send(event)
            .await
            .map_err(|_| BotError::Disconnected("console closed".to_string()))
    }
}

async fn read_stdin(nick: String, operator: String, channel: String, events: mpsc::Sender<ConnectionEvent>) {
    if events.send(ConnectionEvent::Registered { nick: nick.clone() }).await.is_err() {
        return;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => {
                let (target, text) = match line.strip_prefix("/msg ") {
                    Some(text) => (nick.clone(), text.to_string()),
                    None => (channel.clone(), line),
                };
                ConnectionEvent::Message {
                    from: operator.clone(),
                    target,
                    text,
                }
            }
            Ok(None) => ConnectionEvent::Disconnected {
                reason: "stdin closed".to_string(),
            },
            Err(e) => ConnectionEvent::Disconnected { reason: e.to_string() },
        };

        let last = matches!(event, ConnectionEvent::Disconnected { .. });
        if events.send(event).await.is_err() || last {
            return;
        }
    }
}

#[async_trait]
impl Connection for ConsoleConnection {
    async fn join(&self, channel: &str, key: Option<&str>) -> Result<(), BotError> {
        tracing::info!("Joining {} (key set: {})", channel, key.is_some());
        println!("* {} joined {}", self.nick, channel);
        self.emit(ConnectionEvent::Joined {
            channel: channel.to_string(),
            nick: self.nick.clone(),
        })
        .await?;
        self.query_roster(channel).await
    }

    async fn send(&self, target: &str, text: &str) -> Result<(), BotError> {
        println!("[{}] <{}> {}", target, self.nick, text);
        Ok(())
    }

    async fn query_roster(&self, channel: &str) -> Result<(), BotError> {
        self.emit(ConnectionEvent::Roster {
            channel: channel.to_string(),
            entries: vec![format!("@{}", self.operator), self.nick.clone()],
        })
        .await
    }

    async fn disconnect(&self, reason: Option<&str>) -> Result<(), BotError> {
        println!("* {} quit ({})", self.nick, reason.unwrap_or(""));
        Ok(())
    }

    fn nick(&self) -> String {
        self.nick.clone()
    }
}
