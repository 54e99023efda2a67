//! Test doubles shared by the unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::errors::BotError;
use crate::application::services::MembershipTracker;
use crate::domain::entities::OutboundReply;
use crate::domain::traits::{Connection, ReplySink};

pub const CHANNEL: &str = "#goxxx";

/// Sink that keeps every reply
#[derive(Default)]
pub struct RecordingSink {
    replies: Mutex<Vec<OutboundReply>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<OutboundReply> {
        self.replies.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.replies.lock().iter().map(|r| r.text.clone()).collect()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send(&self, reply: OutboundReply) {
        self.replies.lock().push(reply);
    }
}

/// Connection that answers roster queries immediately with a fixed roster
pub struct MockConnection {
    roster: Mutex<Vec<String>>,
    tracker: OnceLock<Weak<MembershipTracker>>,
    roster_queries: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
    joins: Mutex<Vec<(String, Option<String>)>>,
    quits: Mutex<Vec<Option<String>>>,
    nick: Mutex<String>,
}

impl MockConnection {
    pub fn new(roster: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            roster: Mutex::new(roster.iter().map(|e| e.to_string()).collect()),
            tracker: OnceLock::new(),
            roster_queries: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            joins: Mutex::new(Vec::new()),
            quits: Mutex::new(Vec::new()),
            nick: Mutex::new("goxxx".to_string()),
        })
    }

    /// A connection plus a tracker it feeds, with the roster already applied
    pub fn tracker(roster: &[&str]) -> (Arc<Self>, Arc<MembershipTracker>) {
        let connection = Self::new(roster);
        let tracker = Arc::new(MembershipTracker::new(
            connection.clone(),
            CHANNEL,
            Duration::from_secs(1),
        ));
        let _ = connection.tracker.set(Arc::downgrade(&tracker));
        tracker.apply_roster(CHANNEL, &connection.roster.lock().clone());
        (connection, tracker)
    }

    pub fn set_roster(&self, roster: &[&str]) {
        *self.roster.lock() = roster.iter().map(|e| e.to_string()).collect();
    }

    pub fn roster_queries(&self) -> usize {
        self.roster_queries.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    pub fn joins(&self) -> Vec<(String, Option<String>)> {
        self.joins.lock().clone()
    }

    pub fn quits(&self) -> Vec<Option<String>> {
        self.quits.lock().clone()
    }

    pub fn set_nick(&self, nick: &str) {
        *self.nick.lock() = nick.to_string();
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn join(&self, channel: &str, key: Option<&str>) -> Result<(), BotError> {
        self.joins.lock().push((channel.to_string(), key.map(str::to_string)));
        Ok(())
    }

    async fn send(&self, target: &str, text: &str) -> Result<(), BotError> {
        self.sent.lock().push((target.to_string(), text.to_string()));
        Ok(())
    }

    async fn query_roster(&self, channel: &str) -> Result<(), BotError> {
        self.roster_queries.fetch_add(1, Ordering::SeqCst);
        let roster = self.roster.lock().clone();
        if let Some(tracker) = self.tracker.get().and_then(Weak::upgrade) {
            tracker.apply_roster(channel, &roster);
        }
        Ok(())
    }

    async fn disconnect(&self, reason: Option<&str>) -> Result<(), BotError> {
        self.quits.lock().push(reason.map(str::to_string));
        Ok(())
    }

    fn nick(&self) -> String {
        self.nick.lock().clone()
    }
}
