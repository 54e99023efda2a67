//! Shared doubles for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use goxxx::application::errors::BotError;
use goxxx::application::services::MembershipTracker;
use goxxx::domain::traits::Connection;

pub const CHANNEL: &str = "#goxxx";

/// How the fake server answers a NAMES query
#[derive(Debug, Clone, Copy)]
pub enum RosterAnswer {
    /// Roster arrives after the given delay
    After(Duration),
    /// Server never answers
    Never,
}

#[derive(Debug, Clone)]
pub struct SentLine {
    pub target: String,
    pub text: String,
    pub at: Instant,
}

pub struct FakeConnection {
    roster: Mutex<Vec<String>>,
    answer: RosterAnswer,
    tracker: OnceLock<Weak<MembershipTracker>>,
    queries: AtomicUsize,
    sent: Mutex<Vec<SentLine>>,
}

impl FakeConnection {
    pub fn new(roster: &[&str], answer: RosterAnswer) -> Arc<Self> {
        Arc::new(Self {
            roster: Mutex::new(roster.iter().map(|e| e.to_string()).collect()),
            answer,
            tracker: OnceLock::new(),
            queries: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Tracker fed by this connection, starting from an empty roster
    pub fn tracker(self: &Arc<Self>, timeout: Duration) -> Arc<MembershipTracker> {
        let tracker = Arc::new(MembershipTracker::new(self.clone(), CHANNEL, timeout));
        let _ = self.tracker.set(Arc::downgrade(&tracker));
        tracker
    }

    pub fn set_roster(&self, roster: &[&str]) {
        *self.roster.lock().unwrap() = roster.iter().map(|e| e.to_string()).collect();
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentLine> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn join(&self, _channel: &str, _key: Option<&str>) -> Result<(), BotError> {
        Ok(())
    }

    async fn send(&self, target: &str, text: &str) -> Result<(), BotError> {
        self.sent.lock().unwrap().push(SentLine {
            target: target.to_string(),
            text: text.to_string(),
            at: Instant::now(),
        });
        Ok(())
    }

    async fn query_roster(&self, channel: &str) -> Result<(), BotError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let RosterAnswer::After(delay) = self.answer else {
            return Ok(());
        };
        let roster = self.roster.lock().unwrap().clone();
        let tracker = self.tracker.get().cloned();
        let channel = channel.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tracker) = tracker.and_then(|t| t.upgrade()) {
                tracker.apply_roster(&channel, &roster);
            }
        });
        Ok(())
    }

    async fn disconnect(&self, _reason: Option<&str>) -> Result<(), BotError> {
        Ok(())
    }

    fn nick(&self) -> String {
        "goxxx".to_string()
    }
}
