//! Channel membership cache

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;

use crate::application::errors::BotError;
use crate::domain::entities::MembershipRoster;
use crate::domain::traits::Connection;

/// Default bound on a roster query round-trip
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterState {
    /// Nothing fetched yet, or invalidated
    Stale,
    /// Populated by a roster response
    Fresh,
}

/// Best-effort cache of the channel roster.
///
/// Readers always get a whole roster snapshot; a refresh swaps the
/// value instead of patching it. Only one refresh is in flight at a
/// time: concurrent callers queue on `refresh_lock` and reuse the
/// roster that arrived while they waited.
pub struct MembershipTracker {
    connection: Arc<dyn Connection>,
    channel: String,
    timeout: Duration,
    roster: RwLock<Arc<MembershipRoster>>,
    state: RwLock<RosterState>,
    generation: AtomicU64,
    refresh_lock: tokio::sync::Mutex<()>,
    pending: Mutex<Option<oneshot::Sender<Arc<MembershipRoster>>>>,
}

impl MembershipTracker {
    pub fn new(connection: Arc<dyn Connection>, channel: impl Into<String>, timeout: Duration) -> Self {
        Self {
            connection,
            channel: channel.into(),
            timeout,
            roster: RwLock::new(Arc::new(MembershipRoster::default())),
            state: RwLock::new(RosterState::Stale),
            generation: AtomicU64::new(0),
            refresh_lock: tokio::sync::Mutex::new(()),
            pending: Mutex::new(None),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn state(&self) -> RosterState {
        *self.state.read()
    }

    pub fn snapshot(&self) -> Arc<MembershipRoster> {
        self.roster.read().clone()
    }

    pub fn invalidate(&self) {
        *self.state.write() = RosterState::Stale;
    }

    /// Install a roster response. Completes the pending refresh, if any;
    /// unsolicited responses (e.g. the one following our JOIN) are
    /// applied as well.
    pub fn apply_roster<S: AsRef<str>>(&self, channel: &str, entries: &[S]) {
        if !channel.eq_ignore_ascii_case(&self.channel) {
            tracing::debug!("Ignoring roster for {}", channel);
            return;
        }

        let roster = Arc::new(MembershipRoster::parse(entries));
        tracing::debug!("Roster for {}: {}", self.channel, roster);

        *self.roster.write() = roster.clone();
        *self.state.write() = RosterState::Fresh;
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(waiter) = self.pending.lock().take() {
            let _ = waiter.send(roster);
        }
    }

    /// Query the network and wait for the answer.
    pub async fn refresh(&self) -> Result<Arc<MembershipRoster>, BotError> {
        let observed = self.generation.load(Ordering::SeqCst);
        let _guard = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::SeqCst) != observed {
            return Ok(self.snapshot());
        }

        let (tx, rx) = oneshot::channel();
        *self.pending.lock() = Some(tx);

        if let Err(e) = self.connection.query_roster(&self.channel).await {
            self.pending.lock().take();
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(roster)) => Ok(roster),
            Ok(Err(_)) => Err(BotError::Internal("roster refresh abandoned".to_string())),
            Err(_) => {
                self.pending.lock().take();
                Err(BotError::Timeout(self.timeout))
            }
        }
    }

    /// Whether `nick` is in the channel, refreshing once on a cache miss.
    /// A failed or timed-out refresh counts as "not a member".
    pub async fn ensure_member(&self, nick: &str) -> bool {
        if self.snapshot().is_member(nick) {
            return true;
        }

        tracing::debug!("{} not in cached roster, refreshing", nick);
        match self.refresh().await {
            Ok(roster) => roster.is_member(nick),
            Err(e) => {
                tracing::warn!("Roster refresh for {} failed: {}", self.channel, e);
                false
            }
        }
    }

    /// Fresh roster for admin checks, falling back to the cache
    pub async fn refreshed_roster(&self) -> Arc<MembershipRoster> {
        match self.refresh().await {
            Ok(roster) => roster,
            Err(e) => {
                tracing::warn!("Roster refresh for {} failed: {}, using cache", self.channel, e);
                self.snapshot()
            }
        }
    }
}
