//! Open mission sessions shared across requests.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use db::models::mission_ref::MissionRef;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{
    mission_session::{MissionSession, SessionError},
    progress_store::ProgressStore,
};

pub type SharedSession = Arc<Mutex<MissionSession>>;

/// Sessions idle for longer than this are dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);
/// Live sessions kept per learner; the least recently used goes first
pub const DEFAULT_MAX_SESSIONS_PER_LEARNER: usize = 8;

type SessionKey = (String, i32);

struct SessionEntry {
    session: SharedSession,
    last_used: Instant,
}

impl SessionEntry {
    fn is_expired(&self, idle_timeout: Duration) -> bool {
        self.last_used.elapsed() >= idle_timeout
    }
}

/// Sessions keyed by learner and day number, so a mission reached through
/// its catalog id or its `day-N` ref lands on the same session.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionKey, SessionEntry>>,
    /// Catalog id to day number, learned as sessions open
    days_by_id: Arc<DashMap<Uuid, i32>>,
    idle_timeout: Duration,
    max_sessions_per_learner: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS_PER_LEARNER)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions_per_learner: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            days_by_id: Arc::new(DashMap::new()),
            idle_timeout,
            max_sessions_per_learner: max_sessions_per_learner.max(1),
        }
    }

    fn day_of(&self, mission: MissionRef) -> Option<i32> {
        match mission {
            MissionRef::Persisted(id) => self.days_by_id.get(&id).map(|day| *day),
            virtual_ref => virtual_ref.virtual_day(),
        }
    }

    /// Open a fresh session, replacing any registered for the same day.
    pub async fn open(
        &self,
        store: Arc<dyn ProgressStore>,
        user_id: &str,
        mission: MissionRef,
    ) -> Result<SharedSession, SessionError> {
        let session = MissionSession::open(store, user_id, mission).await?;
        let day = session.slot().day_number;
        if let Some(id) = session.slot().mission_ref.persisted_id() {
            self.days_by_id.insert(id, day);
        }

        self.evict_idle();
        self.enforce_learner_cap(user_id, day);

        let shared = Arc::new(Mutex::new(session));
        self.sessions.insert(
            (user_id.to_string(), day),
            SessionEntry {
                session: shared.clone(),
                last_used: Instant::now(),
            },
        );
        debug!(user_id = %user_id, day, sessions = self.sessions.len(), "Registered mission session");

        Ok(shared)
    }

    /// Live session for `mission`, refreshing its idle clock. An expired
    /// session is dropped and reported as absent.
    pub fn get(&self, user_id: &str, mission: MissionRef) -> Option<SharedSession> {
        let key = (user_id.to_string(), self.day_of(mission)?);
        let mut entry = self.sessions.get_mut(&key)?;
        if entry.is_expired(self.idle_timeout) {
            drop(entry);
            self.sessions.remove(&key);
            debug!(user_id = %user_id, day = key.1, "Dropped idle mission session");
            return None;
        }
        entry.last_used = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn get_or_open(
        &self,
        store: Arc<dyn ProgressStore>,
        user_id: &str,
        mission: MissionRef,
    ) -> Result<SharedSession, SessionError> {
        match self.get(user_id, mission) {
            Some(session) => Ok(session),
            None => self.open(store, user_id, mission).await,
        }
    }

    fn evict_idle(&self) {
        let idle_timeout = self.idle_timeout;
        self.sessions.retain(|_, entry| !entry.is_expired(idle_timeout));
    }

    /// Make room for one more session of `user_id`, unless `day` already has one.
    fn enforce_learner_cap(&self, user_id: &str, day: i32) {
        let mut owned: Vec<(i32, Instant)> = self
            .sessions
            .iter()
            .filter(|entry| entry.key().0 == user_id && entry.key().1 != day)
            .map(|entry| (entry.key().1, entry.value().last_used))
            .collect();
        if owned.len() < self.max_sessions_per_learner {
            return;
        }

        owned.sort_by_key(|(_, last_used)| *last_used);
        let excess = owned.len() + 1 - self.max_sessions_per_learner;
        for (stale_day, _) in owned.into_iter().take(excess) {
            self.sessions.remove(&(user_id.to_string(), stale_day));
            debug!(user_id = %user_id, day = stale_day, "Evicted least recently used mission session");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
