#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queuewatch_core::classify::{LoginIntent, LogoffIntent, StatusIntent};
use queuewatch_core::{AgentSession, QueuewatchError};
use queuewatch_server::store::SessionStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory stand-in for the PostgreSQL store with the same keying rules.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<AgentSession>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every primitive fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of primitives invoked, successful or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<AgentSession> {
        self.rows.lock().unwrap().clone()
    }

    pub fn find(&self, queue: &str, extension: &str) -> Option<AgentSession> {
        self.rows()
            .into_iter()
            .find(|r| r.queue == queue && r.extension == extension)
    }

    fn begin(&self) -> Result<(), QueuewatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueuewatchError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_if_absent(&self, login: &LoginIntent) -> Result<bool, QueuewatchError> {
        self.begin()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.session_id == login.session_id) {
            return Ok(false);
        }
        rows.push(AgentSession {
            session_id: login.session_id.clone(),
            queue: login.queue.clone(),
            agent: login.agent.clone(),
            extension: login.extension.clone(),
            calls_taken: 0,
            last_call: None,
            status: 1,
            logged_since: timestamp(login.logged_since),
        });
        Ok(true)
    }

    async fn delete_by_key(&self, logoff: &LogoffIntent) -> Result<u64, QueuewatchError> {
        self.begin()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !(r.queue == logoff.queue && r.extension == logoff.extension));
        Ok((before - rows.len()) as u64)
    }

    async fn update_if_exists(&self, status: &StatusIntent) -> Result<u64, QueuewatchError> {
        self.begin()?;
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for row in rows
            .iter_mut()
            .filter(|r| r.queue == status.queue && r.extension == status.extension)
        {
            row.queue = status.queue.clone();
            row.calls_taken = status.calls_taken;
            row.last_call = status.last_call.map(timestamp);
            row.status = status.status;
            updated += 1;
        }
        Ok(updated)
    }
}
