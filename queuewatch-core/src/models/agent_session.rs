use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AgentSession {
    pub session_id: String,
    pub queue: String,
    pub agent: String,
    pub extension: String,
    pub calls_taken: i32,
    pub last_call: Option<DateTime<Utc>>,
    pub status: i16,
    pub logged_since: DateTime<Utc>,
}
