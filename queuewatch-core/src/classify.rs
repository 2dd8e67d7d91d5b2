//! Event classification
//!
//! Turns a raw control-channel event into a typed [`Intent`], or a
//! [`Diagnostic`] explaining why it was dropped. No store access.
//!
//! Handled events:
//!   UserEvent / AGENTLOGIN   → Intent::Login
//!   UserEvent / AGENTLOGOFF  → Intent::Logoff
//!   QueueMemberStatus        → Intent::Status
//! Any other event tag is ignored. Tags and sub-tags match exactly; field
//! names are looked up case-insensitively.

use crate::ami::AmiEvent;
use crate::config::ServiceConfig;
use crate::interface::decode_extension;
use thiserror::Error;

pub const USER_EVENT: &str = "UserEvent";
pub const QUEUE_MEMBER_STATUS: &str = "QueueMemberStatus";
pub const AGENT_LOGIN: &str = "AGENTLOGIN";
pub const AGENT_LOGOFF: &str = "AGENTLOGOFF";

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Field of AGENTLOGIN carrying the logged-since epoch.
    pub logged_since_field: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            logged_since_field: "Id".to_string(),
        }
    }
}

impl From<&ServiceConfig> for ClassifierConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            logged_since_field: config.logged_since_field.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginIntent {
    pub session_id: String,
    pub queue: String,
    pub agent: String,
    pub extension: String,
    /// Epoch seconds.
    pub logged_since: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoffIntent {
    pub queue: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusIntent {
    pub queue: String,
    pub member_name: String,
    pub extension: String,
    pub calls_taken: i32,
    /// Epoch seconds; `None` when the switch reports no usable value.
    pub last_call: Option<i64>,
    pub status: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Login(LoginIntent),
    Logoff(LogoffIntent),
    Status(StatusIntent),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("insufficient data for {event}: missing {}", .missing.join(", "))]
    MissingFields { event: String, missing: Vec<String> },

    #[error("unknown UserEvent: {0}")]
    UnknownUserEvent(String),

    #[error("unexpected Interface format: {0}")]
    MalformedInterface(String),

    #[error("invalid integer for {field}: {value:?}")]
    InvalidInteger { field: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Intent(Intent),
    /// Event tag this service does not track.
    Ignored,
    Rejected(Diagnostic),
}

impl From<Result<Intent, Diagnostic>> for Classification {
    fn from(result: Result<Intent, Diagnostic>) -> Self {
        match result {
            Ok(intent) => Classification::Intent(intent),
            Err(diagnostic) => Classification::Rejected(diagnostic),
        }
    }
}

pub fn classify(event: &AmiEvent, config: &ClassifierConfig) -> Classification {
    if event.tag == USER_EVENT {
        classify_user_event(event, config).into()
    } else if event.tag == QUEUE_MEMBER_STATUS {
        classify_queue_member_status(event).into()
    } else {
        Classification::Ignored
    }
}

fn classify_user_event(event: &AmiEvent, config: &ClassifierConfig) -> Result<Intent, Diagnostic> {
    let sub_tag = event.fields.get(USER_EVENT).unwrap_or_default();

    if sub_tag == AGENT_LOGIN {
        let since_field = config.logged_since_field.as_str();
        let values = require(event, AGENT_LOGIN, &["Id", "Fila", "Agente", "Ramal", since_field])?;
        let logged_since = parse_epoch(since_field, values[4])?;

        Ok(Intent::Login(LoginIntent {
            session_id: values[0].to_string(),
            queue: values[1].to_string(),
            agent: values[2].to_string(),
            extension: values[3].to_string(),
            logged_since,
        }))
    } else if sub_tag == AGENT_LOGOFF {
        let values = require(event, AGENT_LOGOFF, &["Fila", "Ramal"])?;

        Ok(Intent::Logoff(LogoffIntent {
            queue: values[0].to_string(),
            extension: values[1].to_string(),
        }))
    } else {
        Err(Diagnostic::UnknownUserEvent(sub_tag.to_string()))
    }
}

fn classify_queue_member_status(event: &AmiEvent) -> Result<Intent, Diagnostic> {
    let values = require(
        event,
        QUEUE_MEMBER_STATUS,
        &["Queue", "MemberName", "Interface", "CallsTaken", "LastCall", "Status"],
    )?;
    let (queue, member_name, interface) = (values[0], values[1], values[2]);

    let extension = decode_extension(interface)
        .ok_or_else(|| Diagnostic::MalformedInterface(interface.to_string()))?;

    let calls_taken = parse_int::<i32>("CallsTaken", values[3]).and_then(|n| {
        if n < 0 {
            Err(invalid("CallsTaken", values[3]))
        } else {
            Ok(n)
        }
    })?;
    let status = parse_int::<i16>("Status", values[5])?;

    Ok(Intent::Status(StatusIntent {
        queue: queue.to_string(),
        member_name: member_name.to_string(),
        extension: extension.to_string(),
        calls_taken,
        last_call: resolve_last_call(Some(values[4])),
        status,
    }))
}

/// A LastCall value is only meaningful as a positive all-digit epoch;
/// `0`, empty, signed or non-numeric input means "unknown".
pub fn resolve_last_call(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|n| *n > 0)
}

/// Look up every named field, reporting all the missing ones at once.
fn require<'a>(event: &'a AmiEvent, name: &str, fields: &[&str]) -> Result<Vec<&'a str>, Diagnostic> {
    let mut values = Vec::with_capacity(fields.len());
    let mut missing = Vec::new();
    for field in fields {
        match event.fields.get_non_empty(field) {
            Some(value) => values.push(value),
            None if !missing.iter().any(|m: &String| m.as_str() == *field) => missing.push(field.to_string()),
            None => {}
        }
    }
    if missing.is_empty() {
        Ok(values)
    } else {
        Err(Diagnostic::MissingFields {
            event: name.to_string(),
            missing,
        })
    }
}

fn parse_int<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, Diagnostic> {
    value.parse::<T>().map_err(|_| invalid(field, value))
}

/// Epoch seconds, accepting the `<seconds>.<sequence>` shape of switch
/// unique ids.
fn parse_epoch(field: &str, value: &str) -> Result<i64, Diagnostic> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !digits(whole) || !digits(fraction) {
        return Err(invalid(field, value));
    }
    whole.parse::<i64>().map_err(|_| invalid(field, value))
}

fn invalid(field: &str, value: &str) -> Diagnostic {
    Diagnostic::InvalidInteger {
        field: field.to_string(),
        value: value.to_string(),
    }
}
