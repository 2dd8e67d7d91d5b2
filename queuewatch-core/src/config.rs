use crate::error::QueuewatchError;
use config::{Config, ConfigError, Environment, Map};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::fmt;

/// Process configuration. Everything comes from the environment; there is
/// no config file and no command line surface.
#[derive(Debug, Deserialize, Clone)]
pub struct QueuewatchConfig {
    pub ami: AmiConfig,
    pub database: DatabaseConfig,
    pub service: ServiceConfig,
}

/// `AMI_*` variables: the switch's manager interface.
#[derive(Deserialize, Clone)]
pub struct AmiConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// `DB_*` variables: the PostgreSQL store.
#[derive(Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: String,
}

/// `QUEUEWATCH_*` variables: tuning knobs, all optional.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    /// AGENTLOGIN field read as the logged-since epoch. The switch dialplan
    /// currently sends the login uniqueid here, so `Id` is the default.
    pub logged_since_field: String,
    /// Mirror table. Must be a plain SQL identifier.
    pub table: String,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
    pub event_buffer: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            logged_since_field: "Id".to_string(),
            table: "agent_sessions".to_string(),
            reconnect_base_ms: 500,
            reconnect_max_ms: 30_000,
            event_buffer: 1024,
        }
    }
}

impl fmt::Debug for AmiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AmiConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.username)
            .password(&self.password)
    }
}

impl QueuewatchConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, QueuewatchError> {
        Self::load(None)
    }

    /// Load from an explicit variable map instead of the process environment.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self, QueuewatchError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<Map<String, String>>) -> Result<Self, QueuewatchError> {
        let ami = Config::builder()
            .set_default("port", 5038)?
            .add_source(Environment::with_prefix("AMI").source(vars.clone()))
            .build()?
            .try_deserialize()?;

        let database = Config::builder()
            .set_default("port", 5432)?
            .add_source(Environment::with_prefix("DB").source(vars.clone()))
            .build()?
            .try_deserialize()?;

        let service: ServiceConfig = Config::builder()
            .add_source(Environment::with_prefix("QUEUEWATCH").source(vars))
            .build()?
            .try_deserialize()?;

        if !is_identifier(&service.table) {
            return Err(ConfigError::Message(format!(
                "QUEUEWATCH_TABLE must be a plain SQL identifier, got {:?}",
                service.table
            ))
            .into());
        }

        Ok(Self {
            ami,
            database,
            service,
        })
    }
}

// The table name is spliced into statements, so only `[A-Za-z_][A-Za-z0-9_]*`
// is accepted.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("AMI_HOST", "pbx.local"),
            ("AMI_USERNAME", "monitor"),
            ("AMI_PASSWORD", "s3cret"),
            ("DB_HOST", "db.local"),
            ("DB_NAME", "callcenter"),
            ("DB_USERNAME", "queuewatch"),
            ("DB_PASSWORD", "hunter2"),
        ]
    }

    #[test]
    fn test_defaults_fill_ports_and_service() {
        let config = QueuewatchConfig::from_vars(vars(&required())).unwrap();

        assert_eq!(config.ami.host, "pbx.local");
        assert_eq!(config.ami.port, 5038);
        assert_eq!(config.ami.address(), "pbx.local:5038");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.name, "callcenter");
        assert_eq!(config.service.logged_since_field, "Id");
        assert_eq!(config.service.event_buffer, 1024);
        assert_eq!(config.service.table, "agent_sessions");
    }

    #[test]
    fn test_legacy_table_name_is_accepted() {
        let mut pairs = required();
        pairs.push(("QUEUEWATCH_TABLE", "monitoring_agents"));

        let config = QueuewatchConfig::from_vars(vars(&pairs)).unwrap();

        assert_eq!(config.service.table, "monitoring_agents");
    }

    #[test]
    fn test_table_name_must_be_identifier() {
        for bad in ["agents; DROP TABLE x", "1agents", "", "public.agents"] {
            let mut pairs = required();
            pairs.push(("QUEUEWATCH_TABLE", bad));

            let result = QueuewatchConfig::from_vars(vars(&pairs));
            assert!(
                matches!(result, Err(QueuewatchError::Config(_))),
                "{:?} was accepted",
                bad
            );
        }
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let mut pairs = required();
        pairs.push(("AMI_PORT", "15038"));
        pairs.push(("DB_PORT", "6543"));
        pairs.push(("QUEUEWATCH_LOGGED_SINCE_FIELD", "Desde"));
        pairs.push(("QUEUEWATCH_RECONNECT_MAX_MS", "5000"));

        let config = QueuewatchConfig::from_vars(vars(&pairs)).unwrap();

        assert_eq!(config.ami.port, 15038);
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.service.logged_since_field, "Desde");
        assert_eq!(config.service.reconnect_max_ms, 5000);
        assert_eq!(config.service.reconnect_base_ms, 500);
    }

    #[test]
    fn test_missing_required_variable_fails() {
        let pairs: Vec<_> = required()
            .into_iter()
            .filter(|(k, _)| *k != "DB_PASSWORD")
            .collect();

        assert!(matches!(
            QueuewatchConfig::from_vars(vars(&pairs)),
            Err(QueuewatchError::Config(_))
        ));
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config = QueuewatchConfig::from_vars(vars(&required())).unwrap();
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
