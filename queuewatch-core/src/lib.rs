pub mod ami;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod interface;
pub mod models;

pub use classify::{classify, Classification, ClassifierConfig, Diagnostic, Intent};
pub use config::QueuewatchConfig;
pub use error::QueuewatchError;
pub use models::AgentSession;
