pub mod agent_session;

pub use agent_session::AgentSession;
