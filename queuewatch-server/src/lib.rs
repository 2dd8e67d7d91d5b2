pub mod router;
pub mod server;
pub mod store;
pub mod subsystems;
