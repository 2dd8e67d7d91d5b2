//! Asterisk Manager Interface wire format.
//!
//! AMI is a line protocol over TCP: the server greets with a single banner
//! line, then every message in either direction is a block of `Key: Value`
//! lines closed by an empty line.

pub mod codec;
pub mod message;

pub use codec::{AmiCodec, AmiFrame};
pub use message::{AmiEvent, AmiMessage};
