//! Demo application wiring the acoustic physical layer to a role (send a
//! message, listen for messages, or ping-pong with a peer) and a virtual
//! network interface.
//!
//! This crate is deliberately thin: it owns only the host-facing concerns
//! the core physical layer doesn't need to know about — JSON configuration,
//! argument parsing, and a mock `VirtualNic` — not a production tunnel.

pub mod config;
pub mod device;
pub mod nic;
pub mod ping;

pub use config::FileConfig;
pub use nic::LoopbackNic;
