#![cfg_attr(not(feature = "std"), no_std)]
//! Ring-buffer plumbing shared by the acoustic physical layer's real-time
//! paths.
//!
//! This crate carries no protocol knowledge; it re-exports [`rtrb`] and adds
//! the one thing it doesn't provide: waking a parked worker thread without a
//! busy loop.

#[cfg(feature = "std")]
pub mod waker;

#[cfg(feature = "std")]
pub use waker::Waker;

// Re-exported so downstream crates don't need a direct `rtrb` dependency of
// their own.
pub use rtrb;
