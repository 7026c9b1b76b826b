//! Error types shared between the protocol data model and the physical layer.

use alloc::string::String;
use core::fmt;

#[cfg(feature = "std")]
use std::error::Error as StdError;

/// Errors that can occur while constructing or operating the physical layer.
///
/// Per-symbol/per-packet conditions (line-decode failures, header
/// validation, CRC mismatches) are *not* represented here: they are
/// recoverable at the receiver state machine and are only ever surfaced as
/// log events plus a dropped packet, never as a `Result` a caller could
/// retry against.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalLayerError {
    /// `(payload + 1 + size_of::<Header>()) * 10` was not a multiple of 8,
    /// or `payload` did not fit the header's size field.
    ConfigInvalid {
        payload: u32,
        /// The two nearest legal payload values bracketing `payload`.
        nearest: (u32, u32),
    },
    /// `async_send` would have exceeded the outbound ring's configured
    /// capacity.
    RingOverflow,
    /// The awaiting `async_read` task was cancelled before a message
    /// arrived; the packet queue was left untouched.
    Cancelled,
    /// The preamble file was empty, unreadable, or could not be parsed.
    InvalidPreamble(String),
}

impl fmt::Display for PhysicalLayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalLayerError::ConfigInvalid { payload, nearest } => write!(
                f,
                "invalid payload {payload}: (payload + 1 + 4) * 10 must be a multiple of 8; \
                 nearest legal values are {} and {}",
                nearest.0, nearest.1
            ),
            PhysicalLayerError::RingOverflow => {
                write!(f, "outbound sample ring capacity exceeded")
            }
            PhysicalLayerError::Cancelled => write!(f, "async_read was cancelled"),
            PhysicalLayerError::InvalidPreamble(msg) => write!(f, "invalid preamble file: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl StdError for PhysicalLayerError {}
