#![cfg_attr(not(feature = "std"), no_std)]
//! Protocol data model for an acoustic packet modem's physical layer.
//!
//! This crate defines the wire-level building blocks shared by the sending
//! and receiving halves of the physical layer implemented in
//! `acoustic_core`: the [`config::Config`] that every session is
//! constructed from, the 4-byte [`header::PhysicalHeader`] that precedes
//! every fragment, and the [`error::PhysicalLayerError`] returned by
//! fallible construction.
//!
//! ## Scope
//!
//! This crate holds only data definitions and the validation logic tied
//! directly to them (e.g. the byte-alignment check on `payload`). It knows
//! nothing about line coding, CRCs, waveforms, or threads — those live in
//! `acoustic_core`, which depends on this crate for its shared types.

extern crate alloc;

pub mod config;
pub mod error;
pub mod header;

pub use config::Config;
pub use error::PhysicalLayerError;
pub use header::PhysicalHeader;
