//! Asynchronous acoustic physical layer.
//!
//! Carries a byte stream over audible-band sound: an 8B/10B line code and
//! CRC-8 protect each fragment, a BPSK waveform codec with a
//! preamble-correlated framer recovers symbol timing at the receiver, and
//! a two-executor pipeline ([`pipeline::PhysicalLayer`]) keeps the
//! real-time audio callbacks ([`device::OutputCallback`],
//! [`device::InputCallback`]) free of locks and allocation.
//!
//! Module layout mirrors the dependency order leaves-first: [`line_codec`]
//! and [`crc`] have no dependencies within this crate; [`waveform`] and
//! [`framer`] build on them; [`ring`] and [`pipeline`] build on all four.

pub mod crc;
pub mod device;
pub mod framer;
pub mod line_codec;
pub mod nic;
pub mod pipeline;
pub mod ring;
pub mod waveform;

pub use crc::Crc8;
pub use device::{InputCallback, OutputCallback};
pub use framer::{ByteOutcome, Framer, ReceiverState};
pub use line_codec::LineCodec;
pub use nic::VirtualNic;
pub use pipeline::{AudioCallbacks, PhysicalLayer};

pub use acoustic_proto::{Config, PhysicalLayerError};
