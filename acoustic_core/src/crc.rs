//! CRC-8 engine (polynomial 0x07), ported from the reference
//! `CRC<8, 0x07>` template: a 256-entry multiplication table computed once
//! from the generator polynomial, driving both a one-shot `get`/`check`
//! API and a streaming accumulator for byte-at-a-time framing.

use std::sync::Arc;

/// Default generator polynomial (x^8 + x^2 + x + 1, without the implicit
/// leading term).
pub const POLY: u8 = 0x07;

fn build_table(poly: u8) -> [u16; 256] {
    let r#gen = (poly as u16) | (1 << 8);
    let mut table = [0u16; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut p = 0u16;
        for j in 0..8u16 {
            if (i as u16 >> j) & 1 == 1 {
                p ^= r#gen << j;
            }
        }
        *slot = p;
    }
    table
}

/// A CRC-8 engine bound to one generator polynomial.
///
/// Cheap to clone: the multiplication table is reference-counted.
#[derive(Debug, Clone)]
pub struct Crc8 {
    table: Arc<[u16; 256]>,
}

impl Default for Crc8 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc8 {
    /// Builds an engine using the default polynomial ([`POLY`]).
    pub fn new() -> Self {
        Self::with_poly(POLY)
    }

    pub fn with_poly(poly: u8) -> Self {
        Self { table: Arc::new(build_table(poly)) }
    }

    fn divide(&self, data: &[u8]) -> u8 {
        let mut q = 0u8;
        for &byte in data {
            q = (((q as u16) << 8 | byte as u16) ^ self.table[q as usize]) as u8;
        }
        q
    }

    /// One-shot checksum of `data`.
    pub fn get(&self, data: &[u8]) -> u8 {
        let q = self.divide(data);
        (((q as u16) << 8) ^ self.table[q as usize]) as u8
    }

    /// Verifies that `crc` is the checksum trailer for `data`.
    pub fn check(&self, data: &[u8], crc: u8) -> bool {
        let q = self.divide(data);
        (((q as u16) << 8 | crc as u16) ^ self.table[q as usize]) == 0
    }

    /// Starts a fresh streaming accumulator sharing this engine's table.
    pub fn stream(&self) -> Crc8Stream {
        Crc8Stream { table: self.table.clone(), q: 0 }
    }
}

/// A byte-at-a-time CRC-8 accumulator.
///
/// Feed the message bytes with [`update`](Self::update), then the trailer
/// byte: after the trailer, [`is_zero`](Self::is_zero) reports whether the
/// message passed its check, matching [`Crc8::check`] without buffering
/// the message.
#[derive(Debug, Clone)]
pub struct Crc8Stream {
    table: Arc<[u16; 256]>,
    q: u8,
}

impl Crc8Stream {
    /// Clears the running remainder, starting a new message.
    pub fn reset(&mut self) {
        self.q = 0;
    }

    /// Folds one byte into the running remainder, returning the new
    /// remainder.
    #[inline]
    pub fn update(&mut self, byte: u8) -> u8 {
        self.q = (((self.q as u16) << 8 | byte as u16) ^ self.table[self.q as usize]) as u8;
        self.q
    }

    /// The trailer byte that would zero the remainder if appended now.
    pub fn get(&self) -> u8 {
        (((self.q as u16) << 8) ^ self.table[self.q as usize]) as u8
    }

    /// True once a correct trailer byte has been fed via [`update`](Self::update).
    pub fn is_zero(&self) -> bool {
        self.q == 0
    }
}
