//! BPSK waveform codec: preamble correlation, modulation, demodulation.
//!
//! Ported from the `inputCallback`/`send_raw` loops of the reference
//! `AsyncPhysicalLayer`: a sliding correlation against the preamble
//! samples picks out frame starts, and a phase counter with a running dot
//! product against the carrier chip demodulates one bit per `carrier_size`
//! samples.

use std::collections::VecDeque;
use std::sync::Arc;

/// Sum of squared sample magnitudes, used for busy-channel sensing.
#[inline]
pub fn sample_energy(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s * s).sum()
}

/// Builds a unit-amplitude carrier chip of the given length (all `+1`
/// samples). Implementations that need a shaped carrier can construct
/// their own `Arc<[f32]>` instead.
pub fn unit_carrier(carrier_size: usize) -> Arc<[f32]> {
    vec![1.0f32; carrier_size.max(1)].into()
}

/// Slides the preamble template across the incoming sample stream and
/// reports a detection once the correlation exceeds the configured
/// threshold and at least one preamble length has elapsed since the last
/// detection (preventing the same physical preamble from firing twice).
#[derive(Debug)]
pub struct PreambleCorrelator {
    preamble: Arc<[f32]>,
    threshold: f32,
    window: VecDeque<f32>,
    since_last: usize,
}

impl PreambleCorrelator {
    pub fn new(preamble: Arc<[f32]>, threshold: f32) -> Self {
        let len = preamble.len();
        Self {
            preamble,
            threshold,
            window: VecDeque::with_capacity(len),
            since_last: len,
        }
    }

    /// Feeds one sample. Returns `true` exactly when this sample completes
    /// a detected preamble.
    pub fn feed(&mut self, sample: f32) -> bool {
        self.since_last = self.since_last.saturating_add(1);

        if self.window.len() == self.preamble.len() {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        if self.window.len() < self.preamble.len() {
            return false;
        }

        let correlation: f32 =
            self.window.iter().zip(self.preamble.iter()).map(|(s, p)| s * p).sum();

        if correlation > self.threshold && self.since_last >= self.preamble.len() {
            self.window.clear();
            self.since_last = 0;
            true
        } else {
            false
        }
    }

    /// Forgets the current sliding window without affecting the
    /// re-detection guard, so a fresh search starts clean after the caller
    /// abandons an in-flight fragment.
    pub fn reset_window(&mut self) {
        self.window.clear();
    }
}

/// Demodulates BPSK symbols one carrier period at a time: `+1` chips
/// correlate positively against a `0` bit, negatively against a `1` bit
/// (bit `0` is transmitted as `+amplitude`, bit `1` as `-amplitude`).
#[derive(Debug)]
pub struct Demodulator {
    carrier: Arc<[f32]>,
    phase: usize,
    accum: f32,
}

impl Demodulator {
    pub fn new(carrier: Arc<[f32]>) -> Self {
        Self { carrier, phase: 0, accum: 0.0 }
    }

    pub fn reset(&mut self) {
        self.phase = 0;
        self.accum = 0.0;
    }

    /// Feeds one sample. Returns `Some(bit)` once a full carrier period has
    /// been accumulated (`bit == true` means a `1` was sent).
    pub fn feed(&mut self, sample: f32) -> Option<bool> {
        self.accum += sample * self.carrier[self.phase];
        self.phase += 1;

        if self.phase == self.carrier.len() {
            let bit = self.accum < 0.0;
            self.accum = 0.0;
            self.phase = 0;
            Some(bit)
        } else {
            None
        }
    }
}

/// Appends the modulated waveform for one on-wire symbol stream (silence,
/// preamble, one carrier period per bit least-significant-bit first,
/// trailing silence) to `out`.
pub fn modulate_packet(
    out: &mut Vec<f32>,
    preamble: &[f32],
    carrier: &[f32],
    inter_size: usize,
    amplitude: f32,
    bits: impl Iterator<Item = bool>,
) {
    out.extend(std::iter::repeat_n(0.0, inter_size));
    out.extend(preamble.iter().map(|&p| p * amplitude));
    for bit in bits {
        let sign = if bit { -1.0 } else { 1.0 };
        out.extend(carrier.iter().map(|&c| c * sign * amplitude));
    }
    out.extend(std::iter::repeat_n(0.0, inter_size));
}

/// Yields the bits of a line-coded symbol, least-significant bit first.
pub fn symbol_bits(symbol: u16, width: u32) -> impl Iterator<Item = bool> {
    (0..width).map(move |i| (symbol >> i) & 1 == 1)
}

/// Packs bits, least-significant bit first, back into a symbol.
pub fn bits_to_symbol(bits: &[bool]) -> u16 {
    bits.iter().enumerate().fold(0u16, |acc, (i, &b)| if b { acc | (1 << i) } else { acc })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlator_detects_a_planted_preamble() {
        let preamble: Arc<[f32]> = vec![1.0, -1.0, 1.0, 1.0, -1.0].into();
        let mut corr = PreambleCorrelator::new(preamble.clone(), 4.0);

        let mut detected_at = None;
        // noise, then the exact preamble, then more noise
        let stream: Vec<f32> =
            vec![0.1, -0.2, 0.05].into_iter().chain(preamble.iter().copied()).chain(vec![0.3, -0.1]).collect();

        for (i, &s) in stream.iter().enumerate() {
            if corr.feed(s) {
                detected_at = Some(i);
            }
        }
        assert_eq!(detected_at, Some(3 + preamble.len() - 1));
    }

    #[test]
    fn modulate_then_demodulate_round_trips_bits() {
        let carrier = unit_carrier(8);
        let bits = [false, true, true, false, true];

        let mut samples = Vec::new();
        for &bit in &bits {
            let sign = if bit { -1.0 } else { 1.0 };
            samples.extend(carrier.iter().map(|&c| c * sign));
        }

        let mut demod = Demodulator::new(carrier);
        let mut recovered = Vec::new();
        for s in samples {
            if let Some(bit) = demod.feed(s) {
                recovered.push(bit);
            }
        }
        assert_eq!(&recovered, &bits);
    }

    #[test]
    fn symbol_bit_order_round_trips() {
        let symbol: u16 = 0b0110101011;
        let bits: Vec<bool> = symbol_bits(symbol, 10).collect();
        assert_eq!(bits_to_symbol(&bits), symbol);
    }

    #[test]
    fn modulate_packet_has_expected_sample_count() {
        let preamble = vec![1.0f32; 16];
        let carrier = vec![1.0f32; 4];
        let mut out = Vec::new();
        modulate_packet(&mut out, &preamble, &carrier, 10, 0.8, symbol_bits(0b101, 3));
        assert_eq!(out.len(), 10 + 16 + 3 * 4 + 10);
    }
}
