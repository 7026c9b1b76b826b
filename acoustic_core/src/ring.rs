//! Sample rings between the real-time audio callbacks and the two
//! executor threads, plus the cross-thread decoded-message queue.
//!
//! The outbound ring must hand whole packets to the output callback: a
//! plain sample ring doesn't know where one packet ends and the next
//! begins, so a parallel SPSC ring of packet lengths rides alongside it,
//! pushed in the same order the samples are pushed (rtrb's SPSC ordering
//! gives us the release barrier between the two for free).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use acoustic_proto::error::PhysicalLayerError;

/// Producer half of the outbound sample ring, held by the sender executor.
pub struct OutboundRing {
    samples: rtrb::Producer<f32>,
    lengths: rtrb::Producer<usize>,
}

/// Consumer half of the outbound sample ring, held by the real-time output
/// callback.
pub struct OutboundRingConsumer {
    samples: rtrb::Consumer<f32>,
    lengths: rtrb::Consumer<usize>,
    current_packet_remaining: usize,
}

/// Creates a linked outbound ring pair. `sample_capacity` bounds how many
/// samples of audio can be queued ahead of the device; `max_packets`
/// bounds how many distinct packets can be in flight at once (usually a
/// small number, since one packet already spans many samples).
pub fn outbound_ring(sample_capacity: usize, max_packets: usize) -> (OutboundRing, OutboundRingConsumer) {
    let (samples_tx, samples_rx) = rtrb::RingBuffer::new(sample_capacity);
    let (lengths_tx, lengths_rx) = rtrb::RingBuffer::new(max_packets.max(1));
    (
        OutboundRing { samples: samples_tx, lengths: lengths_tx },
        OutboundRingConsumer { samples: samples_rx, lengths: lengths_rx, current_packet_remaining: 0 },
    )
}

impl OutboundRing {
    /// Atomically enqueues one complete packet's samples. Fails with
    /// [`PhysicalLayerError::RingOverflow`] rather than partially
    /// enqueueing, so the output callback never observes a torn packet.
    pub fn push_packet(&mut self, samples: &[f32]) -> Result<(), PhysicalLayerError> {
        if self.samples.slots() < samples.len() || self.lengths.slots() < 1 {
            return Err(PhysicalLayerError::RingOverflow);
        }

        let mut chunk = self.samples.write_chunk_uninit(samples.len()).expect("space checked above");
        chunk.fill_from_iter(samples.iter().copied());
        self.lengths.push(samples.len()).expect("space checked above");
        Ok(())
    }
}

impl OutboundRingConsumer {
    /// Total samples currently buffered, across all queued packets.
    pub fn samples_queued(&self) -> usize {
        self.samples.slots()
    }

    fn front_packet_remaining(&mut self) -> usize {
        if self.current_packet_remaining == 0 {
            if let Ok(n) = self.lengths.pop() {
                self.current_packet_remaining = n;
            }
        }
        self.current_packet_remaining
    }

    /// Fills `out` with outbound audio, honoring packet atomicity and the
    /// half-duplex busy policy: a new packet only starts when `busy` is
    /// false, and once a packet starts it keeps draining across calls
    /// (independent of later `busy` transitions) until it's exhausted.
    /// Returns the number of samples actually written; the remainder of
    /// `out` is left untouched (the caller is expected to have
    /// pre-zeroed it, matching a real output buffer's silence default).
    ///
    /// `sending` is true while a packet is mid-transmission; it is owned
    /// by the caller so it can be inspected between calls (e.g. to
    /// prevent the receiver from treating the local echo as incoming
    /// audio on a half-duplex device).
    pub fn drain_into(&mut self, out: &mut [f32], sending: &mut bool, busy: bool) -> usize {
        let mut written = 0;

        while written < out.len() {
            if !*sending {
                if busy {
                    break;
                }
                if self.front_packet_remaining() == 0 {
                    break;
                }
                *sending = true;
            }

            let take = (out.len() - written).min(self.current_packet_remaining).min(self.samples.slots());
            if take == 0 {
                break;
            }

            let chunk = self.samples.read_chunk(take).expect("take bounded by slots()");
            let (a, b) = chunk.as_slices();
            out[written..written + a.len()].copy_from_slice(a);
            out[written + a.len()..written + a.len() + b.len()].copy_from_slice(b);
            chunk.commit_all();

            self.current_packet_remaining -= take;
            written += take;

            if self.current_packet_remaining == 0 {
                *sending = false;
            }
        }

        written
    }
}

/// Producer half of the inbound sample ring, held by the real-time input
/// callback.
pub struct InboundRing {
    tx: rtrb::Producer<f32>,
}

/// Consumer half of the inbound sample ring, held by the receiver
/// executor.
pub struct InboundRingConsumer {
    rx: rtrb::Consumer<f32>,
}

pub fn inbound_ring(capacity: usize) -> (InboundRing, InboundRingConsumer) {
    let (tx, rx) = rtrb::RingBuffer::new(capacity);
    (InboundRing { tx }, InboundRingConsumer { rx })
}

impl InboundRing {
    /// Appends as many of `samples` as fit. Samples that don't fit are
    /// dropped (logged): a receiver falling behind the device loses
    /// incoming audio rather than blocking the real-time thread.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let available = self.tx.slots();
        if available < samples.len() {
            log::warn!(
                "inbound ring overflow: dropping {} of {} samples",
                samples.len() - available,
                samples.len()
            );
        }
        let take = samples.len().min(available);
        if take == 0 {
            return;
        }
        let mut chunk = self.tx.write_chunk_uninit(take).expect("take bounded by slots()");
        chunk.fill_from_iter(samples[..take].iter().copied());
    }
}

impl InboundRingConsumer {
    /// Drains every sample currently available, calling `f` once per
    /// sample in arrival order.
    pub fn drain_with(&mut self, mut f: impl FnMut(f32)) {
        let n = self.rx.slots();
        if n == 0 {
            return;
        }
        let chunk = self.rx.read_chunk(n).expect("n bounded by slots()");
        let (a, b) = chunk.as_slices();
        for &s in a.iter().chain(b.iter()) {
            f(s);
        }
        chunk.commit_all();
    }
}

/// Cross-thread queue of fully reassembled messages, handed from the
/// receiver executor to whoever calls `async_read`.
///
/// Readers block on a condition variable rather than polling, per the
/// preference for a completion-handler-like wait when the platform offers
/// one; a short timeout keeps the wait responsive to cancellation.
pub struct PacketQueue {
    state: Mutex<VecDeque<Vec<u8>>>,
    ready: Condvar,
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketQueue {
    pub fn new() -> Self {
        Self { state: Mutex::new(VecDeque::new()), ready: Condvar::new() }
    }

    pub fn push(&self, message: Vec<u8>) {
        let mut q = self.state.lock().unwrap();
        q.push_back(message);
        self.ready.notify_one();
    }

    pub fn try_pop(&self) -> Option<Vec<u8>> {
        self.state.lock().unwrap().pop_front()
    }

    /// Blocks until a message is available or `cancel` is set. On
    /// cancellation the queue is left untouched.
    pub fn pop_blocking(&self, cancel: &AtomicBool) -> Result<Vec<u8>, PhysicalLayerError> {
        let mut q = self.state.lock().unwrap();
        loop {
            if let Some(m) = q.pop_front() {
                return Ok(m);
            }
            if cancel.load(Ordering::Acquire) {
                return Err(PhysicalLayerError::Cancelled);
            }
            let (guard, _timeout) = self.ready.wait_timeout(q, Duration::from_millis(20)).unwrap();
            q = guard;
        }
    }
}
