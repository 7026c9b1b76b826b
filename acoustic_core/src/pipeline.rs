//! Wires the line codec, CRC engine, waveform codec and framer into the
//! two-executor async pipeline: one worker thread owns the sender
//! context, one owns the receiver context, and the real-time audio
//! callbacks only ever touch lock-free rings and atomics.
//!
//! "Executor" and "task" here mean an OS thread plus a channel, not
//! Rust's `async`/`await`: there is no runtime to pull in, and the
//! real-time constraints (the callback thread must never block) are
//! easier to reason about with a thread boundary than with a future
//! that might be polled from either side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use acoustic_proto::{Config, PhysicalLayerError};

use crate::crc::Crc8;
use crate::device::{InputCallback, OutputCallback};
use crate::framer::{ByteOutcome, Framer, ReceiverState};
use crate::line_codec::{LineCodec, WORD_BITS};
use crate::ring::{self, InboundRing, InboundRingConsumer, OutboundRing, OutboundRingConsumer, PacketQueue};
use crate::waveform::{self, Demodulator, PreambleCorrelator};

/// The real-time half of the pipeline: two trait objects the host audio
/// device drives directly, holding nothing but lock-free rings and
/// atomics.
pub struct AudioCallbacks {
    outbound_rx: OutboundRingConsumer,
    sending: bool,
    inbound_tx: InboundRing,
    receiver_waker: acoustic_rt::Waker,
    busy: Arc<AtomicBool>,
    busy_threshold: f32,
}

impl OutputCallback for AudioCallbacks {
    fn output(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let busy = self.busy.load(Ordering::Acquire);
        self.outbound_rx.drain_into(out, &mut self.sending, busy);
    }
}

impl InputCallback for AudioCallbacks {
    fn input(&mut self, samples: &[f32]) {
        if !samples.is_empty() {
            let energy = waveform::sample_energy(samples);
            self.busy.store(energy > self.busy_threshold, Ordering::Release);
        }
        self.inbound_tx.push_samples(samples);
        self.receiver_waker.wake();
    }
}

enum ReceivePhase {
    Searching,
    Receiving,
}

struct ReceiveWorker {
    inbound_rx: InboundRingConsumer,
    correlator: PreambleCorrelator,
    demod: Demodulator,
    receiver: ReceiverState,
    line_codec: Arc<LineCodec>,
    bit_buf: Vec<bool>,
    phase: ReceivePhase,
    packet_queue: Arc<PacketQueue>,
    shutdown: Arc<AtomicBool>,
    park_timeout: Duration,
}

impl ReceiveWorker {
    fn run(mut self) {
        let mut scratch = Vec::new();
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            scratch.clear();
            self.inbound_rx.drain_with(|s| scratch.push(s));

            if scratch.is_empty() {
                std::thread::park_timeout(self.park_timeout);
                continue;
            }

            for &sample in &scratch {
                self.feed_sample(sample);
            }
        }
    }

    fn feed_sample(&mut self, sample: f32) {
        match self.phase {
            ReceivePhase::Searching => {
                if self.correlator.feed(sample) {
                    self.demod.reset();
                    self.bit_buf.clear();
                    self.phase = ReceivePhase::Receiving;
                }
            }
            ReceivePhase::Receiving => {
                let Some(bit) = self.demod.feed(sample) else { return };
                self.bit_buf.push(bit);
                if self.bit_buf.len() < WORD_BITS as usize {
                    return;
                }

                let symbol = waveform::bits_to_symbol(&self.bit_buf);
                self.bit_buf.clear();

                match self.line_codec.decode(symbol) {
                    Ok(byte) => self.handle_byte(byte),
                    Err(e) => {
                        log::warn!("line-decode failure ({e}); resynchronizing");
                        self.receiver.abort_fragment();
                        self.correlator.reset_window();
                        self.phase = ReceivePhase::Searching;
                    }
                }
            }
        }
    }

    fn handle_byte(&mut self, byte: u8) {
        match self.receiver.push_byte(byte) {
            ByteOutcome::Continue => {}
            ByteOutcome::HeaderInvalid | ByteOutcome::CrcFailure | ByteOutcome::FragmentOk => {
                self.correlator.reset_window();
                self.phase = ReceivePhase::Searching;
            }
            ByteOutcome::MessageReady(message) => {
                self.packet_queue.push(message);
                self.correlator.reset_window();
                self.phase = ReceivePhase::Searching;
            }
        }
    }
}

struct SendJob {
    data: Vec<u8>,
    reply: mpsc::Sender<Result<(), PhysicalLayerError>>,
}

struct SendWorker {
    jobs: mpsc::Receiver<SendJob>,
    framer: Framer,
    config: Arc<Config>,
    carrier: Arc<[f32]>,
    outbound: OutboundRing,
}

impl SendWorker {
    fn run(mut self) {
        while let Ok(job) = self.jobs.recv() {
            let result = self.send_one(&job.data);
            let _ = job.reply.send(result);
        }
    }

    fn send_one(&mut self, data: &[u8]) -> Result<(), PhysicalLayerError> {
        for symbols in self.framer.encode_fragments(data) {
            let mut samples = Vec::new();
            let bits = symbols.iter().flat_map(|&sym| waveform::symbol_bits(sym, WORD_BITS));
            waveform::modulate_packet(
                &mut samples,
                self.config.preamble(),
                &self.carrier,
                self.config.inter_size(),
                self.config.amplitude(),
                bits,
            );
            self.outbound.push_packet(&samples)?;
        }
        Ok(())
    }
}

/// The non-real-time half of the pipeline: owns the two executor threads
/// and exposes the blocking `async_send`/`async_read` API used by the
/// application layer.
pub struct PhysicalLayer {
    send_tx: Option<mpsc::Sender<SendJob>>,
    packet_queue: Arc<PacketQueue>,
    shutdown: Arc<AtomicBool>,
    receiver_waker: acoustic_rt::Waker,
    sender_thread: Option<std::thread::JoinHandle<()>>,
    receiver_thread: Option<std::thread::JoinHandle<()>>,
}

impl PhysicalLayer {
    /// Builds the pipeline and splits it into the non-real-time handle and
    /// the real-time callback pair. `line_codec` and `crc` are shared with
    /// the caller so tests can drive the wire format directly as well.
    pub fn new(config: Arc<Config>, line_codec: Arc<LineCodec>, crc: Crc8) -> (Self, AudioCallbacks) {
        let carrier = waveform::unit_carrier(config.carrier_size());
        let preamble: Arc<[f32]> = Arc::from(config.preamble());

        let outbound_capacity = (config.ticks_per_packet() as usize).max(1) * 4;
        let (outbound_tx, outbound_rx) = ring::outbound_ring(outbound_capacity, 8);
        let inbound_capacity = config.carrier_size().max(1) * 4096;
        let (inbound_tx, inbound_rx) = ring::inbound_ring(inbound_capacity);

        let packet_queue = Arc::new(PacketQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let busy = Arc::new(AtomicBool::new(false));

        let (send_tx, send_rx) = mpsc::channel::<SendJob>();
        let framer = Framer::new(config.payload(), line_codec.clone(), crc.clone());
        let sender_thread = std::thread::Builder::new()
            .name("acoustic-sender".into())
            .spawn({
                let config = config.clone();
                let carrier = carrier.clone();
                move || SendWorker { jobs: send_rx, framer, config, carrier, outbound: outbound_tx }.run()
            })
            .expect("failed to spawn sender executor thread");

        let receive_worker = ReceiveWorker {
            inbound_rx,
            correlator: PreambleCorrelator::new(preamble, config.threshold()),
            demod: Demodulator::new(carrier),
            receiver: ReceiverState::new(crc),
            line_codec,
            bit_buf: Vec::with_capacity(WORD_BITS as usize),
            phase: ReceivePhase::Searching,
            packet_queue: packet_queue.clone(),
            shutdown: shutdown.clone(),
            park_timeout: Duration::from_millis(5),
        };
        let receiver_thread = std::thread::Builder::new()
            .name("acoustic-receiver".into())
            .spawn(move || receive_worker.run())
            .expect("failed to spawn receiver executor thread");
        let receiver_waker = acoustic_rt::Waker::new(receiver_thread.thread().clone());

        let layer = Self {
            send_tx: Some(send_tx),
            packet_queue,
            shutdown,
            receiver_waker: receiver_waker.clone(),
            sender_thread: Some(sender_thread),
            receiver_thread: Some(receiver_thread),
        };
        let callbacks = AudioCallbacks {
            outbound_rx,
            sending: false,
            inbound_tx,
            receiver_waker,
            busy,
            busy_threshold: config.busy_threshold(),
        };

        (layer, callbacks)
    }

    /// Fragments, modulates and enqueues `data` for transmission, blocking
    /// until every fragment's samples have been accepted by the outbound
    /// ring (not until they've actually played out).
    pub fn async_send(&self, data: Vec<u8>) -> Result<(), PhysicalLayerError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let job = SendJob { data, reply: reply_tx };
        self.send_tx
            .as_ref()
            .expect("send_tx is only taken in Drop")
            .send(job)
            .map_err(|_| PhysicalLayerError::Cancelled)?;
        reply_rx.recv().map_err(|_| PhysicalLayerError::Cancelled)?
    }

    /// Blocks until the next reassembled message is available.
    pub fn async_read(&self) -> Result<Vec<u8>, PhysicalLayerError> {
        self.packet_queue.pop_blocking(&self.shutdown)
    }

    /// Non-blocking poll of the packet queue.
    pub fn try_read(&self) -> Option<Vec<u8>> {
        self.packet_queue.try_pop()
    }
}

impl Drop for PhysicalLayer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.receiver_waker.wake();
        self.send_tx.take(); // disconnects the channel so the sender thread's recv() returns Err
        if let Some(t) = self.sender_thread.take() {
            let _ = t.join();
        }
        if let Some(t) = self.receiver_thread.take() {
            let _ = t.join();
        }
    }
}
