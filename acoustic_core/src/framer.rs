//! Fragmentation on the send side, and the byte-at-a-time reassembly state
//! machine on the receive side.

use std::sync::Arc;

use acoustic_proto::header::{PhysicalHeader, HEADER_SIZE};

use crate::crc::{Crc8, Crc8Stream};
use crate::line_codec::LineCodec;

/// Splits `data` into `payload`-sized chunks and line-codes each one,
/// header, body and CRC trailer together, into the 10-bit symbol stream
/// that goes straight to the modulator.
pub struct Framer {
    payload: usize,
    line_codec: Arc<LineCodec>,
    crc: Crc8,
}

impl Framer {
    pub fn new(payload: u32, line_codec: Arc<LineCodec>, crc: Crc8) -> Self {
        Self { payload: payload as usize, line_codec, crc }
    }

    /// Lazily fragments `data`, yielding one `Vec<u16>` of line symbols per
    /// fragment (header symbols, then body symbols, then the CRC symbol).
    ///
    /// A zero-length `data` still yields one fragment, but its header's
    /// `size` field is `0`, which [`PhysicalHeader::decode`] rejects as
    /// invalid: empty messages cannot be represented on the wire.
    pub fn encode_fragments<'a>(&'a self, data: &'a [u8]) -> impl Iterator<Item = Vec<u16>> + 'a {
        let payload = self.payload.max(1);
        let total = data.len();
        let chunk_count = total.div_ceil(payload).max(1);

        (0..chunk_count).map(move |i| {
            let start = i * payload;
            let end = (start + payload).min(total);
            let chunk = &data[start..end];
            let done = end == total;

            let header = PhysicalHeader::new(chunk.len() as u32, done);
            let crc = self.crc.get(chunk);

            let mut symbols = Vec::with_capacity(HEADER_SIZE + chunk.len() + 1);
            for b in header.encode() {
                symbols.push(self.line_codec.encode(b));
            }
            for &b in chunk {
                symbols.push(self.line_codec.encode(b));
            }
            symbols.push(self.line_codec.encode(crc));
            symbols
        })
    }
}

/// What happened as a result of feeding one decoded byte to a
/// [`ReceiverState`].
#[derive(Debug)]
pub enum ByteOutcome {
    /// The byte was absorbed; no fragment boundary was reached.
    Continue,
    /// The 4-byte header decoded to a zero payload size; it is illegal.
    /// The receiver has resynchronized to header search.
    HeaderInvalid,
    /// A fragment passed its CRC check but was not the final fragment of
    /// its message.
    FragmentOk,
    /// A fragment failed its CRC check.
    CrcFailure,
    /// The final fragment of a message passed its CRC check; the
    /// reassembled message is ready to hand to the packet queue.
    MessageReady(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Header,
    Body,
    Crc,
}

/// Byte-at-a-time reassembly: accumulates one fragment's header, body and
/// CRC trailer, then folds CRC-passing fragments into a cross-fragment
/// message buffer until a fragment with `done = true` passes its check.
///
/// On a CRC failure, the message buffer is cleared only if the failing
/// fragment claimed to be the last one; a failure on a non-final fragment
/// leaves previously assembled bytes in place; nothing exists downstream
/// to request retransmission of a single fragment, so any other policy
/// either discards already-good data or holds a message open forever.
pub struct ReceiverState {
    stage: Stage,
    header_buf: Vec<u8>,
    header: Option<PhysicalHeader>,
    body: Vec<u8>,
    crc_stream: Crc8Stream,
    crc_template: Crc8,
    message: Vec<u8>,
}

impl ReceiverState {
    pub fn new(crc: Crc8) -> Self {
        let crc_stream = crc.stream();
        Self {
            stage: Stage::Header,
            header_buf: Vec::with_capacity(HEADER_SIZE),
            header: None,
            body: Vec::new(),
            crc_stream,
            crc_template: crc,
            message: Vec::new(),
        }
    }

    fn resync(&mut self) {
        self.stage = Stage::Header;
        self.header_buf.clear();
        self.header = None;
        self.body.clear();
        self.crc_stream = self.crc_template.stream();
    }

    /// Discards any in-flight fragment without touching the cross-fragment
    /// message buffer. Called when the preamble correlator or line decoder
    /// detects loss of synchronization mid-fragment.
    pub fn abort_fragment(&mut self) {
        self.resync();
    }

    pub fn push_byte(&mut self, byte: u8) -> ByteOutcome {
        match self.stage {
            Stage::Header => {
                self.header_buf.push(byte);
                if self.header_buf.len() < HEADER_SIZE {
                    return ByteOutcome::Continue;
                }

                let raw: [u8; HEADER_SIZE] = self.header_buf[..HEADER_SIZE].try_into().unwrap();
                match PhysicalHeader::decode(raw) {
                    Some(header) => {
                        self.body.clear();
                        self.body.reserve(header.size as usize);
                        self.crc_stream = self.crc_template.stream();
                        self.header = Some(header);
                        self.stage = Stage::Body;
                        ByteOutcome::Continue
                    }
                    None => {
                        log::warn!("header decoded to zero payload size; resynchronizing");
                        self.resync();
                        ByteOutcome::HeaderInvalid
                    }
                }
            }
            Stage::Body => {
                self.body.push(byte);
                self.crc_stream.update(byte);
                let header = self.header.expect("Body stage always has a header");
                if self.body.len() as u32 == header.size {
                    self.stage = Stage::Crc;
                }
                ByteOutcome::Continue
            }
            Stage::Crc => {
                self.crc_stream.update(byte);
                let header = self.header.expect("Crc stage always has a header");
                let ok = self.crc_stream.is_zero();

                let outcome = if ok {
                    self.message.extend_from_slice(&self.body);
                    if header.done {
                        ByteOutcome::MessageReady(std::mem::take(&mut self.message))
                    } else {
                        ByteOutcome::FragmentOk
                    }
                } else {
                    log::warn!("CRC failure on a {}-byte fragment", header.size);
                    if header.done {
                        self.message.clear();
                    }
                    ByteOutcome::CrcFailure
                };

                self.resync();
                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::Crc8;
    use crate::line_codec::LineCodec;

    fn drive(receiver: &mut ReceiverState, bytes: &[u8]) -> Vec<ByteOutcome> {
        bytes.iter().map(|&b| receiver.push_byte(b)).collect()
    }

    #[test]
    fn single_fragment_message_round_trips() {
        let codec = Arc::new(LineCodec::new());
        let crc = Crc8::new();
        let framer = Framer::new(6, codec.clone(), crc.clone());

        let data = b"hello!";
        let fragments: Vec<Vec<u16>> = framer.encode_fragments(data).collect();
        assert_eq!(fragments.len(), 1);

        let mut receiver = ReceiverState::new(crc);
        let bytes: Vec<u8> =
            fragments[0].iter().map(|&sym| codec.decode(sym).unwrap()).collect();

        let outcomes = drive(&mut receiver, &bytes);
        match outcomes.last().unwrap() {
            ByteOutcome::MessageReady(msg) => assert_eq!(msg, data),
            other => panic!("expected MessageReady, got {other:?}"),
        }
    }

    #[test]
    fn multi_fragment_message_reassembles() {
        let codec = Arc::new(LineCodec::new());
        let crc = Crc8::new();
        let framer = Framer::new(4, codec.clone(), crc.clone());

        let data = b"a longer message spanning fragments";
        let fragments: Vec<Vec<u16>> = framer.encode_fragments(data).collect();
        assert!(fragments.len() > 1);

        let mut receiver = ReceiverState::new(crc);
        let mut last_outcome = None;
        for fragment in &fragments {
            let bytes: Vec<u8> = fragment.iter().map(|&sym| codec.decode(sym).unwrap()).collect();
            for &b in &bytes {
                last_outcome = Some(receiver.push_byte(b));
            }
        }
        match last_outcome.unwrap() {
            ByteOutcome::MessageReady(msg) => assert_eq!(msg, data),
            other => panic!("expected MessageReady, got {other:?}"),
        }
    }

    #[test]
    fn corrupted_trailing_byte_fails_crc_and_resyncs() {
        let codec = Arc::new(LineCodec::new());
        let crc = Crc8::new();
        let framer = Framer::new(6, codec.clone(), crc.clone());

        let data = b"hello!";
        let fragments: Vec<Vec<u16>> = framer.encode_fragments(data).collect();
        let mut bytes: Vec<u8> =
            fragments[0].iter().map(|&sym| codec.decode(sym).unwrap()).collect();
        *bytes.last_mut().unwrap() ^= 0x01;

        let mut receiver = ReceiverState::new(crc);
        let outcomes = drive(&mut receiver, &bytes);
        assert!(matches!(outcomes.last().unwrap(), ByteOutcome::CrcFailure));
    }

    #[test]
    fn zero_length_message_is_unrepresentable() {
        let codec = Arc::new(LineCodec::new());
        let crc = Crc8::new();
        let framer = Framer::new(6, codec.clone(), crc.clone());
        let fragments: Vec<Vec<u16>> = framer.encode_fragments(&[]).collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].len(), HEADER_SIZE + 1);

        let mut receiver = ReceiverState::new(crc);
        let bytes: Vec<u8> =
            fragments[0].iter().map(|&sym| codec.decode(sym).unwrap()).collect();
        let outcomes = drive(&mut receiver, &bytes);
        assert!(matches!(outcomes.last().unwrap(), ByteOutcome::HeaderInvalid));
    }
}
