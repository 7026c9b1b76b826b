//! Minimal round-trip demo built directly on `PhysicalLayer::async_send`/
//! `async_read`: sends a small payload and waits for an echo, reporting
//! round-trip time. No NAT, no IP parsing — just enough to prove the
//! physical layer moves bytes in both directions.

use std::time::{Duration, Instant};

use acoustic_core::PhysicalLayer;
use acoustic_proto::PhysicalLayerError;

/// Blocks for the next message, returning `PhysicalLayerError::Cancelled`
/// once `deadline` passes instead of waiting forever. `deadline = None`
/// blocks indefinitely, same as calling `layer.async_read()` directly.
pub fn read_until(layer: &PhysicalLayer, deadline: Option<Instant>) -> Result<Vec<u8>, PhysicalLayerError> {
    let Some(deadline) = deadline else {
        return layer.async_read();
    };
    loop {
        if let Some(message) = layer.try_read() {
            return Ok(message);
        }
        if Instant::now() >= deadline {
            return Err(PhysicalLayerError::Cancelled);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Sends `payload`, then waits for the next message on the link, returning
/// how long the round trip took. Intended for two instances of this binary
/// talking to each other over an actual audio link; there is no
/// correlation between what was sent and what comes back beyond "some
/// message arrived", since the physical layer carries opaque bytes.
pub fn ping_once(
    layer: &PhysicalLayer,
    payload: &[u8],
    deadline: Option<Instant>,
) -> Result<std::time::Duration, PhysicalLayerError> {
    let start = Instant::now();
    layer.async_send(payload.to_vec())?;
    read_until(layer, deadline)?;
    Ok(start.elapsed())
}

/// Replies to every received message with the same bytes it was sent,
/// until `async_read` is cancelled.
pub fn pong_loop(layer: &PhysicalLayer) -> Result<(), PhysicalLayerError> {
    loop {
        let message = layer.async_read()?;
        log::info!("echoing {} bytes", message.len());
        layer.async_send(message)?;
    }
}
