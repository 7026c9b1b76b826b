//! A mock [`VirtualNic`] for the demo: no TUN device, just an in-process
//! loopback queue. Real IP frame delivery is out of scope for this
//! application layer, the same way it's out of scope for the core.

use std::collections::VecDeque;
use std::io;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use acoustic_core::VirtualNic;

/// Hands back whatever was last sent to it, after an optional artificial
/// delay (useful for exercising timing-sensitive demo code without a real
/// network).
pub struct LoopbackNic {
    queue: Mutex<VecDeque<Vec<u8>>>,
    ready: Condvar,
    delay: Duration,
}

impl LoopbackNic {
    pub fn new(delay: Duration) -> Self {
        Self { queue: Mutex::new(VecDeque::new()), ready: Condvar::new(), delay }
    }
}

impl VirtualNic for LoopbackNic {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.queue.lock().unwrap().push_back(buf.to_vec());
        self.ready.notify_one();
        Ok(buf.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut q = self.queue.lock().unwrap();
        while q.is_empty() {
            q = self.ready.wait(q).unwrap();
        }
        let frame = q.pop_front().unwrap();
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_then_recv_returns_the_same_bytes() {
        let mut nic = LoopbackNic::new(Duration::ZERO);
        nic.send(b"hello").unwrap();
        let mut buf = [0u8; 16];
        let n = nic.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }
}
