//! Trait boundary to a virtual network interface. Turning reassembled
//! messages into IP packets (and vice versa) belongs to the application,
//! not the physical layer; this crate only needs somewhere to hand bytes
//! to and pull bytes from.

use std::io;

/// A byte-stream endpoint the physical layer sends reassembled messages to
/// and reads outbound messages from. A real implementation would wrap a
/// TUN/TAP device; this crate ships none.
pub trait VirtualNic: Send {
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;
}
