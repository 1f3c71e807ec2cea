//! FIFO (named pipe) transport for fifolink.
//!
//! Manages the two pipe special files an endpoint communicates through:
//! existence and type probes, creation, duplex open, and removal. This is
//! the lowest layer of fifolink. Framing and the endpoint engine build on
//! the handles opened here.
//!
//! FIFOs connect exactly one byte stream between a reader side and a writer
//! side; everything message-shaped lives in the layers above.

pub mod error;

#[cfg(unix)]
pub mod fifo;

pub use error::{Result, TransportError};
