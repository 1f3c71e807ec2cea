//! Two-party interprocess communication over named pipes (FIFOs).
//!
//! fifolink connects a server process and one or more client processes
//! through a pair of unidirectional pipe files, layering framing,
//! addressing, expiry and misdelivery recovery on top of plain byte-stream
//! I/O.
//!
//! # Crate Structure
//!
//! - [`transport`] — FIFO special-file management (probe, create, open, remove)
//! - [`frame`] — wire codec plus delimiter-bounded frame reassembly
//! - [`endpoint`] — roles, send/recv/listen/close, relay and expiry logic

/// Re-export transport types.
pub mod transport {
    pub use fifolink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use fifolink_frame::*;
}

/// Re-export endpoint types.
pub mod endpoint {
    pub use fifolink_endpoint::*;
}
