//! Length-prefixed, delimiter-terminated message framing for fifolink.
//!
//! This is the core value-add layer of fifolink. Every message is framed
//! with:
//! - An 8-byte big-endian total length (counting the whole frame, trailing
//!   delimiter included)
//! - A 14-byte magic flag (`"fifolink-proto"`) for legality checks
//! - A 1-byte kind marker (normal / response / retransmit)
//! - A 16-byte sender UUID for addressing and misdelivery detection
//! - An 8-byte big-endian absolute expiry timestamp
//! - The payload, terminated by a single delimiter byte
//!
//! The transport below only guarantees delimiter-bounded reads, and payload
//! bytes may themselves contain the delimiter, so [`FrameReader`]
//! reassembles complete frames out of however many bounded reads it takes.
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    delimiter_safe_sender, unix_now, Frame, FrameKind, DEFAULT_DELIM, EXPIRY_SIZE, FLAG,
    FLAG_SIZE, HEADER_SIZE, KIND_SIZE, LEN_SIZE, MIN_FRAME_SIZE, SENDER_SIZE, SEND_TTL,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
