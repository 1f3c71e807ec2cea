use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use crate::codec::{Frame, LEN_SIZE, MIN_FRAME_SIZE};
use crate::error::{FrameError, Result};

/// Reassembles complete frames out of delimiter-bounded reads.
///
/// The transport only exposes "read up to the next delimiter byte", and
/// payload bytes may themselves contain the delimiter, so one bounded read
/// can return a prefix of a frame rather than the whole thing. The reader
/// accumulates chunks until the byte count matches the frame's declared
/// total length, then yields the frame with the trailing delimiter
/// stripped.
///
/// All reassembly state lives in the struct, so a `read_frame` future that
/// loses a select race drops no bytes already pulled off the wire.
pub struct FrameReader<R> {
    inner: BufReader<R>,
    delim: u8,
    /// In-flight delimiter-bounded chunk; may lack its delimiter if a read
    /// was interrupted mid-chunk.
    scratch: Vec<u8>,
    /// Completed chunks of the frame being assembled.
    pending: BytesMut,
    /// Total length declared by the frame under assembly, once at least the
    /// length field has been buffered.
    expected: Option<u64>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a byte stream, reading frames bounded by `delim`.
    pub fn new(inner: R, delim: u8) -> Self {
        Self {
            inner: BufReader::new(inner),
            delim,
            scratch: Vec::new(),
            pending: BytesMut::new(),
            expected: None,
        }
    }

    /// Read the next complete frame.
    ///
    /// Returns [`FrameError::ConnectionClosed`] at end of stream. On a FIFO
    /// opened read-write this cannot occur, because the endpoint itself
    /// keeps a writer open; it is reachable for plain streams and in tests.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            let read = self.inner.read_until(self.delim, &mut self.scratch).await?;
            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }
            if self.scratch.last() != Some(&self.delim) {
                // End of stream mid-chunk; the next read reports closure.
                continue;
            }

            self.pending.extend_from_slice(&self.scratch);
            self.scratch.clear();

            if self.expected.is_none() && self.pending.len() >= LEN_SIZE {
                let declared = u64::from_be_bytes(
                    self.pending[..LEN_SIZE]
                        .try_into()
                        .unwrap_or([0u8; LEN_SIZE]),
                );
                if declared < MIN_FRAME_SIZE as u64 {
                    debug!(declared, "frame length below minimum; resynchronizing");
                    self.reset();
                    continue;
                }
                self.expected = Some(declared);
            }

            let Some(expected) = self.expected else {
                // Fewer than LEN_SIZE bytes buffered so far; the length
                // field itself split across chunks.
                continue;
            };

            let accumulated = self.pending.len() as u64;
            if accumulated < expected {
                continue;
            }
            if accumulated > expected {
                // A concurrent writer interleaved bytes with ours; drop the
                // partial frame and hunt for the next boundary.
                debug!(accumulated, expected, "stream desynchronized; discarding partial frame");
                self.reset();
                continue;
            }

            let mut raw = std::mem::take(&mut self.pending);
            self.expected = None;
            raw.truncate(raw.len() - 1); // strip the delimiter
            return Ok(Frame::from_wire(raw));
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.expected = None;
    }
}
