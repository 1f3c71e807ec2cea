use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::codec::Frame;
use crate::error::Result;

/// Writes complete frames, delimiter-terminated and flushed.
///
/// Each frame goes out as a single buffer (frame bytes plus the delimiter)
/// so concurrent writers on the same pipe interleave at frame granularity
/// whenever the write fits the pipe buffer.
pub struct FrameWriter<W> {
    inner: W,
    delim: u8,
    buf: BytesMut,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap a byte sink, terminating frames with `delim`.
    pub fn new(inner: W, delim: u8) -> Self {
        Self {
            inner,
            delim,
            buf: BytesMut::new(),
        }
    }

    /// Write one frame and flush, returning the bytes put on the wire.
    ///
    /// A short write or flush failure surfaces the underlying I/O error; no
    /// partial-frame state is retained across calls.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.buf.clear();
        self.buf.extend_from_slice(frame.as_bytes());
        self.buf.extend_from_slice(&[self.delim]);

        self.inner.write_all(&self.buf).await?;
        self.inner.flush().await?;
        Ok(self.buf.len())
    }

    /// Flush the underlying sink.
    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        Ok(())
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::codec::{DEFAULT_DELIM, SEND_TTL};
    use crate::reader::FrameReader;

    #[tokio::test]
    async fn written_frame_reads_back() {
        let frame = Frame::encode(b"ping", &Uuid::new_v4(), SEND_TTL);

        let mut writer = FrameWriter::new(Vec::new(), DEFAULT_DELIM);
        let written = writer.write_frame(&frame).await.unwrap();
        let sink = writer.into_inner();

        assert_eq!(written, frame.wire_size());
        assert_eq!(sink.last(), Some(&DEFAULT_DELIM));

        let mut reader = FrameReader::new(&sink[..], DEFAULT_DELIM);
        assert_eq!(reader.read_frame().await.unwrap(), frame);
    }

    #[tokio::test]
    async fn bytes_written_match_declared_length() {
        let mut writer = FrameWriter::new(Vec::new(), DEFAULT_DELIM);

        for payload in [&b""[..], b"short", b"with\nembedded\ndelims"] {
            let frame = Frame::encode(payload, &Uuid::new_v4(), SEND_TTL);
            let written = writer.write_frame(&frame).await.unwrap();
            assert_eq!(written as u64, frame.total_len());
        }
    }

    #[tokio::test]
    async fn sequential_frames_stay_ordered() {
        let sender = Uuid::new_v4();
        let first = Frame::encode(b"first", &sender, SEND_TTL);
        let second = Frame::encode(b"second", &sender, SEND_TTL);

        let mut writer = FrameWriter::new(Vec::new(), DEFAULT_DELIM);
        writer.write_frame(&first).await.unwrap();
        writer.write_frame(&second).await.unwrap();
        let sink = writer.into_inner();

        let mut reader = FrameReader::new(&sink[..], DEFAULT_DELIM);
        assert_eq!(reader.read_frame().await.unwrap(), first);
        assert_eq!(reader.read_frame().await.unwrap(), second);
    }

    #[tokio::test]
    async fn write_error_propagates() {
        struct FailingSink;

        impl AsyncWrite for FailingSink {
            fn poll_write(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &[u8],
            ) -> std::task::Poll<std::io::Result<usize>> {
                std::task::Poll::Ready(Err(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )))
            }

            fn poll_flush(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }

            fn poll_shutdown(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Ok(()))
            }
        }

        let frame = Frame::encode(b"doomed", &Uuid::new_v4(), SEND_TTL);
        let mut writer = FrameWriter::new(FailingSink, DEFAULT_DELIM);

        let err = writer.write_frame(&frame).await.unwrap_err();
        assert!(matches!(err, crate::FrameError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe));
    }

    #[tokio::test]
    async fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Vec::new(), DEFAULT_DELIM);
        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }
}
