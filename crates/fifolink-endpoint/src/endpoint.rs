use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::unix::pipe;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use fifolink_frame::{
    delimiter_safe_sender, unix_now, Frame, FrameError, FrameReader, FrameWriter, SEND_TTL,
};
use fifolink_transport::fifo;

use crate::config::EndpointConfig;
use crate::error::{EndpointError, Result};
use crate::role::Role;

/// Inbound queue depth; a full queue blocks the listen loop until recv
/// drains it.
const INBOUND_QUEUE_DEPTH: usize = 10;

/// Sleep applied by non-blocking recv before reporting an empty queue.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One side of a FIFO pipe pair.
///
/// Construction opens both pipes read-write (see
/// [`fifolink_transport::fifo::open_receiver`] for the duplex invariant);
/// the server role creates missing FIFO files first and removes them again
/// on [`close`](Endpoint::close). All methods take `&self`, so an endpoint
/// is shared across tasks behind an `Arc` — the usual shape is one
/// long-lived [`listen`](Endpoint::listen) task plus any number of
/// `send`/`recv` callers.
pub struct Endpoint {
    role: Role,
    root: PathBuf,
    config: EndpointConfig,
    read_path: PathBuf,
    write_path: PathBuf,
    /// Nil for the server role; clients get a delimiter-safe v4 UUID.
    sender_id: Uuid,
    reader: Mutex<Option<FrameReader<pipe::Receiver>>>,
    writer: Mutex<Option<FrameWriter<pipe::Sender>>>,
    inbound_tx: Mutex<Option<mpsc::Sender<Frame>>>,
    inbound_rx: Mutex<mpsc::Receiver<Frame>>,
    /// Child of the caller's token: `close` can wake this endpoint's blocked
    /// operations without cancelling the caller's wider scope.
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl Endpoint {
    /// Open an endpoint rooted at `root`.
    ///
    /// `root` must already exist and be a directory. The server role
    /// creates any missing FIFO (mode 0600) before opening; the client role
    /// requires both pipes to exist. A client's read/write pipes are the
    /// server's write/read pipes, so both parties agree on two files.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        root: impl AsRef<Path>,
        role: Role,
        config: EndpointConfig,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fifo::require_dir(&root)?;

        let (read_name, write_name) = match role {
            Role::Server => (&config.read_pipe_name, &config.write_pipe_name),
            Role::Client => (&config.write_pipe_name, &config.read_pipe_name),
        };
        let read_path = root.join(read_name);
        let write_path = root.join(write_name);

        let sender_id = match role {
            Role::Client => delimiter_safe_sender(config.delim),
            Role::Server => Uuid::nil(),
        };

        if role.is_server() {
            fifo::ensure_fifo(&read_path, fifo::DEFAULT_FIFO_MODE)?;
            fifo::ensure_fifo(&write_path, fifo::DEFAULT_FIFO_MODE)?;
        }

        let receiver = fifo::open_receiver(&read_path)?;
        let sender = fifo::open_sender(&write_path)?;
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

        info!(role = %role, root = %root.display(), "endpoint open");

        Ok(Self {
            role,
            root,
            read_path,
            write_path,
            sender_id,
            reader: Mutex::new(Some(FrameReader::new(receiver, config.delim))),
            writer: Mutex::new(Some(FrameWriter::new(sender, config.delim))),
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: Mutex::new(inbound_rx),
            cancel: cancel.child_token(),
            closed: AtomicBool::new(false),
            config,
        })
    }

    /// Send a message, returning the number of bytes written.
    ///
    /// Server role: `message` must already be a legal frame, usually built
    /// with [`Frame::respond`]; bytes without the protocol flag are
    /// rejected. Client role: `message` is a raw payload; a fresh
    /// normal-kind frame carrying this endpoint's sender id and a
    /// [`SEND_TTL`] expiry is encoded around it.
    pub async fn send(&self, message: &[u8]) -> Result<usize> {
        let frame = match self.role {
            Role::Server => {
                let frame = Frame::from_wire(message);
                if !frame.is_legal() {
                    return Err(EndpointError::MessageIllegal);
                }
                frame
            }
            Role::Client => Frame::encode(message, &self.sender_id, SEND_TTL),
        };
        self.write_frame(&frame).await
    }

    /// Receive the next message addressed to this endpoint.
    ///
    /// With `block = false` an empty source yields
    /// [`EndpointError::NoMessage`] after one short poll interval instead
    /// of waiting.
    pub async fn recv(&self, block: bool) -> Result<Frame> {
        match self.role {
            Role::Server => self.recv_server(block).await,
            Role::Client => self.recv_client(block).await,
        }
    }

    /// Drain the transport into the inbound queue until cancellation.
    ///
    /// Server role; run once, on a dedicated task, for the lifetime of the
    /// endpoint. Frames are enqueued exactly as reassembled — relay and
    /// expiry decisions belong to [`recv`](Endpoint::recv). A full queue
    /// blocks this loop until recv drains it.
    pub async fn listen(&self) -> Result<()> {
        let tx = self
            .inbound_tx
            .lock()
            .await
            .take()
            .ok_or(EndpointError::ListenerBusy)?;

        loop {
            let mut guard = self.reader.lock().await;
            let Some(reader) = guard.as_mut() else {
                return Ok(());
            };

            let frame = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("listen cancelled");
                    return Ok(());
                }
                res = reader.read_frame() => match res {
                    Ok(frame) => frame,
                    Err(FrameError::ConnectionClosed) => return Ok(()),
                    Err(err) => return Err(err.into()),
                },
            };
            drop(guard);

            trace!(bytes = frame.wire_size(), "frame enqueued");
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                sent = tx.send(frame) => {
                    if sent.is_err() {
                        // Receiver half gone; the endpoint is shutting down.
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Idempotent shutdown.
    ///
    /// Wakes every blocked operation on this endpoint, flushes and releases
    /// both pipe handles, and — server role only, since only the server
    /// creates them — unlinks the FIFO files if they are still FIFOs.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.cancel.cancel();

        let released = self.release_handles().await;

        if self.role.is_server() {
            fifo::remove_fifo(&self.read_path)?;
            fifo::remove_fifo(&self.write_path)?;
        }

        released?;
        info!(role = %self.role, "endpoint closed");
        Ok(())
    }

    /// The role fixed at construction.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The root directory holding the pipe files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Construction options in effect.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Full path of the pipe this endpoint reads.
    pub fn read_pipe_path(&self) -> &Path {
        &self.read_path
    }

    /// Full path of the pipe this endpoint writes.
    pub fn write_pipe_path(&self) -> &Path {
        &self.write_path
    }

    /// This endpoint's sender id; `None` for the server role.
    pub fn sender_id(&self) -> Option<Uuid> {
        match self.role {
            Role::Client => Some(self.sender_id),
            Role::Server => None,
        }
    }

    /// Whether `close` has run (or begun running).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn recv_server(&self, block: bool) -> Result<Frame> {
        let mut rx = self.inbound_rx.lock().await;

        if !block {
            loop {
                match rx.try_recv() {
                    Ok(frame) if frame.is_retransmit() => self.relay(frame).await?,
                    Ok(frame) => return Ok(frame),
                    Err(TryRecvError::Empty) => {
                        tokio::time::sleep(POLL_INTERVAL).await;
                        return Err(EndpointError::NoMessage);
                    }
                    Err(TryRecvError::Disconnected) => return Err(EndpointError::Closed),
                }
            }
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(EndpointError::Cancelled { close: None });
                }
                frame = rx.recv() => match frame {
                    None => return Err(EndpointError::Closed),
                    Some(frame) if frame.is_retransmit() => self.relay(frame).await?,
                    Some(frame) => return Ok(frame),
                },
            }
        }
    }

    /// Put a client-bounced frame back on the wire for its rightful owner.
    async fn relay(&self, frame: Frame) -> Result<()> {
        debug!(sender = %frame.sender_id(), "relaying retransmit frame");
        self.write_frame(&frame).await?;
        Ok(())
    }

    async fn recv_client(&self, block: bool) -> Result<Frame> {
        if block {
            return self.recv_client_blocking().await;
        }
        match tokio::time::timeout(POLL_INTERVAL, self.recv_client_blocking()).await {
            Ok(res) => res,
            Err(_elapsed) => Err(EndpointError::NoMessage),
        }
    }

    async fn recv_client_blocking(&self) -> Result<Frame> {
        tokio::select! {
            res = self.read_own_frame() => return res,
            _ = self.cancel.cancelled() => {}
        }

        // Cancellation won the race. The select above has already dropped
        // the read future (releasing its locks), so the transport can be
        // torn down here — which also forces any read still blocked in
        // another task to observe closure instead of hanging.
        let close = self.release_handles().await.err().map(Box::new);
        Err(EndpointError::Cancelled { close })
    }

    /// Drain the shared pipe until a frame addressed to this endpoint
    /// arrives.
    async fn read_own_frame(&self) -> Result<Frame> {
        loop {
            let frame = {
                let mut guard = self.reader.lock().await;
                let reader = guard.as_mut().ok_or(EndpointError::Closed)?;
                match reader.read_frame().await {
                    Ok(frame) => frame,
                    Err(FrameError::ConnectionClosed) => return Err(EndpointError::Closed),
                    Err(err) => return Err(err.into()),
                }
            };

            if !frame.is_legal() {
                warn!("dropping frame without protocol flag");
                continue;
            }
            if frame.expired(unix_now()) {
                trace!(sender = %frame.sender_id(), "dropping expired frame");
                continue;
            }
            if frame.sender_id() != self.sender_id {
                // Someone else's frame on the shared pipe: bounce it back so
                // the server relays it to its owner.
                let mut bounced = frame;
                bounced.mark_retransmit();
                debug!(sender = %bounced.sender_id(), "bouncing misdelivered frame");
                self.write_frame(&bounced).await?;
                continue;
            }

            return Ok(frame);
        }
    }

    async fn write_frame(&self, frame: &Frame) -> Result<usize> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(EndpointError::Closed)?;
        let written = writer.write_frame(frame).await?;
        trace!(bytes = written, kind = ?frame.kind(), "frame written");
        Ok(written)
    }

    /// Flush and drop both pipe handles. Safe to call repeatedly; a flush
    /// failure is reported after the handles are gone either way.
    async fn release_handles(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let flushed = match writer.as_mut() {
            Some(w) => w.flush().await,
            None => Ok(()),
        };
        *writer = None;
        drop(writer);

        *self.reader.lock().await = None;

        flushed.map_err(EndpointError::from)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("role", &self.role)
            .field("root", &self.root)
            .field("closed", &self.is_closed())
            .finish()
    }
}
