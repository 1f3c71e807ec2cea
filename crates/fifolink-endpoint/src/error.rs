use fifolink_frame::FrameError;
use fifolink_transport::TransportError;

/// Errors that can occur in endpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A server-role send was handed bytes without the protocol flag.
    #[error("message not legal")]
    MessageIllegal,

    /// Non-blocking recv found nothing pending. Expected steady-state;
    /// callers poll again.
    #[error("no message available")]
    NoMessage,

    /// The transport was closed underneath the operation. Expected
    /// steady-state during shutdown.
    #[error("pipe closed")]
    Closed,

    /// `listen` was called while another listen loop owns the queue.
    #[error("listen loop already running")]
    ListenerBusy,

    /// Cancellation fired; carries the outcome of the transport teardown
    /// performed on the cancellation branch.
    #[error("operation cancelled")]
    Cancelled {
        #[source]
        close: Option<Box<EndpointError>>,
    },
}

pub type Result<T> = std::result::Result<T, EndpointError>;
