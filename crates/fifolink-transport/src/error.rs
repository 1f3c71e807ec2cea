use std::path::PathBuf;

/// Errors that can occur managing or using the pipe files.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint root must be an existing directory.
    #[error("not a directory: {path}")]
    NotDirectory { path: PathBuf },

    /// Something occupies the path, but it is not a FIFO.
    #[error("path exists but is not a fifo: {path}")]
    ExistsNotFifo { path: PathBuf },

    /// A pipe was required at the path and nothing is there.
    #[error("no pipe at {path}")]
    NoPipe { path: PathBuf },

    /// Failed to create a FIFO special file.
    #[error("failed to create fifo {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open a pipe file.
    #[error("failed to open fifo {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The pipe handles have been released.
    #[error("pipe closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
