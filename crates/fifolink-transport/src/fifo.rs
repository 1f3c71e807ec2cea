use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use tokio::net::unix::pipe;
use tracing::debug;

use crate::error::{Result, TransportError};

/// Default permission mode for created FIFO files.
pub const DEFAULT_FIFO_MODE: u32 = 0o600;

/// Fail unless `path` exists and is a directory.
pub fn require_dir(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) | Err(_) => Err(TransportError::NotDirectory {
            path: path.to_path_buf(),
        }),
    }
}

/// Probe `path` for a FIFO.
///
/// `Ok(true)` — a FIFO exists. `Ok(false)` — nothing is there.
/// `Err(ExistsNotFifo)` — the path is occupied by something else, which is
/// a distinct failure from absence.
pub fn fifo_status(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) if metadata.file_type().is_fifo() => Ok(true),
        Ok(_) => Err(TransportError::ExistsNotFifo {
            path: path.to_path_buf(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(TransportError::Io(err)),
    }
}

/// Create the FIFO at `path` with `mode` unless one is already there.
pub fn ensure_fifo(path: &Path, mode: u32) -> Result<()> {
    if fifo_status(path)? {
        return Ok(());
    }

    let c_path =
        CString::new(path.as_os_str().as_bytes()).map_err(|_| TransportError::Create {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path contains an interior NUL byte",
            ),
        })?;

    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of
    // the call; mkfifo reads it and touches nothing else in this process.
    let rc = unsafe { libc::mkfifo(c_path.as_ptr(), mode as libc::mode_t) };
    if rc != 0 {
        return Err(TransportError::Create {
            path: path.to_path_buf(),
            source: std::io::Error::last_os_error(),
        });
    }

    debug!(?path, "created fifo with mode {mode:o}");
    Ok(())
}

/// Remove the FIFO at `path` if one is still there.
///
/// An absent path is success. A path that no longer holds a FIFO is left
/// alone: whatever replaced it is not ours to delete.
pub fn remove_fifo(path: &Path) -> Result<()> {
    match fifo_status(path) {
        Ok(true) => {
            debug!(?path, "removing fifo");
            std::fs::remove_file(path).map_err(TransportError::Io)
        }
        Ok(false) => Ok(()),
        Err(TransportError::ExistsNotFifo { .. }) => {
            debug!(?path, "path identity changed; skipping removal");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Open the read direction of the FIFO at `path`.
///
/// The descriptor is opened read-write. Invariant: endpoints always open
/// both directions for read-write, so the open neither blocks waiting for a
/// counterpart nor observes EOF when the last external writer departs.
/// POSIX leaves O_RDWR on a FIFO undefined; Linux pins down the semantics
/// this crate relies on.
///
/// Must be called from within a tokio runtime.
pub fn open_receiver(path: &Path) -> Result<pipe::Receiver> {
    if !fifo_status(path)? {
        return Err(TransportError::NoPipe {
            path: path.to_path_buf(),
        });
    }

    pipe::OpenOptions::new()
        .read_write(true)
        .open_receiver(path)
        .map_err(|err| TransportError::Open {
            path: path.to_path_buf(),
            source: err,
        })
}

/// Open the write direction of the FIFO at `path`.
///
/// See [`open_receiver`] for the duplex-open invariant.
///
/// Must be called from within a tokio runtime.
pub fn open_sender(path: &Path) -> Result<pipe::Sender> {
    if !fifo_status(path)? {
        return Err(TransportError::NoPipe {
            path: path.to_path_buf(),
        });
    }

    pipe::OpenOptions::new()
        .read_write(true)
        .open_sender(path)
        .map_err(|err| TransportError::Open {
            path: path.to_path_buf(),
            source: err,
        })
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[test]
    fn require_dir_accepts_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(require_dir(dir.path()).is_ok());
    }

    #[test]
    fn require_dir_rejects_file_and_absence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            require_dir(&file),
            Err(TransportError::NotDirectory { .. })
        ));
        assert!(matches!(
            require_dir(&dir.path().join("missing")),
            Err(TransportError::NotDirectory { .. })
        ));
    }

    #[test]
    fn ensure_fifo_creates_with_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.r");

        ensure_fifo(&path, DEFAULT_FIFO_MODE).unwrap();

        assert!(fifo_status(&path).unwrap());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        // Second call is a no-op on the existing FIFO.
        ensure_fifo(&path, DEFAULT_FIFO_MODE).unwrap();
    }

    #[test]
    fn ensure_fifo_rejects_existing_non_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-pipe");
        std::fs::write(&path, b"regular-file").unwrap();

        assert!(matches!(
            ensure_fifo(&path, DEFAULT_FIFO_MODE),
            Err(TransportError::ExistsNotFifo { .. })
        ));
    }

    #[test]
    fn fifo_status_absent_is_false() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!fifo_status(&dir.path().join("missing")).unwrap());
    }

    #[test]
    fn remove_fifo_unlinks_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.w");
        ensure_fifo(&path, DEFAULT_FIFO_MODE).unwrap();

        remove_fifo(&path).unwrap();
        assert!(!path.exists());

        remove_fifo(&path).unwrap();
    }

    #[test]
    fn remove_fifo_skips_replaced_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.r");
        std::fs::write(&path, b"replacement-file").unwrap();

        remove_fifo(&path).unwrap();
        assert!(path.exists(), "must not remove a path that is not a fifo");
    }

    #[tokio::test]
    async fn open_receiver_requires_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            open_receiver(&missing),
            Err(TransportError::NoPipe { .. })
        ));

        let file = dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            open_receiver(&file),
            Err(TransportError::ExistsNotFifo { .. })
        ));
    }

    #[tokio::test]
    async fn duplex_open_does_not_block_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipe.duplex");
        ensure_fifo(&path, DEFAULT_FIFO_MODE).unwrap();

        // With read-write opens, neither side waits for the counterpart.
        let mut receiver = open_receiver(&path).unwrap();
        let mut sender = open_sender(&path).unwrap();

        sender.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        receiver.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }
}
