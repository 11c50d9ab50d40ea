use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::error::{Result, TransportError};

/// How long a read waits on an attached peer before reporting "no data yet".
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Dedicated data channel over a filesystem-path Unix domain socket.
///
/// Serves one peer at a time. The first read blocks until a peer connects.
/// When that peer hangs up the read fails with
/// [`TransportError::PeerReset`] so a partly read frame is never completed
/// with another peer's bytes; the next read waits for the next peer, the same
/// way a USB data interface survives the host closing and reopening its port.
pub struct DataSocket {
    listener: UnixListener,
    path: PathBuf,
    created_inode: (u64, u64),
    peer: Option<UnixStream>,
    poll_interval: Duration,
}

impl DataSocket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on `path`, removing a stale socket left by a previous run.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind and listen with an explicit permission mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        // Never remove non-socket files.
        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(TransportError::Bind {
                    path,
                    source: std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|source| TransportError::Bind {
                path: path.clone(),
                source,
            })?;
        }

        let bind_err = |source| TransportError::Bind {
            path: path.clone(),
            source,
        };
        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(bind_err)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, "data socket listening");

        Ok(Self {
            listener,
            created_inode: (created.dev(), created.ino()),
            path,
            peer: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override how long a read waits before reporting "no data yet".
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True while a peer is attached.
    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    fn attach_peer(&mut self) -> Result<&mut UnixStream> {
        if self.peer.is_none() {
            let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
            stream.set_read_timeout(Some(self.poll_interval))?;
            info!(path = ?self.path, "data peer attached");
            self.peer = Some(stream);
        }
        self.peer
            .as_mut()
            .ok_or(TransportError::NotConnected("data-socket"))
    }

    fn detach_peer(&mut self, reason: &str) {
        if self.peer.take().is_some() {
            info!(path = ?self.path, reason, "data peer detached");
        }
    }
}

impl Channel for DataSocket {
    fn name(&self) -> &'static str {
        "data-socket"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let peer = self.attach_peer()?;
        match peer.read(buf) {
            Ok(0) => {
                self.detach_peer("hang-up");
                Err(TransportError::PeerReset("data-socket"))
            }
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => {
                warn!(error = %err, "data peer read failed");
                self.detach_peer("read error");
                Err(TransportError::Io(err))
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let peer = self
            .peer
            .as_mut()
            .ok_or(TransportError::NotConnected("data-socket"))?;
        if let Err(err) = peer.write_all(data) {
            self.detach_peer("write error");
            return Err(TransportError::Io(err));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.peer.as_mut() {
            Some(peer) => peer.flush().map_err(Into::into),
            None => Ok(()),
        }
    }
}

impl Drop for DataSocket {
    fn drop(&mut self) {
        let (expected_dev, expected_ino) = self.created_inode;
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(
                    path = ?self.path,
                    "socket path identity changed; skipping cleanup"
                );
            }
        }
    }
}

impl std::fmt::Debug for DataSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSocket")
            .field("path", &self.path)
            .field("peer", &self.peer.is_some())
            .finish()
    }
}

/// Client end of a [`DataSocket`], used by host-side tools.
#[derive(Debug)]
pub struct UdsStream {
    stream: UnixStream,
}

impl UdsStream {
    /// Connect to a listening data socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        stream.set_read_timeout(Some(DEFAULT_POLL_INTERVAL))?;
        debug!(?path, "connected to data socket");
        Ok(Self { stream })
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: UnixStream) -> Result<Self> {
        stream.set_read_timeout(Some(DEFAULT_POLL_INTERVAL))?;
        Ok(Self { stream })
    }
}

impl Channel for UdsStream {
    fn name(&self) -> &'static str {
        "data-socket-client"
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}
