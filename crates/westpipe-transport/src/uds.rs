use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::IpcStream;

/// Unix domain socket listener bound to a filesystem path.
///
/// The host binds one of these per leg. The socket file is removed on drop,
/// but only if the path still refers to the socket this process created.
pub struct UnixDomainSocket {
    listener: UnixListener,
    guard: SocketPathGuard,
}

impl UnixDomainSocket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(target_os = "macos")]
    const MAX_PATH_LEN: usize = 104;
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path Unix domain socket.
    ///
    /// If the path already exists and is a socket, it is removed first
    /// (stale socket from a crashed host).
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

        remove_stale_socket(&path)?;

        let listener = UnixListener::bind(&path).map_err(|e| bind_error(&path, e))?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| bind_error(&path, e))?;
        let created = std::fs::symlink_metadata(&path).map_err(|e| bind_error(&path, e))?;

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            guard: SocketPathGuard {
                path,
                identity: (created.dev(), created.ino()),
            },
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .map_err(|source| TransportError::Accept {
                leg: "shared",
                source,
            })?;
        debug!(path = ?self.guard.path, "accepted connection");
        Ok(IpcStream::from_unix(stream))
    }

    /// Connect to a listening Unix domain socket (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<IpcStream> {
        let path = path.as_ref();
        let stream =
            std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(?path, "connected to unix domain socket");
        Ok(IpcStream::from_unix(stream))
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.guard.path
    }

    /// Register the listener with the tokio reactor.
    ///
    /// Must be called from within a tokio runtime. Path cleanup ownership
    /// moves to the returned listener.
    #[cfg(feature = "async")]
    pub fn into_async(self) -> Result<AsyncUnixListener> {
        self.listener.set_nonblocking(true)?;
        let listener = tokio::net::UnixListener::from_std(self.listener)?;
        Ok(AsyncUnixListener {
            listener,
            guard: self.guard,
        })
    }
}

/// A bound socket registered with the tokio reactor.
#[cfg(feature = "async")]
pub struct AsyncUnixListener {
    listener: tokio::net::UnixListener,
    guard: SocketPathGuard,
}

#[cfg(feature = "async")]
impl AsyncUnixListener {
    /// Wait for the next connection on this leg.
    pub async fn accept(&self, leg: &'static str) -> Result<tokio::net::UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .map_err(|source| TransportError::Accept { leg, source })?;
        match stream.peer_cred() {
            Ok(cred) => debug!(
                leg,
                path = ?self.guard.path,
                peer_uid = cred.uid(),
                peer_pid = ?cred.pid(),
                "accepted connection"
            ),
            Err(_) => debug!(leg, path = ?self.guard.path, "accepted connection"),
        }
        Ok(stream)
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.guard.path
    }
}

/// Removes the socket file on drop, unless something else now lives at the path.
struct SocketPathGuard {
    path: PathBuf,
    /// `(dev, ino)` of the socket created at bind time.
    identity: (u64, u64),
}

impl Drop for SocketPathGuard {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        let ours = metadata.file_type().is_socket()
            && (metadata.dev(), metadata.ino()) == self.identity;
        if ours {
            debug!(path = ?self.path, "removing socket file");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "socket path was replaced; leaving it");
        }
    }
}

/// A socket left behind by a crashed host is replaced; any other file is not.
fn remove_stale_socket(path: &Path) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(bind_error(path, err)),
    };
    if !metadata.file_type().is_socket() {
        return Err(bind_error(
            path,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "existing path is not a unix socket",
            ),
        ));
    }
    debug!(?path, "removing stale socket");
    std::fs::remove_file(path).map_err(|e| bind_error(path, e))
}

fn bind_error(path: &Path, source: std::io::Error) -> TransportError {
    TransportError::Bind {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};

    use super::*;

    fn scratch(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "wpuds-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn peer_frames_reach_the_host_and_heartbeats_come_back() {
        let dir = scratch("roundtrip");
        let path = dir.join("west.sock");
        let server = UnixDomainSocket::bind(&path).unwrap();
        assert_eq!(server.path(), path.as_path());

        let peer_path = path.clone();
        let peer = std::thread::spawn(move || {
            let mut stream = UnixDomainSocket::connect(&peer_path).unwrap();
            stream.write_all(b"frame\n").unwrap();
            let mut line = String::new();
            BufReader::new(stream).read_line(&mut line).unwrap();
            line
        });

        let host = server.accept().unwrap();
        let mut reader = BufReader::new(host.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "frame\n");
        let mut host = host;
        host.write_all(b"GUI_HEARTBEAT_8378\n").unwrap();

        assert_eq!(peer.join().unwrap(), "GUI_HEARTBEAT_8378\n");
        drop(server);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn socket_file_is_owner_only() {
        let dir = scratch("mode");
        let path = dir.join("mode.sock");
        let _server = UnixDomainSocket::bind(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, UnixDomainSocket::DEFAULT_SOCKET_MODE);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn overlong_path_is_rejected_up_front() {
        let path = format!("/tmp/{}.sock", "w".repeat(150));
        match UnixDomainSocket::bind(&path) {
            Err(TransportError::PathTooLong { len, max, .. }) => assert!(len >= max),
            other => panic!("expected PathTooLong, got {:?}", other.map(|s| s.path().to_owned())),
        }
    }

    #[test]
    fn leftover_socket_is_replaced_but_regular_file_is_not() {
        let dir = scratch("stale");
        let stale = dir.join("stale.sock");
        drop(UnixListener::bind(&stale).unwrap());
        assert!(stale.exists());
        let server = UnixDomainSocket::bind(&stale).expect("leftover socket should be replaced");
        drop(server);

        let regular = dir.join("notes.sock");
        std::fs::write(&regular, b"keep me").unwrap();
        assert!(matches!(
            UnixDomainSocket::bind(&regular),
            Err(TransportError::Bind { .. })
        ));
        assert_eq!(std::fs::read(&regular).unwrap(), b"keep me");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn replaced_path_survives_drop() {
        let dir = scratch("replaced");
        let path = dir.join("west.sock");
        let server = UnixDomainSocket::bind(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"someone else").unwrap();
        drop(server);

        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_listener_names_the_leg_and_cleans_up() {
        use tokio::io::AsyncReadExt;

        let dir = scratch("async");
        let path = dir.join("in.sock");
        let listener = UnixDomainSocket::bind(&path).unwrap().into_async().unwrap();

        let peer_path = path.clone();
        let peer = std::thread::spawn(move || {
            let mut stream = UnixDomainSocket::connect(&peer_path).unwrap();
            stream.write_all(b"tick").unwrap();
        });

        let mut stream = listener.accept("inbound").await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"tick");
        peer.join().unwrap();

        drop(listener);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
