use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::Result;

/// The peer's end of a pipe leg: a blocking, connected stream.
///
/// Returned by [`UnixDomainSocket::connect`](crate::UnixDomainSocket::connect).
/// A peer writes frames to it and, in single-pipe mode, reads heartbeat
/// lines from a clone of it.
pub struct IpcStream(UnixStream);

impl IpcStream {
    pub(crate) fn from_unix(stream: UnixStream) -> Self {
        Self(stream)
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        Ok(self.0.set_write_timeout(timeout)?)
    }

    /// A second handle on the same connection.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self(self.0.try_clone()?))
    }

    /// Half-close with `Shutdown::Write` to end the frame stream while
    /// heartbeats keep arriving on a clone.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        Ok(self.0.shutdown(how)?)
    }
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IpcStream").field(&self.0).finish()
    }
}
