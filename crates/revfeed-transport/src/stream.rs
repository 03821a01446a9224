use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::address::ServerAddress;
use crate::error::{Result, TransportError};

/// A connected data server stream implementing Read + Write.
///
/// The read half carries the framed corpus; the write half carries the
/// authentication line followed by the result rows.
pub struct ServerStream {
    inner: TcpStream,
    address: String,
}

impl ServerStream {
    /// Connect to the data server (blocking).
    pub fn connect(address: &ServerAddress) -> Result<Self> {
        let stream = TcpStream::connect((address.host(), address.port())).map_err(|e| {
            TransportError::Connect {
                address: address.to_string(),
                source: e,
            }
        })?;
        stream.set_nodelay(true)?;
        debug!(%address, "connected to data server");
        Ok(Self::from_tcp(stream))
    }

    /// Wrap an already connected TCP stream.
    pub fn from_tcp(stream: TcpStream) -> Self {
        let address = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        Self {
            inner: stream,
            address,
        }
    }

    /// Send the authentication token as the first line of the session.
    ///
    /// The token is opaque credential material and is never logged.
    pub fn authenticate(&mut self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(TransportError::InvalidToken("token is empty"));
        }
        if token.contains(|c: char| c == '\r' || c == '\n') {
            return Err(TransportError::InvalidToken(
                "token must not contain line breaks",
            ));
        }

        self.inner.write_all(token.as_bytes())?;
        self.inner.write_all(b"\r\n")?;
        self.inner.flush()?;
        debug!(address = %self.address, "sent authentication token");
        Ok(())
    }

    /// Shut down the read half, the write half, or both.
    ///
    /// Shutting down the read half makes a blocked reader observe end of
    /// stream, which is how an in-flight session is stopped from outside.
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        match self.inner.shutdown(how) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            inner: self.inner.try_clone()?,
            address: self.address.clone(),
        })
    }

    /// Remote address, for diagnostics.
    pub fn peer_address(&self) -> &str {
        &self.address
    }
}

impl Read for ServerStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ServerStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl std::fmt::Debug for ServerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerStream")
            .field("address", &self.address)
            .finish()
    }
}
