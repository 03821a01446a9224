use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// A data server address in `host:port` form.
///
/// IPv6 literals must be bracketed (`[::1]:9000`). The port is mandatory;
/// there is no well-known default for the data server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    host: String,
    port: u16,
}

impl ServerAddress {
    /// Parse a `host:port` address.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason| TransportError::InvalidAddress {
            address: input.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("address is empty"));
        }

        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 literal"))?;
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| invalid("missing port"))?;
            (host, port)
        } else {
            let (host, port) = trimmed
                .rsplit_once(':')
                .ok_or_else(|| invalid("missing port"))?;
            if host.contains(':') {
                return Err(invalid("IPv6 hosts must be bracketed"));
            }
            (host, port)
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let port: u16 = port.parse().map_err(|_| invalid("invalid port"))?;
        if port == 0 {
            return Err(invalid("port must be non-zero"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Host name or IP literal (without brackets).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for ServerAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
