//! Error types for the smart proxy.

use thiserror::Error;

/// Result type alias for proxy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving or configuring the proxy.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed SOCKS5 input
    #[error("protocol error: {0}")]
    Protocol(String),

    /// SOCKS version byte mismatch
    #[error("protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// Address type other than IPv4 or domain name
    #[error("unsupported address type: 0x{0:02x}")]
    UnsupportedAddressType(u8),

    /// Outbound connection could not be established
    #[error("failed to connect to {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Blocklist content or descriptor problem
    #[error("blocklist error: {0}")]
    Blocklist(String),

    /// Blocklist download failed
    #[error("blocklist fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Network interface lookup failed
    #[error("interface error: {0}")]
    Interface(String),

    /// Start called while the server is running
    #[error("server already running")]
    AlreadyRunning,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be (de)serialized
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    /// Network or file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new blocklist error
    pub fn blocklist(msg: impl Into<String>) -> Self {
        Error::Blocklist(msg.into())
    }

    /// Create a new interface error
    pub fn interface(msg: impl Into<String>) -> Self {
        Error::Interface(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Check if this error came from malformed client input.
    ///
    /// Such sessions are closed without a reply.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::VersionMismatch { .. } | Error::UnsupportedAddressType(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::AlreadyRunning;
        assert_eq!(err.to_string(), "server already running");

        let err = Error::VersionMismatch { expected: 5, actual: 4 };
        assert_eq!(
            err.to_string(),
            "protocol version mismatch: expected 5, got 4"
        );

        let err = Error::UnsupportedAddressType(0x04);
        assert_eq!(err.to_string(), "unsupported address type: 0x04");
    }

    #[test]
    fn test_protocol_error_classification() {
        assert!(Error::protocol("short read").is_protocol_error());
        assert!(Error::UnsupportedAddressType(0x04).is_protocol_error());
        assert!(!Error::AlreadyRunning.is_protocol_error());
        assert!(!Error::Dial {
            target: "example.com:80".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
        .is_protocol_error());
    }
}
