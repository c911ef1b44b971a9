//! SOCKS5 wire format (RFC 1928), CONNECT subset.
//!
//! Only "no authentication" is offered, and only IPv4 and domain-name
//! destinations are accepted. Bound-address fields in replies are always
//! zeroed.

use std::fmt;
use std::net::Ipv4Addr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Protocol version byte.
pub const SOCKS5_VERSION: u8 = 0x05;

/// "No authentication required" method.
pub const METHOD_NO_AUTH: u8 = 0x00;

/// IPv4 address type.
pub const ATYP_IPV4: u8 = 0x01;
/// Domain name address type.
pub const ATYP_DOMAIN: u8 = 0x03;

/// Reply code for a successful connect.
pub const REP_SUCCEEDED: u8 = 0x00;
/// Reply code sent when the outbound connect fails.
pub const REP_CONNECTION_REFUSED: u8 = 0x05;

/// Reply length with an IPv4 bound address.
pub const REPLY_LEN: usize = 10;

/// Destination requested by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddr {
    /// Dotted-decimal IPv4 address or domain name as sent
    pub host: String,
    /// Destination port
    pub port: u16,
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A parsed request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command byte; every command is served as CONNECT
    pub command: u8,
    /// Destination
    pub target: TargetAddr,
}

/// Reply sent after the dial decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Succeeded,
    ConnectionRefused,
}

impl Reply {
    /// Reply code byte.
    pub fn code(self) -> u8 {
        match self {
            Reply::Succeeded => REP_SUCCEEDED,
            Reply::ConnectionRefused => REP_CONNECTION_REFUSED,
        }
    }

    /// Encode with a zeroed IPv4 bound address.
    pub fn encode(self) -> [u8; REPLY_LEN] {
        [SOCKS5_VERSION, self.code(), 0x00, ATYP_IPV4, 0, 0, 0, 0, 0, 0]
    }
}

/// Read the method negotiation header. Returns the offered methods.
pub async fn read_greeting<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    read_full(reader, &mut header, "greeting").await?;
    check_version(header[0])?;

    let mut methods = vec![0u8; header[1] as usize];
    read_full(reader, &mut methods, "methods").await?;
    Ok(methods)
}

/// Select "no authentication".
pub async fn write_method_selection<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[SOCKS5_VERSION, METHOD_NO_AUTH]).await?;
    Ok(())
}

/// Read a request header and destination.
pub async fn read_request<R>(reader: &mut R) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    read_full(reader, &mut header, "request").await?;
    check_version(header[0])?;

    let host = match header[3] {
        ATYP_IPV4 => {
            let mut octets = [0u8; 4];
            read_full(reader, &mut octets, "IPv4 address").await?;
            Ipv4Addr::from(octets).to_string()
        }
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            read_full(reader, &mut len, "domain length").await?;
            let mut domain = vec![0u8; len[0] as usize];
            read_full(reader, &mut domain, "domain").await?;
            String::from_utf8_lossy(&domain).into_owned()
        }
        other => return Err(Error::UnsupportedAddressType(other)),
    };

    let mut port = [0u8; 2];
    read_full(reader, &mut port, "port").await?;

    Ok(Request {
        command: header[1],
        target: TargetAddr {
            host,
            port: u16::from_be_bytes(port),
        },
    })
}

/// Write a reply.
pub async fn write_reply<W>(writer: &mut W, reply: Reply) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&reply.encode()).await?;
    Ok(())
}

fn check_version(version: u8) -> Result<()> {
    if version != SOCKS5_VERSION {
        return Err(Error::VersionMismatch {
            expected: SOCKS5_VERSION,
            actual: version,
        });
    }
    Ok(())
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::protocol(format!("short read in {}", what)))
        }
        Err(e) => Err(Error::Io(e)),
    }
}
