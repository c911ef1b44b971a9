//! Outbound connections bound to an egress interface.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use socket2::SockRef;
use tokio::net::{TcpSocket, TcpStream};

use super::bind::{platform_binder, EgressBinder};
use super::iface::InterfaceBinding;
use crate::error::{Error, Result};

/// Opens outbound TCP connections for proxy sessions.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connect to `host:port`, leaving through `binding` when given.
    async fn dial(
        &self,
        host: &str,
        port: u16,
        binding: Option<&InterfaceBinding>,
    ) -> Result<TcpStream>;
}

/// Dialer that applies the egress binder and source address to every socket.
#[derive(Debug, Clone)]
pub struct BoundDialer {
    binder: Arc<dyn EgressBinder>,
}

impl BoundDialer {
    /// Create a dialer using `binder`.
    pub fn new(binder: Arc<dyn EgressBinder>) -> Self {
        Self { binder }
    }

    /// Create a dialer using the binder for this platform.
    pub fn platform() -> Self {
        Self::new(platform_binder())
    }

    async fn connect_addr(
        &self,
        addr: SocketAddr,
        binding: Option<&InterfaceBinding>,
    ) -> io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };

        if let Some(binding) = binding {
            if let Err(e) = self
                .binder
                .bind_interface(&SockRef::from(&socket), addr, binding)
            {
                tracing::debug!("Cannot bind socket to {}: {}", binding.name, e);
            }
            if let (Some(source), true) = (binding.source_ip, addr.is_ipv4()) {
                socket.bind(SocketAddr::new(IpAddr::V4(source), 0))?;
            }
        }

        socket.connect(addr).await
    }
}

impl Default for BoundDialer {
    fn default() -> Self {
        Self::platform()
    }
}

#[async_trait]
impl Dialer for BoundDialer {
    async fn dial(
        &self,
        host: &str,
        port: u16,
        binding: Option<&InterfaceBinding>,
    ) -> Result<TcpStream> {
        let target = format_target(host, port);
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| Error::Dial {
                target: target.clone(),
                source,
            })?;

        let mut last_err = None;
        for addr in addrs {
            match self.connect_addr(addr, binding).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("Connect to {} ({}) failed: {}", target, addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(Error::Dial {
            target,
            source: last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
            }),
        })
    }
}

/// `host:port`, bracketing IPv6 literals.
pub fn format_target(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::bind::SourceOnlyBinder;
    use std::net::Ipv4Addr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn loopback_binding() -> InterfaceBinding {
        InterfaceBinding {
            name: "lo".into(),
            index: 1,
            source_ip: Some(Ipv4Addr::LOCALHOST),
        }
    }

    #[test]
    fn test_format_target() {
        assert_eq!(format_target("example.com", 80), "example.com:80");
        assert_eq!(format_target("10.0.0.1", 443), "10.0.0.1:443");
        assert_eq!(format_target("::1", 8080), "[::1]:8080");
    }

    #[tokio::test]
    async fn test_dial_with_source_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut stream, peer) = listener.accept().await.unwrap();
            stream.write_all(b"hi").await.unwrap();
            peer
        });

        let dialer = BoundDialer::new(Arc::new(SourceOnlyBinder));
        let binding = loopback_binding();
        let mut stream = dialer
            .dial("127.0.0.1", port, Some(&binding))
            .await
            .unwrap();

        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");

        let peer = server.await.unwrap();
        assert_eq!(peer.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_dial_refused() {
        // Grab a free port, then close it so nothing is listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let dialer = BoundDialer::new(Arc::new(SourceOnlyBinder));
        let err = dialer.dial("127.0.0.1", port, None).await.unwrap_err();
        match err {
            Error::Dial { target, .. } => assert_eq!(target, format!("127.0.0.1:{}", port)),
            other => panic!("unexpected error: {}", other),
        }
    }
}
