//! Per-connection SOCKS5 session.
//!
//! Greeting, request, routing decision, bound dial, reply, relay. Any
//! malformed input ends the session without a reply; a failed dial gets a
//! failure reply. Nothing is retried.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use super::relay::{relay, RelayStats};
use super::socks5::{self, Reply};
use crate::error::{Error, Result};
use crate::net::{BindingTable, Dialer};
use crate::routing::Router;
use crate::server::ProxyMetrics;

/// Everything a session needs, shared by all sessions of one server run.
pub struct SessionContext {
    pub router: Router,
    pub bindings: Arc<BindingTable>,
    pub dialer: Arc<dyn Dialer>,
    pub metrics: Arc<ProxyMetrics>,
}

/// Drive one client connection to completion.
pub async fn handle_client<S>(mut client: S, ctx: &SessionContext) -> Result<RelayStats>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    socks5::read_greeting(&mut client).await?;
    socks5::write_method_selection(&mut client).await?;

    let request = socks5::read_request(&mut client).await?;
    let target = request.target;

    let route = ctx.router.route(&target.host);
    let iface = ctx.router.interface_for(route);
    let binding = ctx.bindings.get(iface);
    ctx.metrics.record_route(route);

    tracing::debug!(
        "{} -> {} route, interface {:?}{}",
        target,
        route,
        iface,
        if binding.is_some() { "" } else { " (unbound)" }
    );

    let remote = match ctx.dialer.dial(&target.host, target.port, binding).await {
        Ok(remote) => remote,
        Err(e) => {
            // The dial error is what gets reported, not a failed reply write.
            let _ = socks5::write_reply(&mut client, Reply::ConnectionRefused).await;
            return Err(e);
        }
    };

    socks5::write_reply(&mut client, Reply::Succeeded).await?;

    let stats = relay(client, remote).await;
    ctx.metrics.add_bytes(stats.client_to_remote, stats.remote_to_client);
    Ok(stats)
}

/// Serve an accepted connection, accounting for it in the metrics.
pub async fn serve<S>(client: S, peer: SocketAddr, ctx: Arc<SessionContext>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ctx.metrics.increment_connections();

    match handle_client(client, &ctx).await {
        Ok(stats) => {
            tracing::debug!(
                "Session from {} closed ({} bytes up, {} bytes down)",
                peer,
                stats.client_to_remote,
                stats.remote_to_client
            );
        }
        Err(e) => {
            match &e {
                e if e.is_protocol_error() => ctx.metrics.increment_handshake_failures(),
                Error::Dial { .. } => ctx.metrics.increment_dial_failures(),
                _ => {}
            }
            tracing::debug!("Session from {} ended: {}", peer, e);
        }
    }

    ctx.metrics.decrement_connections();
}
