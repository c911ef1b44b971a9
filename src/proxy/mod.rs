//! Local SOCKS5 proxy: wire protocol, session handling and relay.
//!
//! Sessions parse the client's CONNECT request, ask the router for an egress
//! interface, dial through it and then relay bytes in both directions.

pub mod relay;
pub mod session;
pub mod socks5;

pub use relay::{relay, RelayStats};
pub use session::{handle_client, serve, SessionContext};
pub use socks5::{Reply, Request, TargetAddr};
