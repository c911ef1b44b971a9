//! # Smart Proxy
//!
//! A local SOCKS5 proxy that chooses the outbound network interface per
//! destination.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Server (listener lifecycle, config, status, metrics)   │
//! ├─────────────────────────────────────────────────────────┤
//! │  Proxy (SOCKS5 handshake, session, bidirectional relay) │
//! ├─────────────────────────────────────────────────────────┤
//! │  Routing (IP literal / company / blocklist / default)   │
//! ├─────────────────────────────────────────────────────────┤
//! │  Classify (GFWList parsing, suffix matching)            │
//! ├─────────────────────────────────────────────────────────┤
//! │  Net (interface lookup, interface-bound dialing)        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Routing Rules
//!
//! 1. IP literals always leave through the default interface.
//! 2. Company domains (and their subdomains) use the company interface,
//!    when one is configured.
//! 3. Domains on the blocklist use the blocklist interface.
//! 4. Everything else uses the default interface.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod classify;
pub mod error;
pub mod net;
pub mod proxy;
pub mod routing;
pub mod server;

pub use error::{Error, Result};
pub use routing::{InterfaceNames, Route, Router};
pub use server::{ProxyConfig, ProxyServer};
