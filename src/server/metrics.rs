//! Proxy metrics collection.
//!
//! Aggregate counters only; no destination hosts are retained.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::routing::Route;

/// Proxy metrics collector.
pub struct ProxyMetrics {
    /// Collector creation time
    start_time: Instant,
    /// Total connections accepted
    total_connections: AtomicU64,
    /// Current active connections
    active_connections: AtomicU64,
    /// Sessions closed because of malformed SOCKS5 input
    handshake_failures: AtomicU64,
    /// Sessions whose outbound dial failed
    dial_failures: AtomicU64,
    /// Requests routed to the default interface
    default_routes: AtomicU64,
    /// Requests routed to the company interface
    company_routes: AtomicU64,
    /// Requests routed to the blocklist interface
    blocklist_routes: AtomicU64,
    /// Bytes relayed from clients to remotes
    bytes_up: AtomicU64,
    /// Bytes relayed from remotes to clients
    bytes_down: AtomicU64,
}

impl ProxyMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            handshake_failures: AtomicU64::new(0),
            dial_failures: AtomicU64::new(0),
            default_routes: AtomicU64::new(0),
            company_routes: AtomicU64::new(0),
            blocklist_routes: AtomicU64::new(0),
            bytes_up: AtomicU64::new(0),
            bytes_down: AtomicU64::new(0),
        }
    }

    /// Increment total and active connections.
    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement active connections.
    pub fn decrement_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Increment handshake failure count.
    pub fn increment_handshake_failures(&self) {
        self.handshake_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment dial failure count.
    pub fn increment_dial_failures(&self) {
        self.dial_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a routing decision.
    pub fn record_route(&self, route: Route) {
        let counter = match route {
            Route::Default => &self.default_routes,
            Route::Company => &self.company_routes,
            Route::Blocklist => &self.blocklist_routes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add relayed bytes.
    pub fn add_bytes(&self, up: u64, down: u64) {
        self.bytes_up.fetch_add(up, Ordering::Relaxed);
        self.bytes_down.fetch_add(down, Ordering::Relaxed);
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get total connections.
    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Get active connections.
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            total_connections: self.total_connections(),
            active_connections: self.active_connections(),
            handshake_failures: self.handshake_failures.load(Ordering::Relaxed),
            dial_failures: self.dial_failures.load(Ordering::Relaxed),
            default_routes: self.default_routes.load(Ordering::Relaxed),
            company_routes: self.company_routes.load(Ordering::Relaxed),
            blocklist_routes: self.blocklist_routes.load(Ordering::Relaxed),
            bytes_up: self.bytes_up.load(Ordering::Relaxed),
            bytes_down: self.bytes_down.load(Ordering::Relaxed),
        }
    }

    /// Format metrics as a simple text report.
    pub fn format_report(&self) -> String {
        let snapshot = self.snapshot();

        format!(
            r#"Smart Proxy Metrics
===================
Uptime: {} seconds

Connections:
  Total:  {}
  Active: {}

Routes:
  Default:   {}
  Company:   {}
  Blocklist: {}

Traffic:
  Up:   {} bytes
  Down: {} bytes

Errors:
  Handshake Failures: {}
  Dial Failures:      {}
"#,
            snapshot.uptime_secs,
            snapshot.total_connections,
            snapshot.active_connections,
            snapshot.default_routes,
            snapshot.company_routes,
            snapshot.blocklist_routes,
            snapshot.bytes_up,
            snapshot.bytes_down,
            snapshot.handshake_failures,
            snapshot.dial_failures,
        )
    }
}

impl Default for ProxyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of all metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub total_connections: u64,
    pub active_connections: u64,
    pub handshake_failures: u64,
    pub dial_failures: u64,
    pub default_routes: u64,
    pub company_routes: u64,
    pub blocklist_routes: u64,
    pub bytes_up: u64,
    pub bytes_down: u64,
}

impl MetricsSnapshot {
    /// Fraction of routed requests that took the blocklist interface.
    pub fn blocklist_share(&self) -> f64 {
        let routed = self.default_routes + self.company_routes + self.blocklist_routes;
        if routed == 0 {
            0.0
        } else {
            self.blocklist_routes as f64 / routed as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = ProxyMetrics::new();
        assert_eq!(metrics.total_connections(), 0);
        assert_eq!(metrics.active_connections(), 0);
    }

    #[test]
    fn test_connection_counting() {
        let metrics = ProxyMetrics::new();

        metrics.increment_connections();
        metrics.increment_connections();
        assert_eq!(metrics.total_connections(), 2);
        assert_eq!(metrics.active_connections(), 2);

        metrics.decrement_connections();
        assert_eq!(metrics.total_connections(), 2);
        assert_eq!(metrics.active_connections(), 1);
    }

    #[test]
    fn test_route_counting() {
        let metrics = ProxyMetrics::new();

        metrics.record_route(Route::Default);
        metrics.record_route(Route::Blocklist);
        metrics.record_route(Route::Blocklist);
        metrics.record_route(Route::Company);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.default_routes, 1);
        assert_eq!(snapshot.company_routes, 1);
        assert_eq!(snapshot.blocklist_routes, 2);
        assert!((snapshot.blocklist_share() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_bytes_and_failures() {
        let metrics = ProxyMetrics::new();

        metrics.add_bytes(1000, 2000);
        metrics.increment_dial_failures();
        metrics.increment_handshake_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bytes_up, 1000);
        assert_eq!(snapshot.bytes_down, 2000);
        assert_eq!(snapshot.dial_failures, 1);
        assert_eq!(snapshot.handshake_failures, 1);
    }

    #[test]
    fn test_format_report() {
        let metrics = ProxyMetrics::new();
        metrics.increment_connections();

        let report = metrics.format_report();
        assert!(report.contains("Smart Proxy Metrics"));
        assert!(report.contains("Total:  1"));
    }
}
