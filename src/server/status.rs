//! Human-readable status lines for the control surface.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;

/// Number of lines kept.
pub const STATUS_LOG_CAPACITY: usize = 100;

/// Bounded buffer of timestamped status lines.
///
/// Every line is also emitted through `tracing`.
#[derive(Debug)]
pub struct StatusLog {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl StatusLog {
    /// Create a log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(STATUS_LOG_CAPACITY)
    }

    /// Create a log keeping at most `capacity` lines.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record a status line.
    pub fn record(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        tracing::info!("{}", msg);

        let line = format!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), msg);
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Copy of the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Server state as shown by a control panel.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub running: bool,
    pub port: u16,
    pub logs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_timestamped() {
        let log = StatusLog::new();
        log.record("Proxy server stopped");

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] Proxy server stopped"));
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let log = StatusLog::with_capacity(3);
        for i in 0..5 {
            log.record(format!("line {}", i));
        }

        let lines = log.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("line 2"));
        assert!(lines[2].ends_with("line 4"));
    }
}
