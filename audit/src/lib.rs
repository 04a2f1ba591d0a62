//! Append-only security audit log.
//!
//! Every validation outcome, threat detection, and file mutation lands here
//! as a [`SecurityEvent`]. Appends are fire-and-forget: no caller ever
//! blocks on log durability, and a logging failure must never abort a
//! validation or file operation. The only failure mode of the in-memory
//! sink is a poisoned lock, which is recovered rather than propagated;
//! anything else worth knowing goes to the `tracing` fallback channel and
//! is swallowed.
//!
//! Readers get snapshots ([`SecurityAuditLog::events`]) and aggregate
//! summaries ([`SecurityAuditLog::metrics`]); no reader ever blocks a
//! writer beyond the momentary mutex hold.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use scribe_types::{EventKind, SecurityEvent, Severity};

/// How many recent samples feed the rolling per-operation average.
const TIMING_WINDOW: usize = 32;

#[derive(Debug, Default)]
struct TimingWindowState {
    recent: VecDeque<Duration>,
    samples: u64,
}

/// Thread-safe, append-only event sink with aggregate metrics.
#[derive(Debug)]
pub struct SecurityAuditLog {
    enabled: bool,
    events: Mutex<Vec<SecurityEvent>>,
    timings: Mutex<BTreeMap<&'static str, TimingWindowState>>,
}

/// Read-only summary of the log's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditMetrics {
    pub total_events: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_kind: BTreeMap<&'static str, usize>,
    /// Rolling average duration per operation name, over the most recent
    /// samples.
    pub rolling_average: BTreeMap<&'static str, Duration>,
}

impl SecurityAuditLog {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Mutex::new(Vec::new()),
            timings: Mutex::new(BTreeMap::new()),
        }
    }

    /// Whether events are being retained.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append an event. Never fails, never panics.
    ///
    /// When the log is disabled the event is still traced at debug level
    /// so a host subscriber can observe it, but nothing is retained.
    pub fn record(&self, event: SecurityEvent) {
        tracing::debug!(
            kind = event.kind.as_str(),
            severity = event.severity.as_str(),
            context = %event.context,
            "audit event"
        );
        if !self.enabled {
            return;
        }
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        events.push(event);
    }

    /// Record an operation timing sample for the rolling averages.
    pub fn record_timing(&self, operation: &'static str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        let mut timings = self
            .timings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let window = timings.entry(operation).or_default();
        window.samples += 1;
        window.recent.push_back(elapsed);
        if window.recent.len() > TIMING_WINDOW {
            window.recent.pop_front();
        }
    }

    /// Snapshot of all retained events, in append order.
    #[must_use]
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of retained events of the given kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }

    /// Aggregate counts and rolling performance averages.
    #[must_use]
    pub fn metrics(&self) -> AuditMetrics {
        let events = self
            .events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut by_severity: BTreeMap<Severity, usize> = BTreeMap::new();
        let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
        for event in events.iter() {
            *by_severity.entry(event.severity).or_default() += 1;
            *by_kind.entry(event.kind.as_str()).or_default() += 1;
        }
        let total_events = events.len();
        drop(events);

        let timings = self
            .timings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let rolling_average = timings
            .iter()
            .filter(|(_, window)| !window.recent.is_empty())
            .map(|(op, window)| {
                let total: Duration = window.recent.iter().sum();
                (*op, total / window.recent.len() as u32)
            })
            .collect();

        AuditMetrics {
            total_events,
            by_severity,
            by_kind,
            rolling_average,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(kind: EventKind, severity: Severity) -> SecurityEvent {
        SecurityEvent::new(kind, severity, "test", json!({}))
    }

    #[test]
    fn record_appends_in_order() {
        let log = SecurityAuditLog::new(true);
        log.record(event(EventKind::InputAccepted, Severity::Low));
        log.record(event(EventKind::ThreatDetected, Severity::High));

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::InputAccepted);
        assert_eq!(events[1].kind, EventKind::ThreatDetected);
    }

    #[test]
    fn disabled_log_retains_nothing() {
        let log = SecurityAuditLog::new(false);
        log.record(event(EventKind::InputAccepted, Severity::Low));
        log.record_timing("write", Duration::from_millis(5));

        assert!(log.events().is_empty());
        assert_eq!(log.metrics().total_events, 0);
        assert!(log.metrics().rolling_average.is_empty());
    }

    #[test]
    fn metrics_count_by_severity_and_kind() {
        let log = SecurityAuditLog::new(true);
        log.record(event(EventKind::InputAccepted, Severity::Low));
        log.record(event(EventKind::InputAccepted, Severity::Low));
        log.record(event(EventKind::PathRejected, Severity::Critical));

        let metrics = log.metrics();
        assert_eq!(metrics.total_events, 3);
        assert_eq!(metrics.by_severity[&Severity::Low], 2);
        assert_eq!(metrics.by_severity[&Severity::Critical], 1);
        assert_eq!(metrics.by_kind["input_accepted"], 2);
        assert_eq!(metrics.by_kind["path_rejected"], 1);
    }

    #[test]
    fn rolling_average_tracks_recent_samples() {
        let log = SecurityAuditLog::new(true);
        log.record_timing("write", Duration::from_millis(10));
        log.record_timing("write", Duration::from_millis(20));

        let metrics = log.metrics();
        assert_eq!(
            metrics.rolling_average["write"],
            Duration::from_millis(15)
        );
    }

    #[test]
    fn rolling_window_drops_old_samples() {
        let log = SecurityAuditLog::new(true);
        // Fill the window with slow samples, then flood with fast ones.
        log.record_timing("read", Duration::from_secs(100));
        for _ in 0..TIMING_WINDOW {
            log.record_timing("read", Duration::from_millis(1));
        }

        let metrics = log.metrics();
        assert_eq!(metrics.rolling_average["read"], Duration::from_millis(1));
    }

    #[test]
    fn concurrent_appends_do_not_interleave_corruptly() {
        use std::sync::Arc;

        let log = Arc::new(SecurityAuditLog::new(true));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let log = Arc::clone(&log);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    log.record(event(EventKind::InputAccepted, Severity::Low));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.events().len(), 800);
    }
}
