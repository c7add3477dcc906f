//! Counters for session lifecycle activity.
//!
//! A `SessionMetrics` instance is created once by whoever wires the connector
//! together and shared by `Arc` with the components that record into it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct SessionMetrics {
    sessions_created: AtomicU64,
    sessions_reused: AtomicU64,
    creation_failures: AtomicU64,
    sessions_closed: AtomicU64,
    sessions_reaped: AtomicU64,
    sessions_expired: AtomicU64,
    statements_submitted: AtomicU64,
}

/// Point-in-time copy of [`SessionMetrics`].
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_created: u64,
    pub sessions_reused: u64,
    pub creation_failures: u64,
    pub sessions_closed: u64,
    pub sessions_reaped: u64,
    pub sessions_expired: u64,
    pub statements_submitted: u64,
}

impl MetricsSnapshot {
    /// Share of session resolutions served by an existing session.
    pub fn reuse_ratio(&self) -> f32 {
        let total = self.sessions_created + self.sessions_reused;
        if total == 0 {
            return 0.0;
        }
        self.sessions_reused as f32 / total as f32
    }
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reused(&self) {
        self.sessions_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_creation_failure(&self) {
        self.creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reaped(&self, count: u64) {
        self.sessions_reaped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.sessions_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.statements_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_reused: self.sessions_reused.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            sessions_reaped: self.sessions_reaped.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
            statements_submitted: self.statements_submitted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_records() {
        let metrics = SessionMetrics::new();
        metrics.record_created();
        metrics.record_reused();
        metrics.record_reused();
        metrics.record_reaped(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sessions_created, 1);
        assert_eq!(snapshot.sessions_reused, 2);
        assert_eq!(snapshot.sessions_reaped, 3);
        assert!((snapshot.reuse_ratio() - 2.0 / 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_reuse_ratio_is_zero() {
        assert_eq!(MetricsSnapshot::default().reuse_ratio(), 0.0);
    }
}
