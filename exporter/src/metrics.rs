//! Ambient operational counters, independent of the per-probe Prometheus
//! gauges `/probe` emits. Exposed as a small text document at
//! `/internal/metrics`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Global counters for requests served and probe outcomes.
pub struct ExporterMetrics {
    pub requests_index: AtomicU64,
    pub requests_probe: AtomicU64,
    pub requests_filter_options: AtomicU64,
    pub requests_health: AtomicU64,
    pub requests_sessions: AtomicU64,
    pub requests_debug: AtomicU64,
    pub probe_outcome_ok: AtomicU64,
    pub probe_outcome_no_rtt: AtomicU64,
    pub probe_outcome_ping_error: AtomicU64,
    pub probe_outcome_ssh_timeout: AtomicU64,
    pub probe_outcome_exception: AtomicU64,
}

impl ExporterMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests_index: AtomicU64::new(0),
            requests_probe: AtomicU64::new(0),
            requests_filter_options: AtomicU64::new(0),
            requests_health: AtomicU64::new(0),
            requests_sessions: AtomicU64::new(0),
            requests_debug: AtomicU64::new(0),
            probe_outcome_ok: AtomicU64::new(0),
            probe_outcome_no_rtt: AtomicU64::new(0),
            probe_outcome_ping_error: AtomicU64::new(0),
            probe_outcome_ssh_timeout: AtomicU64::new(0),
            probe_outcome_exception: AtomicU64::new(0),
        }
    }

    pub fn record_route(&self, route: Route) {
        let counter = match route {
            Route::Index => &self.requests_index,
            Route::Probe => &self.requests_probe,
            Route::FilterOptions => &self.requests_filter_options,
            Route::Health => &self.requests_health,
            Route::Sessions => &self.requests_sessions,
            Route::Debug => &self.requests_debug,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_outcome(&self, outcome: fleet_core::ProbeOutcome) {
        let counter = match outcome {
            fleet_core::ProbeOutcome::Ok => &self.probe_outcome_ok,
            fleet_core::ProbeOutcome::NoRtt => &self.probe_outcome_no_rtt,
            fleet_core::ProbeOutcome::PingError => &self.probe_outcome_ping_error,
            fleet_core::ProbeOutcome::SshTimeout => &self.probe_outcome_ssh_timeout,
            fleet_core::ProbeOutcome::Exception => &self.probe_outcome_exception,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Render as a minimal Prometheus text-exposition document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut gauge = |name: &str, value: u64| {
            let _ = writeln!(out, "# TYPE {name} counter\n{name} {value}");
        };
        gauge("exporter_requests_index_total", self.requests_index.load(Ordering::Relaxed));
        gauge("exporter_requests_probe_total", self.requests_probe.load(Ordering::Relaxed));
        gauge(
            "exporter_requests_filter_options_total",
            self.requests_filter_options.load(Ordering::Relaxed),
        );
        gauge("exporter_requests_health_total", self.requests_health.load(Ordering::Relaxed));
        gauge("exporter_requests_sessions_total", self.requests_sessions.load(Ordering::Relaxed));
        gauge("exporter_requests_debug_total", self.requests_debug.load(Ordering::Relaxed));
        gauge(
            "exporter_probe_outcome_ok_total",
            self.probe_outcome_ok.load(Ordering::Relaxed),
        );
        gauge(
            "exporter_probe_outcome_no_rtt_total",
            self.probe_outcome_no_rtt.load(Ordering::Relaxed),
        );
        gauge(
            "exporter_probe_outcome_ping_error_total",
            self.probe_outcome_ping_error.load(Ordering::Relaxed),
        );
        gauge(
            "exporter_probe_outcome_ssh_timeout_total",
            self.probe_outcome_ssh_timeout.load(Ordering::Relaxed),
        );
        gauge(
            "exporter_probe_outcome_exception_total",
            self.probe_outcome_exception.load(Ordering::Relaxed),
        );
        out
    }
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Which endpoint served a request, for the request-count counters.
#[derive(Debug, Clone, Copy)]
pub enum Route {
    Index,
    Probe,
    FilterOptions,
    Health,
    Sessions,
    Debug,
}

/// Global metrics instance.
pub static METRICS: LazyLock<ExporterMetrics> = LazyLock::new(ExporterMetrics::new);

#[must_use]
pub fn metrics() -> &'static ExporterMetrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_increments() {
        let m = ExporterMetrics::new();
        m.record_route(Route::Probe);
        m.record_route(Route::Probe);
        assert_eq!(m.requests_probe.load(Ordering::Relaxed), 2);
        assert_eq!(m.requests_health.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn render_includes_every_counter_name() {
        let m = ExporterMetrics::new();
        let text = m.render();
        assert!(text.contains("exporter_requests_probe_total 0"));
        assert!(text.contains("exporter_probe_outcome_ok_total 0"));
    }
}
