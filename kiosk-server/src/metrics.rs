//! Simple metrics collection for observability
//!
//! Route counters use atomics so the hot path never allocates. Load test
//! counters are not duplicated here: they are read from the run's
//! [`TrackerSnapshot`] at export time.

use kiosk::TrackerSnapshot;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// HTTP routes served by the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    StartWorkflow,
    Health,
    Metrics,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::StartWorkflow => "start_workflow",
            Route::Health => "health",
            Route::Metrics => "metrics",
        }
    }
}

/// Core metrics collected by the service
pub struct Metrics {
    /// Service start time
    start_time: Instant,

    /// Total requests received
    pub total_requests: AtomicU64,

    /// Requests by route
    pub start_workflow_requests: AtomicU64,
    pub health_requests: AtomicU64,
    pub metrics_requests: AtomicU64,

    /// `/start-workflow` outcomes
    pub workflows_started: AtomicU64,
    pub workflows_failed: AtomicU64,
    pub workflows_throttled: AtomicU64,

    /// Start latency buckets (in microseconds)
    pub latency_under_10ms: AtomicU64,
    pub latency_under_100ms: AtomicU64,
    pub latency_under_1s: AtomicU64,
    pub latency_under_5s: AtomicU64,
    pub latency_over_5s: AtomicU64,

    /// Histogram support
    pub latency_sum_micros: AtomicU64,
    pub latency_count: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            start_workflow_requests: AtomicU64::new(0),
            health_requests: AtomicU64::new(0),
            metrics_requests: AtomicU64::new(0),
            workflows_started: AtomicU64::new(0),
            workflows_failed: AtomicU64::new(0),
            workflows_throttled: AtomicU64::new(0),
            latency_under_10ms: AtomicU64::new(0),
            latency_under_100ms: AtomicU64::new(0),
            latency_under_1s: AtomicU64::new(0),
            latency_under_5s: AtomicU64::new(0),
            latency_over_5s: AtomicU64::new(0),
            latency_sum_micros: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }

    /// Count a request on a route
    pub fn record_request(&self, route: Route) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match route {
            Route::StartWorkflow => self.start_workflow_requests.fetch_add(1, Ordering::Relaxed),
            Route::Health => self.health_requests.fetch_add(1, Ordering::Relaxed),
            Route::Metrics => self.metrics_requests.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record the outcome and latency of a `/start-workflow` call
    pub fn record_start(&self, latency_us: u64, outcome: StartOutcome) {
        match outcome {
            StartOutcome::Started => self.workflows_started.fetch_add(1, Ordering::Relaxed),
            StartOutcome::Failed => self.workflows_failed.fetch_add(1, Ordering::Relaxed),
            StartOutcome::Throttled => self.workflows_throttled.fetch_add(1, Ordering::Relaxed),
        };

        match latency_us {
            0..=9_999 => self.latency_under_10ms.fetch_add(1, Ordering::Relaxed),
            10_000..=99_999 => self.latency_under_100ms.fetch_add(1, Ordering::Relaxed),
            100_000..=999_999 => self.latency_under_1s.fetch_add(1, Ordering::Relaxed),
            1_000_000..=4_999_999 => self.latency_under_5s.fetch_add(1, Ordering::Relaxed),
            _ => self.latency_over_5s.fetch_add(1, Ordering::Relaxed),
        };

        self.latency_sum_micros
            .fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get service uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    ///
    /// Load test gauges are only emitted while a run is attached.
    pub fn export_prometheus(&self, load_test: Option<&TrackerSnapshot>) -> String {
        let mut output = String::with_capacity(2048);

        // Writing to a String cannot fail
        let _ = self.write_prometheus(&mut output, load_test);
        output
    }

    fn write_prometheus(
        &self,
        out: &mut String,
        load_test: Option<&TrackerSnapshot>,
    ) -> std::fmt::Result {
        writeln!(out, "# HELP kiosk_uptime_seconds Time since service start in seconds")?;
        writeln!(out, "# TYPE kiosk_uptime_seconds gauge")?;
        writeln!(out, "kiosk_uptime_seconds {}\n", self.uptime_seconds())?;

        writeln!(out, "# HELP kiosk_requests_total Total number of HTTP requests served")?;
        writeln!(out, "# TYPE kiosk_requests_total counter")?;
        writeln!(
            out,
            "kiosk_requests_total {}\n",
            self.total_requests.load(Ordering::Relaxed)
        )?;

        writeln!(out, "# HELP kiosk_requests_by_route Total requests by route")?;
        writeln!(out, "# TYPE kiosk_requests_by_route counter")?;
        for (route, counter) in [
            (Route::StartWorkflow, &self.start_workflow_requests),
            (Route::Health, &self.health_requests),
            (Route::Metrics, &self.metrics_requests),
        ] {
            writeln!(
                out,
                "kiosk_requests_by_route{{route=\"{}\"}} {}",
                route.as_str(),
                counter.load(Ordering::Relaxed)
            )?;
        }
        writeln!(out)?;

        writeln!(out, "# HELP kiosk_route_starts Workflows started through /start-workflow by outcome")?;
        writeln!(out, "# TYPE kiosk_route_starts counter")?;
        for (outcome, counter) in [
            ("started", &self.workflows_started),
            ("failed", &self.workflows_failed),
            ("throttled", &self.workflows_throttled),
        ] {
            writeln!(
                out,
                "kiosk_route_starts{{outcome=\"{}\"}} {}",
                outcome,
                counter.load(Ordering::Relaxed)
            )?;
        }
        writeln!(out)?;

        let under_10ms = self.latency_under_10ms.load(Ordering::Relaxed);
        let under_100ms = under_10ms + self.latency_under_100ms.load(Ordering::Relaxed);
        let under_1s = under_100ms + self.latency_under_1s.load(Ordering::Relaxed);
        let under_5s = under_1s + self.latency_under_5s.load(Ordering::Relaxed);
        let count = self.latency_count.load(Ordering::Relaxed);

        writeln!(out, "# HELP kiosk_start_duration_seconds Start call latency distribution")?;
        writeln!(out, "# TYPE kiosk_start_duration_seconds histogram")?;
        writeln!(out, "kiosk_start_duration_seconds_bucket{{le=\"0.01\"}} {under_10ms}")?;
        writeln!(out, "kiosk_start_duration_seconds_bucket{{le=\"0.1\"}} {under_100ms}")?;
        writeln!(out, "kiosk_start_duration_seconds_bucket{{le=\"1\"}} {under_1s}")?;
        writeln!(out, "kiosk_start_duration_seconds_bucket{{le=\"5\"}} {under_5s}")?;
        writeln!(out, "kiosk_start_duration_seconds_bucket{{le=\"+Inf\"}} {count}")?;
        writeln!(
            out,
            "kiosk_start_duration_seconds_sum {:.6}",
            self.latency_sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
        )?;
        writeln!(out, "kiosk_start_duration_seconds_count {count}\n")?;

        if let Some(snapshot) = load_test {
            writeln!(out, "# HELP kiosk_load_test_phase Current load test phase")?;
            writeln!(out, "# TYPE kiosk_load_test_phase gauge")?;
            writeln!(
                out,
                "kiosk_load_test_phase{{phase=\"{}\"}} 1\n",
                snapshot.phase.as_str()
            )?;

            writeln!(out, "# HELP kiosk_load_test_started Workflows dispatched by the load test")?;
            writeln!(out, "# TYPE kiosk_load_test_started counter")?;
            writeln!(out, "kiosk_load_test_started {}\n", snapshot.started)?;

            writeln!(out, "# HELP kiosk_load_test_in_flight Workflows not yet finished")?;
            writeln!(out, "# TYPE kiosk_load_test_in_flight gauge")?;
            writeln!(out, "kiosk_load_test_in_flight {}\n", snapshot.in_flight)?;

            writeln!(out, "# HELP kiosk_load_test_completed Finished workflows by outcome")?;
            writeln!(out, "# TYPE kiosk_load_test_completed counter")?;
            writeln!(
                out,
                "kiosk_load_test_completed{{outcome=\"succeeded\"}} {}",
                snapshot.succeeded
            )?;
            writeln!(
                out,
                "kiosk_load_test_completed{{outcome=\"failed\"}} {}",
                snapshot.failed
            )?;
            writeln!(
                out,
                "kiosk_load_test_completed{{outcome=\"throttled\"}} {}",
                snapshot.throttled
            )?;
        }

        Ok(())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// How a `/start-workflow` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Failed,
    Throttled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk::RunPhase;

    #[test]
    fn test_metrics_recording() {
        let metrics = Metrics::new();

        metrics.record_request(Route::StartWorkflow);
        metrics.record_start(500, StartOutcome::Started);
        metrics.record_request(Route::StartWorkflow);
        metrics.record_start(2_000_000, StartOutcome::Throttled);
        metrics.record_request(Route::Health);

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.start_workflow_requests.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.workflows_started.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.workflows_throttled.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_under_10ms.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_under_5s.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.latency_count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();

        metrics.record_request(Route::StartWorkflow);
        metrics.record_start(50_000, StartOutcome::Started);
        metrics.record_request(Route::Metrics);

        let output = metrics.export_prometheus(None);

        assert!(output.contains("kiosk_uptime_seconds"));
        assert!(output.contains("kiosk_requests_total 2"));
        assert!(output.contains("kiosk_requests_by_route{route=\"start_workflow\"} 1"));
        assert!(output.contains("kiosk_requests_by_route{route=\"metrics\"} 1"));
        assert!(output.contains("kiosk_route_starts{outcome=\"started\"} 1"));
        assert!(output.contains("kiosk_start_duration_seconds_bucket{le=\"0.01\"} 0"));
        assert!(output.contains("kiosk_start_duration_seconds_bucket{le=\"0.1\"} 1"));
        assert!(output.contains("kiosk_start_duration_seconds_count 1"));
        assert!(!output.contains("kiosk_load_test_phase"));
    }

    #[test]
    fn test_prometheus_export_with_load_test() {
        let metrics = Metrics::new();
        let snapshot = TrackerSnapshot {
            phase: RunPhase::Draining,
            started: 10,
            in_flight: 3,
            succeeded: 5,
            failed: 1,
            throttled: 1,
        };

        let output = metrics.export_prometheus(Some(&snapshot));

        assert!(output.contains("kiosk_load_test_phase{phase=\"draining\"} 1"));
        assert!(output.contains("kiosk_load_test_started 10"));
        assert!(output.contains("kiosk_load_test_in_flight 3"));
        assert!(output.contains("kiosk_load_test_completed{outcome=\"succeeded\"} 5"));
        assert!(output.contains("kiosk_load_test_completed{outcome=\"throttled\"} 1"));
    }
}
