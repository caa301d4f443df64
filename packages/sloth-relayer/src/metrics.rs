//! Prometheus metrics (lock-free atomics, zero allocation on hot path).

use sloth_types::RelayKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::RelayError;

pub static METRICS: Metrics = Metrics::new();

/// Per-kind traffic counters.
pub struct KindCounters {
    pub total: AtomicU64,
    pub success: AtomicU64,
    pub error: AtomicU64,
}

impl KindCounters {
    const fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            success: AtomicU64::new(0),
            error: AtomicU64::new(0),
        }
    }
}

pub struct Metrics {
    // --- Traffic ---
    pub create_token: KindCounters,
    pub buy: KindCounters,
    pub sell: KindCounters,
    pub rejected_shape: AtomicU64,

    // --- Failure taxonomy ---
    pub verification_failures: AtomicU64,
    pub transport_errors: AtomicU64,
    pub reverts: AtomicU64,
    pub missing_events: AtomicU64,
    pub decode_errors: AtomicU64,
    pub notify_errors: AtomicU64,

    // --- Latency (μs, updated via CAS) ---
    pub relay_duration_us_sum: AtomicU64,
    pub relay_duration_us_max: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            create_token: KindCounters::new(),
            buy: KindCounters::new(),
            sell: KindCounters::new(),
            rejected_shape: AtomicU64::new(0),
            verification_failures: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            reverts: AtomicU64::new(0),
            missing_events: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            notify_errors: AtomicU64::new(0),
            relay_duration_us_sum: AtomicU64::new(0),
            relay_duration_us_max: AtomicU64::new(0),
        }
    }

    pub fn kind(&self, kind: RelayKind) -> &KindCounters {
        match kind {
            RelayKind::CreateToken => &self.create_token,
            RelayKind::Buy => &self.buy,
            RelayKind::Sell => &self.sell,
        }
    }

    pub fn record_error(&self, err: &RelayError) {
        let counter = match err {
            RelayError::RequestShape(_) => &self.rejected_shape,
            RelayError::Verification(_) => &self.verification_failures,
            RelayError::Transport { .. } => &self.transport_errors,
            RelayError::ChainRevert { .. } => &self.reverts,
            RelayError::EventNotFound { .. } => &self.missing_events,
            RelayError::Decode { .. } => &self.decode_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relay_duration(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.relay_duration_us_sum.fetch_add(us, Ordering::Relaxed);
        // CAS loop for max tracking
        let mut cur = self.relay_duration_us_max.load(Ordering::Relaxed);
        while us > cur {
            match self.relay_duration_us_max.compare_exchange_weak(
                cur,
                us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(2048);

        out.push_str("# HELP relayer_relay_total Relay requests received, by kind.\n");
        out.push_str("# TYPE relayer_relay_total counter\n");
        for kind in RelayKind::ALL {
            let c = self.kind(kind);
            out.push_str(&format!(
                "relayer_relay_total{{kind=\"{kind}\"}} {}\n",
                c.total.load(Ordering::Relaxed)
            ));
        }
        out.push_str("# HELP relayer_relay_success_total Relays answered with success.\n");
        out.push_str("# TYPE relayer_relay_success_total counter\n");
        for kind in RelayKind::ALL {
            let c = self.kind(kind);
            out.push_str(&format!(
                "relayer_relay_success_total{{kind=\"{kind}\"}} {}\n",
                c.success.load(Ordering::Relaxed)
            ));
        }
        out.push_str("# HELP relayer_relay_error_total Relays answered with an error.\n");
        out.push_str("# TYPE relayer_relay_error_total counter\n");
        for kind in RelayKind::ALL {
            let c = self.kind(kind);
            out.push_str(&format!(
                "relayer_relay_error_total{{kind=\"{kind}\"}} {}\n",
                c.error.load(Ordering::Relaxed)
            ));
        }

        let counters = [
            (
                "relayer_rejected_requests_total",
                "Bodies rejected before any chain call.",
                &self.rejected_shape,
            ),
            (
                "relayer_verification_failures_total",
                "Signatures the contract reported invalid.",
                &self.verification_failures,
            ),
            (
                "relayer_transport_errors_total",
                "Node faults during verify, submit or inclusion.",
                &self.transport_errors,
            ),
            ("relayer_reverts_total", "Included transactions that reverted.", &self.reverts),
            (
                "relayer_missing_events_total",
                "Successful transactions without their mandatory event.",
                &self.missing_events,
            ),
            (
                "relayer_decode_errors_total",
                "Matching logs that failed to decode.",
                &self.decode_errors,
            ),
            (
                "relayer_notify_errors_total",
                "Failed indexer notifications.",
                &self.notify_errors,
            ),
        ];
        for (name, help, counter) in counters {
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n",
                counter.load(Ordering::Relaxed)
            ));
        }

        // Convert μs to seconds for Prometheus conventions
        let dur_sum_s = self.relay_duration_us_sum.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let dur_max_s = self.relay_duration_us_max.swap(0, Ordering::Relaxed) as f64 / 1_000_000.0;
        out.push_str(&format!(
            "\
# HELP relayer_relay_duration_seconds_sum Total handler time (seconds).\n\
# TYPE relayer_relay_duration_seconds_sum counter\n\
relayer_relay_duration_seconds_sum {dur_sum_s:.6}\n\
# HELP relayer_relay_duration_seconds_max Max handler time since last scrape (seconds).\n\
# TYPE relayer_relay_duration_seconds_max gauge\n\
relayer_relay_duration_seconds_max {dur_max_s:.6}\n"
        ));
        out
    }
}
