//! Prometheus metrics registry.

use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge, histogram::Histogram},
    registry::Registry,
};

/// Duration histogram buckets (in seconds).
/// Covers 1ms to 30s, the default validation timeout.
const DURATION_BUCKETS: [f64; 13] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// HTTP request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub method: String,
    pub path: String,
    pub status: u16,
}

/// Validation outcome labels (`ok` or an error code).
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

/// Problem labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SeverityLabels {
    pub severity: String,
}

/// Metrics registry holding all apilint metrics.
///
/// Counters are registered without the `_total` suffix; the encoder adds it.
pub struct MetricsRegistry {
    /// The prometheus-client registry for encoding.
    pub registry: Registry,

    // Request metrics
    pub requests_total: Family<RequestLabels, Counter>,
    pub request_duration_seconds: Family<RequestLabels, Histogram>,

    // Validation metrics
    pub validations_total: Family<OutcomeLabels, Counter>,
    pub validation_duration_seconds: Family<OutcomeLabels, Histogram>,
    pub validations_in_flight: Gauge,
    pub problems_total: Family<SeverityLabels, Counter>,

    // Ruleset metrics
    pub ruleset_fetches_total: Family<OutcomeLabels, Counter>,
    pub ruleset_fetch_duration_seconds: Family<OutcomeLabels, Histogram>,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "apilint_requests",
            "Total number of HTTP requests processed",
            requests_total.clone(),
        );

        let request_duration_seconds =
            Family::<RequestLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DURATION_BUCKETS.iter().cloned())
            });
        registry.register(
            "apilint_request_duration_seconds",
            "HTTP request duration in seconds",
            request_duration_seconds.clone(),
        );

        let validations_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "apilint_validations",
            "Total number of validations by outcome",
            validations_total.clone(),
        );

        let validation_duration_seconds =
            Family::<OutcomeLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DURATION_BUCKETS.iter().cloned())
            });
        registry.register(
            "apilint_validation_duration_seconds",
            "Validation pipeline duration in seconds",
            validation_duration_seconds.clone(),
        );

        let validations_in_flight = Gauge::default();
        registry.register(
            "apilint_validations_in_flight",
            "Number of validations currently running",
            validations_in_flight.clone(),
        );

        let problems_total = Family::<SeverityLabels, Counter>::default();
        registry.register(
            "apilint_problems",
            "Total number of problems reported by severity",
            problems_total.clone(),
        );

        let ruleset_fetches_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "apilint_ruleset_fetches",
            "Total number of remote ruleset fetches by outcome",
            ruleset_fetches_total.clone(),
        );

        let ruleset_fetch_duration_seconds =
            Family::<OutcomeLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(DURATION_BUCKETS.iter().cloned())
            });
        registry.register(
            "apilint_ruleset_fetch_duration_seconds",
            "Remote ruleset fetch duration in seconds",
            ruleset_fetch_duration_seconds.clone(),
        );

        Self {
            registry,
            requests_total,
            request_duration_seconds,
            validations_total,
            validation_duration_seconds,
            validations_in_flight,
            problems_total,
            ruleset_fetches_total,
            ruleset_fetch_duration_seconds,
        }
    }

    /// Record a completed HTTP request.
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let labels = RequestLabels {
            method: method.to_string(),
            path: path.to_string(),
            status,
        };

        self.requests_total.get_or_create(&labels).inc();
        self.request_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record a finished validation.
    pub fn record_validation(&self, outcome: &str, duration_secs: f64) {
        let labels = OutcomeLabels {
            outcome: outcome.to_string(),
        };
        self.validations_total.get_or_create(&labels).inc();
        self.validation_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record problems of one severity.
    pub fn record_problems(&self, severity: &str, count: u64) {
        let labels = SeverityLabels {
            severity: severity.to_string(),
        };
        self.problems_total.get_or_create(&labels).inc_by(count);
    }

    /// Record a remote ruleset fetch.
    pub fn record_ruleset_fetch(&self, outcome: &str, duration_secs: f64) {
        let labels = OutcomeLabels {
            outcome: outcome.to_string(),
        };
        self.ruleset_fetches_total.get_or_create(&labels).inc();
        self.ruleset_fetch_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// A validation started.
    pub fn validation_started(&self) {
        self.validations_in_flight.inc();
    }

    /// A validation finished, whatever its outcome.
    pub fn validation_finished(&self) {
        self.validations_in_flight.dec();
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(value: &str) -> OutcomeLabels {
        OutcomeLabels {
            outcome: value.to_string(),
        }
    }

    #[test]
    fn test_record_request() {
        let registry = MetricsRegistry::new();
        registry.record_request("POST", "/validate", 200, 0.05);

        let labels = RequestLabels {
            method: "POST".to_string(),
            path: "/validate".to_string(),
            status: 200,
        };
        assert_eq!(registry.requests_total.get_or_create(&labels).get(), 1);
    }

    #[test]
    fn test_record_validation_outcomes() {
        let registry = MetricsRegistry::new();
        registry.record_validation("ok", 0.1);
        registry.record_validation("ok", 0.2);
        registry.record_validation("RULESET_NOT_FOUND", 0.01);

        assert_eq!(registry.validations_total.get_or_create(&outcome("ok")).get(), 2);
        assert_eq!(
            registry
                .validations_total
                .get_or_create(&outcome("RULESET_NOT_FOUND"))
                .get(),
            1
        );
    }

    #[test]
    fn test_record_problems() {
        let registry = MetricsRegistry::new();
        registry.record_problems("high", 3);
        registry.record_problems("high", 2);

        let labels = SeverityLabels {
            severity: "high".to_string(),
        };
        assert_eq!(registry.problems_total.get_or_create(&labels).get(), 5);
    }

    #[test]
    fn test_in_flight_tracking() {
        let registry = MetricsRegistry::new();
        registry.validation_started();
        registry.validation_started();
        assert_eq!(registry.validations_in_flight.get(), 2);

        registry.validation_finished();
        assert_eq!(registry.validations_in_flight.get(), 1);
    }

    #[test]
    fn test_record_ruleset_fetch() {
        let registry = MetricsRegistry::new();
        registry.record_ruleset_fetch("not_found", 0.02);
        assert_eq!(
            registry
                .ruleset_fetches_total
                .get_or_create(&outcome("not_found"))
                .get(),
            1
        );
    }
}
