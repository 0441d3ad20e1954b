use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order placement outcomes (placed, payment failed, rejected)
// - Order reads through the aggregation path
// - Remote calls per dependency (outcome, latency)
// - Circuit breaker state and transitions
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Orchestration Metrics
    pub orders_placed: IntCounterVec,
    pub order_reads: IntCounterVec,

    // Remote Call Metrics
    pub remote_calls: IntCounterVec,
    pub remote_call_duration: HistogramVec,

    // Circuit Breaker Metrics
    pub circuit_breaker_state: IntGaugeVec,
    pub circuit_breaker_transitions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounterVec::new(
            Opts::new("orders_placed_total", "Order placement attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(orders_placed.clone()))?;

        let order_reads = IntCounterVec::new(
            Opts::new("order_reads_total", "Aggregated order reads by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(order_reads.clone()))?;

        let remote_calls = IntCounterVec::new(
            Opts::new("remote_calls_total", "Calls to remote dependencies"),
            &["dependency", "operation", "outcome"],
        )?;
        registry.register(Box::new(remote_calls.clone()))?;

        let remote_call_duration = HistogramVec::new(
            HistogramOpts::new("remote_call_duration_seconds", "Remote call duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["dependency", "operation"],
        )?;
        registry.register(Box::new(remote_call_duration.clone()))?;

        let circuit_breaker_state = IntGaugeVec::new(
            Opts::new(
                "circuit_breaker_state",
                "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
            ),
            &["breaker"],
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let circuit_breaker_transitions = IntCounterVec::new(
            Opts::new("circuit_breaker_transitions_total", "Circuit breaker state transitions"),
            &["breaker", "from_state", "to_state"],
        )?;
        registry.register(Box::new(circuit_breaker_transitions.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            order_reads,
            remote_calls,
            remote_call_duration,
            circuit_breaker_state,
            circuit_breaker_transitions,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_placed(&self, outcome: &str) {
        self.orders_placed.with_label_values(&[outcome]).inc();
    }

    pub fn record_order_read(&self, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.order_reads.with_label_values(&[outcome]).inc();
    }

    /// Helper to record a remote call and its latency
    pub fn record_remote_call(
        &self,
        dependency: &str,
        operation: &str,
        outcome: &str,
        duration_secs: f64,
    ) {
        self.remote_calls
            .with_label_values(&[dependency, operation, outcome])
            .inc();
        self.remote_call_duration
            .with_label_values(&[dependency, operation])
            .observe(duration_secs);
    }

    /// Helper to update circuit breaker state
    pub fn update_circuit_breaker_state(&self, breaker: &str, state: i64) {
        self.circuit_breaker_state.with_label_values(&[breaker]).set(state);
    }

    /// Helper to record circuit breaker transition
    pub fn record_circuit_breaker_transition(&self, breaker: &str, from_state: &str, to_state: &str) {
        self.circuit_breaker_transitions
            .with_label_values(&[breaker, from_state, to_state])
            .inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode(&self) -> anyhow::Result<String> {
        use prometheus::{Encoder, TextEncoder};

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_placed("placed");
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_remote_call() {
        let metrics = Metrics::new().unwrap();
        metrics.record_remote_call("product-service", "reduce_quantity", "success", 0.02);
        metrics.record_remote_call("product-service", "reduce_quantity", "success", 0.03);
        metrics.record_remote_call("product-service", "reduce_quantity", "unavailable", 2.0);

        let ok = metrics
            .remote_calls
            .with_label_values(&["product-service", "reduce_quantity", "success"])
            .get();
        assert_eq!(ok, 2);
    }

    #[test]
    fn test_circuit_breaker_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.update_circuit_breaker_state("payment-service", 0);
        metrics.record_circuit_breaker_transition("payment-service", "Closed", "Open");
        metrics.update_circuit_breaker_state("payment-service", 1);

        assert_eq!(
            metrics
                .circuit_breaker_state
                .with_label_values(&["payment-service"])
                .get(),
            1
        );
    }

    #[test]
    fn test_encode_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_placed("payment_failed");
        metrics.record_order_read(true);

        let text = metrics.encode().unwrap();
        assert!(text.contains("orders_placed_total{outcome=\"payment_failed\"} 1"));
        assert!(text.contains("order_reads_total{outcome=\"ok\"} 1"));
    }
}
