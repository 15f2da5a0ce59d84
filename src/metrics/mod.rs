//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Histogram, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Remote generation metrics
    pub remote_calls: CounterVec,

    // Continuation protocol metrics
    pub continuation_attempts: Counter,
    pub continuations_exhausted: Counter,

    // Summarization metrics
    pub summarizations: CounterVec,

    // Selection metrics
    pub selections: CounterVec,
    pub interjections: Counter,
    pub banter_remarks: Counter,

    // Tool execution metrics
    pub tool_runs: CounterVec,

    // Context window metrics
    pub context_tokens: Histogram,
    pub window_turns: Histogram,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let remote_calls = register_counter_vec_with_registry!(
            Opts::new("remote_calls_total", "Total remote generation calls"),
            &["consumer", "outcome"],
            registry
        )?;

        let continuation_attempts = register_counter_with_registry!(
            Opts::new(
                "continuation_attempts_total",
                "Total continuation calls issued for truncated replies"
            ),
            registry
        )?;

        let continuations_exhausted = register_counter_with_registry!(
            Opts::new(
                "continuations_exhausted_total",
                "Total replies returned incomplete after the attempt budget"
            ),
            registry
        )?;

        let summarizations = register_counter_vec_with_registry!(
            Opts::new("summarizations_total", "Total summarization attempts"),
            &["outcome"],
            registry
        )?;

        let selections = register_counter_vec_with_registry!(
            Opts::new("selections_total", "Total participant selections"),
            &["path"],
            registry
        )?;

        let interjections = register_counter_with_registry!(
            Opts::new("interjections_total", "Total unsolicited persona remarks"),
            registry
        )?;

        let banter_remarks = register_counter_with_registry!(
            Opts::new("banter_remarks_total", "Total persona-to-persona reactions"),
            registry
        )?;

        let tool_runs = register_counter_vec_with_registry!(
            Opts::new("tool_runs_total", "Total local command executions"),
            &["status"],
            registry
        )?;

        let context_tokens = register_histogram_with_registry!(
            "context_tokens",
            "Tokens included per context window",
            registry
        )?;

        let window_turns = register_histogram_with_registry!(
            "window_turns",
            "Turns included per context window",
            registry
        )?;

        Ok(Self {
            registry,
            remote_calls,
            continuation_attempts,
            continuations_exhausted,
            summarizations,
            selections,
            interjections,
            banter_remarks,
            tool_runs,
            context_tokens,
            window_turns,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a remote generation call
    pub fn record_remote_call(&self, consumer: &str, success: bool) {
        let outcome = if success { "success" } else { "error" };
        self.remote_calls.with_label_values(&[consumer, outcome]).inc();
    }

    /// Record a summarization attempt outcome (stored, skipped, failed)
    pub fn record_summarization(&self, outcome: &str) {
        self.summarizations.with_label_values(&[outcome]).inc();
    }

    /// Record which path produced a selection (scored, fallback, default)
    pub fn record_selection(&self, path: &str) {
        self.selections.with_label_values(&[path]).inc();
    }

    /// Record a local command execution
    pub fn record_tool_run(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.tool_runs.with_label_values(&[status]).inc();
    }

    /// Record the size of a built context window
    pub fn record_context_window(&self, tokens: usize, turns: usize) {
        self.context_tokens.observe(tokens as f64);
        self.window_turns.observe(turns as f64);
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
