//! Prometheus counters for the remittance service.

use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;

pub struct BorderHopMetrics {
    registry: Registry,

    // Transfer metrics
    pub transfers_created: IntCounterVec,
    pub status_transitions: IntCounterVec,

    // Integration metrics
    pub webhook_events: IntCounterVec,
    pub circle_api_errors: IntCounter,

    // Storage metrics
    pub storage_fallbacks: IntCounterVec,
}

impl BorderHopMetrics {
    pub fn new() -> Result<Self> {
        info!("Initializing remittance metrics");

        let registry = Registry::new();

        let transfers_created = IntCounterVec::new(
            Opts::new("transfers_created_total", "Transfers recorded, by kind"),
            &["kind"],
        )?;
        let status_transitions = IntCounterVec::new(
            Opts::new("transfer_status_transitions_total", "Status changes written, by new status"),
            &["status"],
        )?;
        let webhook_events = IntCounterVec::new(
            Opts::new("webhook_events_total", "CCTP webhook deliveries, by outcome"),
            &["outcome"],
        )?;
        let circle_api_errors =
            IntCounter::new("circle_api_errors_total", "Failed calls to the Circle API")?;
        let storage_fallbacks = IntCounterVec::new(
            Opts::new(
                "storage_fallbacks_total",
                "Operations served by the in-memory store after a primary failure",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(transfers_created.clone()))?;
        registry.register(Box::new(status_transitions.clone()))?;
        registry.register(Box::new(webhook_events.clone()))?;
        registry.register(Box::new(circle_api_errors.clone()))?;
        registry.register(Box::new(storage_fallbacks.clone()))?;

        Ok(Self {
            registry,
            transfers_created,
            status_transitions,
            webhook_events,
            circle_api_errors,
            storage_fallbacks,
        })
    }

    pub fn record_transfer_created(&self, demo: bool) {
        let kind = if demo { "demo" } else { "routed" };
        self.transfers_created.with_label_values(&[kind]).inc();
    }

    pub fn record_status(&self, status: &str) {
        self.status_transitions.with_label_values(&[status]).inc();
    }

    pub fn record_webhook(&self, outcome: &str) {
        self.webhook_events.with_label_values(&[outcome]).inc();
    }

    pub fn record_fallback(&self, operation: &str) {
        self.storage_fallbacks.with_label_values(&[operation]).inc();
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
