//! Prometheus metrics for the board API.
//!
//! Every guard decision is counted by capability and outcome and exposed in
//! text format at `/metrics`.

use domains::{Capability, Decision};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use services::AccessObserver;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DecisionLabels {
    pub capability: String,
    pub outcome: String,
}

pub struct AuthzMetrics {
    registry: Registry,
    decisions: Family<DecisionLabels, Counter>,
}

impl Default for AuthzMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthzMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let decisions = Family::<DecisionLabels, Counter>::default();
        // The text encoder appends `_total` to counters.
        registry.register(
            "taskboard_authz_decisions",
            "Authorization decisions by capability and outcome",
            decisions.clone(),
        );
        Self { registry, decisions }
    }

    /// Reading never creates a series.
    pub fn decisions(&self, capability: Capability, decision: Decision) -> u64 {
        self.decisions
            .get(&labels(capability, decision))
            .map_or(0, |counter| counter.get())
    }

    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl AccessObserver for AuthzMetrics {
    fn record(&self, capability: Capability, decision: Decision) {
        self.decisions.get_or_create(&labels(capability, decision)).inc();
    }
}

fn labels(capability: Capability, decision: Decision) -> DecisionLabels {
    DecisionLabels {
        capability: capability.as_str().to_string(),
        outcome: decision.as_str().to_string(),
    }
}
