//! Prometheus counters for story activity, rendered at `/metrics`.

use std::fmt;

use domains::{Ledger, Toggle};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RuleLabels {
    rule: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct LedgerLabels {
    ledger: String,
    direction: String,
}

pub struct Metrics {
    registry: Registry,
    lines_appended: Counter,
    rejections: Family<RuleLabels, Counter>,
    ledger_changes: Family<LedgerLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let lines_appended = Counter::default();
        let rejections = Family::<RuleLabels, Counter>::default();
        let ledger_changes = Family::<LedgerLabels, Counter>::default();

        registry.register(
            "storyweave_story_lines_appended",
            "Story lines accepted by the contribution rules",
            lines_appended.clone(),
        );
        registry.register(
            "storyweave_contribution_rejections",
            "Story lines refused, by rule",
            rejections.clone(),
        );
        registry.register(
            "storyweave_ledger_changes",
            "Vote and blacklist membership changes",
            ledger_changes.clone(),
        );

        Self {
            registry,
            lines_appended,
            rejections,
            ledger_changes,
        }
    }

    pub fn line_appended(&self) {
        self.lines_appended.inc();
    }

    pub fn contribution_rejected(&self, rule: &str) {
        self.rejections
            .get_or_create(&RuleLabels { rule: rule.to_string() })
            .inc();
    }

    pub fn ledger_changed(&self, ledger: Ledger, toggle: Toggle) {
        let labels = LedgerLabels {
            ledger: match ledger {
                Ledger::Votes => "votes",
                Ledger::Blacklist => "blacklist",
            }
            .to_string(),
            direction: match toggle {
                Toggle::Add => "add",
                Toggle::Remove => "remove",
            }
            .to_string(),
        };
        self.ledger_changes.get_or_create(&labels).inc();
    }

    /// OpenMetrics text exposition.
    pub fn render(&self) -> Result<String, fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}
