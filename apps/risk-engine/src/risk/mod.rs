//! Portfolio risk aggregation and stress testing.

mod aggregator;
mod metrics;
mod stress;

pub use aggregator::RiskAggregator;
pub use metrics::{RiskLevel, RiskMetrics, StressResult};
