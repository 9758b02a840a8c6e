//! addrsync Telemetry - metrics and logging
//!
//! Provides:
//! - `MetricsRegistry`: Prometheus metrics fed by the sync coordinator
//! - `init_logging`: tracing subscriber set up from the `logging` config

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::MetricsRegistry;
