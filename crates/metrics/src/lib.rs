//! Metrics facade for stubwire.
//!
//! Library crates record through the `metrics` crate macros re-exported here,
//! keyed by the names in [`definitions`]. Nothing is exported until the host
//! process calls [`init_metrics`]; with the `prometheus` feature that installs
//! a Prometheus recorder whose [`MetricsHandle`] renders the scrape output.
//!
//! ```rust,ignore
//! use stubwire_metrics::{counter, messages};
//!
//! counter!(messages::RECEIVED_TOTAL, "matched" => "true").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge};
