//! Hub detection: workload construction and the corpus scan.

pub mod detector;
pub mod workload;

pub use detector::{expected_score, hub_score, hub_threshold, HubDetector, HubOutcome, HubReport};
pub use workload::QueryWorkload;
