//! Concept tagging: threshold/back-off selection over catalog scores.

pub mod engine;
pub mod selector;

pub use engine::TagEngine;
pub use selector::{score_catalog, select_tags, RankedConcept};
