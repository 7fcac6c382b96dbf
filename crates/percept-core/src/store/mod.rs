//! Persistence seams for concepts, tags, and hub statistics.
//!
//! The engines only talk to these traits. The in-memory implementations in
//! [`memory`] back the CLI (which loads snapshots into memory, runs, and
//! writes snapshots back) and the tests; a database-backed deployment
//! implements the same traits.

pub mod memory;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::catalog::Concept;
use crate::error::EngineResult;
use crate::types::{ConceptId, HubStats, ImageId};

/// Authoritative storage for the concept catalog.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    /// Load every concept, in stable order.
    async fn load_all(&self) -> EngineResult<Vec<Concept>>;

    /// Replace a concept's stored opposite set.
    async fn replace_opposites(
        &self,
        id: &ConceptId,
        opposites: BTreeSet<ConceptId>,
    ) -> EngineResult<()>;
}

/// Per-image concept tag storage.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Currently stored tags for an image. Unknown images yield an empty map.
    async fn tags_for(&self, image: &ImageId) -> EngineResult<BTreeMap<ConceptId, f32>>;

    /// Insert or update one tag score.
    async fn upsert(&self, image: &ImageId, concept: &ConceptId, score: f32) -> EngineResult<()>;

    /// Remove one tag. Removing an absent tag is not an error.
    async fn delete(&self, image: &ImageId, concept: &ConceptId) -> EngineResult<()>;
}

/// Per-image hub statistics storage.
#[async_trait]
pub trait HubStatsStore: Send + Sync {
    /// Replace an image's hub stats with a fresh measurement.
    async fn replace(&self, image: &ImageId, stats: HubStats) -> EngineResult<()>;

    /// Clear an image's hub stats. Clearing an absent entry is not an error.
    async fn clear(&self, image: &ImageId) -> EngineResult<()>;
}
