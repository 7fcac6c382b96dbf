//! In-memory store implementations.
//!
//! Backed by `tokio::sync::RwLock` so trait methods stay cancel-safe without
//! holding a lock across a caller's await point.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::Concept;
use crate::error::EngineResult;
use crate::store::{ConceptStore, HubStatsStore, TagStore};
use crate::types::{ConceptId, HubStats, ImageId};

/// Concept storage held in memory, keyed by id.
pub struct InMemoryConceptStore {
    concepts: RwLock<BTreeMap<ConceptId, Concept>>,
}

impl InMemoryConceptStore {
    pub fn new(concepts: Vec<Concept>) -> Self {
        let map = concepts.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            concepts: RwLock::new(map),
        }
    }
}

#[async_trait]
impl ConceptStore for InMemoryConceptStore {
    async fn load_all(&self) -> EngineResult<Vec<Concept>> {
        Ok(self.concepts.read().await.values().cloned().collect())
    }

    async fn replace_opposites(
        &self,
        id: &ConceptId,
        opposites: BTreeSet<ConceptId>,
    ) -> EngineResult<()> {
        let mut concepts = self.concepts.write().await;
        if let Some(concept) = concepts.get_mut(id) {
            concept.opposites = opposites;
        }
        Ok(())
    }
}

/// Tag storage held in memory, with write counters for observing
/// reconciliation behavior.
#[derive(Default)]
pub struct InMemoryTagStore {
    tags: RwLock<HashMap<ImageId, BTreeMap<ConceptId, f32>>>,
    upserts: AtomicU64,
    deletes: AtomicU64,
}

impl InMemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing per-image tags.
    pub fn with_tags(tags: HashMap<ImageId, BTreeMap<ConceptId, f32>>) -> Self {
        Self {
            tags: RwLock::new(tags),
            ..Self::default()
        }
    }

    /// Total upsert calls since construction.
    pub fn upsert_count(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Total delete calls since construction.
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Snapshot of all stored tags.
    pub async fn snapshot(&self) -> HashMap<ImageId, BTreeMap<ConceptId, f32>> {
        self.tags.read().await.clone()
    }
}

#[async_trait]
impl TagStore for InMemoryTagStore {
    async fn tags_for(&self, image: &ImageId) -> EngineResult<BTreeMap<ConceptId, f32>> {
        Ok(self
            .tags
            .read()
            .await
            .get(image)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert(&self, image: &ImageId, concept: &ConceptId, score: f32) -> EngineResult<()> {
        self.upserts.fetch_add(1, Ordering::Relaxed);
        self.tags
            .write()
            .await
            .entry(image.clone())
            .or_default()
            .insert(concept.clone(), score);
        Ok(())
    }

    async fn delete(&self, image: &ImageId, concept: &ConceptId) -> EngineResult<()> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        let mut tags = self.tags.write().await;
        if let Some(map) = tags.get_mut(image) {
            map.remove(concept);
            if map.is_empty() {
                tags.remove(image);
            }
        }
        Ok(())
    }
}

/// Hub statistics held in memory.
#[derive(Default)]
pub struct InMemoryHubStatsStore {
    stats: RwLock<HashMap<ImageId, HubStats>>,
}

impl InMemoryHubStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, image: &ImageId) -> Option<HubStats> {
        self.stats.read().await.get(image).cloned()
    }

    /// Snapshot of all flagged images.
    pub async fn snapshot(&self) -> HashMap<ImageId, HubStats> {
        self.stats.read().await.clone()
    }
}

#[async_trait]
impl HubStatsStore for InMemoryHubStatsStore {
    async fn replace(&self, image: &ImageId, stats: HubStats) -> EngineResult<()> {
        self.stats.write().await.insert(image.clone(), stats);
        Ok(())
    }

    async fn clear(&self, image: &ImageId) -> EngineResult<()> {
        self.stats.write().await.remove(image);
        Ok(())
    }
}
