//! Tagging engine: orchestrates scoring, selection, and reconciliation.
//!
//! Selection itself is pure (see [`selector`](crate::tagging::selector));
//! this module adds the store reconciliation and the single-writer-per-image
//! discipline that makes concurrent tagging safe.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::catalog::ConceptCatalog;
use crate::config::TaggingConfig;
use crate::embedding::{EmbeddingProvider, ImageInput};
use crate::error::{EngineError, EngineResult};
use crate::store::TagStore;
use crate::tagging::selector::{score_catalog, select_tags};
use crate::types::{ConceptId, ImageId, TagAssignment};

/// Assigns concept tags to images and reconciles them into the tag store.
pub struct TagEngine {
    catalog: Arc<ConceptCatalog>,
    store: Arc<dyn TagStore>,
    config: TaggingConfig,
    locks: ImageLocks,
}

impl TagEngine {
    pub fn new(catalog: Arc<ConceptCatalog>, store: Arc<dyn TagStore>, config: TaggingConfig) -> Self {
        Self {
            catalog,
            store,
            config,
            locks: ImageLocks::default(),
        }
    }

    /// Compute the tag set for an embedding without touching the store.
    ///
    /// Deterministic given `(embedding, catalog snapshot, config)`.
    pub fn select(&self, embedding: &[f32]) -> Vec<TagAssignment> {
        let ranked = score_catalog(embedding, &self.catalog);
        select_tags(&ranked, &self.config)
    }

    /// Tag one image and reconcile the result into the store.
    ///
    /// Returns the selected tag set. The read-modify-write against the store
    /// is serialized per image, so concurrent calls for different images can
    /// proceed in parallel while two calls for the same image cannot
    /// interleave their diffs.
    pub async fn tag(&self, image: &ImageId, embedding: &[f32]) -> EngineResult<Vec<TagAssignment>> {
        if embedding.is_empty() {
            return Err(EngineError::MissingEmbedding {
                id: image.to_string(),
            });
        }
        // A wrong-dimension embedding would score zero concepts and wipe the
        // image's stored tags; reject it as a data error instead.
        if let Some(expected) = self.catalog.dimension() {
            if embedding.len() != expected {
                return Err(EngineError::DimensionMismatch {
                    id: image.to_string(),
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let selected = self.select(embedding);

        let lock = self.locks.for_image(image);
        let _guard = lock.lock().await;
        self.reconcile(image, &selected).await?;

        tracing::debug!("Tagged {}: {} tags", image, selected.len());
        Ok(selected)
    }

    /// Embed raw image bytes via the provider, then tag.
    ///
    /// Provider failure is fatal for this image's call and propagates; the
    /// caller decides whether to retry.
    pub async fn tag_image_bytes(
        &self,
        provider: &dyn EmbeddingProvider,
        image: &ImageId,
        bytes: &[u8],
        format: &str,
    ) -> EngineResult<Vec<TagAssignment>> {
        let input = ImageInput::from_bytes(bytes, format);
        let embedding = provider.embed_image(&input).await?;
        self.tag(image, &embedding).await
    }

    /// Diff the selected tag set against the stored one and apply the
    /// difference: upsert new or changed scores, delete stale concepts.
    ///
    /// Rerunning with unchanged inputs issues no writes at all, which keeps
    /// the stored tag set a pure function of current inputs.
    async fn reconcile(&self, image: &ImageId, selected: &[TagAssignment]) -> EngineResult<()> {
        let current = self.store.tags_for(image).await?;

        let desired: BTreeMap<&ConceptId, f32> = selected
            .iter()
            .map(|t| (&t.concept_id, t.score))
            .collect();

        for (&concept, &score) in &desired {
            if current.get(concept) != Some(&score) {
                self.store.upsert(image, concept, score).await?;
            }
        }
        for concept in current.keys() {
            if !desired.contains_key(concept) {
                self.store.delete(image, concept).await?;
            }
        }
        Ok(())
    }
}

/// Per-image async locks for the single-writer-per-image discipline.
///
/// Entries live for the engine's lifetime; the map is bounded by the number
/// of distinct images tagged through it.
#[derive(Default)]
struct ImageLocks {
    inner: Mutex<HashMap<ImageId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ImageLocks {
    fn for_image(&self, image: &ImageId) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(image.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
