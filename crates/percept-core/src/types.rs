//! Core data types for the Percept tagging and hub-detection engine.
//!
//! Image records carry the inputs (embedding) and the derived state this
//! engine owns (tags, hub stats). Derived fields are always replaced
//! wholesale, never patched incrementally.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for an image in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Stable identifier for a concept in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(String);

impl ConceptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConceptId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An image record as stored in a corpus snapshot.
///
/// `tags` and `hub_stats` are derived fields owned by this engine; the id and
/// embedding come from external collaborators. `BTreeMap` keeps serialized
/// snapshots byte-stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,

    /// L2-normalized embedding vector, fixed dimension across the corpus.
    pub embedding: Vec<f32>,

    /// Concept id -> cosine score of the current tag set.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<ConceptId, f32>,

    /// Hub statistics from the last scan. Absent means "not a hub".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_stats: Option<HubStats>,
}

impl ImageRecord {
    /// Create a record with no derived state yet.
    pub fn new(id: impl Into<ImageId>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            tags: BTreeMap::new(),
            hub_stats: None,
        }
    }
}

/// Per-image hub statistics, recomputed wholesale on every detector run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubStats {
    /// Number of workload queries whose top-N contained this image.
    pub count: u64,

    /// `count / |workload|`, in [0, 1].
    pub score: f64,

    /// Mean cosine similarity across the appearances.
    pub avg_similarity: f32,

    /// Mean margin above the per-query top-N average similarity.
    pub avg_margin: f32,
}

/// One selected tag: a concept id paired with its cosine score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub concept_id: ConceptId,
    pub score: f32,
}

impl TagAssignment {
    pub fn new(concept_id: impl Into<ConceptId>, score: f32) -> Self {
        Self {
            concept_id: concept_id.into(),
            score,
        }
    }
}

/// A historical search interaction: a query that led to this image.
///
/// Input to the derived hub workload (extension mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub image_id: ImageId,
    pub query: String,
}

/// A recorded query expansion: alternative phrasings tried for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExpansion {
    pub query: String,
    pub expansions: Vec<String>,
}
