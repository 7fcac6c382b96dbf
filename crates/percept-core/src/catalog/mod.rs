//! Concept catalog: the read-only snapshot every image is scored against.
//!
//! The catalog is rebuilt from the authoritative concept store and never
//! written independently. All derived structure (id index, opposite graph)
//! is computed here from the loaded concepts.

pub mod opposites;

pub use opposites::OppositeGraph;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::store::ConceptStore;
use crate::types::ConceptId;

/// A named, embeddable semantic tag with relations to other concepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,

    /// Human-readable label, also used as a workload query.
    pub label: String,

    /// L2-normalized embedding of the label.
    pub embedding: Vec<f32>,

    /// Alternative phrasings for this concept.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub synonyms: BTreeSet<String>,

    /// Adjacent but distinct concepts (by label).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub related: BTreeSet<String>,

    /// Concepts this one contradicts. Intended to be symmetric, but the
    /// stored relation may drift; read through [`OppositeGraph`].
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub opposites: BTreeSet<ConceptId>,
}

impl Concept {
    /// Create a bare concept with no relations.
    pub fn new(id: impl Into<ConceptId>, label: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            embedding,
            synonyms: BTreeSet::new(),
            related: BTreeSet::new(),
            opposites: BTreeSet::new(),
        }
    }
}

/// An immutable, indexed snapshot of the concept catalog.
pub struct ConceptCatalog {
    concepts: Vec<Concept>,
    by_id: HashMap<ConceptId, usize>,
}

impl ConceptCatalog {
    /// Build a catalog from loaded concepts.
    ///
    /// Duplicate ids keep the first occurrence; later duplicates are dropped
    /// with a warning. Embedding dimensions are not enforced here; concepts
    /// whose dimension does not match an image are skipped during scoring.
    pub fn new(concepts: Vec<Concept>) -> Self {
        let mut kept: Vec<Concept> = Vec::with_capacity(concepts.len());
        let mut by_id: HashMap<ConceptId, usize> = HashMap::with_capacity(concepts.len());

        for concept in concepts {
            if by_id.contains_key(&concept.id) {
                tracing::warn!("Duplicate concept id {} in catalog, dropping", concept.id);
                continue;
            }
            by_id.insert(concept.id.clone(), kept.len());
            kept.push(concept);
        }

        if let Some(dim) = kept.iter().map(|c| c.embedding.len()).find(|&d| d > 0) {
            let mismatched = kept
                .iter()
                .filter(|c| !c.embedding.is_empty() && c.embedding.len() != dim)
                .count();
            if mismatched > 0 {
                tracing::warn!(
                    "Catalog has {} concepts with embedding dimension != {}; \
                     they will not participate in scoring",
                    mismatched,
                    dim
                );
            }
        }

        Self { concepts: kept, by_id }
    }

    /// Rebuild the catalog snapshot from the authoritative store.
    pub async fn load(store: &dyn ConceptStore) -> EngineResult<Self> {
        let concepts = store.load_all().await?;
        let catalog = Self::new(concepts);
        tracing::info!("Loaded concept catalog: {} concepts", catalog.len());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// All concepts in catalog load order.
    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    /// Look up a concept by id.
    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.by_id.get(id).map(|&i| &self.concepts[i])
    }

    /// Resolve a concept's label by id.
    pub fn label_of(&self, id: &ConceptId) -> Option<&str> {
        self.get(id).map(|c| c.label.as_str())
    }

    /// The catalog's embedding dimension: that of the first concept with a
    /// non-empty embedding. `None` for an empty catalog.
    pub fn dimension(&self) -> Option<usize> {
        self.concepts
            .iter()
            .map(|c| c.embedding.len())
            .find(|&d| d > 0)
    }

    /// Build the opposite graph for this snapshot.
    pub fn opposite_graph(&self) -> OppositeGraph {
        OppositeGraph::from_concepts(&self.concepts)
    }

    /// BLAKE3 hash of ids, labels, and embeddings, in catalog order.
    ///
    /// Two catalogs with the same hash produce bit-identical tag sets for the
    /// same image embedding and config.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for concept in &self.concepts {
            hasher.update(concept.id.as_str().as_bytes());
            hasher.update(b"\x1f");
            hasher.update(concept.label.as_bytes());
            hasher.update(b"\x1f");
            for value in &concept.embedding {
                hasher.update(&value.to_le_bytes());
            }
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::l2_normalize;

    fn concept(id: &str, embedding: &[f32]) -> Concept {
        Concept::new(id, id, l2_normalize(embedding))
    }

    #[test]
    fn test_catalog_indexes_by_id() {
        let catalog = ConceptCatalog::new(vec![
            concept("minimal", &[1.0, 0.0]),
            concept("playful", &[0.0, 1.0]),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get(&ConceptId::new("playful")).unwrap().label,
            "playful"
        );
        assert!(catalog.get(&ConceptId::new("missing")).is_none());
    }

    #[test]
    fn test_catalog_drops_duplicate_ids() {
        let catalog = ConceptCatalog::new(vec![
            concept("minimal", &[1.0, 0.0]),
            concept("minimal", &[0.0, 1.0]),
        ]);
        assert_eq!(catalog.len(), 1);
        // First occurrence wins
        let kept = catalog.get(&ConceptId::new("minimal")).unwrap();
        assert!((kept.embedding[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_content_hash_changes_with_embedding() {
        let a = ConceptCatalog::new(vec![concept("minimal", &[1.0, 0.0])]);
        let b = ConceptCatalog::new(vec![concept("minimal", &[0.0, 1.0])]);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_stable() {
        let make = || ConceptCatalog::new(vec![
            concept("minimal", &[1.0, 0.0]),
            concept("playful", &[0.0, 1.0]),
        ]);
        assert_eq!(make().content_hash(), make().content_hash());
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = ConceptCatalog::new(vec![]);
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
    }

    #[test]
    fn test_concept_serde_skips_empty_relations() {
        let c = concept("minimal", &[1.0, 0.0]);
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("synonyms"));
        assert!(!json.contains("opposites"));

        let parsed: Concept = serde_json::from_str(&json).unwrap();
        assert!(parsed.opposites.is_empty());
    }
}
