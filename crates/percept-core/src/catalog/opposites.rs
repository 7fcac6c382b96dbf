//! Opposition graph over catalog concepts.
//!
//! Opposition is a symmetric relation ("minimal" opposes "ornate" and vice
//! versa), but it is persisted as per-concept edge lists which can drift
//! asymmetric through partial edits. The graph therefore treats an edge
//! stored in either direction as opposition, and offers audit/repair to
//! restore the symmetric closure in the store.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::Concept;
use crate::error::EngineResult;
use crate::store::ConceptStore;
use crate::types::ConceptId;

/// Symmetric view over the stored (possibly asymmetric) opposite edges.
#[derive(Debug, Clone, Default)]
pub struct OppositeGraph {
    /// Stored edges, exactly as loaded. BTreeMap keeps audit output ordered.
    edges: BTreeMap<ConceptId, BTreeSet<ConceptId>>,
}

impl OppositeGraph {
    /// Build the graph from a catalog's concepts.
    pub fn from_concepts(concepts: &[Concept]) -> Self {
        let mut edges: BTreeMap<ConceptId, BTreeSet<ConceptId>> = BTreeMap::new();
        for concept in concepts {
            if !concept.opposites.is_empty() {
                edges.insert(concept.id.clone(), concept.opposites.clone());
            }
        }
        Self { edges }
    }

    /// Whether two concepts oppose each other.
    ///
    /// True when an edge is stored in either direction, so callers see the
    /// symmetric relation even while the store is drifted.
    pub fn is_opposite(&self, a: &ConceptId, b: &ConceptId) -> bool {
        self.has_edge(a, b) || self.has_edge(b, a)
    }

    /// The first of `tags` that opposes `concept`, if any.
    ///
    /// Used to decide whether a candidate result should be penalized for a
    /// query concept: a single opposing tag on the image is enough.
    pub fn opposed_tag<'a, I>(&self, concept: &ConceptId, tags: I) -> Option<&'a ConceptId>
    where
        I: IntoIterator<Item = &'a ConceptId>,
    {
        tags.into_iter().find(|tag| self.is_opposite(concept, tag))
    }

    /// Stored edges that lack their reverse edge.
    ///
    /// Each pair is reported once as `(from, to)` where `from -> to` exists
    /// and `to -> from` does not, in deterministic order.
    pub fn audit(&self) -> Vec<(ConceptId, ConceptId)> {
        let mut missing = Vec::new();
        for (from, opposites) in &self.edges {
            for to in opposites {
                if !self.has_edge(to, from) {
                    missing.push((from.clone(), to.clone()));
                }
            }
        }
        missing
    }

    /// Write the symmetric closure back to the store.
    ///
    /// For every asymmetric edge `a -> b`, the reverse edge is added to `b`'s
    /// stored set. Returns the number of edges added. Each addition is
    /// logged; a zero return means the store was already symmetric.
    pub async fn repair(&self, store: &dyn ConceptStore) -> EngineResult<usize> {
        let missing = self.audit();
        if missing.is_empty() {
            return Ok(0);
        }

        // Group additions per target so each concept is written once.
        let mut additions: BTreeMap<ConceptId, BTreeSet<ConceptId>> = BTreeMap::new();
        for (from, to) in &missing {
            additions
                .entry(to.clone())
                .or_default()
                .insert(from.clone());
        }

        let mut added = 0usize;
        for (target, new_edges) in additions {
            let mut merged = self.edges.get(&target).cloned().unwrap_or_default();
            for edge in new_edges {
                if merged.insert(edge.clone()) {
                    tracing::info!("Repairing opposite edge: {} -> {}", target, edge);
                    added += 1;
                }
            }
            store.replace_opposites(&target, merged).await?;
        }

        tracing::info!("Opposite repair added {} reverse edges", added);
        Ok(added)
    }

    fn has_edge(&self, from: &ConceptId, to: &ConceptId) -> bool {
        self.edges.get(from).is_some_and(|set| set.contains(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryConceptStore;

    fn id(s: &str) -> ConceptId {
        ConceptId::new(s)
    }

    fn concept_with_opposites(concept: &str, opposites: &[&str]) -> Concept {
        let mut c = Concept::new(concept, concept, vec![1.0]);
        c.opposites = opposites.iter().map(|s| id(s)).collect();
        c
    }

    #[test]
    fn test_opposition_is_symmetric_even_when_stored_one_way() {
        let graph = OppositeGraph::from_concepts(&[
            concept_with_opposites("minimal", &["ornate"]),
            concept_with_opposites("ornate", &[]),
        ]);
        assert!(graph.is_opposite(&id("minimal"), &id("ornate")));
        assert!(graph.is_opposite(&id("ornate"), &id("minimal")));
        assert!(!graph.is_opposite(&id("minimal"), &id("playful")));
    }

    #[test]
    fn test_opposed_tag_finds_first_opposing() {
        let graph = OppositeGraph::from_concepts(&[
            concept_with_opposites("dark", &["light"]),
        ]);
        let tags = vec![id("playful"), id("light"), id("dense")];
        assert_eq!(graph.opposed_tag(&id("dark"), &tags), Some(&tags[1]));
        assert_eq!(graph.opposed_tag(&id("playful"), &tags), None);
    }

    #[test]
    fn test_audit_reports_each_missing_reverse_once() {
        let graph = OppositeGraph::from_concepts(&[
            concept_with_opposites("minimal", &["ornate", "dense"]),
            concept_with_opposites("dense", &["minimal"]),
        ]);
        // minimal -> ornate lacks its reverse; minimal <-> dense is fine.
        assert_eq!(graph.audit(), vec![(id("minimal"), id("ornate"))]);
    }

    #[test]
    fn test_audit_clean_on_symmetric_graph() {
        let graph = OppositeGraph::from_concepts(&[
            concept_with_opposites("minimal", &["ornate"]),
            concept_with_opposites("ornate", &["minimal"]),
        ]);
        assert!(graph.audit().is_empty());
    }

    #[tokio::test]
    async fn test_repair_writes_symmetric_closure() {
        let concepts = vec![
            concept_with_opposites("minimal", &["ornate", "busy"]),
            concept_with_opposites("ornate", &[]),
            concept_with_opposites("busy", &[]),
        ];
        let store = InMemoryConceptStore::new(concepts.clone());
        let graph = OppositeGraph::from_concepts(&concepts);

        let added = graph.repair(&store).await.unwrap();
        assert_eq!(added, 2);

        let repaired = store.load_all().await.unwrap();
        let rebuilt = OppositeGraph::from_concepts(&repaired);
        assert!(rebuilt.audit().is_empty());
        assert!(rebuilt.is_opposite(&id("ornate"), &id("minimal")));

        // Second pass is a no-op.
        assert_eq!(rebuilt.repair(&store).await.unwrap(), 0);
    }
}
