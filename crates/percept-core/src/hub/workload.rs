//! Query workloads for hub detection.
//!
//! A workload is an ordered, deduplicated set of canonical query strings.
//! Baseline mode probes the corpus with every concept label plus a fixed
//! list of synthetic style phrases; derived mode replays historical search
//! behavior (interactions, recorded expansions, and each image's own tag
//! labels) so the scan weights the queries users actually make.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::catalog::ConceptCatalog;
use crate::config::HubConfig;
use crate::types::{ImageRecord, InteractionRecord, QueryExpansion};

/// Synthetic style probes included in every baseline workload.
///
/// These cover query shapes concept labels alone miss: composed phrases,
/// medium terms, and layout vocabulary.
const STYLE_PROBES: &[&str] = &[
    "minimalist landing page",
    "dark mode dashboard",
    "colorful illustration style",
    "brutalist web design",
    "elegant serif typography",
    "playful onboarding flow",
    "clean product photography",
    "hand drawn doodle style",
    "retro pixel art",
    "glassmorphism interface",
    "bold geometric shapes",
    "muted pastel palette",
    "high contrast black and white",
    "isometric 3d illustration",
    "gradient mesh background",
    "editorial magazine layout",
    "mobile app empty state",
    "data visualization chart",
    "neon cyberpunk aesthetic",
    "soft natural lighting",
    "flat design icons",
    "vintage print texture",
    "monochrome line art",
    "organic flowing curves",
];

/// An ordered, deduplicated set of canonical queries.
#[derive(Debug, Clone)]
pub struct QueryWorkload {
    queries: Vec<String>,
}

impl QueryWorkload {
    /// Baseline workload: every concept label plus the synthetic style probes.
    pub fn baseline(catalog: &ConceptCatalog) -> Self {
        let mut workload = Self { queries: Vec::new() };
        let mut seen = HashSet::new();

        for concept in catalog.concepts() {
            workload.push_canonical(&mut seen, &concept.label);
        }
        for probe in STYLE_PROBES {
            workload.push_canonical(&mut seen, probe);
        }

        tracing::debug!("Baseline workload: {} queries", workload.len());
        workload
    }

    /// Derived workload from historical search behavior.
    ///
    /// Takes each interaction query plus up to `max_expansions_per_query` of
    /// its recorded expansions, then every corpus image's own tag labels.
    /// The per-query expansion cap bounds the cross-product; the total is
    /// capped at `max_derived_queries` by a deterministic down-sample.
    pub fn derived(
        catalog: &ConceptCatalog,
        corpus: &[ImageRecord],
        interactions: &[InteractionRecord],
        expansions: &[QueryExpansion],
        config: &HubConfig,
    ) -> Self {
        let mut workload = Self { queries: Vec::new() };
        let mut seen = HashSet::new();

        let expansions_by_query: HashMap<&str, &QueryExpansion> = expansions
            .iter()
            .map(|e| (e.query.as_str(), e))
            .collect();

        for interaction in interactions {
            workload.push_canonical(&mut seen, &interaction.query);
            if let Some(expansion) = expansions_by_query.get(interaction.query.as_str()) {
                for alt in expansion
                    .expansions
                    .iter()
                    .take(config.max_expansions_per_query)
                {
                    workload.push_canonical(&mut seen, alt);
                }
            }
        }

        for record in corpus {
            for concept_id in record.tags.keys() {
                if let Some(label) = catalog.label_of(concept_id) {
                    workload.push_canonical(&mut seen, label);
                }
            }
        }

        let before = workload.len();
        workload.down_sample(config.max_derived_queries);
        tracing::debug!(
            "Derived workload: {} queries ({} before cap)",
            workload.len(),
            before
        );
        workload
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// BLAKE3 hash of the query list, for logging and seeding.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for query in &self.queries {
            hasher.update(query.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Canonicalize and append one query unless already present.
    ///
    /// Canonical form: trimmed, lowercased, inner whitespace collapsed.
    /// Empty queries are dropped.
    fn push_canonical(&mut self, seen: &mut HashSet<String>, raw: &str) {
        let canonical = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if canonical.is_empty() {
            return;
        }
        if seen.insert(canonical.clone()) {
            self.queries.push(canonical);
        }
    }

    /// Cap the workload at `max` queries with a deterministic down-sample.
    ///
    /// Deterministic shuffle using the workload content hash as seed, so the
    /// same inputs always keep the same subset; relative query order is
    /// preserved after sampling.
    fn down_sample(&mut self, max: usize) {
        if self.queries.len() <= max {
            return;
        }

        let hash = self.content_hash();
        let hash_bytes = hash.as_bytes();
        let seed_value = u64::from_le_bytes(hash_bytes[..8].try_into().unwrap_or([0u8; 8]));
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed_value);

        let mut indices: Vec<usize> = (0..self.queries.len()).collect();
        indices.shuffle(&mut rng);
        indices.truncate(max);
        indices.sort_unstable();

        let mut kept = Vec::with_capacity(max);
        for idx in indices {
            kept.push(std::mem::take(&mut self.queries[idx]));
        }
        self.queries = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Concept;
    use crate::types::ImageId;

    fn catalog() -> ConceptCatalog {
        ConceptCatalog::new(vec![
            Concept::new("minimal", "Minimal", vec![1.0, 0.0]),
            Concept::new("playful", "Playful", vec![0.0, 1.0]),
        ])
    }

    fn interaction(image: &str, query: &str) -> InteractionRecord {
        InteractionRecord {
            image_id: ImageId::new(image),
            query: query.to_string(),
        }
    }

    #[test]
    fn test_baseline_contains_labels_and_probes() {
        let workload = QueryWorkload::baseline(&catalog());
        let queries = workload.queries();
        assert!(queries.contains(&"minimal".to_string()));
        assert!(queries.contains(&"playful".to_string()));
        assert!(queries.contains(&"minimalist landing page".to_string()));
        assert_eq!(workload.len(), 2 + STYLE_PROBES.len());
    }

    #[test]
    fn test_canonicalization_dedupes_variants() {
        let mut workload = QueryWorkload { queries: Vec::new() };
        let mut seen = HashSet::new();
        workload.push_canonical(&mut seen, "  Dark   Mode ");
        workload.push_canonical(&mut seen, "dark mode");
        workload.push_canonical(&mut seen, "   ");
        assert_eq!(workload.queries(), &["dark mode".to_string()]);
    }

    #[test]
    fn test_derived_caps_expansions_per_query() {
        let expansions = vec![QueryExpansion {
            query: "hero section".to_string(),
            expansions: vec![
                "hero banner".to_string(),
                "landing hero".to_string(),
                "above the fold".to_string(),
                "page header".to_string(),
            ],
        }];
        let config = HubConfig {
            max_expansions_per_query: 2,
            ..HubConfig::default()
        };
        let workload = QueryWorkload::derived(
            &catalog(),
            &[],
            &[interaction("img-1", "hero section")],
            &expansions,
            &config,
        );
        // Original query + first 2 expansions only.
        assert_eq!(
            workload.queries(),
            &[
                "hero section".to_string(),
                "hero banner".to_string(),
                "landing hero".to_string(),
            ]
        );
    }

    #[test]
    fn test_derived_includes_corpus_tag_labels() {
        let mut record = ImageRecord::new("img-1", vec![1.0, 0.0]);
        record.tags.insert("minimal".into(), 0.4);

        let workload = QueryWorkload::derived(
            &catalog(),
            &[record],
            &[],
            &[],
            &HubConfig::default(),
        );
        assert_eq!(workload.queries(), &["minimal".to_string()]);
    }

    #[test]
    fn test_down_sample_is_deterministic_and_order_preserving() {
        let build = || {
            let interactions: Vec<InteractionRecord> = (0..100)
                .map(|i| interaction("img-1", &format!("query number {i}")))
                .collect();
            let config = HubConfig {
                max_derived_queries: 25,
                ..HubConfig::default()
            };
            QueryWorkload::derived(&catalog(), &[], &interactions, &[], &config)
        };

        let a = build();
        let b = build();
        assert_eq!(a.queries(), b.queries());
        assert_eq!(a.len(), 25);

        // Sampling keeps the original relative order.
        let positions: Vec<usize> = a
            .queries()
            .iter()
            .map(|q| {
                q.trim_start_matches("query number ")
                    .parse::<usize>()
                    .unwrap()
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_inputs_yield_empty_workload() {
        let workload = QueryWorkload::derived(
            &ConceptCatalog::new(vec![]),
            &[],
            &[],
            &[],
            &HubConfig::default(),
        );
        assert!(workload.is_empty());
    }
}
