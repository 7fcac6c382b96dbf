//! Pure tag selection: score, rank, and pick a bounded tag set.
//!
//! Everything here is a deterministic function of `(embedding, catalog,
//! config)`. Orchestration, locking, and persistence live in
//! [`engine`](crate::tagging::engine).

use std::collections::HashSet;

use crate::catalog::ConceptCatalog;
use crate::config::TaggingConfig;
use crate::math::dot;
use crate::types::{ConceptId, TagAssignment};

/// A concept paired with its cosine score against one image.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedConcept {
    pub concept_id: ConceptId,
    pub score: f32,
}

/// Score an image embedding against every concept in the catalog.
///
/// Cosine on L2-normalized vectors reduces to a dot product. Concepts whose
/// embedding dimension does not match the image are excluded (data error,
/// not fatal). Output is in ranking order.
pub fn score_catalog(embedding: &[f32], catalog: &ConceptCatalog) -> Vec<RankedConcept> {
    let mut scored: Vec<RankedConcept> = catalog
        .concepts()
        .iter()
        .filter(|c| c.embedding.len() == embedding.len())
        .map(|c| RankedConcept {
            concept_id: c.id.clone(),
            score: dot(embedding, &c.embedding),
        })
        .collect();
    rank(&mut scored);
    scored
}

/// Sort candidates into ranking order: score descending, concept id
/// ascending on exact score ties. The explicit tie-break keeps tag sets
/// bit-reproducible across runs.
pub fn rank(candidates: &mut [RankedConcept]) {
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.concept_id.cmp(&b.concept_id))
    });
}

/// Select a bounded tag set from ranked candidates.
///
/// Acceptance walks the above-threshold prefix in rank order and stops at
/// `max_tags` or at a relative score drop larger than `min_score_drop_pct`,
/// except that the `min_tags_per_image` coverage floor overrides both the
/// drop guard and the score threshold: when too few tags were accepted, the
/// floor is back-filled from the full ranked list. `fallback_k` is the last
/// resort when nothing was selected at all.
///
/// The returned assignments are non-increasing in score by construction.
pub fn select_tags(ranked: &[RankedConcept], config: &TaggingConfig) -> Vec<TagAssignment> {
    let mut chosen: Vec<TagAssignment> = Vec::new();

    // Greedy acceptance over the above-threshold prefix.
    let mut prev_score: Option<f32> = None;
    for candidate in ranked.iter().filter(|c| c.score >= config.min_score) {
        if chosen.len() >= config.max_tags {
            break;
        }
        if let Some(prev) = prev_score {
            // A relative drop is only meaningful from a positive score.
            if prev > 0.0 {
                let drop = (prev - candidate.score) / prev;
                if drop > config.min_score_drop_pct && chosen.len() >= config.min_tags_per_image {
                    break;
                }
            }
        }
        chosen.push(TagAssignment::new(candidate.concept_id.clone(), candidate.score));
        prev_score = Some(candidate.score);
    }

    // Coverage floor: back-fill from the full ranked list, ignoring the
    // score threshold, until the floor is met or the catalog runs out.
    if chosen.len() < config.min_tags_per_image {
        let have: HashSet<&ConceptId> = chosen.iter().map(|t| &t.concept_id).collect();
        let mut fill: Vec<TagAssignment> = Vec::new();
        for candidate in ranked {
            if chosen.len() + fill.len() >= config.min_tags_per_image {
                break;
            }
            if have.contains(&candidate.concept_id) {
                continue;
            }
            fill.push(TagAssignment::new(candidate.concept_id.clone(), candidate.score));
        }
        chosen.extend(fill);
    }

    // Last resort for a selection that came up completely empty.
    if chosen.is_empty() {
        chosen = ranked
            .iter()
            .take(config.fallback_k)
            .map(|c| TagAssignment::new(c.concept_id.clone(), c.score))
            .collect();
    }

    chosen
}
