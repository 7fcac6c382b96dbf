//! Hub detection: statistical outliers over a query workload.
//!
//! A hub is an image whose appearance frequency in per-query top-N results
//! exceeds what a uniform-random assignment would produce. The detector
//! embeds the workload in batches, scores each query against the corpus,
//! accumulates per-image appearance stats, and compares the resulting rate
//! against `(top_n / |corpus|) * threshold_multiplier`.
//!
//! Failure model: one bad embedding batch degrades coverage, never
//! accumulated counts. Stats only advance on successful batches.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};

use crate::cancel::CancelToken;
use crate::config::HubConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{EngineError, EngineResult};
use crate::hub::workload::QueryWorkload;
use crate::math::dot;
use crate::store::HubStatsStore;
use crate::types::{HubStats, ImageId, ImageRecord};

/// Embed batches kept in flight at once, overlapping network with scoring.
const EMBED_PARALLELISM: usize = 2;

/// Expected per-image appearance rate under uniform-random top-N placement.
pub fn expected_score(top_n: usize, corpus_size: usize) -> f64 {
    if corpus_size == 0 {
        return 0.0;
    }
    top_n as f64 / corpus_size as f64
}

/// The hub threshold: `expected * multiplier`. Strictly above is a hub.
pub fn hub_threshold(top_n: usize, corpus_size: usize, multiplier: f64) -> f64 {
    expected_score(top_n, corpus_size) * multiplier
}

/// Observed appearance rate: `count / |workload|`, in [0, 1].
pub fn hub_score(count: u64, workload_size: usize) -> f64 {
    if workload_size == 0 {
        return 0.0;
    }
    count as f64 / workload_size as f64
}

/// Verdict for one image in scope: flagged with fresh stats, or cleared.
///
/// Hub status is not sticky; an image flagged by an earlier run and at or
/// below threshold now is `Cleared`, and applying the report removes its
/// stored stats.
#[derive(Debug, Clone, PartialEq)]
pub enum HubOutcome {
    Flagged(HubStats),
    Cleared,
}

/// Result of one detector run.
#[derive(Debug, Clone)]
pub struct HubReport {
    /// Verdict per image in scope (whole corpus, or the target subset).
    pub outcomes: BTreeMap<ImageId, HubOutcome>,

    /// Images that participated in ranking.
    pub corpus_size: usize,

    /// Planned workload size. Hub scores divide by this, so skipped batches
    /// lower scores rather than silently shrinking the denominator.
    pub queries_total: usize,

    /// Queries whose batch embedded successfully and got scored.
    pub queries_scored: usize,

    /// Embedding batches skipped after failure or timeout.
    pub batches_failed: usize,

    pub expected_score: f64,
    pub threshold: f64,
}

impl HubReport {
    /// Flagged images with their stats.
    pub fn hubs(&self) -> impl Iterator<Item = (&ImageId, &HubStats)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            HubOutcome::Flagged(stats) => Some((id, stats)),
            HubOutcome::Cleared => None,
        })
    }

    pub fn flagged_count(&self) -> usize {
        self.hubs().count()
    }
}

/// Per-image accumulation while the workload streams through.
#[derive(Default)]
struct Accumulator {
    count: u64,
    score_sum: f64,
    margin_sum: f64,
}

/// Scans a corpus for hub images against a query workload.
pub struct HubDetector {
    provider: Arc<dyn EmbeddingProvider>,
    config: HubConfig,
    embed_timeout: Duration,
}

impl HubDetector {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: HubConfig, embed_timeout: Duration) -> Self {
        Self {
            provider,
            config,
            embed_timeout,
        }
    }

    /// Run the scan.
    ///
    /// With `targets = None` every corpus image is accounted and reported
    /// (full mode). With a target subset, ranking still runs against the
    /// entire corpus (a target is a hub only if it ranks in the *true*
    /// top-N) but accounting and outcomes are restricted to the targets,
    /// bounding memory and downstream writes to `O(|targets|)`.
    pub async fn detect(
        &self,
        workload: &QueryWorkload,
        corpus: &[ImageRecord],
        targets: Option<&HashSet<ImageId>>,
        cancel: &CancelToken,
    ) -> EngineResult<HubReport> {
        let dimension = self.provider.dimension();
        let scoreable: Vec<&ImageRecord> = corpus
            .iter()
            .filter(|r| r.embedding.len() == dimension)
            .collect();
        let excluded = corpus.len() - scoreable.len();
        if excluded > 0 {
            tracing::warn!(
                "Excluding {} of {} images from hub scan (missing or wrong-dimension embedding)",
                excluded,
                corpus.len()
            );
        }

        let expected = expected_score(self.config.top_n, scoreable.len());
        let threshold = expected * self.config.threshold_multiplier;

        let in_scope = |id: &ImageId| targets.map_or(true, |t| t.contains(id));

        tracing::info!(
            "Hub scan: {} queries x {} images (top_n={}, threshold={:.5}{})",
            workload.len(),
            scoreable.len(),
            self.config.top_n,
            threshold,
            targets.map_or(String::new(), |t| format!(", targets={}", t.len())),
        );

        let mut accumulators: HashMap<ImageId, Accumulator> = HashMap::new();
        let mut queries_scored = 0usize;
        let mut batches_failed = 0usize;

        let provider = self.provider.clone();
        let embed_timeout = self.embed_timeout;
        let mut batches = stream::iter(
            workload
                .queries()
                .chunks(self.config.embed_batch_size.max(1))
                .enumerate(),
        )
        .map(|(index, chunk)| {
            let provider = provider.clone();
            async move {
                let result = match tokio::time::timeout(embed_timeout, provider.embed_text(chunk))
                    .await
                {
                    Ok(inner) => inner,
                    Err(_) => Err(EngineError::Timeout {
                        stage: "hub_embed".to_string(),
                        timeout_ms: embed_timeout.as_millis() as u64,
                    }),
                };
                (index, chunk.len(), result)
            }
        })
        .buffered(EMBED_PARALLELISM);

        while let Some((index, batch_size, result)) = batches.next().await {
            if cancel.is_cancelled() {
                tracing::info!("Hub scan cancelled after {} queries", queries_scored);
                return Err(EngineError::Cancelled);
            }

            let embeddings = match result {
                Ok(embeddings) if embeddings.len() == batch_size => embeddings,
                Ok(embeddings) => {
                    tracing::warn!(
                        "Skipping batch {}: provider returned {} vectors for {} queries",
                        index,
                        embeddings.len(),
                        batch_size
                    );
                    batches_failed += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Skipping batch {} ({} queries): {}", index, batch_size, e);
                    batches_failed += 1;
                    continue;
                }
            };

            for query_embedding in &embeddings {
                self.accumulate_query(query_embedding, &scoreable, &in_scope, &mut accumulators);
            }
            queries_scored += embeddings.len();
        }

        let queries_total = workload.len();
        let mut outcomes = BTreeMap::new();
        let scope: Box<dyn Iterator<Item = &ImageId>> = match targets {
            Some(targets) => Box::new(targets.iter()),
            None => Box::new(corpus.iter().map(|r| &r.id)),
        };
        for id in scope {
            let outcome = match accumulators.get(id) {
                Some(acc) if acc.count > 0 => {
                    let score = hub_score(acc.count, queries_total);
                    if score > threshold {
                        HubOutcome::Flagged(HubStats {
                            count: acc.count,
                            score,
                            avg_similarity: (acc.score_sum / acc.count as f64) as f32,
                            avg_margin: (acc.margin_sum / acc.count as f64) as f32,
                        })
                    } else {
                        HubOutcome::Cleared
                    }
                }
                _ => HubOutcome::Cleared,
            };
            outcomes.insert(id.clone(), outcome);
        }

        let report = HubReport {
            outcomes,
            corpus_size: scoreable.len(),
            queries_total,
            queries_scored,
            batches_failed,
            expected_score: expected,
            threshold,
        };
        tracing::info!(
            "Hub scan done: {} hubs, {}/{} queries scored, {} batches failed",
            report.flagged_count(),
            report.queries_scored,
            report.queries_total,
            report.batches_failed
        );
        Ok(report)
    }

    /// Write a report's verdicts to the stats store.
    pub async fn apply(report: &HubReport, store: &dyn HubStatsStore) -> EngineResult<()> {
        for (id, outcome) in &report.outcomes {
            match outcome {
                HubOutcome::Flagged(stats) => store.replace(id, stats.clone()).await?,
                HubOutcome::Cleared => store.clear(id).await?,
            }
        }
        Ok(())
    }

    /// Score one query against the corpus and fold its top-N into the
    /// accumulators.
    fn accumulate_query(
        &self,
        query_embedding: &[f32],
        scoreable: &[&ImageRecord],
        in_scope: &dyn Fn(&ImageId) -> bool,
        accumulators: &mut HashMap<ImageId, Accumulator>,
    ) {
        let mut scored: Vec<(usize, f32)> = scoreable
            .iter()
            .enumerate()
            .map(|(i, record)| (i, dot(query_embedding, &record.embedding)))
            .collect();
        // Deterministic top-N: score descending, image id ascending on ties.
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| scoreable[a.0].id.cmp(&scoreable[b.0].id))
        });
        scored.truncate(self.config.top_n);
        if scored.is_empty() {
            return;
        }

        let mean: f32 = scored.iter().map(|(_, s)| s).sum::<f32>() / scored.len() as f32;
        for (i, score) in scored {
            let id = &scoreable[i].id;
            if !in_scope(id) {
                continue;
            }
            let acc = accumulators.entry(id.clone()).or_default();
            acc.count += 1;
            acc.score_sum += score as f64;
            acc.margin_sum += (score - mean) as f64;
        }
    }
}
