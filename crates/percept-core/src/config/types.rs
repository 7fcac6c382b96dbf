//! Sub-configuration structs with defaults for every recognized option.

use serde::{Deserialize, Serialize};

/// Tag selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Minimum cosine score for a concept to be considered at all.
    pub min_score: f32,

    /// Maximum number of tags per image.
    pub max_tags: usize,

    /// Relative score drop that stops greedy acceptance.
    /// `(prev - score) / prev > min_score_drop_pct` ends the run, unless the
    /// coverage floor below has not been reached yet. 0.0 stops on any drop.
    pub min_score_drop_pct: f32,

    /// Coverage floor: accept at least this many tags, back-filling from the
    /// full ranked list below `min_score` if necessary.
    pub min_tags_per_image: usize,

    /// Absolute last resort when nothing else selected anything.
    pub fallback_k: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            min_score: 0.20,
            max_tags: 40,
            min_score_drop_pct: 0.0,
            min_tags_per_image: 8,
            fallback_k: 5,
        }
    }
}

/// Hub detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Result window per query: an image "appears" when it ranks in the top N.
    pub top_n: usize,

    /// Sensitivity: hub threshold = (top_n / corpus size) * multiplier.
    pub threshold_multiplier: f64,

    /// Queries per embedding batch.
    pub embed_batch_size: usize,

    /// Cap on expansions taken per original query when deriving a workload.
    pub max_expansions_per_query: usize,

    /// Cap on total derived workload size (seeded down-sample above this).
    pub max_derived_queries: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            top_n: 40,
            threshold_multiplier: 1.5,
            embed_batch_size: 10,
            max_expansions_per_query: 3,
            max_derived_queries: 5000,
        }
    }
}

/// Scan scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Debounce window: a non-force trigger resets this timer.
    pub debounce_ms: u64,

    /// Minimum time between run completions and the next forced start.
    pub min_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 30_000,
            min_interval_ms: 300_000,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service.
    pub endpoint: String,

    /// Model name to request.
    pub model: String,

    /// Expected vector dimension; mismatching responses are rejected.
    pub dimension: usize,

    /// Deadline for a single embedding call.
    pub embed_timeout_ms: u64,

    /// API key, or `${ENV_VAR}` to read one from the environment.
    /// Empty for local unauthenticated servers.
    pub api_key: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7997".to_string(),
            model: "clip-ViT-B-32".to_string(),
            dimension: 512,
            embed_timeout_ms: 30_000,
            api_key: String::new(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve `${ENV_VAR}` references in the configured API key.
    /// Returns `None` when no key is configured or the variable is unset.
    pub fn resolved_api_key(&self) -> Option<String> {
        let value = &self.api_key;
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            std::env::var(var_name).ok()
        } else if value.is_empty() {
            None
        } else {
            Some(value.clone())
        }
    }
}

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Max retry attempts after the initial call. 0 disables retries.
    pub attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Concept catalog location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path to the authoritative concept catalog file.
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: "~/.percept/concepts.json".to_string(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "jsonl".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
