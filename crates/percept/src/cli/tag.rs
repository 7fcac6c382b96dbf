//! The `percept tag` command for batch tagging a corpus snapshot.

use clap::Args;
use percept_core::config::RetryConfig;
use percept_core::embedding::http::HttpEmbeddingProvider;
use percept_core::embedding::retry::{backoff_duration, is_retryable};
use percept_core::snapshot;
use percept_core::store::memory::InMemoryTagStore;
use percept_core::{Config, ConceptCatalog, EmbeddingProvider, ImageId, TagAssignment, TagEngine};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Corpus snapshot to tag (JSONL, one image record per line)
    #[arg(required = true)]
    pub corpus: PathBuf,

    /// Concept catalog file (JSON array; defaults to the configured path)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Output file (defaults to rewriting the corpus in place)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory of image files, looked up by record id when a record
    /// carries no embedding
    #[arg(long)]
    pub image_dir: Option<PathBuf>,
}

/// Execute the tag command.
pub async fn execute(args: TagArgs, config: &Config) -> anyhow::Result<()> {
    let catalog_file = super::catalog_path(&args.catalog, config)?;
    let concepts = snapshot::read_concepts(&catalog_file)?;
    let catalog = Arc::new(ConceptCatalog::new(concepts));
    if catalog.is_empty() {
        // An empty catalog would reconcile every record down to zero tags.
        anyhow::bail!(
            "Concept catalog at {} is empty; refusing to strip every tag.",
            catalog_file.display()
        );
    }

    let mut records = snapshot::read_corpus(&args.corpus)?;
    tracing::info!(
        "Tagging {} images against {} concepts",
        records.len(),
        catalog.len()
    );

    // Seed the store with the tags already in the snapshot so reconciliation
    // diffs against them instead of rewriting everything.
    let existing: HashMap<_, _> = records
        .iter()
        .filter(|r| !r.tags.is_empty())
        .map(|r| (r.id.clone(), r.tags.clone()))
        .collect();
    let store = Arc::new(InMemoryTagStore::with_tags(existing));

    let engine = TagEngine::new(
        Arc::clone(&catalog),
        store.clone(),
        config.tagging.clone(),
    );

    let provider = args
        .image_dir
        .as_ref()
        .map(|_| HttpEmbeddingProvider::new(&config.embedding));
    if let Some(provider) = &provider {
        if !provider.is_available().await {
            tracing::warn!(
                "Embedding endpoint {} is not reachable; records without embeddings will fail",
                config.embedding.endpoint
            );
        }
    }

    let progress = create_progress_bar(records.len() as u64);
    let mut tagged: u64 = 0;
    let mut embedded: u64 = 0;
    let mut skipped: u64 = 0;
    let mut failed: u64 = 0;
    let start_time = std::time::Instant::now();

    for record in &records {
        let result = if !record.embedding.is_empty() {
            engine.tag(&record.id, &record.embedding).await
        } else if let (Some(dir), Some(provider)) = (&args.image_dir, &provider) {
            let path = dir.join(record.id.as_str());
            match std::fs::read(&path) {
                Ok(bytes) => {
                    let format = image_format(&path);
                    let result = tag_bytes_with_retry(
                        &engine,
                        provider,
                        &record.id,
                        &bytes,
                        &format,
                        &config.retry,
                    )
                    .await;
                    if result.is_ok() {
                        embedded += 1;
                    }
                    result
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Failed to read {:?}: {}", path, e);
                    progress.inc(1);
                    continue;
                }
            }
        } else {
            skipped += 1;
            tracing::debug!(
                "{}: record has no embedding and no --image-dir was given",
                record.id
            );
            progress.inc(1);
            continue;
        };

        match result {
            Ok(tags) => {
                tagged += 1;
                tracing::debug!("{}: {} tags", record.id, tags.len());
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Failed to tag {}: {}", record.id, e);
            }
        }

        // Update progress bar with rate
        progress.inc(1);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let processed = tagged + failed;
            progress.set_message(format!("{:.1} img/sec", processed as f64 / elapsed));
        }
    }
    progress.finish_and_clear();

    // Fold the reconciled tag sets back into the snapshot.
    let final_tags = store.snapshot().await;
    for record in &mut records {
        record.tags = final_tags.get(&record.id).cloned().unwrap_or_default();
    }

    let output = args.output.as_deref().unwrap_or(&args.corpus);
    snapshot::write_corpus(output, &records)?;
    tracing::info!("Corpus written to {:?}", output);

    let elapsed = start_time.elapsed();
    let rate = if elapsed.as_secs_f64() > 0.0 {
        (tagged + failed) as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    print_summary(
        tagged,
        embedded,
        skipped,
        failed,
        store.upsert_count(),
        store.delete_count(),
        elapsed,
        rate,
    );

    Ok(())
}

/// Embed and tag one image, retrying transient provider failures.
async fn tag_bytes_with_retry(
    engine: &TagEngine,
    provider: &dyn EmbeddingProvider,
    image: &ImageId,
    bytes: &[u8],
    format: &str,
    retry: &RetryConfig,
) -> percept_core::error::EngineResult<Vec<TagAssignment>> {
    let mut attempt: u32 = 0;
    loop {
        match engine.tag_image_bytes(provider, image, bytes, format).await {
            Ok(tags) => return Ok(tags),
            Err(e) if attempt < retry.attempts && is_retryable(&e) => {
                let delay = backoff_duration(attempt, retry.base_delay_ms);
                tracing::warn!(
                    "Embedding {} failed ({}); retrying in {:?}",
                    image,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Image format identifier from the file extension, for the provider's
/// MIME type.
fn image_format(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string())
}

/// Create a progress bar for batch tagging.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .unwrap()
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch tagging.
#[allow(clippy::too_many_arguments)]
fn print_summary(
    tagged: u64,
    embedded: u64,
    skipped: u64,
    failed: u64,
    upserts: u64,
    deletes: u64,
    elapsed: std::time::Duration,
    rate: f64,
) {
    let total = tagged + skipped + failed;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Tagged:       {:>8}", tagged);
    if embedded > 0 {
        eprintln!("    Embedded:     {:>8}", embedded);
    }
    if skipped > 0 {
        eprintln!("    Skipped:      {:>8}", skipped);
    }
    if failed > 0 {
        eprintln!("    Failed:       {:>8}", failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Tag upserts:  {:>8}", upserts);
    eprintln!("    Tag deletes:  {:>8}", deletes);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}
