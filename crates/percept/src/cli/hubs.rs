//! The `percept hubs` command for one-shot hub detection over a corpus.

use clap::Args;
use percept_core::embedding::http::HttpEmbeddingProvider;
use percept_core::hub::HubOutcome;
use percept_core::snapshot;
use percept_core::{
    CancelToken, Config, ConceptCatalog, EmbeddingProvider, HubDetector, HubReport, ImageId,
    ImageRecord, OutputFormat, QueryWorkload,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Arguments for the `hubs` command.
#[derive(Args, Debug)]
pub struct HubsArgs {
    /// Corpus snapshot to scan (JSONL, one image record per line)
    #[arg(required = true)]
    pub corpus: PathBuf,

    /// Concept catalog file (JSON array; defaults to the configured path)
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Output file (defaults to rewriting the corpus in place)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Historical interaction records (JSONL: {"image_id", "query"});
    /// implies --derived
    #[arg(long)]
    pub interactions: Option<PathBuf>,

    /// Recorded query expansions (JSONL: {"query", "expansions"})
    #[arg(long)]
    pub expansions: Option<PathBuf>,

    /// Restrict accounting to these image ids (comma-separated); ranking
    /// still runs against the whole corpus
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Build the workload from interactions, expansions, and tag labels
    /// instead of the baseline concept labels
    #[arg(long)]
    pub derived: bool,
}

/// Execute the hubs command.
pub async fn execute(args: HubsArgs, config: &Config) -> anyhow::Result<()> {
    let catalog_file = super::catalog_path(&args.catalog, config)?;
    let concepts = snapshot::read_concepts(&catalog_file)?;
    let catalog = ConceptCatalog::new(concepts);

    let mut records = snapshot::read_corpus(&args.corpus)?;

    let workload = build_workload(&args, config, &catalog, &records)?;
    if workload.is_empty() {
        anyhow::bail!("Query workload is empty; nothing to scan.");
    }

    let targets = parse_targets(&args.targets);
    if let Some(targets) = &targets {
        tracing::info!(
            "Incremental scan: {} target image(s), corpus of {}",
            targets.len(),
            records.len()
        );
    }

    let provider = Arc::new(HttpEmbeddingProvider::new(&config.embedding));
    if !provider.is_available().await {
        // A dead endpoint would fail every batch and clear all stored hub
        // stats, so stop before touching the snapshot.
        anyhow::bail!(
            "Embedding endpoint {} is not reachable.\nStart the embedding server or adjust [embedding].endpoint.",
            config.embedding.endpoint
        );
    }

    let detector = HubDetector::new(
        provider,
        config.hub.clone(),
        Duration::from_millis(config.embedding.embed_timeout_ms),
    );

    // Ctrl-C stops the scan between batches without writing partial stats.
    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; stopping after the current batch");
            interrupt.cancel();
        }
    });

    tracing::info!(
        "Scanning {} images against {} queries",
        records.len(),
        workload.len()
    );
    let start_time = std::time::Instant::now();
    let report = detector
        .detect(&workload, &records, targets.as_ref(), &cancel)
        .await?;

    // Fold verdicts into the snapshot. Images out of scope keep their stats.
    for record in &mut records {
        if let Some(outcome) = report.outcomes.get(&record.id) {
            record.hub_stats = match outcome {
                HubOutcome::Flagged(stats) => Some(stats.clone()),
                HubOutcome::Cleared => None,
            };
        }
    }

    let output = args.output.as_deref().unwrap_or(&args.corpus);
    snapshot::write_corpus(output, &records)?;
    tracing::info!("Corpus written to {:?}", output);

    print_hubs(&report, config)?;
    print_summary(&report, start_time.elapsed());

    Ok(())
}

/// Build the query workload for the scan.
fn build_workload(
    args: &HubsArgs,
    config: &Config,
    catalog: &ConceptCatalog,
    records: &[ImageRecord],
) -> anyhow::Result<QueryWorkload> {
    let derived = args.derived || args.interactions.is_some();
    if !derived {
        return Ok(QueryWorkload::baseline(catalog));
    }

    let interactions = match &args.interactions {
        Some(path) => snapshot::read_interactions(path)?,
        None => {
            tracing::warn!("--derived without --interactions; workload built from tag labels only");
            Vec::new()
        }
    };
    let expansions = match &args.expansions {
        Some(path) => snapshot::read_expansions(path)?,
        None => Vec::new(),
    };

    Ok(QueryWorkload::derived(
        catalog,
        records,
        &interactions,
        &expansions,
        &config.hub,
    ))
}

/// Parse the --targets list, dropping blank entries.
fn parse_targets(raw: &[String]) -> Option<HashSet<ImageId>> {
    let targets: HashSet<ImageId> = raw
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| ImageId::new(s.trim()))
        .collect();
    if targets.is_empty() {
        None
    } else {
        Some(targets)
    }
}

/// Print flagged images to stdout in the configured output format.
fn print_hubs(report: &HubReport, config: &Config) -> anyhow::Result<()> {
    let format = OutputFormat::parse(&config.output.format).unwrap_or_else(|| {
        tracing::warn!(
            "Unknown output.format '{}', using jsonl",
            config.output.format
        );
        OutputFormat::JsonLines
    });

    let rows: Vec<serde_json::Value> = report
        .hubs()
        .map(|(id, stats)| {
            serde_json::json!({
                "image_id": id,
                "count": stats.count,
                "score": stats.score,
                "avg_similarity": stats.avg_similarity,
                "avg_margin": stats.avg_margin,
            })
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", snapshot::to_json(&rows, config.output.pretty)?),
        OutputFormat::JsonLines => {
            for row in &rows {
                println!("{}", snapshot::to_json(row, false)?);
            }
        }
    }
    Ok(())
}

/// Print a formatted report summary after the scan.
fn print_summary(report: &HubReport, elapsed: std::time::Duration) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("             Hub Detection");
    eprintln!("  ====================================");
    eprintln!("    Corpus size:  {:>8}", report.corpus_size);
    eprintln!("    Queries:      {:>8}", report.queries_total);
    if report.batches_failed > 0 {
        eprintln!("    Scored:       {:>8}", report.queries_scored);
        eprintln!("    Failed batches: {:>6}", report.batches_failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Expected:     {:>11.5}", report.expected_score);
    eprintln!("    Threshold:    {:>11.5}", report.threshold);
    eprintln!("    Flagged:      {:>8}", report.flagged_count());
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_targets_none_when_empty() {
        assert!(parse_targets(&[]).is_none());
        assert!(parse_targets(&["  ".to_string()]).is_none());
    }

    #[test]
    fn test_parse_targets_trims_and_dedups() {
        let raw = vec![
            "img-1".to_string(),
            " img-2 ".to_string(),
            "img-1".to_string(),
        ];
        let targets = parse_targets(&raw).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&ImageId::new("img-2")));
    }
}
