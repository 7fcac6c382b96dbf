//! The `percept catalog` command for opposite-relation consistency.
//!
//! The opposite relation between concepts is meant to be symmetric, but the
//! catalog file stores it per concept, so hand edits can leave one-way
//! edges. `audit` lists them; `repair` adds the missing direction.

use clap::{Args, Subcommand};
use percept_core::snapshot;
use percept_core::store::memory::InMemoryConceptStore;
use percept_core::store::ConceptStore;
use percept_core::{Config, ConceptCatalog, OppositeGraph};
use std::path::PathBuf;

/// Arguments for the `catalog` command.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

/// Subcommands for catalog maintenance.
#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// List opposite pairs recorded in only one direction
    Audit {
        /// Concept catalog file (JSON array)
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },

    /// Add the missing direction of every one-way opposite pair
    Repair {
        /// Concept catalog file (JSON array)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Write the repaired catalog back to the file (dry run otherwise)
        #[arg(long)]
        write: bool,
    },
}

/// Execute the catalog command.
pub async fn execute(args: CatalogArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        CatalogCommand::Audit { catalog } => {
            let path = super::catalog_path(&catalog, config)?;
            let concepts = snapshot::read_concepts(&path)?;
            let graph = OppositeGraph::from_concepts(&concepts);

            let asymmetric = graph.audit();
            if asymmetric.is_empty() {
                println!(
                    "Opposite relation is symmetric ({} concepts checked).",
                    concepts.len()
                );
            } else {
                for (from, to) in &asymmetric {
                    println!("{} -> {} has no reverse edge", from, to);
                }
                println!(
                    "{} one-way edge(s) found. Run `percept catalog repair --write` to fix.",
                    asymmetric.len()
                );
            }
        }

        CatalogCommand::Repair { catalog, write } => {
            let path = super::catalog_path(&catalog, config)?;
            let concepts = snapshot::read_concepts(&path)?;

            // Repair goes through a store so the same pass works against any
            // authoritative backend; here the store is the loaded file.
            let store = InMemoryConceptStore::new(concepts);
            let loaded = ConceptCatalog::load(&store).await?;
            let added = loaded.opposite_graph().repair(&store).await?;

            if added == 0 {
                println!("Opposite relation is already symmetric; nothing to repair.");
            } else if write {
                // BTreeMap-backed store, so this comes back ordered by id.
                let repaired = store.load_all().await?;
                snapshot::write_concepts(&path, &repaired)?;
                println!(
                    "Added {} reverse edge(s) and updated {}.",
                    added,
                    path.display()
                );
            } else {
                println!(
                    "Would add {} reverse edge(s). Rerun with --write to update {}.",
                    added,
                    path.display()
                );
            }
        }
    }

    Ok(())
}
