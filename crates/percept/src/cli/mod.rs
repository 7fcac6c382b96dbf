//! Command handlers for the Percept CLI.

pub mod catalog;
pub mod config;
pub mod hubs;
pub mod tag;

use std::path::PathBuf;

/// Resolve the catalog path: explicit flag, or the configured default.
pub(crate) fn catalog_path(
    flag: &Option<PathBuf>,
    config: &percept_core::Config,
) -> anyhow::Result<PathBuf> {
    let path = match flag {
        Some(path) => path.clone(),
        None => config.catalog_path(),
    };
    if !path.exists() {
        anyhow::bail!(
            "Concept catalog not found at: {}\nPass --catalog or set [catalog].path in the config.",
            path.display()
        );
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_path_prefers_flag() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("concepts.json");
        std::fs::write(&file, "[]").unwrap();

        let config = percept_core::Config::default();
        let resolved = catalog_path(&Some(file.clone()), &config).unwrap();
        assert_eq!(resolved, file);
    }

    #[test]
    fn test_catalog_path_missing_file_is_an_error() {
        let config = percept_core::Config::default();
        let missing = Some(PathBuf::from("/nonexistent/concepts.json"));
        let err = catalog_path(&missing, &config).unwrap_err();
        assert!(err.to_string().contains("--catalog"));
    }
}
