use std::path::{Path, PathBuf};

use anyhow::Result;

use sharewarden_core::{DecisionStore, StorePaths};

/// Read-only resolution: reports what a handler would match without
/// consuming one-time grants.
pub fn execute(config: Option<PathBuf>, source: &str, target: &str, folder: &Path) -> Result<()> {
    let paths = StorePaths::resolve_from(config)?;
    let store = DecisionStore::open(paths);

    let (decision, fingerprint) = store.matrix().lookup_decision(source, target, folder);
    match decision {
        Some(decision) => println!(
            "{}  matches {} ({})",
            fingerprint,
            decision.folder.display(),
            decision.response
        ),
        None => println!("{}  no prior decision", fingerprint),
    }
    Ok(())
}
