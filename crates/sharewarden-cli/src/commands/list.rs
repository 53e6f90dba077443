use std::path::PathBuf;

use anyhow::Result;

use sharewarden_core::{DecisionStore, StorePaths};

pub fn execute(config: Option<PathBuf>, json: bool) -> Result<()> {
    let paths = StorePaths::resolve_from(config)?;
    let store = DecisionStore::open(paths);

    if json {
        let output = serde_json::to_string_pretty(store.matrix())?;
        println!("{}", output);
        return Ok(());
    }

    if store.matrix().is_empty() {
        println!("No decisions recorded.");
        return Ok(());
    }
    for (fingerprint, decision) in store.decisions() {
        println!(
            "{}  {} -> {}  {}  {}",
            fingerprint,
            decision.source,
            decision.target,
            decision.folder.display(),
            decision.response
        );
    }
    Ok(())
}
