use std::path::PathBuf;

use anyhow::Result;

use sharewarden_core::{DecisionStore, StorePaths};

pub fn execute(config: Option<PathBuf>) -> Result<()> {
    let paths = StorePaths::resolve_from(config)?;
    let store = DecisionStore::open(paths);
    store.sync_policy_files()?;
    println!(
        "Policy files reconciled for {} decision(s).",
        store.matrix().len()
    );
    Ok(())
}
