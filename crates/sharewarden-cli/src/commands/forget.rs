use std::path::PathBuf;

use anyhow::Result;

use sharewarden_core::{DecisionStore, StorePaths};

pub fn execute(config: Option<PathBuf>, fingerprint: &str) -> Result<()> {
    let paths = StorePaths::resolve_from(config)?;
    let mut store = DecisionStore::open(paths);
    if store.forget(fingerprint)? {
        println!("Forgot {}", fingerprint);
    } else {
        println!("Nothing recorded under {}", fingerprint);
    }
    Ok(())
}
