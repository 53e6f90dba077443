use std::path::{Path, PathBuf};

use anyhow::Result;

use sharewarden_core::{DecisionStore, Response, StorePaths};

pub fn execute(
    config: Option<PathBuf>,
    source: &str,
    target: &str,
    folder: &Path,
    response: Response,
) -> Result<()> {
    let paths = StorePaths::resolve_from(config)?;
    let mut store = DecisionStore::open(paths);
    let fingerprint = store.record_authorization(source, target, folder, response)?;
    println!("Recorded {}", fingerprint);
    Ok(())
}
