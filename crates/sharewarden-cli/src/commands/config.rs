use std::path::PathBuf;

use anyhow::{Context, Result};

use sharewarden_core::{Config, StorePaths};

pub fn print_effective(config_path: Option<PathBuf>) -> Result<()> {
    let paths = StorePaths::resolve_from(config_path)?;
    let config = if paths.config_path.is_file() {
        Config::load(&paths.config_path)
            .with_context(|| format!("load config {}", paths.config_path.display()))?
    } else {
        Config::default_config()
    };
    let output = config.to_toml_string()?;
    println!("{}", output);
    Ok(())
}
