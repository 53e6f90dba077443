use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sharewarden_core::Response;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "sharewarden",
    version,
    about = "Folder-sharing authorization store for isolated VMs"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Init {
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
    /// Print all recorded decisions
    List {
        #[arg(long)]
        json: bool,
    },
    /// Resolve a request against prior decisions (read-only)
    Lookup {
        source: String,
        target: String,
        folder: PathBuf,
    },
    /// Record an authorization outcome
    Record {
        source: String,
        target: String,
        folder: PathBuf,
        response: Response,
    },
    /// Drop the decision stored under a fingerprint
    Forget { fingerprint: String },
    /// Reconcile the policy directory with the decision store
    Sync,
    Config {
        #[arg(long)]
        print: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { path, force } => init_config(cli.config, path, force),
        Commands::List { json } => commands::list::execute(cli.config, json),
        Commands::Lookup {
            source,
            target,
            folder,
        } => commands::lookup::execute(cli.config, &source, &target, &folder),
        Commands::Record {
            source,
            target,
            folder,
            response,
        } => commands::record::execute(cli.config, &source, &target, &folder, response),
        Commands::Forget { fingerprint } => commands::forget::execute(cli.config, &fingerprint),
        Commands::Sync => commands::sync::execute(cli.config),
        Commands::Config { print } => {
            if print {
                commands::config::print_effective(cli.config)
            } else {
                Ok(())
            }
        }
    }
}

fn init_config(config: Option<PathBuf>, path: Option<PathBuf>, force: bool) -> Result<()> {
    let paths = sharewarden_core::StorePaths::resolve_from(config)?;
    let config_path = path.unwrap_or(paths.config_path);
    if config_path.exists() && !force {
        return Err(anyhow::anyhow!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }
    let config = sharewarden_core::Config::default_config();
    config.save(&config_path)?;
    println!("Config written to {}", config_path.display());
    Ok(())
}
