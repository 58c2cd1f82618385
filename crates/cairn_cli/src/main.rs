//! CAIRN CLI
//!
//! Index a directory into a manifest, verify a directory against one, and
//! resolve the module a directory holds.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;
mod config;

use cairn_core::DigestType;
use cairn_storage::ReadBucket;
use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use config::{CliConfig, Overrides};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cairn")]
#[command(about = "CAIRN - Verified manifests, buckets and modules", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Maximum files hashed at once
    #[arg(long, global = true)]
    concurrency: Option<usize>,
    /// Digest algorithm for new digests
    #[arg(long, global = true)]
    digest: Option<DigestType>,
    /// Allow manifest entries with no matching file
    #[arg(long, global = true)]
    allow_missing: bool,
    /// Allow files the manifest does not list
    #[arg(long, global = true)]
    allow_extra: bool,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical manifest of a directory
    Manifest {
        /// Directory to index
        dir: PathBuf,
    },
    /// Verify a directory against a manifest
    Verify {
        /// Directory to verify
        dir: PathBuf,
        /// Manifest file
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Show the module held by a directory
    Module {
        /// Module directory
        dir: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "cairn=debug" } else { "cairn=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let overrides = Overrides {
        concurrency: cli.global.concurrency,
        digest_type: cli.global.digest,
        allow_missing: cli.global.allow_missing,
        allow_extra: cli.global.allow_extra,
    };
    let config = CliConfig::load(cli.global.config.as_deref())?.with_overrides(&overrides);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::Manifest { dir } => {
            print!("{}", commands::manifest_text(&cancel, &dir, &config).await?);
        }
        Commands::Verify { dir, manifest } => {
            let bucket = commands::verify(&cancel, &dir, &manifest, &config).await?;
            println!(
                "ok: {} paths, {} blobs",
                bucket.paths().len(),
                bucket.blob_set().len()
            );
        }
        Commands::Module { dir } => match commands::load_module(&cancel, &dir, &config).await? {
            None => println!("no module"),
            Some(module) => {
                println!("documentation: {}", module.documentation_path().unwrap_or("none"));
                println!("license: {}", module.license_path().unwrap_or("none"));
                println!("pins: {}", module.pins().len());
                for pin in module.pins() {
                    println!("  {pin} {}", pin.digest());
                }
            }
        },
    }
    Ok(())
}
