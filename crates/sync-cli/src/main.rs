//! CLI entry point (spec.md §6): `--dry-run`, `--force-alignment`,
//! `--config PATH`, `--help`, `--version`, exit codes per sysexits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use opendal::services::S3;
use opendal::Operator;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sync_config::load_config_file;
use sync_objectstore::OpendalObjectStore;

mod sysexits;

#[derive(Debug, Parser)]
#[command(name = "sync-engine", version, about = "Incremental filesystem-to-object-store backup engine")]
struct Cli {
    /// Suppress all object-store and state mutations, counting what would happen.
    #[arg(long)]
    dry_run: bool,

    /// Run the forced-alignment reconciler instead of a normal backup.
    #[arg(long)]
    force_alignment: bool,

    /// Path to the KEY=VALUE configuration file.
    #[arg(long, default_value = "/etc/sync-engine/config")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli).await {
        Ok(code) => code.into(),
        Err(code) => code.into(),
    }
}

async fn run(cli: Cli) -> Result<sysexits::Exit, sysexits::Exit> {
    let mut cfg = load_config_file(&cli.config).map_err(|e| {
        tracing::error!("configuration error: {e}");
        sysexits::Exit::Config
    })?;

    if cli.dry_run {
        cfg.dry_run = true;
    }
    if cli.force_alignment {
        cfg.force_alignment_mode = true;
    }

    if !cfg.mount_dir.is_dir() {
        tracing::error!("mount directory {} does not exist", cfg.mount_dir.display());
        return Err(sysexits::Exit::NoInput);
    }

    let builder = S3::default()
        .bucket(&cfg.s3_bucket)
        .region(&cfg.aws_region);
    let builder = match (&cfg.aws_access_key_id, &cfg.aws_secret_access_key) {
        (Some(id), Some(secret)) => builder.access_key_id(id).secret_access_key(secret),
        _ => builder,
    };

    let op = Operator::new(builder)
        .map_err(|e| {
            tracing::error!("failed to configure object-store backend: {e}");
            sysexits::Exit::Internal
        })?
        .finish();
    let store = OpendalObjectStore::new(op);

    let state_root = cfg
        .mount_dir
        .parent()
        .unwrap_or(&cfg.mount_dir)
        .join(".sync-engine-state");

    match sync_core::run(&cfg, &store, &state_root).await {
        Ok(outcome) => {
            tracing::info!(
                ran_alignment = outcome.ran_alignment,
                new = outcome.stats.files_new,
                modified = outcome.stats.files_modified,
                unchanged = outcome.stats.files_unchanged,
                deleted = outcome.stats.files_deleted,
                errors = outcome.stats.errors,
                "run complete"
            );
            if outcome.ran_alignment {
                match sync_config::disable_force_alignment_mode(&cli.config, chrono::Utc::now()) {
                    Ok(true) => tracing::info!("cleared FORCE_ALIGNMENT_MODE after alignment run"),
                    Ok(false) => {}
                    Err(e) => tracing::error!("failed to clear FORCE_ALIGNMENT_MODE in {}: {e}", cli.config.display()),
                }
            }
            if outcome.stats.errors > 0 {
                Ok(sysexits::Exit::Internal)
            } else {
                Ok(sysexits::Exit::Ok)
            }
        }
        Err(e) => {
            tracing::error!("run failed: {e}");
            Err(sysexits::Exit::from_engine_error(&e))
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .init();
}
