//! CLI entry point for the photo refresher.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use immich_hass::config::{self, Args, save_yaml};
use immich_hass::publish::prepare_publish_dir;
use immich_hass::{
    CliMediaConverter, CycleOutcome, ImmichClient, LogLevel, MediaConverter, NoOpMediaConverter,
    PersonDirectory, PhotoUpdater, run_with_shutdown,
};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal
    dotenvy::dotenv().ok();

    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let config = config::load(&args).context("invalid configuration")?;

    init_tracing(config.log_level);
    debug!(?config, "configuration loaded");

    if let Some(path) = &args.write_config {
        save_yaml(&config, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote effective configuration");
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %config.immich.url,
        publish_dir = %config.publish_dir.display(),
        filters = config.filters.len(),
        "immich-hass starting"
    );

    prepare_publish_dir(&config.publish_dir)
        .await
        .context("publish directory is not usable")?;

    let client = Arc::new(ImmichClient::new(&config.immich)?);
    let people = PersonDirectory::fetch(client.as_ref())
        .await
        .context("failed to fetch people from Immich")?;

    let converter: Arc<dyn MediaConverter> = match CliMediaConverter::from_path() {
        Some(cli) => {
            if cli.heif_convert_path().is_none() {
                warn!("heif-convert not found in PATH, HEIC stills can only be converted through ffmpeg");
            }
            if cli.ffmpeg_path().is_none() {
                warn!("ffmpeg not found in PATH, HEIC sequences cannot be converted to video");
            }
            Arc::new(cli)
        }
        None => {
            warn!("neither heif-convert nor ffmpeg found in PATH, HEIC files will be skipped");
            Arc::new(NoOpMediaConverter)
        }
    };

    let mut updater = PhotoUpdater::new(config, client, converter, people);

    if args.once {
        return match updater.run_cycle().await {
            CycleOutcome::Completed(report) => {
                info!(published = report.published.len(), "single cycle completed");
                Ok(())
            }
            CycleOutcome::Failed {
                filter,
                stage,
                error,
            } => Err(anyhow::Error::new(error)
                .context(format!("cycle for filter set '{}' failed at {}", filter, stage))),
        };
    }

    run_with_shutdown(updater).await;
    info!("immich-hass stopped");
    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter_directive()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
