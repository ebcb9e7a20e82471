//! # immich-hass
//!
//! Keeps a Home Assistant media folder stocked with photos from an Immich
//! server. Every update interval the next filter set in the rotation picks a
//! batch of assets, the batch is downloaded as one archive, HEIC files are
//! converted to JPEG (or MP4), and the folder is replaced with the new set.
//!
//! ## Quick Start
//!
//! ```no_run
//! use immich_hass::{
//!     CliMediaConverter, Config, ImmichClient, MediaConverter, NoOpMediaConverter,
//!     PersonDirectory, PhotoUpdater, run_with_shutdown,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.immich.url = "http://immich.local:2283".to_string();
//!     config.immich.api_key = "api-key".to_string();
//!     config.validate()?;
//!
//!     let client = Arc::new(ImmichClient::new(&config.immich)?);
//!     let people = PersonDirectory::fetch(client.as_ref()).await?;
//!     let converter: Arc<dyn MediaConverter> = match CliMediaConverter::from_path() {
//!         Some(cli) => Arc::new(cli),
//!         None => Arc::new(NoOpMediaConverter),
//!     };
//!
//!     let updater = PhotoUpdater::new(config, client, converter, people);
//!
//!     // Subscribe to events
//!     let mut events = updater.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     run_with_shutdown(updater).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types and loading
pub mod config;
/// Error types
pub mod error;
/// Photo server API surface
pub mod immich;
/// Archive extraction and HEIC conversion
pub mod media;
/// Display-name to person-id lookup
pub mod people;
/// Publish directory housekeeping
pub mod publish;
/// Asset selection strategies
pub mod selection;
/// Core types and events
pub mod types;
/// Refresh orchestrator
pub mod updater;
/// Utility functions
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Args, Config, FilterSpec, ImmichSettings, LogLevel, SelectorKind};
pub use error::{Error, MediaError, RemoteError, Result};
pub use immich::{ImmichClient, PhotoServer, SearchCriteria, SearchFilters};
pub use media::{
    CliMediaConverter, MediaConverter, MediaKind, NoOpMediaConverter, ProcessedFile,
};
pub use people::PersonDirectory;
pub use selection::AssetSelector;
pub use types::{AssetId, CycleOutcome, CycleReport, CycleStage, Event};
pub use updater::PhotoUpdater;

use tokio_util::sync::CancellationToken;

/// Run refresh cycles until SIGTERM or SIGINT (ctrl-c off Unix)
///
/// A cycle in progress is allowed to finish; the wait between cycles is cut short.
pub async fn run_with_shutdown(updater: PhotoUpdater) {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    let signals = tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
    });

    updater.run(shutdown).await;
    signals.abort();
}

/// Resolves once the process is asked to stop
///
/// A listener that cannot be installed is logged and never fires, so a failed
/// registration never stops the updater by itself.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = terminate => tracing::info!(signal = "SIGTERM", "shutdown requested"),
        _ = interrupt() => tracing::info!(signal = "SIGINT", "shutdown requested"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    interrupt().await;
    tracing::info!(signal = "ctrl-c", "shutdown requested");
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
