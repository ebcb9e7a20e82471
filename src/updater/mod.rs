//! Refresh orchestrator
//!
//! [`PhotoUpdater`] owns the rotation cursor and drives one refresh cycle per
//! tick: pick the next filter set, fetch matching assets, publish them, clean up.
//!
//! # Example
//!
//! ```no_run
//! use immich_hass::{Config, ImmichClient, NoOpMediaConverter, PersonDirectory, PhotoUpdater};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(config: Config) -> immich_hass::Result<()> {
//! let client = Arc::new(ImmichClient::new(&config.immich)?);
//! let people = PersonDirectory::fetch(client.as_ref()).await?;
//! let updater = PhotoUpdater::new(config, client, Arc::new(NoOpMediaConverter), people);
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(updater.run(shutdown.clone()));
//! // ...
//! shutdown.cancel();
//! # Ok(())
//! # }
//! ```

mod cycle;

use crate::config::{Config, FilterSpec};
use crate::immich::PhotoServer;
use crate::media::MediaConverter;
use crate::people::PersonDirectory;
use crate::publish::archive_path;
use crate::types::{CycleOutcome, Event};
use crate::utils::remove_file_if_exists;
use chrono::{DateTime, Local};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Wait before retrying after a failed cycle
pub const ERROR_BACKOFF: Duration = Duration::from_secs(60);

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Periodic photo refresher
///
/// Cross-cycle state is limited to the rotation cursor and the time of the last
/// successful cycle. Cycles take `&mut self`, so two never overlap.
pub struct PhotoUpdater {
    config: Config,
    server: Arc<dyn PhotoServer>,
    converter: Arc<dyn MediaConverter>,
    people: PersonDirectory,
    cursor: usize,
    last_update: Option<DateTime<Local>>,
    event_tx: broadcast::Sender<Event>,
    interval: Duration,
    error_backoff: Duration,
}

impl PhotoUpdater {
    /// Create an updater starting at the first filter set
    ///
    /// `config` is expected to be validated already.
    pub fn new(
        config: Config,
        server: Arc<dyn PhotoServer>,
        converter: Arc<dyn MediaConverter>,
        people: PersonDirectory,
    ) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let interval = config.update_interval();
        Self {
            config,
            server,
            converter,
            people,
            cursor: 0,
            last_update: None,
            event_tx,
            interval,
            error_backoff: ERROR_BACKOFF,
        }
    }

    /// Override the wait after a successful cycle
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the wait after a failed cycle
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Subscribe to cycle events
    ///
    /// Events emitted before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Index of the filter set the next cycle will use
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// When the last successful cycle finished
    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_update
    }

    /// The filter set the next cycle will use
    pub fn current_filter(&self) -> Option<&FilterSpec> {
        self.config.filters.get(self.cursor)
    }

    /// The configuration the updater runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the configured converter backend
    pub fn converter_name(&self) -> &'static str {
        self.converter.name()
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Run cycles until `shutdown` is cancelled
    ///
    /// After a completed cycle the updater waits the update interval, after a
    /// failed or panicking one the error backoff. Cancellation interrupts the
    /// wait but never a cycle in progress.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            filters = self.config.filters.len(),
            interval_secs = self.interval.as_secs(),
            converter = self.converter.name(),
            "photo updater started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let wait = match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(CycleOutcome::Completed(_)) => self.interval,
                Ok(CycleOutcome::Failed { .. }) => {
                    warn!(
                        retry_in_secs = self.error_backoff.as_secs(),
                        "retrying after error backoff"
                    );
                    self.error_backoff
                }
                Err(panic) => {
                    error!(
                        panic = %panic_message(panic.as_ref()),
                        "unexpected error during refresh cycle"
                    );
                    let archive = archive_path(&self.config.publish_dir);
                    remove_file_if_exists(&archive).await.ok();
                    self.error_backoff
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("photo updater stopped");
        self.emit_event(Event::Shutdown);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
