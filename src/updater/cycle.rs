//! One refresh cycle

use super::PhotoUpdater;
use crate::config::FilterSpec;
use crate::error::Error;
use crate::media::{extract_archive, process_batch, remove_converted_originals};
use crate::publish::{archive_path, clean_publish_dir, save_archive};
use crate::selection::AssetSelector;
use crate::types::{CycleOutcome, CycleReport, CycleStage, Event};
use crate::utils::remove_file_if_exists;
use chrono::Local;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Error tagged with the stage that produced it
struct StageError {
    stage: CycleStage,
    error: Error,
}

trait AtStage<T> {
    fn at(self, stage: CycleStage) -> Result<T, StageError>;
}

impl<T, E: Into<Error>> AtStage<T> for Result<T, E> {
    fn at(self, stage: CycleStage) -> Result<T, StageError> {
        self.map_err(|e| StageError {
            stage,
            error: e.into(),
        })
    }
}

impl PhotoUpdater {
    /// Run one refresh cycle with the filter set at the cursor
    ///
    /// On success the cursor advances to the next filter set. On failure the
    /// archive is removed if present and the cursor stays put, so the same
    /// filter set is retried next time.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let archive = archive_path(&self.config.publish_dir);
        let index = self.cursor;

        let Some(spec) = self.config.filters.get(index).cloned() else {
            let error = Error::config("filters", "no filter set at the rotation cursor");
            return self
                .fail(String::new(), CycleStage::SelectingFilter, error, &archive)
                .await;
        };

        info!(filter = %spec.name, index, "starting refresh cycle");
        info!("{}", spec);
        self.emit_event(Event::CycleStarted {
            filter: spec.name.clone(),
            index,
        });

        match self.execute(&spec, &archive).await {
            Ok(report) => {
                self.last_update = Some(report.finished_at);
                self.cursor = (index + 1) % self.config.filters.len();

                info!(
                    filter = %spec.name,
                    published = report.published.len(),
                    skipped = report.skipped,
                    "refresh cycle completed"
                );
                if let Some(next) = self.current_filter() {
                    info!(next = %next.name, "next cycle will use: {}", next);
                }

                self.emit_event(Event::CycleCompleted {
                    filter: spec.name.clone(),
                    published: report.published.len(),
                    skipped: report.skipped,
                });
                CycleOutcome::Completed(report)
            }
            Err(StageError { stage, error }) => self.fail(spec.name, stage, error, &archive).await,
        }
    }

    async fn execute(&self, spec: &FilterSpec, archive: &Path) -> Result<CycleReport, StageError> {
        debug!(stage = %CycleStage::SelectingFilter, filter = %spec.name, "resolving people");
        let person_ids = self.people.resolve(&spec.people);

        debug!(stage = %CycleStage::BuildingStrategy, kind = %spec.selector_kind, "building selector");
        let selector = AssetSelector::build(spec, person_ids).at(CycleStage::BuildingStrategy)?;

        self.refresh(spec, &selector, archive).await
    }

    async fn refresh(
        &self,
        spec: &FilterSpec,
        selector: &AssetSelector,
        archive: &Path,
    ) -> Result<CycleReport, StageError> {
        let publish_dir = self.config.publish_dir.as_path();

        clean_publish_dir(publish_dir)
            .await
            .at(CycleStage::CleaningPublishDir)?;

        let ids = selector
            .select_assets(self.server.as_ref(), self.config.num_photos)
            .await
            .at(CycleStage::FetchingIds)?;

        if ids.is_empty() {
            warn!(
                filter = %spec.name,
                "no assets matched the filter set, requesting an empty archive"
            );
        }

        let bytes = self
            .server
            .download_archive(&ids)
            .await
            .at(CycleStage::Downloading)?;
        save_archive(archive, &bytes)
            .await
            .at(CycleStage::SavingArchive)?;
        drop(bytes);

        let extracted = extract_archive(archive, publish_dir)
            .await
            .at(CycleStage::Extracting)?;

        debug!(stage = %CycleStage::Converting, files = extracted.len(), "processing files");
        let processed = process_batch(&extracted, publish_dir, self.converter.as_ref()).await;

        let removed = remove_converted_originals(&processed).await;
        remove_file_if_exists(archive)
            .await
            .map_err(|e| Error::filesystem("delete archive", archive, e))
            .at(CycleStage::Cleanup)?;
        debug!(stage = %CycleStage::Cleanup, removed, "removed converted originals and archive");

        Ok(CycleReport {
            filter: spec.name.clone(),
            selected: ids.len(),
            extracted: extracted.len(),
            skipped: extracted.len() - processed.len(),
            published: processed.into_iter().map(|p| p.output).collect(),
            finished_at: Local::now(),
        })
    }

    async fn fail(
        &self,
        filter: String,
        stage: CycleStage,
        error: Error,
        archive: &Path,
    ) -> CycleOutcome {
        // Secondary failures must not mask the original error
        match remove_file_if_exists(archive).await {
            Ok(true) => debug!(?archive, "removed archive of failed cycle"),
            Ok(false) => {}
            Err(e) => debug!(?archive, error = %e, "could not remove archive of failed cycle"),
        }

        error!(
            filter = %filter,
            %stage,
            error = %error,
            code = error.error_code(),
            "refresh cycle failed"
        );
        self.emit_event(Event::CycleFailed {
            filter: filter.clone(),
            stage,
            error: error.to_string(),
        });

        CycleOutcome::Failed {
            filter,
            stage,
            error,
        }
    }
}
