pub mod external;
pub mod watermark;

pub use external::{HttpImageGenerator, ImageGenerator};
pub use watermark::{PassthroughWatermark, PngOverlayWatermark, Watermark};

use std::path::PathBuf;
use std::sync::Arc;

use crate::clock::Clock;
use crate::errors::KioskError;
use crate::models::{BackgroundCatalog, GenerationJob};
use crate::registry::{KioskStatsBoard, SessionRegistry};

// ---------------------------------------------------------------------------
// Orchestrator — resolve, generate, watermark, persist, record
// ---------------------------------------------------------------------------

/// The result of one successful generation: a servable artifact.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Path under which the artifact is served, e.g. `/outputs/foo.png`.
    pub image: String,
    pub file_name: String,
}

/// Drives an admitted job through the full pipeline and keeps the
/// session registry and kiosk stats in sync with the outcome.
///
/// The external generator is invoked exactly once per job; any failure
/// at any step marks the session failed and is re-raised to the caller.
pub struct Orchestrator {
    catalog: Arc<BackgroundCatalog>,
    generator: Arc<dyn ImageGenerator>,
    watermark: Arc<dyn Watermark>,
    registry: Arc<SessionRegistry>,
    stats: Arc<KioskStatsBoard>,
    clock: Arc<dyn Clock>,
    output_dir: PathBuf,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<BackgroundCatalog>,
        generator: Arc<dyn ImageGenerator>,
        watermark: Arc<dyn Watermark>,
        registry: Arc<SessionRegistry>,
        stats: Arc<KioskStatsBoard>,
        clock: Arc<dyn Clock>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            catalog,
            generator,
            watermark,
            registry,
            stats,
            clock,
            output_dir,
        }
    }

    pub async fn execute(&self, job: GenerationJob) -> Result<GenerationOutcome, KioskError> {
        match self.run_pipeline(&job).await {
            Ok(outcome) => {
                let now = self.clock.now();
                self.registry
                    .complete(job.id, outcome.image.clone(), now)
                    .await;
                self.stats.record_completed(&job.kiosk_id).await;
                tracing::info!(
                    "Generation for session {} completed as {}",
                    job.id,
                    outcome.file_name
                );
                Ok(outcome)
            }
            Err(e) => {
                let now = self.clock.now();
                self.registry.fail(job.id, e.to_string(), now).await;
                self.stats.record_failed(&job.kiosk_id).await;
                tracing::error!("Generation for session {} failed: {}", job.id, e);
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, job: &GenerationJob) -> Result<GenerationOutcome, KioskError> {
        let background = self
            .catalog
            .get(&job.background_id)
            .ok_or_else(|| KioskError::InvalidBackground(job.background_id.clone()))?;

        let generated = self
            .generator
            .generate(&job.image, &job.mime, background, &job.options)
            .await?;

        // Image decode and composite are CPU-bound; keep them off the
        // runtime workers.
        let watermark = Arc::clone(&self.watermark);
        let stamped = tokio::task::spawn_blocking(move || watermark.apply(generated))
            .await
            .map_err(|e| KioskError::Persistence(format!("watermark task failed: {}", e)))??;

        let file_name = format!(
            "{}_{}_{}.png",
            job.kiosk_id,
            job.submitted_at.format("%Y%m%d%H%M%S"),
            &job.id.to_string()[..8]
        );
        tokio::fs::write(self.output_dir.join(&file_name), &stamped).await?;

        Ok(GenerationOutcome {
            image: format!("/outputs/{}", file_name),
            file_name,
        })
    }
}
