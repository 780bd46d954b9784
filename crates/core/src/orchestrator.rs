//! One enhancement attempt, from confirmed selection to a history step.
//!
//! A job moves strictly forward:
//!
//! ```text
//! SelectionPending -> Compositing -> AwaitingDescription -> AwaitingEnhancement
//!                  -> AwaitingResultDecode -> Settling -> Committed
//! ```
//!
//! Any failure after `SelectionPending` lands in `Errored`. Nothing is written
//! to history here; the editor commits the returned step and later swaps the
//! displayed image once the reveal has played.

use crate::config::EditorSettings;
use crate::error::{AppError, Result};
use crate::handle::ImageHandle;
use crate::history::{HistoryStep, ImageDescription};
use crate::image_processing::ImageProcessor;
use crate::region::{inverse_map, layout_in_viewport, pad_rect, target_dimensions};
use crate::services::{
    DescriptionService, Dials, EnhancementRequest, EnhancementService, SettingsAdvisor,
};
use crate::viewport::Rect;
use image::DynamicImage;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    SelectionPending,
    Compositing,
    AwaitingDescription,
    AwaitingEnhancement,
    AwaitingResultDecode,
    Settling,
    Committed,
    Errored,
}

/// What started the job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    /// A user-drawn selection in the current image.
    Selection,
    /// Recompute the current step from its parent with a new prompt.
    Regeneration { description: ImageDescription },
    /// Enhance the whole current image.
    FullImage,
}

impl JobKind {
    pub fn replaces_current(&self) -> bool {
        matches!(self, Self::Regeneration { .. })
    }
}

/// In-flight state of one enhancement attempt.
#[derive(Debug, Clone)]
pub struct EnhancementJob {
    pub kind: JobKind,
    pub stage: JobStage,
    /// Selection in the pixel space of `source`.
    pub original_rect: Rect,
    /// The image the selection was drawn on.
    pub source: ImageHandle,
    /// The selection cropped out of `source` at native resolution.
    pub preview_composite: DynamicImage,
    /// Pixelated stand-in, sized to `screen_rect`.
    pub low_res_preview: DynamicImage,
    /// Where the result will be shown, in viewport pixels.
    pub screen_rect: Rect,
    /// Set once the backend has answered and the final crop is made.
    pub result: Option<ImageHandle>,
    pub found_easter_egg: bool,
}

impl EnhancementJob {
    /// Builds the placeholder and final layout. Runs before any backend call.
    pub fn prepare(
        kind: JobKind,
        source: ImageHandle,
        original_rect: Rect,
        viewport: (f64, f64),
        settings: &EditorSettings,
    ) -> Result<Self> {
        let (src_w, src_h) = (source.width() as f64, source.height() as f64);
        let original_rect = original_rect.clamp_to(src_w, src_h);
        let preview_composite = ImageProcessor::crop(source.image(), &original_rect)?;

        let screen_rect = layout_in_viewport(
            original_rect.aspect_ratio(),
            viewport.0,
            viewport.1,
            settings.layout_edge_padding,
        );
        let low_res_preview = ImageProcessor::pixelate(
            &preview_composite,
            screen_rect.w.round().max(1.0) as u32,
            screen_rect.h.round().max(1.0) as u32,
            settings.placeholder_block,
        );

        debug!(?kind, ?original_rect, ?screen_rect, "job prepared");
        Ok(Self {
            kind,
            stage: JobStage::SelectionPending,
            original_rect,
            source,
            preview_composite,
            low_res_preview,
            screen_rect,
            result: None,
            found_easter_egg: false,
        })
    }
}

/// Context that lives in history rather than in the job.
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    /// Descriptions of the steps the source image descends from.
    pub prior_descriptions: Vec<ImageDescription>,
    /// Prompts of the steps the source image descends from, oldest first.
    pub prior_prompts: Vec<String>,
    pub dials: Dials,
    pub seek_easter_egg: bool,
}

/// Sequences the backend calls of a job.
pub struct Orchestrator<'a, S> {
    services: &'a S,
    settings: &'a EditorSettings,
}

impl<'a, S> Orchestrator<'a, S> {
    pub fn new(services: &'a S, settings: &'a EditorSettings) -> Self {
        Self { services, settings }
    }
}

impl<S> Orchestrator<'_, S>
where
    S: DescriptionService + EnhancementService,
{
    /// Drives `job` to `Settling` and returns the step to commit.
    ///
    /// On failure the job is left in `Errored` and nothing is returned.
    pub async fn run(&self, job: &mut EnhancementJob, context: JobContext) -> Result<HistoryStep> {
        match self.run_stages(job, context).await {
            Ok(step) => Ok(step),
            Err(e) => {
                warn!(stage = ?job.stage, error = %e, "enhancement failed");
                job.stage = JobStage::Errored;
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        job: &mut EnhancementJob,
        context: JobContext,
    ) -> Result<HistoryStep> {
        let source_handle = job.source.clone();
        let source = source_handle.image();
        let (src_w, src_h) = (source.width() as f64, source.height() as f64);

        job.stage = JobStage::Compositing;
        let padded = match job.kind {
            // Padding is meaningless at full extent
            JobKind::FullImage => job.original_rect,
            _ => pad_rect(&job.original_rect, src_w, src_h, self.settings.padding_factor),
        };
        // The backend is sent whole pixels, so the inverse map must use the same extent
        let padded = padded
            .snap_to_pixels(source.width(), source.height())
            .ok_or(AppError::EmptySelection)?;
        let (req_w, req_h) = target_dimensions(&padded, self.settings.request_long_edge);
        let request_image = ImageProcessor::crop_resized(source, &padded, req_w, req_h)?;
        debug!(?padded, req_w, req_h, "request crop ready");

        let description = match &job.kind {
            JobKind::Regeneration { description } => description.clone(),
            kind => {
                job.stage = JobStage::AwaitingDescription;
                self.services
                    .describe(
                        &job.preview_composite,
                        &context.prior_descriptions,
                        matches!(kind, JobKind::FullImage),
                    )
                    .await?
            }
        };

        job.stage = JobStage::AwaitingEnhancement;
        let mut prompt_history = context.prior_prompts;
        prompt_history.push(description.prompt.clone());
        let output = self
            .services
            .enhance(EnhancementRequest {
                image: request_image,
                prompt_history,
                seek_easter_egg: context.seek_easter_egg,
                dials: context.dials,
            })
            .await?;
        job.found_easter_egg = output.found_easter_egg;

        job.stage = JobStage::AwaitingResultDecode;
        let bytes = output.image_bytes;
        let decoded = tokio::task::spawn_blocking(move || ImageProcessor::decode(&bytes))
            .await
            .map_err(|e| AppError::decode(format!("decode task failed: {}", e)))??;

        job.stage = JobStage::Settling;
        let crop = inverse_map(&job.original_rect, &padded, decoded.width(), decoded.height());
        let (final_w, final_h) =
            target_dimensions(&job.original_rect, self.settings.final_long_edge);
        let final_image = ImageProcessor::crop_resized(&decoded, &crop, final_w, final_h)?;
        info!(
            result_w = decoded.width(),
            result_h = decoded.height(),
            ?crop,
            final_w,
            final_h,
            "enhancement settled"
        );

        let handle = ImageHandle::new(final_image);
        job.result = Some(handle.clone());
        Ok(HistoryStep::enhancement(handle, description, job.original_rect))
    }
}

impl<S> Orchestrator<'_, S>
where
    S: SettingsAdvisor,
{
    /// Asks the advisor for dials suited to `image`.
    pub async fn recommend_dials(&self, image: &DynamicImage) -> Result<Dials> {
        let dials = self.services.recommend(image).await?;
        info!(?dials, "advisor recommended dials");
        Ok(dials)
    }
}
