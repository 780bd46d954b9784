//! The editing session.
//!
//! [`Editor`] owns every piece of mutable session state: the phase, the
//! history, the displayed image, the viewport, the drag selection and the
//! in-flight job. Input handlers call its methods; nothing else writes these.
//!
//! While the phase is busy (converting, analyzing, enhancing, exporting)
//! selection, undo/redo, new enhancements and export are all rejected.

use crate::config::EditorSettings;
use crate::error::{AppError, Result};
use crate::export::{GifOptions, encode_still, render_zoom_gif};
use crate::handle::ImageHandle;
use crate::history::{History, HistoryStep, ImageDescription};
use crate::image_processing::ImageProcessor;
use crate::orchestrator::{EnhancementJob, JobContext, JobKind, JobStage, Orchestrator};
use crate::services::{
    DescriptionService, Dials, EnhancementService, FormatConverter, SettingsAdvisor,
    needs_conversion,
};
use crate::viewport::{
    CanvasFit, Point, Rect, SelectionDrag, SelectionEvent, ViewportTransform, ZoomDirection,
    fit_image_to_canvas, image_rect_to_screen,
};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, warn};

/// Coarse state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorPhase {
    /// No image loaded.
    AwaitingInput,
    /// Converting an imported file into a decodable format.
    Converting,
    /// An image is displayed and the editor accepts input.
    Ready,
    /// Waiting for the settings advisor.
    Analyzing,
    /// A job is running or its reveal has not finished.
    Enhancing,
    Exporting,
}

impl EditorPhase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Converting | Self::Analyzing | Self::Enhancing | Self::Exporting)
    }
}

pub struct Editor {
    settings: EditorSettings,
    phase: EditorPhase,
    history: History,
    current_image: Option<ImageHandle>,
    viewport: ViewportTransform,
    canvas: (f64, f64),
    selection: SelectionDrag,
    job: Option<EnhancementJob>,
    dials: Dials,
    seek_easter_egg: bool,
    easter_egg_found: bool,
    error: Option<String>,
}

impl Editor {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            settings,
            phase: EditorPhase::AwaitingInput,
            history: History::new(),
            current_image: None,
            viewport: ViewportTransform::IDENTITY,
            canvas: (1280.0, 720.0),
            selection: SelectionDrag::default(),
            job: None,
            dials: Dials::default(),
            seek_easter_egg: false,
            easter_egg_found: false,
            error: None,
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn phase(&self) -> EditorPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The image on the canvas. Lags behind history while a reveal is pending.
    pub fn current_image(&self) -> Option<&ImageHandle> {
        self.current_image.as_ref()
    }

    pub fn job(&self) -> Option<&EnhancementJob> {
        self.job.as_ref()
    }

    pub fn viewport(&self) -> ViewportTransform {
        self.viewport
    }

    pub fn dials(&self) -> Dials {
        self.dials
    }

    pub fn set_dials(&mut self, dials: Dials) {
        self.dials = dials;
    }

    pub fn set_seek_easter_egg(&mut self, seek: bool) {
        self.seek_easter_egg = seek;
    }

    pub fn easter_egg_found(&self) -> bool {
        self.easter_egg_found
    }

    /// The single error banner, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn report(&mut self, err: &AppError) {
        warn!(error = %err, "editor error");
        self.error = Some(err.user_message());
    }

    // -- Image intake -------------------------------------------------------

    /// Imports encoded bytes, converting HEIC/HEIF first.
    ///
    /// Returns `Ok(false)` when rejected because the editor is busy. On
    /// conversion or decode failure the previous image and phase are kept.
    pub async fn load_image<C: FormatConverter>(
        &mut self,
        bytes: Vec<u8>,
        declared_type: &str,
        converter: &C,
    ) -> Result<bool> {
        if self.is_busy() {
            return Ok(false);
        }
        let previous = self.phase;

        let bytes = if needs_conversion(declared_type) {
            self.phase = EditorPhase::Converting;
            info!(declared_type, "converting image");
            match converter.convert(bytes, declared_type).await {
                Ok(converted) => converted,
                Err(e) => {
                    self.phase = previous;
                    self.report(&e);
                    return Err(e);
                }
            }
        } else {
            bytes
        };

        let decoded = tokio::task::spawn_blocking(move || ImageProcessor::decode(&bytes))
            .await
            .map_err(|e| AppError::decode(format!("decode task failed: {}", e)))
            .and_then(|r| r);
        match decoded {
            Ok(image) => {
                self.load_decoded(image);
                Ok(true)
            }
            Err(e) => {
                self.phase = previous;
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Starts a fresh session on an already decoded image.
    pub fn load_decoded(&mut self, image: DynamicImage) {
        let handle = ImageHandle::new(image);
        info!(id = handle.id(), w = handle.width(), h = handle.height(), "image loaded");
        self.history.reset(HistoryStep::root(handle.clone()));
        self.job = None;
        self.selection = SelectionDrag::default();
        self.easter_egg_found = false;
        self.error = None;
        self.replace_current_image(handle);
        self.phase = EditorPhase::Ready;
    }

    /// Tears the session down to the no-image state.
    pub fn reset(&mut self) {
        self.history.clear();
        self.job = None;
        self.selection = SelectionDrag::default();
        self.current_image = None;
        self.viewport = ViewportTransform::IDENTITY;
        self.easter_egg_found = false;
        self.phase = EditorPhase::AwaitingInput;
    }

    fn replace_current_image(&mut self, handle: ImageHandle) {
        // The previous handle is released here, after nothing displays it anymore
        if let Some(old) = self.current_image.replace(handle) {
            debug!(released = old.id(), "current image replaced");
        }
        self.viewport = ViewportTransform::IDENTITY;
    }

    // -- Viewport and selection ---------------------------------------------

    pub fn resize_canvas(&mut self, width: f64, height: f64) {
        self.canvas = (width.max(1.0), height.max(1.0));
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        self.canvas
    }

    /// Fit of the current image into the canvas, recomputed on every call.
    pub fn fit(&self) -> CanvasFit {
        match &self.current_image {
            Some(img) => fit_image_to_canvas(
                img.width() as f64,
                img.height() as f64,
                self.canvas.0,
                self.canvas.1,
            ),
            None => CanvasFit::IDENTITY,
        }
    }

    pub fn wheel(&mut self, pivot: Point, delta_y: f64) {
        if let Some(direction) = ZoomDirection::from_wheel_delta(delta_y) {
            self.viewport = self.viewport.apply_zoom(pivot, direction);
        }
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport = self.viewport.pan_by(dx, dy);
    }

    fn accepts_selection(&self) -> bool {
        self.current_image.is_some() && !self.is_busy()
    }

    pub fn pointer_down(&mut self, screen: Point) -> SelectionEvent {
        if !self.accepts_selection() {
            return SelectionEvent::None;
        }
        let fit = self.fit();
        self.selection.begin(screen, &self.viewport, &fit)
    }

    pub fn pointer_move(&mut self, screen: Point) -> SelectionEvent {
        if !self.accepts_selection() {
            return SelectionEvent::None;
        }
        let fit = self.fit();
        self.selection.update(screen, &self.viewport, &fit)
    }

    /// Ends a drag. A completed rect is clipped to the image before being reported.
    ///
    /// A drag still open when the editor went busy is dropped.
    pub fn pointer_up(&mut self) -> SelectionEvent {
        if !self.accepts_selection() {
            self.selection = SelectionDrag::default();
            return SelectionEvent::None;
        }
        let event = self.selection.release(self.settings.min_selection_size);
        match (event, &self.current_image) {
            (SelectionEvent::Completed(rect), Some(img)) => {
                let clipped = rect.clamp_to(img.width() as f64, img.height() as f64);
                if clipped.is_degenerate(self.settings.min_selection_size) {
                    SelectionEvent::Cancelled
                } else {
                    SelectionEvent::Completed(clipped)
                }
            }
            (event, _) => event,
        }
    }

    /// Escape during a drag.
    pub fn cancel_selection(&mut self) -> SelectionEvent {
        self.selection.cancel()
    }

    /// The in-progress drag rect, in image space.
    pub fn selection_rect(&self) -> Option<Rect> {
        self.selection.rect()
    }

    /// The in-progress drag rect where it is drawn, in screen space.
    pub fn selection_screen_rect(&self) -> Option<Rect> {
        let rect = self.selection.rect()?;
        Some(image_rect_to_screen(&rect, &self.viewport, &self.fit()))
    }

    // -- History navigation -------------------------------------------------

    pub fn undo(&mut self) -> bool {
        if self.is_busy() || !self.history.undo() {
            return false;
        }
        self.show_history_current();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.is_busy() || !self.history.redo() {
            return false;
        }
        self.show_history_current();
        true
    }

    fn show_history_current(&mut self) {
        if let Some(step) = self.history.current() {
            let handle = step.image.clone();
            self.replace_current_image(handle);
        }
    }

    // -- Enhancement --------------------------------------------------------

    /// Creates the job for a confirmed selection and shows its placeholder.
    ///
    /// Returns `Ok(false)` if the editor cannot start a job right now.
    pub fn begin_enhancement(&mut self, rect: Rect) -> Result<bool> {
        if !self.accepts_selection() || rect.is_degenerate(self.settings.min_selection_size) {
            return Ok(false);
        }
        let Some(source) = self.current_image.clone() else {
            return Ok(false);
        };
        self.start_job(JobKind::Selection, source, rect)?;
        Ok(true)
    }

    fn start_job(&mut self, kind: JobKind, source: ImageHandle, rect: Rect) -> Result<()> {
        let job = EnhancementJob::prepare(kind, source, rect, self.canvas, &self.settings)
            .inspect_err(|e| self.report(e))?;
        self.selection = SelectionDrag::default();
        self.job = Some(job);
        self.phase = EditorPhase::Enhancing;
        Ok(())
    }

    /// Runs the pending job to completion or failure.
    ///
    /// On success the step is committed and the job waits for
    /// [`Editor::complete_reveal`]. On failure the job is discarded, the
    /// banner is set and the editor returns to its last stable image.
    pub async fn run_job<S>(&mut self, services: &S) -> Result<bool>
    where
        S: DescriptionService + EnhancementService,
    {
        let Some(mut job) = self.job.take() else {
            return Ok(false);
        };
        if job.stage != JobStage::SelectionPending {
            self.job = Some(job);
            return Ok(false);
        }

        let context = self.job_context(&job.kind);
        let outcome = Orchestrator::new(services, &self.settings).run(&mut job, context).await;

        match outcome {
            Ok(step) => {
                let committed = if job.kind.replaces_current() {
                    self.history.commit_replace(step)
                } else {
                    self.history.commit_new(step)
                };
                if !committed {
                    warn!("history rejected the settled step");
                    self.phase = self.stable_phase();
                    return Ok(false);
                }
                self.easter_egg_found |= job.found_easter_egg;
                job.stage = JobStage::Committed;
                self.job = Some(job);
                Ok(true)
            }
            Err(e) => {
                self.phase = self.stable_phase();
                self.report(&e);
                Err(e)
            }
        }
    }

    fn stable_phase(&self) -> EditorPhase {
        if self.current_image.is_some() {
            EditorPhase::Ready
        } else {
            EditorPhase::AwaitingInput
        }
    }

    fn job_context(&self, kind: &JobKind) -> JobContext {
        let history = &self.history;
        let (prior_descriptions, prior_prompts) = match (kind, history.current_index()) {
            // The replaced step's own prompt must not feed its regeneration
            (JobKind::Regeneration { .. }, Some(i)) => {
                (history.descriptions_before(i), history.prompts_before(i))
            }
            _ => (history.descriptions_through_current(), history.prompt_context()),
        };
        JobContext {
            prior_descriptions,
            prior_prompts,
            dials: self.dials,
            seek_easter_egg: self.seek_easter_egg,
        }
    }

    /// Called when the pixelated-to-enhanced transition has finished playing.
    pub fn complete_reveal(&mut self) -> bool {
        match &self.job {
            Some(job) if job.stage == JobStage::Committed => {}
            _ => return false,
        }
        self.job = None;
        self.show_history_current();
        self.phase = EditorPhase::Ready;
        true
    }

    /// Selection confirmation through commit, in one call.
    pub async fn enhance_selection<S>(&mut self, rect: Rect, services: &S) -> Result<bool>
    where
        S: DescriptionService + EnhancementService,
    {
        if !self.begin_enhancement(rect)? {
            return Ok(false);
        }
        self.run_job(services).await
    }

    /// Recomputes the current step from its parent with `prompt`.
    ///
    /// Rejected at the root. Later steps are kept.
    pub async fn regenerate<S>(&mut self, prompt: &str, services: &S) -> Result<bool>
    where
        S: DescriptionService + EnhancementService,
    {
        if self.is_busy() {
            return Ok(false);
        }
        let (Some(step), Some(parent)) =
            (self.history.current(), self.history.parent_of_current())
        else {
            return Ok(false);
        };
        let (Some(rect), Some(previous)) = (step.original_rect, step.description.as_ref()) else {
            return Ok(false);
        };

        let description = ImageDescription {
            selection_description: previous.selection_description.clone(),
            prompt: prompt.to_string(),
        };
        let source = parent.image.clone();
        info!(index = ?self.history.current_index(), "regenerating step");

        self.start_job(JobKind::Regeneration { description }, source, rect)?;
        self.run_job(services).await
    }

    /// Enhances the whole current image with advisor-recommended dials.
    pub async fn auto_enhance<S>(&mut self, services: &S) -> Result<bool>
    where
        S: DescriptionService + EnhancementService + SettingsAdvisor,
    {
        if !self.accepts_selection() {
            return Ok(false);
        }
        let Some(source) = self.current_image.clone() else {
            return Ok(false);
        };

        self.phase = EditorPhase::Analyzing;
        let recommended = Orchestrator::new(services, &self.settings)
            .recommend_dials(source.image())
            .await;
        let dials = match recommended {
            Ok(dials) => dials,
            Err(e) => {
                self.phase = self.stable_phase();
                self.report(&e);
                return Err(e);
            }
        };
        self.dials = dials;

        let full = Rect::full(source.width(), source.height());
        if let Err(e) = self.start_job(JobKind::FullImage, source, full) {
            self.phase = self.stable_phase();
            return Err(e);
        }
        self.run_job(services).await
    }

    // -- Export -------------------------------------------------------------

    /// Encodes the current step. `Ok(None)` when busy or empty.
    pub fn export_still(&mut self, format: ImageFormat) -> Result<Option<Vec<u8>>> {
        if self.is_busy() {
            return Ok(None);
        }
        let Some(step) = self.history.current() else {
            return Ok(None);
        };
        encode_still(step, format).map(Some)
    }

    /// Renders the zoom animation up to the current step. `Ok(None)` when busy or empty.
    pub async fn export_gif(&mut self, options: GifOptions) -> Result<Option<Vec<u8>>> {
        if self.is_busy() || self.history.is_empty() {
            return Ok(None);
        }
        let snapshot: Vec<HistoryStep> = self.history.through_current().to_vec();
        self.phase = EditorPhase::Exporting;

        let result = tokio::task::spawn_blocking(move || render_zoom_gif(&snapshot, &options))
            .await
            .map_err(|e| AppError::export(format!("export task failed: {}", e)))
            .and_then(|r| r);

        self.phase = self.stable_phase();
        match result {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}
