//! # Capture Session
//!
//! The state machine behind the capture screen.
//!
//! ```text
//!             capture                analyze
//! Streaming ──────────▶ Captured ──────────▶ Analyzing
//!     ▲                    │  ▲ completion / cancel │
//!     └──── retake ────────┘  └─────────────────────┘
//!     ▲                                             │
//!     └──────────────────── retake ─────────────────┘
//! ```
//!
//! Each user action returns a [`BakeResult`] and leaves a status line behind
//! in [`CaptureSession::status`]. Analysis runs as a tokio task tagged with a
//! generation number, so a result that arrives after a retake or cancel is
//! dropped instead of overwriting the newer state.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capture::FrameSource;
use crate::config::SessionSettings;
use crate::config::config::DEFAULT_CAPTURE_FILE;
use crate::error::{BakeError, BakeResult, ErrorSeverity, HasSeverity};
use crate::frame::{DEFAULT_JPEG_QUALITY, Frame};
use crate::identify::{Identification, IngredientIdentifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Live preview, nothing held
    Streaming,
    /// A frame is held and the preview is frozen
    Captured,
    /// The held frame is being identified
    Analyzing,
}

impl SessionState {
    fn describe(self) -> &'static str {
        match self {
            SessionState::Streaming => "streaming",
            SessionState::Captured => "holding a capture",
            SessionState::Analyzing => "analyzing",
        }
    }
}

struct PendingAnalysis {
    generation: u64,
    task: JoinHandle<()>,
}

struct Completion {
    generation: u64,
    outcome: BakeResult<Option<Identification>>,
}

pub struct CaptureSession {
    source: FrameSource,
    identifier: Arc<dyn IngredientIdentifier>,
    runtime: Handle,
    state: SessionState,
    held: Option<Arc<Frame>>,
    status: String,
    last_identification: Option<Identification>,
    capture_file: Option<PathBuf>,
    jpeg_quality: u8,
    analysis: Option<PendingAnalysis>,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    generation: u64,
    frame_skip: u32,
    tick: u64,
}

impl CaptureSession {
    pub fn builder() -> CaptureSessionBuilder {
        CaptureSessionBuilder::new()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Status line left by the last action.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn held_frame(&self) -> Option<&Arc<Frame>> {
        self.held.as_ref()
    }

    pub fn last_identification(&self) -> Option<&Identification> {
        self.last_identification.as_ref()
    }

    pub fn identifier_name(&self) -> &str {
        self.identifier.name()
    }

    /// Freeze the newest live frame.
    pub fn capture(&mut self) -> BakeResult<Arc<Frame>> {
        if self.state != SessionState::Streaming {
            return self.reject(self.invalid("capture"));
        }
        let Some(frame) = self.source.latest() else {
            return self.reject(BakeError::FrameUnavailable);
        };

        self.source.pause();
        if let Some(path) = &self.capture_file {
            match frame.save_jpeg(path, self.jpeg_quality) {
                Ok(()) => info!(path = %path.display(), "captured frame saved"),
                // the held frame is still usable for analysis
                Err(e) => warn!(path = %path.display(), error = %e, "failed to save captured frame"),
            }
        }

        debug!(sequence = frame.sequence, "frame captured");
        self.held = Some(Arc::clone(&frame));
        self.last_identification = None;
        self.state = SessionState::Captured;
        self.status = "Image captured.".to_string();
        Ok(frame)
    }

    /// Drop the held frame and go back to the live preview.
    pub fn retake(&mut self) {
        if self.state == SessionState::Streaming {
            return;
        }
        if let Some(pending) = self.analysis.take() {
            pending.task.abort();
            debug!(generation = pending.generation, "analysis abandoned by retake");
        }
        self.held = None;
        self.source.resume();
        self.tick = 0;
        self.state = SessionState::Streaming;
        self.status = "Resumed video stream.".to_string();
    }

    /// Start identifying the held frame in the background.
    pub fn analyze(&mut self) -> BakeResult<()> {
        if self.state == SessionState::Analyzing {
            return self.reject(self.invalid("analyze"));
        }
        let Some(frame) = self.held.clone() else {
            return self.reject(BakeError::NoCaptureYet);
        };

        self.generation += 1;
        let generation = self.generation;
        let identifier = Arc::clone(&self.identifier);
        let completions = self.completions_tx.clone();
        let task = self.runtime.spawn(async move {
            let outcome = identifier.identify(frame).await;
            // receiver gone means the session was dropped
            let _ = completions.send(Completion { generation, outcome });
        });

        info!(generation, backend = %self.identifier.name(), "analysis started");
        self.analysis = Some(PendingAnalysis { generation, task });
        self.state = SessionState::Analyzing;
        self.status = "Analyzing...".to_string();
        Ok(())
    }

    /// Apply a finished analysis, if any. Never blocks.
    ///
    /// Returns `true` when the state changed.
    pub fn poll_analysis(&mut self) -> bool {
        let mut applied = self.drain_completions();
        let finished = self
            .analysis
            .as_ref()
            .is_some_and(|pending| pending.task.is_finished());
        if finished {
            // the task sends before it finishes, so anything it sent is queued now
            applied |= self.drain_completions();
            if let Some(pending) = self.analysis.take() {
                warn!(generation = pending.generation, "analysis task ended without a result");
                self.state = SessionState::Captured;
                self.status = "Error: analysis task failed".to_string();
                applied = true;
            }
        }
        applied
    }

    /// Wait for the in-flight analysis and apply its outcome.
    pub async fn wait_for_analysis(&mut self) -> BakeResult<()> {
        if self.analysis.is_none() {
            return Err(self.invalid("wait for analysis"));
        }
        if let Some(pending) = self.analysis.as_mut() {
            if let Err(e) = (&mut pending.task).await {
                debug!(error = %e, "analysis task join failed");
            }
        }
        self.poll_analysis();
        Ok(())
    }

    /// Abort the in-flight analysis, keeping the held frame.
    pub fn cancel_analysis(&mut self) -> BakeResult<()> {
        let Some(pending) = self.analysis.take() else {
            return self.reject(self.invalid("cancel"));
        };
        pending.task.abort();
        info!(generation = pending.generation, "analysis cancelled");
        self.state = SessionState::Captured;
        self.status = BakeError::Cancelled.status_message();
        Ok(())
    }

    /// One-shot identification of the current frame without changing state.
    ///
    /// Uses the live frame while streaming and the held frame otherwise.
    pub async fn detect(&mut self) -> BakeResult<Identification> {
        let frame = match (&self.held, self.state) {
            (Some(held), SessionState::Captured | SessionState::Analyzing) => Some(Arc::clone(held)),
            _ => self.source.latest(),
        };
        let Some(frame) = frame else {
            return self.reject(BakeError::FrameUnavailable);
        };

        let identifier = Arc::clone(&self.identifier);
        match identifier.identify(frame).await {
            Ok(Some(identification)) => {
                self.status = identification.to_string();
                self.last_identification = Some(identification.clone());
                Ok(identification)
            }
            Ok(None) => self.reject(BakeError::NoDetection),
            Err(e) => self.reject(e),
        }
    }

    /// Frame to draw on this UI tick, `None` when nothing new should be drawn.
    pub fn display_frame(&mut self) -> Option<Arc<Frame>> {
        match self.state {
            SessionState::Streaming => {
                let render = self.tick % u64::from(self.frame_skip.max(1)) == 0;
                self.tick += 1;
                if render { self.source.latest() } else { None }
            }
            SessionState::Captured | SessionState::Analyzing => self.held.clone(),
        }
    }

    /// Stop any analysis and release the camera.
    pub fn shutdown(&mut self) {
        if let Some(pending) = self.analysis.take() {
            pending.task.abort();
        }
        self.source.shutdown();
    }

    fn drain_completions(&mut self) -> bool {
        let mut applied = false;
        while let Ok(completion) = self.completions_rx.try_recv() {
            applied |= self.apply(completion);
        }
        applied
    }

    fn apply(&mut self, completion: Completion) -> bool {
        let current = self.analysis.as_ref().map(|pending| pending.generation);
        if current != Some(completion.generation) {
            debug!(generation = completion.generation, "discarding stale analysis result");
            return false;
        }

        self.analysis = None;
        self.state = SessionState::Captured;
        match completion.outcome {
            Ok(Some(identification)) => {
                info!(result = %identification, "analysis finished");
                self.status = identification.to_string();
                self.last_identification = Some(identification);
            }
            Ok(None) => self.status = BakeError::NoDetection.status_message(),
            Err(e) => {
                warn!(error = %e, "analysis failed");
                self.status = e.status_message();
            }
        }
        true
    }

    fn invalid(&self, operation: &'static str) -> BakeError {
        BakeError::InvalidState {
            state: self.state.describe(),
            operation,
        }
    }

    fn reject<T>(&mut self, error: BakeError) -> BakeResult<T> {
        match error.severity() {
            ErrorSeverity::Info => debug!(error = %error, "action rejected"),
            _ => warn!(error = %error, "action failed"),
        }
        self.status = error.status_message();
        Err(error)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(pending) = self.analysis.take() {
            pending.task.abort();
        }
    }
}

/// Builder for [`CaptureSession`].
pub struct CaptureSessionBuilder {
    source: Option<FrameSource>,
    identifier: Option<Arc<dyn IngredientIdentifier>>,
    runtime: Option<Handle>,
    capture_file: Option<PathBuf>,
    jpeg_quality: u8,
    frame_skip: u32,
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSessionBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            identifier: None,
            runtime: None,
            capture_file: Some(PathBuf::from(DEFAULT_CAPTURE_FILE)),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            frame_skip: 3,
        }
    }

    pub fn with_frame_source(mut self, source: FrameSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_identifier(mut self, identifier: Arc<dyn IngredientIdentifier>) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Runtime analyses are spawned on. Defaults to the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Where captures are written. `None` disables the file.
    pub fn with_capture_file(mut self, path: Option<PathBuf>) -> Self {
        self.capture_file = path;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_frame_skip(mut self, frame_skip: u32) -> Self {
        self.frame_skip = frame_skip.max(1);
        self
    }

    pub fn with_settings(self, settings: &SessionSettings) -> Self {
        self.with_capture_file(Some(settings.capture_file.clone()))
            .with_jpeg_quality(settings.jpeg_quality)
            .with_frame_skip(settings.frame_skip)
    }

    pub fn build(self) -> BakeResult<CaptureSession> {
        let source = self
            .source
            .ok_or_else(|| BakeError::config("session", "no frame source specified"))?;
        let identifier = self
            .identifier
            .ok_or_else(|| BakeError::config("session", "no identifier specified"))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()
                .map_err(|e| BakeError::config("session", format!("no tokio runtime: {e}")))?,
        };
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Ok(CaptureSession {
            source,
            identifier,
            runtime,
            state: SessionState::Streaming,
            held: None,
            status: String::new(),
            last_identification: None,
            capture_file: self.capture_file,
            jpeg_quality: self.jpeg_quality,
            analysis: None,
            completions_tx,
            completions_rx,
            generation: 0,
            frame_skip: self.frame_skip,
            tick: 0,
        })
    }
}
