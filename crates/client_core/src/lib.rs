use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use rand::Rng;
use shared::{
    domain::{is_video_media_type, StepSize},
    protocol::{
        ErrorBody, ProcessVideoResponse, PLACEHOLDER_IMAGE_URL, STEP_SIZE_FIELD,
        VIDEO_FIELD_PREFIX,
    },
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};
use url::Url;

pub mod viewer;

/// Synthetic progress never passes this while a request is outstanding.
pub const PROGRESS_CEILING: f32 = 95.0;
pub const PROGRESS_COMPLETE: f32 = 100.0;
pub const PROGRESS_TICK: Duration = Duration::from_secs(1);
pub const PROGRESS_MAX_INCREMENT: f32 = 5.0;

/// One file chosen for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSource {
    pub file_name: String,
    pub media_type: String,
    pub data: Bytes,
}

impl VideoSource {
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("please select video files")]
    NoVideoFiles,
}

/// The set of files staged for the next submission. Candidates that are not
/// videos are dropped silently; a batch containing none is rejected and the
/// previous selection stands.
#[derive(Debug, Default)]
pub struct SelectionState {
    files: Vec<VideoSource>,
}

impl SelectionState {
    /// Replaces the current selection with the video files from `candidates`.
    /// Returns how many were kept.
    pub fn offer(&mut self, candidates: Vec<VideoSource>) -> Result<usize, SelectionError> {
        let videos: Vec<VideoSource> = candidates
            .into_iter()
            .filter(|candidate| is_video_media_type(&candidate.media_type))
            .collect();
        if videos.is_empty() {
            return Err(SelectionError::NoVideoFiles);
        }
        let kept = videos.len();
        self.files = videos;
        Ok(kept)
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.files.len() {
            self.files.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[VideoSource] {
        &self.files
    }

    pub fn take(&mut self) -> Vec<VideoSource> {
        std::mem::take(&mut self.files)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.files.iter().map(VideoSource::size_bytes).sum()
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1_048_576 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1_073_741_824 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    }
}

/// How a finished submission went wrong. `Server` carries what the gateway
/// declared; `Transport` means no intelligible answer arrived, which is all
/// the submitter can say about it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        detail: Option<String>,
    },
    #[error("{0}")]
    Transport(String),
}

/// Exactly one of these is produced per submission. Failures always carry a
/// renderable fallback reference so the result view is never empty.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingResult {
    Success {
        image_url: String,
    },
    Failure {
        error: SubmissionError,
        fallback_url: String,
    },
}

/// Rejections raised before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("no video files selected")]
    NoVideosSelected,
    #[error("a submission is already in progress")]
    SubmissionInFlight,
}

#[derive(Debug, Error)]
#[error("invalid server url: {0}")]
pub struct InvalidServerUrl(#[source] pub url::ParseError);

#[derive(Debug, Clone)]
pub enum UploadEvent {
    ProgressChanged(f32),
    Completed(ProcessingResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkspaceTab {
    #[default]
    Input,
    Result,
}

/// Tab / progress / result record mirrored by whatever front end is driving
/// the client. All transitions are pure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkspaceState {
    pub active_tab: WorkspaceTab,
    pub processing: bool,
    pub progress: f32,
    pub result_image: Option<String>,
    pub error: Option<SubmissionError>,
}

impl WorkspaceState {
    /// Claims the single outstanding-submission slot. Returns false if a
    /// submission is already pending.
    pub fn begin_submission(&mut self) -> bool {
        if self.processing {
            return false;
        }
        self.processing = true;
        self.progress = 0.0;
        self.error = None;
        true
    }

    /// Progress only ever moves forward, and never past the ceiling.
    pub fn record_progress(&mut self, value: f32) {
        let value = value.min(PROGRESS_CEILING);
        if value > self.progress {
            self.progress = value;
        }
    }

    pub fn complete(&mut self, result: &ProcessingResult) {
        self.processing = false;
        match result {
            ProcessingResult::Success { image_url } => {
                self.progress = PROGRESS_COMPLETE;
                self.result_image = Some(image_url.clone());
                self.error = None;
                self.active_tab = WorkspaceTab::Result;
            }
            ProcessingResult::Failure {
                error,
                fallback_url,
            } => {
                self.progress = 0.0;
                self.result_image = Some(fallback_url.clone());
                self.error = Some(error.clone());
                self.active_tab = WorkspaceTab::Input;
            }
        }
    }

    pub fn input_tab_enabled(&self) -> bool {
        !self.processing
    }

    pub fn result_tab_enabled(&self) -> bool {
        self.result_image.is_some()
    }
}

/// Upload orchestrator: one atomic multipart submission at a time, a
/// cosmetic progress task while it is outstanding, and a classified
/// `ProcessingResult` when it is done.
pub struct UploadClient {
    http: reqwest::Client,
    server_url: String,
    state: Mutex<WorkspaceState>,
    events: broadcast::Sender<UploadEvent>,
}

impl UploadClient {
    pub fn new(server_url: impl AsRef<str>) -> Result<Arc<Self>, InvalidServerUrl> {
        let parsed = Url::parse(server_url.as_ref()).map_err(InvalidServerUrl)?;
        let server_url = parsed.as_str().trim_end_matches('/').to_string();
        let (events, _) = broadcast::channel(64);
        Ok(Arc::new(Self {
            http: reqwest::Client::new(),
            server_url,
            state: Mutex::new(WorkspaceState::default()),
            events,
        }))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    pub async fn workspace(&self) -> WorkspaceState {
        self.state.lock().await.clone()
    }

    /// Submits the given videos as one multipart request and classifies the
    /// answer. Validation failures surface as `SubmitError` before any
    /// network activity; everything that happens after submission is folded
    /// into the returned `ProcessingResult`.
    pub async fn submit(
        self: &Arc<Self>,
        videos: Vec<VideoSource>,
        step_size: StepSize,
    ) -> Result<ProcessingResult, SubmitError> {
        if videos.is_empty() {
            return Err(SubmitError::NoVideosSelected);
        }

        {
            let mut state = self.state.lock().await;
            if !state.begin_submission() {
                return Err(SubmitError::SubmissionInFlight);
            }
        }

        info!(
            videos = videos.len(),
            step = step_size.get(),
            "submitting videos for processing"
        );

        let progress_task = self.spawn_progress_task();
        let result = self.perform_submission(videos, step_size).await;
        // The synthetic progress stops the moment a definitive answer exists.
        progress_task.abort();

        {
            let mut state = self.state.lock().await;
            state.complete(&result);
        }
        let _ = self.events.send(UploadEvent::Completed(result.clone()));
        Ok(result)
    }

    fn spawn_progress_task(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(PROGRESS_TICK);
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                let value = {
                    let mut state = client.state.lock().await;
                    if !state.processing {
                        break;
                    }
                    let bump = rand::rng().random_range(0.0..PROGRESS_MAX_INCREMENT);
                    let next = state.progress + bump;
                    state.record_progress(next);
                    state.progress
                };
                let _ = client.events.send(UploadEvent::ProgressChanged(value));
            }
        })
    }

    async fn perform_submission(
        &self,
        videos: Vec<VideoSource>,
        step_size: StepSize,
    ) -> ProcessingResult {
        let mut form = reqwest::multipart::Form::new();
        for (index, video) in videos.into_iter().enumerate() {
            form = form.part(
                format!("{VIDEO_FIELD_PREFIX}{}", index + 1),
                video_part(video),
            );
        }
        form = form.text(STEP_SIZE_FIELD, step_size.get().to_string());

        let endpoint = format!("{}/api/process-video", self.server_url);
        let response = match self.http.post(&endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "video upload failed before any response arrived");
                return failure(SubmissionError::Transport(
                    "network error while uploading videos".to_string(),
                ));
            }
        };

        let status = response.status();
        let body = match response.json::<serde_json::Value>().await {
            Ok(body) => body,
            Err(err) => {
                warn!(%err, "gateway response could not be parsed");
                return failure(SubmissionError::Transport(
                    "failed to parse server response".to_string(),
                ));
            }
        };

        if !status.is_success() {
            let wire: ErrorBody = serde_json::from_value(body).unwrap_or(ErrorBody {
                error: "failed to process videos".to_string(),
                details: None,
            });
            return failure(SubmissionError::Server {
                status: status.as_u16(),
                message: wire.error,
                detail: wire.details,
            });
        }

        match serde_json::from_value::<ProcessVideoResponse>(body) {
            Ok(success) => {
                info!(image_url = %success.image_url, "processing complete");
                ProcessingResult::Success {
                    image_url: success.image_url,
                }
            }
            Err(err) => {
                warn!(%err, "gateway success body had an unexpected shape");
                failure(SubmissionError::Transport(
                    "failed to parse server response".to_string(),
                ))
            }
        }
    }
}

fn video_part(video: VideoSource) -> reqwest::multipart::Part {
    let VideoSource {
        file_name,
        media_type,
        data,
    } = video;
    let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name.clone());
    match part.mime_str(&media_type) {
        Ok(part) => part,
        // An unparseable declared type is dropped rather than failing the
        // whole upload; the gateway never inspects it.
        Err(_) => reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name),
    }
}

fn failure(error: SubmissionError) -> ProcessingResult {
    ProcessingResult::Failure {
        error,
        fallback_url: PLACEHOLDER_IMAGE_URL.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
