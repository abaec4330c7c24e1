use std::{path::PathBuf, sync::Arc};

use bytes::Bytes;
use chrono::Utc;
use shared::{
    domain::StepSize,
    error::{ErrorKind, ProcessingError},
    protocol::PLACEHOLDER_IMAGE_URL,
};
use tokio::fs;
use tracing::{error, info, warn};

pub mod stitcher;

use stitcher::{FrameStitcher, StitchRequest};

/// Gateway configuration, fixed at construction time.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Where uploaded inputs are persisted.
    pub temp_dir: PathBuf,
    /// Where generated images land; served back under `output_url_prefix`.
    pub output_dir: PathBuf,
    /// Site-relative prefix for generated image references.
    pub output_url_prefix: String,
    /// Skip processing entirely and answer with the placeholder reference.
    pub use_placeholder: bool,
}

#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<GatewayConfig>,
    pub stitcher: Arc<dyn FrameStitcher>,
}

/// One video part received from the submitter.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: Option<String>,
    pub data: Bytes,
}

/// Successful gateway answer: a site-relative image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub image_url: String,
    pub message: String,
}

/// Runs one submission end to end: persist inputs, invoke the stitcher,
/// validate its output. Every failure is terminal for the submission;
/// nothing is retried and partially written inputs are left behind.
pub async fn process_submission(
    ctx: &ApiContext,
    videos: Vec<VideoUpload>,
    step_size: StepSize,
) -> Result<ProcessedImage, ProcessingError> {
    if videos.is_empty() {
        return Err(ProcessingError::new(
            ErrorKind::Validation,
            "no video files provided",
        ));
    }

    let config = &ctx.config;

    if config.use_placeholder {
        return Ok(ProcessedImage {
            image_url: PLACEHOLDER_IMAGE_URL.to_string(),
            message: "using placeholder image for demonstration".to_string(),
        });
    }

    for dir in [&config.temp_dir, &config.output_dir] {
        if let Err(err) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), %err, "failed to create working directory");
            return Err(ProcessingError::new(
                ErrorKind::Infrastructure,
                "failed to create necessary directories",
            ));
        }
    }

    // Timestamp plus 1-based ordinal keeps concurrent submissions from
    // colliding in the shared directories.
    let stamp = Utc::now().timestamp_millis();
    let mut input_paths = Vec::with_capacity(videos.len());
    for (index, video) in videos.iter().enumerate() {
        let ordinal = index + 1;
        let path = config
            .temp_dir
            .join(format!("upload-{stamp}-{ordinal}.mp4"));
        if let Err(err) = fs::write(&path, &video.data).await {
            error!(path = %path.display(), %err, "failed to persist uploaded video");
            return Err(ProcessingError::new(
                ErrorKind::Infrastructure,
                format!("failed to save uploaded video {ordinal}"),
            ));
        }
        info!(
            path = %path.display(),
            bytes = video.data.len(),
            file_name = video.file_name.as_deref().unwrap_or("<unnamed>"),
            "saved uploaded video {ordinal}"
        );
        input_paths.push(path);
    }

    let output_name = format!("panorama-{stamp}.jpg");
    let output_path = config.output_dir.join(&output_name);

    if !ctx.stitcher.is_available() {
        error!("stitcher is not available");
        return Err(ProcessingError::new(
            ErrorKind::Infrastructure,
            "processing script not found",
        ));
    }

    info!(
        inputs = input_paths.len(),
        output = %output_path.display(),
        step = step_size.get(),
        "invoking stitcher"
    );

    let outcome = match ctx
        .stitcher
        .stitch(StitchRequest {
            inputs: input_paths,
            output: output_path.clone(),
            step_size,
        })
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(%err, "stitcher invocation failed");
            return Err(ProcessingError::with_detail(
                ErrorKind::Execution,
                "failed to process videos with processing script",
                err.diagnostics(),
            ));
        }
    };

    if !outcome.stdout.is_empty() {
        info!(stdout = %outcome.stdout.trim_end(), "stitcher output");
    }
    if !outcome.stderr.is_empty() {
        if stderr_indicates_failure(&outcome.stderr) {
            return Err(ProcessingError::with_detail(
                ErrorKind::Execution,
                "processing script reported an error",
                outcome.stderr,
            ));
        }
        warn!(stderr = %outcome.stderr.trim_end(), "stitcher diagnostics");
    }

    let metadata = match fs::metadata(&output_path).await {
        Ok(metadata) => metadata,
        Err(_) => {
            return Err(ProcessingError::new(
                ErrorKind::Postcondition,
                format!(
                    "output image was not created at {}",
                    output_path.display()
                ),
            ));
        }
    };
    if metadata.len() == 0 {
        return Err(ProcessingError::new(
            ErrorKind::Postcondition,
            "output image file is empty",
        ));
    }

    info!(path = %output_path.display(), bytes = metadata.len(), "output image written");

    Ok(ProcessedImage {
        image_url: format!(
            "{}/{}",
            config.output_url_prefix.trim_end_matches('/'),
            output_name
        ),
        message: "videos processed successfully".to_string(),
    })
}

/// The stitcher writes progress chatter to stderr, so stderr alone does not
/// mean failure: only text that mentions "error" without also mentioning
/// "warning" aborts the submission.
pub fn stderr_indicates_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("error") && !lower.contains("warning")
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
