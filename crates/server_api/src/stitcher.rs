use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use async_trait::async_trait;
use shared::domain::StepSize;
use thiserror::Error;
use tokio::process::Command;

/// One invocation of the external stitcher.
#[derive(Debug, Clone)]
pub struct StitchRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub step_size: StepSize,
}

/// Captured streams of a stitcher run that exited cleanly. Text on stderr
/// does not by itself mean the run failed; the caller classifies it.
#[derive(Debug, Clone, Default)]
pub struct StitchOutcome {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("failed to spawn processing script: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("processing script exited with {status}")]
    Failed { status: ExitStatus, stderr: String },
}

impl StitchError {
    /// Raw diagnostic text to surface to the caller.
    pub fn diagnostics(&self) -> String {
        match self {
            Self::Spawn(error) => error.to_string(),
            Self::Failed { status, stderr } => {
                if stderr.trim().is_empty() {
                    format!("exited with {status}")
                } else {
                    stderr.clone()
                }
            }
        }
    }
}

#[async_trait]
pub trait FrameStitcher: Send + Sync {
    /// Whether the stitcher can be invoked at all. Checked before every run.
    fn is_available(&self) -> bool;

    async fn stitch(&self, request: StitchRequest) -> Result<StitchOutcome, StitchError>;
}

/// Runs the stitcher as `<interpreter> <script> --input a,b --output out
/// --step n`, capturing both streams.
pub struct CommandStitcher {
    interpreter: String,
    script: PathBuf,
}

impl CommandStitcher {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

fn join_inputs(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl FrameStitcher for CommandStitcher {
    fn is_available(&self) -> bool {
        self.script.is_file()
    }

    async fn stitch(&self, request: StitchRequest) -> Result<StitchOutcome, StitchError> {
        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg("--input")
            .arg(join_inputs(&request.inputs))
            .arg("--output")
            .arg(&request.output)
            .arg("--step")
            .arg(request.step_size.get().to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(StitchError::Spawn)?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(StitchError::Failed {
                status: output.status,
                stderr,
            });
        }

        Ok(StitchOutcome { stdout, stderr })
    }
}
