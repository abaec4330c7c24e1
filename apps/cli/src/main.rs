use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{ProcessingResult, UploadClient, UploadEvent, VideoSource};
use shared::domain::StepSize;

#[derive(Parser, Debug)]
#[command(about = "Stitch video scans into one panoramic image")]
struct Args {
    /// Gateway base URL, e.g. http://127.0.0.1:8080
    #[arg(long)]
    server_url: String,
    /// Frame sampling interval (5-200; lower samples more frames)
    #[arg(long, default_value_t = 100)]
    step: u32,
    /// Video files to stitch
    #[arg(required = true)]
    videos: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let Some(step_size) = StepSize::new(args.step) else {
        bail!("--step must be between 5 and 200");
    };

    let mut sources = Vec::with_capacity(args.videos.len());
    for path in &args.videos {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.mp4".to_string());
        sources.push(VideoSource {
            media_type: media_type_for(path),
            file_name,
            data: data.into(),
        });
    }

    let client = UploadClient::new(&args.server_url)?;
    let mut events = client.subscribe_events();
    let reporter = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                UploadEvent::ProgressChanged(value) => println!("processing... {value:.0}%"),
                UploadEvent::Completed(_) => break,
            }
        }
    });

    println!(
        "uploading {} video file(s) with step size {step_size}",
        sources.len()
    );
    let result = client.submit(sources, step_size).await?;
    let _ = reporter.await;

    match result {
        ProcessingResult::Success { image_url } => {
            println!("panorama ready: {image_url}");
            Ok(())
        }
        ProcessingResult::Failure {
            error,
            fallback_url,
        } => {
            println!("fallback image available at: {fallback_url}");
            bail!("processing failed: {error}");
        }
    }
}

fn media_type_for(path: &Path) -> String {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        _ => "video/mp4",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_types_follow_the_file_extension() {
        assert_eq!(media_type_for(Path::new("scan.MOV")), "video/quicktime");
        assert_eq!(media_type_for(Path::new("scan.avi")), "video/x-msvideo");
        assert_eq!(media_type_for(Path::new("scan.webm")), "video/webm");
        assert_eq!(media_type_for(Path::new("scan.mp4")), "video/mp4");
        assert_eq!(media_type_for(Path::new("scan")), "video/mp4");
    }
}
