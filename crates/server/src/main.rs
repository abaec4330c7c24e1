use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use server_api::{
    process_submission, stitcher::CommandStitcher, ApiContext, GatewayConfig, VideoUpload,
};
use shared::{
    domain::StepSize,
    error::{ErrorKind, ProcessingError},
    protocol::{ErrorBody, ProcessVideoResponse, STEP_SIZE_FIELD, VIDEO_FIELD_PREFIX},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

mod config;

use config::{load_settings, Settings};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let max_upload_bytes = settings.max_upload_bytes;
    let state = AppState {
        api: build_api_context(&settings),
    };
    let app = build_router(Arc::new(state), max_upload_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_api_context(settings: &Settings) -> ApiContext {
    ApiContext {
        config: Arc::new(GatewayConfig {
            temp_dir: settings.temp_dir.clone(),
            output_dir: settings.output_dir.clone(),
            output_url_prefix: "/output".to_string(),
            use_placeholder: settings.use_placeholder,
        }),
        stitcher: Arc::new(CommandStitcher::new(
            settings.python_bin.clone(),
            settings.script_path.clone(),
        )),
    }
}

fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/process-video", post(process_video))
        .route("/output/:file_name", get(serve_output_image))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn process_video(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessVideoResponse>, (StatusCode, Json<ErrorBody>)> {
    let mut videos = Vec::new();
    let mut step_size = StepSize::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(malformed_body(err.to_string())),
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        if name == STEP_SIZE_FIELD {
            let raw = field.text().await.unwrap_or_default();
            step_size = StepSize::parse_or_default(Some(&raw));
        } else if name.starts_with(VIDEO_FIELD_PREFIX) && file_name.is_some() {
            let data = match field.bytes().await {
                Ok(data) => data,
                Err(err) => return Err(malformed_body(err.to_string())),
            };
            videos.push(VideoUpload { file_name, data });
        }
    }

    let result = process_submission(&state.api, videos, step_size)
        .await
        .map_err(error_response)?;

    Ok(Json(ProcessVideoResponse {
        image_url: result.image_url,
        message: result.message,
    }))
}

async fn serve_output_image(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "invalid image name".to_string(),
                details: None,
            }),
        ));
    }

    let path = state.api.config.output_dir.join(&file_name);
    let bytes = tokio::fs::read(&path).await.map_err(|_| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "image not found".to_string(),
                details: None,
            }),
        )
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&file_name)),
    );
    Ok((StatusCode::OK, headers, bytes))
}

fn content_type_for(file_name: &str) -> &'static str {
    if file_name.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

fn malformed_body(detail: String) -> (StatusCode, Json<ErrorBody>) {
    error_response(ProcessingError::with_detail(
        ErrorKind::Validation,
        "malformed multipart body",
        detail,
    ))
}

fn error_response(err: ProcessingError) -> (StatusCode, Json<ErrorBody>) {
    let status = match err.kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.message,
            details: err.detail,
        }),
    )
}
