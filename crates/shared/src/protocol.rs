use serde::{Deserialize, Serialize};

/// Multipart field name carrying the sampling interval.
pub const STEP_SIZE_FIELD: &str = "stepSize";

/// Site-relative reference both sides can always render, even when
/// processing fails.
pub const PLACEHOLDER_IMAGE_URL: &str = "/placeholder-panorama.png";

/// Multipart field prefix for uploaded video parts (`video1`, `video2`, …).
pub const VIDEO_FIELD_PREFIX: &str = "video";

/// Success body for `POST /api/process-video`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessVideoResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub message: String,
}

/// Failure body for any gateway error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
