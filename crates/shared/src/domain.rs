use serde::{Deserialize, Serialize};

pub const STEP_SIZE_MIN: u32 = 5;
pub const STEP_SIZE_MAX: u32 = 200;
pub const STEP_SIZE_DEFAULT: u32 = 100;

/// Frame-sampling interval handed to the stitcher. Lower values sample more
/// frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepSize(u32);

impl Default for StepSize {
    fn default() -> Self {
        Self(STEP_SIZE_DEFAULT)
    }
}

impl StepSize {
    /// Accepts only values inside the supported sampling range.
    pub fn new(value: u32) -> Option<Self> {
        (STEP_SIZE_MIN..=STEP_SIZE_MAX)
            .contains(&value)
            .then_some(Self(value))
    }

    /// Parsing rule for the `stepSize` form field: absent, non-numeric, or
    /// out-of-range input falls back to the default; in-range integers pass
    /// through unchanged.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<u32>().ok())
            .and_then(Self::new)
            .unwrap_or_default()
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for StepSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

pub fn is_video_media_type(media_type: &str) -> bool {
    media_type.starts_with("video/")
}
