use std::{collections::HashMap, fs, path::PathBuf};

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub script_path: PathBuf,
    pub python_bin: String,
    pub max_upload_bytes: usize,
    pub use_placeholder: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            temp_dir: "./tmp".into(),
            output_dir: "./public/output".into(),
            script_path: "./scripts/stitch_frames.py".into(),
            python_bin: "python3".into(),
            max_upload_bytes: 512 * 1024 * 1024,
            use_placeholder: false,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply_file_overrides(&mut settings, &file_cfg);
        }
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__TEMP_DIR") {
        settings.temp_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("APP__OUTPUT_DIR") {
        settings.output_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("APP__SCRIPT_PATH") {
        settings.script_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("APP__PYTHON_BIN") {
        settings.python_bin = v;
    }
    if let Ok(v) = std::env::var("APP__USE_PLACEHOLDER") {
        if let Some(parsed) = parse_bool(&v) {
            settings.use_placeholder = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__MAX_UPLOAD_BYTES") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_upload_bytes = parsed;
        }
    }

    settings
}

fn apply_file_overrides(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("temp_dir") {
        settings.temp_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("output_dir") {
        settings.output_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("script_path") {
        settings.script_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("python_bin") {
        settings.python_bin = v.clone();
    }
    if let Some(v) = file_cfg.get("use_placeholder") {
        if let Some(parsed) = parse_bool(v) {
            settings.use_placeholder = parsed;
        }
    }
    if let Some(v) = file_cfg.get("max_upload_bytes") {
        if let Ok(parsed) = v.parse::<usize>() {
            settings.max_upload_bytes = parsed;
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
