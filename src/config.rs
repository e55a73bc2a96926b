use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_CAMERA_URL: &str = "stub://front_camera";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_INTERVAL_MS: u64 = 200;
const DEFAULT_QUALITY: f32 = 0.8;
const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Default)]
struct FacecapConfigFile {
    server: Option<ServerConfigFile>,
    camera: Option<CameraConfigFile>,
    capture: Option<CaptureConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerConfigFile {
    url: Option<String>,
    batch_timeout_secs: Option<u64>,
    probe_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    batch_size: Option<usize>,
    interval_ms: Option<u64>,
    quality: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FacecapConfig {
    pub server: ServerSettings,
    pub camera: CameraSettings,
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub url: String,
    pub batch_timeout: Duration,
    pub probe_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub batch_size: usize,
    pub interval: Duration,
    pub quality: f32,
}

impl FacecapConfig {
    /// Defaults, overridden by the JSON file named in `FACECAP_CONFIG`,
    /// overridden by individual `FACECAP_*` environment variables.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FACECAP_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FacecapConfigFile) -> Self {
        let server = ServerSettings {
            url: file
                .server
                .as_ref()
                .and_then(|server| server.url.clone())
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            batch_timeout: Duration::from_secs(
                file.server
                    .as_ref()
                    .and_then(|server| server.batch_timeout_secs)
                    .unwrap_or(DEFAULT_BATCH_TIMEOUT_SECS),
            ),
            probe_timeout: Duration::from_secs(
                file.server
                    .as_ref()
                    .and_then(|server| server.probe_timeout_secs)
                    .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
            ),
        };
        let camera = CameraSettings {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        let capture = CaptureSettings {
            batch_size: file
                .capture
                .as_ref()
                .and_then(|capture| capture.batch_size)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            interval: Duration::from_millis(
                file.capture
                    .as_ref()
                    .and_then(|capture| capture.interval_ms)
                    .unwrap_or(DEFAULT_INTERVAL_MS),
            ),
            quality: file
                .capture
                .and_then(|capture| capture.quality)
                .unwrap_or(DEFAULT_QUALITY),
        };
        Self {
            server,
            camera,
            capture,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("FACECAP_SERVER_URL") {
            if !url.trim().is_empty() {
                self.server.url = url;
            }
        }
        if let Ok(url) = std::env::var("FACECAP_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(batch_size) = std::env::var("FACECAP_BATCH_SIZE") {
            let parsed: usize = batch_size
                .parse()
                .map_err(|_| anyhow!("FACECAP_BATCH_SIZE must be an integer"))?;
            self.capture.batch_size = parsed;
        }
        if let Ok(interval) = std::env::var("FACECAP_INTERVAL_MS") {
            let parsed: u64 = interval
                .parse()
                .map_err(|_| anyhow!("FACECAP_INTERVAL_MS must be an integer number of ms"))?;
            self.capture.interval = Duration::from_millis(parsed);
        }
        if let Ok(quality) = std::env::var("FACECAP_QUALITY") {
            let parsed: f32 = quality
                .parse()
                .map_err(|_| anyhow!("FACECAP_QUALITY must be a number in (0.0, 1.0]"))?;
            self.capture.quality = parsed;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.server.url.trim().is_empty() {
            return Err(anyhow!("server url must not be empty"));
        }
        if self.camera.url.trim().is_empty() {
            return Err(anyhow!("camera url must not be empty"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be nonzero"));
        }
        if self.capture.batch_size == 0 {
            return Err(anyhow!("batch size must be at least 1"));
        }
        if !(self.capture.quality > 0.0 && self.capture.quality <= 1.0) {
            return Err(anyhow!("quality must be in (0.0, 1.0]"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FacecapConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
