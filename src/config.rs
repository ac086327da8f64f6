//! Daemon configuration.
//!
//! Configuration is fixed at process start: a JSON file (path from
//! `PROCTOR_CONFIG` or the `--config` flag), compiled defaults for anything
//! the file omits, `PROCTOR_*` environment overrides on top, then
//! validation. There is no rotation or refresh.
//!
//! Rule thresholds (off-center distance, look-away duration, noise volume,
//! detector tuning) are deliberately NOT configuration; they are fixed
//! constants in the modules that own them.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::ingest::{AudioConfig, CameraConfig};
use crate::report::CandidateSession;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api/proctoring/log";
const DEFAULT_CAMERA_DEVICE: &str = "stub://candidate";
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_AUDIO_DEVICE: &str = "stub://microphone";
const DEFAULT_SAMPLE_RATE: u32 = 44_100;
const DEFAULT_BUFFER_FRAMES: u32 = 4_410;
const DEFAULT_DETECTOR_BACKEND: &str = "stub";

#[derive(Debug, Deserialize, Default)]
struct ProctordConfigFile {
    api: Option<ApiConfigFile>,
    session: Option<SessionConfigFile>,
    camera: Option<CameraConfigFile>,
    audio: Option<AudioConfigFile>,
    detector: Option<DetectorConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    url: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionConfigFile {
    student_id: Option<i64>,
    exam_id: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct AudioConfigFile {
    device: Option<String>,
    sample_rate: Option<u32>,
    buffer_frames: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ProctordConfig {
    pub api: ApiSettings,
    pub session: SessionSettings,
    pub camera: CameraSettings,
    pub audio: AudioSettings,
    pub detector: DetectorSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Violation endpoint URL.
    pub url: String,
    /// Static bearer token sent with every report.
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub student_id: i64,
    pub exam_id: i64,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub device: String,
    pub sample_rate: u32,
    pub buffer_frames: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// Registered backend name ("stub", "tract").
    pub backend: String,
    /// Local model file for backends that need one.
    pub model_path: Option<PathBuf>,
}

impl ProctordConfig {
    /// Load configuration: explicit path (or `PROCTOR_CONFIG`) → defaults →
    /// env overrides → validation.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("PROCTOR_CONFIG").ok().map(PathBuf::from);
        let path = explicit_path.map(Path::to_path_buf).or(env_path);
        let file_cfg = match path.as_deref() {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ProctordConfigFile) -> Self {
        let api = ApiSettings {
            url: file
                .api
                .as_ref()
                .and_then(|api| api.url.clone())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: file
                .api
                .and_then(|api| api.token)
                .unwrap_or_default(),
        };
        let session = SessionSettings {
            student_id: file
                .session
                .as_ref()
                .and_then(|session| session.student_id)
                .unwrap_or(0),
            exam_id: file
                .session
                .and_then(|session| session.exam_id)
                .unwrap_or(0),
        };
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let audio = AudioSettings {
            device: file
                .audio
                .as_ref()
                .and_then(|audio| audio.device.clone())
                .unwrap_or_else(|| DEFAULT_AUDIO_DEVICE.to_string()),
            sample_rate: file
                .audio
                .as_ref()
                .and_then(|audio| audio.sample_rate)
                .unwrap_or(DEFAULT_SAMPLE_RATE),
            buffer_frames: file
                .audio
                .and_then(|audio| audio.buffer_frames)
                .unwrap_or(DEFAULT_BUFFER_FRAMES),
        };
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|detector| detector.backend.clone())
                .unwrap_or_else(|| DEFAULT_DETECTOR_BACKEND.to_string()),
            model_path: file.detector.and_then(|detector| detector.model_path),
        };
        Self {
            api,
            session,
            camera,
            audio,
            detector,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("PROCTOR_API_URL") {
            if !url.trim().is_empty() {
                self.api.url = url;
            }
        }
        if let Ok(token) = std::env::var("PROCTOR_API_TOKEN") {
            if !token.trim().is_empty() {
                self.api.token = token;
            }
        }
        if let Ok(student_id) = std::env::var("PROCTOR_STUDENT_ID") {
            self.session.student_id = student_id
                .parse()
                .map_err(|_| anyhow!("PROCTOR_STUDENT_ID must be an integer"))?;
        }
        if let Ok(exam_id) = std::env::var("PROCTOR_EXAM_ID") {
            self.session.exam_id = exam_id
                .parse()
                .map_err(|_| anyhow!("PROCTOR_EXAM_ID must be an integer"))?;
        }
        if let Ok(device) = std::env::var("PROCTOR_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(device) = std::env::var("PROCTOR_AUDIO_DEVICE") {
            if !device.trim().is_empty() {
                self.audio.device = device;
            }
        }
        if let Ok(backend) = std::env::var("PROCTOR_DETECTOR") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(model_path) = std::env::var("PROCTOR_DETECTOR_MODEL") {
            if !model_path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(model_path));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.api.url)
            .map_err(|err| anyhow!("api url '{}' is not a valid URL: {}", self.api.url, err))?;
        if self.api.token.is_empty() {
            log::warn!("api token is empty; violation posts will carry a blank bearer token");
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be greater than zero"));
        }
        if self.audio.sample_rate == 0 {
            return Err(anyhow!("audio sample_rate must be greater than zero"));
        }
        if self.audio.buffer_frames == 0 {
            return Err(anyhow!("audio buffer_frames must be greater than zero"));
        }
        if self.detector.backend.trim().is_empty() {
            return Err(anyhow!("detector backend must not be empty"));
        }
        Ok(())
    }

    /// Camera settings in the form the ingest layer takes.
    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            device: self.camera.device.clone(),
            target_fps: self.camera.target_fps,
            width: self.camera.width,
            height: self.camera.height,
        }
    }

    /// Audio settings in the form the ingest layer takes.
    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            device: self.audio.device.clone(),
            sample_rate: self.audio.sample_rate,
            buffer_frames: self.audio.buffer_frames,
        }
    }

    /// The fixed candidate identifiers for this run.
    pub fn candidate_session(&self) -> CandidateSession {
        CandidateSession {
            student_id: self.session.student_id,
            exam_id: self.session.exam_id,
        }
    }
}

fn read_config_file(path: &Path) -> Result<ProctordConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
