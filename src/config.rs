use crate::error::Result;
use crate::surface::ScaleMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PreviewConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for the first camera)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Target preview frame rate used during fps-range negotiation
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,

    /// Requested preview resolution (width, height); the device may
    /// negotiate the closest supported mode instead
    #[serde(default = "default_resolution")]
    pub resolution: (u32, u32),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SurfaceConfig {
    /// How the preview frame is mapped onto the view
    #[serde(default)]
    pub scale_mode: ScaleMode,

    /// Capacity of the bounded frame channel between capture and renderer
    #[serde(default = "default_sink_capacity")]
    pub sink_capacity: usize,
}

impl PreviewConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self> {
        Self::load_from_file("campreview.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default("camera.target_fps", default_target_fps())?
            .set_default(
                "camera.resolution",
                vec![default_resolution().0, default_resolution().1],
            )?
            .set_default("surface.scale_mode", "KeepAspectViewport")?
            .set_default("surface.sink_capacity", default_sink_capacity() as i64)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with CAMPREVIEW_ prefix
            .add_source(Environment::with_prefix("CAMPREVIEW").separator("_"))
            .build()?;

        let config: PreviewConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            )
            .into());
        }

        if self.camera.target_fps == 0 {
            return Err(ConfigError::Message(
                "Camera target_fps must be greater than 0".to_string(),
            )
            .into());
        }

        if self.surface.sink_capacity == 0 {
            return Err(ConfigError::Message(
                "Surface sink_capacity must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Serialize the default configuration as TOML, for `--print-config`
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: default_camera_index(),
            target_fps: default_target_fps(),
            resolution: default_resolution(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            scale_mode: ScaleMode::default(),
            sink_capacity: default_sink_capacity(),
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_target_fps() -> u32 {
    30
}
fn default_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_sink_capacity() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreviewError;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PreviewConfig::default();
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.camera.target_fps, 30);
        assert_eq!(config.camera.resolution, (640, 480));
        assert_eq!(config.surface.scale_mode, ScaleMode::KeepAspectViewport);
        assert_eq!(config.surface.sink_capacity, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = PreviewConfig::load_from_file("/nonexistent/campreview.toml").unwrap();
        assert_eq!(config.camera.index, 0);
        assert_eq!(config.camera.target_fps, 30);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[camera]
index = 2
target_fps = 15
resolution = [1280, 720]

[surface]
scale_mode = "CropCenter"
sink_capacity = 4
"#
        )
        .unwrap();

        let config = PreviewConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.camera.index, 2);
        assert_eq!(config.camera.target_fps, 15);
        assert_eq!(config.camera.resolution, (1280, 720));
        assert_eq!(config.surface.scale_mode, ScaleMode::CropCenter);
        assert_eq!(config.surface.sink_capacity, 4);
    }

    #[test]
    fn test_malformed_file_reports_config_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"camera = "not a table""#).unwrap();

        let err = PreviewConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, PreviewError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_validation_failure_is_a_config_error() {
        let mut config = PreviewConfig::default();
        config.camera.target_fps = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PreviewError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = PreviewConfig::default();
        config.camera.target_fps = 0;
        assert!(config.validate().is_err());

        let mut config = PreviewConfig::default();
        config.camera.resolution = (0, 480);
        assert!(config.validate().is_err());

        let mut config = PreviewConfig::default();
        config.surface.sink_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_round_trips() {
        let toml = PreviewConfig::default_toml().unwrap();
        let parsed: PreviewConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.camera.resolution, PreviewConfig::default().camera.resolution);
        assert_eq!(parsed.surface.scale_mode, PreviewConfig::default().surface.scale_mode);
    }
}
