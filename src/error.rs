use thiserror::Error;

/// Device-level failures raised by the platform camera layer.
///
/// Open/configure failures come in two flavors: I/O-class errors from the
/// device node and generic runtime errors from the driver. The preview worker
/// treats both identically: release the partial handle, log, leave the camera
/// unset.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("failed to open camera {index}: {details}")]
    Open { index: u32, details: String },

    #[error("camera I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("camera configuration error: {details}")]
    Configuration { details: String },

    #[error("camera runtime error: {details}")]
    Runtime { details: String },
}

impl CameraError {
    pub fn configuration<S: Into<String>>(details: S) -> Self {
        Self::Configuration {
            details: details.into(),
        }
    }

    pub fn runtime<S: Into<String>>(details: S) -> Self {
        Self::Runtime {
            details: details.into(),
        }
    }
}

/// Failure reported by a frame listener callback.
///
/// A listener returning this from `on_frame_available` is unregistered;
/// delivery continues to the remaining listeners.
#[derive(Error, Debug)]
#[error("listener error: {message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Caller-facing errors: configuration loading and worker-thread creation.
///
/// Device-level [`CameraError`]s never surface here; the preview worker
/// handles them internally.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, PreviewError>;
