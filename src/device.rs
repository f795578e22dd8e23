use crate::error::CameraError;
use crate::frame::FrameSink;
use crate::negotiate::NegotiatedParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimensions of a frame, view, or supported mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Same size with width and height exchanged
    pub fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which way the camera points relative to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    /// Toward the user; preview is mirrored
    Front,
    /// Away from the user
    Back,
}

/// Focus modes a device may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusMode {
    ContinuousVideo,
    Auto,
    Fixed,
    Infinity,
}

/// Inclusive frame-rate range advertised by a device, in frames per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpsRange {
    pub min: u32,
    pub max: u32,
}

impl FpsRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, fps: u32) -> bool {
        self.min <= fps && fps <= self.max
    }
}

impl fmt::Display for FpsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]fps", self.min, self.max)
    }
}

/// Capability set reported by an opened camera device.
///
/// Parameter negotiation consumes this; nothing else inspects the device
/// directly.
#[derive(Debug, Clone)]
pub struct CameraCapabilities {
    pub facing: Facing,
    /// Orientation of the sensor relative to the device's natural
    /// orientation, in degrees clockwise (0, 90, 180 or 270)
    pub sensor_orientation: u32,
    pub preview_sizes: Vec<Size>,
    pub picture_sizes: Vec<Size>,
    pub fps_ranges: Vec<FpsRange>,
    pub focus_modes: Vec<FocusMode>,
}

/// An open camera device handle.
///
/// Owned exclusively by the preview worker thread while a session is active;
/// dropping the handle releases the underlying platform resource.
pub trait CameraDevice: Send {
    /// Report the device's capability set
    fn capabilities(&self) -> Result<CameraCapabilities, CameraError>;

    /// Apply negotiated parameters to the device
    fn apply(&mut self, params: &NegotiatedParams) -> Result<(), CameraError>;

    /// Apply the display-orientation correction, in degrees clockwise
    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), CameraError>;

    /// Bind the destination buffer that receives decoded frames
    fn attach_sink(&mut self, sink: FrameSink) -> Result<(), CameraError>;

    /// Start delivering frames to the attached sink
    fn start_capture(&mut self) -> Result<(), CameraError>;

    /// Stop delivering frames; the device stays open
    fn stop_capture(&mut self) -> Result<(), CameraError>;

    /// Preview size the device actually negotiated, which may differ from
    /// the requested size
    fn actual_preview_size(&self) -> Result<Size, CameraError>;
}

/// Opens camera devices by index.
///
/// Seam between the delegate and a concrete platform backend; the mock
/// opener and the V4L2 backend both implement it.
pub trait CameraOpener: Send + Sync {
    fn open(&self, index: u32) -> Result<Box<dyn CameraDevice>, CameraError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_swapped() {
        assert_eq!(Size::new(640, 480).swapped(), Size::new(480, 640));
    }

    #[test]
    fn test_fps_range_contains() {
        let range = FpsRange::new(15, 30);
        assert!(range.contains(15));
        assert!(range.contains(30));
        assert!(range.contains(24));
        assert!(!range.contains(14));
        assert!(!range.contains(31));
    }
}
