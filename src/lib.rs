pub mod config;
pub mod delegate;
pub mod device;
pub mod error;
pub mod frame;
pub mod listener;
pub mod mock;
pub mod negotiate;
pub mod surface;

mod worker;

#[cfg(all(feature = "v4l2", target_os = "linux"))]
pub mod v4l2;

pub use config::{CameraConfig, PreviewConfig, SurfaceConfig};
pub use delegate::PreviewDelegate;
pub use device::{
    CameraCapabilities, CameraDevice, CameraOpener, Facing, FocusMode, FpsRange, Size,
};
pub use error::{CameraError, ListenerError, PreviewError, Result};
pub use frame::{frame_channel, FrameData, FrameFormat, FrameSink, FrameSource};
pub use listener::{FrameListener, FrameListeners};
pub use mock::{MockCamera, MockCameraOpener, RecordingSurface};
pub use negotiate::{
    choose_focus_mode, choose_fps_range, closest_size, display_orientation, negotiate,
    oriented_size, NegotiatedParams,
};
pub use surface::{compute_viewport, PreviewSurface, ScaleMode, Viewport};

#[cfg(all(feature = "v4l2", target_os = "linux"))]
pub use v4l2::{V4l2Camera, V4l2Opener};
