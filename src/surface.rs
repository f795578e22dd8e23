use crate::device::Size;
use crate::frame::FrameSink;
use serde::{Deserialize, Serialize};

/// How the preview frame is mapped onto the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleMode {
    /// Fill the view, ignoring aspect ratio
    Stretch,
    /// Letterbox by shrinking the render viewport to the frame's aspect
    #[default]
    KeepAspectViewport,
    /// Letterbox inside the full viewport; aspect correction happens in the
    /// renderer's texture transform, so the viewport itself stays full-view
    KeepAspect,
    /// Fill the view and crop the overflow, centered
    CropCenter,
}

/// Destination rectangle within the view, in pixels.
///
/// Offsets may be negative for crop modes, where the frame overflows the
/// view on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    fn full(view: Size) -> Self {
        Self {
            x: 0,
            y: 0,
            width: view.width,
            height: view.height,
        }
    }
}

/// Compute the destination rectangle for a frame within a view.
///
/// Degenerate inputs (a zero dimension on either side) fall back to the full
/// view rather than producing a division by zero.
pub fn compute_viewport(view: Size, frame: Size, mode: ScaleMode) -> Viewport {
    if view.width == 0 || view.height == 0 || frame.width == 0 || frame.height == 0 {
        return Viewport::full(view);
    }

    match mode {
        ScaleMode::Stretch | ScaleMode::KeepAspect => Viewport::full(view),
        ScaleMode::KeepAspectViewport => scaled_centered(view, frame, f64::min),
        ScaleMode::CropCenter => scaled_centered(view, frame, f64::max),
    }
}

fn scaled_centered(view: Size, frame: Size, pick: fn(f64, f64) -> f64) -> Viewport {
    let scale_x = view.width as f64 / frame.width as f64;
    let scale_y = view.height as f64 / frame.height as f64;
    let scale = pick(scale_x, scale_y);

    let width = (frame.width as f64 * scale).round() as u32;
    let height = (frame.height as f64 * scale).round() as u32;
    let x = (view.width as i64 - width as i64) / 2;
    let y = (view.height as i64 - height as i64) / 2;

    Viewport {
        x: x as i32,
        y: y as i32,
        width,
        height,
    }
}

/// Render-surface capability set consumed by the preview delegate.
///
/// Combines what the host view and its renderer provide: surface
/// availability, layout notifications, a viewport refresh and the destination
/// buffer for decoded frames. Implementations are responsible for marshaling
/// calls onto their own render thread; the delegate and the preview worker
/// call these from their threads and never block on the renderer.
pub trait PreviewSurface: Send + Sync {
    /// Whether a display surface currently exists
    fn has_surface(&self) -> bool;

    /// The negotiated preview size changed (already orientation-corrected)
    fn on_preview_size_changed(&self, size: Size);

    /// Recompute the viewport from current layout state
    fn update_viewport(&self);

    /// Destination buffer bound as the capture target
    fn frame_sink(&self) -> FrameSink;
}
