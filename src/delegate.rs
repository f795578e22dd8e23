use crate::config::PreviewConfig;
use crate::device::{CameraOpener, Size};
use crate::error::Result;
use crate::listener::{FrameListener, FrameListeners};
use crate::surface::{PreviewSurface, ScaleMode};
use crate::worker::{CameraWorker, WorkerCommand, WorkerShared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Layout state owned by the rendering side
struct LayoutState {
    video_size: Size,
    scale_mode: ScaleMode,
}

/// Preview lifecycle delegate.
///
/// One instance per view. Mirrors the host view lifecycle (`on_resume` /
/// `on_pause`), owns the worker thread that opens, configures and releases
/// the camera, and fans frame-available notifications out to registered
/// listeners. Start and stop requests are posted onto the worker and execute
/// asynchronously; no method here blocks on the device except [`release`],
/// which joins the worker.
///
/// [`release`]: PreviewDelegate::release
pub struct PreviewDelegate {
    config: PreviewConfig,
    opener: Arc<dyn CameraOpener>,
    surface: Arc<dyn PreviewSurface>,
    shared: Arc<WorkerShared>,
    worker: Mutex<Option<CameraWorker>>,
    listeners: FrameListeners,
    resumed: AtomicBool,
    layout: Mutex<LayoutState>,
}

impl PreviewDelegate {
    /// Create a delegate for one view.
    ///
    /// Camera index and target frame rate come from the configuration; they
    /// are fixed for the delegate's lifetime.
    pub fn new(
        config: PreviewConfig,
        opener: Arc<dyn CameraOpener>,
        surface: Arc<dyn PreviewSurface>,
    ) -> Self {
        let layout = LayoutState {
            video_size: Size::new(config.camera.resolution.0, config.camera.resolution.1),
            scale_mode: config.surface.scale_mode,
        };
        Self {
            config,
            opener,
            surface,
            shared: Arc::new(WorkerShared::default()),
            worker: Mutex::new(None),
            listeners: FrameListeners::new(),
            resumed: AtomicBool::new(false),
            layout: Mutex::new(layout),
        }
    }

    /// Host view became visible. Starts preview if a display surface already
    /// exists and no worker is active.
    pub fn on_resume(&self) {
        debug!("on_resume");
        self.resumed.store(true, Ordering::SeqCst);
        if self.surface.has_surface() && !self.has_worker() {
            let size = self.layout.lock().video_size;
            if let Err(e) = self.start_preview(size.width, size.height) {
                error!("failed to start preview on resume: {}", e);
            }
        }
    }

    /// Host view went to the background. Requests preview stop without
    /// blocking.
    pub fn on_pause(&self) {
        debug!("on_pause");
        self.resumed.store(false, Ordering::SeqCst);
        self.stop_preview();
    }

    /// Ensure a worker exists and post a start request for the given preview
    /// size. Idempotent by intent: while a worker exists no second one is
    /// created, and a start posted to an already-running session is ignored
    /// by the worker.
    ///
    /// Errors only if the worker thread could not be spawned. Device-level
    /// failures during the posted start are handled by the worker (release,
    /// log, no retry) and never surface here.
    pub fn start_preview(&self, width: u32, height: u32) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_none() {
            let spawned = CameraWorker::spawn(
                self.config.camera.clone(),
                Arc::clone(&self.opener),
                Arc::clone(&self.surface),
                Arc::clone(&self.shared),
            )?;
            info!("preview worker spawned for camera {}", self.config.camera.index);
            *worker = Some(spawned);
        }
        if let Some(worker) = worker.as_ref() {
            worker.post(WorkerCommand::Start { width, height });
        }
        Ok(())
    }

    /// If a camera is open, request capture stop and device release. The
    /// worker stays alive for a later restart; the caller does not block.
    pub fn stop_preview(&self) {
        if !self.is_preview_active() {
            debug!("stop_preview: no active camera");
            return;
        }
        if let Some(worker) = self.worker.lock().as_ref() {
            worker.post(WorkerCommand::Stop);
        }
    }

    /// Stop preview and tear down the worker thread, joining it. Safe to
    /// call repeatedly.
    pub fn release(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.shutdown();
            info!("preview worker released");
        }
    }

    /// Store the video size hint and request a viewport refresh
    pub fn set_video_size(&self, width: u32, height: u32) {
        self.layout.lock().video_size = Size::new(width, height);
        self.surface.update_viewport();
    }

    pub fn video_size(&self) -> Size {
        self.layout.lock().video_size
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.layout.lock().scale_mode
    }

    /// Change the scale mode and request a viewport refresh
    pub fn set_scale_mode(&self, mode: ScaleMode) {
        self.layout.lock().scale_mode = mode;
        self.surface.update_viewport();
    }

    /// Record the current display rotation, picked up at the next session
    /// start, and refresh the viewport for the new orientation.
    pub fn set_display_rotation(&self, degrees: u32) {
        self.shared.display_rotation.store(degrees % 360, Ordering::SeqCst);
        self.surface.update_viewport();
    }

    pub fn add_listener(&self, listener: Arc<dyn FrameListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn FrameListener>) {
        self.listeners.remove(listener);
    }

    /// Broadcast a frame-available notification. Called from the rendering
    /// side after the surface consumed a frame, not from the worker thread.
    pub fn call_on_frame_available(&self) {
        self.listeners.notify();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether a camera handle is currently open on the worker thread
    pub fn is_preview_active(&self) -> bool {
        self.shared.camera_open.load(Ordering::SeqCst)
    }

    pub fn has_worker(&self) -> bool {
        self.worker.lock().is_some()
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed.load(Ordering::SeqCst)
    }

    /// Orientation-corrected preview size from the last negotiation
    pub fn preview_size(&self) -> Option<Size> {
        *self.shared.preview_size.lock()
    }
}

impl Drop for PreviewDelegate {
    fn drop(&mut self) {
        self.release();
    }
}
