//! Dedicated preview worker thread.
//!
//! The worker is the single owner of the camera handle: open, configure,
//! start, stop and release all happen on this thread, so no lock guards the
//! device itself. Callers communicate through posted commands and never
//! block; observable session state (camera-open flag, negotiated size) is
//! published through [`WorkerShared`].

use crate::config::CameraConfig;
use crate::device::{CameraDevice, CameraOpener, Size};
use crate::error::CameraError;
use crate::negotiate;
use crate::surface::PreviewSurface;
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Commands posted onto the worker thread
pub(crate) enum WorkerCommand {
    /// Open the device and start capture with the requested preview size
    Start { width: u32, height: u32 },
    /// Stop capture and release the device; the worker stays alive
    Stop,
    /// Stop, release and exit the worker loop
    Shutdown,
}

/// Session state shared between the delegate and the worker thread
#[derive(Default)]
pub(crate) struct WorkerShared {
    /// True while a camera handle is open on the worker thread
    pub camera_open: AtomicBool,
    /// Orientation-corrected preview size from the last negotiation
    pub preview_size: Mutex<Option<Size>>,
    /// Display rotation in degrees, read at session start
    pub display_rotation: AtomicU32,
}

/// Handle to a running worker thread
pub(crate) struct CameraWorker {
    sender: Sender<WorkerCommand>,
    join: JoinHandle<()>,
}

impl CameraWorker {
    /// Spawn the worker thread for a preview session
    pub fn spawn(
        config: CameraConfig,
        opener: Arc<dyn CameraOpener>,
        surface: Arc<dyn PreviewSurface>,
        shared: Arc<WorkerShared>,
    ) -> std::io::Result<Self> {
        let (sender, receiver) = unbounded();
        let join = std::thread::Builder::new()
            .name("campreview-worker".to_string())
            .spawn(move || run(receiver, config, opener, surface, shared))?;
        Ok(Self { sender, join })
    }

    /// Post a command; never blocks
    pub fn post(&self, command: WorkerCommand) {
        if self.sender.send(command).is_err() {
            warn!("preview worker is gone, command dropped");
        }
    }

    /// Request shutdown and join the thread
    pub fn shutdown(self) {
        let _ = self.sender.send(WorkerCommand::Shutdown);
        if self.join.join().is_err() {
            error!("preview worker thread panicked during shutdown");
        }
    }
}

fn run(
    receiver: Receiver<WorkerCommand>,
    config: CameraConfig,
    opener: Arc<dyn CameraOpener>,
    surface: Arc<dyn PreviewSurface>,
    shared: Arc<WorkerShared>,
) {
    debug!("preview worker started for camera {}", config.index);
    let mut session: Option<Box<dyn CameraDevice>> = None;

    while let Ok(command) = receiver.recv() {
        match command {
            WorkerCommand::Start { width, height } => {
                if session.is_some() {
                    debug!("preview already running, ignoring start request");
                    continue;
                }
                match start_session(&config, &*opener, &*surface, &shared, width, height) {
                    Ok(device) => {
                        session = Some(device);
                        shared.camera_open.store(true, Ordering::SeqCst);
                    }
                    Err(e) => {
                        // The partially opened handle was already dropped on
                        // the error path; no retry.
                        error!("failed to start preview on camera {}: {}", config.index, e);
                    }
                }
            }
            WorkerCommand::Stop => {
                stop_session(&mut session, &shared);
            }
            WorkerCommand::Shutdown => {
                stop_session(&mut session, &shared);
                break;
            }
        }
    }

    debug!("preview worker for camera {} exited", config.index);
}

/// Open and configure the device, wire the surface and start capture.
///
/// Any `?` on this path drops the handle opened so far, which releases the
/// platform resource.
fn start_session(
    config: &CameraConfig,
    opener: &dyn CameraOpener,
    surface: &dyn PreviewSurface,
    shared: &WorkerShared,
    width: u32,
    height: u32,
) -> Result<Box<dyn CameraDevice>, CameraError> {
    let mut device = opener.open(config.index)?;
    let caps = device.capabilities()?;

    let requested = Size::new(width, height);
    let rotation = shared.display_rotation.load(Ordering::SeqCst);
    let params = negotiate::negotiate(&caps, requested, config.target_fps, rotation);

    device.apply(&params)?;
    device.set_display_orientation(params.display_orientation)?;

    let actual = device.actual_preview_size()?;
    let oriented = negotiate::oriented_size(actual, params.display_orientation);
    *shared.preview_size.lock() = Some(oriented);
    surface.on_preview_size_changed(oriented);
    surface.update_viewport();

    device.attach_sink(surface.frame_sink())?;
    device.start_capture()?;

    info!(
        "preview started on camera {}: {} ({}° correction, requested {})",
        config.index, oriented, params.display_orientation, requested
    );
    Ok(device)
}

fn stop_session(session: &mut Option<Box<dyn CameraDevice>>, shared: &WorkerShared) {
    if let Some(mut device) = session.take() {
        if let Err(e) = device.stop_capture() {
            warn!("error stopping capture: {}", e);
        }
        shared.camera_open.store(false, Ordering::SeqCst);
        drop(device);
        info!("preview stopped, camera released");
    } else {
        debug!("no active preview session to stop");
    }
}
