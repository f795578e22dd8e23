//! Mock camera and surface implementations.
//!
//! Used by the test suite and by the diagnostic binary on hosts without a
//! real capture backend. The mock camera generates RGB24 pattern frames on a
//! capture thread, mirroring how a platform backend feeds the frame sink.

use crate::device::{
    CameraCapabilities, CameraDevice, CameraOpener, Facing, FocusMode, FpsRange, Size,
};
use crate::error::CameraError;
use crate::frame::{frame_channel, FrameData, FrameFormat, FrameSink, FrameSource};
use crate::negotiate::NegotiatedParams;
use crate::surface::PreviewSurface;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, trace};

const MOCK_FRAME_INTERVAL: Duration = Duration::from_millis(15);

#[derive(Default)]
struct OpenerState {
    open_count: AtomicU32,
    fail_open: AtomicBool,
    last_applied: Mutex<Option<NegotiatedParams>>,
    last_orientation: Mutex<Option<u32>>,
}

/// Opens [`MockCamera`] devices and records what happened to them
pub struct MockCameraOpener {
    caps: CameraCapabilities,
    state: Arc<OpenerState>,
}

impl MockCameraOpener {
    pub fn new() -> Self {
        Self::with_capabilities(default_capabilities())
    }

    pub fn with_capabilities(caps: CameraCapabilities) -> Self {
        Self {
            caps,
            state: Arc::new(OpenerState::default()),
        }
    }

    /// Make subsequent `open` calls fail with an open error
    pub fn set_fail_open(&self, fail: bool) {
        self.state.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Number of `open` calls observed (including failed ones)
    pub fn open_count(&self) -> u32 {
        self.state.open_count.load(Ordering::SeqCst)
    }

    /// Parameters applied to the most recently opened device
    pub fn last_applied(&self) -> Option<NegotiatedParams> {
        self.state.last_applied.lock().clone()
    }

    /// Display-orientation correction applied to the most recent device
    pub fn last_orientation(&self) -> Option<u32> {
        *self.state.last_orientation.lock()
    }
}

impl Default for MockCameraOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraOpener for MockCameraOpener {
    fn open(&self, index: u32) -> Result<Box<dyn CameraDevice>, CameraError> {
        self.state.open_count.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(CameraError::Open {
                index,
                details: "simulated open failure".to_string(),
            });
        }
        debug!("mock camera {} opened", index);
        Ok(Box::new(MockCamera::new(self.caps.clone(), Arc::clone(&self.state))))
    }
}

fn default_capabilities() -> CameraCapabilities {
    CameraCapabilities {
        facing: Facing::Back,
        sensor_orientation: 0,
        preview_sizes: vec![
            Size::new(320, 240),
            Size::new(640, 480),
            Size::new(1280, 720),
        ],
        picture_sizes: vec![
            Size::new(640, 480),
            Size::new(1280, 720),
            Size::new(2048, 1536),
        ],
        fps_ranges: vec![FpsRange::new(5, 15), FpsRange::new(15, 30)],
        focus_modes: vec![FocusMode::Auto, FocusMode::ContinuousVideo],
    }
}

/// In-memory camera device generating pattern frames on a capture thread
pub struct MockCamera {
    caps: CameraCapabilities,
    state: Arc<OpenerState>,
    sink: Option<FrameSink>,
    actual_size: Size,
    running: Arc<AtomicBool>,
    capture: Option<JoinHandle<()>>,
}

impl MockCamera {
    fn new(caps: CameraCapabilities, state: Arc<OpenerState>) -> Self {
        Self {
            caps,
            state,
            sink: None,
            actual_size: Size::new(640, 480),
            running: Arc::new(AtomicBool::new(false)),
            capture: None,
        }
    }

    fn halt_capture(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture.take() {
            let _ = handle.join();
        }
    }
}

impl CameraDevice for MockCamera {
    fn capabilities(&self) -> Result<CameraCapabilities, CameraError> {
        Ok(self.caps.clone())
    }

    fn apply(&mut self, params: &NegotiatedParams) -> Result<(), CameraError> {
        if let Some(size) = params.preview_size {
            self.actual_size = size;
        }
        *self.state.last_applied.lock() = Some(params.clone());
        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), CameraError> {
        *self.state.last_orientation.lock() = Some(degrees);
        Ok(())
    }

    fn attach_sink(&mut self, sink: FrameSink) -> Result<(), CameraError> {
        self.sink = Some(sink);
        Ok(())
    }

    fn start_capture(&mut self) -> Result<(), CameraError> {
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| CameraError::configuration("no capture target attached"))?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let size = self.actual_size;

        let handle = std::thread::Builder::new()
            .name("mock-capture".to_string())
            .spawn(move || {
                let mut frame_id: u64 = 0;
                while running.load(Ordering::SeqCst) {
                    let shade = (frame_id % 256) as u8;
                    let data =
                        vec![shade; size.width as usize * size.height as usize * 3];
                    let frame = FrameData::new(
                        frame_id,
                        SystemTime::now(),
                        data,
                        size.width,
                        size.height,
                        FrameFormat::Rgb24,
                    );
                    // Drop frames when the renderer lags; the channel bound
                    // is the backpressure mechanism.
                    match sink.try_send(frame) {
                        Ok(()) => trace!("mock frame {} delivered", frame_id),
                        Err(crossbeam::channel::TrySendError::Full(_)) => {
                            trace!("mock frame {} dropped, sink full", frame_id)
                        }
                        Err(crossbeam::channel::TrySendError::Disconnected(_)) => break,
                    }
                    frame_id += 1;
                    std::thread::sleep(MOCK_FRAME_INTERVAL);
                }
            })
            .map_err(CameraError::Io)?;

        self.capture = Some(handle);
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<(), CameraError> {
        self.halt_capture();
        Ok(())
    }

    fn actual_preview_size(&self) -> Result<Size, CameraError> {
        Ok(self.actual_size)
    }
}

impl Drop for MockCamera {
    fn drop(&mut self) {
        // Releasing the handle always tears the capture thread down.
        self.halt_capture();
    }
}

/// Render surface that records delegate interactions and drains frames
pub struct RecordingSurface {
    available: AtomicBool,
    sizes: Mutex<Vec<Size>>,
    viewport_updates: AtomicU32,
    sink: FrameSink,
    source: Mutex<FrameSource>,
    frames_seen: AtomicU64,
}

impl RecordingSurface {
    pub fn new(sink_capacity: usize) -> Self {
        let (sink, source) = frame_channel(sink_capacity);
        Self {
            available: AtomicBool::new(true),
            sizes: Mutex::new(Vec::new()),
            viewport_updates: AtomicU32::new(0),
            sink,
            source: Mutex::new(source),
            frames_seen: AtomicU64::new(0),
        }
    }

    pub fn set_surface_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Most recent preview size the delegate propagated
    pub fn last_size(&self) -> Option<Size> {
        self.sizes.lock().last().copied()
    }

    pub fn size_changes(&self) -> Vec<Size> {
        self.sizes.lock().clone()
    }

    pub fn viewport_updates(&self) -> u32 {
        self.viewport_updates.load(Ordering::SeqCst)
    }

    /// Total frames received so far; drains the channel
    pub fn frame_count(&self) -> u64 {
        let drained = self.source.lock().try_iter().count() as u64;
        self.frames_seen.fetch_add(drained, Ordering::SeqCst) + drained
    }
}

impl PreviewSurface for RecordingSurface {
    fn has_surface(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn on_preview_size_changed(&self, size: Size) {
        self.sizes.lock().push(size);
    }

    fn update_viewport(&self) {
        self.viewport_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn frame_sink(&self) -> FrameSink {
        self.sink.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiate;
    use std::time::Instant;

    #[test]
    fn test_open_failure_is_reported() {
        let opener = MockCameraOpener::new();
        opener.set_fail_open(true);
        assert!(opener.open(0).is_err());
        assert_eq!(opener.open_count(), 1);
    }

    #[test]
    fn test_capture_delivers_frames_until_stopped() {
        let opener = MockCameraOpener::new();
        let mut device = opener.open(0).unwrap();
        let caps = device.capabilities().unwrap();
        let params = negotiate::negotiate(&caps, Size::new(320, 240), 30, 0);
        device.apply(&params).unwrap();

        let (sink, source) = frame_channel(32);
        device.attach_sink(sink).unwrap();
        device.start_capture().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let first = loop {
            if let Ok(frame) = source.recv_timeout(Duration::from_millis(100)) {
                break frame;
            }
            assert!(Instant::now() < deadline, "no frame arrived");
        };
        assert_eq!(first.width, 320);
        assert_eq!(first.height, 240);
        assert!(first.validate_size());

        device.stop_capture().unwrap();
        let drained = source.try_iter().count();
        std::thread::sleep(Duration::from_millis(60));
        // No new frames after stop.
        assert_eq!(source.try_iter().count(), 0, "drained {} before stop", drained);
    }

    #[test]
    fn test_start_capture_requires_attached_sink() {
        let opener = MockCameraOpener::new();
        let mut device = opener.open(0).unwrap();
        assert!(device.start_capture().is_err());
    }

    #[test]
    fn test_opener_records_applied_parameters() {
        let opener = MockCameraOpener::new();
        let mut device = opener.open(0).unwrap();
        let caps = device.capabilities().unwrap();
        let params = negotiate::negotiate(&caps, Size::new(640, 480), 30, 90);
        device.apply(&params).unwrap();
        device
            .set_display_orientation(params.display_orientation)
            .unwrap();

        assert_eq!(opener.last_applied(), Some(params.clone()));
        assert_eq!(opener.last_orientation(), Some(params.display_orientation));
    }
}
