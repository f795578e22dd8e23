//! V4L2 capture backend, enabled with the `v4l2` feature on Linux.
//!
//! Implements [`CameraDevice`] over `/dev/video*`. V4L2 exposes neither
//! facing nor focus-mode metadata through this API, so the capability report
//! is conservative: back-facing, no sensor offset, no focus modes (the device
//! default is left untouched) and a single permissive fps range, since the
//! driver takes an exact frame interval rather than a range.

use crate::device::{
    CameraCapabilities, CameraDevice, CameraOpener, Facing, FpsRange, Size,
};
use crate::error::CameraError;
use crate::frame::{FrameData, FrameFormat, FrameSink};
use crate::negotiate::NegotiatedParams;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::SystemTime;
use tracing::{debug, error, trace, warn};

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::FourCC;

const CAPTURE_BUFFERS: u32 = 4;

/// Opens V4L2 devices by index
#[derive(Default)]
pub struct V4l2Opener;

impl V4l2Opener {
    pub fn new() -> Self {
        Self
    }
}

impl CameraOpener for V4l2Opener {
    fn open(&self, index: u32) -> Result<Box<dyn CameraDevice>, CameraError> {
        let device = v4l::Device::new(index as usize).map_err(|e| CameraError::Open {
            index,
            details: e.to_string(),
        })?;
        debug!("opened /dev/video{}", index);
        Ok(Box::new(V4l2Camera {
            device: Arc::new(device),
            index,
            sink: None,
            running: Arc::new(AtomicBool::new(false)),
            capture: None,
        }))
    }
}

pub struct V4l2Camera {
    device: Arc<v4l::Device>,
    index: u32,
    sink: Option<FrameSink>,
    running: Arc<AtomicBool>,
    capture: Option<JoinHandle<()>>,
}

impl V4l2Camera {
    fn halt_capture(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture.take() {
            let _ = handle.join();
        }
    }

    fn enum_sizes(&self, fourcc: FourCC) -> Vec<Size> {
        match self.device.enum_framesizes(fourcc) {
            Ok(sizes) => sizes
                .into_iter()
                .flat_map(|fs| fs.size.to_discrete())
                .map(|d| Size::new(d.width, d.height))
                .collect(),
            Err(e) => {
                warn!("frame size enumeration failed on camera {}: {}", self.index, e);
                Vec::new()
            }
        }
    }
}

impl CameraDevice for V4l2Camera {
    fn capabilities(&self) -> Result<CameraCapabilities, CameraError> {
        let sizes = self.enum_sizes(FourCC::new(b"MJPG"));
        Ok(CameraCapabilities {
            facing: Facing::Back,
            sensor_orientation: 0,
            preview_sizes: sizes.clone(),
            picture_sizes: sizes,
            fps_ranges: vec![FpsRange::new(1, 120)],
            focus_modes: Vec::new(),
        })
    }

    fn apply(&mut self, params: &NegotiatedParams) -> Result<(), CameraError> {
        let mut fmt = self
            .device
            .format()
            .map_err(|e| CameraError::configuration(format!("failed to get format: {}", e)))?;

        if let Some(size) = params.preview_size {
            fmt.width = size.width;
            fmt.height = size.height;
        }
        fmt.fourcc = FourCC::new(b"MJPG");
        self.device
            .set_format(&fmt)
            .map_err(|e| CameraError::configuration(format!("failed to set format: {}", e)))?;

        if let Some(range) = params.fps_range {
            let fps = range.max;
            self.device
                .set_params(&v4l::video::capture::Parameters::with_fps(fps))
                .map_err(|e| {
                    CameraError::configuration(format!("failed to set frame rate: {}", e))
                })?;
        }

        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<(), CameraError> {
        // V4L2 has no display-orientation control; the renderer applies the
        // correction when drawing.
        debug!("display orientation {}° noted for camera {}", degrees, self.index);
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

        let actual = self.actual_preview_size()?;
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let device = Arc::clone(&self.device);
        let index = self.index;

        // The mmap stream can only be created on the capture thread; report
        // creation failures back so start_capture does not claim success.
        let (ready_tx, ready_rx) = crossbeam::channel::bounded::<Result<(), String>>(1);

        let handle = std::thread::Builder::new()
            .name(format!("v4l2-capture-{}", index))
            .spawn(move || {
                let mut stream =
                    match Stream::with_buffers(&*device, Type::VideoCapture, CAPTURE_BUFFERS) {
                        Ok(stream) => {
                            let _ = ready_tx.send(Ok(()));
                            stream
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                            return;
                        }
                    };

                let mut frame_id: u64 = 0;
                while running.load(Ordering::SeqCst) {
                    match stream.next() {
                        Ok((buffer, _meta)) => {
                            let frame = FrameData::new(
                                frame_id,
                                SystemTime::now(),
                                buffer.to_vec(),
                                actual.width,
                                actual.height,
                                FrameFormat::Mjpeg,
                            );
                            match sink.try_send(frame) {
                                Ok(()) => trace!("frame {} delivered", frame_id),
                                Err(crossbeam::channel::TrySendError::Full(_)) => {
                                    trace!("frame {} dropped, sink full", frame_id)
                                }
                                Err(crossbeam::channel::TrySendError::Disconnected(_)) => break,
                            }
                            frame_id += 1;
                        }
                        Err(e) => {
                            error!("frame capture error on camera {}: {}", index, e);
                            break;
                        }
                    }
                }
                debug!("capture stream on camera {} ended after {} frames", index, frame_id);
            })
            .map_err(CameraError::Io)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.capture = Some(handle);
                Ok(())
            }
            Ok(Err(details)) => {
                let _ = handle.join();
                Err(CameraError::runtime(format!(
                    "failed to create capture stream: {}",
                    details
                )))
            }
            Err(_) => {
                let _ = handle.join();
                Err(CameraError::runtime("capture thread exited before streaming"))
            }
        }
    }

    fn stop_capture(&mut self) -> Result<(), CameraError> {
        self.halt_capture();
        Ok(())
    }

    fn actual_preview_size(&self) -> Result<Size, CameraError> {
        let fmt = self
            .device
            .format()
            .map_err(|e| CameraError::configuration(format!("failed to get format: {}", e)))?;
        Ok(Size::new(fmt.width, fmt.height))
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        self.halt_capture();
    }
}
