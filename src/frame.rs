use crossbeam::channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel layout of frames a capture backend hands to the render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// JPEG-compressed frames straight from the driver; the renderer decodes
    Mjpeg,
    /// Packed YUV 4:2:2, ready for a YUV-aware texture upload
    Yuyv,
    /// Interleaved 8-bit RGB
    Rgb24,
}

impl FrameFormat {
    /// Pixel stride in bytes; zero for compressed layouts without one
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Mjpeg => 0,
            FrameFormat::Yuyv => 2,
            FrameFormat::Rgb24 => 3,
        }
    }

    /// Whether the payload length depends on image content
    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// One preview frame on its way from the capture backend to the surface
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Monotonic frame identifier within a capture session
    pub id: u64,
    /// Capture time as reported by the session
    pub timestamp: SystemTime,
    /// Frame payload; shared so the surface can fan it out cheaply
    pub data: Arc<Vec<u8>>,
    /// Width in pixels, before any display-orientation swap
    pub width: u32,
    /// Height in pixels, before any display-orientation swap
    pub height: u32,
    pub format: FrameFormat,
}

impl FrameData {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Payload length implied by the dimensions, for layouts with a fixed
    /// pixel stride; `None` when the length depends on image content
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    /// Whether the payload length matches the dimensions. Always true for
    /// content-dependent layouts.
    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }
}

/// Sending half of the destination buffer a capture session feeds.
///
/// The render surface owns the receiving half; the camera backend is handed
/// this sender when it is bound as the capture target.
pub type FrameSink = Sender<FrameData>;

/// Receiving half of the frame channel, owned by the render surface.
pub type FrameSource = Receiver<FrameData>;

/// Create a bounded frame channel.
///
/// The channel is bounded so a stalled renderer applies backpressure to the
/// capture side instead of buffering frames without limit.
pub fn frame_channel(capacity: usize) -> (FrameSink, FrameSource) {
    bounded(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_format_properties() {
        assert_eq!(FrameFormat::Yuyv.bytes_per_pixel(), 2);
        assert_eq!(FrameFormat::Rgb24.bytes_per_pixel(), 3);
        assert!(FrameFormat::Mjpeg.is_compressed());
        assert!(!FrameFormat::Yuyv.is_compressed());
    }

    #[test]
    fn test_frame_size_validation() {
        let frame = FrameData::new(
            0,
            SystemTime::now(),
            vec![0u8; 640 * 480 * 3],
            640,
            480,
            FrameFormat::Rgb24,
        );
        assert_eq!(frame.expected_size(), Some(640 * 480 * 3));
        assert!(frame.validate_size());

        let short = FrameData::new(1, SystemTime::now(), vec![0u8; 10], 640, 480, FrameFormat::Rgb24);
        assert!(!short.validate_size());

        let mjpeg = FrameData::new(2, SystemTime::now(), vec![0u8; 10], 640, 480, FrameFormat::Mjpeg);
        assert!(mjpeg.validate_size());
    }

    #[test]
    fn test_frame_channel_is_bounded() {
        let (sink, source) = frame_channel(2);
        for id in 0..2 {
            sink.try_send(FrameData::new(
                id,
                SystemTime::now(),
                vec![],
                0,
                0,
                FrameFormat::Mjpeg,
            ))
            .unwrap();
        }
        assert!(sink
            .try_send(FrameData::new(2, SystemTime::now(), vec![], 0, 0, FrameFormat::Mjpeg))
            .is_err());
        assert_eq!(source.try_iter().count(), 2);
    }
}
