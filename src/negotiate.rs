//! Parameter negotiation for a preview session.
//!
//! Pure functions over a device's advertised capability set: focus mode
//! preference, frame-rate range selection, closest-size matching and the
//! display-orientation correction. The preview worker composes them via
//! [`negotiate`] after opening a device.

use crate::device::{CameraCapabilities, Facing, FocusMode, FpsRange, Size};
use tracing::{debug, warn};

/// Outcome of parameter negotiation, ready to apply to the device.
///
/// `None` fields mean the device default is left untouched (for example no
/// usable focus mode, or an empty supported-size list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedParams {
    pub focus_mode: Option<FocusMode>,
    pub fps_range: Option<FpsRange>,
    pub preview_size: Option<Size>,
    pub picture_size: Option<Size>,
    /// Degrees clockwise to rotate frames so they match the screen
    pub display_orientation: u32,
}

/// Pick the focus mode: continuous-video when supported, plain autofocus
/// otherwise, device default when neither is available.
pub fn choose_focus_mode(supported: &[FocusMode]) -> Option<FocusMode> {
    if supported.contains(&FocusMode::ContinuousVideo) {
        Some(FocusMode::ContinuousVideo)
    } else if supported.contains(&FocusMode::Auto) {
        Some(FocusMode::Auto)
    } else {
        None
    }
}

/// Pick the first advertised range containing the target rate.
///
/// When no range contains the target, fall back to the last advertised
/// entry. That heuristic assumes drivers list ranges slowest-first; it is
/// kept as-is rather than searching for the actual fastest range.
pub fn choose_fps_range(ranges: &[FpsRange], target_fps: u32) -> Option<FpsRange> {
    if let Some(range) = ranges.iter().find(|r| r.contains(target_fps)) {
        return Some(*range);
    }
    let fallback = ranges.last().copied();
    if let Some(range) = fallback {
        warn!(
            "no advertised fps range contains {}fps, falling back to {}",
            target_fps, range
        );
    }
    fallback
}

/// Pick the supported size minimizing |Δw| + |Δh| against the requested
/// size. Linear scan; on ties the first minimum encountered wins.
pub fn closest_size(sizes: &[Size], requested: Size) -> Option<Size> {
    let mut best: Option<(u64, Size)> = None;
    for &size in sizes {
        let delta = size.width.abs_diff(requested.width) as u64
            + size.height.abs_diff(requested.height) as u64;
        match best {
            Some((best_delta, _)) if delta >= best_delta => {}
            _ => best = Some((delta, size)),
        }
    }
    best.map(|(_, size)| size)
}

/// Degrees clockwise to rotate the frame buffer so it matches the screen.
///
/// Back camera: (sensor − rotation + 360) mod 360.
/// Front camera: mirror-adjusted, (360 − ((sensor + rotation) mod 360)) mod 360.
pub fn display_orientation(facing: Facing, sensor_orientation: u32, device_rotation: u32) -> u32 {
    let sensor = sensor_orientation % 360;
    let rotation = device_rotation % 360;
    match facing {
        Facing::Back => (sensor + 360 - rotation) % 360,
        Facing::Front => (360 - (sensor + rotation) % 360) % 360,
    }
}

/// Swap width and height when the correction is an odd multiple of 90°
pub fn oriented_size(size: Size, display_orientation: u32) -> Size {
    if display_orientation % 180 != 0 {
        size.swapped()
    } else {
        size
    }
}

/// Negotiate preview parameters against a device's capability set
pub fn negotiate(
    caps: &CameraCapabilities,
    requested: Size,
    target_fps: u32,
    device_rotation: u32,
) -> NegotiatedParams {
    let focus_mode = choose_focus_mode(&caps.focus_modes);
    let fps_range = choose_fps_range(&caps.fps_ranges, target_fps);
    let preview_size = closest_size(&caps.preview_sizes, requested);
    let picture_size = closest_size(&caps.picture_sizes, requested);
    let display_orientation =
        display_orientation(caps.facing, caps.sensor_orientation, device_rotation);

    debug!(
        "negotiated for request {}: preview {:?}, picture {:?}, fps {:?}, focus {:?}, orientation {}°",
        requested, preview_size, picture_size, fps_range, focus_mode, display_orientation
    );

    NegotiatedParams {
        focus_mode,
        fps_range,
        preview_size,
        picture_size,
        display_orientation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(list: &[(u32, u32)]) -> Vec<Size> {
        list.iter().map(|&(w, h)| Size::new(w, h)).collect()
    }

    #[test]
    fn test_focus_mode_prefers_continuous_video() {
        let supported = [FocusMode::Fixed, FocusMode::Auto, FocusMode::ContinuousVideo];
        assert_eq!(choose_focus_mode(&supported), Some(FocusMode::ContinuousVideo));
    }

    #[test]
    fn test_focus_mode_falls_back_to_auto() {
        let supported = [FocusMode::Infinity, FocusMode::Auto];
        assert_eq!(choose_focus_mode(&supported), Some(FocusMode::Auto));
    }

    #[test]
    fn test_focus_mode_leaves_default_when_unsupported() {
        assert_eq!(choose_focus_mode(&[FocusMode::Fixed]), None);
        assert_eq!(choose_focus_mode(&[]), None);
    }

    #[test]
    fn test_fps_range_first_containing_target_wins() {
        let ranges = [
            FpsRange::new(5, 15),
            FpsRange::new(10, 30),
            FpsRange::new(24, 30),
        ];
        assert_eq!(choose_fps_range(&ranges, 30), Some(FpsRange::new(10, 30)));
    }

    #[test]
    fn test_fps_range_falls_back_to_last_entry() {
        let ranges = [FpsRange::new(5, 10), FpsRange::new(10, 20)];
        assert_eq!(choose_fps_range(&ranges, 60), Some(FpsRange::new(10, 20)));
        assert_eq!(choose_fps_range(&[], 30), None);
    }

    #[test]
    fn test_closest_size_minimizes_manhattan_delta() {
        let supported = sizes(&[(320, 240), (640, 480), (1280, 720), (1920, 1080)]);
        assert_eq!(
            closest_size(&supported, Size::new(600, 500)),
            Some(Size::new(640, 480))
        );
        assert_eq!(
            closest_size(&supported, Size::new(1300, 700)),
            Some(Size::new(1280, 720))
        );
    }

    #[test]
    fn test_closest_size_first_minimum_wins_ties() {
        // Both entries are 100 off from the request; the first scanned wins.
        let supported = sizes(&[(700, 480), (640, 520), (640, 440)]);
        assert_eq!(
            closest_size(&supported, Size::new(640, 480)),
            Some(Size::new(700, 480))
        );
    }

    #[test]
    fn test_closest_size_exact_match() {
        let supported = sizes(&[(320, 240), (640, 480)]);
        assert_eq!(
            closest_size(&supported, Size::new(640, 480)),
            Some(Size::new(640, 480))
        );
        assert_eq!(closest_size(&[], Size::new(640, 480)), None);
    }

    #[test]
    fn test_back_camera_orientation() {
        assert_eq!(display_orientation(Facing::Back, 90, 0), 90);
        assert_eq!(display_orientation(Facing::Back, 90, 90), 0);
        assert_eq!(display_orientation(Facing::Back, 90, 180), 270);
        assert_eq!(display_orientation(Facing::Back, 90, 270), 180);
        assert_eq!(display_orientation(Facing::Back, 0, 90), 270);
    }

    #[test]
    fn test_front_camera_orientation_is_mirror_adjusted() {
        assert_eq!(display_orientation(Facing::Front, 270, 0), 90);
        assert_eq!(display_orientation(Facing::Front, 270, 90), 0);
        assert_eq!(display_orientation(Facing::Front, 270, 180), 270);
        assert_eq!(display_orientation(Facing::Front, 270, 270), 180);
        assert_eq!(display_orientation(Facing::Front, 0, 0), 0);
    }

    #[test]
    fn test_oriented_size_swaps_only_on_odd_quarter_turns() {
        let size = Size::new(640, 480);
        assert_eq!(oriented_size(size, 0), size);
        assert_eq!(oriented_size(size, 180), size);
        assert_eq!(oriented_size(size, 90), size.swapped());
        assert_eq!(oriented_size(size, 270), size.swapped());
    }

    #[test]
    fn test_negotiate_composes_all_choices() {
        let caps = CameraCapabilities {
            facing: Facing::Back,
            sensor_orientation: 90,
            preview_sizes: sizes(&[(320, 240), (640, 480), (1280, 720)]),
            picture_sizes: sizes(&[(640, 480), (2048, 1536)]),
            fps_ranges: vec![FpsRange::new(5, 15), FpsRange::new(15, 30)],
            focus_modes: vec![FocusMode::Auto, FocusMode::ContinuousVideo],
        };

        let params = negotiate(&caps, Size::new(640, 480), 30, 0);
        assert_eq!(params.focus_mode, Some(FocusMode::ContinuousVideo));
        assert_eq!(params.fps_range, Some(FpsRange::new(15, 30)));
        assert_eq!(params.preview_size, Some(Size::new(640, 480)));
        assert_eq!(params.picture_size, Some(Size::new(640, 480)));
        assert_eq!(params.display_orientation, 90);
    }
}
