use super::*;
use crate::frame::{Format, Frame};
use crate::testing::{assert_clips_equal, clip_from_fn, flat_clip, panning_clip};

fn luma_at(clip: &Clip, x: usize, y: usize) -> i32 {
    *clip.frame(0).unwrap().plane(0).get(x, y)
}

#[test]
fn test_zero_strength_returns_input() {
    let input = panning_clip(Format::YUV420P8, 16, 16, 2, 1, 0);
    let reference = flat_clip(Format::YUV420P8, 16, 16, 2, 60);
    let repaired = repair(&input, &reference, RepairStrength::new(0, 3), true);
    assert_clips_equal(&repaired, &input, 0..2);
}

#[test]
fn test_identical_reference_leaves_input_unchanged() {
    let input = panning_clip(Format::YUV420P8, 16, 16, 2, 2, 1);
    for erosion in 1..=RepairStrength::MAX_EROSION {
        for over_dilation in 0..=RepairStrength::MAX_OVER_DILATION {
            let strength = RepairStrength::new(erosion, over_dilation);
            let repaired = repair(&input, &input, strength, true);
            assert_clips_equal(&repaired, &input, 0..2);
        }
    }
}

#[test]
fn test_thin_line_stays_fixed_and_wide_band_is_restored() {
    let smoothed = flat_clip(Format::GRAY8, 16, 16, 1, 100);
    let reference = clip_from_fn(Format::GRAY8, 16, 16, 1, |_, y, _| match y {
        2 => 140,
        6..=11 => 140,
        _ => 100,
    });
    let repaired = repair(&smoothed, &reference, RepairStrength::new(1, 0), false);

    // one-row difference is shimmer: keep the smoothed value
    assert_eq!(luma_at(&repaired, 8, 2), 100);
    // the inside of a six-row band is real detail
    for y in 7..=10 {
        assert_eq!(luma_at(&repaired, 8, y), 140, "row {y}");
    }
    // outside the band nothing changes
    assert_eq!(luma_at(&repaired, 8, 14), 100);
}

#[test]
fn test_chroma_only_repaired_on_request() {
    let input = Clip::from_frames(
        "input",
        vec![Frame::filled_planes(Format::YUV420P8, 16, 16, &[100, 90, 90])],
    );
    let reference = Clip::from_frames(
        "reference",
        vec![Frame::filled_planes(Format::YUV420P8, 16, 16, &[100, 150, 150])],
    );

    let luma_only = repair(&input, &reference, RepairStrength::new(2, 0), false);
    assert_eq!(*luma_only.frame(0).unwrap().plane(1).get(2, 2), 90);

    let with_chroma = repair(&input, &reference, RepairStrength::new(2, 0), true);
    assert_eq!(*with_chroma.frame(0).unwrap().plane(1).get(2, 2), 150);
}
