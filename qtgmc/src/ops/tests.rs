use super::*;
use crate::frame::{Format, Plane};
use crate::testing::flat_clip;

fn gray(rows: &[&[i32]]) -> Frame {
    let width = rows[0].len();
    let pixels = rows.iter().flat_map(|r| r.iter().copied()).collect();
    Frame::from_planes(Format::GRAY8, vec![Plane::new(width, rows.len(), pixels)])
}

fn luma(frame: &Frame) -> Vec<Vec<i32>> {
    frame.plane(0).rows().map(|r| r.to_vec()).collect()
}

/// 5x5 frame of `background` with `value` at the centre.
fn impulse(background: i32, value: i32) -> Frame {
    let mut frame = Frame::filled(Format::GRAY8, 5, 5, background);
    *frame.plane_mut(0).get_mut(2, 2) = value;
    frame
}

#[test]
fn test_make_diff_round_trips_beyond_pixel_range() {
    let a = gray(&[&[250, 0, 17]]);
    let b = gray(&[&[5, 255, 17]]);
    let diff = pixel::make_diff(&a, &b, Planes::All);
    assert_eq!(luma(&diff), vec![vec![373, -127, 128]]);
    assert_eq!(pixel::merge_diff(&b, &diff, Planes::All), a);
}

#[test]
fn test_merge_weight_is_share_of_second_input() {
    let a = gray(&[&[10, 100]]);
    let b = gray(&[&[90, 100]]);
    assert_eq!(luma(&pixel::merge(&a, &b, 0.5, Planes::All)), vec![vec![50, 100]]);
    assert_eq!(pixel::merge(&a, &b, 0.0, Planes::All), a);
    assert_eq!(pixel::merge(&a, &b, 1.0, Planes::All), b);
}

#[test]
fn test_masked_merge_follows_mask() {
    let a = gray(&[&[10, 10, 10]]);
    let b = gray(&[&[200, 200, 200]]);
    let mask = gray(&[&[0, 255, 400]]);
    let out = pixel::masked_merge(&a, &b, &mask, Planes::All);
    assert_eq!(luma(&out), vec![vec![10, 200, 200]]);
}

#[test]
fn test_clamp_between_applies_overshoot() {
    let x = gray(&[&[0, 50, 120]]);
    let bright = gray(&[&[100, 100, 100]]);
    let dark = gray(&[&[40, 40, 40]]);
    let out = pixel::clamp_between(&x, &bright, &dark, 5, 3, Planes::All);
    assert_eq!(luma(&out), vec![vec![37, 50, 105]]);
}

#[test]
fn test_expression_keeps_unselected_planes() {
    let frame = Frame::filled_planes(Format::YUV420P8, 4, 4, &[10, 20, 30]);
    let out = pixel::expr1(&frame, Planes::Luma, SampleRange::Pixel, |x| x * 100);
    assert!(out.plane(0).iter().all(|&v| v == 255));
    assert!(out.plane(1).iter().all(|&v| v == 20));
}

#[test]
fn test_vertical_minimum_removes_single_row() {
    let frame = gray(&[
        &[10, 10, 10],
        &[10, 10, 10],
        &[200, 200, 200],
        &[10, 10, 10],
        &[10, 10, 10],
    ]);
    let eroded = morphology::minimum(&frame, Planes::All, Neighbourhood::Vertical);
    assert!(eroded.plane(0).iter().all(|&v| v == 10));

    let dilated = morphology::maximum(&frame, Planes::All, Neighbourhood::Vertical);
    let column: Vec<i32> = luma(&dilated).iter().map(|r| r[0]).collect();
    assert_eq!(column, vec![10, 200, 200, 200, 10]);
}

#[test]
fn test_horizontal_maximum_ignores_rows() {
    let frame = gray(&[&[0, 0, 0], &[0, 0, 90], &[0, 0, 0]]);
    let out = morphology::maximum(&frame, Planes::All, Neighbourhood::Horizontal);
    assert_eq!(luma(&out), vec![vec![0, 0, 0], vec![0, 90, 90], vec![0, 0, 0]]);
}

#[test]
fn test_minimum_reflects_at_edges() {
    // reflect-101: the neighbour above row 0 is row 1
    let frame = gray(&[&[50, 50], &[20, 20], &[80, 80]]);
    let out = morphology::minimum(&frame, Planes::All, Neighbourhood::Vertical);
    assert_eq!(luma(&out), vec![vec![20, 20], vec![20, 20], vec![20, 20]]);
}

#[test]
fn test_inflate_and_deflate_are_one_sided() {
    let hole = impulse(80, 0);
    assert_eq!(*morphology::inflate(&hole, Planes::All).plane(0).get(2, 2), 80);
    assert_eq!(*morphology::deflate(&hole, Planes::All).plane(0).get(2, 2), 0);

    let spike = impulse(20, 100);
    assert_eq!(*morphology::deflate(&spike, Planes::All).plane(0).get(2, 2), 20);
    // a neighbour of the spike sees one bright pixel: (7 * 20 + 100 + 4) / 8 = 30
    assert_eq!(*morphology::inflate(&spike, Planes::All).plane(0).get(1, 1), 30);
}

#[test]
fn test_median_removes_isolated_spike() {
    let out = morphology::median(&impulse(40, 250), Planes::All);
    assert!(out.plane(0).iter().all(|&v| v == 40));
}

#[test]
fn test_blur_kernels() {
    let out = morphology::blur(&impulse(0, 160), Planes::All, Neighbourhood::Square);
    assert_eq!(*out.plane(0).get(2, 2), 40);
    assert_eq!(*out.plane(0).get(1, 2), 20);
    assert_eq!(*out.plane(0).get(1, 1), 10);

    let out = morphology::blur(&impulse(0, 160), Planes::All, Neighbourhood::Vertical);
    assert_eq!(*out.plane(0).get(2, 2), 80);
    assert_eq!(*out.plane(0).get(2, 1), 40);
    assert_eq!(*out.plane(0).get(1, 2), 0);
}

#[test]
fn test_vertical_cleaner_keeps_outer_rows() {
    let frame = gray(&[&[90], &[10], &[200], &[12], &[70]]);
    let out = rank::vertical_cleaner(&frame, Planes::All);
    assert_eq!(luma(&out), vec![vec![90], vec![90], vec![12], vec![70], vec![70]]);
}

#[test]
fn test_remove_grain_clamps_to_second_extremes() {
    let mut frame = impulse(40, 250);
    *frame.plane_mut(0).get_mut(1, 1) = 240;
    let out = rank::remove_grain(&frame, Planes::All, RankClamp::SecondExtremes);
    // one neighbour is 240, the second largest is 40
    assert_eq!(*out.plane(0).get(2, 2), 40);
    // border pixels are left alone
    assert_eq!(*out.plane(0).get(0, 0), 40);

    let out = rank::remove_grain(&frame, Planes::All, RankClamp::Extremes);
    assert_eq!(*out.plane(0).get(2, 2), 240);
}

#[test]
fn test_repair_limits_to_reference_window() {
    let frame = impulse(100, 250);
    let reference = Frame::filled(Format::GRAY8, 5, 5, 100);
    let out = rank::repair(&frame, &reference, Planes::All, RankClamp::Extremes);
    assert_eq!(out, reference);

    let mut reference = Frame::filled(Format::GRAY8, 5, 5, 100);
    *reference.plane_mut(0).get_mut(2, 2) = 180;
    let out = rank::repair(&frame, &reference, Planes::All, RankClamp::SecondExtremes);
    // the reference centre widens the window
    assert_eq!(*out.plane(0).get(2, 2), 180);
}

#[test]
fn test_average_frames_mean_and_scene_change() {
    let frames = [10, 30, 50, 250]
        .iter()
        .map(|&v| Frame::filled(Format::GRAY8, 4, 2, v))
        .collect();
    let clip = Clip::from_frames("steps", frames);

    let plain = average_frames(&clip, 1, None, Planes::All);
    assert_eq!(*plain.frame(1).unwrap().plane(0).get(0, 0), 30);
    // clamped at the start: (10 + 10 + 30) / 3
    assert_eq!(*plain.frame(0).unwrap().plane(0).get(0, 0), 17);

    let cut = average_frames(&clip, 1, Some(28.0 / 255.0), Planes::All);
    assert_eq!(*cut.frame(1).unwrap().plane(0).get(0, 0), 30);
    // frame 3 is past a cut: its window repeats itself
    assert_eq!(*cut.frame(3).unwrap().plane(0).get(0, 0), 250);
    // frame 2 keeps 30 and 50 but not 250: (30 + 50 + 50) / 3
    assert_eq!(*cut.frame(2).unwrap().plane(0).get(0, 0), 43);
}

#[test]
fn test_luma_difference_is_fraction_of_peak() {
    let a = Frame::filled(Format::GRAY8, 2, 2, 0);
    let b = Frame::filled(Format::GRAY8, 2, 2, 51);
    assert!((luma_difference(&a, &b) - 0.2).abs() < 1e-12);
}

#[test]
fn test_clip_ops_report_mismatch_per_frame() {
    let a = flat_clip(Format::GRAY8, 8, 8, 2, 10);
    let b = flat_clip(Format::GRAY16, 8, 8, 2, 10);
    let err = a.make_diff(&b, Planes::All).frame(0).unwrap_err();
    assert_eq!(err.stage, "make_diff");
    assert!(matches!(
        err.kind,
        crate::error::StageErrorKind::FormatMismatch { .. }
    ));
}

#[test]
fn test_unsharp_amount_zero_is_identity() {
    let frame = impulse(40, 90);
    let blurred = morphology::blur(&frame, Planes::All, Neighbourhood::Square);
    assert_eq!(unsharp(&frame, &blurred, 0.0), frame);
    let sharpened = unsharp(&frame, &blurred, 1.0);
    assert!(*sharpened.plane(0).get(2, 2) > 90);
}
