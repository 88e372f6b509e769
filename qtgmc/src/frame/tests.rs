use super::*;

#[test]
fn test_peak_and_neutral_follow_bit_depth() {
    assert_eq!(Format::YUV420P8.peak(), 255);
    assert_eq!(Format::YUV420P8.neutral(), 128);
    assert_eq!(Format::YUV420P10.peak(), 1023);
    assert_eq!(Format::YUV420P10.neutral(), 512);
    assert_eq!(Format::YUV420P16.peak(), 65535);
}

#[test]
fn test_scale_maps_eight_bit_constants() {
    assert_eq!(Format::YUV420P8.scale(129.0), 129);
    // 129 * 1023 / 255 = 517.52
    assert_eq!(Format::YUV420P10.scale(129.0), 518);
    assert_eq!(Format::YUV420P10.scale(127.0), 509);
    assert_eq!(Format::YUV420P16.scale(1.0), 257);
}

#[test]
fn test_cround_is_symmetric() {
    assert_eq!(cround(2.5), 3);
    assert_eq!(cround(-2.5), -3);
    assert_eq!(cround(0.49), 0);
}

#[test]
fn test_gray_drops_subsampling() {
    let gray = Format::new(ColorFamily::Gray, 8, 1, 1);
    assert_eq!(gray.subsampling(), (0, 0));
    assert_eq!(gray.num_planes(), 1);
}

#[test]
#[should_panic(expected = "bit depth must be in 8..=16")]
fn test_rejects_unsupported_depth() {
    Format::new(ColorFamily::Yuv, 32, 1, 1);
}

#[test]
fn test_filled_frame_uses_subsampled_planes() {
    let frame = Frame::filled_planes(Format::YUV420P8, 8, 6, &[16, 128, 130]);
    assert_eq!(frame.dimensions(), (8, 6));
    assert_eq!(frame.plane(1).dimensions(), (4, 3));
    assert!(frame.plane(2).iter().all(|&v| v == 130));
}

#[test]
fn test_check_compatible_reports_mismatch() {
    let a = Frame::filled(Format::YUV420P8, 8, 6, 0);
    let b = Frame::filled(Format::YUV420P8, 8, 4, 0);
    let c = Frame::filled(Format::YUV444P8, 8, 6, 0);
    assert!(a.check_compatible(&a.clone()).is_ok());
    assert_eq!(
        a.check_compatible(&b),
        Err(StageErrorKind::DimensionMismatch {
            expected: (8, 6),
            actual: (8, 4)
        })
    );
    assert!(matches!(
        a.check_compatible(&c),
        Err(StageErrorKind::FormatMismatch { .. })
    ));
}

#[test]
fn test_map_planes_copies_unselected() {
    let frame = Frame::filled_planes(Format::YUV420P8, 4, 4, &[10, 20, 30]);
    let mapped = frame.map_planes(Planes::Luma, |_, plane| plane.map(|v| v + 1));
    assert!(mapped.plane(0).iter().all(|&v| v == 11));
    assert!(mapped.plane(1).iter().all(|&v| v == 20));
    assert!(mapped.plane(2).iter().all(|&v| v == 30));
}

#[test]
fn test_field_parity_by_order() {
    let tff = FieldOrder::TopFieldFirst;
    let bff = FieldOrder::BottomFieldFirst;
    assert!(tff.field_is_top(0));
    assert!(!tff.field_is_top(1));
    assert!(!bff.field_is_top(0));
    assert!(bff.field_is_top(3));
}
