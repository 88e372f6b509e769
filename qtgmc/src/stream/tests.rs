use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::frame::Format;
use crate::testing::{flat_clip, row_index_clip};

#[test]
fn test_each_index_evaluated_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let stream = Stream::new("square", 10, move |n| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(n * n)
    });

    assert_eq!(*stream.get(3).unwrap(), 9);
    assert_eq!(*stream.get(3).unwrap(), 9);
    assert_eq!(*stream.get(4).unwrap(), 16);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(stream.evaluations(), 2);
}

#[test]
fn test_eviction_recomputes_identical_value() {
    let stream = Stream::with_capacity("double", 100, 2, |n| Ok(n * 2));
    for n in 0..10 {
        assert_eq!(*stream.get(n).unwrap(), n * 2);
    }
    assert_eq!(*stream.get(0).unwrap(), 0);
    assert_eq!(stream.evaluations(), 11);
}

#[test]
fn test_out_of_range_names_stream() {
    let stream = Stream::new("short", 2, |n| Ok(n));
    let err = stream.get(5).unwrap_err();
    assert_eq!(err.stage, "short");
    assert_eq!(err.frame, 5);
    assert_eq!(err.kind, StageErrorKind::FrameOutOfRange { len: 2 });
}

#[test]
fn test_get_clamped_pins_edges() {
    let stream = Stream::from_vec("items", vec![10, 20, 30]);
    assert_eq!(*stream.get_clamped(-4).unwrap(), 10);
    assert_eq!(*stream.get_clamped(7).unwrap(), 30);
}

#[test]
fn test_failure_is_isolated_to_one_frame() {
    let stream = Stream::new("flaky", 4, |n| {
        if n == 2 {
            Err(StageError::new("flaky", n, StageErrorKind::Engine("boom".into())))
        } else {
            Ok(n)
        }
    });
    assert!(stream.get(2).is_err());
    assert_eq!(*stream.get(1).unwrap(), 1);
    assert_eq!(*stream.get(3).unwrap(), 3);
    // failures are not cached; a retry reproduces the same error
    assert_eq!(stream.get(2).unwrap_err().kind, StageErrorKind::Engine("boom".into()));
}

#[test]
fn test_zip_reports_dimension_mismatch_with_stage_name() {
    let a = flat_clip(Format::YUV420P8, 8, 8, 2, 10);
    let b = flat_clip(Format::YUV420P8, 8, 4, 2, 10);
    let zipped = a.zip("combine", &b, |x, _| x.clone());
    let err = zipped.frame(1).unwrap_err();
    assert_eq!(err.stage, "combine");
    assert_eq!(err.frame, 1);
    assert!(matches!(err.kind, StageErrorKind::DimensionMismatch { .. }));
}

#[test]
fn test_map_preserves_info() {
    let clip = row_index_clip(Format::GRAY8, 4, 4, 3);
    let shifted = clip.map("shift", |frame| frame.map_planes(crate::frame::Planes::All, |_, p| p.map(|v| v + 1)));
    assert_eq!(shifted.info(), clip.info());
    assert_eq!(*shifted.frame(2).unwrap().plane(0).get(0, 3), 204);
}

#[test]
fn test_render_evaluates_each_index() {
    let clip = row_index_clip(Format::GRAY8, 4, 4, 6);
    let doubled = clip.map("double", |f| f.map_planes(crate::frame::Planes::All, |_, p| p.map(|v| v * 2)));
    let frames = doubled.render(0..6);
    assert_eq!(frames.len(), 6);
    for (n, frame) in frames.into_iter().enumerate() {
        let frame = frame.unwrap();
        assert_eq!(*frame.plane(0).get(0, 1), 2 * (1 + 100 * n as i32));
    }
}
