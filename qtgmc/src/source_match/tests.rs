use std::sync::Arc;

use super::*;
use crate::config::Preset;
use crate::engine::{SceneChange, SearchParams, SoftwareEngine};
use crate::frame::Format;
use crate::testing::{assert_clips_equal, flat_clip, static_ramp_clip};

const ORDER: FieldOrder = FieldOrder::TopFieldFirst;

fn edi_params() -> EdiParams {
    EdiParams {
        nn_size: 4,
        nn_neurons: 0,
        quality: 1,
        max_d: 4,
    }
}

fn match_config(depth: u8, tr1: u8, tr2: u8) -> SourceMatchConfig {
    SourceMatchConfig {
        depth,
        preset: Preset::Slower,
        edi: InterpolatorKind::Bob,
        edi_params: edi_params(),
        preset2: Preset::Slower,
        edi2: InterpolatorKind::Bob,
        edi2_params: edi_params(),
        tr1,
        tr2,
        enhance: 0.0,
        lossless: 0,
    }
}

fn motion_field(search: &Clip) -> MotionField {
    let params = SearchParams {
        block_size: 8,
        overlap: 0,
        search: 4,
        search_param: 1,
        pel_search: 1,
        sub_pel: 1,
        lambda: 0,
        lsad: 400,
        pnew: 0,
        plevel: 0,
        global: true,
        true_motion: false,
        dct: 0,
        chroma: false,
    };
    MotionField::analyse(
        Arc::new(SoftwareEngine),
        search,
        2,
        &params,
        SceneChange {
            thscd1: 180,
            thscd2: 98,
        },
        Planes::All,
    )
}

fn refine(config: &SourceMatchConfig, basic: &Clip, source: &Clip) -> Clip {
    let engine = SoftwareEngine;
    let motion = motion_field(basic);
    SourceMatcher {
        config,
        order: ORDER,
        motion: &motion,
        interpolator: &engine,
        thsad: 640,
    }
    .refine(basic, source)
}

#[test]
fn test_error_adjustment_closed_form() {
    assert_eq!(error_adjustment(0), 1.0);
    assert!((error_adjustment(1) - 4.0 / 3.0).abs() < 1e-12);
    assert!((error_adjustment(2) - 8.0 / 5.5).abs() < 1e-12);
}

#[test]
fn test_depth_zero_is_identity() {
    let source = flat_clip(Format::GRAY8, 16, 16, 2, 120);
    let basic = flat_clip(Format::GRAY8, 16, 16, 4, 100);
    let refined = refine(&match_config(0, 1, 1), &basic, &source);
    assert_clips_equal(&refined, &basic, 0..4);
}

#[test]
fn test_basic_match_without_smoothing_reinterpolates_source() {
    let source = flat_clip(Format::GRAY8, 16, 16, 2, 120);
    let basic = flat_clip(Format::GRAY8, 16, 16, 4, 100);
    let refined = refine(&match_config(1, 0, 0), &basic, &source);
    assert_clips_equal(&refined, &flat_clip(Format::GRAY8, 16, 16, 4, 120), 0..4);
}

#[test]
fn test_basic_match_over_corrects_source() {
    // 120 * 7/3 - 100 * 4/3 = 146.67
    let source = flat_clip(Format::GRAY8, 16, 16, 2, 120);
    let basic = flat_clip(Format::GRAY8, 16, 16, 4, 100);
    let refined = refine(&match_config(1, 1, 0), &basic, &source);
    assert_clips_equal(&refined, &flat_clip(Format::GRAY8, 16, 16, 4, 147), 0..4);
}

#[test]
fn test_refinement_removes_remaining_error() {
    let source = flat_clip(Format::GRAY8, 16, 16, 2, 120);
    let basic = flat_clip(Format::GRAY8, 16, 16, 4, 100);
    let expected = flat_clip(Format::GRAY8, 16, 16, 4, 120);
    for depth in 2..=3 {
        let refined = refine(&match_config(depth, 1, 1), &basic, &source);
        assert_clips_equal(&refined, &expected, 0..4);
    }
}

#[test]
fn test_consistent_source_is_a_fixed_point() {
    let source = static_ramp_clip(Format::YUV420P8, 16, 16, 3);
    let basic = SoftwareEngine.bob(&source, ORDER, 0.0, 0.5);
    for depth in 1..=3 {
        let refined = refine(&match_config(depth, 1, 1), &basic, &source);
        assert_clips_equal(&refined, &basic, 0..6);
    }
}
