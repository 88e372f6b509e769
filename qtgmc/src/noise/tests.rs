use std::sync::Arc;

use super::*;
use crate::config::DenoiserKind;
use crate::engine::{SceneChange, SearchParams, SoftwareEngine};
use crate::frame::Format;
use crate::testing::{assert_clips_equal, clip_from_fn, flat_clip, noisy_clip, static_ramp_clip};

fn search_params() -> SearchParams {
    SearchParams {
        block_size: 8,
        overlap: 0,
        search: 4,
        search_param: 1,
        pel_search: 1,
        sub_pel: 1,
        lambda: 0,
        lsad: 1200,
        pnew: 0,
        plevel: 0,
        global: true,
        true_motion: false,
        dct: 0,
        chroma: false,
    }
}

fn motion_field(search: &Clip, radius: usize) -> MotionField {
    MotionField::analyse(
        Arc::new(SoftwareEngine),
        search,
        radius,
        &search_params(),
        SceneChange {
            thscd1: 180,
            thscd2: 98,
        },
        Planes::All,
    )
}

fn noise_config(deint: NoiseDeint) -> NoiseConfig {
    NoiseConfig {
        process: 1,
        preset: Default::default(),
        denoiser: DenoiserKind::Dfttest,
        motion_compensated: true,
        temporal_radius: 1,
        sigma: 2.0,
        chroma: false,
        show: 0.0,
        grain_restore: 0.0,
        noise_restore: 0.0,
        deint,
        stabilize: false,
    }
}

#[test]
fn test_extracted_noise_restores_original() {
    let original = noisy_clip(Format::GRAY8, 16, 16, 2, 12, 7);
    let denoised = static_ramp_clip(Format::GRAY8, 16, 16, 2);
    let noise = extract(&denoised, &original, Planes::All);

    let rebuilt = denoised.merge_diff(&noise, Planes::All);
    assert_clips_equal(&rebuilt, &original, 0..2);

    let restored = restore(&denoised, &noise, 1.0, 128.0, Planes::All);
    assert_clips_equal(&restored, &original, 0..2);
}

#[test]
fn test_restore_with_zero_amount_is_identity() {
    let clip = static_ramp_clip(Format::GRAY8, 16, 16, 2);
    let noise = noisy_clip(Format::GRAY8, 16, 16, 2, 30, 3);
    let restored = restore(&clip, &noise, 0.0, 128.0, Planes::All);
    assert_clips_equal(&restored, &clip, 0..2);
}

#[test]
fn test_generated_field_of_flat_noise_is_flat() {
    let noise = flat_clip(Format::GRAY8, 16, 16, 2, 140);
    let generated = generate_second_field(&noise, FieldOrder::TopFieldFirst, false);
    assert_eq!(generated.len(), 4);
    assert_eq!((generated.width(), generated.height()), (16, 16));
    let expected = flat_clip(Format::GRAY8, 16, 16, 4, 140);
    assert_clips_equal(&generated, &expected, 0..4);
}

#[test]
fn test_generated_field_keeps_known_rows_and_stays_in_local_range() {
    let noise = clip_from_fn(Format::GRAY8, 16, 16, 1, |x, y, _| 100 + (x + y) as i32);
    let generated = generate_second_field(&noise, FieldOrder::TopFieldFirst, false);

    for j in 0..2 {
        let frame = generated.frame(j).unwrap();
        let plane = frame.plane(0);
        let known_parity = if j == 0 { 0 } else { 1 };
        for y in 0..16 {
            for x in 0..16 {
                let v = *plane.get(x, y);
                if y % 2 == known_parity {
                    assert_eq!(v, 100 + (x + y) as i32, "frame {j} ({x}, {y})");
                } else {
                    assert!((100..=131).contains(&v), "frame {j} ({x}, {y}) = {v}");
                }
            }
        }
    }
}

#[test]
fn test_generated_grain_is_deterministic() {
    let noise = noisy_clip(Format::GRAY8, 16, 16, 2, 20, 11);
    let a = generate_second_field(&noise, FieldOrder::BottomFieldFirst, false);
    let b = generate_second_field(&noise, FieldOrder::BottomFieldFirst, false);
    assert_clips_equal(&a, &b, 0..4);
}

#[test]
fn test_show_neutralises_chroma_unless_requested() {
    let noise = Clip::from_frames(
        "noise",
        vec![Frame::filled_planes(Format::YUV420P8, 16, 16, &[130, 140, 140])],
    );

    let luma_only = show(&noise, 2.0, false).frame(0).unwrap();
    assert_eq!(*luma_only.plane(0).get(3, 3), 132);
    assert_eq!(*luma_only.plane(1).get(3, 3), 128);

    let with_chroma = show(&noise, 2.0, true).frame(0).unwrap();
    assert_eq!(*with_chroma.plane(2).get(3, 3), 152);
}

#[test]
fn test_stabilize_static_noise_is_identity() {
    let noise = static_ramp_clip(Format::GRAY8, 16, 16, 3);
    let motion = motion_field(&noise, 1);
    let stabilized = stabilize(&noise, &motion, Planes::All);
    assert_clips_equal(&stabilized, &noise, 0..3);
}

#[test]
fn test_bypass_produces_interlaced_denoise_and_double_rate_noise() {
    crate::testing::init_tracing();
    let clip = noisy_clip(Format::GRAY8, 16, 16, 3, 10, 5);
    let engines = EngineContext::software();
    let order = FieldOrder::TopFieldFirst;
    let search = engines.interpolator.bob(&clip, order, 0.0, 0.5);
    let motion = motion_field(&search, 1);

    for deint in [NoiseDeint::Bob, NoiseDeint::Generate, NoiseDeint::DoubleWeave] {
        let bypass = NoiseBypass::build(&clip, order, &noise_config(deint), &engines, &motion);
        assert_eq!(bypass.denoised.len(), 3);
        assert_eq!(bypass.noise.len(), 6, "{deint}");
        assert_eq!(bypass.noise.height(), 16);
        assert!(bypass.noise.render(0..6).iter().all(|frame| frame.is_ok()));
    }
}

#[test]
fn test_bypass_noise_restores_source() {
    let clip = noisy_clip(Format::GRAY8, 16, 16, 2, 10, 9);
    let engines = EngineContext::software();
    let order = FieldOrder::TopFieldFirst;
    let search = engines.interpolator.bob(&clip, order, 0.0, 0.5);
    let motion = motion_field(&search, 1);

    let bypass = NoiseBypass::build(
        &clip,
        order,
        &noise_config(NoiseDeint::DoubleWeave),
        &engines,
        &motion,
    );
    let noise = extract(&bypass.denoised, &clip, Planes::All);
    let rebuilt = bypass.denoised.merge_diff(&noise, Planes::All);
    assert_clips_equal(&rebuilt, &clip, 0..2);
}
