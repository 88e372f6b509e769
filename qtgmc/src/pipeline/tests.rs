use super::*;
use crate::config::{ConfigResolver, Overrides, Preset};
use crate::engine::SoftwareEngine;
use crate::error::{ConfigError, StageError, StageErrorKind};
use crate::frame::Format;
use crate::testing::{
    assert_clips_equal, flat_clip, init_tracing, noisy_clip, panning_clip, static_ramp_clip,
};

const ORDER: FieldOrder = FieldOrder::TopFieldFirst;

/// `preset` with small blocks so that 16x16 test clips hold several.
fn config(preset: Preset, overrides: Overrides) -> Configuration {
    ConfigResolver::new(preset)
        .overrides(Overrides {
            block_size: Some(8),
            ..overrides
        })
        .resolve()
        .unwrap()
}

fn build(clip: &Clip, config: &Configuration) -> Deinterlaced {
    deinterlace_with_stages(clip, ORDER, config, &EngineContext::software()).unwrap()
}

/// Output frame `j` equals input frame `j / 2`.
fn assert_fields_repeated(output: &Clip, input: &Clip) {
    assert_eq!(output.len(), 2 * input.len());
    for j in 0..output.len() {
        let out = output.frame(j).unwrap();
        let src = input.frame(j / 2).unwrap();
        assert!(*out == *src, "frame {j} differs from its source frame");
    }
}

#[test]
fn test_static_clip_comes_out_unchanged_at_double_rate() {
    init_tracing();
    let clip = static_ramp_clip(Format::YUV420P8, 16, 16, 4);
    let built = build(&clip, &config(Preset::Slower, Overrides::default()));
    assert_fields_repeated(&built.output, &clip);
}

#[test]
fn test_without_refinements_output_is_the_binomial_smooth() {
    let clip = panning_clip(Format::YUV420P8, 16, 16, 4, 1, 0);
    let overrides = Overrides {
        sharpness: Some(0.0),
        rep0: Some(0),
        rep1: Some(0),
        rep2: Some(0),
        sharp_limit_mode: Some(0),
        tr2: Some(0),
        noise_process: Some(0),
        ..Default::default()
    };
    let built = build(&clip, &config(Preset::Slower, overrides));

    let edi = built.stage("edi").unwrap();
    assert_clips_equal(edi, &SoftwareEngine.bob(&clip, ORDER, 0.0, 0.5), 0..8);
    let binomial = built.stage("binomial").unwrap();
    assert_clips_equal(&built.output, binomial, 0..8);
    assert!(built.stage("resharpen").is_some());
    assert!(built.stage("sharp_limit1").is_none());
}

#[test]
fn test_every_preset_builds_and_renders() {
    init_tracing();
    for preset in [
        Preset::Placebo,
        Preset::Slower,
        Preset::Medium,
        Preset::UltraFast,
        Preset::Draft,
    ] {
        let clip = noisy_clip(Format::YUV420P8, 16, 16, 3, 10, 7);
        let built = build(&clip, &config(preset, Overrides::default()));
        assert_eq!(built.output.len(), 6, "{preset}");
        assert_eq!((built.output.width(), built.output.height()), (16, 16));
        for (n, frame) in built.render_range(0..6).iter().enumerate() {
            assert!(frame.is_ok(), "{preset} frame {n}: {frame:?}");
        }
    }
}

#[test]
fn test_source_match_and_lossless_render() {
    let clip = panning_clip(Format::GRAY8, 16, 16, 3, 1, 0);
    for (depth, lossless) in [(1, 0), (2, 1), (3, 2)] {
        let overrides = Overrides {
            source_match: Some(depth),
            lossless: Some(lossless),
            ..Default::default()
        };
        let built = build(&clip, &config(Preset::Slower, overrides));
        assert!(built.stage("source_match").is_some());
        assert!(built.render_range(0..6).iter().all(|f| f.is_ok()));
    }
}

#[test]
fn test_unsupported_input_is_rejected() {
    let engines = EngineContext::software();
    let config = config(Preset::Slower, Overrides::default());

    let odd_rows = flat_clip(Format::GRAY8, 16, 15, 2, 100);
    let err = deinterlace(&odd_rows, ORDER, &config, &engines).unwrap_err();
    assert!(matches!(err, Error::UnsupportedInput(_)), "{err}");

    // 4:2:0 fields need an even number of chroma rows each
    let split_chroma = flat_clip(Format::YUV420P8, 16, 14, 2, 100);
    let err = deinterlace(&split_chroma, ORDER, &config, &engines).unwrap_err();
    assert!(matches!(err, Error::UnsupportedInput(_)), "{err}");

    let info = flat_clip(Format::GRAY8, 16, 16, 1, 100).info().with_frames(0);
    let empty = Clip::new("empty", info, |n| {
        Err(StageError::new("empty", n, StageErrorKind::FrameOutOfRange { len: 0 }))
    });
    let err = deinterlace(&empty, ORDER, &config, &engines).unwrap_err();
    assert!(matches!(err, Error::UnsupportedInput(_)), "{err}");
}

#[test]
fn test_configuration_without_enough_vectors_is_rejected() {
    let engines = EngineContext::software();
    let clip = static_ramp_clip(Format::GRAY8, 16, 16, 4);
    let mut config = config(Preset::Slower, Overrides::default());
    config.core.tr2 = config.max_temporal_radius + 1;

    let err = deinterlace(&clip, ORDER, &config, &engines).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Config(ConfigError::Incompatible {
                field: "max_temporal_radius",
                ..
            })
        ),
        "{err}"
    );

    config.max_temporal_radius = config.core.tr2;
    let built = build(&clip, &config);
    assert!(built.render_range(0..8).iter().all(|f| f.is_ok()));
}

#[test]
fn test_failing_source_frame_fails_only_dependent_frames() {
    let good = static_ramp_clip(Format::GRAY8, 16, 16, 6);
    let source = good.clone();
    let broken = Clip::new("broken_source", good.info(), move |n| {
        if n == 1 {
            Err(StageError::new(
                "broken_source",
                n,
                StageErrorKind::Engine("decoder failure".to_string()),
            ))
        } else {
            Ok(Frame::clone(&*source.frame(n)?))
        }
    });
    let built = build(&broken, &config(Preset::Draft, Overrides::default()));
    let frames = built.render_range(0..12);

    for j in [2, 3] {
        let err = frames[j].as_ref().unwrap_err();
        assert_eq!(err.stage, "broken_source");
        assert_eq!(err.frame, 1);
        assert_eq!(
            err.to_string(),
            "Stage 'broken_source' failed on frame 1: decoder failure"
        );
    }
    for j in 8..12 {
        let frame = frames[j].as_ref().unwrap();
        assert!(**frame == *good.frame(j / 2).unwrap(), "frame {j}");
    }
    // a retry of a failed frame fails again rather than returning a stale value
    assert!(built.output.frame(2).is_err());
}

#[test]
fn test_border_and_frame_rate_shape_the_output() {
    let clip = static_ramp_clip(Format::YUV420P8, 16, 16, 4);
    let overrides = Overrides {
        border: Some(true),
        fps_divisor: Some(2),
        ..Default::default()
    };
    let built = build(&clip, &config(Preset::Slower, overrides));
    assert_eq!(built.stage("bobbed").unwrap().height(), 24);
    assert_eq!(built.output.len(), 4);
    assert_eq!((built.output.width(), built.output.height()), (16, 16));
    for j in 0..4 {
        let frame = built.output.frame(j).unwrap();
        assert!(*frame == *clip.frame(j).unwrap(), "frame {j}");
    }
}

#[test]
fn test_shutter_blur_of_static_clip_is_identity() {
    let clip = static_ramp_clip(Format::YUV420P8, 16, 16, 3);
    for shutter_blur in [1, 2, 3] {
        let overrides = Overrides {
            shutter_blur: Some(shutter_blur),
            shutter_angle_out: Some(360.0),
            ..Default::default()
        };
        let config = config(Preset::Slower, overrides);
        assert_eq!(config.output.shutter_blur, shutter_blur);
        let built = build(&clip, &config);
        assert!(built.stage("shutter_blur").is_some());
        assert_fields_repeated(&built.output, &clip);
    }
}

#[test]
fn test_show_noise_outputs_the_noise_clip() {
    let clip = noisy_clip(Format::YUV420P8, 16, 16, 3, 12, 11);
    let overrides = Overrides {
        show_noise: Some(4.0),
        ..Default::default()
    };
    let config = config(Preset::Slower, overrides);
    assert_eq!(config.noise.process, 2);
    let built = build(&clip, &config);
    assert!(built.stage("noise").is_some());
    assert_eq!(built.output.len(), 6);
    for frame in built.render_range(0..6) {
        let frame = frame.unwrap();
        assert_eq!(frame.dimensions(), (16, 16));
        assert!(frame.plane(1).iter().all(|&v| v == 128));
    }
}

#[test]
fn test_diagnostics_sink_receives_configuration() {
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Preset>>);

    impl crate::engine::DiagnosticsSink for Recorder {
        fn configuration_resolved(&self, config: &Configuration) {
            self.0.lock().push(config.preset);
        }
    }

    let recorder = Arc::new(Recorder::default());
    let engines = EngineContext::software().with_diagnostics(recorder.clone());
    let clip = flat_clip(Format::GRAY8, 16, 16, 2, 100);
    deinterlace(&clip, ORDER, &config(Preset::Fast, Overrides::default()), &engines).unwrap();
    assert_eq!(*recorder.0.lock(), vec![Preset::Fast]);
}
