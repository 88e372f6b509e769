//! The deinterlacing pipeline: bob, motion search, interpolation, compensated
//! smoothing, resharpening and the optional refinements, wired into one graph
//! of lazily evaluated clips.
//!
//! [`deinterlace`] only builds the graph. Frames are computed when the output
//! clip is asked for them, and a frame that fails to evaluate reports the stage
//! and frame index without affecting any other frame.

mod search_clip;

#[cfg(test)]
mod tests;

use std::ops::Range;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{ChromaEdi, Configuration, EdiParams, InterpolationConfig, InterpolatorKind};
use crate::engine::{Direction, EngineContext, Interpolator, SceneChange, SearchParams};
use crate::error::{Error, Result, StageResult};
use crate::field::{crop_rows, pad_rows, select_every};
use crate::frame::{FieldOrder, Frame, Planes};
use crate::lossless::make_lossless;
use crate::motion::MotionField;
use crate::noise::{self, NoiseBypass};
use crate::ops::ClipOps;
use crate::sharpen::{self, SharpnessBounds};
use crate::shimmer;
use crate::source_match::SourceMatcher;
use crate::stream::Clip;

/// Rows of padding added above and below each field when `border` is set.
pub const BORDER_ROWS: usize = 4;

/// Interpolator tuning of the separate chroma pass.
const CHROMA_EDI_PARAMS: EdiParams = EdiParams {
    nn_size: 4,
    nn_neurons: 0,
    quality: 1,
    max_d: 4,
};

/// One named intermediate clip of a built pipeline.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: &'static str,
    pub clip: Clip,
}

/// A built pipeline: the output clip and the intermediate clips it is made of,
/// in processing order.
#[derive(Debug, Clone)]
pub struct Deinterlaced {
    pub output: Clip,
    pub stages: Vec<Stage>,
}

impl Deinterlaced {
    pub fn stage(&self, name: &str) -> Option<&Clip> {
        self.stages
            .iter()
            .find(|stage| stage.name == name)
            .map(|stage| &stage.clip)
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stages.iter().map(|stage| stage.name)
    }

    /// Evaluate output frames in parallel. Failed frames are logged and
    /// returned as errors in place; the others are unaffected.
    pub fn render_range(&self, range: Range<usize>) -> Vec<StageResult<Arc<Frame>>> {
        let frames = self.output.render(range);
        for err in frames.iter().filter_map(|frame| frame.as_ref().err()) {
            warn!("{err}");
        }
        frames
    }
}

/// Build the double-rate progressive clip of an interlaced `clip`.
pub fn deinterlace(
    clip: &Clip,
    order: FieldOrder,
    config: &Configuration,
    engines: &EngineContext,
) -> Result<Clip> {
    deinterlace_with_stages(clip, order, config, engines).map(|built| built.output)
}

/// [`deinterlace`], keeping every intermediate clip for inspection.
pub fn deinterlace_with_stages(
    clip: &Clip,
    order: FieldOrder,
    config: &Configuration,
    engines: &EngineContext,
) -> Result<Deinterlaced> {
    validate(clip)?;
    config.validate()?;
    if let Some(sink) = &engines.diagnostics {
        sink.configuration_resolved(config);
    }
    info!(
        preset = %config.preset,
        frames = clip.len(),
        width = clip.width(),
        height = clip.height(),
        max_temporal_radius = config.max_temporal_radius,
        "building deinterlacing pipeline"
    );

    let mut builder = Builder::default();
    let core = &config.core;
    let sharpness = &config.sharpness;
    let output = &config.output;

    let input = if output.border {
        pad_rows(clip, BORDER_ROWS)
    } else {
        clip.clone()
    };
    let bobbed = builder.push("bobbed", engines.interpolator.bob(&input, order, 0.0, 0.5));

    // motion search
    let search = builder.push(
        "search",
        search_clip::build(&bobbed, config, engines.resampler.as_ref()),
    );
    let analysed = search_clip::luma_rebuild(&search, config.motion.chroma);
    let scene_change = SceneChange::from_config(&config.motion);
    let motion = MotionField::analyse(
        engines.motion.clone(),
        &analysed,
        usize::from(config.max_temporal_radius),
        &SearchParams::from_config(&config.motion),
        scene_change,
        Planes::All,
    );

    // noise bypass
    let noise_config = &config.noise;
    let bypass = (noise_config.process > 0)
        .then(|| NoiseBypass::build(&input, order, noise_config, engines, &motion));
    let inner = match &bypass {
        Some(bypass) if noise_config.process == 1 => builder.push("denoised", bypass.denoised.clone()),
        _ => input.clone(),
    };
    let final_noise = bypass
        .filter(|_| noise_config.total_restore() > 0.0 || noise_config.show > 0.0)
        .map(|bypass| builder.push("noise", bypass.noise));

    // interpolation and the first smooth
    let edi = builder.push(
        "edi",
        interpolate(&inner, order, &config.interpolation, engines.interpolator.as_ref()),
    );
    let temporal_bounds = sharpness
        .temporal_limit()
        .then(|| SharpnessBounds::temporal(&edi, &motion, sharpness.limit_radius));
    let spatial_bounds = SharpnessBounds::Spatial {
        reference: edi.clone(),
        radius: sharpness.limit_radius,
    };
    let overshoot = clip.format().scale(f64::from(sharpness.overshoot));

    let binomial = builder.push(
        "binomial",
        motion.binomial_smooth(&edi, usize::from(core.tr1), config.motion.thsad1),
    );
    let repaired = builder.push(
        "repair1",
        shimmer::repair(&binomial, &edi, core.rep1, core.rep_chroma),
    );

    // source match
    let matched = builder.push(
        "source_match",
        SourceMatcher {
            config: &config.source_match,
            order,
            motion: &motion,
            interpolator: engines.interpolator.as_ref(),
            thsad: config.motion.thsad1,
        }
        .refine(&repaired, &inner),
    );
    let unsharpened = if config.source_match.lossless >= 2 {
        builder.push("lossless1", make_lossless(&matched, &inner, order))
    } else {
        matched
    };

    // resharpening and the first limit
    let sharpened = sharpen::resharpen(
        &unsharpened,
        sharpness.adjusted_strength,
        sharpness.mode,
        sharpness.precise,
    );
    let sharpened = builder.push(
        "resharpen",
        sharpen::vertical_thin(&sharpened, &unsharpened, sharpness.vertical_thin),
    );
    let back_blended = if matches!(sharpness.back_blend, 1 | 3) {
        sharpen::back_blend(&sharpened, &unsharpened, engines.resampler.as_ref())
    } else {
        sharpened
    };
    let limited = match (sharpness.limit_mode, &temporal_bounds) {
        (1, _) => builder.push("sharp_limit1", sharpen::limit(&back_blended, &spatial_bounds, 0, 0)),
        (2, Some(bounds)) => builder.push(
            "sharp_limit1",
            sharpen::limit(&back_blended, bounds, overshoot, overshoot),
        ),
        _ => back_blended,
    };
    let limited = if sharpness.back_blend >= 2 {
        sharpen::back_blend(&limited, &unsharpened, engines.resampler.as_ref())
    } else {
        limited
    };

    // grain restore and the final smooth
    let restore = |clip: &Clip, amount: f64| match &final_noise {
        Some(noise) => noise::restore(
            clip,
            noise,
            amount,
            noise_config.denoiser.noise_centre(clip.format().bits()),
            noise_config.planes(),
        ),
        None => clip.clone(),
    };
    let grained = restore(&limited, noise_config.grain_restore);
    let stable = builder.push(
        "stable",
        motion.degrain(&grained, usize::from(core.tr2), config.motion.thsad2),
    );
    let repaired = builder.push(
        "repair2",
        shimmer::repair(&stable, &edi, core.rep2, core.rep_chroma),
    );
    let limited = match (sharpness.limit_mode, &temporal_bounds) {
        (3, _) => builder.push("sharp_limit2", sharpen::limit(&repaired, &spatial_bounds, 0, 0)),
        (4, Some(bounds)) => builder.push(
            "sharp_limit2",
            sharpen::limit(&repaired, bounds, overshoot, overshoot),
        ),
        _ => repaired,
    };
    let lossless = if config.source_match.lossless == 1 {
        builder.push("lossless2", make_lossless(&limited, &inner, order))
    } else {
        limited
    };
    let restored = restore(&lossless, noise_config.noise_restore);

    // shutter blur
    let blurred = if output.shutter_blur > 0 {
        let (backward, forward) = (
            motion.vectors(Direction::Backward, 1),
            motion.vectors(Direction::Forward, 1),
        );
        let (backward, forward) = if output.shutter_blur > 1 {
            let params = SearchParams::recalculation(&config.motion, output);
            let thsad = config.motion.thsad1;
            (
                engines.motion.recalculate(&analysed, backward, &params, thsad),
                engines.motion.recalculate(&analysed, forward, &params, thsad),
            )
        } else {
            (backward.clone(), forward.clone())
        };
        let blurred =
            engines
                .motion
                .flow_blur(&restored, &backward, &forward, output.blur_level, scene_change);
        let blurred = if output.blur_limit > 0.0 {
            let mask =
                engines
                    .motion
                    .motion_mask(
                        &search,
                        motion.vectors(Direction::Backward, 1),
                        output.blur_limit,
                        scene_change,
                    );
            restored.masked_merge(&blurred, &mask, Planes::All)
        } else {
            blurred
        };
        builder.push("shutter_blur", blurred)
    } else {
        restored
    };

    let shown = match &final_noise {
        Some(noise) if noise_config.show > 0.0 => {
            noise::show(noise, noise_config.show, noise_config.chroma)
        }
        _ => blurred,
    };
    let decimated = if output.fps_divisor > 1 {
        select_every(&shown, output.fps_divisor as usize, &[0])
    } else {
        shown
    };
    let cropped = if output.border {
        crop_rows(&decimated, BORDER_ROWS)
    } else {
        decimated
    };
    let output = builder.push("output", cropped);

    info!(
        frames = output.len(),
        stages = builder.stages.len(),
        "deinterlacing pipeline built"
    );
    Ok(Deinterlaced {
        output,
        stages: builder.stages,
    })
}

/// Reject inputs whose fields cannot be split evenly into chroma rows.
fn validate(clip: &Clip) -> Result<()> {
    let format = clip.format();
    let (ssw, ssh) = format.subsampling();
    if clip.is_empty() {
        return Err(Error::UnsupportedInput("clip has no frames".to_string()));
    }
    if clip.height() % (2 << ssh) != 0 {
        return Err(Error::UnsupportedInput(format!(
            "height {} must be a multiple of {} for {format:?}",
            clip.height(),
            2 << ssh
        )));
    }
    if clip.width() % (1 << ssw) != 0 {
        return Err(Error::UnsupportedInput(format!(
            "width {} must be a multiple of {} for {format:?}",
            clip.width(),
            1 << ssw
        )));
    }
    Ok(())
}

/// Luma with the configured interpolator; chroma with the same one or a
/// cheaper separate pass.
fn interpolate(
    clip: &Clip,
    order: FieldOrder,
    config: &InterpolationConfig,
    interpolator: &dyn Interpolator,
) -> Clip {
    let luma = interpolator.interpolate(clip, order, config.kind, &config.params);
    if clip.format().is_gray() {
        return luma;
    }
    let chroma = match config.chroma {
        ChromaEdi::SameAsLuma => return luma,
        ChromaEdi::Nnedi3 => {
            interpolator.interpolate(clip, order, InterpolatorKind::Nnedi3, &CHROMA_EDI_PARAMS)
        }
        ChromaEdi::Bob => interpolator.bob(clip, order, 0.0, 0.5),
    };
    luma.shuffle_chroma(&chroma)
}

#[derive(Default)]
struct Builder {
    stages: Vec<Stage>,
}

impl Builder {
    fn push(&mut self, name: &'static str, clip: Clip) -> Clip {
        self.stages.push(Stage {
            name,
            clip: clip.clone(),
        });
        clip
    }
}
