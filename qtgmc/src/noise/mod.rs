//! Noise bypass: denoise the source, keep what was removed, rebuild the
//! missing field lines of that noise and add it back late in the pipeline.

#[cfg(test)]
mod tests;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::{NoiseConfig, NoiseDeint};
use crate::engine::{DenoiseParams, Direction, EngineContext};
use crate::field::{double_weave, reinterlace, separate_fields, weave_fields};
use crate::frame::{cround, FieldOrder, Format, Frame, Plane, Planes};
use crate::motion::MotionField;
use crate::ops::morphology::{maximum, minimum};
use crate::ops::pixel::{expr2, make_diff, merge_diff};
use crate::ops::{ClipOps, Neighbourhood, SampleRange};
use crate::stream::Clip;

/// Variance of the random grain used for generated field lines, in 8-bit units.
const GRAIN_VARIANCE: f64 = 1800.0;

/// The denoised source and the field-completed noise taken out of it.
#[derive(Debug, Clone)]
pub struct NoiseBypass {
    /// Denoised interlaced source, same rate as the input.
    pub denoised: Clip,
    /// Double-rate noise, neutral-centred.
    pub noise: Clip,
}

impl NoiseBypass {
    pub fn build(
        clip: &Clip,
        order: FieldOrder,
        config: &NoiseConfig,
        engines: &EngineContext,
        motion: &MotionField,
    ) -> Self {
        let planes = config.planes();
        debug!(
            denoiser = %config.denoiser,
            temporal_radius = config.temporal_radius,
            motion_compensated = config.motion_compensated,
            deint = %config.deint,
            "building noise bypass"
        );
        let denoised = denoise_source(clip, order, config, engines, motion);
        let noise = extract(&denoised, clip, planes);
        let noise = match config.deint {
            NoiseDeint::Bob => engines.interpolator.bob(&noise, order, 0.0, 0.5),
            NoiseDeint::Generate => generate_second_field(&noise, order, config.chroma),
            NoiseDeint::DoubleWeave => double_weave(&noise, order),
        };
        let noise = if config.stabilize {
            stabilize(&noise, motion, planes)
        } else {
            noise
        };
        Self { denoised, noise }
    }
}

/// Bob the source, denoise it over a (compensated) temporal window and
/// re-interlace the result.
fn denoise_source(
    clip: &Clip,
    order: FieldOrder,
    config: &NoiseConfig,
    engines: &EngineContext,
    motion: &MotionField,
) -> Clip {
    let radius = usize::from(config.temporal_radius);
    let full = engines.interpolator.bob(clip, order, 0.0, 1.0);
    let window = if config.motion_compensated && radius > 0 {
        let mut window: Vec<Clip> = (1..=radius)
            .rev()
            .map(|d| motion.compensate(&full, Direction::Forward, d))
            .collect();
        window.push(full.clone());
        window.extend((1..=radius).map(|d| motion.compensate(&full, Direction::Backward, d)));
        window
    } else {
        vec![full]
    };
    let params = DenoiseParams {
        sigma: config.sigma,
        temporal_radius: radius,
        planes: config.planes(),
    };
    let denoised = engines.denoiser.denoise(&window, config.denoiser, &params);
    reinterlace(&denoised, order)
}

/// `original - denoised` on `planes`, neutral-centred and unclamped, so that
/// merging it back onto `denoised` reproduces `original` exactly.
pub fn extract(denoised: &Clip, original: &Clip, planes: Planes) -> Clip {
    original.make_diff(denoised, planes)
}

/// Double-rate noise from interlaced noise. Each output frame keeps the noise
/// of its own field and fills the other parity with random grain scaled by
/// the local range of the known noise and centred between its local extremes.
/// The grain of output frame `j` is seeded with `j`.
pub fn generate_second_field(noise: &Clip, order: FieldOrder, chroma: bool) -> Clip {
    let fields = separate_fields(noise, order);
    let info = noise.info().with_frames(noise.len() * 2);
    Clip::new("generate_second_field", info, move |j| {
        let known = fields.frame(j)?;
        let planes = Planes::luma_or_all(chroma);
        let generated = synthesize_field(&known, planes, j as u64);
        Ok(if order.field_is_top(j) {
            weave_fields(&known, &generated)
        } else {
            weave_fields(&generated, &known)
        })
    })
}

fn synthesize_field(known: &Frame, planes: Planes, seed: u64) -> Frame {
    let format = known.format();
    let neutral = format.neutral();
    let local_max = maximum(
        &maximum(known, planes, Neighbourhood::Square),
        planes,
        Neighbourhood::Horizontal,
    );
    let local_min = minimum(
        &minimum(known, planes, Neighbourhood::Square),
        planes,
        Neighbourhood::Horizontal,
    );
    let grain = grain_field(format, known.width(), known.height(), planes, seed);
    let divisor = f64::from(format.scale(256.0));
    let range = make_diff(&local_max, &local_min, planes);
    let scaled = expr2(&range, &grain, planes, SampleRange::Difference, move |r, g| {
        cround(f64::from(r - neutral) * f64::from(g) / divisor) + neutral
    });
    merge_diff(&local_min, &scaled, planes)
}

/// Neutral frame plus Gaussian grain of [`GRAIN_VARIANCE`] on `planes`.
fn grain_field(format: Format, width: usize, height: usize, planes: Planes, seed: u64) -> Frame {
    let mut rng = StdRng::seed_from_u64(seed);
    let sigma = GRAIN_VARIANCE.sqrt() * f64::from(format.peak()) / 255.0;
    let neutral = format.neutral();
    let planes = (0..format.num_planes())
        .map(|p| {
            let (w, h) = format.plane_dimensions(p, width, height);
            let mut plane = Plane::new_filled(w, h, neutral);
            if planes.contains(p) {
                for v in plane.iter_mut() {
                    *v = format.clamp(neutral + cround(gaussian(&mut rng) * sigma));
                }
            }
            plane
        })
        .collect();
    Frame::from_planes(format, planes)
}

/// Standard normal sample by the Box-Muller transform.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Blend noise with its compensated previous frame: the stronger of the two
/// at 0.6 plus 0.2 of each.
pub fn stabilize(noise: &Clip, motion: &MotionField, planes: Planes) -> Clip {
    let neutral = noise.format().neutral();
    let compensated = motion.compensate(noise, Direction::Backward, 1);
    noise.expr2(
        "stabilize_noise",
        &compensated,
        planes,
        SampleRange::Difference,
        move |x, y| {
            let stronger = if (x - neutral).abs() > (y - neutral).abs() {
                x
            } else {
                y
            };
            cround(0.6 * f64::from(stronger) + 0.2 * f64::from(x + y))
        },
    )
}

/// Add `amount` of `noise`, measured from `centre`, back onto `clip`.
pub fn restore(clip: &Clip, noise: &Clip, amount: f64, centre: f64, planes: Planes) -> Clip {
    if amount <= 0.0 {
        return clip.clone();
    }
    let neutral = clip.format().neutral();
    let scaled = noise.expr("scale_noise", planes, SampleRange::Difference, move |x| {
        cround((f64::from(x) - centre) * amount) + neutral
    });
    clip.merge_diff(&scaled, planes)
}

/// Amplified noise for display. Chroma is flat grey unless noise was
/// processed on chroma.
pub fn show(noise: &Clip, amount: f64, chroma: bool) -> Clip {
    let neutral = noise.format().neutral();
    let amplified = noise.expr("show_noise", Planes::All, SampleRange::Pixel, move |x| {
        cround(f64::from(x - neutral) * amount) + neutral
    });
    if chroma || noise.format().is_gray() {
        amplified
    } else {
        amplified.map("neutral_chroma", move |frame| {
            let planes = frame
                .planes()
                .iter()
                .enumerate()
                .map(|(p, plane)| {
                    if p == 0 {
                        plane.clone()
                    } else {
                        Plane::new_filled(plane.width(), plane.height(), neutral)
                    }
                })
                .collect();
            Frame::from_planes(frame.format(), planes)
        })
    }
}
