//! Resharpening after the temporal smooths, and the limits that keep it from
//! overshooting the interpolated picture.


use crate::engine::{Direction, Kernel, Resampler};
use crate::frame::{cround, Planes};
use crate::motion::MotionField;
use crate::ops::{unsharp, ClipOps, Neighbourhood, RankClamp, SampleRange};
use crate::stream::Clip;

/// Sharpness of the Gaussian that spreads the back-blend difference.
const BACK_BLEND_GAUSS: f64 = 5.0;

/// Gain of the vertical-thinning difference per unit of thinning.
const VERTICAL_THIN_GAIN: f64 = 6.0;

/// Unsharp mask against the 3x3 binomial blur.
///
/// Mode 1 blurs `clip` itself. Mode 2 blurs the average of its vertical
/// maximum and minimum, which sharpens interlace-biased detail less; with
/// `precise` that average moves at most one 8-bit step away from `clip`.
/// Mode 0 or a zero strength returns `clip`.
pub fn resharpen(clip: &Clip, strength: f64, mode: u8, precise: bool) -> Clip {
    if mode == 0 || strength == 0.0 {
        return clip.clone();
    }
    let base = if mode == 1 {
        clip.clone()
    } else {
        let vertical = clip
            .maximum(Planes::All, Neighbourhood::Vertical)
            .merge(&clip.minimum(Planes::All, Neighbourhood::Vertical), 0.5, Planes::All);
        if precise {
            let step = clip.format().scale(1.0);
            vertical.expr2(
                "precise_vertical",
                clip,
                Planes::All,
                SampleRange::Pixel,
                move |x, y| {
                    if x < y {
                        x + step
                    } else if x > y {
                        x - step
                    } else {
                        x
                    }
                },
            )
        } else {
            vertical
        }
    };
    let blurred = base.blur(Planes::All, Neighbourhood::Square);
    clip.zip("resharpen", &blurred, move |x, b| unsharp(x, b, strength))
}

/// Thin one-pixel horizontal edges that interpolation widened into the
/// neighbouring field lines. Only luma is touched.
pub fn vertical_thin(sharpened: &Clip, unsharpened: &Clip, amount: f64) -> Clip {
    if amount <= 0.0 {
        return sharpened.clone();
    }
    let neutral = unsharpened.format().neutral();
    let gain = amount * VERTICAL_THIN_GAIN;
    let median_diff = unsharpened
        .expr2(
            "vertical_median_diff",
            &unsharpened.vertical_cleaner(Planes::Luma),
            Planes::Luma,
            SampleRange::Difference,
            move |x, y| cround(f64::from(y - x) * gain) + neutral,
        )
        .blur(Planes::Luma, Neighbourhood::Horizontal);
    let neighbour_diff = median_diff.expr2(
        "vertical_thin_neighbours",
        &median_diff.blur(Planes::Luma, Neighbourhood::Square),
        Planes::Luma,
        SampleRange::Difference,
        move |x, y| {
            if (y - neutral).abs() > (x - neutral).abs() {
                y
            } else {
                neutral
            }
        },
    );
    sharpened.merge_diff(&neighbour_diff, Planes::Luma)
}

/// Subtract a blurred copy of what sharpening added, on luma.
pub fn back_blend(sharpened: &Clip, unsharpened: &Clip, resampler: &dyn Resampler) -> Clip {
    let neutral = sharpened.format().neutral();
    let added = sharpened
        .make_diff(unsharpened, Planes::Luma)
        .blur(Planes::Luma, Neighbourhood::Square);
    let spread = resampler.resample(
        &added,
        added.width(),
        added.height(),
        Kernel::Gauss {
            p: BACK_BLEND_GAUSS,
        },
    );
    sharpened.expr2(
        "back_blend",
        &spread,
        Planes::Luma,
        SampleRange::Pixel,
        move |x, d| x - d + neutral,
    )
}

/// Where a sharpened pixel may go.
#[derive(Debug, Clone)]
pub enum SharpnessBounds {
    /// The 3x3 neighbourhood of `reference`. A radius above one first pulls
    /// the clip inside the second-ranked bounds of the reference.
    Spatial { reference: Clip, radius: u8 },
    /// Per-pixel extremes over motion-compensated neighbours.
    Temporal { bright: Clip, dark: Clip },
}

impl SharpnessBounds {
    /// Extremes of `reference` and its compensated neighbours at distance one,
    /// and also three when `radius` is above one.
    pub fn temporal(reference: &Clip, motion: &MotionField, radius: u8) -> Self {
        let mut deltas = vec![1];
        if radius > 1 {
            deltas.push(3);
        }
        let mut bright = reference.clone();
        let mut dark = reference.clone();
        for delta in deltas {
            for direction in [Direction::Forward, Direction::Backward] {
                let compensated = motion.compensate(reference, direction, delta);
                bright = bright.expr2(
                    "temporal_max",
                    &compensated,
                    Planes::All,
                    SampleRange::Pixel,
                    i32::max,
                );
                dark = dark.expr2(
                    "temporal_min",
                    &compensated,
                    Planes::All,
                    SampleRange::Pixel,
                    i32::min,
                );
            }
        }
        Self::Temporal { bright, dark }
    }
}

/// Clamp `clip` into `bounds`. Temporal bounds are widened by `overshoot`
/// above and `undershoot` below; spatial bounds are exact.
pub fn limit(clip: &Clip, bounds: &SharpnessBounds, overshoot: i32, undershoot: i32) -> Clip {
    match bounds {
        SharpnessBounds::Spatial { reference, radius } => {
            if *radius > 1 {
                let inner = clip.repair(reference, Planes::All, RankClamp::SecondExtremes);
                clip.repair(&inner, Planes::All, RankClamp::Extremes)
            } else {
                clip.repair(reference, Planes::All, RankClamp::Extremes)
            }
        }
        SharpnessBounds::Temporal { bright, dark } => {
            clip.clamp_between(bright, dark, overshoot, undershoot, Planes::All)
        }
    }
}
