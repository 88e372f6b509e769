//! Source match: pull the smoothed double-rate output back towards the original
//! fields in up to three stages.
//!
//! 1. Basic match. Over-correct the source by the error the smooth left behind,
//!    then interpolate and smooth it again.
//! 2. Refinement. Interpolate and smooth the remaining error and add it back.
//! 3. Second refinement. Apply the same over-correction to the refinement.

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::config::{EdiParams, InterpolatorKind, SourceMatchConfig};
use crate::engine::Interpolator;
use crate::field::reinterlace;
use crate::frame::{cround, FieldOrder, Planes};
use crate::motion::MotionField;
use crate::ops::{ClipOps, Neighbourhood, SampleRange};
use crate::stream::Clip;

/// How much of an error survives into neighbouring frames.
const ERROR_TEMPORAL_SIMILARITY: f64 = 0.5;

/// Over-correction factor for an error smoothed with a binomial kernel of `radius`.
pub fn error_adjustment(radius: u8) -> f64 {
    let s = ERROR_TEMPORAL_SIMILARITY;
    match radius {
        0 => 1.0,
        1 => 2.0 / (1.0 + s),
        _ => 8.0 / (3.0 + 5.0 * s),
    }
}

/// Everything a source match needs besides the clips themselves.
pub struct SourceMatcher<'a> {
    pub config: &'a SourceMatchConfig,
    pub order: FieldOrder,
    pub motion: &'a MotionField,
    pub interpolator: &'a dyn Interpolator,
    /// SAD threshold of the compensated smooths.
    pub thsad: u32,
}

impl SourceMatcher<'_> {
    /// Refine `basic`, the smoothed double-rate output, against `source`, the
    /// interlaced clip it was interpolated from. Depth 0 returns `basic`.
    pub fn refine(&self, basic: &Clip, source: &Clip) -> Clip {
        let depth = self.config.depth;
        if depth == 0 {
            return basic.clone();
        }
        debug!(
            depth,
            tr1 = self.config.tr1,
            tr2 = self.config.tr2,
            edi = %self.config.edi,
            edi2 = %self.config.edi2,
            "building source match"
        );

        let matched = self.basic_match(basic, source);
        if depth < 2 {
            return matched;
        }

        let enhanced = if self.config.enhance > 0.0 {
            let amount = self.config.enhance;
            let blurred = matched.blur(Planes::All, Neighbourhood::Square);
            matched.expr2(
                "match_enhance",
                &blurred,
                Planes::All,
                SampleRange::Pixel,
                move |x, b| cround(f64::from(x) + f64::from(x - b) * amount),
            )
        } else {
            matched
        };

        let error = source.make_diff(&reinterlace(&enhanced, self.order), Planes::All);
        let refinement_edi = self.interpolate(&error, self.config.edi2, &self.config.edi2_params);
        let refinement = self.smooth(&refinement_edi, self.config.tr2);
        let refinement = if depth > 2 {
            self.second_refinement(&refinement_edi, &refinement)
        } else {
            refinement
        };
        enhanced.merge_diff(&refinement, Planes::All)
    }

    fn basic_match(&self, basic: &Clip, source: &Clip) -> Clip {
        let tr = self.config.tr1;
        let update = if tr == 0 {
            source.clone()
        } else {
            over_correct(
                "match_update",
                source,
                &reinterlace(basic, self.order),
                error_adjustment(tr),
                SampleRange::Pixel,
            )
        };
        let edi = self.interpolate(&update, self.config.edi, &self.config.edi_params);
        self.smooth(&edi, tr)
    }

    fn second_refinement(&self, refinement_edi: &Clip, refinement: &Clip) -> Clip {
        let tr = self.config.tr2;
        if tr == 0 {
            return refinement_edi.clone();
        }
        let update = over_correct(
            "match_refine_update",
            refinement_edi,
            refinement,
            error_adjustment(tr),
            SampleRange::Difference,
        );
        self.smooth(&update, tr)
    }

    fn interpolate(&self, clip: &Clip, kind: InterpolatorKind, params: &EdiParams) -> Clip {
        self.interpolator.interpolate(clip, self.order, kind, params)
    }

    fn smooth(&self, clip: &Clip, radius: u8) -> Clip {
        self.motion
            .binomial_smooth(clip, usize::from(radius), self.thsad)
    }
}

/// `x * (k + 1) - y * k`: move `x` away from `y` by `k` times their difference.
fn over_correct(name: &str, x: &Clip, y: &Clip, k: f64, range: SampleRange) -> Clip {
    x.expr2(name, y, Planes::All, range, move |x, y| {
        cround(f64::from(x) * (k + 1.0) - f64::from(y) * k)
    })
}
