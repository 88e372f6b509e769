//! Elementary frame operations: per-pixel expressions, neighbourhood filters,
//! rank cleaners and temporal averaging.
//!
//! Every operation exists as a pure function over [`Frame`]s and, through
//! [`ClipOps`], as a lazy per-frame node over [`Clip`]s.

pub mod morphology;
pub mod pixel;
pub mod rank;
pub mod temporal;

#[cfg(test)]
mod tests;

pub use morphology::Neighbourhood;
pub use pixel::SampleRange;
pub use rank::RankClamp;
pub use temporal::{average_frames, luma_difference};

use crate::frame::{Frame, Planes};
use crate::stream::Clip;

/// Clip-level counterparts of the frame operations in this module.
///
/// Each method adds one lazy node; nothing is computed until a frame is pulled.
/// Binary and ternary operations fail per frame with a stage error when the
/// inputs disagree on format or dimensions.
pub trait ClipOps {
    fn expr<F>(&self, name: &str, planes: Planes, range: SampleRange, f: F) -> Clip
    where
        F: Fn(i32) -> i32 + Send + Sync + 'static;

    fn expr2<F>(&self, name: &str, other: &Clip, planes: Planes, range: SampleRange, f: F) -> Clip
    where
        F: Fn(i32, i32) -> i32 + Send + Sync + 'static;

    fn make_diff(&self, other: &Clip, planes: Planes) -> Clip;
    fn merge_diff(&self, diff: &Clip, planes: Planes) -> Clip;
    fn merge(&self, other: &Clip, weight: f64, planes: Planes) -> Clip;
    fn masked_merge(&self, other: &Clip, mask: &Clip, planes: Planes) -> Clip;
    fn clamp_between(
        &self,
        bright: &Clip,
        dark: &Clip,
        overshoot: i32,
        undershoot: i32,
        planes: Planes,
    ) -> Clip;
    fn shuffle_chroma(&self, chroma: &Clip) -> Clip;

    fn minimum(&self, planes: Planes, nb: Neighbourhood) -> Clip;
    fn maximum(&self, planes: Planes, nb: Neighbourhood) -> Clip;
    fn inflate(&self, planes: Planes) -> Clip;
    fn deflate(&self, planes: Planes) -> Clip;
    fn median(&self, planes: Planes) -> Clip;
    fn blur(&self, planes: Planes, nb: Neighbourhood) -> Clip;

    fn vertical_cleaner(&self, planes: Planes) -> Clip;
    fn remove_grain(&self, planes: Planes, bounds: RankClamp) -> Clip;
    fn repair(&self, reference: &Clip, planes: Planes, bounds: RankClamp) -> Clip;
}

impl ClipOps for Clip {
    fn expr<F>(&self, name: &str, planes: Planes, range: SampleRange, f: F) -> Clip
    where
        F: Fn(i32) -> i32 + Send + Sync + 'static,
    {
        self.map(name, move |a| pixel::expr1(a, planes, range, &f))
    }

    fn expr2<F>(&self, name: &str, other: &Clip, planes: Planes, range: SampleRange, f: F) -> Clip
    where
        F: Fn(i32, i32) -> i32 + Send + Sync + 'static,
    {
        self.zip(name, other, move |a, b| pixel::expr2(a, b, planes, range, &f))
    }

    fn make_diff(&self, other: &Clip, planes: Planes) -> Clip {
        self.zip("make_diff", other, move |a, b| pixel::make_diff(a, b, planes))
    }

    fn merge_diff(&self, diff: &Clip, planes: Planes) -> Clip {
        self.zip("merge_diff", diff, move |a, d| pixel::merge_diff(a, d, planes))
    }

    fn merge(&self, other: &Clip, weight: f64, planes: Planes) -> Clip {
        self.zip("merge", other, move |a, b| pixel::merge(a, b, weight, planes))
    }

    fn masked_merge(&self, other: &Clip, mask: &Clip, planes: Planes) -> Clip {
        self.zip3("masked_merge", other, mask, move |a, b, m| {
            pixel::masked_merge(a, b, m, planes)
        })
    }

    fn clamp_between(
        &self,
        bright: &Clip,
        dark: &Clip,
        overshoot: i32,
        undershoot: i32,
        planes: Planes,
    ) -> Clip {
        self.zip3("clamp", bright, dark, move |a, hi, lo| {
            pixel::clamp_between(a, hi, lo, overshoot, undershoot, planes)
        })
    }

    fn shuffle_chroma(&self, chroma: &Clip) -> Clip {
        self.zip("shuffle_planes", chroma, pixel::shuffle_planes)
    }

    fn minimum(&self, planes: Planes, nb: Neighbourhood) -> Clip {
        self.map("minimum", move |f| morphology::minimum(f, planes, nb))
    }

    fn maximum(&self, planes: Planes, nb: Neighbourhood) -> Clip {
        self.map("maximum", move |f| morphology::maximum(f, planes, nb))
    }

    fn inflate(&self, planes: Planes) -> Clip {
        self.map("inflate", move |f| morphology::inflate(f, planes))
    }

    fn deflate(&self, planes: Planes) -> Clip {
        self.map("deflate", move |f| morphology::deflate(f, planes))
    }

    fn median(&self, planes: Planes) -> Clip {
        self.map("median", move |f| morphology::median(f, planes))
    }

    fn blur(&self, planes: Planes, nb: Neighbourhood) -> Clip {
        self.map("blur", move |f| morphology::blur(f, planes, nb))
    }

    fn vertical_cleaner(&self, planes: Planes) -> Clip {
        self.map("vertical_cleaner", move |f| rank::vertical_cleaner(f, planes))
    }

    fn remove_grain(&self, planes: Planes, bounds: RankClamp) -> Clip {
        self.map("remove_grain", move |f| rank::remove_grain(f, planes, bounds))
    }

    fn repair(&self, reference: &Clip, planes: Planes, bounds: RankClamp) -> Clip {
        self.zip("repair", reference, move |f, r| rank::repair(f, r, planes, bounds))
    }
}

/// Unsharp mask against the binomial blur: `x + amount * (x - blur(x))`.
pub fn unsharp(frame: &Frame, blurred: &Frame, amount: f64) -> Frame {
    pixel::expr2(frame, blurred, Planes::All, SampleRange::Pixel, move |x, b| {
        crate::frame::cround(x as f64 + (x - b) as f64 * amount)
    })
}
