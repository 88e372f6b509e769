//! Bob-shimmer repair.
//!
//! Temporal smoothing removes the line flicker of a bobbed clip but also blurs
//! genuine detail. The difference between the smoothed clip and its reference
//! is eroded vertically and reflated: thin regions (shimmer) vanish from the
//! mask and stay fixed, wider regions (real detail) survive and are restored.

#[cfg(test)]
mod tests;

use crate::config::RepairStrength;
use crate::frame::Planes;
use crate::ops::{ClipOps, Neighbourhood, SampleRange};
use crate::stream::Clip;

/// Erosion then reflation of a difference clip.
struct Choke<'a> {
    diff: &'a Clip,
    planes: Planes,
    strength: RepairStrength,
}

impl Choke<'_> {
    /// Mask of positive differences: vertical minimum rounds, then maximum.
    fn positive(&self) -> Clip {
        let planes = self.planes;
        self.build(
            |c| c.minimum(planes, Neighbourhood::Vertical),
            |c| c.maximum(planes, Neighbourhood::Vertical),
            |c| c.deflate(planes),
            |c| c.inflate(planes),
            |c| c.maximum(planes, Neighbourhood::Square),
        )
    }

    /// Mirror of [`Choke::positive`] for negative differences.
    fn negative(&self) -> Clip {
        let planes = self.planes;
        self.build(
            |c| c.maximum(planes, Neighbourhood::Vertical),
            |c| c.minimum(planes, Neighbourhood::Vertical),
            |c| c.inflate(planes),
            |c| c.deflate(planes),
            |c| c.minimum(planes, Neighbourhood::Square),
        )
    }

    /// `erode` and `dilate` are the vertical rank filters, `soften` and `swell`
    /// their fractional counterparts, `spread` the full-pixel over-dilation.
    fn build(
        &self,
        erode: impl Fn(&Clip) -> Clip,
        dilate: impl Fn(&Clip) -> Clip,
        soften: impl Fn(&Clip) -> Clip,
        swell: impl Fn(&Clip) -> Clip,
        spread: impl Fn(&Clip) -> Clip,
    ) -> Clip {
        let ed = self.strength.erosion;
        let mut choke = erode(self.diff);
        if ed > 2 {
            choke = erode(&choke);
        }
        if ed > 5 {
            choke = erode(&choke);
        }
        if ed % 3 != 0 {
            choke = soften(&choke);
        }
        if ed == 2 || ed == 5 {
            choke = choke.median(self.planes);
        }
        choke = dilate(&choke);
        if ed > 1 {
            choke = dilate(&choke);
        }
        if ed > 4 {
            choke = dilate(&choke);
        }
        match self.strength.over_dilation {
            0 => choke,
            1 => swell(&choke),
            2 => swell(&swell(&choke)),
            _ => spread(&choke),
        }
    }
}

/// Restore the parts of `reference - input` that are too wide to be shimmer.
///
/// Zero erosion returns `input`. Without `chroma` only luma is repaired and the
/// chroma planes of `input` pass through.
pub fn repair(input: &Clip, reference: &Clip, strength: RepairStrength, chroma: bool) -> Clip {
    if !strength.is_enabled() {
        return input.clone();
    }
    let format = input.format();
    let planes = Planes::luma_or_all(chroma);
    let neutral = format.neutral();
    let low = format.scale(129.0);
    let high = format.scale(127.0);

    let diff = reference.make_diff(input, planes);
    let choke = Choke {
        diff: &diff,
        planes,
        strength,
    };
    let positive = choke.positive();
    let negative = choke.negative();

    let restore = diff
        .expr2(
            "shimmer_positive",
            &positive,
            planes,
            SampleRange::Difference,
            move |x, y| {
                if x < low {
                    x
                } else if y < neutral {
                    neutral
                } else {
                    y
                }
            },
        )
        .expr2(
            "shimmer_negative",
            &negative,
            planes,
            SampleRange::Difference,
            move |x, y| {
                if x > high {
                    x
                } else if y > neutral {
                    neutral
                } else {
                    y
                }
            },
        );
    input.merge_diff(&restore, planes)
}
