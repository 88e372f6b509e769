//! The clip motion vectors are searched on: the bobbed input with its shimmer
//! averaged away, softened so edges match better, and luma stretched to full
//! range.

use crate::config::Configuration;
use crate::engine::{Kernel, Resampler};
use crate::frame::{cround, Planes};
use crate::ops::{average_frames, ClipOps, Neighbourhood, SampleRange};
use crate::shimmer;
use crate::stream::Clip;

/// Luma change between frames that ends a temporal average.
const SCENE_CHANGE_THRESHOLD: f64 = 28.0 / 255.0;

/// Smoothed search clip before the luma rebuild. Pipelines also use it for the
/// shutter-blur motion mask.
pub(super) fn build(bobbed: &Clip, config: &Configuration, resampler: &dyn Resampler) -> Clip {
    let planes = config.motion.planes();
    let smoothed = temporal_prefilter(bobbed, config.core.tr0, planes);
    let repaired = shimmer::repair(
        &smoothed,
        bobbed,
        config.core.rep0,
        config.core.rep_chroma && config.motion.chroma,
    );
    spatial_prefilter(&repaired, bobbed, config.motion.search_prefilter, planes, resampler)
}

/// Binomial `(1, 2, 1)` or `(1, 4, 6, 4, 1)` average of the bobbed clip.
fn temporal_prefilter(bobbed: &Clip, radius: u8, planes: Planes) -> Clip {
    let average = |r| average_frames(bobbed, r, Some(SCENE_CHANGE_THRESHOLD), planes);
    match radius {
        0 => bobbed.clone(),
        1 => average(1).merge(bobbed, 0.25, planes),
        _ => average(1)
            .merge(&average(2), 0.357, planes)
            .merge(bobbed, 0.125, planes),
    }
}

fn spatial_prefilter(
    repaired: &Clip,
    bobbed: &Clip,
    mode: u8,
    planes: Planes,
    resampler: &dyn Resampler,
) -> Clip {
    if mode == 0 {
        return repaired.clone();
    }
    let (w, h) = (repaired.width(), repaired.height());
    let blurred = if mode == 1 {
        let half = resampler.resample(repaired, w / 2, h / 2, Kernel::Bilinear);
        resampler.resample(
            &half.blur(planes, Neighbourhood::Square),
            w,
            h,
            Kernel::Bilinear,
        )
    } else {
        let soft = resampler.resample(
            &repaired.blur(planes, Neighbourhood::Square),
            w,
            h,
            Kernel::Gauss { p: 2.0 },
        );
        soft.merge(repaired, 0.1, planes)
    };
    if mode < 3 {
        return blurred;
    }

    let format = repaired.format();
    let (near, far, step) = (format.scale(3.0), format.scale(7.0), format.scale(2.0));
    let tweaked = repaired.expr2("search_tweak", bobbed, planes, SampleRange::Pixel, move |x, y| {
        if x + near < y {
            x + near
        } else if x - near > y {
            x - near
        } else {
            y
        }
    });
    blurred.expr2("search_clamp", &tweaked, planes, SampleRange::Pixel, move |x, y| {
        if x + far < y {
            x + step
        } else if x - far > y {
            x - step
        } else {
            cround(f64::from(51 * x + 49 * y) / 100.0)
        }
    })
}

/// Stretch TV-range luma to full range and boost chroma by `128 / 112` when
/// `chroma` is set. The motion search sees more contrast this way.
pub(super) fn luma_rebuild(clip: &Clip, chroma: bool) -> Clip {
    let format = clip.format();
    let (black, range, full) = (
        f64::from(format.scale(16.0)),
        f64::from(format.scale(219.0)),
        f64::from(format.scale(256.0)),
    );
    let neutral = format.neutral();
    let luma = clip.expr("luma_rebuild", Planes::Luma, SampleRange::Pixel, move |x| {
        cround(((f64::from(x) - black) / range).clamp(0.0, 1.0) * full)
    });
    if !chroma || format.is_gray() {
        return luma;
    }
    let boosted = clip.expr("chroma_rebuild", Planes::All, SampleRange::Pixel, move |x| {
        cround(f64::from(x - neutral) * 128.0 / 112.0) + neutral
    });
    luma.shuffle_chroma(&boosted)
}
