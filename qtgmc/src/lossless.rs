//! Put the source fields back into a double-rate clip and clean the combing
//! that appears where the processed lines no longer match them.

use crate::field::{extract_field, separate_fields, weave_fields};
use crate::frame::{FieldOrder, Planes};
use crate::ops::{ClipOps, RankClamp, SampleRange};
use crate::stream::Clip;

/// Output frame `j` carries field `j` of `source` verbatim in its own parity
/// and the other parity of `processed`, corrected by the part of its vertical
/// median difference that does not agree with its neighbours.
pub fn make_lossless(processed: &Clip, source: &Clip, order: FieldOrder) -> Clip {
    let neutral = processed.format().neutral();
    let source_fields = separate_fields(source, order);
    let new_fields = opposite_fields(processed, order);

    let woven = weave_by_parity(&source_fields, &new_fields, order);
    let median_diff = woven.make_diff(&woven.vertical_cleaner(Planes::All), Planes::All);
    let new_diff = opposite_fields(&median_diff, order);
    let agreed = new_diff.vertical_cleaner(Planes::All).expr2(
        "lossless_agreed_diff",
        &new_diff,
        Planes::All,
        SampleRange::Difference,
        move |x, y| {
            let (dx, dy) = (x - neutral, y - neutral);
            if dx.signum() * dy.signum() < 0 {
                neutral
            } else if dx.abs() < dy.abs() {
                x
            } else {
                y
            }
        },
    );
    let cleaned_diff = agreed.repair(
        &agreed.remove_grain(Planes::All, RankClamp::SecondExtremes),
        Planes::All,
        RankClamp::Extremes,
    );
    let cleaned = new_fields.expr2(
        "lossless_new_fields",
        &cleaned_diff,
        Planes::All,
        SampleRange::Pixel,
        move |x, d| x - d + neutral,
    );
    weave_by_parity(&source_fields, &cleaned, order)
}

/// Half-height clip of the rows each double-rate frame interpolated.
fn opposite_fields(clip: &Clip, order: FieldOrder) -> Clip {
    let src = clip.clone();
    let info = clip.info().with_dimensions(clip.width(), clip.height() / 2);
    Clip::new("opposite_fields", info, move |j| {
        let frame = src.frame(j)?;
        Ok(extract_field(&frame, !order.field_is_top(j)))
    })
}

/// Frame `j` from `native` in the parity of field `j` and `other` in the rest.
fn weave_by_parity(native: &Clip, other: &Clip, order: FieldOrder) -> Clip {
    let info = native
        .info()
        .with_dimensions(native.width(), native.height() * 2);
    let (native, other) = (native.clone(), other.clone());
    Clip::new("weave_by_parity", info, move |j| {
        let own = native.frame(j)?;
        let rest = other.frame(j)?;
        Ok(if order.field_is_top(j) {
            weave_fields(&own, &rest)
        } else {
            weave_fields(&rest, &own)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Interpolator, SoftwareEngine};
    use crate::field::reinterlace;
    use crate::frame::Format;
    use crate::testing::{assert_clips_equal, flat_clip, noisy_clip, panning_clip, static_ramp_clip};

    #[test]
    fn test_source_rows_are_restored_exactly() {
        for order in [FieldOrder::TopFieldFirst, FieldOrder::BottomFieldFirst] {
            let source = panning_clip(Format::YUV420P8, 16, 16, 2, 1, 0);
            let processed = noisy_clip(Format::YUV420P8, 16, 16, 4, 20, 3);
            let lossless = make_lossless(&processed, &source, order);
            assert_eq!(lossless.len(), 4);
            assert_clips_equal(&reinterlace(&lossless, order), &source, 0..2);
        }
    }

    #[test]
    fn test_consistent_input_is_unchanged() {
        let order = FieldOrder::TopFieldFirst;
        let source = static_ramp_clip(Format::YUV420P8, 16, 16, 2);
        let processed = SoftwareEngine.bob(&source, order, 0.0, 0.5);
        let lossless = make_lossless(&processed, &source, order);
        assert_clips_equal(&lossless, &processed, 0..4);
    }

    #[test]
    fn test_flat_combing_is_cleaned_inside_the_frame() {
        let order = FieldOrder::BottomFieldFirst;
        let source = flat_clip(Format::GRAY8, 16, 16, 1, 100);
        let processed = flat_clip(Format::GRAY8, 16, 16, 2, 104);
        let lossless = make_lossless(&processed, &source, order);
        let frame = lossless.frame(0).unwrap();
        for y in 1..15 {
            assert_eq!(*frame.plane(0).get(4, y), 100, "row {y}");
        }
    }
}
