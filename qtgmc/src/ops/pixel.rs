//! Per-pixel arithmetic over one to three frames.

use crate::frame::{cround, Format, Frame, Plane, Planes};

/// How an expression result is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRange {
    /// Clamped to `[0, peak]`.
    Pixel,
    /// Neutral-centred difference, stored unclamped.
    Difference,
}

impl SampleRange {
    #[inline]
    fn apply(self, format: Format, value: i32) -> i32 {
        match self {
            Self::Pixel => format.clamp(value),
            Self::Difference => value,
        }
    }
}

pub fn expr1<F>(a: &Frame, planes: Planes, range: SampleRange, f: F) -> Frame
where
    F: Fn(i32) -> i32 + Sync,
{
    let format = a.format();
    a.map_planes(planes, |_, pa| {
        Plane::par_from_rows(pa.width(), pa.height(), |y, row| {
            for (out, &x) in row.iter_mut().zip(pa.row(y)) {
                *out = range.apply(format, f(x));
            }
        })
    })
}

pub fn expr2<F>(a: &Frame, b: &Frame, planes: Planes, range: SampleRange, f: F) -> Frame
where
    F: Fn(i32, i32) -> i32 + Sync,
{
    let format = a.format();
    a.map_planes(planes, |p, pa| {
        let pb = b.plane(p);
        assert!(pa.same_dimensions(pb), "expression inputs must match");
        Plane::par_from_rows(pa.width(), pa.height(), |row_y, row| {
            for ((out, &x), &y) in row.iter_mut().zip(pa.row(row_y)).zip(pb.row(row_y)) {
                *out = range.apply(format, f(x, y));
            }
        })
    })
}

pub fn expr3<F>(a: &Frame, b: &Frame, c: &Frame, planes: Planes, range: SampleRange, f: F) -> Frame
where
    F: Fn(i32, i32, i32) -> i32 + Sync,
{
    let format = a.format();
    a.map_planes(planes, |p, pa| {
        let pb = b.plane(p);
        let pc = c.plane(p);
        assert!(
            pa.same_dimensions(pb) && pa.same_dimensions(pc),
            "expression inputs must match"
        );
        Plane::par_from_rows(pa.width(), pa.height(), |row_y, row| {
            let rows = pa.row(row_y).iter().zip(pb.row(row_y)).zip(pc.row(row_y));
            for (out, ((&x, &y), &z)) in row.iter_mut().zip(rows) {
                *out = range.apply(format, f(x, y, z));
            }
        })
    })
}

/// `a - b + neutral`, unclamped so that [`merge_diff`] restores `a` exactly.
pub fn make_diff(a: &Frame, b: &Frame, planes: Planes) -> Frame {
    let neutral = a.format().neutral();
    expr2(a, b, planes, SampleRange::Difference, |x, y| x - y + neutral)
}

/// `a + diff - neutral`, clamped to the pixel range.
pub fn merge_diff(a: &Frame, diff: &Frame, planes: Planes) -> Frame {
    let neutral = a.format().neutral();
    expr2(a, diff, planes, SampleRange::Pixel, |x, d| x + d - neutral)
}

/// Weighted average; `weight` is the share of `b`. The result lies between the
/// inputs, so it is valid for pixel and difference frames alike.
pub fn merge(a: &Frame, b: &Frame, weight: f64, planes: Planes) -> Frame {
    let w = cround(weight.clamp(0.0, 1.0) * 32768.0) as i64;
    expr2(a, b, planes, SampleRange::Difference, move |x, y| {
        x + (((y - x) as i64 * w + 16384) >> 15) as i32
    })
}

/// Blend towards `b` by `mask / peak`.
pub fn masked_merge(a: &Frame, b: &Frame, mask: &Frame, planes: Planes) -> Frame {
    let peak = a.format().peak();
    expr3(a, b, mask, planes, SampleRange::Pixel, move |x, y, m| {
        let m = m.clamp(0, peak);
        x + ((y - x) * m + peak / 2).div_euclid(peak)
    })
}

/// Clamp `a` to `[dark - undershoot, bright + overshoot]`.
pub fn clamp_between(
    a: &Frame,
    bright: &Frame,
    dark: &Frame,
    overshoot: i32,
    undershoot: i32,
    planes: Planes,
) -> Frame {
    expr3(a, bright, dark, planes, SampleRange::Pixel, move |x, hi, lo| {
        if x > hi + overshoot {
            hi + overshoot
        } else if x < lo - undershoot {
            lo - undershoot
        } else {
            x
        }
    })
}

/// Luma of `luma` with the chroma planes of `chroma`.
pub fn shuffle_planes(luma: &Frame, chroma: &Frame) -> Frame {
    let mut planes = chroma.planes().to_vec();
    planes[0] = luma.plane(0).clone();
    Frame::from_planes(luma.format(), planes)
}
