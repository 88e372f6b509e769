//! Field doubling: bicubic resampling of the field lines and an edge-directed
//! line average that follows diagonals.

use crate::config::{EdiParams, InterpolatorKind};
use crate::field::separate_fields;
use crate::frame::{cround, FieldOrder, Format, Frame, Plane};
use crate::stream::Clip;

/// Directions tried by the edge-directed interpolator never exceed this.
const MAX_DIRECTION: usize = 3;

/// Mitchell-Netravali cubic.
pub(super) fn cubic_weight(x: f64, b: f64, c: f64) -> f64 {
    let x = x.abs();
    if x < 1.0 {
        ((12.0 - 9.0 * b - 6.0 * c) * x * x * x + (-18.0 + 12.0 * b + 6.0 * c) * x * x
            + (6.0 - 2.0 * b))
            / 6.0
    } else if x < 2.0 {
        ((-b - 6.0 * c) * x * x * x + (6.0 * b + 30.0 * c) * x * x + (-12.0 * b - 48.0 * c) * x
            + (8.0 * b + 24.0 * c))
            / 6.0
    } else {
        0.0
    }
}

/// Build a double-rate clip from the separated fields of `clip`. `fill` turns
/// one field plane into a full-height plane.
fn double_rate<F>(name: &str, clip: &Clip, order: FieldOrder, fill: F) -> Clip
where
    F: Fn(Format, &Plane, bool) -> Plane + Send + Sync + 'static,
{
    let fields = separate_fields(clip, order);
    let info = clip.info().with_frames(clip.len() * 2);
    Clip::new(name, info, move |j| {
        let field = fields.frame(j)?;
        let top = order.field_is_top(j);
        let format = field.format();
        let planes = field
            .planes()
            .iter()
            .map(|plane| fill(format, plane, top))
            .collect();
        Ok(Frame::from_planes(format, planes))
    })
}

/// Resample field rows to full height. Field row `k` sits on frame row
/// `2k + parity`; with `b = 0` those rows come out unchanged.
pub(super) fn bicubic_field(format: Format, field: &Plane, top: bool, b: f64, c: f64) -> Plane {
    let parity = if top { 0.0 } else { 1.0 };
    let last = field.height() as isize - 1;
    Plane::par_from_rows(field.width(), field.height() * 2, |y, row| {
        let fy = (y as f64 - parity) / 2.0;
        let base = fy.floor() as isize;
        let mut taps = [(0usize, 0.0f64); 4];
        let mut total = 0.0;
        for (i, tap) in taps.iter_mut().enumerate() {
            let k = base - 1 + i as isize;
            let w = cubic_weight(fy - k as f64, b, c);
            *tap = (k.clamp(0, last) as usize, w);
            total += w;
        }
        for (x, out) in row.iter_mut().enumerate() {
            let sum: f64 = taps
                .iter()
                .map(|&(k, w)| w * *field.get(x, k) as f64)
                .sum();
            *out = format.clamp(cround(sum / total));
        }
    })
}

/// Edge-directed line average. Known rows are copied; each missing pixel
/// averages the pair of pixels above and below along the direction of least
/// difference. With a `fallback` threshold, pixels whose best direction still
/// differs by more than it take the cubic value instead.
fn directional_field(
    format: Format,
    field: &Plane,
    top: bool,
    max_d: usize,
    fallback: Option<i32>,
) -> Plane {
    let parity = if top { 0 } else { 1 };
    let last = field.height() as isize - 1;
    let cubic = fallback.map(|_| bicubic_field(format, field, top, 0.0, 0.5));
    Plane::par_from_rows(field.width(), field.height() * 2, |y, row| {
        if y % 2 == parity {
            row.copy_from_slice(field.row(y / 2));
            return;
        }
        let above = (y as isize - 1 - parity as isize).div_euclid(2).clamp(0, last);
        let below = (y as isize + 1 - parity as isize).div_euclid(2).clamp(0, last);
        for (x, out) in row.iter_mut().enumerate() {
            let x = x as isize;
            let mut best = (i32::MAX, *field.get(x as usize, above as usize));
            for d in directions(max_d) {
                let cost: i32 = (-1..=1)
                    .map(|i| {
                        (field.get_clamped(x + d + i, above) - field.get_clamped(x - d + i, below))
                            .abs()
                    })
                    .sum();
                if cost < best.0 {
                    let a = field.get_clamped(x + d, above);
                    let b = field.get_clamped(x - d, below);
                    best = (cost, (a + b + 1) >> 1);
                }
            }
            *out = match (fallback, &cubic) {
                (Some(threshold), Some(cubic)) if best.0 > threshold => {
                    *cubic.get(x as usize, y)
                }
                _ => best.1,
            };
        }
    })
}

/// `0, -1, 1, -2, 2, ...` so that ties keep the smaller slope.
fn directions(max_d: usize) -> impl Iterator<Item = isize> {
    std::iter::once(0).chain((1..=max_d as isize).flat_map(|d| [-d, d]))
}

pub(super) fn interpolate(
    clip: &Clip,
    order: FieldOrder,
    kind: InterpolatorKind,
    params: &EdiParams,
) -> Clip {
    let max_d = usize::from(params.max_d).min(MAX_DIRECTION);
    match kind {
        InterpolatorKind::Nnedi3 | InterpolatorKind::Bob => bob(clip, order, 0.0, 0.5),
        InterpolatorKind::Eedi3 => double_rate("eedi3", clip, order, move |format, plane, top| {
            directional_field(format, plane, top, max_d, None)
        }),
        InterpolatorKind::Eedi3Nnedi3 => {
            double_rate("eedi3+nnedi3", clip, order, move |format, plane, top| {
                let threshold = 3 * format.peak() / 8;
                directional_field(format, plane, top, max_d, Some(threshold))
            })
        }
    }
}

pub(super) fn bob(clip: &Clip, order: FieldOrder, b: f64, c: f64) -> Clip {
    double_rate("bob", clip, order, move |format, plane, top| {
        bicubic_field(format, plane, top, b, c)
    })
}
