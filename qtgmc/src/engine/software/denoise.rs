//! Thresholded temporal and spatial averaging, plus a small non-local means
//! variant for the patch-based denoiser.

use std::sync::Arc;

use crate::config::DenoiserKind;
use crate::engine::DenoiseParams;
use crate::error::StageResult;
use crate::frame::{cround, Format, Frame, Plane};
use crate::stream::Clip;

/// Centre frame and its temporal window for frame `n`.
fn window_frames(window: &[Clip], radius: usize, n: usize) -> StageResult<Vec<Arc<Frame>>> {
    if window.len() > 1 {
        return window.iter().map(|clip| clip.frame(n)).collect();
    }
    let clip = &window[0];
    let n = n as isize;
    (-(radius as isize)..=radius as isize)
        .map(|d| clip.frame_clamped(n + d))
        .collect()
}

pub(super) fn denoise(window: &[Clip], kind: DenoiserKind, params: &DenoiseParams) -> Clip {
    assert!(!window.is_empty(), "denoise needs at least one clip");
    let centre = window.len() / 2;
    let clips = window.to_vec();
    let params = *params;
    let radius = if window.len() > 1 {
        centre
    } else {
        params.temporal_radius
    };
    let info = window[centre].info();
    Clip::new(format!("denoise_{kind}"), info, move |n| {
        let frames = window_frames(&clips, radius, n)?;
        let middle = frames.len() / 2;
        let current = &frames[middle];
        let format = current.format();
        let threshold = (3.0 * params.sigma * f64::from(format.peak()) / 255.0).max(1.0);
        Ok(current.map_planes(params.planes, |p, plane| {
            let others: Vec<&Plane> = frames.iter().map(|f| f.plane(p)).collect();
            match kind {
                DenoiserKind::Dfttest | DenoiserKind::Fft3df => {
                    let temporal = thresholded_temporal(plane, &others, threshold);
                    thresholded_spatial(format, &temporal, threshold)
                }
                DenoiserKind::KnlMeans => non_local_means(format, plane, &others, threshold / 3.0),
            }
        }))
    })
}

/// Mean over the window of the samples within `threshold` of the centre.
fn thresholded_temporal(plane: &Plane, window: &[&Plane], threshold: f64) -> Plane {
    let threshold = threshold as i32;
    Plane::par_from_rows(plane.width(), plane.height(), |y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let c = *plane.get(x, y);
            let (sum, count) = window
                .iter()
                .map(|w| *w.get(x, y))
                .filter(|v| (v - c).abs() <= threshold)
                .fold((0i64, 0i64), |(s, k), v| (s + i64::from(v), k + 1));
            *out = if count == 0 {
                c
            } else {
                (sum + count / 2).div_euclid(count) as i32
            };
        }
    })
}

/// 3x3 mean over the neighbours within `threshold` of the centre.
fn thresholded_spatial(format: Format, plane: &Plane, threshold: f64) -> Plane {
    let threshold = threshold as i32;
    Plane::par_from_rows(plane.width(), plane.height(), |y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let c = *plane.get(x, y);
            let mut sum = 0i64;
            let mut count = 0i64;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let v = plane.get_mirrored(x as isize + dx, y as isize + dy);
                    if (v - c).abs() <= threshold {
                        sum += i64::from(v);
                        count += 1;
                    }
                }
            }
            *out = format.clamp((sum + count / 2).div_euclid(count) as i32);
        }
    })
}

/// Patch similarity weighted average over a 3x3 search window in every frame
/// of the temporal window. `h` is the filtering strength in sample units.
fn non_local_means(format: Format, plane: &Plane, window: &[&Plane], h: f64) -> Plane {
    let h2 = (h * h).max(1.0);
    let patch = |a: &Plane, ax: isize, ay: isize, b: &Plane, bx: isize, by: isize| -> f64 {
        let mut d = 0.0;
        for py in -1..=1 {
            for px in -1..=1 {
                let diff = a.get_mirrored(ax + px, ay + py) - b.get_mirrored(bx + px, by + py);
                d += f64::from(diff * diff);
            }
        }
        d / 9.0
    };
    Plane::par_from_rows(plane.width(), plane.height(), |y, row| {
        let yi = y as isize;
        for (x, out) in row.iter_mut().enumerate() {
            let xi = x as isize;
            let mut sum = 0.0;
            let mut total = 0.0;
            for &other in window {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (sx, sy) = (xi + dx, yi + dy);
                        let w = (-patch(plane, xi, yi, other, sx, sy) / h2).exp();
                        sum += w * f64::from(other.get_mirrored(sx, sy));
                        total += w;
                    }
                }
            }
            *out = format.clamp(cround(sum / total));
        }
    })
}
