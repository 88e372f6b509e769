//! Separable, centre-aligned resampling.

use common::Buffer2;

use super::interpolate::cubic_weight;
use crate::engine::Kernel;
use crate::frame::{cround, Format, Frame, Plane};
use crate::stream::Clip;

impl Kernel {
    fn support(self) -> f64 {
        match self {
            Kernel::Point => 0.5,
            Kernel::Bilinear => 1.0,
            Kernel::Bicubic { .. } => 2.0,
            Kernel::Gauss { .. } => 4.0,
        }
    }

    fn weight(self, x: f64) -> f64 {
        match self {
            Kernel::Point => {
                if x.abs() <= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Kernel::Bilinear => (1.0 - x.abs()).max(0.0),
            Kernel::Bicubic { b, c } => cubic_weight(x, b, c),
            Kernel::Gauss { p } => 2f64.powf(-(p / 10.0) * x * x),
        }
    }
}

/// Source taps and normalised weights of every output position along one axis.
fn axis_taps(src: usize, dst: usize, kernel: Kernel) -> Vec<Vec<(usize, f64)>> {
    let ratio = dst as f64 / src as f64;
    let stretch = if ratio < 1.0 { 1.0 / ratio } else { 1.0 };
    let support = kernel.support() * stretch;
    (0..dst)
        .map(|o| {
            let centre = (o as f64 + 0.5) / ratio - 0.5;
            if let Kernel::Point = kernel {
                let nearest = ((o as f64 + 0.5) / ratio).floor() as usize;
                return vec![(nearest.min(src - 1), 1.0)];
            }
            let first = (centre - support).floor() as isize + 1;
            let last = (centre + support).ceil() as isize - 1;
            let mut taps: Vec<(usize, f64)> = (first..=last)
                .map(|i| {
                    let w = kernel.weight((i as f64 - centre) / stretch);
                    (i.clamp(0, src as isize - 1) as usize, w)
                })
                .filter(|&(_, w)| w != 0.0)
                .collect();
            let total: f64 = taps.iter().map(|&(_, w)| w).sum();
            if total.abs() < f64::EPSILON {
                let nearest = cround(centre).clamp(0, src as i32 - 1) as usize;
                return vec![(nearest, 1.0)];
            }
            for tap in &mut taps {
                tap.1 /= total;
            }
            taps
        })
        .collect()
}

fn resample_plane(format: Format, plane: &Plane, width: usize, height: usize, kernel: Kernel) -> Plane {
    if plane.dimensions() == (width, height) && matches!(kernel, Kernel::Point) {
        return plane.clone();
    }
    let horizontal = axis_taps(plane.width(), width, kernel);
    let vertical = axis_taps(plane.height(), height, kernel);
    let rows: Buffer2<f64> = Buffer2::par_from_rows(width, plane.height(), |y, row| {
        let src = plane.row(y);
        for (out, taps) in row.iter_mut().zip(&horizontal) {
            *out = taps.iter().map(|&(i, w)| w * f64::from(src[i])).sum();
        }
    });
    Plane::par_from_rows(width, height, |y, row| {
        let taps = &vertical[y];
        for (x, out) in row.iter_mut().enumerate() {
            let v: f64 = taps.iter().map(|&(i, w)| w * *rows.get(x, i)).sum();
            *out = format.clamp(cround(v));
        }
    })
}

pub(super) fn resample(clip: &Clip, width: usize, height: usize, kernel: Kernel) -> Clip {
    let src = clip.clone();
    let info = clip.info().with_dimensions(width, height);
    let format = info.format;
    Clip::new("resample", info, move |n| {
        let frame = src.frame(n)?;
        let planes = frame
            .planes()
            .iter()
            .enumerate()
            .map(|(p, plane)| {
                let (w, h) = format.plane_dimensions(p, width, height);
                resample_plane(format, plane, w, h, kernel)
            })
            .collect();
        Ok(Frame::from_planes(format, planes))
    })
}
