//! Rank-order cleaners: vertical median, neighbour-clamp denoise and repair.

use super::morphology::{filter_3x3, neighbours};
use crate::frame::{Frame, Plane, Planes};

/// Which order statistics of the eight neighbours bound the clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankClamp {
    /// Smallest and largest neighbour.
    Extremes,
    /// Second smallest and second largest neighbour.
    SecondExtremes,
}

impl RankClamp {
    #[inline]
    fn bounds(self, n: &[i32; 8]) -> (i32, i32) {
        let mut sorted = *n;
        sorted.sort_unstable();
        match self {
            Self::Extremes => (sorted[0], sorted[7]),
            Self::SecondExtremes => (sorted[1], sorted[6]),
        }
    }
}

/// Copy the outermost rows and columns of `src` over `out`.
fn copy_border(out: &mut Plane, src: &Plane) {
    let (w, h) = src.dimensions();
    if h == 0 || w == 0 {
        return;
    }
    out.row_mut(0).copy_from_slice(src.row(0));
    out.row_mut(h - 1).copy_from_slice(src.row(h - 1));
    for y in 0..h {
        *out.get_mut(0, y) = *src.get(0, y);
        *out.get_mut(w - 1, y) = *src.get(w - 1, y);
    }
}

/// Vertical median of three. The first and last rows are kept.
pub fn vertical_cleaner(frame: &Frame, planes: Planes) -> Frame {
    frame.map_planes(planes, |_, p| {
        let h = p.height();
        Plane::par_from_rows(p.width(), h, |y, row| {
            if y == 0 || y + 1 == h {
                row.copy_from_slice(p.row(y));
                return;
            }
            let (above, here, below) = (p.row(y - 1), p.row(y), p.row(y + 1));
            for (x, out) in row.iter_mut().enumerate() {
                let (a, c, b) = (above[x], here[x], below[x]);
                *out = c.clamp(a.min(b), a.max(b));
            }
        })
    })
}

/// Clamp each pixel to the chosen order statistics of its own neighbours.
/// Border pixels are kept.
pub fn remove_grain(frame: &Frame, planes: Planes, rank: RankClamp) -> Frame {
    frame.map_planes(planes, |_, p| {
        let mut out = filter_3x3(p, |c, n| {
            let (lo, hi) = rank.bounds(n);
            c.clamp(lo, hi)
        });
        copy_border(&mut out, p);
        out
    })
}

/// Clamp each pixel of `frame` to the neighbourhood of the same position in
/// `reference`, widened to include the reference centre. Border pixels are kept.
pub fn repair(frame: &Frame, reference: &Frame, planes: Planes, rank: RankClamp) -> Frame {
    frame.map_planes(planes, |index, p| {
        let r = reference.plane(index);
        assert!(p.same_dimensions(r), "repair inputs must match");
        let mut out = Plane::par_from_rows(p.width(), p.height(), |y, row| {
            let src = p.row(y);
            let centre = r.row(y);
            for (x, dst) in row.iter_mut().enumerate() {
                let (lo, hi) = rank.bounds(&neighbours(r, x, y));
                *dst = src[x].clamp(lo.min(centre[x]), hi.max(centre[x]));
            }
        });
        copy_border(&mut out, p);
        out
    })
}
