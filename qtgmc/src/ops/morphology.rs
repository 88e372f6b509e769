//! 3x3 neighbourhood filters: minimum, maximum, inflate, deflate, median and the
//! binomial blur. Edges use reflect-101 addressing.
//!
//! None of these filters leave the range spanned by their inputs, so they apply
//! unchanged to pixel and difference frames.

use crate::frame::{Frame, Plane, Planes};

/// Neighbour offsets in reading order: TL, T, TR, L, R, BL, B, BR.
const OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Which neighbours take part in a minimum, maximum or blur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbourhood {
    /// All eight neighbours.
    Square,
    /// Above and below only.
    Vertical,
    /// Left and right only.
    Horizontal,
}

impl Neighbourhood {
    fn selects(self, index: usize) -> bool {
        match self {
            Self::Square => true,
            Self::Vertical => index == 1 || index == 6,
            Self::Horizontal => index == 3 || index == 4,
        }
    }
}

/// The eight neighbours of `(x, y)` in [`OFFSETS`] order.
#[inline]
pub(crate) fn neighbours(plane: &Plane, x: usize, y: usize) -> [i32; 8] {
    let (w, h) = plane.dimensions();
    if x > 0 && y > 0 && x + 1 < w && y + 1 < h {
        let above = plane.row(y - 1);
        let here = plane.row(y);
        let below = plane.row(y + 1);
        [
            above[x - 1],
            above[x],
            above[x + 1],
            here[x - 1],
            here[x + 1],
            below[x - 1],
            below[x],
            below[x + 1],
        ]
    } else {
        let (xi, yi) = (x as isize, y as isize);
        OFFSETS.map(|(dx, dy)| plane.get_mirrored(xi + dx, yi + dy))
    }
}

/// Apply `f(centre, neighbours)` at every pixel.
pub(crate) fn filter_3x3<F>(plane: &Plane, f: F) -> Plane
where
    F: Fn(i32, &[i32; 8]) -> i32 + Sync,
{
    Plane::par_from_rows(plane.width(), plane.height(), |y, row| {
        let src = plane.row(y);
        for (x, out) in row.iter_mut().enumerate() {
            *out = f(src[x], &neighbours(plane, x, y));
        }
    })
}

fn minimum_plane(plane: &Plane, nb: Neighbourhood) -> Plane {
    filter_3x3(plane, |c, n| {
        (0..8)
            .filter(|&i| nb.selects(i))
            .fold(c, |acc, i| acc.min(n[i]))
    })
}

fn maximum_plane(plane: &Plane, nb: Neighbourhood) -> Plane {
    filter_3x3(plane, |c, n| {
        (0..8)
            .filter(|&i| nb.selects(i))
            .fold(c, |acc, i| acc.max(n[i]))
    })
}

pub fn minimum(frame: &Frame, planes: Planes, nb: Neighbourhood) -> Frame {
    frame.map_planes(planes, |_, p| minimum_plane(p, nb))
}

pub fn maximum(frame: &Frame, planes: Planes, nb: Neighbourhood) -> Frame {
    frame.map_planes(planes, |_, p| maximum_plane(p, nb))
}

/// Raise each pixel towards the rounded mean of its neighbours, never lower it.
pub fn inflate(frame: &Frame, planes: Planes) -> Frame {
    frame.map_planes(planes, |_, p| {
        filter_3x3(p, |c, n| c.max((n.iter().sum::<i32>() + 4).div_euclid(8)))
    })
}

/// Lower each pixel towards the rounded mean of its neighbours, never raise it.
pub fn deflate(frame: &Frame, planes: Planes) -> Frame {
    frame.map_planes(planes, |_, p| {
        filter_3x3(p, |c, n| c.min((n.iter().sum::<i32>() + 4).div_euclid(8)))
    })
}

/// Median of the 3x3 window.
pub fn median(frame: &Frame, planes: Planes) -> Frame {
    frame.map_planes(planes, |_, p| {
        filter_3x3(p, |c, n| {
            let mut window = [c, n[0], n[1], n[2], n[3], n[4], n[5], n[6], n[7]];
            window.sort_unstable();
            window[4]
        })
    })
}

/// Binomial blur: `[1 2 1; 2 4 2; 1 2 1] / 16` for [`Neighbourhood::Square`],
/// `[1 2 1] / 4` along one axis otherwise.
pub fn blur(frame: &Frame, planes: Planes, nb: Neighbourhood) -> Frame {
    frame.map_planes(planes, |_, p| match nb {
        Neighbourhood::Square => filter_3x3(p, |c, n| {
            let corners = n[0] + n[2] + n[5] + n[7];
            let edges = n[1] + n[3] + n[4] + n[6];
            (corners + 2 * edges + 4 * c + 8).div_euclid(16)
        }),
        Neighbourhood::Vertical => filter_3x3(p, |c, n| (n[1] + 2 * c + n[6] + 2).div_euclid(4)),
        Neighbourhood::Horizontal => {
            filter_3x3(p, |c, n| (n[3] + 2 * c + n[4] + 2).div_euclid(4))
        }
    })
}
