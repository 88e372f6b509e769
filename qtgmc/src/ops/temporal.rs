//! Non-compensated temporal averaging.

use std::sync::Arc;

use crate::frame::{Frame, Plane, Planes};
use crate::stream::Clip;

/// Mean absolute luma difference between two frames, as a fraction of peak.
pub fn luma_difference(a: &Frame, b: &Frame) -> f64 {
    let pa = a.plane(0);
    let pb = b.plane(0);
    if pa.is_empty() {
        return 0.0;
    }
    let total: u64 = pa
        .iter()
        .zip(pb.iter())
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum();
    total as f64 / pa.len() as f64 / a.format().peak() as f64
}

/// Equal-weight mean over `2 * radius + 1` frames centred on each frame.
///
/// With a `scene_change` threshold, a neighbour whose luma differs from the
/// previous accepted frame by more than the threshold ends the window in that
/// direction; the last accepted frame is repeated in its place.
pub fn average_frames(
    clip: &Clip,
    radius: usize,
    scene_change: Option<f64>,
    planes: Planes,
) -> Clip {
    if radius == 0 {
        return clip.clone();
    }
    let src = clip.clone();
    Clip::new("average_frames", clip.info(), move |n| {
        let centre = src.frame(n)?;
        let mut window = Vec::with_capacity(2 * radius + 1);
        window.push(Arc::clone(&centre));
        for direction in [-1isize, 1] {
            let mut last = Arc::clone(&centre);
            let mut cut = false;
            for k in 1..=radius as isize {
                if !cut {
                    let next = src.frame_clamped(n as isize + direction * k)?;
                    cut = scene_change.is_some_and(|th| luma_difference(&last, &next) > th);
                    if !cut {
                        last = next;
                    }
                }
                window.push(Arc::clone(&last));
            }
        }
        Ok(mean(&centre, &window, planes))
    })
}

fn mean(centre: &Frame, window: &[Arc<Frame>], planes: Planes) -> Frame {
    let count = window.len() as i32;
    centre.map_planes(planes, |p, plane| {
        Plane::par_from_rows(plane.width(), plane.height(), |y, row| {
            row.fill(0);
            for frame in window {
                for (acc, &v) in row.iter_mut().zip(frame.plane(p).row(y)) {
                    *acc += v;
                }
            }
            for acc in row.iter_mut() {
                *acc = (*acc + count / 2).div_euclid(count);
            }
        })
    })
}
