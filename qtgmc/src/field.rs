//! Field and frame-rate helpers: separating, weaving and re-interlacing fields,
//! frame selection and vertical padding.

use std::sync::Arc;

use crate::error::StageResult;
use crate::frame::{FieldOrder, Frame, Plane};
use crate::stream::Clip;

/// Rows of one parity as a half-height frame. `top` selects even rows.
pub fn extract_field(frame: &Frame, top: bool) -> Frame {
    let parity = if top { 0 } else { 1 };
    let planes = frame
        .planes()
        .iter()
        .map(|plane| {
            let h = plane.height() / 2;
            let mut out = Vec::with_capacity(plane.width() * h);
            for fy in 0..h {
                out.extend_from_slice(plane.row(fy * 2 + parity));
            }
            Plane::new(plane.width(), h, out)
        })
        .collect();
    Frame::from_planes(frame.format(), planes)
}

/// Interleave two half-height fields into one frame.
pub fn weave_fields(top: &Frame, bottom: &Frame) -> Frame {
    let planes = top
        .planes()
        .iter()
        .zip(bottom.planes())
        .map(|(t, b)| {
            assert!(t.same_dimensions(b), "fields must have equal dimensions");
            let mut out = Vec::with_capacity(t.len() * 2);
            for fy in 0..t.height() {
                out.extend_from_slice(t.row(fy));
                out.extend_from_slice(b.row(fy));
            }
            Plane::new(t.width(), t.height() * 2, out)
        })
        .collect();
    Frame::from_planes(top.format(), planes)
}

/// Replace the rows of parity `top` in `frame` with the same rows of `source`.
pub fn replace_field_rows(frame: &Frame, source: &Frame, top: bool) -> Frame {
    let parity = if top { 0 } else { 1 };
    let planes = frame
        .planes()
        .iter()
        .zip(source.planes())
        .map(|(dst, src)| {
            let mut out = dst.clone();
            for y in (parity..dst.height()).step_by(2) {
                out.row_mut(y).copy_from_slice(src.row(y));
            }
            out
        })
        .collect();
    Frame::from_planes(frame.format(), planes)
}

/// `2N` half-height fields in temporal order.
pub fn separate_fields(clip: &Clip, order: FieldOrder) -> Clip {
    let src = clip.clone();
    let info = clip
        .info()
        .with_dimensions(clip.width(), clip.height() / 2)
        .with_frames(clip.len() * 2);
    Clip::new("separate_fields", info, move |n| {
        let frame = src.frame(n / 2)?;
        Ok(extract_field(&frame, order.field_is_top(n)))
    })
}

/// Pair fields `2k`, `2k + 1` back into frame `k`.
pub fn weave(fields: &Clip, order: FieldOrder) -> Clip {
    let src = fields.clone();
    let info = fields
        .info()
        .with_dimensions(fields.width(), fields.height() * 2)
        .with_frames(fields.len() / 2);
    Clip::new("weave", info, move |k| {
        let first = src.frame(2 * k)?;
        let second = src.frame(2 * k + 1)?;
        Ok(if order.is_tff() {
            weave_fields(&first, &second)
        } else {
            weave_fields(&second, &first)
        })
    })
}

/// Rebuild an interlaced clip from a double-rate one: frame `k` takes the first
/// field's rows from frame `2k` and the second field's rows from frame `2k + 1`.
pub fn reinterlace(bobbed: &Clip, order: FieldOrder) -> Clip {
    let src = bobbed.clone();
    let info = bobbed.info().with_frames(bobbed.len() / 2);
    Clip::new("reinterlace", info, move |k| {
        let first = src.frame(2 * k)?;
        let second = src.frame(2 * k + 1)?;
        Ok(replace_field_rows(&first, &second, !order.is_tff()))
    })
}

/// Double-rate clip where frame `j` weaves field `j` with its temporal neighbour
/// of opposite parity.
pub fn double_weave(clip: &Clip, order: FieldOrder) -> Clip {
    let fields = separate_fields(clip, order);
    let info = clip.info().with_frames(clip.len() * 2);
    Clip::new("double_weave", info, move |j| {
        let partner = if j + 1 < fields.len() {
            j + 1
        } else {
            j.saturating_sub(1)
        };
        let own = fields.frame(j)?;
        let other = fields.frame(partner)?;
        Ok(if order.field_is_top(j) {
            weave_fields(&own, &other)
        } else {
            weave_fields(&other, &own)
        })
    })
}

/// Keep frames `offsets` of every `cycle` frames.
pub fn select_every(clip: &Clip, cycle: usize, offsets: &[usize]) -> Clip {
    assert!(cycle > 0, "cycle must be positive");
    assert!(
        !offsets.is_empty() && offsets.iter().all(|&o| o < cycle),
        "offsets must lie within the cycle"
    );
    let src = clip.clone();
    let offsets: Arc<[usize]> = offsets.into();
    let full_cycles = clip.len() / cycle;
    let tail = offsets
        .iter()
        .filter(|&&o| o < clip.len() % cycle)
        .count();
    let len = full_cycles * offsets.len() + tail;
    Clip::new("select_every", clip.info().with_frames(len), move |n| {
        let index = (n / offsets.len()) * cycle + offsets[n % offsets.len()];
        Ok(Frame::clone(&*src.frame(index)?))
    })
}

/// Pad `rows` luma rows above and below by edge replication.
pub fn pad_rows(clip: &Clip, rows: usize) -> Clip {
    let src = clip.clone();
    let info = clip
        .info()
        .with_dimensions(clip.width(), clip.height() + 2 * rows);
    Clip::new("pad_rows", info, move |n| {
        let frame = src.frame(n)?;
        Ok(pad_frame(&frame, rows))
    })
}

/// Remove `rows` luma rows from the top and bottom.
pub fn crop_rows(clip: &Clip, rows: usize) -> Clip {
    let src = clip.clone();
    let info = clip
        .info()
        .with_dimensions(clip.width(), clip.height() - 2 * rows);
    Clip::new("crop_rows", info, move |n| {
        let frame = src.frame(n)?;
        Ok(crop_frame(&frame, rows))
    })
}

fn pad_frame(frame: &Frame, rows: usize) -> Frame {
    let format = frame.format();
    let planes = frame
        .planes()
        .iter()
        .enumerate()
        .map(|(p, plane)| {
            let pad = rows >> format.plane_shift(p).1;
            let h = plane.height() + 2 * pad;
            Plane::par_from_rows(plane.width(), h, |y, row| {
                let sy = y as isize - pad as isize;
                let sy = sy.clamp(0, plane.height() as isize - 1) as usize;
                row.copy_from_slice(plane.row(sy));
            })
        })
        .collect();
    Frame::from_planes(format, planes)
}

fn crop_frame(frame: &Frame, rows: usize) -> Frame {
    let format = frame.format();
    let planes = frame
        .planes()
        .iter()
        .enumerate()
        .map(|(p, plane)| {
            let crop = rows >> format.plane_shift(p).1;
            let h = plane.height() - 2 * crop;
            Plane::par_from_rows(plane.width(), h, |y, row| {
                row.copy_from_slice(plane.row(y + crop));
            })
        })
        .collect();
    Frame::from_planes(format, planes)
}

/// Frames of a clip as a `StageResult` vector, in order.
pub fn collect_frames(clip: &Clip) -> StageResult<Vec<Arc<Frame>>> {
    (0..clip.len()).map(|n| clip.frame(n)).collect()
}
