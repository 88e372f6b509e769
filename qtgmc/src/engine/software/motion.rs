//! Full-pel block matching and the vector-driven operations: compensation,
//! SAD-weighted degraining, flow blur and motion masks.

use std::sync::Arc;

use glam::IVec2;
use rayon::prelude::*;

use crate::engine::{BlockVectors, Direction, SceneChange, SearchParams, VectorClip};
use crate::error::StageResult;
use crate::frame::{cround, Frame, Plane};
use crate::stream::{Clip, Stream};

// ============================================================================
// Block grid
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Grid {
    block_size: usize,
    step: usize,
    blocks_x: usize,
    blocks_y: usize,
}

impl Grid {
    fn new(width: usize, height: usize, params: &SearchParams) -> Self {
        let block_size = params.block_size.max(1);
        let step = block_size.saturating_sub(params.overlap).max(1);
        let count = |len: usize| (len.saturating_sub(params.overlap) / step).max(1);
        Self {
            block_size,
            step,
            blocks_x: count(width),
            blocks_y: count(height),
        }
    }

    fn invalid(&self) -> BlockVectors {
        BlockVectors::invalid(self.block_size, self.step, self.blocks_x, self.blocks_y)
    }

    fn origin(&self, bx: usize, by: usize) -> (usize, usize) {
        (bx * self.step, by * self.step)
    }
}

// ============================================================================
// Matching
// ============================================================================

struct Matcher<'a> {
    current: &'a Frame,
    reference: &'a Frame,
    grid: Grid,
    params: &'a SearchParams,
}

impl Matcher<'_> {
    /// SAD of block `(bx, by)` displaced by `v`, on an 8-bit scale. Blocks
    /// clipped by the frame edge are scaled up to a full block.
    fn sad(&self, bx: usize, by: usize, v: IVec2) -> u32 {
        let format = self.current.format();
        let shift = format.bits() - 8;
        let (x0, y0) = self.grid.origin(bx, by);
        let bs = self.grid.block_size;
        let mut total = plane_sad(self.current.plane(0), self.reference.plane(0), x0, y0, bs, v);
        if self.params.chroma && !format.is_gray() {
            let (ssw, ssh) = format.plane_shift(1);
            let cv = IVec2::new(v.x >> ssw, v.y >> ssh);
            for p in 1..self.current.num_planes() {
                let (cx, cy) = (x0 >> ssw, y0 >> ssh);
                let cbs = (bs >> ssw.max(ssh)).max(1);
                total += plane_sad(self.current.plane(p), self.reference.plane(p), cx, cy, cbs, cv);
            }
        }
        (total >> shift).min(u64::from(u32::MAX)) as u32
    }

    /// `(sad, cost)` of a candidate against predictor `pred`.
    fn cost(&self, bx: usize, by: usize, v: IVec2, pred: IVec2, is_predictor: bool) -> (u32, u64) {
        let sad = self.sad(bx, by, v);
        let d = v - pred;
        let incoherence = (u64::from(self.params.lambda) * (d.x * d.x + d.y * d.y) as u64) >> 8;
        let penalty = if is_predictor {
            0
        } else {
            u64::from(self.params.pnew) * u64::from(sad) / 256
        };
        (sad, u64::from(sad) + incoherence + penalty)
    }

    /// Best vector of one block. Predictors are tried first, then an
    /// exhaustive window of `search_param` around each of them; a candidate
    /// must be strictly cheaper to replace the current best.
    fn search(&self, bx: usize, by: usize, predictors: &[IVec2], pred: IVec2) -> (IVec2, u32) {
        let radius = self.params.search_param as i32;
        let mut best: Option<(IVec2, u32, u64)> = None;
        let mut consider = |v: IVec2, is_predictor: bool| {
            let (sad, cost) = self.cost(bx, by, v, pred, is_predictor);
            if best.map_or(true, |(_, _, c)| cost < c) {
                best = Some((v, sad, cost));
            }
        };
        for &p in predictors {
            consider(p, true);
        }
        for &p in predictors {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let v = p + IVec2::new(dx, dy);
                    if !predictors.contains(&v) {
                        consider(v, false);
                    }
                }
            }
        }
        best.map_or((IVec2::ZERO, 0), |(v, sad, _)| (v, sad))
    }
}

fn plane_sad(cur: &Plane, reference: &Plane, x0: usize, y0: usize, bs: usize, v: IVec2) -> u64 {
    let x1 = (x0 + bs).min(cur.width());
    let y1 = (y0 + bs).min(cur.height());
    if x0 >= x1 || y0 >= y1 {
        return 0;
    }
    let mut sum = 0u64;
    for y in y0..y1 {
        let ry = y as isize + v.y as isize;
        let row = cur.row(y);
        for x in x0..x1 {
            let r = reference.get_clamped(x as isize + v.x as isize, ry);
            sum += u64::from(row[x].abs_diff(r));
        }
    }
    let covered = ((x1 - x0) * (y1 - y0)) as u64;
    sum * (bs * bs) as u64 / covered
}

fn assemble(grid: Grid, rows: Vec<Vec<(IVec2, u32)>>) -> BlockVectors {
    let (vectors, sads) = rows.into_iter().flatten().unzip();
    BlockVectors {
        block_size: grid.block_size,
        step: grid.step,
        blocks_x: grid.blocks_x,
        blocks_y: grid.blocks_y,
        vectors,
        sads,
        valid: true,
    }
}

fn search_frame(current: &Frame, reference: &Frame, grid: Grid, params: &SearchParams) -> BlockVectors {
    let matcher = Matcher {
        current,
        reference,
        grid,
        params,
    };
    let rows = (0..grid.blocks_y)
        .into_par_iter()
        .map(|by| {
            let mut left = IVec2::ZERO;
            (0..grid.blocks_x)
                .map(|bx| {
                    let candidates = [IVec2::ZERO, left];
                    let predictors = if left == IVec2::ZERO {
                        &candidates[..1]
                    } else {
                        &candidates[..]
                    };
                    let found = matcher.search(bx, by, predictors, left);
                    left = found.0;
                    found
                })
                .collect()
        })
        .collect();
    assemble(grid, rows)
}

fn refine_frame(
    current: &Frame,
    reference: &Frame,
    grid: Grid,
    params: &SearchParams,
    previous: &BlockVectors,
    thsad: u32,
) -> BlockVectors {
    let matcher = Matcher {
        current,
        reference,
        grid,
        params,
    };
    let (w, h) = current.dimensions();
    let rows = (0..grid.blocks_y)
        .into_par_iter()
        .map(|by| {
            (0..grid.blocks_x)
                .map(|bx| {
                    let (x0, y0) = grid.origin(bx, by);
                    let centre_x = (x0 + grid.block_size / 2).min(w - 1);
                    let centre_y = (y0 + grid.block_size / 2).min(h - 1);
                    let inherited = previous.vector_at(centre_x, centre_y);
                    let sad = matcher.sad(bx, by, inherited);
                    let normalised = u64::from(sad) * 64 / (grid.block_size * grid.block_size) as u64;
                    if normalised > u64::from(thsad) {
                        matcher.search(bx, by, &[inherited], inherited)
                    } else {
                        (inherited, sad)
                    }
                })
                .collect()
        })
        .collect();
    assemble(grid, rows)
}

pub(super) fn estimate(
    search: &Clip,
    direction: Direction,
    delta: usize,
    params: &SearchParams,
) -> VectorClip {
    let src = search.clone();
    let params = *params;
    let len = search.len();
    let grid = Grid::new(search.width(), search.height(), &params);
    let name = format!("estimate_{direction:?}_{delta}").to_lowercase();
    let stream = Stream::new(name, len, move |n| {
        let Some(r) = direction.reference_index(n, delta, len) else {
            return Ok(grid.invalid());
        };
        let current = src.frame(n)?;
        let reference = src.frame(r)?;
        Ok(search_frame(&current, &reference, grid, &params))
    });
    VectorClip::new(direction, delta, stream)
}

pub(super) fn recalculate(
    search: &Clip,
    vectors: &VectorClip,
    params: &SearchParams,
    thsad: u32,
) -> VectorClip {
    let src = search.clone();
    let previous = vectors.clone();
    let params = *params;
    let grid = Grid::new(search.width(), search.height(), &params);
    let stream = Stream::new("recalculate", vectors.len(), move |n| {
        let field = previous.get(n)?;
        let Some(r) = previous.reference(n).filter(|_| field.valid) else {
            return Ok(grid.invalid());
        };
        let current = src.frame(n)?;
        let reference = src.frame(r)?;
        Ok(refine_frame(&current, &reference, grid, &params, &field, thsad))
    });
    VectorClip::new(vectors.direction, vectors.delta, stream)
}

// ============================================================================
// Vector consumers
// ============================================================================

/// Reference frame and vectors of `n`, when the field may be used.
fn usable_reference(
    src: &Clip,
    vectors: &VectorClip,
    n: usize,
    scene_change: SceneChange,
) -> StageResult<Option<(Arc<Frame>, Arc<BlockVectors>)>> {
    let field = vectors.get(n)?;
    match vectors.reference(n) {
        Some(r) if field.is_usable(scene_change) => Ok(Some((src.frame(r)?, field))),
        _ => Ok(None),
    }
}

/// Warp `reference` onto the current frame, block by block.
fn warp(reference: &Frame, field: &BlockVectors) -> Frame {
    let format = reference.format();
    let planes = reference
        .planes()
        .iter()
        .enumerate()
        .map(|(p, plane)| {
            let (ssw, ssh) = format.plane_shift(p);
            Plane::par_from_rows(plane.width(), plane.height(), |y, row| {
                for (x, out) in row.iter_mut().enumerate() {
                    let v = field.vector_at(x << ssw, y << ssh);
                    let sx = x as isize + (v.x >> ssw) as isize;
                    let sy = y as isize + (v.y >> ssh) as isize;
                    *out = plane.get_clamped(sx, sy);
                }
            })
        })
        .collect();
    Frame::from_planes(format, planes)
}

pub(super) fn compensate(clip: &Clip, vectors: &VectorClip, scene_change: SceneChange) -> Clip {
    let src = clip.clone();
    let vectors = vectors.clone();
    let name = format!("compensate_{:?}_{}", vectors.direction, vectors.delta).to_lowercase();
    Clip::new(name, clip.info(), move |n| {
        match usable_reference(&src, &vectors, n, scene_change)? {
            Some((reference, field)) => Ok(warp(&reference, &field)),
            None => Ok(Frame::clone(&*src.frame(n)?)),
        }
    })
}

/// Blend weight of a block in 1/256: full at zero SAD, falling to zero at `thsad`.
pub(super) fn block_weight(normalised_sad: u64, thsad: u32) -> i64 {
    let t = i64::from(thsad);
    let s = normalised_sad as i64;
    if s >= t {
        return 0;
    }
    let (t2, s2) = (t * t, s * s);
    256 * (t2 - s2) / (t2 + s2)
}

pub(super) fn degrain(
    clip: &Clip,
    vectors: &[(VectorClip, VectorClip)],
    thsad: u32,
    scene_change: SceneChange,
) -> Clip {
    let src = clip.clone();
    let fields: Vec<VectorClip> = vectors
        .iter()
        .flat_map(|(bwd, fwd)| [bwd.clone(), fwd.clone()])
        .collect();
    let name = format!("degrain{}", vectors.len());
    Clip::new(name, clip.info(), move |n| {
        let current = src.frame(n)?;
        let mut refs = Vec::with_capacity(fields.len());
        for vc in &fields {
            if let Some((reference, field)) = usable_reference(&src, vc, n, scene_change)? {
                let weights: Vec<i64> = (0..field.len())
                    .map(|b| block_weight(field.normalised_sad(b), thsad))
                    .collect();
                refs.push((reference, field, weights));
            }
        }
        if refs.is_empty() {
            return Ok(Frame::clone(&current));
        }
        let format = current.format();
        let planes = current
            .planes()
            .iter()
            .enumerate()
            .map(|(p, plane)| {
                let (ssw, ssh) = format.plane_shift(p);
                Plane::par_from_rows(plane.width(), plane.height(), |y, row| {
                    for (x, out) in row.iter_mut().enumerate() {
                        let mut sum = 256 * i64::from(*plane.get(x, y));
                        let mut total = 256i64;
                        for (reference, field, weights) in &refs {
                            let block = field.block_at(x << ssw, y << ssh);
                            let w = weights[block];
                            if w == 0 {
                                continue;
                            }
                            let v = field.vectors[block];
                            let sample = reference.plane(p).get_clamped(
                                x as isize + (v.x >> ssw) as isize,
                                y as isize + (v.y >> ssh) as isize,
                            );
                            sum += w * i64::from(sample);
                            total += w;
                        }
                        *out = (sum + total / 2).div_euclid(total) as i32;
                    }
                })
            })
            .collect();
        Ok(Frame::from_planes(format, planes))
    })
}

pub(super) fn flow_blur(
    clip: &Clip,
    backward: &VectorClip,
    forward: &VectorClip,
    blur: f64,
    scene_change: SceneChange,
) -> Clip {
    let src = clip.clone();
    let backward = backward.clone();
    let forward = forward.clone();
    let reach = (blur / 200.0).clamp(0.0, 1.0);
    Clip::new("flow_blur", clip.info(), move |n| {
        let current = src.frame(n)?;
        let usable = |vc: &VectorClip| -> StageResult<Option<Arc<BlockVectors>>> {
            let field = vc.get(n)?;
            Ok(field.is_usable(scene_change).then_some(field))
        };
        let paths: Vec<Arc<BlockVectors>> = [usable(&backward)?, usable(&forward)?]
            .into_iter()
            .flatten()
            .collect();
        if paths.is_empty() || reach == 0.0 {
            return Ok(Frame::clone(&current));
        }
        let format = current.format();
        let planes = current
            .planes()
            .iter()
            .enumerate()
            .map(|(p, plane)| {
                let (ssw, ssh) = format.plane_shift(p);
                Plane::par_from_rows(plane.width(), plane.height(), |y, row| {
                    for (x, out) in row.iter_mut().enumerate() {
                        let mut sum = 0i64;
                        let mut count = 0i64;
                        for field in &paths {
                            let v = field.vector_at(x << ssw, y << ssh);
                            let vx = f64::from(v.x) / f64::from(1u32 << ssw) * reach;
                            let vy = f64::from(v.y) / f64::from(1u32 << ssh) * reach;
                            let steps = vx.abs().max(vy.abs()).ceil().max(1.0) as i64;
                            for i in 0..=steps {
                                let t = i as f64 / steps as f64;
                                let sx = x as isize + cround(vx * t) as isize;
                                let sy = y as isize + cround(vy * t) as isize;
                                sum += i64::from(plane.get_clamped(sx, sy));
                                count += 1;
                            }
                        }
                        *out = (sum + count / 2).div_euclid(count) as i32;
                    }
                })
            })
            .collect();
        Ok(Frame::from_planes(format, planes))
    })
}

pub(super) fn motion_mask(
    clip: &Clip,
    vectors: &VectorClip,
    limit: f64,
    scene_change: SceneChange,
) -> Clip {
    let vectors = vectors.clone();
    let info = clip.info();
    let format = info.format;
    Clip::new("motion_mask", info, move |n| {
        let field = vectors.get(n)?;
        let usable = field.is_usable(scene_change);
        let peak = format.peak();
        let planes = (0..format.num_planes())
            .map(|p| {
                let (w, h) = format.plane_dimensions(p, info.width, info.height);
                let (ssw, ssh) = format.plane_shift(p);
                Plane::par_from_rows(w, h, |y, row| {
                    for (x, out) in row.iter_mut().enumerate() {
                        *out = if !usable {
                            0
                        } else if limit <= 0.0 {
                            peak
                        } else {
                            let length = field.vector_at(x << ssw, y << ssh).as_vec2().length();
                            cround(f64::from(length) * f64::from(peak) / limit).min(peak)
                        };
                    }
                })
            })
            .collect();
        Ok(Frame::from_planes(format, planes))
    })
}
