//! Motion vectors of the search clip for every temporal distance a pipeline
//! needs, and the compensated smoothing built on them.


use std::sync::Arc;

use tracing::debug;

use crate::engine::{Direction, MotionEngine, SceneChange, SearchParams, VectorClip};
use crate::frame::Planes;
use crate::ops::ClipOps;
use crate::stream::Clip;

/// Vector clips for deltas `1..=radius` in both directions.
///
/// Built once per pipeline and shared read-only by every stage. Vectors are
/// computed lazily per frame the first time a stage asks for them.
#[derive(Clone)]
pub struct MotionField {
    backward: Vec<VectorClip>,
    forward: Vec<VectorClip>,
    scene_change: SceneChange,
    /// Planes the smoothing stages process; the rest are copied from the input.
    planes: Planes,
    engine: Arc<dyn MotionEngine>,
}

impl std::fmt::Debug for MotionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionField")
            .field("radius", &self.radius())
            .field("scene_change", &self.scene_change)
            .field("planes", &self.planes)
            .finish_non_exhaustive()
    }
}

impl MotionField {
    pub fn analyse(
        engine: Arc<dyn MotionEngine>,
        search: &Clip,
        radius: usize,
        params: &SearchParams,
        scene_change: SceneChange,
        planes: Planes,
    ) -> Self {
        debug!(
            radius,
            block_size = params.block_size,
            overlap = params.overlap,
            "building motion field"
        );
        let build = |direction| {
            (1..=radius)
                .map(|delta| engine.estimate(search, direction, delta, params))
                .collect::<Vec<_>>()
        };
        let backward = build(Direction::Backward);
        let forward = build(Direction::Forward);
        Self {
            backward,
            forward,
            scene_change,
            planes,
            engine,
        }
    }

    pub fn radius(&self) -> usize {
        self.backward.len()
    }

    pub fn scene_change(&self) -> SceneChange {
        self.scene_change
    }

    pub fn engine(&self) -> &Arc<dyn MotionEngine> {
        &self.engine
    }

    pub fn vectors(&self, direction: Direction, delta: usize) -> &VectorClip {
        assert!(
            (1..=self.radius()).contains(&delta),
            "delta {delta} outside motion field radius {}",
            self.radius()
        );
        match direction {
            Direction::Backward => &self.backward[delta - 1],
            Direction::Forward => &self.forward[delta - 1],
        }
    }

    /// `clip` warped from the frame `delta` away in `direction`.
    pub fn compensate(&self, clip: &Clip, direction: Direction, delta: usize) -> Clip {
        let vectors = self.vectors(direction, delta);
        self.engine.compensate(clip, vectors, self.scene_change)
    }

    /// SAD-weighted compensated average over `radius` frames each side.
    pub fn degrain(&self, clip: &Clip, radius: usize, thsad: u32) -> Clip {
        if radius == 0 {
            return clip.clone();
        }
        let pairs: Vec<(VectorClip, VectorClip)> = (1..=radius).map(|d| self.pair(d)).collect();
        let degrained = self
            .engine
            .degrain(clip, &pairs, thsad, self.scene_change);
        self.keep_unprocessed_planes(degrained, clip)
    }

    /// Like [`MotionField::degrain`] but with only the two frames `delta` away.
    pub fn degrain_at(&self, clip: &Clip, delta: usize, thsad: u32) -> Clip {
        let degrained = self
            .engine
            .degrain(clip, &[self.pair(delta)], thsad, self.scene_change);
        self.keep_unprocessed_planes(degrained, clip)
    }

    /// Binomially weighted compensated smooth: `(1, 2, 1)` at radius 1 and
    /// `(1, 4, 6, 4, 1)` at radius 2, built from degrains at distance one and
    /// two merged back over `clip`.
    pub fn binomial_smooth(&self, clip: &Clip, radius: usize, thsad: u32) -> Clip {
        match radius {
            0 => clip.clone(),
            1 => self.degrain_at(clip, 1, thsad).merge(clip, 0.25, self.planes),
            _ => {
                let near = self.degrain_at(clip, 1, thsad);
                let far = self.degrain_at(clip, 2, thsad);
                near.merge(&far, 0.2, self.planes)
                    .merge(clip, 0.0625, self.planes)
            }
        }
    }

    fn pair(&self, delta: usize) -> (VectorClip, VectorClip) {
        (
            self.vectors(Direction::Backward, delta).clone(),
            self.vectors(Direction::Forward, delta).clone(),
        )
    }

    fn keep_unprocessed_planes(&self, processed: Clip, original: &Clip) -> Clip {
        if self.planes == Planes::Luma && !original.format().is_gray() {
            processed.shuffle_chroma(original)
        } else {
            processed
        }
    }
}
