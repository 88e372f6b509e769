//! Block motion vectors.

use std::sync::Arc;

use glam::IVec2;

use super::SceneChange;
use crate::error::StageResult;
use crate::stream::Stream;

/// Which neighbour a vector field points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Vectors into frame `n + delta`.
    Backward,
    /// Vectors into frame `n - delta`.
    Forward,
}

impl Direction {
    /// Reference frame of `n`, or `None` past either end of a clip of `len` frames.
    pub fn reference_index(self, n: usize, delta: usize, len: usize) -> Option<usize> {
        match self {
            Self::Backward => Some(n + delta).filter(|&r| r < len),
            Self::Forward => n.checked_sub(delta),
        }
    }
}

/// Vectors of one frame on a regular block grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockVectors {
    pub block_size: usize,
    /// Distance between block origins, `block_size - overlap`.
    pub step: usize,
    pub blocks_x: usize,
    pub blocks_y: usize,
    /// Full-pel luma vectors in row-major block order.
    pub vectors: Vec<IVec2>,
    /// SAD of each block at its vector, normalised to 8-bit samples. Includes
    /// chroma when the search did.
    pub sads: Vec<u32>,
    /// False when the reference frame lies outside the clip.
    pub valid: bool,
}

impl BlockVectors {
    /// An invalid field: every consumer falls back to the current frame.
    pub fn invalid(block_size: usize, step: usize, blocks_x: usize, blocks_y: usize) -> Self {
        let count = blocks_x * blocks_y;
        Self {
            block_size,
            step,
            blocks_x,
            blocks_y,
            vectors: vec![IVec2::ZERO; count],
            sads: vec![0; count],
            valid: false,
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Index of the block whose origin is nearest above-left of luma pixel `(x, y)`.
    #[inline]
    pub fn block_at(&self, x: usize, y: usize) -> usize {
        let bx = (x / self.step).min(self.blocks_x - 1);
        let by = (y / self.step).min(self.blocks_y - 1);
        by * self.blocks_x + bx
    }

    #[inline]
    pub fn vector_at(&self, x: usize, y: usize) -> IVec2 {
        self.vectors[self.block_at(x, y)]
    }

    /// SAD of a block scaled to an 8x8 block.
    #[inline]
    pub fn normalised_sad(&self, block: usize) -> u64 {
        u64::from(self.sads[block]) * 64 / (self.block_size * self.block_size) as u64
    }

    pub fn is_scene_change(&self, scene_change: SceneChange) -> bool {
        if self.is_empty() {
            return false;
        }
        let threshold = u64::from(scene_change.thscd1);
        let changed = (0..self.len())
            .filter(|&b| self.normalised_sad(b) > threshold)
            .count() as u64;
        changed * 256 > u64::from(scene_change.thscd2) * self.len() as u64
    }

    /// Usable for compensation: valid and not across a cut.
    pub fn is_usable(&self, scene_change: SceneChange) -> bool {
        self.valid && !self.is_scene_change(scene_change)
    }
}

/// Lazily computed vectors for every frame of a clip.
#[derive(Debug, Clone)]
pub struct VectorClip {
    pub direction: Direction,
    pub delta: usize,
    pub stream: Stream<BlockVectors>,
}

impl VectorClip {
    pub fn new(direction: Direction, delta: usize, stream: Stream<BlockVectors>) -> Self {
        Self {
            direction,
            delta,
            stream,
        }
    }

    pub fn get(&self, n: usize) -> StageResult<Arc<BlockVectors>> {
        self.stream.get(n)
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    /// Reference frame of `n`, if inside the clip.
    pub fn reference(&self, n: usize) -> Option<usize> {
        self.direction.reference_index(n, self.delta, self.len())
    }
}
