//! Lazily evaluated, frame-indexed streams.
//!
//! A [`Stream`] is one node of the processing graph: a pure function from frame
//! index to value over its upstream nodes, memoized per index. Nodes are built
//! from existing nodes only, so the graph is acyclic by construction. Nothing is
//! computed until a frame is requested.

#[cfg(test)]
mod tests;

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::error::{StageError, StageErrorKind, StageResult};
use crate::frame::{Format, Frame};

/// Frames kept per node before the farthest entry is evicted.
pub const DEFAULT_CACHE_CAPACITY: usize = 24;

type EvalFn<T> = dyn Fn(usize) -> StageResult<T> + Send + Sync;

enum Source<T> {
    Stored(Vec<Arc<T>>),
    Computed(Box<EvalFn<T>>),
}

struct Node<T> {
    name: String,
    len: usize,
    source: Source<T>,
    cache: Mutex<HashMap<usize, Arc<T>>>,
    capacity: usize,
    evaluations: AtomicUsize,
}

// ============================================================================
// Stream
// ============================================================================

pub struct Stream<T> {
    node: Arc<Node<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("name", &self.node.name)
            .field("len", &self.node.len)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Stream<T> {
    pub fn new<F>(name: impl Into<String>, len: usize, eval: F) -> Self
    where
        F: Fn(usize) -> StageResult<T> + Send + Sync + 'static,
    {
        Self::with_capacity(name, len, DEFAULT_CACHE_CAPACITY, eval)
    }

    pub fn with_capacity<F>(name: impl Into<String>, len: usize, capacity: usize, eval: F) -> Self
    where
        F: Fn(usize) -> StageResult<T> + Send + Sync + 'static,
    {
        assert!(capacity > 0, "cache capacity must be positive");
        Self {
            node: Arc::new(Node {
                name: name.into(),
                len,
                source: Source::Computed(Box::new(eval)),
                cache: Mutex::new(HashMap::new()),
                capacity,
                evaluations: AtomicUsize::new(0),
            }),
        }
    }

    /// A stream over already materialized values.
    pub fn from_vec(name: impl Into<String>, items: Vec<T>) -> Self {
        let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        Self {
            node: Arc::new(Node {
                name: name.into(),
                len: items.len(),
                source: Source::Stored(items),
                cache: Mutex::new(HashMap::new()),
                capacity: DEFAULT_CACHE_CAPACITY,
                evaluations: AtomicUsize::new(0),
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.node.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.node.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.node.len == 0
    }

    /// Number of times the node function actually ran.
    pub fn evaluations(&self) -> usize {
        self.node.evaluations.load(Ordering::Relaxed)
    }

    pub fn get(&self, n: usize) -> StageResult<Arc<T>> {
        let node = &self.node;
        if n >= node.len {
            return Err(StageError::new(
                node.name.clone(),
                n,
                StageErrorKind::FrameOutOfRange { len: node.len },
            ));
        }

        let eval = match &node.source {
            Source::Stored(items) => return Ok(Arc::clone(&items[n])),
            Source::Computed(eval) => eval,
        };

        if let Some(hit) = node.cache.lock().get(&n) {
            return Ok(Arc::clone(hit));
        }

        // The lock is not held while evaluating: upstream nodes are pulled from here.
        node.evaluations.fetch_add(1, Ordering::Relaxed);
        let value = Arc::new(eval(n)?);

        let mut cache = node.cache.lock();
        if cache.len() >= node.capacity {
            let farthest = cache.keys().copied().max_by_key(|&k| k.abs_diff(n));
            if let Some(key) = farthest {
                cache.remove(&key);
            }
        }
        Ok(Arc::clone(cache.entry(n).or_insert(value)))
    }

    /// Fetch with the index clamped to the first/last item.
    pub fn get_clamped(&self, n: isize) -> StageResult<Arc<T>> {
        let last = self.len().saturating_sub(1) as isize;
        self.get(n.clamp(0, last) as usize)
    }
}

// ============================================================================
// Clip
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInfo {
    pub format: Format,
    pub width: usize,
    pub height: usize,
    pub num_frames: usize,
}

impl ClipInfo {
    pub fn with_frames(self, num_frames: usize) -> Self {
        Self { num_frames, ..self }
    }

    pub fn with_dimensions(self, width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }
}

/// A frame stream with known, constant format and dimensions.
#[derive(Clone)]
pub struct Clip {
    info: ClipInfo,
    frames: Stream<Frame>,
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("name", &self.name())
            .field("info", &self.info)
            .finish()
    }
}

impl Clip {
    pub fn new<F>(name: impl Into<String>, info: ClipInfo, eval: F) -> Self
    where
        F: Fn(usize) -> StageResult<Frame> + Send + Sync + 'static,
    {
        Self {
            info,
            frames: Stream::new(name, info.num_frames, eval),
        }
    }

    pub fn from_frames(name: impl Into<String>, frames: Vec<Frame>) -> Self {
        assert!(!frames.is_empty(), "clip needs at least one frame");
        let first = &frames[0];
        for frame in &frames[1..] {
            assert!(
                first.check_compatible(frame).is_ok(),
                "all frames of a clip must share format and dimensions"
            );
        }
        let info = ClipInfo {
            format: first.format(),
            width: first.width(),
            height: first.height(),
            num_frames: frames.len(),
        };
        Self {
            info,
            frames: Stream::from_vec(name, frames),
        }
    }

    #[inline]
    pub fn info(&self) -> ClipInfo {
        self.info
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.info.format
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.info.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.info.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.info.num_frames
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.info.num_frames == 0
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.frames.name()
    }

    #[inline]
    pub fn stream(&self) -> &Stream<Frame> {
        &self.frames
    }

    pub fn frame(&self, n: usize) -> StageResult<Arc<Frame>> {
        self.frames.get(n)
    }

    pub fn frame_clamped(&self, n: isize) -> StageResult<Arc<Frame>> {
        self.frames.get_clamped(n)
    }

    /// Per-frame transform keeping format and dimensions.
    pub fn map<F>(&self, name: impl Into<String>, f: F) -> Clip
    where
        F: Fn(&Frame) -> Frame + Send + Sync + 'static,
    {
        let src = self.clone();
        Clip::new(name, self.info, move |n| Ok(f(&*src.frame(n)?)))
    }

    /// Combine same-index frames of `self` and `other`.
    pub fn zip<F>(&self, name: impl Into<String>, other: &Clip, f: F) -> Clip
    where
        F: Fn(&Frame, &Frame) -> Frame + Send + Sync + 'static,
    {
        Clip::zip_all(name, &[self.clone(), other.clone()], move |frames| {
            f(&frames[0], &frames[1])
        })
    }

    pub fn zip3<F>(&self, name: impl Into<String>, b: &Clip, c: &Clip, f: F) -> Clip
    where
        F: Fn(&Frame, &Frame, &Frame) -> Frame + Send + Sync + 'static,
    {
        Clip::zip_all(name, &[self.clone(), b.clone(), c.clone()], move |frames| {
            f(&frames[0], &frames[1], &frames[2])
        })
    }

    /// Combine same-index frames of several clips. Every input frame must match the
    /// first input's format and dimensions, otherwise the frame fails with a
    /// [`StageError`] naming this stage.
    pub fn zip_all<F>(name: impl Into<String>, clips: &[Clip], f: F) -> Clip
    where
        F: Fn(&[Arc<Frame>]) -> Frame + Send + Sync + 'static,
    {
        assert!(!clips.is_empty(), "zip_all needs at least one input");
        let name = name.into();
        let stage = name.clone();
        let inputs = clips.to_vec();
        Clip::new(name, clips[0].info, move |n| {
            let frames = inputs
                .iter()
                .map(|clip| clip.frame(n))
                .collect::<StageResult<Vec<_>>>()?;
            for frame in &frames[1..] {
                frames[0]
                    .check_compatible(frame)
                    .map_err(|kind| StageError::new(stage.clone(), n, kind))?;
            }
            Ok(f(&frames))
        })
    }

    /// Evaluate a range of frames in parallel. Each index succeeds or fails on its own.
    pub fn render(&self, range: Range<usize>) -> Vec<StageResult<Arc<Frame>>> {
        range
            .into_par_iter()
            .map(|n| self.frame(n))
            .collect()
    }
}
