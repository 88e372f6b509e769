//! Pluggable back ends for the heavy algorithms: field interpolation, block
//! motion estimation and compensation, spatio-temporal denoising and resampling.
//!
//! The pipeline only talks to these traits. [`EngineContext::software`] wires up
//! the built-in CPU implementations from [`software`].

pub mod software;
mod vectors;

use std::sync::Arc;

use tracing::info;

pub use software::SoftwareEngine;
pub use vectors::{BlockVectors, Direction, VectorClip};

use crate::config::{
    Configuration, DenoiserKind, EdiParams, InterpolatorKind, MotionConfig, OutputConfig,
};
use crate::frame::{FieldOrder, Planes};
use crate::stream::Clip;

// ============================================================================
// Parameters
// ============================================================================

/// Block search settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub block_size: usize,
    pub overlap: usize,
    /// Search algorithm selector of the native engine.
    pub search: u8,
    /// Search radius in pixels.
    pub search_param: usize,
    pub pel_search: usize,
    pub sub_pel: u8,
    /// Weight of vector incoherence against the predictor.
    pub lambda: u32,
    pub lsad: u32,
    /// Penalty for a vector that is not one of the predictors, in 1/256 of its SAD.
    pub pnew: u32,
    pub plevel: u32,
    pub global: bool,
    pub true_motion: bool,
    pub dct: u8,
    /// Include chroma in the SAD.
    pub chroma: bool,
}

impl SearchParams {
    pub fn from_config(motion: &MotionConfig) -> Self {
        Self {
            block_size: motion.block_size as usize,
            overlap: motion.overlap as usize,
            search: motion.search,
            search_param: motion.search_param as usize,
            pel_search: motion.pel_search as usize,
            sub_pel: motion.sub_pel,
            lambda: motion.lambda,
            lsad: motion.lsad,
            pnew: motion.pnew,
            plevel: motion.plevel,
            global: motion.global,
            true_motion: motion.true_motion,
            dct: motion.dct,
            chroma: motion.chroma,
        }
    }

    /// Finer grid used to refine vectors for shutter blur.
    pub fn recalculation(motion: &MotionConfig, output: &OutputConfig) -> Self {
        Self {
            block_size: output.recalc_block_size as usize,
            overlap: output.recalc_overlap as usize,
            lambda: output.recalc_lambda,
            ..Self::from_config(motion)
        }
    }
}

/// Scene-change detection thresholds. A frame pair is a cut when more than
/// `thscd2 / 256` of its blocks have a SAD above `thscd1` (per 8x8 block, 8-bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneChange {
    pub thscd1: u32,
    pub thscd2: u32,
}

impl SceneChange {
    pub fn from_config(motion: &MotionConfig) -> Self {
        Self {
            thscd1: motion.thscd1,
            thscd2: motion.thscd2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenoiseParams {
    /// Noise standard deviation in 8-bit units.
    pub sigma: f64,
    pub temporal_radius: usize,
    pub planes: Planes,
}

/// Resampling kernels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Point,
    Bilinear,
    Bicubic { b: f64, c: f64 },
    /// Gaussian of sharpness `p`, `1..=100`.
    Gauss { p: f64 },
}

// ============================================================================
// Traits
// ============================================================================

/// Doubles each field of an interlaced clip to a full-height frame.
pub trait Interpolator: Send + Sync {
    /// `2N` full-height frames from `N` interlaced frames. Frame `j` keeps the
    /// rows of field `j` and fills the other parity.
    fn interpolate(
        &self,
        clip: &Clip,
        order: FieldOrder,
        kind: InterpolatorKind,
        params: &EdiParams,
    ) -> Clip;

    /// Bicubic field doubling with the given `b`, `c` coefficients.
    fn bob(&self, clip: &Clip, order: FieldOrder, b: f64, c: f64) -> Clip;
}

/// Block motion estimation and the operations driven by its vectors.
pub trait MotionEngine: Send + Sync {
    fn estimate(
        &self,
        search: &Clip,
        direction: Direction,
        delta: usize,
        params: &SearchParams,
    ) -> VectorClip;

    /// Refine `vectors` on a new block grid, searching again where the inherited
    /// vector's SAD exceeds `thsad`.
    fn recalculate(
        &self,
        search: &Clip,
        vectors: &VectorClip,
        params: &SearchParams,
        thsad: u32,
    ) -> VectorClip;

    /// Reference frames warped onto the current frame. Falls back to the current
    /// frame across scene changes and at clip ends.
    fn compensate(&self, clip: &Clip, vectors: &VectorClip, scene_change: SceneChange) -> Clip;

    /// SAD-weighted average of the current frame and its compensated neighbours.
    /// `vectors` holds one (backward, forward) pair per temporal distance.
    fn degrain(
        &self,
        clip: &Clip,
        vectors: &[(VectorClip, VectorClip)],
        thsad: u32,
        scene_change: SceneChange,
    ) -> Clip;

    /// Blur along the motion path; `blur` is the shutter time in percent of the
    /// frame interval.
    fn flow_blur(
        &self,
        clip: &Clip,
        backward: &VectorClip,
        forward: &VectorClip,
        blur: f64,
        scene_change: SceneChange,
    ) -> Clip;

    /// Motion-length mask in the format of `clip`; full strength at `limit` pixels.
    fn motion_mask(
        &self,
        clip: &Clip,
        vectors: &VectorClip,
        limit: f64,
        scene_change: SceneChange,
    ) -> Clip;
}

pub trait Denoiser: Send + Sync {
    /// Denoise the centre of a temporal window. `window` holds `2r + 1` clips in
    /// temporal order whose frame `n` are aligned to frame `n` of the centre clip;
    /// a single clip is windowed over its own neighbours.
    fn denoise(&self, window: &[Clip], kind: DenoiserKind, params: &DenoiseParams) -> Clip;
}

pub trait Resampler: Send + Sync {
    fn resample(&self, clip: &Clip, width: usize, height: usize, kernel: Kernel) -> Clip;
}

/// Receives a copy of the resolved configuration when a pipeline is built.
pub trait DiagnosticsSink: Send + Sync {
    fn configuration_resolved(&self, config: &Configuration);
}

/// Logs the resolved configuration as YAML at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn configuration_resolved(&self, config: &Configuration) {
        match common::serialize(config, common::SerdeFormat::Yaml) {
            Ok(yaml) => info!(preset = %config.preset, "resolved configuration:\n{yaml}"),
            Err(err) => tracing::warn!("failed to serialize configuration: {err}"),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// The set of back ends a pipeline is built with.
#[derive(Clone)]
pub struct EngineContext {
    pub interpolator: Arc<dyn Interpolator>,
    pub motion: Arc<dyn MotionEngine>,
    pub denoiser: Arc<dyn Denoiser>,
    pub resampler: Arc<dyn Resampler>,
    pub diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("diagnostics", &self.diagnostics.is_some())
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    /// CPU implementations of every back end.
    pub fn software() -> Self {
        let engine = Arc::new(SoftwareEngine::default());
        Self {
            interpolator: engine.clone(),
            motion: engine.clone(),
            denoiser: engine.clone(),
            resampler: engine,
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::software()
    }
}
