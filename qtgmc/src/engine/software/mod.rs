//! CPU reference implementations of the engine traits.
//!
//! Interpolation doubles fields with a Mitchell-Netravali cubic or an
//! edge-directed line average. Motion search is full-pel block matching with a
//! coherence penalty; sub-pel precision, the search algorithm selector and the
//! DCT/global-motion knobs of [`SearchParams`](super::SearchParams) are accepted
//! but do not change the result.

mod denoise;
mod interpolate;
mod motion;
mod resample;


use super::{
    DenoiseParams, Denoiser, Direction, Interpolator, Kernel, MotionEngine, Resampler,
    SceneChange, SearchParams, VectorClip,
};
use crate::config::{DenoiserKind, EdiParams, InterpolatorKind};
use crate::frame::FieldOrder;
use crate::stream::Clip;

#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareEngine;

impl Interpolator for SoftwareEngine {
    fn interpolate(
        &self,
        clip: &Clip,
        order: FieldOrder,
        kind: InterpolatorKind,
        params: &EdiParams,
    ) -> Clip {
        interpolate::interpolate(clip, order, kind, params)
    }

    fn bob(&self, clip: &Clip, order: FieldOrder, b: f64, c: f64) -> Clip {
        interpolate::bob(clip, order, b, c)
    }
}

impl MotionEngine for SoftwareEngine {
    fn estimate(
        &self,
        search: &Clip,
        direction: Direction,
        delta: usize,
        params: &SearchParams,
    ) -> VectorClip {
        motion::estimate(search, direction, delta, params)
    }

    fn recalculate(
        &self,
        search: &Clip,
        vectors: &VectorClip,
        params: &SearchParams,
        thsad: u32,
    ) -> VectorClip {
        motion::recalculate(search, vectors, params, thsad)
    }

    fn compensate(&self, clip: &Clip, vectors: &VectorClip, scene_change: SceneChange) -> Clip {
        motion::compensate(clip, vectors, scene_change)
    }

    fn degrain(
        &self,
        clip: &Clip,
        vectors: &[(VectorClip, VectorClip)],
        thsad: u32,
        scene_change: SceneChange,
    ) -> Clip {
        motion::degrain(clip, vectors, thsad, scene_change)
    }

    fn flow_blur(
        &self,
        clip: &Clip,
        backward: &VectorClip,
        forward: &VectorClip,
        blur: f64,
        scene_change: SceneChange,
    ) -> Clip {
        motion::flow_blur(clip, backward, forward, blur, scene_change)
    }

    fn motion_mask(
        &self,
        clip: &Clip,
        vectors: &VectorClip,
        limit: f64,
        scene_change: SceneChange,
    ) -> Clip {
        motion::motion_mask(clip, vectors, limit, scene_change)
    }
}

impl Denoiser for SoftwareEngine {
    fn denoise(&self, window: &[Clip], kind: DenoiserKind, params: &DenoiseParams) -> Clip {
        denoise::denoise(window, kind, params)
    }
}

impl Resampler for SoftwareEngine {
    fn resample(&self, clip: &Clip, width: usize, height: usize, kernel: Kernel) -> Clip {
        resample::resample(clip, width, height, kernel)
    }
}
