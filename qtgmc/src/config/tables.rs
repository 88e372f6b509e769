//! Per-preset default tables. Columns run from placebo to draft.

use super::enums::{DenoiserKind, InterpolatorKind, NoiseDeint, NoisePreset, Preset, Tuning};

type Row<T> = [T; Preset::COUNT];

pub(crate) const TR0: Row<u8> = [2, 2, 2, 2, 2, 2, 1, 1, 1, 1, 0];
pub(crate) const TR1: Row<u8> = [2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1];
pub(crate) const TR2: Row<u8> = [3, 2, 1, 1, 1, 0, 0, 0, 0, 0, 0];
pub(crate) const REP0: Row<u8> = [4, 4, 4, 4, 3, 3, 0, 0, 0, 0, 0];
pub(crate) const REP2: Row<u8> = [4, 4, 4, 4, 4, 4, 4, 4, 3, 3, 0];
pub(crate) const NN_SIZE: Row<u8> = [1, 1, 1, 1, 5, 5, 4, 4, 4, 4, 4];
pub(crate) const NN_NEURONS: Row<u8> = [2, 2, 1, 1, 1, 0, 0, 0, 0, 0, 0];
pub(crate) const EDI_MAX_D: Row<u8> = [12, 10, 8, 7, 7, 6, 6, 5, 4, 4, 4];
pub(crate) const SHARPEN_MODE: Row<u8> = [2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 0];
pub(crate) const SHARP_LIMIT_MODE: Row<u8> = [2, 2, 2, 2, 2, 2, 2, 2, 0, 0, 0];
pub(crate) const SHARP_LIMIT_RADIUS: Row<u8> = [3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];
pub(crate) const BACK_BLEND: Row<u8> = [3, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0];
pub(crate) const SEARCH_PREFILTER: Row<u8> = [3, 3, 3, 3, 3, 2, 2, 2, 1, 1, 0];
pub(crate) const SUB_PEL: Row<u8> = [2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1];
pub(crate) const SEARCH: Row<u8> = [5, 4, 4, 4, 4, 4, 4, 4, 0, 0, 0];
pub(crate) const SEARCH_PARAM: Row<u8> = [2, 2, 2, 2, 2, 2, 2, 1, 1, 1, 1];
pub(crate) const PEL_SEARCH: Row<u8> = [2, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1];
pub(crate) const CHROMA_MOTION: Row<bool> = [
    true, true, true, false, false, false, false, false, false, false, false,
];
pub(crate) const PRECISE: Row<bool> = [
    true, true, false, false, false, false, false, false, false, false, false,
];

pub(crate) fn edi_mode(preset: Preset) -> InterpolatorKind {
    if preset == Preset::Draft {
        InterpolatorKind::Bob
    } else {
        InterpolatorKind::Nnedi3
    }
}

/// Default block size: the tuning's size up to fast, twice that (capped at 32)
/// from faster on.
pub(crate) fn block_size(preset: Preset, tuning: Tuning) -> u32 {
    let base = match tuning {
        Tuning::None | Tuning::DvSd => 16,
        Tuning::DvHd => 32,
    };
    if preset <= Preset::Fast {
        base
    } else if base >= 16 {
        32
    } else {
        base * 2
    }
}

/// Default overlap: half the block size up to faster, a quarter from very fast on.
pub(crate) fn overlap(preset: Preset, block_size: u32) -> u32 {
    if preset <= Preset::Faster {
        block_size / 2
    } else {
        block_size / 4
    }
}

/// Interpolator parameters of the source-match presets, which stop at ultra fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EdiColumn {
    pub nn_size: u8,
    pub nn_neurons: u8,
    pub max_d: u8,
}

pub(crate) fn edi_column(preset: Preset) -> EdiColumn {
    let i = preset.index().min(Preset::UltraFast.index());
    EdiColumn {
        nn_size: NN_SIZE[i],
        nn_neurons: NN_NEURONS[i],
        max_d: EDI_MAX_D[i],
    }
}

/// Refinement interpolator: nnedi3 everywhere except the fastest match preset,
/// which falls back to a bob.
pub(crate) fn match_edi2(preset: Preset) -> InterpolatorKind {
    if preset >= Preset::UltraFast {
        InterpolatorKind::Bob
    } else {
        InterpolatorKind::Nnedi3
    }
}

/// Defaults of one noise preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NoiseColumn {
    pub denoiser: DenoiserKind,
    pub motion_compensated: bool,
    pub temporal_radius: u8,
    pub deint: NoiseDeint,
    pub stabilize: bool,
}

pub(crate) fn noise_column(preset: NoisePreset) -> NoiseColumn {
    use DenoiserKind::{Dfttest, Fft3df};
    let (denoiser, motion_compensated, temporal_radius, deint, stabilize) = match preset {
        NoisePreset::Slower => (Dfttest, true, 2, NoiseDeint::Generate, true),
        NoisePreset::Slow => (Dfttest, true, 1, NoiseDeint::Bob, true),
        NoisePreset::Medium => (Dfttest, false, 1, NoiseDeint::DoubleWeave, true),
        NoisePreset::Fast => (Fft3df, false, 1, NoiseDeint::DoubleWeave, false),
        NoisePreset::Faster => (Fft3df, false, 0, NoiseDeint::DoubleWeave, false),
    };
    NoiseColumn {
        denoiser,
        motion_compensated,
        temporal_radius,
        deint,
        stabilize,
    }
}
