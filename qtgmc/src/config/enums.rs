//! String-selectable configuration choices.
//!
//! Every enum parses case-insensitively from the names used in preset documents
//! and prints back its canonical name.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{ConfigError, ConfigResult};

/// Quality presets, slowest first. The derived ordering follows speed: a
/// preset that compares less than another is slower and of higher quality.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Preset {
    #[strum(serialize = "placebo")]
    #[serde(rename = "placebo")]
    Placebo,
    #[strum(to_string = "very slow", serialize = "very-slow", serialize = "veryslow")]
    #[serde(rename = "very slow")]
    VerySlow,
    #[default]
    #[strum(serialize = "slower")]
    #[serde(rename = "slower")]
    Slower,
    #[strum(serialize = "slow")]
    #[serde(rename = "slow")]
    Slow,
    #[strum(serialize = "medium")]
    #[serde(rename = "medium")]
    Medium,
    #[strum(serialize = "fast")]
    #[serde(rename = "fast")]
    Fast,
    #[strum(serialize = "faster")]
    #[serde(rename = "faster")]
    Faster,
    #[strum(to_string = "very fast", serialize = "very-fast", serialize = "veryfast")]
    #[serde(rename = "very fast")]
    VeryFast,
    #[strum(to_string = "super fast", serialize = "super-fast", serialize = "superfast")]
    #[serde(rename = "super fast")]
    SuperFast,
    #[strum(to_string = "ultra fast", serialize = "ultra-fast", serialize = "ultrafast")]
    #[serde(rename = "ultra fast")]
    UltraFast,
    #[strum(serialize = "draft")]
    #[serde(rename = "draft")]
    Draft,
}

impl Preset {
    pub const COUNT: usize = 11;

    /// Position in the table columns, `0` for placebo.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Preset at `index`, saturating at draft.
    pub fn from_index(index: usize) -> Self {
        Self::iter()
            .nth(index.min(Self::COUNT - 1))
            .unwrap_or(Self::Draft)
    }
}

/// Presets of the denoising stage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum NoisePreset {
    Slower,
    Slow,
    Medium,
    #[default]
    Fast,
    Faster,
}

impl NoisePreset {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Source tuning. Only the default block size depends on it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum Tuning {
    #[default]
    None,
    DvSd,
    DvHd,
}

/// Spatial interpolator used to double each field to full height.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum InterpolatorKind {
    #[default]
    #[strum(serialize = "nnedi3")]
    #[serde(rename = "nnedi3")]
    Nnedi3,
    #[strum(serialize = "eedi3")]
    #[serde(rename = "eedi3")]
    Eedi3,
    #[strum(serialize = "eedi3+nnedi3")]
    #[serde(rename = "eedi3+nnedi3")]
    Eedi3Nnedi3,
    /// Cubic bob; the empty name selects it too.
    #[strum(to_string = "bob", serialize = "")]
    #[serde(rename = "bob", alias = "")]
    Bob,
}

/// Separate interpolation of the chroma planes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum ChromaEdi {
    /// Chroma follows the luma interpolator.
    #[default]
    #[strum(to_string = "none", serialize = "")]
    #[serde(rename = "none", alias = "")]
    SameAsLuma,
    #[strum(serialize = "nnedi3")]
    #[serde(rename = "nnedi3")]
    Nnedi3,
    #[strum(serialize = "bob")]
    #[serde(rename = "bob")]
    Bob,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum DenoiserKind {
    #[default]
    #[strum(serialize = "dfttest")]
    #[serde(rename = "dfttest")]
    Dfttest,
    #[strum(to_string = "fft3df", serialize = "fft3dfilter")]
    #[serde(rename = "fft3df", alias = "fft3dfilter")]
    Fft3df,
    #[strum(to_string = "knlmeanscl", serialize = "knlmeans")]
    #[serde(rename = "knlmeanscl", alias = "knlmeans")]
    KnlMeans,
}

impl DenoiserKind {
    /// The FFT denoiser leaves its extracted noise centred half a step above
    /// neutral; restoration subtracts this centre.
    pub fn noise_centre(self, bits: u8) -> f64 {
        let neutral = (1u32 << (bits - 1)) as f64;
        match self {
            Self::Fft3df => 128.5 * f64::from(1u32 << (bits - 8)),
            Self::Dfttest | Self::KnlMeans => neutral,
        }
    }
}

/// How the missing field lines of extracted noise are filled in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum NoiseDeint {
    /// Weave each noise field with its temporal neighbour; the empty name selects it too.
    #[default]
    #[strum(to_string = "double-weave", serialize = "")]
    #[serde(rename = "double-weave", alias = "")]
    DoubleWeave,
    #[strum(serialize = "bob")]
    #[serde(rename = "bob")]
    Bob,
    #[strum(serialize = "generate")]
    #[serde(rename = "generate")]
    Generate,
}

/// Parse a configuration enum, reporting the field and the accepted names on failure.
pub(crate) fn parse_enum<T>(field: &'static str, value: &str) -> ConfigResult<T>
where
    T: FromStr + IntoEnumIterator + Display,
{
    T::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnum {
        field,
        value: value.to_string(),
        expected: T::iter()
            .map(|v| format!("'{v}'"))
            .collect::<Vec<_>>()
            .join(", "),
    })
}
