//! Error types for configuration resolution and per-frame stage evaluation.

use thiserror::Error;

use crate::config::Preset;
use crate::frame::Format;

/// Errors detected while resolving a preset and overrides into a [`Configuration`].
///
/// All of these are raised before any frame is requested.
///
/// [`Configuration`]: crate::config::Configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for '{field}': expected one of {expected}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("'{field}' preset '{preset}' cannot be slower than the main preset '{main}'")]
    InvalidPresetOrdering {
        field: &'static str,
        preset: Preset,
        main: Preset,
    },

    #[error("'ez_denoise' and 'ez_keep_grain' cannot be used together")]
    ConflictingShortcuts,

    #[error("'{field}' = {value} is out of range: {constraint}")]
    OutOfRange {
        field: &'static str,
        value: String,
        constraint: &'static str,
    },

    #[error("'{field}' is incompatible with the rest of the configuration: {reason}")]
    Incompatible {
        field: &'static str,
        reason: &'static str,
    },

    #[error(
        "Cannot reduce motion blur already in source (blur level {blur_level}): increase 'shutter_angle_out' or 'fps_divisor'"
    )]
    NegativeMotionBlur { blur_level: f64 },

    #[error(
        "Exceeded maximum motion blur level ({blur_level} > {max}): decrease 'shutter_angle_out' or 'fps_divisor'"
    )]
    ExcessiveMotionBlur { blur_level: f64, max: f64 },
}

impl ConfigError {
    pub(crate) fn out_of_range(
        field: &'static str,
        value: impl ToString,
        constraint: &'static str,
    ) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            constraint,
        }
    }

    /// Name of the offending configuration field, if the error concerns one field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidEnum { field, .. }
            | Self::InvalidPresetOrdering { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::Incompatible { field, .. } => Some(field),
            Self::NegativeMotionBlur { .. } | Self::ExcessiveMotionBlur { .. } => {
                Some("shutter_angle_out")
            }
            Self::ConflictingShortcuts => None,
        }
    }
}

/// What went wrong while evaluating one frame of one stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageErrorKind {
    #[error("format mismatch: expected {expected:?}, got {actual:?}")]
    FormatMismatch { expected: Format, actual: Format },

    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("frame index out of range (length {len})")]
    FrameOutOfRange { len: usize },

    #[error("{0}")]
    Engine(String),
}

/// A failure evaluating a single frame. Other frame indices are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Stage '{stage}' failed on frame {frame}: {kind}")]
pub struct StageError {
    pub stage: String,
    pub frame: usize,
    pub kind: StageErrorKind,
}

impl StageError {
    pub fn new(stage: impl Into<String>, frame: usize, kind: StageErrorKind) -> Self {
        Self {
            stage: stage.into(),
            frame,
            kind,
        }
    }
}

/// Crate-level error returned when building a pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type StageResult<T> = std::result::Result<T, StageError>;
pub type Result<T> = std::result::Result<T, Error>;
