//! QTGMC - motion-compensated deinterlacing.
//!
//! Turns an interlaced clip into a progressive clip at twice the frame rate:
//! every field is interpolated to a full frame, smoothed temporally along
//! motion vectors to remove bob shimmer, and resharpened within limits taken
//! from the interpolated picture. Optional stages match the result back to the
//! source fields, restore grain and add motion blur.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use qtgmc::{Configuration, EngineContext, FieldOrder, Preset, deinterlace};
//!
//! let config = Configuration::from_preset(Preset::Slower)?;
//! let output = deinterlace(&clip, FieldOrder::TopFieldFirst, &config, &EngineContext::software())?;
//!
//! for frame in output.render(0..output.len()) {
//!     let frame = frame?;
//!     // ...
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod frame;
pub mod lossless;
pub mod motion;
pub mod noise;
pub mod ops;
pub mod pipeline;
pub mod sharpen;
pub mod shimmer;
pub mod source_match;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    ConfigChange, ConfigResolver, Configuration, DenoiserKind, InterpolatorKind, NoiseDeint,
    NoisePreset, Overrides, Preset, RepairStrength, Tuning,
};

// ============================================================================
// Frames and clips
// ============================================================================

pub use frame::{FieldOrder, Format, Frame, Plane, Planes};
pub use stream::{Clip, ClipInfo};

// ============================================================================
// Engines
// ============================================================================

pub use engine::{
    Denoiser, DiagnosticsSink, EngineContext, Interpolator, MotionEngine, Resampler,
    SoftwareEngine, TracingDiagnostics,
};

// ============================================================================
// Pipeline
// ============================================================================

pub use pipeline::{deinterlace, deinterlace_with_stages, Deinterlaced, Stage};

// Error handling
pub use error::{ConfigError, Error, Result, StageError, StageErrorKind};
