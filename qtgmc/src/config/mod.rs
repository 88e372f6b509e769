//! Resolved deinterlacer configuration.
//!
//! A [`Configuration`] is produced once by [`ConfigResolver`] from a preset and
//! an [`Overrides`] document. Every field is concrete; nothing is looked up
//! lazily while frames are processed. Updates never mutate: they re-resolve into
//! a new value, and [`Configuration::diff`] lists what changed.

mod enums;
mod overrides;
mod resolve;
pub(crate) mod tables;


use serde::{Deserialize, Serialize};

pub use enums::{ChromaEdi, DenoiserKind, InterpolatorKind, NoiseDeint, NoisePreset, Preset, Tuning};
pub use overrides::Overrides;
pub use resolve::ConfigResolver;

use crate::error::{ConfigError, ConfigResult};
use crate::frame::Planes;

// ============================================================================
// Repair strength
// ============================================================================

/// Erosion distance and over-dilation of a shimmer repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepairStrength {
    /// Rounds of vertical erosion before reflation, `0..=7`. Zero disables the pass.
    pub erosion: u8,
    /// Extra inflation of the restore mask, `0..=3`.
    pub over_dilation: u8,
}

impl RepairStrength {
    pub const MAX_EROSION: u8 = 7;
    pub const MAX_OVER_DILATION: u8 = 3;

    pub fn new(erosion: u8, over_dilation: u8) -> Self {
        Self {
            erosion,
            over_dilation,
        }
    }

    /// Decode the legacy packed form: values below 10 are a plain erosion
    /// distance, larger values carry erosion in the tens digit and over-dilation
    /// in the ones digit.
    pub fn decode(field: &'static str, packed: u32) -> ConfigResult<Self> {
        let (erosion, over_dilation) = if packed < 10 {
            (packed, 0)
        } else {
            (packed / 10, packed % 10)
        };
        if erosion > u32::from(Self::MAX_EROSION) {
            return Err(ConfigError::out_of_range(
                field,
                packed,
                "erosion distance must be at most 7",
            ));
        }
        if over_dilation > u32::from(Self::MAX_OVER_DILATION) {
            return Err(ConfigError::out_of_range(
                field,
                packed,
                "over-dilation must be at most 3",
            ));
        }
        Ok(Self::new(erosion as u8, over_dilation as u8))
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.erosion > 0
    }
}

// ============================================================================
// Sub-configurations
// ============================================================================

/// Temporal radii and repair strengths of the three smoothing stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Radius of the non-compensated smooth of the motion search clip.
    pub tr0: u8,
    /// Radius of the compensated binomial smooth of the interpolated clip.
    pub tr1: u8,
    /// Radius of the final compensated smooth.
    pub tr2: u8,
    pub rep0: RepairStrength,
    pub rep1: RepairStrength,
    pub rep2: RepairStrength,
    pub rep_chroma: bool,
}

/// Interpolator tuning passed through to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdiParams {
    pub nn_size: u8,
    pub nn_neurons: u8,
    pub quality: u8,
    pub max_d: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpolationConfig {
    pub kind: InterpolatorKind,
    pub params: EdiParams,
    pub chroma: ChromaEdi,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Search clip prefilter, `0..=3`.
    pub search_prefilter: u8,
    pub sub_pel: u8,
    pub sub_pel_interp: u8,
    pub block_size: u32,
    pub overlap: u32,
    pub search: u8,
    pub search_param: u32,
    pub pel_search: u32,
    pub chroma: bool,
    pub true_motion: bool,
    pub lambda: u32,
    pub lsad: u32,
    pub pnew: u32,
    pub plevel: u32,
    pub global: bool,
    pub dct: u8,
    /// SAD threshold of the interpolation smooth and source match.
    pub thsad1: u32,
    /// SAD threshold of the final smooth.
    pub thsad2: u32,
    pub thscd1: u32,
    pub thscd2: u32,
}

impl MotionConfig {
    /// Planes analysed by motion search.
    pub fn planes(&self) -> Planes {
        Planes::luma_or_all(self.chroma)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharpnessConfig {
    /// Requested sharpness before adjustment for the smoothing radii.
    pub strength: f64,
    /// Unsharp amount actually applied.
    pub adjusted_strength: f64,
    /// 0 off, 1 3x3 unsharp mask, 2 vertical min/max average then unsharp.
    pub mode: u8,
    /// 0 off, 1/3 spatial, 2/4 temporal; 1/2 before the final smooth, 3/4 after.
    pub limit_mode: u8,
    pub limit_radius: u8,
    /// Allowed overshoot in 8-bit units.
    pub overshoot: u8,
    pub vertical_thin: f64,
    /// 0 off, 1 before limiting, 2 after limiting, 3 both.
    pub back_blend: u8,
    pub precise: bool,
}

impl SharpnessConfig {
    pub fn spatial_limit(&self) -> bool {
        matches!(self.limit_mode, 1 | 3)
    }

    pub fn temporal_limit(&self) -> bool {
        matches!(self.limit_mode, 2 | 4)
    }

    /// Radius needed by temporal limiting: one frame, or three for wider limits.
    pub fn temporal_limit_radius(&self) -> u8 {
        match self.limit_radius {
            0 => 0,
            1 => 1,
            _ => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceMatchConfig {
    /// Refinement depth, `0..=3`.
    pub depth: u8,
    pub preset: Preset,
    /// Interpolator of the basic match.
    pub edi: InterpolatorKind,
    pub edi_params: EdiParams,
    pub preset2: Preset,
    /// Interpolator of the refinement stages.
    pub edi2: InterpolatorKind,
    pub edi2_params: EdiParams,
    pub tr1: u8,
    pub tr2: u8,
    pub enhance: f64,
    /// 0 off, 1 after the final smooth, 2 before resharpening.
    pub lossless: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// 0 off, 1 denoise, 2 identify noise and let the smooth remove it.
    pub process: u8,
    pub preset: NoisePreset,
    pub denoiser: DenoiserKind,
    pub motion_compensated: bool,
    pub temporal_radius: u8,
    pub sigma: f64,
    pub chroma: bool,
    /// Amplification of the noise output; zero shows the normal output.
    pub show: f64,
    pub grain_restore: f64,
    pub noise_restore: f64,
    pub deint: NoiseDeint,
    pub stabilize: bool,
}

impl NoiseConfig {
    pub fn planes(&self) -> Planes {
        Planes::luma_or_all(self.chroma)
    }

    pub fn total_restore(&self) -> f64 {
        self.grain_restore + self.noise_restore
    }
}

/// Shutter blur, frame rate and border handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub fps_divisor: u32,
    /// 0 off, 1 existing vectors, 2 and 3 recalculated at finer block sizes.
    pub shutter_blur: u8,
    pub shutter_angle_src: f64,
    pub shutter_angle_out: f64,
    /// Motion mask limit; zero blurs everywhere.
    pub blur_limit: f64,
    /// Blur level as a percentage of the frame interval.
    pub blur_level: f64,
    pub recalc_block_size: u32,
    pub recalc_overlap: u32,
    pub recalc_lambda: u32,
    pub border: bool,
    pub force_temporal_radius: u8,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub preset: Preset,
    pub tuning: Tuning,
    pub core: CoreConfig,
    pub interpolation: InterpolationConfig,
    pub motion: MotionConfig,
    pub sharpness: SharpnessConfig,
    pub source_match: SourceMatchConfig,
    pub noise: NoiseConfig,
    pub output: OutputConfig,
    /// Largest temporal distance any stage looks at; motion vectors are computed
    /// for every delta up to it.
    pub max_temporal_radius: u8,
    /// Overrides this configuration was resolved from.
    pub overrides: Overrides,
}

/// One field that differs between two configurations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    /// Dotted path, e.g. `core.tr2`.
    pub field: String,
    pub old: String,
    pub new: String,
}

impl Configuration {
    /// Resolve the defaults of `preset` with no overrides.
    pub fn from_preset(preset: Preset) -> ConfigResult<Self> {
        ConfigResolver::new(preset).resolve()
    }

    /// A new configuration with `overrides` layered over the ones this one was
    /// resolved from.
    pub fn with_overrides(&self, overrides: &Overrides) -> ConfigResult<Self> {
        ConfigResolver::new(self.preset)
            .overrides(self.overrides.merged(overrides))
            .resolve()
    }

    /// Check that a configuration built by hand or deserialized still computes
    /// vectors for every frame distance its stages compensate over.
    ///
    /// Resolved configurations always pass. The pipeline runs this before
    /// building any stage.
    pub fn validate(&self) -> ConfigResult<()> {
        let required = self.required_temporal_radius();
        if self.max_temporal_radius < required {
            return Err(ConfigError::Incompatible {
                field: "max_temporal_radius",
                reason: "smaller than the frame distance a stage compensates over",
            });
        }
        if self.output.fps_divisor == 0 {
            return Err(ConfigError::out_of_range(
                "fps_divisor",
                self.output.fps_divisor,
                "at least 1",
            ));
        }
        Ok(())
    }

    /// Largest frame distance any enabled stage asks the motion field for.
    fn required_temporal_radius(&self) -> u8 {
        // binomial smooths reach two frames at most
        let binomial = |radius: u8| radius.min(2);
        let mut radii = vec![binomial(self.core.tr1), self.core.tr2];

        let source_match = &self.source_match;
        if source_match.depth >= 1 {
            radii.push(binomial(source_match.tr1));
        }
        if source_match.depth >= 2 {
            radii.push(binomial(source_match.tr2));
        }

        let noise = &self.noise;
        if noise.process > 0 {
            if noise.motion_compensated {
                radii.push(noise.temporal_radius);
            }
            if noise.stabilize {
                radii.push(1);
            }
        }

        if self.sharpness.temporal_limit() {
            radii.push(if self.sharpness.limit_radius > 1 { 3 } else { 1 });
        }
        if self.output.shutter_blur > 0 {
            radii.push(1);
        }
        radii.into_iter().max().unwrap_or(0)
    }

    /// Fields whose resolved value differs, sorted by path. The stored
    /// overrides are not compared.
    pub fn diff(&self, other: &Configuration) -> Vec<ConfigChange> {
        let old = resolved_fields(self);
        let new: hashbrown::HashMap<String, String> = resolved_fields(other).into_iter().collect();
        old.into_iter()
            .filter_map(|(field, old)| {
                let new = new.get(&field)?;
                (*new != old).then(|| ConfigChange {
                    new: new.clone(),
                    field,
                    old,
                })
            })
            .collect()
    }
}

fn resolved_fields(config: &Configuration) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    if let Ok(serde_json::Value::Object(mut map)) = serde_json::to_value(config) {
        map.remove("overrides");
        flatten("", &serde_json::Value::Object(map), &mut fields);
    }
    fields
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
