use std::fmt::Display;
use std::ops::RangeInclusive;

use tracing::debug;

use super::enums::{parse_enum, InterpolatorKind, NoisePreset, Preset, Tuning};
use super::overrides::Overrides;
use super::tables::{self, EdiColumn};
use super::{
    Configuration, CoreConfig, EdiParams, InterpolationConfig, MotionConfig, NoiseConfig,
    OutputConfig, RepairStrength, SharpnessConfig, SourceMatchConfig,
};
use crate::error::{ConfigError, ConfigResult};

const MAX_BLUR_LEVEL: f64 = 200.0;
const BLOCK_SIZES: [u32; 5] = [4, 8, 16, 32, 64];

/// Builds a [`Configuration`] from a preset and overrides.
///
/// Defaults are applied in dependency order: preset tables first, then the
/// source-match swap of interpolators, then the sharpness, noise and motion
/// defaults that depend on the earlier choices, and finally the temporal radius
/// every stage needs.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    preset: Preset,
    overrides: Overrides,
}

impl ConfigResolver {
    pub fn new(preset: Preset) -> Self {
        Self {
            preset,
            overrides: Overrides::default(),
        }
    }

    /// Resolver for a preset given by name, e.g. `"very slow"`.
    pub fn from_name(name: &str) -> ConfigResult<Self> {
        parse_enum::<Preset>("preset", name).map(Self::new)
    }

    /// Layer `overrides` over any set before.
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = self.overrides.merged(&overrides);
        self
    }

    pub fn resolve(&self) -> ConfigResult<Configuration> {
        let o = &self.overrides;
        let preset = self.preset;
        let i = preset.index();

        let tuning: Tuning = enum_or("tuning", &o.tuning, Tuning::default())?;
        let match_preset = resolve_match_preset(
            "match_preset",
            &o.match_preset,
            Preset::from_index((i + 3).min(Preset::UltraFast.index())),
        )?;
        let match_preset2 = resolve_match_preset(
            "match_preset2",
            &o.match_preset2,
            Preset::from_index((match_preset.index() + 2).min(Preset::UltraFast.index())),
        )?;
        let noise_preset: NoisePreset = enum_or("noise_preset", &o.noise_preset, NoisePreset::default())?;

        // preset tables
        let tr0 = checked("tr0", o.tr0.unwrap_or(tables::TR0[i]), 0..=2, "0..=2")?;
        let tr1 = checked("tr1", o.tr1.unwrap_or(tables::TR1[i]), 0..=2, "0..=2")?;
        let rep0 = RepairStrength::decode("rep0", o.rep0.unwrap_or(u32::from(tables::REP0[i])))?;
        let rep1 = RepairStrength::decode("rep1", o.rep1.unwrap_or(0))?;
        let rep2 = RepairStrength::decode("rep2", o.rep2.unwrap_or(u32::from(tables::REP2[i])))?;

        let mut edi: InterpolatorKind = match &o.edi_mode {
            Some(name) => parse_enum("edi_mode", name)?,
            None => tables::edi_mode(preset),
        };
        let mut edi_params = EdiParams {
            nn_size: checked("nn_size", o.nn_size.unwrap_or(tables::NN_SIZE[i]), 0..=6, "0..=6")?,
            nn_neurons: checked(
                "nn_neurons",
                o.nn_neurons.unwrap_or(tables::NN_NEURONS[i]),
                0..=4,
                "0..=4",
            )?,
            quality: checked("edi_quality", o.edi_quality.unwrap_or(1), 1..=2, "1..=2")?,
            max_d: checked(
                "edi_max_d",
                o.edi_max_d.unwrap_or(tables::EDI_MAX_D[i]),
                1..=64,
                "1..=64",
            )?,
        };
        let chroma_edi = enum_or("chroma_edi", &o.chroma_edi, Default::default())?;

        let mut sharpen_mode = checked(
            "sharpen_mode",
            o.sharpen_mode.unwrap_or(tables::SHARPEN_MODE[i]),
            0..=2,
            "0..=2",
        )?;
        let table_limit_mode = checked(
            "sharp_limit_mode",
            o.sharp_limit_mode.unwrap_or(tables::SHARP_LIMIT_MODE[i]),
            0..=4,
            "0..=4",
        )?;
        let limit_radius = checked(
            "sharp_limit_radius",
            o.sharp_limit_radius.unwrap_or(tables::SHARP_LIMIT_RADIUS[i]),
            0..=3,
            "0..=3",
        )?;
        let mut back_blend = checked(
            "back_blend",
            o.back_blend.unwrap_or(tables::BACK_BLEND[i]),
            0..=3,
            "0..=3",
        )?;

        let search_prefilter = checked(
            "search_prefilter",
            o.search_prefilter.unwrap_or(tables::SEARCH_PREFILTER[i]),
            0..=3,
            "0..=3",
        )?;
        let sub_pel = o.sub_pel.unwrap_or(tables::SUB_PEL[i]);
        if !matches!(sub_pel, 1 | 2 | 4) {
            return Err(ConfigError::out_of_range("sub_pel", sub_pel, "one of 1, 2, 4"));
        }
        let sub_pel_interp = checked("sub_pel_interp", o.sub_pel_interp.unwrap_or(2), 0..=2, "0..=2")?;
        let block_size = o
            .block_size
            .unwrap_or_else(|| tables::block_size(preset, tuning));
        if !BLOCK_SIZES.contains(&block_size) {
            return Err(ConfigError::out_of_range(
                "block_size",
                block_size,
                "one of 4, 8, 16, 32, 64",
            ));
        }
        let overlap = o
            .overlap
            .unwrap_or_else(|| tables::overlap(preset, block_size));
        if overlap > block_size / 2 {
            return Err(ConfigError::Incompatible {
                field: "overlap",
                reason: "overlap must not exceed half the block size",
            });
        }
        if overlap % 2 != 0 {
            return Err(ConfigError::Incompatible {
                field: "overlap",
                reason: "overlap must be even",
            });
        }
        let search = checked("search", o.search.unwrap_or(tables::SEARCH[i]), 0..=7, "0..=7")?;
        let search_param = checked(
            "search_param",
            o.search_param.unwrap_or(u32::from(tables::SEARCH_PARAM[i])),
            1..=64,
            "1..=64",
        )?;
        let pel_search = checked(
            "pel_search",
            o.pel_search.unwrap_or(u32::from(tables::PEL_SEARCH[i])),
            1..=64,
            "1..=64",
        )?;
        let chroma_motion = o.chroma_motion.unwrap_or(tables::CHROMA_MOTION[i]);
        let precise = o.precise.unwrap_or(tables::PRECISE[i]);

        let noise_column = tables::noise_column(noise_preset);
        let denoiser = enum_or("denoiser", &o.denoiser, noise_column.denoiser)?;
        let denoise_mc = o.denoise_mc.unwrap_or(noise_column.motion_compensated);
        let mut noise_tr = checked(
            "noise_tr",
            o.noise_tr.unwrap_or(noise_column.temporal_radius),
            0..=2,
            "0..=2",
        )?;
        let noise_deint = enum_or("noise_deint", &o.noise_deint, noise_column.deint)?;
        let mut stabilize = o.stabilize_noise.unwrap_or(noise_column.stabilize);

        // source match: the basic match re-runs the main interpolation, so the
        // main interpolator may be replaced by a faster one
        let source_match = checked("source_match", o.source_match.unwrap_or(0), 0..=3, "0..=3")?;
        let match_edi_params = edi_params;
        let match_edi_override: Option<InterpolatorKind> = match &o.match_edi {
            Some(name) => Some(parse_enum("match_edi", name)?),
            None => None,
        };
        if source_match > 0 {
            if match_preset < preset {
                return Err(ConfigError::InvalidPresetOrdering {
                    field: "match_preset",
                    preset: match_preset,
                    main: preset,
                });
            }
            if match_preset2 < preset {
                return Err(ConfigError::InvalidPresetOrdering {
                    field: "match_preset2",
                    preset: match_preset2,
                    main: preset,
                });
            }
            edi_params = edi_params_of(tables::edi_column(match_preset));
        }
        let match_edi = edi;
        if source_match > 0 {
            if let Some(kind) = match_edi_override {
                edi = kind;
            }
        }
        let match_edi2 = enum_or("match_edi2", &o.match_edi2, tables::match_edi2(match_preset2))?;
        let match_edi2_params = edi_params_of(tables::edi_column(match_preset2));

        // core radii
        let tr2 = match o.tr2 {
            Some(value) => value,
            None if source_match > 0 => tables::TR2[i].max(1),
            None => tables::TR2[i],
        };
        let tr2 = checked("tr2", tr2, 0..=3, "0..=3")?;
        let match_tr2 = checked("match_tr2", o.match_tr2.unwrap_or(1), 0..=2, "0..=2")?;
        let match_enhance = non_negative("match_enhance", o.match_enhance.unwrap_or(0.5))?;
        let lossless = checked("lossless", o.lossless.unwrap_or(0), 0..=2, "0..=2")?;

        // sharpness
        if matches!(o.sharpness, Some(s) if s <= 0.0) {
            sharpen_mode = 0;
        }
        let mut limit_mode = if source_match > 0 {
            o.sharp_limit_mode.unwrap_or(0)
        } else {
            table_limit_mode
        };
        if limit_radius == 0 {
            limit_mode = 0;
        }
        let spatial_limit = matches!(limit_mode, 1 | 3);
        let temporal_limit = matches!(limit_mode, 2 | 4);
        let strength = o.sharpness.unwrap_or(if sharpen_mode == 0 {
            0.0
        } else if source_match > 0 {
            0.2
        } else {
            1.0
        });
        let sharp_mul = if temporal_limit {
            2.0
        } else if spatial_limit {
            1.5
        } else {
            1.0
        };
        let adjusted_strength = strength
            * (sharp_mul * (0.2 + f64::from(tr1) * 0.15 + f64::from(tr2) * 0.25)
                + if sharpen_mode == 1 { 0.1 } else { 0.0 });
        if sharpen_mode == 0 {
            back_blend = 0;
        }
        let sharpness = SharpnessConfig {
            strength,
            adjusted_strength,
            mode: sharpen_mode,
            limit_mode,
            limit_radius,
            overshoot: o.sharp_overshoot.unwrap_or(0),
            vertical_thin: non_negative("vertical_thin", o.vertical_thin.unwrap_or(0.0))?,
            back_blend,
            precise,
        };

        // noise bypass
        let ez_denoise = positive(o.ez_denoise);
        let ez_keep_grain = positive(o.ez_keep_grain);
        if ez_denoise.is_some() && ez_keep_grain.is_some() {
            return Err(ConfigError::ConflictingShortcuts);
        }
        let mut process = match o.noise_process {
            Some(value) => checked("noise_process", value, 0..=2, "0..=2")?,
            None if ez_denoise.is_some() => 1,
            None if ez_keep_grain.is_some() || preset <= Preset::VerySlow => 2,
            None => 0,
        };
        let mut grain_restore = match (o.grain_restore, ez_denoise, ez_keep_grain) {
            (Some(value), _, _) => non_negative("grain_restore", value)?,
            (None, Some(_), _) => 0.0,
            (None, None, Some(keep)) => 0.3 * keep.sqrt(),
            (None, None, None) => [0.0, 0.7, 0.3][usize::from(process)],
        };
        let mut noise_restore = match (o.noise_restore, ez_denoise, ez_keep_grain) {
            (Some(value), _, _) => non_negative("noise_restore", value)?,
            (None, Some(_), _) => 0.0,
            (None, None, Some(keep)) => 0.1 * keep.sqrt(),
            (None, None, None) => [0.0, 0.3, 0.1][usize::from(process)],
        };
        let sigma = match (o.sigma, ez_denoise, ez_keep_grain) {
            (Some(value), _, _) => non_negative("sigma", value)?,
            (None, Some(denoise), _) => denoise,
            (None, None, Some(keep)) => 4.0 * keep,
            (None, None, None) => 2.0,
        };
        let show = non_negative("show_noise", o.show_noise.unwrap_or(0.0))?;
        if show > 0.0 {
            process = 2;
            noise_restore = 1.0;
        }
        if process == 0 {
            noise_tr = 0;
            grain_restore = 0.0;
            noise_restore = 0.0;
        }
        if grain_restore + noise_restore <= 0.0 {
            stabilize = false;
        }
        let noise = NoiseConfig {
            process,
            preset: noise_preset,
            denoiser,
            motion_compensated: denoise_mc,
            temporal_radius: noise_tr,
            sigma,
            chroma: o.chroma_noise.unwrap_or(false),
            show,
            grain_restore,
            noise_restore,
            deint: noise_deint,
            stabilize,
        };

        // block matching
        let true_motion = o.true_motion.unwrap_or(false);
        let lambda = o
            .lambda
            .unwrap_or((if true_motion { 1000 } else { 100 }) * block_size * block_size / 64);
        let motion = MotionConfig {
            search_prefilter,
            sub_pel,
            sub_pel_interp,
            block_size,
            overlap,
            search,
            search_param,
            pel_search,
            chroma: chroma_motion,
            true_motion,
            lambda,
            lsad: o.lsad.unwrap_or(if true_motion { 1200 } else { 400 }),
            pnew: o.pnew.unwrap_or(if true_motion { 50 } else { 25 }),
            plevel: o.plevel.unwrap_or(if true_motion { 1 } else { 0 }),
            global: o.global_motion.unwrap_or(true),
            dct: checked("dct", o.dct.unwrap_or(0), 0..=10, "0..=10")?,
            thsad1: o.thsad1.unwrap_or(640),
            thsad2: o.thsad2.unwrap_or(256),
            thscd1: o.thscd1.unwrap_or(180),
            thscd2: checked("thscd2", o.thscd2.unwrap_or(98), 0..=255, "0..=255")?,
        };

        // shutter blur and frame rate
        let fps_divisor = o.fps_divisor.unwrap_or(1);
        if fps_divisor == 0 {
            return Err(ConfigError::out_of_range("fps_divisor", 0, "at least 1"));
        }
        let mut shutter_blur = checked("shutter_blur", o.shutter_blur.unwrap_or(0), 0..=3, "0..=3")?;
        let angle_src = checked(
            "shutter_angle_src",
            o.shutter_angle_src.unwrap_or(180.0),
            0.0..=360.0,
            "0..=360",
        )?;
        let angle_out = checked(
            "shutter_angle_out",
            o.shutter_angle_out.unwrap_or(180.0),
            0.0..=360.0,
            "0..=360",
        )?;
        if angle_out * f64::from(fps_divisor) == angle_src {
            shutter_blur = 0;
        }
        let blur_level = (angle_out * f64::from(fps_divisor) - angle_src) * 100.0 / 360.0;
        if blur_level < 0.0 {
            return Err(ConfigError::NegativeMotionBlur { blur_level });
        }
        if blur_level > MAX_BLUR_LEVEL {
            return Err(ConfigError::ExcessiveMotionBlur {
                blur_level,
                max: MAX_BLUR_LEVEL,
            });
        }
        let block_divide = [1, 1, 2, 4][usize::from(shutter_blur)];
        let recalc_block_size = (block_size / block_divide).max(4);
        let recalc_overlap = (overlap / block_divide).max(2);
        let recalc_divide = block_size / recalc_block_size;
        let output = OutputConfig {
            fps_divisor,
            shutter_blur,
            shutter_angle_src: angle_src,
            shutter_angle_out: angle_out,
            blur_limit: non_negative("shutter_blur_limit", o.shutter_blur_limit.unwrap_or(4.0))?,
            blur_level,
            recalc_block_size,
            recalc_overlap,
            recalc_lambda: lambda / (recalc_divide * recalc_divide),
            border: o.border.unwrap_or(false),
            force_temporal_radius: checked(
                "force_temporal_radius",
                o.force_temporal_radius.unwrap_or(0),
                0..=3,
                "0..=3",
            )?,
        };

        // every stage's radius must be covered by the computed vectors
        let limit_radius_needed = if temporal_limit {
            sharpness.temporal_limit_radius()
        } else {
            0
        };
        let mut max_temporal_radius = [limit_radius_needed, match_tr2, tr1, tr2, noise_tr]
            .into_iter()
            .max()
            .unwrap_or(0);
        if (stabilize || shutter_blur > 0) && max_temporal_radius < 1 {
            max_temporal_radius = 1;
        }
        max_temporal_radius = max_temporal_radius.max(output.force_temporal_radius);

        let config = Configuration {
            preset,
            tuning,
            core: CoreConfig {
                tr0,
                tr1,
                tr2,
                rep0,
                rep1,
                rep2,
                rep_chroma: o.rep_chroma.unwrap_or(true),
            },
            interpolation: InterpolationConfig {
                kind: edi,
                params: edi_params,
                chroma: chroma_edi,
            },
            motion,
            sharpness,
            source_match: SourceMatchConfig {
                depth: source_match,
                preset: match_preset,
                edi: match_edi,
                edi_params: match_edi_params,
                preset2: match_preset2,
                edi2: match_edi2,
                edi2_params: match_edi2_params,
                tr1,
                tr2: match_tr2,
                enhance: match_enhance,
                lossless,
            },
            noise,
            output,
            max_temporal_radius,
            overrides: self.overrides.clone(),
        };

        debug!(
            preset = %preset,
            max_temporal_radius,
            source_match,
            noise_process = process,
            "configuration resolved"
        );

        Ok(config)
    }
}

fn edi_params_of(column: EdiColumn) -> EdiParams {
    EdiParams {
        nn_size: column.nn_size,
        nn_neurons: column.nn_neurons,
        quality: 1,
        max_d: column.max_d,
    }
}

fn enum_or<T>(field: &'static str, value: &Option<String>, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr + strum::IntoEnumIterator + Display,
{
    match value {
        Some(name) => parse_enum(field, name),
        None => Ok(default),
    }
}

/// Source-match presets stop at ultra fast.
fn resolve_match_preset(
    field: &'static str,
    value: &Option<String>,
    default: Preset,
) -> ConfigResult<Preset> {
    let preset = enum_or(field, value, default)?;
    if preset == Preset::Draft {
        return Err(ConfigError::InvalidEnum {
            field,
            value: preset.to_string(),
            expected: "any preset except 'draft'".to_string(),
        });
    }
    Ok(preset)
}

fn checked<T>(
    field: &'static str,
    value: T,
    range: RangeInclusive<T>,
    constraint: &'static str,
) -> ConfigResult<T>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::out_of_range(field, value, constraint))
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::out_of_range(field, value, "finite and not negative"))
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}
