//! Caller-supplied overrides of preset defaults.
//!
//! Every field is optional; an absent field takes the preset default. Choice
//! fields are kept as strings so that an unknown name surfaces as a
//! [`ConfigError::InvalidEnum`](crate::error::ConfigError::InvalidEnum) naming
//! the field, rather than as a parse failure of the whole document.

use common::SerdeFormat;
use serde::{Deserialize, Serialize};

macro_rules! overrides {
    ($( $(#[$meta:meta])* $field:ident: $ty:ty ),* $(,)?) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default, deny_unknown_fields)]
        pub struct Overrides {
            $(
                $(#[$meta])*
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl Overrides {
            /// `self` with every field set in `other` replaced by `other`'s value.
            pub fn merged(&self, other: &Overrides) -> Overrides {
                Overrides {
                    $( $field: other.$field.clone().or_else(|| self.$field.clone()), )*
                }
            }

            /// True when no field is set.
            pub fn is_empty(&self) -> bool {
                true $( && self.$field.is_none() )*
            }
        }
    };
}

overrides! {
    tuning: String,

    tr0: u8,
    tr1: u8,
    tr2: u8,
    /// Packed repair strength: erosion in the tens digit when 10 or more.
    rep0: u32,
    rep1: u32,
    rep2: u32,
    rep_chroma: bool,

    edi_mode: String,
    nn_size: u8,
    nn_neurons: u8,
    edi_quality: u8,
    edi_max_d: u8,
    chroma_edi: String,

    sharpness: f64,
    sharpen_mode: u8,
    sharp_limit_mode: u8,
    sharp_limit_radius: u8,
    sharp_overshoot: u8,
    vertical_thin: f64,
    back_blend: u8,

    search_prefilter: u8,
    sub_pel: u8,
    sub_pel_interp: u8,
    block_size: u32,
    overlap: u32,
    search: u8,
    search_param: u32,
    pel_search: u32,
    chroma_motion: bool,
    true_motion: bool,
    lambda: u32,
    lsad: u32,
    pnew: u32,
    plevel: u32,
    global_motion: bool,
    dct: u8,
    thsad1: u32,
    thsad2: u32,
    thscd1: u32,
    thscd2: u32,

    source_match: u8,
    match_preset: String,
    match_edi: String,
    match_preset2: String,
    match_edi2: String,
    match_tr2: u8,
    match_enhance: f64,
    lossless: u8,

    noise_process: u8,
    ez_denoise: f64,
    ez_keep_grain: f64,
    noise_preset: String,
    denoiser: String,
    denoise_mc: bool,
    noise_tr: u8,
    sigma: f64,
    chroma_noise: bool,
    show_noise: f64,
    grain_restore: f64,
    noise_restore: f64,
    noise_deint: String,
    stabilize_noise: bool,

    fps_divisor: u32,
    shutter_blur: u8,
    shutter_angle_src: f64,
    shutter_angle_out: f64,
    shutter_blur_limit: f64,
    border: bool,
    precise: bool,
    force_temporal_radius: u8,
}

impl Overrides {
    pub fn from_str_with(text: &str, format: SerdeFormat) -> anyhow::Result<Self> {
        common::deserialize(text, format)
    }

    pub fn to_string_with(&self, format: SerdeFormat) -> anyhow::Result<String> {
        common::serialize(self, format)
    }
}
