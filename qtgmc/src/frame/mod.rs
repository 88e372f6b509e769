//! Pixel formats, planes and frames.
//!
//! Samples are stored as `i32` regardless of bit depth. Pixel-valued results are
//! clamped to `[0, peak]`; difference frames are centred on [`Format::neutral`] and
//! left unclamped so that a difference can always be added back exactly.

#[cfg(test)]
mod tests;

use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::error::StageErrorKind;

pub type Plane = Buffer2<i32>;

/// Round half away from zero.
#[inline]
pub fn cround(x: f64) -> i32 {
    x.round() as i32
}

// ============================================================================
// Format
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorFamily {
    Gray,
    Yuv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    family: ColorFamily,
    bits: u8,
    subsampling_w: u8,
    subsampling_h: u8,
}

impl Format {
    pub const GRAY8: Format = Format::new(ColorFamily::Gray, 8, 0, 0);
    pub const GRAY16: Format = Format::new(ColorFamily::Gray, 16, 0, 0);
    pub const YUV420P8: Format = Format::new(ColorFamily::Yuv, 8, 1, 1);
    pub const YUV422P8: Format = Format::new(ColorFamily::Yuv, 8, 1, 0);
    pub const YUV444P8: Format = Format::new(ColorFamily::Yuv, 8, 0, 0);
    pub const YUV420P10: Format = Format::new(ColorFamily::Yuv, 10, 1, 1);
    pub const YUV420P16: Format = Format::new(ColorFamily::Yuv, 16, 1, 1);

    pub const fn new(family: ColorFamily, bits: u8, subsampling_w: u8, subsampling_h: u8) -> Self {
        assert!(bits >= 8 && bits <= 16, "bit depth must be in 8..=16");
        assert!(
            subsampling_w <= 2 && subsampling_h <= 2,
            "chroma subsampling must be at most 2"
        );
        let (subsampling_w, subsampling_h) = match family {
            ColorFamily::Gray => (0, 0),
            ColorFamily::Yuv => (subsampling_w, subsampling_h),
        };
        Self {
            family,
            bits,
            subsampling_w,
            subsampling_h,
        }
    }

    #[inline]
    pub fn family(&self) -> ColorFamily {
        self.family
    }

    #[inline]
    pub fn bits(&self) -> u8 {
        self.bits
    }

    #[inline]
    pub fn subsampling(&self) -> (u8, u8) {
        (self.subsampling_w, self.subsampling_h)
    }

    #[inline]
    pub fn is_gray(&self) -> bool {
        self.family == ColorFamily::Gray
    }

    #[inline]
    pub fn num_planes(&self) -> usize {
        match self.family {
            ColorFamily::Gray => 1,
            ColorFamily::Yuv => 3,
        }
    }

    #[inline]
    pub fn peak(&self) -> i32 {
        (1 << self.bits) - 1
    }

    #[inline]
    pub fn neutral(&self) -> i32 {
        1 << (self.bits - 1)
    }

    /// Convert an 8-bit reference constant to this depth.
    #[inline]
    pub fn scale(&self, value: f64) -> i32 {
        cround(value * self.peak() as f64 / 255.0)
    }

    /// Clamp to the valid pixel range.
    #[inline]
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(0, self.peak())
    }

    /// Subsampling shift of `plane` as `(horizontal, vertical)`.
    #[inline]
    pub fn plane_shift(&self, plane: usize) -> (u8, u8) {
        if plane == 0 {
            (0, 0)
        } else {
            (self.subsampling_w, self.subsampling_h)
        }
    }

    pub fn plane_dimensions(&self, plane: usize, width: usize, height: usize) -> (usize, usize) {
        let (sw, sh) = self.plane_shift(plane);
        (width >> sw, height >> sh)
    }
}

// ============================================================================
// Plane selection and field order
// ============================================================================

/// Which planes an operation processes. Unprocessed planes are copied from the
/// first input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Planes {
    #[default]
    All,
    Luma,
}

impl Planes {
    /// `All` when `chroma` is set, else `Luma`.
    pub fn luma_or_all(chroma: bool) -> Self {
        if chroma {
            Self::All
        } else {
            Self::Luma
        }
    }

    #[inline]
    pub fn contains(self, plane: usize) -> bool {
        match self {
            Self::All => true,
            Self::Luma => plane == 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldOrder {
    #[default]
    TopFieldFirst,
    BottomFieldFirst,
}

impl FieldOrder {
    #[inline]
    pub fn is_tff(self) -> bool {
        self == Self::TopFieldFirst
    }

    /// Parity of field `index` in a separated field sequence; `true` means the
    /// top field (even rows). Also the known parity of double-rate frame `index`.
    #[inline]
    pub fn field_is_top(self, index: usize) -> bool {
        (index % 2 == 0) == self.is_tff()
    }
}

// ============================================================================
// Frame
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    format: Format,
    planes: Vec<Plane>,
}

impl Frame {
    /// Every plane filled with `value`.
    pub fn filled(format: Format, width: usize, height: usize, value: i32) -> Self {
        Self::filled_planes(format, width, height, &vec![value; format.num_planes()])
    }

    /// One fill value per plane.
    pub fn filled_planes(format: Format, width: usize, height: usize, values: &[i32]) -> Self {
        assert_eq!(
            values.len(),
            format.num_planes(),
            "one fill value per plane required"
        );
        let planes = values
            .iter()
            .enumerate()
            .map(|(p, &v)| {
                let (w, h) = format.plane_dimensions(p, width, height);
                Plane::new_filled(w, h, v)
            })
            .collect();
        Self { format, planes }
    }

    pub fn from_planes(format: Format, planes: Vec<Plane>) -> Self {
        assert_eq!(
            planes.len(),
            format.num_planes(),
            "plane count must match format"
        );
        let (width, height) = planes[0].dimensions();
        for (p, plane) in planes.iter().enumerate().skip(1) {
            assert_eq!(
                plane.dimensions(),
                format.plane_dimensions(p, width, height),
                "chroma plane dimensions must follow subsampling"
            );
        }
        Self { format, planes }
    }

    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.planes[0].width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.planes[0].height()
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        self.planes[0].dimensions()
    }

    #[inline]
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }

    #[inline]
    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    #[inline]
    pub fn plane_mut(&mut self, index: usize) -> &mut Plane {
        &mut self.planes[index]
    }

    #[inline]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn into_planes(self) -> Vec<Plane> {
        self.planes
    }

    /// Error if `other` differs in format or dimensions.
    pub fn check_compatible(&self, other: &Frame) -> Result<(), StageErrorKind> {
        if self.format != other.format {
            return Err(StageErrorKind::FormatMismatch {
                expected: self.format,
                actual: other.format,
            });
        }
        if self.dimensions() != other.dimensions() {
            return Err(StageErrorKind::DimensionMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }

    /// Apply `f` to the selected planes and copy the rest.
    pub fn map_planes(&self, planes: Planes, f: impl Fn(usize, &Plane) -> Plane) -> Frame {
        let planes = self
            .planes
            .iter()
            .enumerate()
            .map(|(p, plane)| {
                if planes.contains(p) {
                    f(p, plane)
                } else {
                    plane.clone()
                }
            })
            .collect();
        Frame {
            format: self.format,
            planes,
        }
    }
}
