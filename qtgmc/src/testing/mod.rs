//! Testing utilities: synthetic clips and tracing setup.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::{Format, Frame, Plane};
use crate::stream::Clip;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Build a clip from a luma function `f(x, y, n)`; chroma planes are neutral.
pub fn clip_from_fn(
    format: Format,
    width: usize,
    height: usize,
    frames: usize,
    f: impl Fn(usize, usize, usize) -> i32,
) -> Clip {
    let frames = (0..frames)
        .map(|n| {
            let planes = (0..format.num_planes())
                .map(|p| {
                    let (w, h) = format.plane_dimensions(p, width, height);
                    if p == 0 {
                        Plane::from_fn(w, h, |x, y| f(x, y, n))
                    } else {
                        Plane::new_filled(w, h, format.neutral())
                    }
                })
                .collect();
            Frame::from_planes(format, planes)
        })
        .collect();
    Clip::from_frames("synthetic", frames)
}

/// Luma equals `y + 100 * n`. Useful for checking row and frame routing.
pub fn row_index_clip(format: Format, width: usize, height: usize, frames: usize) -> Clip {
    clip_from_fn(format, width, height, frames, |_, y, n| (y + 100 * n) as i32)
}

pub fn flat_clip(format: Format, width: usize, height: usize, frames: usize, value: i32) -> Clip {
    let frames = (0..frames)
        .map(|_| Frame::filled(format, width, height, value))
        .collect();
    Clip::from_frames("flat", frames)
}

/// Static horizontal ramp. Every row and every frame is identical.
pub fn static_ramp_clip(format: Format, width: usize, height: usize, frames: usize) -> Clip {
    let peak = format.peak() as usize;
    clip_from_fn(format, width, height, frames, move |x, _, _| {
        (peak / 16 + x * (peak / 2) / width.max(1)) as i32
    })
}

/// Deterministic high-detail texture value.
pub fn texture(x: isize, y: isize) -> i32 {
    let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) as u64;
    let h = h.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 40;
    40 + (h % 160) as i32
}

/// Texture translated by `(dx, dy)` pixels per frame.
pub fn panning_clip(
    format: Format,
    width: usize,
    height: usize,
    frames: usize,
    dx: isize,
    dy: isize,
) -> Clip {
    let scale = format.peak() / 255;
    clip_from_fn(format, width, height, frames, move |x, y, n| {
        let n = n as isize;
        texture(x as isize - dx * n, y as isize - dy * n) * scale
    })
}

/// Ramp plus seeded uniform noise of the given amplitude.
pub fn noisy_clip(
    format: Format,
    width: usize,
    height: usize,
    frames: usize,
    amplitude: i32,
    seed: u64,
) -> Clip {
    let ramp = static_ramp_clip(format, width, height, 1);
    let base = ramp.frame(0).expect("stored frame");
    let frames = (0..frames)
        .map(|n| {
            let mut rng = StdRng::seed_from_u64(seed + n as u64);
            let mut frame = (*base).clone();
            for v in frame.plane_mut(0).iter_mut() {
                *v = format.clamp(*v + rng.random_range(-amplitude..=amplitude));
            }
            frame
        })
        .collect();
    Clip::from_frames("noisy", frames)
}

/// Assert two clips agree on frames `range`.
pub fn assert_clips_equal(a: &Clip, b: &Clip, range: std::ops::Range<usize>) {
    for n in range {
        let fa = a.frame(n).expect("left frame");
        let fb = b.frame(n).expect("right frame");
        assert!(*fa == *fb, "frame {n} differs between '{}' and '{}'", a.name(), b.name());
    }
}
