//! Row-major 2D buffer used as the storage for image planes.

use std::ops::{Deref, DerefMut, Index, IndexMut};

use rayon::prelude::*;

/// Rows handed to one rayon task by [`Buffer2::par_from_rows`].
pub const ROWS_PER_CHUNK: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Buffer2<T> {
    pixels: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn same_dimensions<U>(&self, other: &Buffer2<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        debug_assert!(x < self.width && y < self.height);
        &self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        debug_assert!(x < self.width && y < self.height);
        &mut self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.pixels.chunks_exact(self.width.max(1))
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.pixels
    }
}

impl<T: Copy> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Sample with reflect-101 addressing (`-1` maps to `1`, `width` maps to `width - 2`).
    #[inline]
    pub fn get_mirrored(&self, x: isize, y: isize) -> T {
        self.pixels[mirror_index(y, self.height) * self.width + mirror_index(x, self.width)]
    }

    /// Sample with edge replication.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> T {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.pixels[y * self.width + x]
    }

    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Buffer2<U> {
        Buffer2 {
            pixels: self.pixels.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    pub fn fill(&mut self, value: T) {
        self.pixels.fill(value);
    }
}

impl<T: Copy + Default + Send + Sync> Buffer2<T> {
    /// Build a buffer row by row in parallel. `fill_row(y, row)` writes one output row.
    pub fn par_from_rows<F>(width: usize, height: usize, fill_row: F) -> Self
    where
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        let mut pixels = vec![T::default(); width * height];
        if width > 0 {
            pixels
                .par_chunks_mut(width * ROWS_PER_CHUNK)
                .enumerate()
                .for_each(|(chunk_idx, chunk)| {
                    let y_start = chunk_idx * ROWS_PER_CHUNK;
                    for (local_y, row) in chunk.chunks_exact_mut(width).enumerate() {
                        fill_row(y_start + local_y, row);
                    }
                });
        }
        Self {
            pixels,
            width,
            height,
        }
    }
}

/// Reflect-101 index into `0..len`.
#[inline]
pub fn mirror_index(i: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m >= len as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

impl<T> Deref for Buffer2<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}

impl<T> DerefMut for Buffer2<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stores_dimensions() {
        let buf = Buffer2::new(3, 2, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(buf.dimensions(), (3, 2));
        assert_eq!(buf.len(), 6);
    }

    #[test]
    #[should_panic(expected = "pixels length must equal width * height")]
    fn test_new_panics_on_size_mismatch() {
        Buffer2::new(3, 2, vec![1, 2, 3]);
    }

    #[test]
    fn test_rows_are_row_major() {
        let buf = Buffer2::new(3, 2, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(buf.row(0), &[10, 20, 30]);
        assert_eq!(buf.row(1), &[40, 50, 60]);
        assert_eq!(buf.rows().count(), 2);
        assert_eq!(buf[(2, 1)], 60);
    }

    #[test]
    fn test_row_mut_writes_through() {
        let mut buf = Buffer2::new_filled(2, 2, 0);
        buf.row_mut(1)[0] = 7;
        assert_eq!(*buf.get(0, 1), 7);
        assert_eq!(*buf.get(1, 1), 0);
    }

    #[test]
    fn test_from_fn() {
        let buf = Buffer2::from_fn(3, 2, |x, y| (x + 10 * y) as i32);
        assert_eq!(buf.pixels(), &[0, 1, 2, 10, 11, 12]);
    }

    #[test]
    fn test_mirror_index_reflects_without_repeating_edge() {
        assert_eq!(mirror_index(-1, 5), 1);
        assert_eq!(mirror_index(-2, 5), 2);
        assert_eq!(mirror_index(5, 5), 3);
        assert_eq!(mirror_index(6, 5), 2);
        assert_eq!(mirror_index(3, 5), 3);
        assert_eq!(mirror_index(-1, 1), 0);
    }

    #[test]
    fn test_get_mirrored_and_clamped() {
        let buf = Buffer2::new(3, 1, vec![1, 2, 3]);
        assert_eq!(buf.get_mirrored(-1, 0), 2);
        assert_eq!(buf.get_mirrored(3, 0), 2);
        assert_eq!(buf.get_clamped(-1, 0), 1);
        assert_eq!(buf.get_clamped(5, 3), 3);
    }

    #[test]
    fn test_par_from_rows_matches_sequential() {
        let width = 7;
        let height = ROWS_PER_CHUNK * 3 + 5;
        let parallel = Buffer2::<i32>::par_from_rows(width, height, |y, row| {
            for (x, v) in row.iter_mut().enumerate() {
                *v = (x * 100 + y) as i32;
            }
        });
        let sequential = Buffer2::from_fn(width, height, |x, y| (x * 100 + y) as i32);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_map_keeps_shape() {
        let buf = Buffer2::new(2, 2, vec![1, 2, 3, 4]);
        let doubled = buf.map(|v| v * 2);
        assert_eq!(doubled.pixels(), &[2, 4, 6, 8]);
        assert!(doubled.same_dimensions(&buf));
    }
}
