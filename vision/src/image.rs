//! Frame buffer primitives.
//!
//! Captured frames are stored as a lightweight owned RGB image (`OwnedImage`).
//! Analyzers never copy or mutate a frame: they borrow a view (`Image<'a>`)
//! for the duration of one analysis pass and crop further views out of it.

use anyhow::{Context, Result, ensure};

use crate::Rect;

/// Packed 1-bit mask (row-major) matching the pixel layout of an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedMask(pub Vec<u8>);

#[derive(Clone, Copy, Debug)]
pub struct Mask<'a>(pub &'a [u8]);

impl OwnedMask {
    /// Mask with every one of `len` pixels set.
    pub fn full(len: usize) -> Self {
        Self(vec![0xFF; len / 8 + 1])
    }

    #[inline]
    pub fn as_mask(&self) -> Mask<'_> {
        Mask(&self.0)
    }

    /// Number of active pixels among the first `len`.
    pub fn count(&self, len: usize) -> usize {
        (0..len).filter(|&i| self.as_mask().get(i)).count()
    }

    /// Nearest-neighbour resample of a `src_w`×`src_h` mask.
    pub fn resized(&self, src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> Self {
        let src = self.as_mask();
        let mut out = vec![0u8; (dst_w * dst_h) as usize / 8 + 1];
        for y in 0..dst_h {
            let sy = (y * src_h / dst_h.max(1)).min(src_h.saturating_sub(1));
            for x in 0..dst_w {
                let sx = (x * src_w / dst_w.max(1)).min(src_w.saturating_sub(1));
                if src.get((sx + sy * src_w) as usize) {
                    let i = (x + y * dst_w) as usize;
                    out[i / 8] |= 1 << (i % 8);
                }
            }
        }
        Self(out)
    }
}

impl Mask<'_> {
    #[inline(always)]
    pub fn get(&self, i: usize) -> bool {
        self.0
            .get(i / 8)
            .is_some_and(|byte| (byte >> (i % 8)) & 1 == 1)
    }
}

/// Owned RGB image (no alpha).
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an `OwnedImage` from tightly packed RGBA bytes (alpha is discarded).
    ///
    /// A buffer whose length disagrees with the stated dimensions is a corrupt
    /// capture and is rejected.
    pub fn try_from_rgba(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        ensure!(
            bytes.len() == expected,
            "rgba buffer holds {} bytes, expected {expected} for {width}x{height}",
            bytes.len()
        );

        let data = bytes
            .chunks_exact(4)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build an image by evaluating `f` for every pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> Color) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    /// Load an RGBA PNG and return an `(OwnedImage, OwnedMask)` pair.
    ///
    /// The mask is a packed bitset (row-major) where each bit indicates whether
    /// the original alpha value was >= `alpha_threshold`.
    pub fn from_png_mask(bytes: &[u8], alpha_threshold: u8) -> Result<(Self, OwnedMask)> {
        let img = image::load_from_memory(bytes)
            .context("decode png (with alpha)")?
            .to_rgba8();
        let (width, height) = img.dimensions();
        let mut data = Vec::with_capacity((width * height) as usize);
        let mut mask = vec![0u8; (width * height) as usize / 8 + 1];

        for (i, p) in img.pixels().enumerate() {
            let [r, g, b, a] = p.0;
            data.push(Color::new(r, g, b));
            if a >= alpha_threshold {
                mask[i / 8] |= 1 << (i % 8);
            }
        }

        Ok((
            Self {
                width,
                height,
                data,
            },
            OwnedMask(mask),
        ))
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resample this image to the given size.
    ///
    /// Uses `fast_image_resize` (SIMD-optimized) and keeps output in `Vec<Color>`.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let width = width.max(1);
        let height = height.max(1);
        if self.width == width && self.height == height {
            return Ok(());
        }
        ensure!(!self.data.is_empty(), "cannot resize an empty image");

        // SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is layout-compatible
        // with `fast_image_resize::pixels::U8x3` (alignment 1).
        let src_pixels = unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
                self.data.len(),
            )
        };

        let src = fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
            .context("fast_image_resize: ImageRef::from_pixels")?;

        let mut dst = fast_image_resize::images::Image::new(width, height, fast_image_resize::PixelType::U8x3);

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
        );

        resizer
            .resize(&src, &mut dst, &Some(options))
            .context("fast_image_resize: resize")?;

        let bytes: Vec<u8> = dst.into_vec();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in bytes.chunks_exact(3) {
            data.push(Color::new(px[0], px[1], px[2]));
        }

        self.width = width;
        self.height = height;
        self.data = data;
        Ok(())
    }

    #[inline]
    pub fn resized(mut self, width: u32, height: u32) -> Result<Self> {
        self.resize(width, height)?;
        Ok(self)
    }

    /// Create a borrowed view of this entire image.
    pub fn as_image<'a>(&'a self) -> Image<'a> {
        Image {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
            true_width: self.width,
            data: &self.data,
        }
    }
}

// ----------

/// Borrowed image view into an `OwnedImage`.
///
/// Coordinates reported by a view (`origin`) are relative to the image it was
/// ultimately borrowed from, so crops of a frame stay in frame coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Image<'a> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    true_width: u32,
    data: &'a [Color],
}

impl<'a> Image<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Top-left corner of this view in the coordinates of the owning image.
    #[inline(always)]
    pub fn origin(&self) -> (u32, u32) {
        (self.x1, self.y1)
    }

    #[inline(always)]
    fn pixel(&self, x: u32, y: u32) -> &Color {
        &self.data[(x + y * self.true_width) as usize]
    }

    /// Pixel at view-relative coordinates.
    #[inline(always)]
    pub fn get(&self, x: u32, y: u32) -> Color {
        *self.pixel(self.x1 + x, self.y1 + y)
    }

    pub fn to_owned_image(self) -> OwnedImage {
        let mut data = Vec::with_capacity((self.width() * self.height()) as usize);
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                data.push(*self.pixel(x, y));
            }
        }

        OwnedImage {
            width: self.width(),
            height: self.height(),
            data,
        }
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0; (self.width() * self.height() * 3) as usize];
        let mut i = 0;
        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                let clr = self.pixel(x, y);
                bytes[i] = clr.r;
                bytes[i + 1] = clr.g;
                bytes[i + 2] = clr.b;
                i += 3;
            }
        }
        bytes
    }

    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let bytes = self.get_bytes();
        let img = image::RgbImage::from_raw(self.width(), self.height(), bytes)
            .context("RgbImage::from_raw failed")?;
        img.save_with_format(path, image::ImageFormat::Png)
            .context("save png")?;
        Ok(())
    }

    /// Convert to a grayscale `GrayImage` (luma).
    pub fn to_gray_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width(), self.height(), |x, y| {
            image::Luma([self.get(x, y).luma()])
        })
    }

    /// Strict crop (relative coordinates).
    ///
    /// Returns `None` when the rectangle is empty or reaches past this view;
    /// it never clips.
    pub fn crop(&self, rect: Rect) -> Option<Self> {
        if !rect.fits_within(self.width(), self.height()) {
            return None;
        }

        Some(Self {
            x1: self.x1 + rect.x,
            y1: self.y1 + rect.y,
            x2: self.x1 + rect.right(),
            y2: self.y1 + rect.bottom(),
            true_width: self.true_width,
            data: self.data,
        })
    }

    /// Create an arbitrary subimage (relative coordinates), clamped to this view.
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width());
        let y = y.min(self.height());
        let width = width.min(self.width() - x);
        let height = height.min(self.height() - y);

        Self {
            x1: self.x1 + x,
            y1: self.y1 + y,
            x2: self.x1 + x + width,
            y2: self.y1 + y + height,
            true_width: self.true_width,
            data: self.data,
        }
    }

    pub fn average_color(&self) -> Color {
        let mut r = 0u64;
        let mut g = 0u64;
        let mut b = 0u64;

        for y in self.y1..self.y2 {
            for x in self.x1..self.x2 {
                let clr = self.pixel(x, y);
                r += clr.r as u64;
                g += clr.g as u64;
                b += clr.b as u64;
            }
        }

        let count = self.width() as u64 * self.height() as u64;
        if count == 0 {
            return Color::BLACK;
        }

        Color {
            r: (r / count) as u8,
            g: (g / count) as u8,
            b: (b / count) as u8,
        }
    }

    pub fn average_color_masked(&self, mask: Mask) -> Color {
        let mut count = 0u64;
        let mut r = 0u64;
        let mut g = 0u64;
        let mut b = 0u64;

        let mut i = 0usize;
        for y in 0..self.height() {
            for x in 0..self.width() {
                let yes = mask.get(i);
                i += 1;
                if !yes {
                    continue;
                }

                let clr = self.get(x, y);
                r += clr.r as u64;
                g += clr.g as u64;
                b += clr.b as u64;
                count += 1;
            }
        }

        if count == 0 {
            return Color::BLACK;
        }

        Color {
            r: (r / count) as u8,
            g: (g / count) as u8,
            b: (b / count) as u8,
        }
    }
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Summed absolute channel difference (0..=765).
    #[inline(always)]
    pub fn abs_diff(&self, other: Color) -> u32 {
        self.r.abs_diff(other.r) as u32 + self.g.abs_diff(other.g) as u32 + self.b.abs_diff(other.b) as u32
    }

    /// Mean absolute channel difference, normalised to `[0, 1]`.
    pub fn distance(&self, other: Color) -> f32 {
        self.abs_diff(other) as f32 / (3.0 * 255.0)
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> OwnedImage {
        OwnedImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 { Color::WHITE } else { Color::BLACK }
        })
    }

    #[test]
    fn rgba_length_mismatch_is_rejected() {
        assert!(OwnedImage::try_from_rgba(2, 2, &[0; 15]).is_err());
        let img = OwnedImage::try_from_rgba(2, 2, &[7; 16]).unwrap();
        assert_eq!(img.as_image().get(1, 1), Color::new(7, 7, 7));
    }

    #[test]
    fn crop_never_clips() {
        let img = checker(10, 8);
        let view = img.as_image();

        assert!(view.crop(Rect::new(8, 0, 3, 2)).is_none());
        assert!(view.crop(Rect::new(0, 7, 1, 2)).is_none());
        assert!(view.crop(Rect::new(2, 2, 0, 3)).is_none());

        let inner = view.crop(Rect::new(2, 3, 8, 5)).unwrap();
        assert_eq!((inner.width(), inner.height()), (8, 5));
        assert_eq!(inner.origin(), (2, 3));
        assert_eq!(inner.get(0, 0), view.get(2, 3));
    }

    #[test]
    fn nested_crop_keeps_frame_coordinates() {
        let img = checker(20, 20);
        let outer = img.as_image().crop(Rect::new(5, 6, 10, 10)).unwrap();
        let inner = outer.crop(Rect::new(1, 2, 3, 3)).unwrap();
        assert_eq!(inner.origin(), (6, 8));
        assert!(outer.crop(Rect::new(8, 8, 3, 3)).is_none());
    }

    #[test]
    fn average_color_of_uniform_view() {
        let img = OwnedImage::from_fn(4, 4, |_, _| Color::new(10, 20, 30));
        assert_eq!(img.as_image().average_color(), Color::new(10, 20, 30));
    }

    #[test]
    fn masked_average_ignores_inactive_pixels() {
        let img = OwnedImage::from_fn(2, 1, |x, _| if x == 0 { Color::WHITE } else { Color::BLACK });
        let mask = OwnedMask(vec![0b01]);
        assert_eq!(img.as_image().average_color_masked(mask.as_mask()), Color::WHITE);
    }

    #[test]
    fn resize_changes_dimensions() {
        let img = checker(8, 8).resized(4, 2).unwrap();
        assert_eq!((img.width(), img.height()), (4, 2));

        let same = checker(8, 8);
        assert_eq!(same.clone().resized(8, 8).unwrap(), same);
    }

    #[test]
    fn mask_resize_is_nearest_neighbour() {
        let mask = OwnedMask::full(4);
        let big = mask.resized(2, 2, 4, 4);
        assert_eq!(big.count(16), 16);
    }

    #[test]
    fn color_distance_is_normalised() {
        assert_eq!(Color::BLACK.distance(Color::WHITE), 1.0);
        assert_eq!(Color::WHITE.distance(Color::WHITE), 0.0);
    }
}
