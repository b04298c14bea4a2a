//! Counter/label reader.
//!
//! Reads a short string (typically a number or an `a/b` occupancy) from a
//! fixed ROI by matching it glyph by glyph against a character template set.
//! A counter is either read completely or reported unreadable: a truncated
//! number is worse than none.

use std::{collections::BTreeMap, sync::Arc, sync::LazyLock};

use anyhow::{Result, ensure};
use image::GrayImage;
use regex::Regex;

use crate::{
	AnalyzeError, Analyzer, Color, Detector, Image, OwnedImage, Rect, Roi,
	analyzers::{crop_roi, ensure_frame},
	matching::{Thresholds, decide},
};

static VALUE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?<digits>\d+)").expect("regex"));
static FRACTION_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?<num>\d+)\s*/\s*(?<den>\d+)").expect("regex"));

/// Text read from a counter ROI.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Counter {
	pub text: String,
}

impl Counter {
	/// First run of digits, e.g. `12` for `"12/24"`.
	pub fn value(&self) -> Option<u32> {
		VALUE_RE
			.captures(&self.text)
			.and_then(|c| c.name("digits"))
			.and_then(|m| m.as_str().parse().ok())
	}

	/// `(numerator, denominator)` for texts shaped like `"3/5"`.
	pub fn fraction(&self) -> Option<(u32, u32)> {
		let c = FRACTION_RE.captures(&self.text)?;
		Some((c["num"].parse().ok()?, c["den"].parse().ok()?))
	}
}

// ----------

/// Binarised, tight-cropped glyph. `true` marks ink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
	width: u32,
	height: u32,
	bits: Vec<bool>,
}

impl GlyphBitmap {
	fn from_binary(bin: &GrayImage, rect: Rect) -> Self {
		let mut bits = Vec::with_capacity(rect.area() as usize);
		for y in rect.y..rect.bottom() {
			for x in rect.x..rect.right() {
				bits.push(bin.get_pixel(x, y).0[0] > 0);
			}
		}
		Self {
			width: rect.width,
			height: rect.height,
			bits,
		}
	}

	/// Binarise an image and crop it to the bounding box of its ink.
	///
	/// The image needs at least one pixel of background around the glyph so
	/// that its polarity can be told from the border.
	pub fn from_image(image: Image) -> Result<Self> {
		let bin = binarize(image);
		let (w, h) = bin.dimensions();
		let rect = ink_bounds(&bin, 0, w);
		ensure!(rect.fits_within(w, h), "glyph image has no ink");
		Ok(Self::from_binary(&bin, rect))
	}

	#[inline]
	pub fn width(&self) -> u32 {
		self.width
	}

	#[inline]
	pub fn height(&self) -> u32 {
		self.height
	}

	#[inline]
	fn get(&self, x: u32, y: u32) -> bool {
		self.bits[(x + y * self.width) as usize]
	}

	/// Ink overlap (Jaccard) after resampling onto the template's grid,
	/// weighted by how well the aspect ratios agree.
	pub fn score(&self, template: &GlyphBitmap) -> f32 {
		let mut inter = 0u32;
		let mut union = 0u32;
		for ty in 0..template.height {
			let sy = ty * self.height / template.height;
			for tx in 0..template.width {
				let sx = tx * self.width / template.width;
				let a = self.get(sx, sy);
				let b = template.get(tx, ty);
				inter += (a && b) as u32;
				union += (a || b) as u32;
			}
		}
		if union == 0 {
			return 0.0;
		}

		let ar_a = self.width as f32 / self.height as f32;
		let ar_b = template.width as f32 / template.height as f32;
		(inter as f32 / union as f32) * (ar_a.min(ar_b) / ar_a.max(ar_b))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphTemplate {
	pub ch: char,
	pub bitmap: GlyphBitmap,
}

impl GlyphTemplate {
	pub fn from_image(ch: char, image: Image) -> Result<Self> {
		Ok(Self {
			ch,
			bitmap: GlyphBitmap::from_image(image)?,
		})
	}

	/// Decode a glyph PNG. Pixels with alpha below `alpha_threshold` are
	/// background: they are painted in a colour contrasting with the ink.
	pub fn from_png(ch: char, bytes: &[u8], alpha_threshold: u8) -> Result<Self> {
		let (image, mask) = OwnedImage::from_png_mask(bytes, alpha_threshold)?;
		let (w, h) = (image.width(), image.height());
		let len = (w * h) as usize;
		let opaque = mask.count(len);
		ensure!(opaque > 0, "glyph image is fully transparent");
		if opaque == len {
			return Self::from_image(ch, image.as_image());
		}

		let view = image.as_image();
		let mask = mask.as_mask();
		let ink = view.average_color_masked(mask);
		let paper = if ink.luma() < 128 { Color::WHITE } else { Color::BLACK };
		let composed = OwnedImage::from_fn(w, h, |x, y| {
			if mask.get((x + y * w) as usize) { view.get(x, y) } else { paper }
		});
		Self::from_image(ch, composed.as_image())
	}
}

// ----------

#[derive(Debug, Clone, PartialEq)]
pub struct CounterConfig {
	pub roi: Roi,
	pub glyphs: Vec<GlyphTemplate>,
	pub thresholds: Thresholds,
}

impl CounterConfig {
	/// Glyph matching is scale-invariant, so only the ROI moves.
	pub fn scaled(&self, s: f32) -> Self {
		Self {
			roi: self.roi.scaled(s),
			glyphs: self.glyphs.clone(),
			thresholds: self.thresholds,
		}
	}
}

#[derive(Debug, Clone)]
pub struct CounterDetector {
	config: Arc<CounterConfig>,
}

pub type CounterAnalyzer<'f> = Analyzer<'f, CounterDetector>;

impl CounterDetector {
	pub fn new(config: Arc<CounterConfig>) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &CounterConfig {
		&self.config
	}
}

impl Detector for CounterDetector {
	type Output = Counter;

	fn name(&self) -> &str {
		&self.config.roi.name
	}

	fn detect(&self, frame: Image) -> Result<Counter, AnalyzeError> {
		ensure_frame(frame)?;
		let config = &*self.config;
		config.thresholds.validate()?;
		if config.glyphs.is_empty() {
			return Err(AnalyzeError::Catalog(format!(
				"counter `{}` has no glyph templates",
				config.roi.name
			)));
		}

		let crop = crop_roi(frame, &config.roi)?;
		let bin = binarize(crop);
		let boxes = segment(&bin);
		if boxes.is_empty() {
			return Err(AnalyzeError::NoGlyphs {
				roi: config.roi.name.clone(),
			});
		}

		let mut text = String::with_capacity(boxes.len());
		for (index, rect) in boxes.into_iter().enumerate() {
			let glyph = GlyphBitmap::from_binary(&bin, rect);

			let mut scores = BTreeMap::<char, f32>::new();
			for template in &config.glyphs {
				let score = glyph.score(&template.bitmap);
				scores
					.entry(template.ch)
					.and_modify(|s| *s = s.max(score))
					.or_insert(score);
			}

			let verdict = decide(scores, config.thresholds);
			tracing::trace!(roi = %config.roi.name, index, ?verdict, "glyph verdict");
			match verdict.into_class() {
				Some(ch) => text.push(ch),
				None => {
					return Err(AnalyzeError::UnreadableGlyph {
						roi: config.roi.name.clone(),
						index,
					});
				}
			}
		}

		Ok(Counter { text })
	}
}

// ----------

/// Otsu-binarise `image` so that ink is white (255) and background black.
fn binarize(image: Image) -> GrayImage {
	use imageproc::contrast::{ThresholdType, otsu_level, threshold};

	let gray = image.to_gray_image();
	let level = otsu_level(&gray);
	let mut bin = threshold(&gray, level, ThresholdType::Binary);
	normalize_binary(&mut bin);
	bin
}

/// Invert when the border is mostly white; the border is background.
/// Falls back to the global white/black ratio on a tie.
fn normalize_binary(bin: &mut GrayImage) {
	let (w, h) = bin.dimensions();
	let mut white = 0i64;
	let mut black = 0i64;
	for (x, y, p) in bin.enumerate_pixels() {
		if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
			if p.0[0] > 0 {
				white += 1;
			} else {
				black += 1;
			}
		}
	}
	if white == black {
		for p in bin.pixels() {
			if p.0[0] > 0 {
				white += 1;
			} else {
				black += 1;
			}
		}
	}
	if white > black {
		for p in bin.pixels_mut() {
			p.0[0] = 255u8.saturating_sub(p.0[0]);
		}
	}
}

/// Split a binarised ROI into glyph boxes by column projection, left to right.
fn segment(bin: &GrayImage) -> Vec<Rect> {
	let (w, h) = bin.dimensions();
	let column_has_ink = |x: u32| (0..h).any(|y| bin.get_pixel(x, y).0[0] > 0);

	let mut boxes = Vec::new();
	let mut start = None;
	for x in 0..=w {
		let ink = x < w && column_has_ink(x);
		match (start, ink) {
			(None, true) => start = Some(x),
			(Some(x0), false) => {
				boxes.push(ink_bounds(bin, x0, x));
				start = None;
			}
			_ => {}
		}
	}
	boxes
}

/// Bounding box of the ink within columns `x0..x1`. Empty when there is none.
fn ink_bounds(bin: &GrayImage, x0: u32, x1: u32) -> Rect {
	let (_, h) = bin.dimensions();
	let mut min = (u32::MAX, u32::MAX);
	let mut max = (0, 0);
	for y in 0..h {
		for x in x0..x1 {
			if bin.get_pixel(x, y).0[0] > 0 {
				min = (min.0.min(x), min.1.min(y));
				max = (max.0.max(x), max.1.max(y));
			}
		}
	}
	if min.0 == u32::MAX {
		return Rect::default();
	}
	Rect::new(min.0, min.1, max.0 - min.0 + 1, max.1 - min.1 + 1)
}
