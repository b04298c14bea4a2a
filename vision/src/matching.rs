//! Shared matching primitives: templates, similarity scores and the
//! accept/ambiguity decision every analyzer applies.

use anyhow::{Result, ensure};

use crate::{AnalyzeError, Color, Image, Mask, OwnedImage, OwnedMask, Rect, rect::px};

/// Acceptance policy for a match.
///
/// There are no defaults: both values depend on the template set
/// and have to come from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Thresholds {
	/// Minimum similarity score for a candidate to be accepted.
	pub accept_threshold: f32,
	/// Minimum separation between the best and the second-best candidate.
	pub ambiguity_margin: f32,
}

impl Thresholds {
	pub const fn new(accept_threshold: f32, ambiguity_margin: f32) -> Self {
		Self {
			accept_threshold,
			ambiguity_margin,
		}
	}

	pub fn validate(&self) -> Result<(), AnalyzeError> {
		for (name, value) in [
			("accept_threshold", self.accept_threshold),
			("ambiguity_margin", self.ambiguity_margin),
		] {
			if !value.is_finite() || !(0.0..=1.0).contains(&value) {
				return Err(AnalyzeError::InvalidThresholds(format!(
					"{name} = {value} is outside [0, 1]"
				)));
			}
		}
		Ok(())
	}

	#[inline]
	pub fn accepts(&self, score: f32) -> bool {
		score >= self.accept_threshold
	}
}

// ----------

/// Reference image for one recognizable pattern, with an optional alpha mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
	image: OwnedImage,
	mask: Option<OwnedMask>,
}

impl Template {
	pub fn new(image: OwnedImage) -> Result<Self> {
		ensure!(
			image.width() > 0 && image.height() > 0,
			"template is empty ({}x{})",
			image.width(),
			image.height()
		);
		Ok(Self { image, mask: None })
	}

	/// A fully opaque mask is dropped so matching can skip the bit lookups.
	pub fn with_mask(image: OwnedImage, mask: OwnedMask) -> Result<Self> {
		let mut template = Self::new(image)?;
		let len = (template.width() * template.height()) as usize;
		ensure!(mask.0.len() >= len.div_ceil(8), "template mask is shorter than the image");
		let active = mask.count(len);
		ensure!(active > 0, "template mask has no opaque pixel");
		if active < len {
			template.mask = Some(mask);
		}
		Ok(template)
	}

	/// Decode a PNG; pixels with alpha below `alpha_threshold` are ignored when matching.
	pub fn from_png(bytes: &[u8], alpha_threshold: u8) -> Result<Self> {
		let (image, mask) = OwnedImage::from_png_mask(bytes, alpha_threshold)?;
		Self::with_mask(image, mask)
	}

	#[inline]
	pub fn width(&self) -> u32 {
		self.image.width()
	}

	#[inline]
	pub fn height(&self) -> u32 {
		self.image.height()
	}

	#[inline]
	pub fn image(&self) -> Image<'_> {
		self.image.as_image()
	}

	#[inline]
	pub fn mask(&self) -> Option<Mask<'_>> {
		self.mask.as_ref().map(OwnedMask::as_mask)
	}

	/// Resample the template (and its mask) by factor `s`.
	pub fn scaled(&self, s: f32) -> Result<Self> {
		let (w, h) = (self.width(), self.height());
		let (sw, sh) = (px(w, s), px(h, s));
		let image = self.image.clone().resized(sw, sh)?;
		match &self.mask {
			Some(mask) => Self::with_mask(image, mask.resized(w, h, sw, sh)),
			None => Self::new(image),
		}
	}
}

// ----------

/// Similarity of two equally sized views in `[0, 1]`; `1.0` means identical.
///
/// Defined as one minus the mean absolute channel difference over the pixels
/// selected by `mask`. Returns `None` for mismatched sizes or an empty selection.
pub fn similarity(a: Image, b: Image, mask: Option<Mask>) -> Option<f32> {
	if a.width() != b.width() || a.height() != b.height() {
		return None;
	}

	let mut count = 0u64;
	let mut diff = 0u64;

	let mut i = 0usize;
	for y in 0..a.height() {
		for x in 0..a.width() {
			let yes = mask.is_none_or(|m| m.get(i));
			i += 1;
			if !yes {
				continue;
			}

			diff += a.get(x, y).abs_diff(b.get(x, y)) as u64;
			count += 1;
		}
	}

	if count == 0 {
		return None;
	}
	Some(1.0 - diff as f32 / (count as f32 * 3.0 * 255.0))
}

/// Best placement of a template inside a region.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Match {
	pub score: f32,
	/// Placement in frame coordinates.
	pub rect: Rect,
}

/// Exhaustive sliding search of `template` over `region`.
///
/// The first best placement in row-major order wins ties. Returns `None` when
/// the template does not fit inside the region.
pub fn match_template(region: Image, template: &Template) -> Option<Match> {
	let (tw, th) = (template.width(), template.height());
	if tw > region.width() || th > region.height() {
		return None;
	}

	let tpl = template.image();
	let mask = template.mask();
	let (ox, oy) = region.origin();

	let mut best: Option<Match> = None;
	for y in 0..=region.height() - th {
		for x in 0..=region.width() - tw {
			let Some(window) = region.crop(Rect::new(x, y, tw, th)) else {
				continue;
			};
			let Some(score) = similarity(window, tpl, mask) else {
				continue;
			};
			if best.is_none_or(|b| score > b.score) {
				best = Some(Match {
					score,
					rect: Rect::new(ox + x, oy + y, tw, th),
				});
				if score >= 1.0 {
					return best;
				}
			}
		}
	}
	best
}

// ----------

/// A reference pattern: a template image or a bare colour signature.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
	Image(Template),
	/// Compared against the mean colour of the whole region.
	Color(Color),
}

impl Pattern {
	/// Whether the pattern can be evaluated inside a `width`×`height` region.
	pub fn fits(&self, width: u32, height: u32) -> bool {
		match self {
			Self::Image(t) => t.width() <= width && t.height() <= height,
			Self::Color(_) => width > 0 && height > 0,
		}
	}

	pub fn score(&self, region: Image) -> Option<f32> {
		match self {
			Self::Image(t) => match_template(region, t).map(|m| m.score),
			Self::Color(_) if region.is_empty() => None,
			Self::Color(c) => Some(1.0 - region.average_color().distance(*c)),
		}
	}

	pub fn scaled(&self, s: f32) -> Result<Self> {
		Ok(match self {
			Self::Image(t) => Self::Image(t.scaled(s)?),
			Self::Color(c) => Self::Color(*c),
		})
	}
}

// ----------

/// Outcome of comparing the per-class scores of one candidate region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict<K> {
	Accept { class: K, score: f32 },
	/// The best candidate did not reach the acceptance threshold.
	LowConfidence { best: Option<f32> },
	/// The best candidate did not clear the runner-up by the ambiguity margin.
	Ambiguous { best: f32, runner_up: f32 },
}

impl<K> Verdict<K> {
	pub fn into_class(self) -> Option<K> {
		match self {
			Self::Accept { class, .. } => Some(class),
			_ => None,
		}
	}
}

/// Pick the best-scoring class, or refuse to.
///
/// `scores` holds one score per candidate class. The winner must reach
/// `accept_threshold` and lead the runner-up by at least `ambiguity_margin`;
/// an exact tie is ambiguous whatever the margin.
pub fn decide<K>(scores: impl IntoIterator<Item = (K, f32)>, thresholds: Thresholds) -> Verdict<K> {
	let mut best: Option<(K, f32)> = None;
	let mut runner_up: Option<f32> = None;

	for (class, score) in scores {
		match &best {
			Some((_, b)) if score <= *b => {
				runner_up = Some(runner_up.map_or(score, |r| r.max(score)));
			}
			_ => {
				if let Some((_, b)) = best.take() {
					runner_up = Some(runner_up.map_or(b, |r| r.max(b)));
				}
				best = Some((class, score));
			}
		}
	}

	let Some((class, score)) = best else {
		return Verdict::LowConfidence { best: None };
	};
	if !thresholds.accepts(score) {
		return Verdict::LowConfidence { best: Some(score) };
	}
	if let Some(runner_up) = runner_up
		&& (score <= runner_up || score - runner_up < thresholds.ambiguity_margin)
	{
		return Verdict::Ambiguous {
			best: score,
			runner_up,
		};
	}
	Verdict::Accept { class, score }
}
