//! Icon presence matcher.
//!
//! Answers "is this icon shown inside the ROI?" with the same similarity
//! score as the mood classifier. There is a single class, so only the
//! acceptance threshold applies.

use std::sync::Arc;

use crate::{
	AnalyzeError, Analyzer, Detector, Image, Rect, Roi,
	analyzers::{crop_roi, ensure_frame},
	matching::{Template, Thresholds, match_template},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct IconMatch {
	pub present: bool,
	/// Best similarity over every template variant and placement.
	pub score: f32,
	/// Where the best placement was, in frame coordinates.
	pub rect: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IconConfig {
	pub roi: Roi,
	/// Variants of the same icon (e.g. highlighted and idle).
	pub templates: Vec<Template>,
	pub thresholds: Thresholds,
}

impl IconConfig {
	pub fn scaled(&self, s: f32) -> anyhow::Result<Self> {
		Ok(Self {
			roi: self.roi.scaled(s),
			templates: self
				.templates
				.iter()
				.map(|t| t.scaled(s))
				.collect::<anyhow::Result<_>>()?,
			thresholds: self.thresholds,
		})
	}
}

#[derive(Debug, Clone)]
pub struct IconDetector {
	config: Arc<IconConfig>,
}

pub type IconAnalyzer<'f> = Analyzer<'f, IconDetector>;

impl IconDetector {
	pub fn new(config: Arc<IconConfig>) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &IconConfig {
		&self.config
	}
}

impl Detector for IconDetector {
	type Output = IconMatch;

	fn name(&self) -> &str {
		&self.config.roi.name
	}

	fn detect(&self, frame: Image) -> Result<IconMatch, AnalyzeError> {
		ensure_frame(frame)?;
		let config = &*self.config;
		config.thresholds.validate()?;
		let Some((first, rest)) = config.templates.split_first() else {
			return Err(AnalyzeError::Catalog(format!(
				"icon `{}` has no templates",
				config.roi.name
			)));
		};

		let crop = crop_roi(frame, &config.roi)?;
		let place = |template: &Template| {
			match_template(crop, template).ok_or_else(|| {
				AnalyzeError::Catalog(format!("an icon template is larger than roi `{}`", config.roi.name))
			})
		};
		let mut best = place(first)?;
		for template in rest {
			let m = place(template)?;
			if m.score > best.score {
				best = m;
			}
		}

		let present = config.thresholds.accepts(best.score);
		tracing::trace!(roi = %config.roi.name, score = best.score, present, "icon match");

		Ok(IconMatch {
			present,
			score: best.score,
			rect: Some(best.rect),
		})
	}
}
