//! Worker mood classifier.
//!
//! Each configured slot is one operator position in a facility; the smiley
//! drawn there says whether the operator is resting, working or distracted.
//! Slots are classified independently and reported in configuration order,
//! so callers can index the result by slot position.

use std::sync::Arc;

use crate::{
	AnalyzeError, Analyzer, Detector, Image, Rect, Roi,
	analyzers::{crop_roi, ensure_frame},
	matching::{Pattern, Thresholds, decide},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
	Rest,
	Work,
	Distract,
	/// No pattern matched confidently, or two matched equally well.
	Unrecognized,
}

impl Mood {
	/// Every class a pattern may stand for.
	pub const RECOGNIZABLE: [Mood; 3] = [Mood::Rest, Mood::Work, Mood::Distract];

	#[inline]
	pub fn is_recognized(self) -> bool {
		self != Mood::Unrecognized
	}
}

/// Classification of one slot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Smiley {
	pub slot: String,
	pub mood: Mood,
	pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoodPattern {
	pub mood: Mood,
	pub pattern: Pattern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmileyConfig {
	/// Slot ROIs, left to right.
	pub slots: Vec<Roi>,
	pub patterns: Vec<MoodPattern>,
	pub thresholds: Thresholds,
}

impl SmileyConfig {
	pub fn scaled(&self, s: f32) -> anyhow::Result<Self> {
		Ok(Self {
			slots: self.slots.iter().map(|roi| roi.scaled(s)).collect(),
			patterns: self
				.patterns
				.iter()
				.map(|p| {
					Ok(MoodPattern {
						mood: p.mood,
						pattern: p.pattern.scaled(s)?,
					})
				})
				.collect::<anyhow::Result<_>>()?,
			thresholds: self.thresholds,
		})
	}

	fn validate_patterns(&self) -> Result<(), AnalyzeError> {
		if self.patterns.is_empty() {
			return Err(AnalyzeError::Catalog("no smiley patterns".into()));
		}
		if self.patterns.iter().any(|p| !p.mood.is_recognized()) {
			return Err(AnalyzeError::Catalog("a smiley pattern is tagged `unrecognized`".into()));
		}
		Ok(())
	}
}

#[derive(Debug, Clone)]
pub struct SmileyDetector {
	config: Arc<SmileyConfig>,
}

pub type SmileyAnalyzer<'f> = Analyzer<'f, SmileyDetector>;

impl SmileyDetector {
	pub fn new(config: Arc<SmileyConfig>) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &SmileyConfig {
		&self.config
	}

	fn classify(&self, roi: &Roi, crop: Image) -> Smiley {
		let config = &*self.config;
		let scores = Mood::RECOGNIZABLE.into_iter().filter_map(|mood| {
			config
				.patterns
				.iter()
				.filter(|p| p.mood == mood)
				.filter_map(|p| p.pattern.score(crop))
				.reduce(f32::max)
				.map(|score| (mood, score))
		});

		let verdict = decide(scores, config.thresholds);
		tracing::trace!(slot = %roi.name, ?verdict, "smiley verdict");

		Smiley {
			slot: roi.name.clone(),
			mood: verdict.into_class().unwrap_or(Mood::Unrecognized),
			rect: roi.rect,
		}
	}
}

impl Detector for SmileyDetector {
	type Output = Vec<Smiley>;

	fn name(&self) -> &str {
		"smiley"
	}

	fn detect(&self, frame: Image) -> Result<Vec<Smiley>, AnalyzeError> {
		ensure_frame(frame)?;
		let config = &*self.config;
		if config.slots.is_empty() {
			return Ok(Vec::new());
		}
		config.thresholds.validate()?;
		config.validate_patterns()?;

		// Every slot is checked before any is classified.
		let crops = config
			.slots
			.iter()
			.map(|roi| crop_roi(frame, roi).map(|crop| (roi, crop)))
			.collect::<Result<Vec<_>, _>>()?;

		for (roi, crop) in &crops {
			if config.patterns.iter().any(|p| !p.pattern.fits(crop.width(), crop.height())) {
				return Err(AnalyzeError::Catalog(format!(
					"a smiley template is larger than slot `{}`",
					roi.name
				)));
			}
		}

		Ok(crops
			.into_iter()
			.map(|(roi, crop)| self.classify(roi, crop))
			.collect())
	}
}
