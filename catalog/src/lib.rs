//! Region/Template Catalog.
//!
//! A catalog directory holds `catalog.json` and the PNG templates it refers
//! to by relative path. Everything is read and validated in [`Catalog::load`];
//! after that the catalog is immutable and shared by every analyzer.

use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
	sync::Arc,
};

use anyhow::{Context, Result, bail, ensure};
use vision::{
	Analyzer, Color, FrameAnalyzer, Pattern, Roi, Template, Thresholds,
	analyzers::{
		counter::{CounterConfig, CounterDetector, GlyphTemplate},
		icon::{IconConfig, IconDetector},
		smiley::{MoodPattern, SmileyConfig, SmileyDetector},
	},
};

pub mod schema;
use schema::{CounterSection, IconSection, Manifest, PatternEntry, SmileySection};

pub const MANIFEST_FILE: &str = "catalog.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
	/// Frame height the ROIs and templates currently correspond to.
	pub reference_height: Option<u32>,
	pub smiley: Option<Arc<SmileyConfig>>,
	pub counters: BTreeMap<String, Arc<CounterConfig>>,
	pub icons: BTreeMap<String, Arc<IconConfig>>,
}

impl Catalog {
	/// Read `catalog.json` from `dir` and every template it names.
	pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
		let dir = dir.as_ref();
		let path = dir.join(MANIFEST_FILE);
		let json = fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
		let manifest: Manifest = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
		let catalog = Self::from_manifest(manifest, dir).with_context(|| format!("load catalog {:?}", dir))?;

		tracing::debug!(
			dir = %dir.display(),
			smiley_slots = catalog.smiley.as_ref().map_or(0, |s| s.slots.len()),
			counters = catalog.counters.len(),
			icons = catalog.icons.len(),
			"catalog loaded"
		);
		Ok(catalog)
	}

	/// Build a catalog from a parsed manifest, resolving template paths against `dir`.
	pub fn from_manifest(manifest: Manifest, dir: &Path) -> Result<Self> {
		let loader = Loader {
			dir,
			alpha_threshold: manifest.alpha_threshold,
			thresholds: manifest.thresholds,
		};
		loader.thresholds.validate().context("catalog thresholds")?;
		if let Some(height) = manifest.reference_height {
			ensure!(height > 0, "reference_height must be positive");
		}

		let smiley = match manifest.smiley {
			Some(section) => Some(Arc::new(loader.smiley(section).context("smiley")?)),
			None => None,
		};

		let mut counters = BTreeMap::new();
		for (key, section) in manifest.counters {
			let config = loader.counter(&key, section).with_context(|| format!("counter `{key}`"))?;
			counters.insert(key, Arc::new(config));
		}

		let mut icons = BTreeMap::new();
		for (key, section) in manifest.icons {
			let config = loader.icon(&key, section).with_context(|| format!("icon `{key}`"))?;
			icons.insert(key, Arc::new(config));
		}

		Ok(Self {
			reference_height: manifest.reference_height,
			smiley,
			counters,
			icons,
		})
	}

	/// Scale every ROI and image template from the reference height to `frame_height`.
	///
	/// Returns an unchanged copy when there is no reference height or it already matches.
	pub fn rescaled_for(&self, frame_height: u32) -> Result<Self> {
		ensure!(frame_height > 0, "frame height must be positive");
		let Some(reference) = self.reference_height else {
			return Ok(self.clone());
		};
		if reference == frame_height {
			return Ok(self.clone());
		}

		let s = frame_height as f32 / reference as f32;
		tracing::debug!(reference, frame_height, scale = s, "rescaling catalog");

		let smiley = match &self.smiley {
			Some(config) => Some(Arc::new(config.scaled(s).context("rescale smiley")?)),
			None => None,
		};
		let counters = self
			.counters
			.iter()
			.map(|(key, config)| (key.clone(), Arc::new(config.scaled(s))))
			.collect();
		let icons = self
			.icons
			.iter()
			.map(|(key, config)| Ok((key.clone(), Arc::new(config.scaled(s).with_context(|| format!("rescale icon `{key}`"))?))))
			.collect::<Result<_>>()?;

		Ok(Self {
			reference_height: Some(frame_height),
			smiley,
			counters,
			icons,
		})
	}

	/// One analyzer per configured family member: smiley, counters by key, icons by key.
	pub fn analyzers<'f>(&self) -> Vec<Box<dyn FrameAnalyzer<'f> + 'f>> {
		let mut analyzers: Vec<Box<dyn FrameAnalyzer<'f> + 'f>> = Vec::new();
		if let Some(config) = &self.smiley {
			analyzers.push(Box::new(Analyzer::new(SmileyDetector::new(config.clone()))));
		}
		for config in self.counters.values() {
			analyzers.push(Box::new(Analyzer::new(CounterDetector::new(config.clone()))));
		}
		for config in self.icons.values() {
			analyzers.push(Box::new(Analyzer::new(IconDetector::new(config.clone()))));
		}
		analyzers
	}

	/// Every configured ROI, in the same order as [`Catalog::analyzers`].
	pub fn rois(&self) -> Vec<&Roi> {
		let mut rois = Vec::new();
		if let Some(config) = &self.smiley {
			rois.extend(config.slots.iter());
		}
		rois.extend(self.counters.values().map(|c| &c.roi));
		rois.extend(self.icons.values().map(|c| &c.roi));
		rois
	}
}

// ----------

struct Loader<'a> {
	dir: &'a Path,
	alpha_threshold: u8,
	thresholds: Thresholds,
}

impl Loader<'_> {
	fn path(&self, rel: &Path) -> PathBuf {
		self.dir.join(rel)
	}

	fn read(&self, rel: &Path) -> Result<Vec<u8>> {
		let path = self.path(rel);
		fs::read(&path).with_context(|| format!("read {:?}", path))
	}

	fn template(&self, rel: &Path) -> Result<Template> {
		let bytes = self.read(rel)?;
		Template::from_png(&bytes, self.alpha_threshold).with_context(|| format!("decode {:?}", self.path(rel)))
	}

	fn thresholds(&self, overridden: Option<Thresholds>) -> Result<Thresholds> {
		let thresholds = overridden.unwrap_or(self.thresholds);
		thresholds.validate()?;
		Ok(thresholds)
	}

	fn pattern(&self, entry: &PatternEntry) -> Result<Pattern> {
		match (&entry.template, entry.color) {
			(Some(path), None) => Ok(Pattern::Image(self.template(path)?)),
			(None, Some(color)) => Ok(Pattern::Color(Color::from(color))),
			(Some(_), Some(_)) => bail!("pattern for `{:?}` has both a template and a color", entry.mood),
			(None, None) => bail!("pattern for `{:?}` has neither a template nor a color", entry.mood),
		}
	}

	fn smiley(&self, section: SmileySection) -> Result<SmileyConfig> {
		let thresholds = self.thresholds(section.thresholds)?;
		ensure!(
			section.slots.is_empty() || !section.patterns.is_empty(),
			"slots are configured but there are no patterns"
		);

		let mut patterns = Vec::with_capacity(section.patterns.len());
		for (i, entry) in section.patterns.iter().enumerate() {
			ensure!(entry.mood.is_recognized(), "pattern {i} is tagged `unrecognized`");
			let pattern = self.pattern(entry).with_context(|| format!("pattern {i}"))?;
			patterns.push(MoodPattern { mood: entry.mood, pattern });
		}

		for slot in &section.slots {
			ensure!(!slot.rect.is_empty(), "slot `{}` has zero area", slot.name);
			ensure!(
				patterns.iter().all(|p| p.pattern.fits(slot.rect.width, slot.rect.height)),
				"a template is larger than slot `{}`",
				slot.name
			);
		}

		Ok(SmileyConfig {
			slots: section.slots,
			patterns,
			thresholds,
		})
	}

	fn counter(&self, key: &str, section: CounterSection) -> Result<CounterConfig> {
		let thresholds = self.thresholds(section.thresholds)?;
		ensure!(!section.roi.is_empty(), "roi has zero area");
		ensure!(!section.glyphs.is_empty(), "no glyph templates");

		let mut glyphs = Vec::with_capacity(section.glyphs.len());
		for (name, rel) in &section.glyphs {
			let mut chars = name.chars();
			let (Some(ch), None) = (chars.next(), chars.next()) else {
				bail!("glyph key {name:?} is not a single character");
			};
			let bytes = self.read(rel)?;
			let glyph = GlyphTemplate::from_png(ch, &bytes, self.alpha_threshold).with_context(|| format!("decode {:?}", self.path(rel)))?;
			glyphs.push(glyph);
		}

		Ok(CounterConfig {
			roi: Roi::new(key, section.roi),
			glyphs,
			thresholds,
		})
	}

	fn icon(&self, key: &str, section: IconSection) -> Result<IconConfig> {
		let thresholds = self.thresholds(section.thresholds)?;
		ensure!(!section.roi.is_empty(), "roi has zero area");
		ensure!(!section.templates.is_empty(), "no templates");

		let templates = section
			.templates
			.iter()
			.map(|rel| self.template(rel))
			.collect::<Result<Vec<_>>>()?;
		ensure!(
			templates.iter().all(|t| t.width() <= section.roi.width && t.height() <= section.roi.height),
			"a template is larger than the roi"
		);

		Ok(IconConfig {
			roi: Roi::new(key, section.roi),
			templates,
			thresholds,
		})
	}
}
