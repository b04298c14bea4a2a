//! On-disk shape of `catalog.json`.

use std::{collections::BTreeMap, path::PathBuf};

use serde::Deserialize;
use vision::{Rect, Roi, Thresholds, analyzers::smiley::Mood};

fn default_alpha_threshold() -> u8 {
	128
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
	/// Frame height the ROIs and templates were captured at.
	pub reference_height: Option<u32>,
	/// Template pixels with at least this alpha take part in matching.
	#[serde(default = "default_alpha_threshold")]
	pub alpha_threshold: u8,
	pub thresholds: Thresholds,
	#[serde(default)]
	pub smiley: Option<SmileySection>,
	#[serde(default)]
	pub counters: BTreeMap<String, CounterSection>,
	#[serde(default)]
	pub icons: BTreeMap<String, IconSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmileySection {
	pub slots: Vec<Roi>,
	pub patterns: Vec<PatternEntry>,
	#[serde(default)]
	pub thresholds: Option<Thresholds>,
}

/// One reference pattern: either `template` or `color` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternEntry {
	pub mood: Mood,
	#[serde(default)]
	pub template: Option<PathBuf>,
	#[serde(default)]
	pub color: Option<[u8; 3]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterSection {
	pub roi: Rect,
	/// Single character -> template path.
	pub glyphs: BTreeMap<String, PathBuf>,
	#[serde(default)]
	pub thresholds: Option<Thresholds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IconSection {
	pub roi: Rect,
	pub templates: Vec<PathBuf>,
	#[serde(default)]
	pub thresholds: Option<Thresholds>,
}
