use std::path::Path;

use anyhow::{Context, Result};
use catalog::Catalog;
use serde::Serialize;
use vision::{Detection, Image};

/// Outcome of one analyzer over the frame.
#[derive(Debug, Serialize)]
pub struct Entry {
	pub name: String,
	pub ok: bool,
	pub error: Option<String>,
	pub detection: Option<Detection>,
}

/// Run every analyzer of `catalog` (or only those named in `only`) over `frame`.
pub fn run(catalog: &Catalog, frame: Image, only: &[String]) -> Vec<Entry> {
	let analyzers = catalog.analyzers();
	for name in only {
		if !analyzers.iter().any(|a| a.name() == name) {
			tracing::warn!(name = %name, "no analyzer with this name in the catalog");
		}
	}

	analyzers
		.into_iter()
		.filter(|a| only.is_empty() || only.iter().any(|n| n == a.name()))
		.map(|mut analyzer| {
			analyzer.bind(frame);
			let outcome = analyzer.analyze();
			Entry {
				name: analyzer.name().to_string(),
				ok: outcome.is_ok(),
				detection: outcome.is_ok().then(|| analyzer.detection()),
				error: outcome.err().map(|err| err.to_string()),
			}
		})
		.collect()
}

fn file_name(roi: &str) -> String {
	let stem = roi
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
		.collect::<String>();
	format!("{stem}.png")
}

/// Save the crop of every configured ROI into `dir`, clamped to the frame.
pub fn dump_rois(catalog: &Catalog, frame: Image, dir: &Path) -> Result<usize> {
	std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
	let mut saved = 0;
	for roi in catalog.rois() {
		let r = roi.rect;
		let crop = frame.sub_image(r.x, r.y, r.width, r.height);
		if crop.is_empty() {
			tracing::warn!(roi = %roi.name, rect = ?r, "roi lies outside the frame; nothing to dump");
			continue;
		}
		let path = dir.join(file_name(&roi.name));
		crop.save_png(&path).with_context(|| format!("save {:?}", path))?;
		saved += 1;
	}
	Ok(saved)
}
