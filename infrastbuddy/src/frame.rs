use std::path::Path;

use anyhow::{Context, Result};
use vision::OwnedImage;

/// Load a captured frame, downscaling it to `max_height` when it is taller.
pub fn load(path: &Path, max_height: Option<u32>) -> Result<OwnedImage> {
	let img = image::open(path)
		.with_context(|| format!("open frame {:?}", path))?
		.to_rgba8();
	let (width, height) = img.dimensions();
	let frame = OwnedImage::try_from_rgba(width, height, img.as_raw()).with_context(|| format!("frame {:?}", path))?;
	fit_height(frame, max_height)
}

pub fn fit_height(frame: OwnedImage, max_height: Option<u32>) -> Result<OwnedImage> {
	let Some(max_height) = max_height.filter(|&h| h > 0 && frame.height() > h) else {
		return Ok(frame);
	};
	let width = (frame.width() as u64 * max_height as u64 / frame.height() as u64) as u32;
	tracing::debug!(
		from = ?(frame.width(), frame.height()),
		to = ?(width, max_height),
		"downscaling capture"
	);
	frame.resized(width, max_height).context("downscale frame")
}
