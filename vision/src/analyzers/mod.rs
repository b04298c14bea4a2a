//! Concrete analyzers, one per visual-pattern family.

pub mod counter;
pub mod icon;
pub mod smiley;

use crate::{AnalyzeError, Image};

/// Tagged result of any analyzer, for controllers that mix families.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum Detection {
	Smileys(Vec<smiley::Smiley>),
	Counter(counter::Counter),
	Icon(icon::IconMatch),
}

impl From<Vec<smiley::Smiley>> for Detection {
	fn from(v: Vec<smiley::Smiley>) -> Self {
		Self::Smileys(v)
	}
}

impl From<counter::Counter> for Detection {
	fn from(v: counter::Counter) -> Self {
		Self::Counter(v)
	}
}

impl From<icon::IconMatch> for Detection {
	fn from(v: icon::IconMatch) -> Self {
		Self::Icon(v)
	}
}

fn ensure_frame(frame: Image) -> Result<(), AnalyzeError> {
	if frame.is_empty() {
		return Err(AnalyzeError::EmptyFrame {
			width: frame.width(),
			height: frame.height(),
		});
	}
	Ok(())
}

/// Strict ROI crop; an ROI outside the frame is a configuration mismatch.
fn crop_roi<'a>(frame: Image<'a>, roi: &crate::Roi) -> Result<Image<'a>, AnalyzeError> {
	frame.crop(roi.rect).ok_or_else(|| AnalyzeError::RoiOutOfBounds {
		roi: roi.name.clone(),
		rect: roi.rect,
		width: frame.width(),
		height: frame.height(),
	})
}
