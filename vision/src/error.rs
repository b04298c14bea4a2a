use thiserror::Error;

use crate::Rect;

/// Why an analysis pass could not produce a usable result.
///
/// Low-confidence matches are never errors; they surface as explicit
/// "unrecognized" outcomes inside the result instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzeError {
	#[error("no frame bound")]
	Unbound,
	#[error("frame is empty ({width}x{height})")]
	EmptyFrame { width: u32, height: u32 },
	#[error("roi `{roi}` {rect:?} lies outside the {width}x{height} frame")]
	RoiOutOfBounds {
		roi: String,
		rect: Rect,
		width: u32,
		height: u32,
	},
	#[error("catalog defect: {0}")]
	Catalog(String),
	#[error("invalid thresholds: {0}")]
	InvalidThresholds(String),
	#[error("no glyphs found in roi `{roi}`")]
	NoGlyphs { roi: String },
	#[error("glyph {index} in roi `{roi}` is unreadable")]
	UnreadableGlyph { roi: String, index: usize },
}
