//! Pixel-only perception for a game client.
//!
//! Every analyzer borrows one captured frame, samples its configured regions
//! and reports a typed result or an explicit failure. Analyzers never copy,
//! mutate or retain the frame past the pass they are bound for.

mod image;
pub use image::*;
mod error;
pub use error::AnalyzeError;
mod rect;
pub use rect::{Rect, Roi};

pub mod analyzer;
pub use analyzer::{Analyzer, Detector, FrameAnalyzer, Phase};
pub mod analyzers;
pub use analyzers::Detection;
pub mod matching;
pub use matching::{Pattern, Template, Thresholds};
