//! The uniform analyzer lifecycle.
//!
//! A [`Detector`] is the pure algorithm of one visual-pattern family. An
//! [`Analyzer`] wraps a detector with the bind/analyze/result lifecycle:
//!
//! ```text
//! Unbound --bind--> Bound --analyze--> Analyzed(success | failure)
//!                     ^                     |
//!                     +-------bind----------+
//! ```
//!
//! Controllers that mix analyzer families hold them as
//! `Box<dyn FrameAnalyzer<'f> + 'f>` and read results through [`Detection`].

use crate::{AnalyzeError, Detection, Image};

/// The detection algorithm of one visual-pattern family.
///
/// `detect` must be a pure function of the frame and the detector's
/// configuration, so repeated calls on the same frame agree.
pub trait Detector {
	type Output: Clone + Default + std::fmt::Debug;

	fn name(&self) -> &str;

	fn detect(&self, frame: Image) -> Result<Self::Output, AnalyzeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Unbound,
	Bound,
	Succeeded,
	Failed,
}

#[derive(Debug)]
enum State<'f, T> {
	Unbound,
	Bound(Image<'f>),
	Analyzed {
		frame: Image<'f>,
		outcome: Result<T, AnalyzeError>,
	},
}

/// A detector plus the frame it is bound to and its latest result.
///
/// The frame is borrowed, never copied, and must outlive the analyzer's use
/// of it. To reuse a configured detector with a frame of a different
/// lifetime, take it back with [`Analyzer::into_detector`].
#[derive(Debug)]
pub struct Analyzer<'f, D: Detector> {
	detector: D,
	state: State<'f, D::Output>,
	empty: D::Output,
}

impl<'f, D: Detector> Analyzer<'f, D> {
	pub fn new(detector: D) -> Self {
		Self {
			detector,
			state: State::Unbound,
			empty: D::Output::default(),
		}
	}

	/// Bind a frame for the next pass, discarding any previous frame and result.
	pub fn bind(&mut self, frame: Image<'f>) {
		self.state = State::Bound(frame);
	}

	/// Run the detector over the bound frame.
	///
	/// The returned signal is what callers must check; [`Analyzer::result`]
	/// stays empty after a failure.
	pub fn analyze(&mut self) -> Result<(), AnalyzeError> {
		self.run()
	}

	/// The latest successful result, or the empty default otherwise.
	pub fn result(&self) -> &D::Output {
		match &self.state {
			State::Analyzed { outcome: Ok(output), .. } => output,
			_ => &self.empty,
		}
	}

	pub fn failure(&self) -> Option<&AnalyzeError> {
		match &self.state {
			State::Analyzed { outcome: Err(err), .. } => Some(err),
			_ => None,
		}
	}

	pub fn phase(&self) -> Phase {
		match &self.state {
			State::Unbound => Phase::Unbound,
			State::Bound(_) => Phase::Bound,
			State::Analyzed { outcome: Ok(_), .. } => Phase::Succeeded,
			State::Analyzed { outcome: Err(_), .. } => Phase::Failed,
		}
	}

	pub fn detector(&self) -> &D {
		&self.detector
	}

	/// Release the bound frame and hand the detector back.
	pub fn into_detector(self) -> D {
		self.detector
	}

	fn run(&mut self) -> Result<(), AnalyzeError> {
		let frame = match &self.state {
			State::Unbound => {
				tracing::warn!(analyzer = self.detector.name(), "analyze called without a bound frame");
				return Err(AnalyzeError::Unbound);
			}
			State::Bound(frame) | State::Analyzed { frame, .. } => *frame,
		};

		let outcome = self.detector.detect(frame);
		let signal = match &outcome {
			Ok(output) => {
				tracing::debug!(analyzer = self.detector.name(), ?output, "analysis succeeded");
				Ok(())
			}
			Err(err) => {
				tracing::warn!(analyzer = self.detector.name(), error = %err, "analysis failed");
				Err(err.clone())
			}
		};
		self.state = State::Analyzed { frame, outcome };
		signal
	}
}

/// Object-safe view of any [`Analyzer`], for controllers running mixed families.
pub trait FrameAnalyzer<'f>: Send {
	fn name(&self) -> &str;

	fn bind(&mut self, frame: Image<'f>);

	fn analyze(&mut self) -> Result<(), AnalyzeError>;

	/// The latest result as a tagged [`Detection`]; empty unless the last pass succeeded.
	fn detection(&self) -> Detection;

	fn phase(&self) -> Phase;
}

impl<'f, D> FrameAnalyzer<'f> for Analyzer<'f, D>
where
	D: Detector + Send,
	D::Output: Into<Detection> + Send,
{
	fn name(&self) -> &str {
		self.detector.name()
	}

	fn bind(&mut self, frame: Image<'f>) {
		Analyzer::bind(self, frame);
	}

	fn analyze(&mut self) -> Result<(), AnalyzeError> {
		self.run()
	}

	fn detection(&self) -> Detection {
		self.result().clone().into()
	}

	fn phase(&self) -> Phase {
		Analyzer::phase(self)
	}
}
