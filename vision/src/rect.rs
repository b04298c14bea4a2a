/// Axis-aligned rectangle in frame coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub struct Rect {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

impl Rect {
	pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
		Self { x, y, width, height }
	}

	#[inline]
	pub fn right(&self) -> u32 {
		self.x + self.width
	}

	#[inline]
	pub fn bottom(&self) -> u32 {
		self.y + self.height
	}

	#[inline]
	pub fn area(&self) -> u64 {
		self.width as u64 * self.height as u64
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}

	/// Whether the rectangle is non-empty and lies fully inside a `width`×`height` grid.
	pub fn fits_within(&self, width: u32, height: u32) -> bool {
		if self.is_empty() {
			return false;
		}
		let right = self.x.checked_add(self.width);
		let bottom = self.y.checked_add(self.height);
		matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
	}

	/// Scale the edges by `s`; non-zero sides never collapse below one pixel.
	///
	/// Edges are rounded, not extents, so a rectangle touching the right or
	/// bottom of a frame still touches it after both are scaled.
	pub fn scaled(&self, s: f32) -> Self {
		let (x, width) = scale_span(self.x, self.width, s);
		let (y, height) = scale_span(self.y, self.height, s);
		Self { x, y, width, height }
	}
}

fn scale_span(start: u32, len: u32, s: f32) -> (u32, u32) {
	let a = (start as f32 * s).round() as u32;
	if len == 0 {
		return (a, 0);
	}
	let b = ((start as u64 + len as u64) as f32 * s).round() as u32;
	(a, b.saturating_sub(a).max(1))
}

#[inline]
pub(crate) fn px(base: u32, s: f32) -> u32 {
	if base == 0 {
		0
	} else {
		((base as f32) * s).round().max(1.0) as u32
	}
}

/// A rectangle named by its semantic role ("slot 3 mood icon").
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Roi {
	pub name: String,
	#[serde(flatten)]
	pub rect: Rect,
}

impl Roi {
	pub fn new(name: impl Into<String>, rect: Rect) -> Self {
		Self {
			name: name.into(),
			rect,
		}
	}

	pub fn scaled(&self, s: f32) -> Self {
		Self {
			name: self.name.clone(),
			rect: self.rect.scaled(s),
		}
	}
}
