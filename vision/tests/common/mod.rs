#![allow(dead_code)]

use vision::{
	Color, OwnedImage, Rect, Roi, Template, Thresholds,
	analyzers::{
		counter::{CounterConfig, GlyphTemplate},
		icon::IconConfig,
		smiley::{Mood, MoodPattern, SmileyConfig},
	},
	matching::Pattern,
};

pub const BG: Color = Color::new(24, 26, 34);
pub const INK: Color = Color::new(235, 235, 225);
pub const SCALE: u32 = 2;

pub const THRESHOLDS: Thresholds = Thresholds::new(0.9, 0.05);

/// 5×7 digits.
pub const DIGITS: [[&str; 7]; 10] = [
	[".###.", "#...#", "#..##", "#.#.#", "##..#", "#...#", ".###."],
	["..#..", ".##..", "..#..", "..#..", "..#..", "..#..", ".###."],
	[".###.", "#...#", "....#", "...#.", "..#..", ".#...", "#####"],
	["#####", "...#.", "..#..", "...#.", "....#", "#...#", ".###."],
	["...#.", "..##.", ".#.#.", "#..#.", "#####", "...#.", "...#."],
	["#####", "#....", "####.", "....#", "....#", "#...#", ".###."],
	["..##.", ".#...", "#....", "####.", "#...#", "#...#", ".###."],
	["#####", "....#", "...#.", "..#..", ".#...", ".#...", ".#..."],
	[".###.", "#...#", "#...#", ".###.", "#...#", "#...#", ".###."],
	[".###.", "#...#", "#...#", ".####", "....#", "...#.", ".##.."],
];

pub const SLASH: [&str; 7] = ["....#", "....#", "...#.", "..#..", ".#...", "#....", "#...."];

pub const BLOCK: [&str; 7] = ["#####", "#####", "#####", "#####", "#####", "#####", "#####"];

fn ink_at(rows: &[&str], x: u32, y: u32) -> bool {
	rows.get((y / SCALE) as usize)
		.and_then(|r| r.as_bytes().get((x / SCALE) as usize))
		== Some(&b'#')
}

/// Draw `glyphs` left to right starting at (x0, y0), one blank column between them.
pub fn draw_text(width: u32, height: u32, x0: u32, y0: u32, glyphs: &[&[&str]]) -> OwnedImage {
	let pitch = 6 * SCALE;
	OwnedImage::from_fn(width, height, |x, y| {
		if x < x0 || y < y0 {
			return BG;
		}
		let (dx, dy) = (x - x0, y - y0);
		let index = (dx / pitch) as usize;
		match glyphs.get(index) {
			Some(rows) if ink_at(rows, dx % pitch, dy) => INK,
			_ => BG,
		}
	})
}

/// A glyph rendered alone with a one-pixel margin, as shipped in a catalog.
pub fn glyph_image(rows: &[&str]) -> OwnedImage {
	let (w, h) = (5 * SCALE + 2, 7 * SCALE + 2);
	OwnedImage::from_fn(w, h, |x, y| {
		if x == 0 || y == 0 || x > 5 * SCALE || y > 7 * SCALE {
			BG
		} else if ink_at(rows, x - 1, y - 1) {
			INK
		} else {
			BG
		}
	})
}

pub fn digit_templates(skip: &[usize]) -> Vec<GlyphTemplate> {
	let mut templates = (0..10)
		.filter(|d| !skip.contains(d))
		.map(|d| {
			let ch = char::from_digit(d as u32, 10).unwrap();
			GlyphTemplate::from_image(ch, glyph_image(&DIGITS[d]).as_image()).unwrap()
		})
		.collect::<Vec<_>>();
	templates.push(GlyphTemplate::from_image('/', glyph_image(&SLASH).as_image()).unwrap());
	templates
}

pub fn counter_config(roi: Rect, skip: &[usize]) -> CounterConfig {
	CounterConfig {
		roi: Roi::new("operators", roi),
		glyphs: digit_templates(skip),
		thresholds: THRESHOLDS,
	}
}

pub fn mood_color(mood: Mood) -> Color {
	match mood {
		Mood::Rest => Color::new(60, 200, 80),
		Mood::Work => Color::new(230, 200, 40),
		Mood::Distract => Color::new(220, 50, 50),
		Mood::Unrecognized => BG,
	}
}

/// 8×8 smiley: a ring face with two eyes.
pub fn smiley(mood: Mood) -> OwnedImage {
	OwnedImage::from_fn(8, 8, |x, y| {
		let ring = (x == 0 || x == 7 || y == 0 || y == 7) && !matches!((x, y), (0, 0) | (7, 0) | (0, 7) | (7, 7));
		let eye = y == 2 && (x == 2 || x == 5);
		let mouth = y == 5 && (2..6).contains(&x);
		if ring || eye || mouth { mood_color(mood) } else { BG }
	})
}

pub fn smiley_patterns() -> Vec<MoodPattern> {
	Mood::RECOGNIZABLE
		.into_iter()
		.map(|mood| MoodPattern {
			mood,
			pattern: Pattern::Image(Template::new(smiley(mood)).unwrap()),
		})
		.collect()
}

pub fn icon() -> OwnedImage {
	OwnedImage::from_fn(6, 6, |x, y| match (x, y) {
		(0 | 5, _) | (_, 0 | 5) => Color::new(250, 250, 250),
		(2 | 3, 2 | 3) => Color::new(240, 120, 20),
		_ => Color::new(30, 60, 140),
	})
}

pub struct Screen {
	pub image: OwnedImage,
	pub smiley: SmileyConfig,
	pub counter: CounterConfig,
	pub icon: IconConfig,
}

/// A facility panel: four operator slots, an occupancy counter and a status icon.
pub fn screen(moods: [Mood; 4], text: &[&[&str]], icon_shown: bool) -> Screen {
	let (width, height) = (120, 60);
	let slots = (0..4u32)
		.map(|i| Roi::new(format!("slot {}", i + 1), Rect::new(4 + i * 14, 4, 12, 12)))
		.collect::<Vec<_>>();
	let counter_roi = Rect::new(4, 24, 64, 20);
	let icon_roi = Rect::new(90, 20, 16, 16);

	let faces = moods.map(smiley);
	let digits = draw_text(counter_roi.width, counter_roi.height, 3, 3, text);
	let icon_img = icon();

	let image = OwnedImage::from_fn(width, height, |x, y| {
		for (slot, face) in slots.iter().zip(&faces) {
			let (fx, fy) = (slot.rect.x + 2, slot.rect.y + 2);
			if (fx..fx + 8).contains(&x) && (fy..fy + 8).contains(&y) {
				return face.as_image().get(x - fx, y - fy);
			}
		}
		if (counter_roi.x..counter_roi.right()).contains(&x) && (counter_roi.y..counter_roi.bottom()).contains(&y) {
			return digits.as_image().get(x - counter_roi.x, y - counter_roi.y);
		}
		let (ix, iy) = (icon_roi.x + 5, icon_roi.y + 4);
		if icon_shown && (ix..ix + 6).contains(&x) && (iy..iy + 6).contains(&y) {
			return icon_img.as_image().get(x - ix, y - iy);
		}
		BG
	});

	Screen {
		image,
		smiley: SmileyConfig {
			slots,
			patterns: smiley_patterns(),
			thresholds: THRESHOLDS,
		},
		counter: CounterConfig {
			roi: Roi::new("operators", counter_roi),
			glyphs: digit_templates(&[]),
			thresholds: THRESHOLDS,
		},
		icon: IconConfig {
			roi: Roi::new("drone", icon_roi),
			templates: vec![Template::new(icon()).unwrap()],
			thresholds: THRESHOLDS,
		},
	}
}
