use std::path::Path;

use catalog::{Catalog, MANIFEST_FILE};
use image::{Rgba, RgbaImage};
use serde_json::{Value, json};
use vision::{
	Analyzer, Color, Detection, OwnedImage, Phase, Rect, Thresholds,
	analyzers::{icon::IconDetector, smiley::Mood},
};

const BG: [u8; 3] = [24, 26, 34];
const INK: [u8; 3] = [235, 235, 225];
const REST: [u8; 3] = [60, 200, 80];
const WORK: [u8; 3] = [230, 200, 40];
const DISTRACT: [u8; 3] = [220, 50, 50];
const ICON: [u8; 3] = [250, 140, 20];

const ONE: [&str; 5] = [".#.", "##.", ".#.", ".#.", "###"];
const SEVEN: [&str; 5] = ["###", "..#", ".#.", ".#.", ".#."];

fn ink(rows: &[&str], x: u32, y: u32) -> bool {
	rows.get(y as usize).and_then(|r| r.as_bytes().get(x as usize)) == Some(&b'#')
}

fn write_png(dir: &Path, rel: &str, width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) {
	let path = dir.join(rel);
	std::fs::create_dir_all(path.parent().unwrap()).unwrap();
	let img = RgbaImage::from_fn(width, height, |x, y| {
		let [r, g, b] = f(x, y);
		Rgba([r, g, b, 255])
	});
	img.save(path).unwrap();
}

/// Glyph drawn at 2x with a one-pixel margin.
fn write_glyph(dir: &Path, rel: &str, rows: &[&str]) {
	write_png(dir, rel, 8, 12, |x, y| {
		if (1..7).contains(&x) && (1..11).contains(&y) && ink(rows, (x - 1) / 2, (y - 1) / 2) { INK } else { BG }
	});
}

fn icon_pixel(x: u32, y: u32) -> [u8; 3] {
	if (x < 2) ^ (y < 2) { ICON } else { [250, 250, 250] }
}

fn manifest() -> Value {
	json!({
		"reference_height": 30,
		"thresholds": { "accept_threshold": 0.9, "ambiguity_margin": 0.05 },
		"smiley": {
			"slots": [
				{ "name": "slot 1", "x": 2, "y": 2, "width": 6, "height": 6 },
				{ "name": "slot 2", "x": 10, "y": 2, "width": 6, "height": 6 }
			],
			"patterns": [
				{ "mood": "rest", "color": REST },
				{ "mood": "work", "color": WORK },
				{ "mood": "distract", "template": "smiley/distract.png" }
			]
		},
		"counters": {
			"operators": {
				"roi": { "x": 2, "y": 12, "width": 30, "height": 14 },
				"glyphs": { "1": "digits/1.png", "7": "digits/7.png" },
				"thresholds": { "accept_threshold": 0.85, "ambiguity_margin": 0.1 }
			}
		},
		"icons": {
			"drone": { "roi": { "x": 40, "y": 10, "width": 12, "height": 12 }, "templates": ["icons/drone.png"] }
		}
	})
}

fn write_catalog(dir: &Path, manifest: &Value) {
	write_png(dir, "smiley/distract.png", 4, 4, |_, _| DISTRACT);
	write_glyph(dir, "digits/1.png", &ONE);
	write_glyph(dir, "digits/7.png", &SEVEN);
	write_png(dir, "icons/drone.png", 4, 4, icon_pixel);
	std::fs::write(dir.join(MANIFEST_FILE), serde_json::to_string_pretty(manifest).unwrap()).unwrap();
}

/// The 60×30 reference scene, rendered with nearest-neighbour at `scale`.
fn frame(scale: u32) -> OwnedImage {
	let scene = |x: u32, y: u32| -> [u8; 3] {
		if (2..8).contains(&x) && (2..8).contains(&y) {
			return REST;
		}
		if (10..16).contains(&x) && (2..8).contains(&y) {
			return DISTRACT;
		}
		if (14..24).contains(&y) {
			for (x0, rows) in [(5, &ONE), (13, &SEVEN)] {
				if (x0..x0 + 6).contains(&x) && ink(rows, (x - x0) / 2, (y - 14) / 2) {
					return INK;
				}
			}
		}
		if (44..48).contains(&x) && (14..18).contains(&y) {
			return icon_pixel(x - 44, y - 14);
		}
		BG
	};
	OwnedImage::from_fn(60 * scale, 30 * scale, |x, y| Color::from(scene(x / scale, y / scale)))
}

fn run(catalog: &Catalog, frame: &OwnedImage) -> Vec<(String, Detection)> {
	let mut analyzers = catalog.analyzers();
	analyzers
		.iter_mut()
		.map(|analyzer| {
			analyzer.bind(frame.as_image());
			analyzer.analyze().unwrap();
			assert_eq!(analyzer.phase(), Phase::Succeeded);
			(analyzer.name().to_string(), analyzer.detection())
		})
		.collect()
}

#[test]
fn loads_every_section() {
	let dir = tempfile::tempdir().unwrap();
	write_catalog(dir.path(), &manifest());
	let catalog = Catalog::load(dir.path()).unwrap();

	assert_eq!(catalog.reference_height, Some(30));
	let smiley = catalog.smiley.as_ref().unwrap();
	assert_eq!(smiley.slots.len(), 2);
	assert_eq!(smiley.patterns.len(), 3);
	assert_eq!(smiley.thresholds, Thresholds::new(0.9, 0.05));

	let counter = &catalog.counters["operators"];
	assert_eq!(counter.roi.name, "operators");
	assert_eq!(counter.glyphs.iter().map(|g| g.ch).collect::<String>(), "17");
	assert_eq!(counter.thresholds, Thresholds::new(0.85, 0.1));

	assert_eq!(catalog.icons["drone"].templates.len(), 1);
	assert_eq!(catalog.rois().len(), 4);
}

#[test]
fn analyzers_come_in_a_stable_order() {
	let dir = tempfile::tempdir().unwrap();
	let mut manifest = manifest();
	manifest["icons"]["beacon"] = manifest["icons"]["drone"].clone();
	manifest["counters"]["alpha"] = manifest["counters"]["operators"].clone();
	write_catalog(dir.path(), &manifest);

	let catalog = Catalog::load(dir.path()).unwrap();
	let names = catalog.analyzers().iter().map(|a| a.name().to_string()).collect::<Vec<_>>();
	assert_eq!(names, ["smiley", "alpha", "operators", "beacon", "drone"]);
}

#[test]
fn reads_a_reference_frame() {
	let dir = tempfile::tempdir().unwrap();
	write_catalog(dir.path(), &manifest());
	let catalog = Catalog::load(dir.path()).unwrap();

	let results = run(&catalog, &frame(1));
	assert_eq!(results.len(), 3);

	let Detection::Smileys(smileys) = &results[0].1 else { panic!("smileys expected") };
	assert_eq!(smileys.iter().map(|s| s.mood).collect::<Vec<_>>(), [Mood::Rest, Mood::Distract]);

	let Detection::Counter(counter) = &results[1].1 else { panic!("counter expected") };
	assert_eq!(counter.value(), Some(17));

	let Detection::Icon(icon) = &results[2].1 else { panic!("icon expected") };
	assert!(icon.present);
	assert_eq!(icon.rect, Some(Rect::new(44, 14, 4, 4)));
}

#[test]
fn rescaled_catalog_reads_a_larger_frame() {
	let dir = tempfile::tempdir().unwrap();
	write_catalog(dir.path(), &manifest());
	let catalog = Catalog::load(dir.path()).unwrap().rescaled_for(60).unwrap();

	assert_eq!(catalog.reference_height, Some(60));
	assert_eq!(catalog.counters["operators"].roi.rect, Rect::new(4, 24, 60, 28));
	assert_eq!(catalog.icons["drone"].templates[0].width(), 8);

	let results = run(&catalog, &frame(2));
	let Detection::Smileys(smileys) = &results[0].1 else { panic!("smileys expected") };
	assert_eq!(smileys[0].rect, Rect::new(4, 4, 12, 12));
	assert_eq!(smileys.iter().map(|s| s.mood).collect::<Vec<_>>(), [Mood::Rest, Mood::Distract]);
	let Detection::Counter(counter) = &results[1].1 else { panic!("counter expected") };
	assert_eq!(counter.text, "17");
}

#[test]
fn edge_touching_rois_survive_fractional_rescaling() {
	let dir = tempfile::tempdir().unwrap();
	let mut manifest = manifest();
	manifest["icons"]["edge"] = json!({
		"roi": { "x": 45, "y": 0, "width": 15, "height": 30 },
		"templates": ["icons/drone.png"]
	});
	write_catalog(dir.path(), &manifest);

	let catalog = Catalog::load(dir.path()).unwrap().rescaled_for(45).unwrap();
	let edge = &catalog.icons["edge"];
	assert_eq!((edge.roi.rect.right(), edge.roi.rect.bottom()), (90, 45));
	for roi in catalog.rois() {
		assert!(roi.rect.fits_within(90, 45), "{roi:?}");
	}

	let frame = frame(1).resized(90, 45).unwrap();
	let mut analyzer = Analyzer::new(IconDetector::new(edge.clone()));
	analyzer.bind(frame.as_image());
	assert_eq!(analyzer.analyze(), Ok(()));
}

#[test]
fn transparent_background_glyphs_load() {
	let dir = tempfile::tempdir().unwrap();
	write_catalog(dir.path(), &manifest());
	// Dark ink on a fully transparent background, as glyph exports usually are.
	let glyph = RgbaImage::from_fn(8, 12, |x, y| {
		if (1..7).contains(&x) && (1..11).contains(&y) && ink(&ONE, (x - 1) / 2, (y - 1) / 2) {
			Rgba([0, 0, 0, 255])
		} else {
			Rgba([0, 0, 0, 0])
		}
	});
	glyph.save(dir.path().join("digits/1.png")).unwrap();

	let catalog = Catalog::load(dir.path()).unwrap();
	let results = run(&catalog, &frame(1));
	let Detection::Counter(counter) = &results[1].1 else { panic!("counter expected") };
	assert_eq!(counter.text, "17");
}

#[test]
fn rescaling_to_the_reference_height_is_a_noop() {
	let dir = tempfile::tempdir().unwrap();
	write_catalog(dir.path(), &manifest());
	let catalog = Catalog::load(dir.path()).unwrap();
	assert_eq!(catalog.rescaled_for(30).unwrap(), catalog);
	assert!(catalog.rescaled_for(0).is_err());
}

fn load_error(edit: impl FnOnce(&mut Value)) -> String {
	let dir = tempfile::tempdir().unwrap();
	let mut manifest = manifest();
	edit(&mut manifest);
	write_catalog(dir.path(), &manifest);
	format!("{:#}", Catalog::load(dir.path()).unwrap_err())
}

#[test]
fn missing_template_names_the_file() {
	let err = load_error(|m| m["icons"]["drone"]["templates"] = json!(["icons/nope.png"]));
	assert!(err.contains("nope.png"), "{err}");
	assert!(err.contains("icon `drone`"), "{err}");
}

#[test]
fn multi_character_glyph_key_is_rejected() {
	let err = load_error(|m| m["counters"]["operators"]["glyphs"]["17"] = json!("digits/1.png"));
	assert!(err.contains("\"17\""), "{err}");
}

#[test]
fn invalid_threshold_override_is_rejected() {
	let err = load_error(|m| {
		m["smiley"]["thresholds"] = json!({ "accept_threshold": 1.5, "ambiguity_margin": 0.05 });
	});
	assert!(err.contains("accept_threshold"), "{err}");
}

#[test]
fn unrecognized_pattern_is_rejected() {
	let err = load_error(|m| m["smiley"]["patterns"][0]["mood"] = json!("unrecognized"));
	assert!(err.contains("unrecognized"), "{err}");
}

#[test]
fn pattern_needs_exactly_one_source() {
	let err = load_error(|m| m["smiley"]["patterns"][2]["color"] = json!(DISTRACT));
	assert!(err.contains("both"), "{err}");
}

#[test]
fn oversized_template_is_rejected() {
	let err = load_error(|m| m["smiley"]["slots"][0]["width"] = json!(3));
	assert!(err.contains("slot 1"), "{err}");
}

#[test]
fn missing_manifest_fails() {
	let dir = tempfile::tempdir().unwrap();
	assert!(Catalog::load(dir.path()).is_err());
}
