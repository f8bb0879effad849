use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use spot_diff::{
    BoundingBox, ChangeDetector, DiffConfig, MarkerStyle, Strategy,
    error::{DiffError, Result},
    io::{FsExporter, FsLoader, ImageDisplay, ImageLoader},
};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

fn solid(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, color)
}

fn with_squares(base: &RgbImage, squares: &[(u32, u32, u32)], color: Rgb<u8>) -> RgbImage {
    let mut image = base.clone();
    for &(x0, y0, side) in squares {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                image.put_pixel(x, y, color);
            }
        }
    }
    image
}

fn textured(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) * 3 % 256) as u8])
    })
}

fn dynamic(image: RgbImage) -> DynamicImage {
    DynamicImage::ImageRgb8(image)
}

fn detector(config: DiffConfig) -> ChangeDetector {
    ChangeDetector::new().with_config(config)
}

fn scenario_b_config() -> DiffConfig {
    DiffConfig {
        sensitivity: 15,
        min_area: 50,
        padding: 5,
        ..DiffConfig::default()
    }
}

#[test]
fn identical_solid_images_have_no_changes() {
    let image = dynamic(solid(100, 100, Rgb([80, 120, 40])));
    let config = DiffConfig {
        sensitivity: 1,
        min_area: 50,
        ..DiffConfig::default()
    };

    let result = detector(config).detect(&image, &image).unwrap();

    assert_eq!(result.region_count(), 0);
    assert!(!result.has_changes());
    assert_eq!(result.mask.changed_pixels(), 0);
}

#[test]
fn image_against_itself_is_clean_for_every_strategy() {
    let image = dynamic(textured(64, 48));

    for strategy in [Strategy::MultiColorspace, Strategy::Gradient] {
        for sensitivity in [0, 1, 30, 255] {
            let config = DiffConfig {
                strategy,
                sensitivity,
                min_area: 1,
                ..DiffConfig::default()
            };
            let result = detector(config).detect(&image, &image).unwrap();
            assert_eq!(result.region_count(), 0);
        }
    }
}

#[test]
fn inserted_red_square_is_one_region() {
    let original = solid(200, 200, WHITE);
    let modified = with_squares(&original, &[(10, 10, 20)], RED);
    let config = DiffConfig {
        morph_iterations: 0,
        ..scenario_b_config()
    };

    let result = detector(config).detect(&dynamic(original), &dynamic(modified)).unwrap();

    assert_eq!(result.region_count(), 1);
    let region = &result.regions[0];
    assert_eq!(region.id, 1);
    assert_eq!(region.bounds, BoundingBox { x: 10, y: 10, width: 20, height: 20 });
    assert_eq!(region.area, 400);
    assert_eq!(region.padded, BoundingBox { x: 5, y: 5, width: 30, height: 30 });
}

#[test]
fn inserted_red_square_with_default_cleanup_is_close() {
    let original = solid(200, 200, WHITE);
    let modified = with_squares(&original, &[(10, 10, 20)], RED);

    let result = detector(scenario_b_config())
        .detect(&dynamic(original), &dynamic(modified))
        .unwrap();

    assert_eq!(result.region_count(), 1);
    let b = result.regions[0].bounds;
    // Two dilation passes of radius one grow each side by two pixels.
    assert_eq!(b, BoundingBox { x: 8, y: 8, width: 24, height: 24 });
    assert_eq!(result.regions[0].area, 24 * 24);
    assert_eq!(result.regions[0].padded, BoundingBox { x: 3, y: 3, width: 34, height: 34 });
}

#[test]
fn small_changes_are_filtered_out() {
    let original = solid(100, 100, WHITE);
    let modified = with_squares(&original, &[(10, 10, 10), (60, 60, 10)], Rgb([0, 0, 0]));
    let config = DiffConfig {
        min_area: 200,
        ..DiffConfig::default()
    };

    let result = detector(config).detect(&dynamic(original), &dynamic(modified)).unwrap();

    assert!(result.mask.changed_pixels() > 0);
    assert_eq!(result.raw_region_count, 2);
    assert_eq!(result.region_count(), 0);
}

#[test]
fn mismatched_dimensions_are_resized() {
    let original = dynamic(solid(100, 100, Rgb([10, 200, 30])));
    let modified = dynamic(solid(120, 80, Rgb([10, 200, 30])));

    let result = detector(DiffConfig::default()).detect(&original, &modified).unwrap();

    assert!(result.resized);
    assert_eq!(result.modified.dimensions(), (100, 100));
    assert_eq!(result.annotated.dimensions(), (100, 100));
}

#[test]
fn swapping_inputs_keeps_region_geometry() {
    let a = solid(150, 150, WHITE);
    let b = with_squares(&a, &[(20, 30, 15), (90, 100, 25)], RED);
    let detector = detector(scenario_b_config());

    let forward = detector.detect(&dynamic(a.clone()), &dynamic(b.clone())).unwrap();
    let backward = detector.detect(&dynamic(b), &dynamic(a)).unwrap();

    let geometry = |r: &spot_diff::DetectionResult| {
        r.regions.iter().map(|r| (r.bounds, r.area)).collect::<Vec<_>>()
    };
    assert_eq!(forward.region_count(), 2);
    assert_eq!(geometry(&forward), geometry(&backward));
}

#[test]
fn repeated_runs_are_identical() {
    let original = textured(120, 90);
    let modified = with_squares(&original, &[(5, 5, 12), (70, 40, 20), (40, 70, 9)], Rgb([0, 255, 255]));
    let detector = detector(DiffConfig {
        min_area: 10,
        ..DiffConfig::default()
    });

    let first = detector.detect(&dynamic(original.clone()), &dynamic(modified.clone())).unwrap();
    let second = detector.detect(&dynamic(original), &dynamic(modified)).unwrap();

    assert_eq!(first.regions, second.regions);
    assert_eq!(first.annotated, second.annotated);
}

#[test]
fn padded_rectangles_stay_inside_image() {
    let original = solid(200, 120, WHITE);
    let modified = with_squares(&original, &[(0, 0, 15), (185, 105, 15), (0, 100, 20), (90, 50, 10)], RED);
    let config = DiffConfig {
        padding: 40,
        min_area: 1,
        ..DiffConfig::default()
    };

    let result = detector(config).detect(&dynamic(original), &dynamic(modified)).unwrap();

    assert_eq!(result.region_count(), 4);
    assert_eq!((result.regions[0].bounds.x, result.regions[0].bounds.y), (0, 0));
    assert_eq!(result.regions.iter().filter(|r| r.bounds.right() == 200).count(), 1);
    for region in &result.regions {
        assert!(region.padded.right() <= 200);
        assert!(region.padded.bottom() <= 120);
        assert!(region.padded.width > 0 && region.padded.height > 0);
    }
}

#[test]
fn changes_at_image_corners_are_reported() {
    let original = solid(200, 120, WHITE);
    let modified = with_squares(&original, &[(0, 0, 20), (180, 100, 20)], RED);
    let config = DiffConfig {
        morph_iterations: 0,
        min_area: 1,
        ..DiffConfig::default()
    };

    let result = detector(config).detect(&dynamic(original), &dynamic(modified)).unwrap();

    assert_eq!(result.region_count(), 2);
    assert_eq!(result.regions[0].bounds, BoundingBox { x: 0, y: 0, width: 20, height: 20 });
    assert_eq!(result.regions[0].padded, BoundingBox { x: 0, y: 0, width: 30, height: 30 });
    assert_eq!(result.regions[0].area, 400);
    assert_eq!(result.regions[1].bounds, BoundingBox { x: 180, y: 100, width: 20, height: 20 });
    assert_eq!(result.regions[1].padded, BoundingBox { x: 170, y: 90, width: 30, height: 30 });
}

#[test]
fn gradient_strategy_finds_shape_on_right_edge() {
    let original = solid(200, 120, WHITE);
    let mut modified = original.clone();
    for y in 40..80 {
        for x in 170..200 {
            modified.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    let config = DiffConfig {
        strategy: Strategy::Gradient,
        min_area: 50,
        padding: 25,
        ..DiffConfig::default()
    };

    let result = detector(config).detect(&dynamic(original), &dynamic(modified)).unwrap();

    assert_eq!(result.region_count(), 1);
    let region = &result.regions[0];
    assert_eq!(region.bounds.right(), 200);
    assert!(region.bounds.x <= 170 && region.bounds.y <= 40 && region.bounds.bottom() >= 80);
    assert_eq!(region.padded.right(), 200);
    assert!(region.padded.bottom() <= 120);
}

#[test]
fn region_count_shrinks_as_min_area_grows() {
    let original = solid(200, 200, WHITE);
    let modified = with_squares(&original, &[(10, 10, 4), (50, 50, 10), (120, 120, 30)], RED);

    let mut previous = usize::MAX;
    for min_area in [1, 50, 100, 200, 500, 1200, 5000] {
        let config = DiffConfig {
            min_area,
            ..DiffConfig::default()
        };
        let count = detector(config)
            .detect(&dynamic(original.clone()), &dynamic(modified.clone()))
            .unwrap()
            .region_count();
        assert!(count <= previous, "min_area {min_area}: {count} > {previous}");
        previous = count;
    }
    assert_eq!(previous, 0);
}

#[test]
fn gradient_strategy_finds_new_shape() {
    let original = solid(200, 200, WHITE);
    let modified = with_squares(&original, &[(50, 50, 30)], Rgb([0, 0, 0]));
    let config = DiffConfig {
        strategy: Strategy::Gradient,
        min_area: 50,
        ..DiffConfig::default()
    };

    let result = detector(config).detect(&dynamic(original), &dynamic(modified)).unwrap();

    assert_eq!(result.region_count(), 1);
    let b = result.regions[0].bounds;
    assert!(b.x <= 50 && b.y <= 50);
    assert!(b.right() >= 80 && b.bottom() >= 80);
}

#[test]
fn gradient_strategy_ignores_flat_recolor() {
    let original = solid(80, 80, Rgb([100, 100, 100]));
    let modified = solid(80, 80, Rgb([160, 160, 160]));
    let config = DiffConfig {
        strategy: Strategy::Gradient,
        min_area: 1,
        ..DiffConfig::default()
    };

    let result = detector(config).detect(&dynamic(original), &dynamic(modified)).unwrap();
    assert_eq!(result.region_count(), 0);
}

#[test]
fn circle_markers_carry_enclosing_circles() {
    let original = solid(100, 100, WHITE);
    let modified = with_squares(&original, &[(40, 40, 21)], RED);
    let config = DiffConfig {
        marker: MarkerStyle::Circle,
        morph_iterations: 0,
        min_area: 10,
        ..DiffConfig::default()
    };

    let result = detector(config).detect(&dynamic(original), &dynamic(modified)).unwrap();

    let circle = result.regions[0].circle.unwrap();
    assert!((circle.center_x - 50.0).abs() < 1e-3);
    assert!((circle.center_y - 50.0).abs() < 1e-3);
    assert!(circle.radius >= 14.0);
}

#[test]
fn annotation_does_not_touch_inputs() {
    let original = solid(100, 100, WHITE);
    let modified = with_squares(&original, &[(40, 40, 20)], RED);
    let modified_input = dynamic(modified.clone());

    let result = detector(scenario_b_config())
        .detect(&dynamic(original), &modified_input)
        .unwrap();

    assert_eq!(modified_input.to_rgb8(), modified);
    assert_eq!(result.modified, modified);
    assert_ne!(result.annotated, modified);
}

#[test]
fn batch_matches_individual_runs() {
    let base = solid(60, 60, WHITE);
    let pairs = vec![
        (dynamic(base.clone()), dynamic(base.clone())),
        (dynamic(base.clone()), dynamic(with_squares(&base, &[(10, 10, 15)], RED))),
        (dynamic(base.clone()), dynamic(with_squares(&base, &[(5, 5, 12), (40, 40, 12)], RED))),
    ];
    let detector = detector(scenario_b_config());

    let batch = detector.detect_batch(&pairs);

    let counts = batch.iter().map(|r| r.as_ref().unwrap().region_count()).collect::<Vec<_>>();
    assert_eq!(counts, vec![0, 1, 2]);
}

#[test]
fn missing_files_fail_before_processing() {
    let result = detector(DiffConfig::default()).detect_files(&FsLoader, "nope/a.png", "nope/b.png");

    match result {
        Err(DiffError::LoadFailure { inputs, .. }) => {
            assert_eq!(inputs.len(), 2);
            assert!(inputs[0].ends_with("a.png"));
            assert!(inputs[1].ends_with("b.png"));
        }
        other => panic!("expected load failure, got {:?}", other.map(|r| r.region_count())),
    }
}

struct MemoryLoader {
    original: RgbImage,
    modified: RgbImage,
}

impl ImageLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<DynamicImage> {
        match path.to_str() {
            Some("original") => Ok(dynamic(self.original.clone())),
            Some("modified") => Ok(dynamic(self.modified.clone())),
            _ => Err(DiffError::load_failure(path.display().to_string(), "unknown")),
        }
    }
}

#[derive(Default)]
struct RecordingDisplay {
    titles: Vec<String>,
    waits: usize,
}

impl ImageDisplay for RecordingDisplay {
    fn show(&mut self, title: &str, _image: &RgbImage) -> Result<()> {
        self.titles.push(title.to_string());
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        self.waits += 1;
        Ok(())
    }
}

fn scenario_loader() -> MemoryLoader {
    let original = solid(200, 200, WHITE);
    let modified = with_squares(&original, &[(10, 10, 20), (120, 140, 30)], RED);
    MemoryLoader { original, modified }
}

#[test]
fn run_exports_annotated_crops_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("changes");
    let config = DiffConfig {
        export: true,
        export_directory: out.clone(),
        ..scenario_b_config()
    };
    let mut display = RecordingDisplay::default();

    let outcome = detector(config)
        .run(&scenario_loader(), &mut display, &FsExporter::new(&out), "original", "modified")
        .unwrap();

    assert_eq!(outcome.detection.region_count(), 2);
    assert!(display.titles.is_empty());

    let summary = outcome.export.unwrap().unwrap();
    assert_eq!(summary.files(), 6);
    for name in [
        "annotated.png",
        "change_1_original.png",
        "change_1_modified.png",
        "change_2_original.png",
        "change_2_modified.png",
        "report.json",
    ] {
        assert!(out.join(name).exists(), "missing {name}");
    }

    let crop = image::open(out.join("change_1_original.png")).unwrap();
    assert!(crop.width() >= 100 && crop.height() >= 100);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("report.json")).unwrap()).unwrap();
    assert_eq!(report["region_count"], 2);
    assert_eq!(report["regions"][0]["id"], 1);
    assert_eq!(report["settings"]["strategy"], "multi-colorspace");
}

#[test]
fn export_failure_keeps_detection() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let config = DiffConfig {
        export: true,
        export_directory: blocker.path().to_path_buf(),
        ..scenario_b_config()
    };
    let mut display = RecordingDisplay::default();

    let outcome = detector(config)
        .run(
            &scenario_loader(),
            &mut display,
            &FsExporter::new(blocker.path()),
            "original",
            "modified",
        )
        .unwrap();

    assert_eq!(outcome.detection.region_count(), 2);
    assert!(matches!(outcome.export, Some(Err(DiffError::ExportFailure { .. }))));
}

#[test]
fn display_is_only_invoked_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = DiffConfig {
        display: true,
        ..scenario_b_config()
    };
    let mut display = RecordingDisplay::default();

    let outcome = detector(config)
        .run(&scenario_loader(), &mut display, &FsExporter::new(dir.path()), "original", "modified")
        .unwrap();

    assert_eq!(display.titles, vec!["Side by side", "Changes"]);
    assert_eq!(display.waits, 1);
    assert!(outcome.export.is_none());
}

#[test]
fn config_round_trips_through_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let config = DiffConfig {
        sensitivity: 42,
        strategy: Strategy::Gradient,
        morph_kernel_size: 5,
        ..DiffConfig::default()
    };
    std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

    assert_eq!(DiffConfig::from_json_file(&path).unwrap(), config);
}
