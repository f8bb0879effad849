use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage};
use log::{debug, info, warn};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::{
    difference::{DifferenceEngine, DifferenceMask},
    error::{DiffError, Result},
    io::{ExportSummary, Exporter, ImageDisplay, ImageLoader},
    morphology::{MAX_KERNEL_SIZE, MorphologicalCleaner},
    preprocess::{AlignedPair, Preprocessor},
    regions::{RegionExtractor, RegionFilter},
    report::{
        JsonReport,
        annotate::Annotator,
        crop::{Cropper, RegionCrop},
    },
};

pub use crate::{
    difference::{ChannelReduction, Strategy},
    report::annotate::MarkerStyle,
};

pub mod difference;
pub mod error;
pub mod image_utils;
pub mod io;
pub mod morphology;
pub mod preprocess;
pub mod regions;
pub mod report;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub sensitivity: u8,
    pub min_area: u32,
    pub padding: u32,
    pub min_crop_size: u32,
    pub strategy: Strategy,
    pub reduction: ChannelReduction,
    /// Side of the square structuring element. Must be odd; 0 and 1 skip
    /// morphology.
    pub morph_kernel_size: u32,
    pub morph_iterations: u32,
    pub marker: MarkerStyle,
    pub display: bool,
    pub export: bool,
    pub export_directory: PathBuf,
}

impl DiffConfig {
    pub const DEFAULT_SENSITIVITY: u8 = 30;
    pub const DEFAULT_MIN_AREA: u32 = 100;
    pub const DEFAULT_PADDING: u32 = 10;
    pub const DEFAULT_MIN_CROP_SIZE: u32 = 100;
    pub const DEFAULT_MORPH_KERNEL_SIZE: u32 = 3;
    pub const DEFAULT_MORPH_ITERATIONS: u32 = 2;
    pub const DEFAULT_EXPORT_DIRECTORY: &'static str = "output";

    pub fn validate(&self) -> Result<()> {
        if self.morph_kernel_size > MAX_KERNEL_SIZE {
            return Err(DiffError::InvalidParameter(format!(
                "morph_kernel_size must be at most {}, got {}",
                MAX_KERNEL_SIZE, self.morph_kernel_size
            )));
        }
        if self.morph_kernel_size > 1 && self.morph_kernel_size % 2 == 0 {
            return Err(DiffError::InvalidParameter(format!(
                "morph_kernel_size must be odd, got {}",
                self.morph_kernel_size
            )));
        }
        if self.export && self.export_directory.as_os_str().is_empty() {
            return Err(DiffError::InvalidParameter(
                "export_directory must be set when export is enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: DiffConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            sensitivity: Self::DEFAULT_SENSITIVITY,
            min_area: Self::DEFAULT_MIN_AREA,
            padding: Self::DEFAULT_PADDING,
            min_crop_size: Self::DEFAULT_MIN_CROP_SIZE,
            strategy: Strategy::default(),
            reduction: ChannelReduction::default(),
            morph_kernel_size: Self::DEFAULT_MORPH_KERNEL_SIZE,
            morph_iterations: Self::DEFAULT_MORPH_ITERATIONS,
            marker: MarkerStyle::default(),
            display: false,
            export: false,
            export_directory: PathBuf::from(Self::DEFAULT_EXPORT_DIRECTORY),
        }
    }
}

pub struct ChangeDetector {
    config: DiffConfig,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self {
            config: DiffConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DiffConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn detect(&self, original: &DynamicImage, modified: &DynamicImage) -> Result<DetectionResult> {
        self.config.validate()?;
        let pair = Preprocessor::new().align(original, modified)?;
        Ok(self.detect_aligned(pair))
    }

    pub fn detect_aligned(&self, pair: AlignedPair) -> DetectionResult {
        let config = &self.config;
        let (width, height) = pair.dimensions();

        let raw = DifferenceEngine::new(config.strategy, config.sensitivity)
            .with_reduction(config.reduction)
            .compute(&pair);
        let mask = MorphologicalCleaner::new(config.morph_kernel_size, config.morph_iterations)
            .with_pre_dilation(config.strategy == Strategy::Gradient)
            .clean(&raw);

        let extracted = RegionExtractor::new()
            .with_circles(config.marker == MarkerStyle::Circle)
            .extract(&mask);
        let raw_region_count = extracted.len();
        let regions = RegionFilter::new(config.min_area, config.padding).apply(extracted, width, height);

        let annotated = Annotator::new()
            .with_marker(config.marker)
            .with_circle_margin(config.padding)
            .annotate(&pair.modified, &regions);

        if regions.is_empty() {
            info!("No changes detected ({} candidate region(s) below min area)", raw_region_count);
        } else {
            info!("Detected {} changed region(s)", regions.len());
        }

        DetectionResult {
            regions,
            annotated,
            mask,
            original: pair.original,
            modified: pair.modified,
            resized: pair.resized,
            raw_region_count,
        }
    }

    /// Both paths are attempted so a single error names every input that
    /// could not be decoded.
    pub fn detect_files<P: AsRef<Path>>(
        &self,
        loader: &dyn ImageLoader,
        original: P,
        modified: P,
    ) -> Result<DetectionResult> {
        let original = loader.load(original.as_ref());
        let modified = loader.load(modified.as_ref());

        match (original, modified) {
            (Ok(a), Ok(b)) => self.detect(&a, &b),
            (a, b) => Err(merge_load_failures([a.err(), b.err()])),
        }
    }

    /// Runs one independent pipeline per pair on the rayon pool.
    pub fn detect_batch(&self, pairs: &[(DynamicImage, DynamicImage)]) -> Vec<Result<DetectionResult>> {
        pairs.par_iter().map(|(a, b)| self.detect(a, b)).collect()
    }

    pub fn present(&self, result: &DetectionResult, display: &mut dyn ImageDisplay) -> Result<()> {
        let annotator = Annotator::new();
        let sheet = annotator.comparison_sheet(&[("ORIGINAL", &result.original), ("MODIFIED", &result.modified)]);

        display.show("Side by side", &sheet)?;
        display.show("Changes", &result.annotated)?;
        display.wait()
    }

    pub fn export(&self, result: &DetectionResult, exporter: &dyn Exporter) -> Result<ExportSummary> {
        let crops = result.crops(self.config.min_crop_size);
        let report = JsonReport::new(result, &self.config);
        exporter.export(result, &crops, &report)
    }

    /// Load, detect, then present and export as the config asks. An export
    /// failure is carried in the outcome next to the still-valid detection.
    pub fn run<P: AsRef<Path>>(
        &self,
        loader: &dyn ImageLoader,
        display: &mut dyn ImageDisplay,
        exporter: &dyn Exporter,
        original: P,
        modified: P,
    ) -> Result<RunOutcome> {
        let detection = self.detect_files(loader, original, modified)?;

        if self.config.display {
            self.present(&detection, display)?;
        }

        let export = self.config.export.then(|| {
            let outcome = self.export(&detection, exporter);
            if let Err(ref e) = outcome {
                warn!("{}", e);
            }
            outcome
        });

        Ok(RunOutcome { detection, export })
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_load_failures(errors: [Option<DiffError>; 2]) -> DiffError {
    let mut inputs = Vec::new();
    let mut reasons = Vec::new();

    for error in errors.into_iter().flatten() {
        match error {
            DiffError::LoadFailure { inputs: failed, reason } => {
                inputs.extend(failed);
                reasons.push(reason);
            }
            other => return other,
        }
    }

    debug!("load failed for {:?}", inputs);
    DiffError::LoadFailure {
        inputs,
        reason: reasons.join("; "),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Grows every side by `padding`, clamping each side to the image on
    /// its own.
    pub fn padded(&self, padding: u32, image_width: u32, image_height: u32) -> BoundingBox {
        let x0 = self.x.saturating_sub(padding);
        let y0 = self.y.saturating_sub(padding);
        let x1 = self.right().saturating_add(padding).min(image_width);
        let y1 = self.bottom().saturating_add(padding).min(image_height);

        BoundingBox {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnclosingCircle {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: usize,
    pub bounds: BoundingBox,
    pub padded: BoundingBox,
    pub area: u32,
    pub circle: Option<EnclosingCircle>,
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub regions: Vec<Region>,
    pub annotated: RgbImage,
    pub mask: DifferenceMask,
    pub original: RgbImage,
    pub modified: RgbImage,
    pub resized: bool,
    pub raw_region_count: usize,
}

impl DetectionResult {
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn has_changes(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn crops(&self, min_crop_size: u32) -> Vec<RegionCrop> {
        Cropper::new(min_crop_size).crop(&self.original, &self.modified, &self.regions)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.annotated.save(path)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub detection: DetectionResult,
    pub export: Option<Result<ExportSummary>>,
}
