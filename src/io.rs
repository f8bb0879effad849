//! Collaborators at the edges of a run: decoding inputs, presenting
//! results, and persisting them. The detection itself never touches these;
//! they are handed to [`crate::ChangeDetector::run`] by the caller.

use std::{
    io::{BufRead, StdinLock},
    path::{Path, PathBuf},
};

use image::{DynamicImage, RgbImage};
use log::info;

use crate::{
    DetectionResult,
    error::{DiffError, Result},
    report::{JsonReport, crop::RegionCrop},
};

pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<DynamicImage>;
}

pub struct FsLoader;

impl ImageLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<DynamicImage> {
        image::open(path).map_err(|e| DiffError::load_failure(path.display().to_string(), e.to_string()))
    }
}

pub trait ImageDisplay {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()>;

    /// Blocks until the viewer acknowledges what was shown.
    fn wait(&mut self) -> Result<()>;
}

/// Writes each view to `directory` as PNG and waits for a line on `input`.
pub struct PreviewDisplay<R> {
    directory: PathBuf,
    input: R,
    shown: Vec<PathBuf>,
}

impl PreviewDisplay<StdinLock<'static>> {
    pub fn stdin<P: AsRef<Path>>(directory: P) -> Self {
        Self::with_input(directory, std::io::stdin().lock())
    }
}

impl<R: BufRead> PreviewDisplay<R> {
    pub fn with_input<P: AsRef<Path>>(directory: P, input: R) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            input,
            shown: Vec::new(),
        }
    }

    pub fn shown(&self) -> &[PathBuf] {
        &self.shown
    }
}

impl<R: BufRead> ImageDisplay for PreviewDisplay<R> {
    fn show(&mut self, title: &str, image: &RgbImage) -> Result<()> {
        std::fs::create_dir_all(&self.directory)?;

        let name = title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect::<String>();
        let path = self.directory.join(format!("preview_{name}.png"));
        image.save(&path)?;

        info!("{}: {}", title, path.display());
        self.shown.push(path);
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        info!("Press Enter to continue");
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub annotated: PathBuf,
    pub crops: Vec<PathBuf>,
    pub report: Option<PathBuf>,
}

impl ExportSummary {
    pub fn files(&self) -> usize {
        1 + self.crops.len() + usize::from(self.report.is_some())
    }
}

pub trait Exporter {
    fn export(&self, result: &DetectionResult, crops: &[RegionCrop], report: &JsonReport) -> Result<ExportSummary>;
}

/// `annotated.<ext>`, `change_<id>_original.<ext>`,
/// `change_<id>_modified.<ext>` and `report.json` under one directory.
pub struct FsExporter {
    directory: PathBuf,
    extension: String,
    write_report: bool,
}

impl FsExporter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            extension: "png".into(),
            write_report: true,
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    pub fn with_report(mut self, write_report: bool) -> Self {
        self.write_report = write_report;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn save(&self, image: &RgbImage, stem: &str) -> Result<PathBuf> {
        let path = self.directory.join(format!("{}.{}", stem, self.extension));
        image
            .save(&path)
            .map_err(|e| DiffError::export_failure(&path, e))?;
        Ok(path)
    }
}

impl Exporter for FsExporter {
    fn export(&self, result: &DetectionResult, crops: &[RegionCrop], report: &JsonReport) -> Result<ExportSummary> {
        std::fs::create_dir_all(&self.directory).map_err(|e| DiffError::export_failure(&self.directory, e))?;

        let annotated = self.save(&result.annotated, "annotated")?;

        let mut crop_paths = Vec::with_capacity(crops.len() * 2);
        for crop in crops {
            crop_paths.push(self.save(&crop.original, &format!("change_{}_original", crop.id))?);
            crop_paths.push(self.save(&crop.modified, &format!("change_{}_modified", crop.id))?);
        }

        let report_path = if self.write_report {
            let path = self.directory.join("report.json");
            let json = report.to_json()?;
            std::fs::write(&path, json).map_err(|e| DiffError::export_failure(&path, e))?;
            Some(path)
        } else {
            None
        };

        info!(
            "Exported {} crop(s) and annotated image to {}",
            crop_paths.len(),
            self.directory.display()
        );

        Ok(ExportSummary {
            annotated,
            crops: crop_paths,
            report: report_path,
        })
    }
}
