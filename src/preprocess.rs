use image::{DynamicImage, RgbImage, imageops::FilterType};
use log::warn;

use crate::error::{DiffError, Result};

/// Both images in RGB8 with the original's dimensions.
#[derive(Debug, Clone)]
pub struct AlignedPair {
    pub original: RgbImage,
    pub modified: RgbImage,
    pub resized: bool,
}

impl AlignedPair {
    pub fn dimensions(&self) -> (u32, u32) {
        self.original.dimensions()
    }
}

pub struct Preprocessor {
    filter: FilterType,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn align(&self, original: &DynamicImage, modified: &DynamicImage) -> Result<AlignedPair> {
        let mut empty = Vec::new();
        if original.width() == 0 || original.height() == 0 {
            empty.push("original".to_string());
        }
        if modified.width() == 0 || modified.height() == 0 {
            empty.push("modified".to_string());
        }
        if !empty.is_empty() {
            return Err(DiffError::LoadFailure {
                inputs: empty,
                reason: "image has no pixel data".into(),
            });
        }

        let original = original.to_rgb8();
        let mut modified = modified.to_rgb8();
        let (width, height) = original.dimensions();

        let resized = modified.dimensions() != (width, height);
        if resized {
            warn!(
                "Input dimensions differ ({}x{} vs {}x{}), resizing modified image to {}x{}",
                width,
                height,
                modified.width(),
                modified.height(),
                width,
                height
            );
            modified = image::imageops::resize(&modified, width, height, self.filter);
        }

        Ok(AlignedPair {
            original,
            modified,
            resized,
        })
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
