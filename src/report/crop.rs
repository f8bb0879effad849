use image::{RgbImage, imageops::FilterType};

use crate::Region;

#[derive(Debug, Clone)]
pub struct RegionCrop {
    pub id: usize,
    pub original: RgbImage,
    pub modified: RgbImage,
    pub scale: f64,
}

/// Cuts the padded rectangle of each region out of both images, upscaling
/// small crops so they stay readable.
pub struct Cropper {
    min_crop_size: u32,
    filter: FilterType,
}

impl Cropper {
    pub fn new(min_crop_size: u32) -> Self {
        Self {
            min_crop_size,
            filter: FilterType::CatmullRom,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn crop(&self, original: &RgbImage, modified: &RgbImage, regions: &[Region]) -> Vec<RegionCrop> {
        regions
            .iter()
            .map(|region| self.crop_region(original, modified, region))
            .collect()
    }

    pub fn crop_region(&self, original: &RgbImage, modified: &RgbImage, region: &Region) -> RegionCrop {
        let r = region.padded;
        let before = image::imageops::crop_imm(original, r.x, r.y, r.width, r.height).to_image();
        let after = image::imageops::crop_imm(modified, r.x, r.y, r.width, r.height).to_image();

        let scale = self.scale_for(before.width(), before.height());
        if scale <= 1.0 {
            return RegionCrop {
                id: region.id,
                original: before,
                modified: after,
                scale: 1.0,
            };
        }

        let width = (before.width() as f64 * scale).round() as u32;
        let height = (before.height() as f64 * scale).round() as u32;

        RegionCrop {
            id: region.id,
            original: image::imageops::resize(&before, width, height, self.filter),
            modified: image::imageops::resize(&after, width, height, self.filter),
            scale,
        }
    }

    fn scale_for(&self, width: u32, height: u32) -> f64 {
        if width == 0 || height == 0 {
            return 1.0;
        }
        if width >= self.min_crop_size && height >= self.min_crop_size {
            return 1.0;
        }

        let min = self.min_crop_size as f64;
        (min / width as f64).max(min / height as f64)
    }
}
