pub mod colorspace;
pub mod gradient;

use image::GrayImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    image_utils::{count_nonzero, threshold},
    preprocess::AlignedPair,
};

use self::{colorspace::ColorspaceDifference, gradient::GradientDifference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// RGB and HSV absolute differences, OR-combined.
    #[default]
    MultiColorspace,
    /// Difference of Sobel edge magnitudes. Suits line art.
    Gradient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelReduction {
    #[default]
    Max,
    Luma,
}

/// Binary change map: 255 marks a changed pixel, 0 an unchanged one.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceMask {
    image: GrayImage,
}

impl DifferenceMask {
    pub fn from_binary(image: GrayImage) -> Self {
        Self { image }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_changed(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] > 0
    }

    pub fn changed_pixels(&self) -> u64 {
        count_nonzero(&self.image)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    pub fn union(&self, other: &DifferenceMask) -> DifferenceMask {
        let mut image = self.image.clone();
        for (dst, src) in image.pixels_mut().zip(other.image.pixels()) {
            dst[0] = dst[0].max(src[0]);
        }
        DifferenceMask { image }
    }
}

/// Produces per-pixel difference intensities for an aligned pair. Each
/// intensity map is thresholded independently and the resulting masks are
/// OR-combined.
pub trait DifferenceStrategy {
    fn intensity_maps(&self, pair: &AlignedPair) -> Vec<GrayImage>;

    fn name(&self) -> &str;
}

pub struct DifferenceEngine {
    strategy: Strategy,
    sensitivity: u8,
    reduction: ChannelReduction,
}

impl DifferenceEngine {
    pub fn new(strategy: Strategy, sensitivity: u8) -> Self {
        Self {
            strategy,
            sensitivity,
            reduction: ChannelReduction::default(),
        }
    }

    pub fn with_reduction(mut self, reduction: ChannelReduction) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn compute(&self, pair: &AlignedPair) -> DifferenceMask {
        match self.strategy {
            Strategy::MultiColorspace => self.compute_with(&ColorspaceDifference::new(self.reduction), pair),
            Strategy::Gradient => self.compute_with(&GradientDifference::new(self.reduction), pair),
        }
    }

    pub fn compute_with(&self, strategy: &dyn DifferenceStrategy, pair: &AlignedPair) -> DifferenceMask {
        let (width, height) = pair.dimensions();
        let mut mask = DifferenceMask::from_binary(GrayImage::new(width, height));

        for intensity in strategy.intensity_maps(pair) {
            let binary = DifferenceMask::from_binary(threshold(&intensity, self.sensitivity));
            debug!(
                "{}: {} pixels above sensitivity {}",
                strategy.name(),
                binary.changed_pixels(),
                self.sensitivity
            );
            mask = mask.union(&binary);
        }

        mask
    }
}
