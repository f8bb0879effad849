use imageproc::{
    distance_transform::Norm,
    morphology::{dilate, open},
};
use log::debug;

use crate::difference::DifferenceMask;

pub const MAX_KERNEL_SIZE: u32 = 2 * u8::MAX as u32 + 1;

/// Opening removes speckle, the dilation passes then merge fragments of the
/// same change. Larger kernels or more passes give coarser regions.
pub struct MorphologicalCleaner {
    kernel_size: u32,
    iterations: u32,
    pre_dilate: bool,
}

impl MorphologicalCleaner {
    pub fn new(kernel_size: u32, iterations: u32) -> Self {
        Self {
            kernel_size: kernel_size.min(MAX_KERNEL_SIZE),
            iterations,
            pre_dilate: false,
        }
    }

    /// Edge-difference masks come in two-pixel-wide lines that an opening
    /// would erase outright; one dilation first lets them survive it.
    pub fn with_pre_dilation(mut self, pre_dilate: bool) -> Self {
        self.pre_dilate = pre_dilate;
        self
    }

    fn radius(&self) -> u8 {
        (self.kernel_size / 2) as u8
    }

    pub fn clean(&self, mask: &DifferenceMask) -> DifferenceMask {
        let radius = self.radius();
        if radius == 0 {
            return mask.clone();
        }

        let before = mask.changed_pixels();
        let mut cleaned = if self.pre_dilate {
            open(&dilate(mask.as_image(), Norm::LInf, radius), Norm::LInf, radius)
        } else {
            open(mask.as_image(), Norm::LInf, radius)
        };
        let opened = cleaned.pixels().filter(|p| p[0] > 0).count();

        for _ in 0..self.iterations {
            cleaned = dilate(&cleaned, Norm::LInf, radius);
        }

        let cleaned = DifferenceMask::from_binary(cleaned);
        debug!(
            "morphology: {} -> {} after opening -> {} after {} dilation(s)",
            before,
            opened,
            cleaned.changed_pixels(),
            self.iterations
        );

        cleaned
    }
}
