use image::{GrayImage, Luma, RgbImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::{
    difference::{ChannelReduction, DifferenceStrategy},
    image_utils::{reduce_channels, split_channels},
    preprocess::AlignedPair,
};

/// Compares edge structure instead of colour, so flat shading changes are
/// ignored while moved or redrawn lines show up.
pub struct GradientDifference {
    reduction: ChannelReduction,
}

impl GradientDifference {
    pub fn new(reduction: ChannelReduction) -> Self {
        Self { reduction }
    }

    /// Per-channel `0.5 * |gx| + 0.5 * |gy|`, each response saturated to u8.
    pub fn edge_magnitude(&self, image: &RgbImage) -> [GrayImage; 3] {
        split_channels(image).map(|channel| {
            let gx = horizontal_sobel(&channel);
            let gy = vertical_sobel(&channel);
            let (width, height) = channel.dimensions();
            let mut magnitude = GrayImage::new(width, height);

            for (x, y, px) in gx.enumerate_pixels() {
                let ax = px[0].unsigned_abs().min(255) as f32;
                let ay = gy.get_pixel(x, y)[0].unsigned_abs().min(255) as f32;
                magnitude.put_pixel(x, y, Luma([(0.5 * ax + 0.5 * ay).round() as u8]));
            }

            magnitude
        })
    }
}

impl DifferenceStrategy for GradientDifference {
    fn intensity_maps(&self, pair: &AlignedPair) -> Vec<GrayImage> {
        let edges_a = self.edge_magnitude(&pair.original);
        let edges_b = self.edge_magnitude(&pair.modified);
        let (width, height) = pair.dimensions();
        let mut difference = GrayImage::new(width, height);

        for y in 0..height {
            for x in 0..width {
                let channels = [0usize, 1, 2].map(|c| {
                    edges_a[c].get_pixel(x, y)[0].abs_diff(edges_b[c].get_pixel(x, y)[0])
                });
                difference.put_pixel(x, y, Luma([reduce_channels(channels, self.reduction)]));
            }
        }

        vec![difference]
    }

    fn name(&self) -> &str {
        "gradient"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_flat_image_has_no_edges() {
        let image = RgbImage::from_pixel(8, 8, Rgb([30, 90, 200]));
        let edges = GradientDifference::new(ChannelReduction::Max).edge_magnitude(&image);
        for channel in &edges {
            assert!(channel.pixels().all(|p| p[0] == 0));
        }
    }

    #[test]
    fn test_uniform_shading_change_is_ignored() {
        let original = RgbImage::from_pixel(12, 12, Rgb([100, 100, 100]));
        let modified = RgbImage::from_pixel(12, 12, Rgb([140, 140, 140]));
        let pair = AlignedPair {
            original,
            modified,
            resized: false,
        };

        let maps = GradientDifference::new(ChannelReduction::Max).intensity_maps(&pair);
        assert_eq!(maps.len(), 1);
        assert!(maps[0].pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_new_line_is_detected() {
        let original = RgbImage::from_pixel(12, 12, Rgb([255, 255, 255]));
        let mut modified = original.clone();
        for y in 2..10 {
            modified.put_pixel(6, y, Rgb([0, 0, 0]));
        }
        let pair = AlignedPair {
            original,
            modified,
            resized: false,
        };

        let maps = GradientDifference::new(ChannelReduction::Max).intensity_maps(&pair);
        assert!(maps[0].get_pixel(5, 5)[0] > 100);
        assert_eq!(maps[0].get_pixel(0, 5)[0], 0);
    }
}
