use image::{GrayImage, Luma, RgbImage};

use crate::{
    difference::{ChannelReduction, DifferenceStrategy},
    image_utils::{hue_distance, reduce_channels, rgb_image_to_hsv},
    preprocess::AlignedPair,
};

/// RGB differencing misses changes that shift hue or saturation without
/// moving luminance much; the HSV map picks those up.
pub struct ColorspaceDifference {
    reduction: ChannelReduction,
}

impl ColorspaceDifference {
    pub fn new(reduction: ChannelReduction) -> Self {
        Self { reduction }
    }

    pub fn rgb_difference(&self, original: &RgbImage, modified: &RgbImage) -> GrayImage {
        let (width, height) = original.dimensions();
        let mut difference = GrayImage::new(width, height);

        for (x, y, a) in original.enumerate_pixels() {
            let b = modified.get_pixel(x, y);
            let channels = [
                a[0].abs_diff(b[0]),
                a[1].abs_diff(b[1]),
                a[2].abs_diff(b[2]),
            ];
            difference.put_pixel(x, y, Luma([reduce_channels(channels, self.reduction)]));
        }

        difference
    }

    pub fn hsv_difference(&self, original: &RgbImage, modified: &RgbImage) -> GrayImage {
        let hsv_a = rgb_image_to_hsv(original);
        let hsv_b = rgb_image_to_hsv(modified);
        let (width, height) = hsv_a.dimensions();
        let mut difference = GrayImage::new(width, height);

        for (x, y, a) in hsv_a.enumerate_pixels() {
            let b = hsv_b.get_pixel(x, y);
            let channels = [
                hue_distance(a[0], b[0]),
                a[1].abs_diff(b[1]),
                a[2].abs_diff(b[2]),
            ];
            difference.put_pixel(x, y, Luma([reduce_channels(channels, self.reduction)]));
        }

        difference
    }
}

impl DifferenceStrategy for ColorspaceDifference {
    fn intensity_maps(&self, pair: &AlignedPair) -> Vec<GrayImage> {
        vec![
            self.rgb_difference(&pair.original, &pair.modified),
            self.hsv_difference(&pair.original, &pair.modified),
        ]
    }

    fn name(&self) -> &str {
        "multi-colorspace"
    }
}
