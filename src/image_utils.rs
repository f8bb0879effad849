use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::{self, ThresholdType};

use crate::ChannelReduction;

pub fn luma(channels: [u8; 3]) -> u8 {
    (0.299 * channels[0] as f64 + 0.587 * channels[1] as f64 + 0.114 * channels[2] as f64)
        .round()
        .min(255.0) as u8
}

/// 8-bit HSV: hue in `[0, 180)`, saturation and value in `[0, 255]`.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> [u8; 3] {
    let r = pixel[0] as f64;
    let g = pixel[1] as f64;
    let b = pixel[2] as f64;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let hue_degrees = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let hue_degrees = if hue_degrees < 0.0 { hue_degrees + 360.0 } else { hue_degrees };

    let hue = ((hue_degrees / 2.0).round() as u32 % 180) as u8;

    [hue, saturation.round().min(255.0) as u8, max as u8]
}

pub fn rgb_image_to_hsv(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut hsv = RgbImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        hsv.put_pixel(x, y, Rgb(rgb_to_hsv(*pixel)));
    }

    hsv
}

pub fn hue_distance(a: u8, b: u8) -> u8 {
    let d = (a as i16 - b as i16).unsigned_abs() as u8;
    d.min(180u8.saturating_sub(d))
}

pub fn split_channels(image: &RgbImage) -> [GrayImage; 3] {
    let (width, height) = image.dimensions();
    let mut channels = [
        GrayImage::new(width, height),
        GrayImage::new(width, height),
        GrayImage::new(width, height),
    ];

    for (x, y, pixel) in image.enumerate_pixels() {
        for (c, channel) in channels.iter_mut().enumerate() {
            channel.put_pixel(x, y, Luma([pixel[c]]));
        }
    }

    channels
}

pub fn reduce_channels(channels: [u8; 3], reduction: ChannelReduction) -> u8 {
    match reduction {
        ChannelReduction::Max => channels[0].max(channels[1]).max(channels[2]),
        ChannelReduction::Luma => luma(channels),
    }
}

/// Binary threshold: `255` where the value is strictly above `threshold`.
pub fn threshold(image: &GrayImage, threshold: u8) -> GrayImage {
    contrast::threshold(image, threshold, ThresholdType::Binary)
}

pub fn count_nonzero(image: &GrayImage) -> u64 {
    image.pixels().filter(|p| p[0] > 0).count() as u64
}
