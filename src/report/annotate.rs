use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_circle_mut, draw_hollow_rect_mut},
    rect::Rect,
};
use serde::{Deserialize, Serialize};

use crate::{
    BoundingBox, Region,
    report::font::{draw_text, text_height, text_width},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerStyle {
    #[default]
    Rectangle,
    Circle,
}

#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    pub marker: MarkerStyle,
    pub color: Rgb<u8>,
    pub label_color: Rgb<u8>,
    pub label_background: Rgb<u8>,
    pub thickness: u32,
    pub show_labels: bool,
    pub label_scale: u32,
    pub circle_margin: u32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            marker: MarkerStyle::Rectangle,
            color: Rgb([0, 0, 255]),
            label_color: Rgb([255, 255, 255]),
            label_background: Rgb([0, 0, 0]),
            thickness: 2,
            show_labels: true,
            label_scale: 2,
            circle_margin: 0,
        }
    }
}

pub struct Annotator {
    config: AnnotationConfig,
}

impl Annotator {
    pub fn new() -> Self {
        Self {
            config: AnnotationConfig::default(),
        }
    }

    pub fn with_config(config: AnnotationConfig) -> Self {
        Self { config }
    }

    pub fn with_marker(mut self, marker: MarkerStyle) -> Self {
        self.config.marker = marker;
        self
    }

    pub fn with_color(mut self, color: Rgb<u8>) -> Self {
        self.config.color = color;
        self
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.config.thickness = thickness.max(1);
        self
    }

    pub fn with_circle_margin(mut self, margin: u32) -> Self {
        self.config.circle_margin = margin;
        self
    }

    /// Draws every region onto a copy of `image`.
    pub fn annotate(&self, image: &RgbImage, regions: &[Region]) -> RgbImage {
        let mut vis = image.clone();

        for region in regions {
            let anchor = match (self.config.marker, region.circle) {
                (MarkerStyle::Circle, Some(circle)) => {
                    let cx = circle.center_x.round() as i32;
                    let cy = circle.center_y.round() as i32;
                    let radius = circle.radius.ceil() as i32 + self.config.circle_margin as i32;
                    self.draw_circle(&mut vis, cx, cy, radius);
                    clamp_anchor(&vis, cx - radius, cy - radius)
                }
                _ => {
                    self.draw_rect(&mut vis, &region.padded);
                    BoundingBox { width: 0, height: 0, ..region.padded }
                }
            };

            if self.config.show_labels {
                self.draw_label(&mut vis, anchor.x, anchor.y, &region.id.to_string());
            }
        }

        vis
    }

    fn draw_rect(&self, image: &mut RgbImage, bounds: &BoundingBox) {
        for t in 0..self.config.thickness {
            let Some(width) = bounds.width.checked_sub(2 * t).filter(|w| *w > 0) else {
                break;
            };
            let Some(height) = bounds.height.checked_sub(2 * t).filter(|h| *h > 0) else {
                break;
            };

            let rect = Rect::at((bounds.x + t) as i32, (bounds.y + t) as i32).of_size(width, height);
            draw_hollow_rect_mut(image, rect, self.config.color);
        }
    }

    fn draw_circle(&self, image: &mut RgbImage, cx: i32, cy: i32, radius: i32) {
        for t in 0..self.config.thickness as i32 {
            draw_hollow_circle_mut(image, (cx, cy), radius + t, self.config.color);
        }
    }

    /// Sits just above the marker's top-left corner, or inside it when the
    /// marker touches the top edge.
    fn draw_label(&self, image: &mut RgbImage, x: u32, y: u32, text: &str) {
        let scale = self.config.label_scale.max(1);
        let margin = scale;
        let box_width = text_width(text, scale) + 2 * margin;
        let box_height = text_height(scale) + 2 * margin;

        let (width, height) = image.dimensions();
        let label_x = x.min(width.saturating_sub(box_width));
        let label_y = if y >= box_height {
            y - box_height
        } else {
            (y + self.config.thickness).min(height.saturating_sub(box_height))
        };

        let background = Rect::at(label_x as i32, label_y as i32).of_size(box_width, box_height);
        draw_filled_rect_mut(image, background, self.config.label_background);
        draw_text(image, text, label_x + margin, label_y + margin, scale, self.config.label_color);
    }

    /// Side-by-side panels with a title strip above each.
    pub fn comparison_sheet(&self, panels: &[(&str, &RgbImage)]) -> RgbImage {
        if panels.is_empty() {
            return RgbImage::new(1, 1);
        }

        let padding = 10u32;
        let scale = self.config.label_scale.max(1);
        let label_height = text_height(scale) + padding;

        let max_height = panels.iter().map(|(_, img)| img.height()).max().unwrap_or(0);
        let total_width = panels.iter().map(|(_, img)| img.width()).sum::<u32>()
            + padding * (panels.len() as u32 + 1);
        let total_height = max_height + label_height + padding * 2;

        let mut sheet = RgbImage::from_pixel(total_width, total_height, Rgb([40, 40, 40]));

        let mut x_offset = padding;
        for (title, img) in panels {
            draw_text(&mut sheet, title, x_offset, padding, scale, Rgb([255, 255, 255]));
            image::imageops::replace(&mut sheet, *img, x_offset as i64, (label_height + padding) as i64);
            x_offset += img.width() + padding;
        }

        sheet
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_anchor(image: &RgbImage, x: i32, y: i32) -> BoundingBox {
    let (width, height) = image.dimensions();
    BoundingBox {
        x: (x.max(0) as u32).min(width.saturating_sub(1)),
        y: (y.max(0) as u32).min(height.saturating_sub(1)),
        width: 0,
        height: 0,
    }
}
