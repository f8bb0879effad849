use image::{GrayImage, imageops};
use imageproc::{
    contours::{BorderType, Contour, find_contours},
    geometry::convex_hull,
    point::Point,
};
use log::debug;

use crate::{BoundingBox, EnclosingCircle, Region, difference::DifferenceMask};

const CIRCLE_EPSILON: f64 = 1e-7;

pub struct RegionExtractor {
    with_circles: bool,
}

impl RegionExtractor {
    pub fn new() -> Self {
        Self { with_circles: false }
    }

    pub fn with_circles(mut self, with_circles: bool) -> Self {
        self.with_circles = with_circles;
        self
    }

    /// One region per outermost border; holes and anything nested inside
    /// them belong to the enclosing region. Regions are ordered top-left
    /// first and numbered from 1 in that order.
    pub fn extract(&self, mask: &DifferenceMask) -> Vec<Region> {
        let contours = outer_contours(mask);

        let mut regions = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter(|c| !c.points.is_empty())
            .map(|c| {
                let bounds = bounding_box(&c.points);
                Region {
                    id: 0,
                    bounds,
                    padded: bounds,
                    area: enclosed_pixel_count(&c.points),
                    circle: self.with_circles.then(|| enclosing_circle(&c.points)),
                }
            })
            .collect::<Vec<_>>();

        regions.sort_by_key(|r| (r.bounds.y, r.bounds.x, r.bounds.height, r.bounds.width, r.area));
        for (i, region) in regions.iter_mut().enumerate() {
            region.id = i + 1;
        }

        debug!(
            "extracted {} outer region(s) from {} contour(s)",
            regions.len(),
            contours.len()
        );

        regions
    }
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RegionFilter {
    min_area: u32,
    padding: u32,
}

impl RegionFilter {
    pub fn new(min_area: u32, padding: u32) -> Self {
        Self { min_area, padding }
    }

    pub fn apply(&self, regions: Vec<Region>, width: u32, height: u32) -> Vec<Region> {
        let total = regions.len();

        let kept = regions
            .into_iter()
            .filter(|r| r.area >= self.min_area)
            .enumerate()
            .map(|(i, r)| Region {
                id: i + 1,
                padded: r.bounds.padded(self.padding, width, height),
                ..r
            })
            .collect::<Vec<_>>();

        debug!(
            "area filter (min {}): kept {} of {} region(s)",
            self.min_area,
            kept.len(),
            total
        );

        kept
    }
}

/// Border following treats a blob touching the image edge as a hole, so
/// the mask is traced inside a one-pixel background frame and the points are
/// shifted back afterwards.
fn outer_contours(mask: &DifferenceMask) -> Vec<Contour<i64>> {
    let (width, height) = mask.dimensions();
    let mut framed = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut framed, mask.as_image(), 1, 1);

    find_contours::<i64>(&framed)
        .into_iter()
        .map(|mut c| {
            for p in &mut c.points {
                *p = Point::new(p.x - 1, p.y - 1);
            }
            c
        })
        .collect()
}

fn bounding_box(points: &[Point<i64>]) -> BoundingBox {
    let min_x = points.iter().map(|p| p.x).min().unwrap_or(0);
    let max_x = points.iter().map(|p| p.x).max().unwrap_or(0);
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);
    let max_y = points.iter().map(|p| p.y).max().unwrap_or(0);

    BoundingBox {
        x: min_x as u32,
        y: min_y as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    }
}

/// Pixels on or inside a closed border, by Pick's theorem. A border that
/// walks back over itself (one pixel wide arms) adds no area but counts
/// every step, which still yields the right pixel count.
pub(crate) fn enclosed_pixel_count(points: &[Point<i64>]) -> u32 {
    if points.len() < 2 {
        return points.len() as u32;
    }

    let twice_area = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<i64>()
        .abs();
    let boundary = points.len() as i64;

    ((twice_area + boundary) / 2 + 1) as u32
}

/// Smallest circle covering every boundary pixel centre.
pub(crate) fn enclosing_circle(points: &[Point<i64>]) -> EnclosingCircle {
    let hull = convex_hull(points);
    let hull = if hull.is_empty() { points.to_vec() } else { hull };
    let pts = hull
        .iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect::<Vec<_>>();

    let (cx, cy, r) = welzl(&pts);

    EnclosingCircle {
        center_x: cx as f32,
        center_y: cy as f32,
        radius: r.max(0.5) as f32,
    }
}

fn welzl(pts: &[(f64, f64)]) -> (f64, f64, f64) {
    let Some(&first) = pts.first() else {
        return (0.0, 0.0, 0.0);
    };

    let mut circle = (first.0, first.1, 0.0);
    for i in 1..pts.len() {
        if contains(circle, pts[i]) {
            continue;
        }
        circle = (pts[i].0, pts[i].1, 0.0);
        for j in 0..i {
            if contains(circle, pts[j]) {
                continue;
            }
            circle = diameter_circle(pts[i], pts[j]);
            for k in 0..j {
                if !contains(circle, pts[k]) {
                    circle = circumcircle(pts[i], pts[j], pts[k]);
                }
            }
        }
    }

    circle
}

fn contains(circle: (f64, f64, f64), p: (f64, f64)) -> bool {
    let (cx, cy, r) = circle;
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt() <= r + CIRCLE_EPSILON
}

fn diameter_circle(a: (f64, f64), b: (f64, f64)) -> (f64, f64, f64) {
    let cx = (a.0 + b.0) / 2.0;
    let cy = (a.1 + b.1) / 2.0;
    (cx, cy, ((a.0 - cx).powi(2) + (a.1 - cy).powi(2)).sqrt())
}

fn circumcircle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> (f64, f64, f64) {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));

    if d.abs() < CIRCLE_EPSILON {
        // Collinear: the widest pair spans the others.
        let candidates = [diameter_circle(a, b), diameter_circle(a, c), diameter_circle(b, c)];
        return candidates
            .into_iter()
            .fold((0.0, 0.0, f64::NEG_INFINITY), |best, c| if c.2 > best.2 { c } else { best });
    }

    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let cx = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let cy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;

    (cx, cy, ((a.0 - cx).powi(2) + (a.1 - cy).powi(2)).sqrt())
}
