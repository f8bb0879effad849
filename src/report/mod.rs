pub mod annotate;
pub mod crop;
pub mod font;

use serde::Serialize;

use crate::{BoundingBox, DetectionResult, DiffConfig, EnclosingCircle, difference::Strategy};

#[derive(Serialize)]
pub struct JsonReport {
    pub width: u32,
    pub height: u32,
    pub resized: bool,
    pub settings: SettingsSection,
    pub changed_pixels: u64,
    pub raw_region_count: usize,
    pub region_count: usize,
    pub regions: Vec<RegionSection>,
}

#[derive(Serialize)]
pub struct SettingsSection {
    pub strategy: Strategy,
    pub sensitivity: u8,
    pub min_area: u32,
    pub padding: u32,
    pub morph_kernel_size: u32,
    pub morph_iterations: u32,
}

#[derive(Serialize)]
pub struct RegionSection {
    pub id: usize,
    pub bounds: BoundingBox,
    pub padded: BoundingBox,
    pub area: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle: Option<EnclosingCircle>,
}

impl JsonReport {
    pub fn new(result: &DetectionResult, config: &DiffConfig) -> Self {
        let (width, height) = result.original.dimensions();

        Self {
            width,
            height,
            resized: result.resized,
            settings: SettingsSection {
                strategy: config.strategy,
                sensitivity: config.sensitivity,
                min_area: config.min_area,
                padding: config.padding,
                morph_kernel_size: config.morph_kernel_size,
                morph_iterations: config.morph_iterations,
            },
            changed_pixels: result.mask.changed_pixels(),
            raw_region_count: result.raw_region_count,
            region_count: result.region_count(),
            regions: result
                .regions
                .iter()
                .map(|r| RegionSection {
                    id: r.id,
                    bounds: r.bounds,
                    padded: r.padded,
                    area: r.area,
                    circle: r.circle,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
