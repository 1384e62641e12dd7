//! MarkerDetector - color-threshold blob detector
//!
//! 每个类别在帧内取所有匹配像素的外接框作为一个检测；
//! 置信度为框内匹配像素占比。

use contracts::{
    BoundingBox, ContractError, Detection, Frame, PerceptionAdapter, BYTES_PER_PIXEL,
};

use super::asset::{MarkerAsset, MarkerSpec};

/// Running extent of one marker's matching pixels
#[derive(Debug, Clone, Copy)]
struct Extent {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    count: usize,
}

impl Extent {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            count: 1,
        }
    }

    fn grow(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.count += 1;
    }

    fn to_detection(self, class_id: u32) -> Detection {
        // pixel edges: the box covers max_x/max_y fully
        let area = (self.max_x - self.min_x + 1) as usize * (self.max_y - self.min_y + 1) as usize;
        let confidence = (self.count as f32 / area as f32).min(1.0);
        Detection::new(
            class_id,
            confidence,
            BoundingBox::new(
                self.min_x as f32,
                self.min_y as f32,
                (self.max_x + 1) as f32,
                (self.max_y + 1) as f32,
            ),
        )
    }
}

pub struct MarkerDetector {
    name: String,
    markers: Vec<MarkerSpec>,
}

impl MarkerDetector {
    pub fn new(asset: MarkerAsset) -> Self {
        Self {
            name: format!("marker:{}", asset.name),
            markers: asset.markers,
        }
    }

    pub fn markers(&self) -> &[MarkerSpec] {
        &self.markers
    }
}

impl PerceptionAdapter for MarkerDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, ContractError> {
        let expected = frame.width as usize * frame.height as usize * BYTES_PER_PIXEL;
        if frame.data.len() < expected {
            return Err(ContractError::perception(format!(
                "frame {} holds {} bytes, expected {expected}",
                frame.frame_id,
                frame.data.len()
            )));
        }

        let mut extents: Vec<Option<Extent>> = vec![None; self.markers.len()];
        let width = frame.width as usize;

        for (i, bgr) in frame.data[..expected].chunks_exact(BYTES_PER_PIXEL).enumerate() {
            let x = (i % width) as u32;
            let y = (i / width) as u32;
            for (marker, extent) in self.markers.iter().zip(extents.iter_mut()) {
                if marker.matches(bgr) {
                    match extent {
                        Some(e) => e.grow(x, y),
                        None => *extent = Some(Extent::new(x, y)),
                    }
                }
            }
        }

        Ok(self
            .markers
            .iter()
            .zip(extents)
            .filter_map(|(marker, extent)| {
                extent
                    .filter(|e| e.count >= marker.min_pixels)
                    .map(|e| e.to_detection(marker.class_id))
            })
            .collect())
    }
}
