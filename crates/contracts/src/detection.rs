//! Detection - Perception output
//!
//! Detections are ephemeral: produced and consumed within one loop iteration.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in frame-local pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x1 as f64 + self.x2 as f64) * 0.5,
            (self.y1 as f64 + self.y2 as f64) * 0.5,
        )
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 as f64 - self.x1 as f64
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 as f64 - self.y1 as f64
    }

    /// All four corners are finite numbers
    pub fn is_finite(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Single detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Model class id
    pub class_id: u32,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Bounding box
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// Which class tier a tracked point was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTier {
    /// Precise marker class
    Primary,
    /// Coarse reference-region class
    Secondary,
}

/// Point chosen from a detection set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedPoint {
    pub x: f64,
    pub y: f64,
    pub tier: TargetTier,
}

impl TrackedPoint {
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
