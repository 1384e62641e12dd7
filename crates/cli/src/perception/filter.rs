//! Post-filter applied to any adapter's raw detections.

use contracts::{ContractError, Detection, Frame, PerceptionAdapter, PerceptionConfig};

/// Confidence threshold, class allow-list, detection cap
#[derive(Debug, Clone, PartialEq)]
pub struct PostFilter {
    pub confidence: f32,
    pub classes: Vec<u32>,
    pub max_detections: usize,
}

impl PostFilter {
    pub fn from_config(config: &PerceptionConfig) -> Self {
        Self {
            confidence: config.confidence,
            classes: config.classes().to_vec(),
            max_detections: config.max_detections,
        }
    }

    /// Keep allowed, confident, finite detections; highest confidence first
    ///
    /// The sort is stable, so equal confidences keep the adapter's order.
    pub fn apply(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        detections.retain(|d| {
            d.confidence >= self.confidence
                && self.classes.contains(&d.class_id)
                && d.bbox.is_finite()
        });
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        detections.truncate(self.max_detections);
        detections
    }
}

/// Adapter wrapper running [`PostFilter`] after detection
pub struct Filtered<P> {
    inner: P,
    filter: PostFilter,
}

impl<P: PerceptionAdapter> Filtered<P> {
    pub fn new(inner: P, filter: PostFilter) -> Self {
        Self { inner, filter }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn filter(&self) -> &PostFilter {
        &self.filter
    }
}

impl<P: PerceptionAdapter> PerceptionAdapter for Filtered<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, ContractError> {
        let raw = self.inner.detect(frame)?;
        Ok(self.filter.apply(raw))
    }
}
