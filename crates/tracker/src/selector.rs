//! Target selection
//!
//! 优先选择精确目标类别 (置信度最高者)，其次粗略目标类别；均无则无目标。

use contracts::{Detection, TargetTier, TrackedPoint};

/// Picks one point to track from a detection set
#[derive(Debug, Clone, Copy)]
pub struct TargetSelector {
    primary_class: u32,
    secondary_class: u32,
    /// Upward shift of the secondary point, as a fraction of box height
    target_offset: f64,
}

impl TargetSelector {
    pub fn new(primary_class: u32, secondary_class: u32, target_offset: f64) -> Self {
        Self {
            primary_class,
            secondary_class,
            target_offset,
        }
    }

    pub fn select(&self, detections: &[Detection]) -> Option<TrackedPoint> {
        if let Some(det) = best_of(detections, self.primary_class) {
            let (cx, cy) = det.bbox.center();
            return Some(TrackedPoint {
                x: cx,
                y: cy + det.bbox.height() * 0.5,
                tier: TargetTier::Primary,
            });
        }

        best_of(detections, self.secondary_class).map(|det| {
            let (cx, cy) = det.bbox.center();
            TrackedPoint {
                x: cx,
                y: cy - det.bbox.height() * self.target_offset,
                tier: TargetTier::Secondary,
            }
        })
    }
}

/// Highest-confidence detection of `class_id`; the first one wins ties
///
/// Boxes with non-finite corners are never candidates.
fn best_of(detections: &[Detection], class_id: u32) -> Option<&Detection> {
    detections
        .iter()
        .filter(|d| d.class_id == class_id && d.bbox.is_finite())
        .fold(None, |best: Option<&Detection>, d| match best {
            Some(b) if b.confidence >= d.confidence => Some(b),
            _ => Some(d),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BoundingBox;

    fn det(class_id: u32, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new(class_id, confidence, BoundingBox::new(x1, y1, x2, y2))
    }

    fn selector() -> TargetSelector {
        TargetSelector::new(1, 0, 0.5)
    }

    #[test]
    fn test_empty_is_none() {
        assert!(selector().select(&[]).is_none());
    }

    #[test]
    fn test_primary_preferred_over_more_confident_secondary() {
        let dets = [
            det(0, 0.99, 0.0, 0.0, 10.0, 40.0),
            det(1, 0.50, 100.0, 100.0, 110.0, 120.0),
        ];
        let point = selector().select(&dets).unwrap();
        assert_eq!(point.tier, TargetTier::Primary);
        assert_eq!(point.x, 105.0);
        // center 110 + half height 10
        assert_eq!(point.y, 120.0);
    }

    #[test]
    fn test_non_finite_box_is_skipped() {
        let dets = [
            det(1, 0.95, f32::NAN, 10.0, 20.0, 30.0),
            det(1, 0.60, 0.0, 0.0, 10.0, 10.0),
            det(0, 0.99, 0.0, f32::INFINITY, 10.0, 40.0),
        ];
        let point = selector().select(&dets).unwrap();
        assert_eq!(point.tier, TargetTier::Primary);
        assert_eq!((point.x, point.y), (5.0, 10.0));

        let only_bad = [det(0, 0.9, 0.0, 0.0, f32::NAN, 10.0)];
        assert!(selector().select(&only_bad).is_none());
    }

    #[test]
    fn test_secondary_biased_upward() {
        let dets = [det(0, 0.8, 0.0, 100.0, 20.0, 140.0)];
        let point = selector().select(&dets).unwrap();
        assert_eq!(point.tier, TargetTier::Secondary);
        assert_eq!(point.x, 10.0);
        // center 120 - 0.5 * 40
        assert_eq!(point.y, 100.0);
    }

    #[test]
    fn test_highest_confidence_wins() {
        let dets = [
            det(1, 0.6, 0.0, 0.0, 10.0, 10.0),
            det(1, 0.9, 50.0, 50.0, 60.0, 60.0),
            det(1, 0.7, 20.0, 20.0, 30.0, 30.0),
        ];
        assert_eq!(selector().select(&dets).unwrap().x, 55.0);
    }

    #[test]
    fn test_first_wins_on_ties() {
        let dets = [
            det(1, 0.9, 0.0, 0.0, 10.0, 10.0),
            det(1, 0.9, 50.0, 50.0, 60.0, 60.0),
        ];
        assert_eq!(selector().select(&dets).unwrap().x, 5.0);
    }

    #[test]
    fn test_unknown_classes_ignored() {
        let dets = [det(7, 0.9, 0.0, 0.0, 10.0, 10.0)];
        assert!(selector().select(&dets).is_none());
    }
}
