use crate::shared::constants::COCO_CLASS_NAMES;

/// One detected object in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
    pub class_id: usize,
}

impl Detection {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// COCO class name, or `"unknown"` for ids outside the table.
    pub fn label(&self) -> &'static str {
        COCO_CLASS_NAMES
            .get(self.class_id)
            .copied()
            .unwrap_or("unknown")
    }

    /// Text drawn on the box tag, e.g. `"person 0.87"`.
    pub fn tag_text(&self) -> String {
        format!("{} {:.2}", self.label(), self.confidence)
    }

    pub fn iou(&self, other: &Detection) -> f64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, class_id: usize) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            class_id,
        }
    }

    #[test]
    fn test_label_lookup() {
        assert_eq!(det(0.0, 0.0, 1.0, 1.0, 0).label(), "person");
        assert_eq!(det(0.0, 0.0, 1.0, 1.0, 2).label(), "car");
        assert_eq!(det(0.0, 0.0, 1.0, 1.0, 79).label(), "toothbrush");
        assert_eq!(det(0.0, 0.0, 1.0, 1.0, 500).label(), "unknown");
    }

    #[test]
    fn test_tag_text_has_label_and_confidence() {
        let mut d = det(0.0, 0.0, 1.0, 1.0, 16);
        d.confidence = 0.876;
        assert_eq!(d.tag_text(), "dog 0.88");
    }

    #[test]
    fn test_iou_identical_is_one() {
        let a = det(0.0, 0.0, 10.0, 10.0, 0);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = det(0.0, 0.0, 10.0, 10.0, 0);
        let b = det(20.0, 20.0, 30.0, 30.0, 0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = det(0.0, 0.0, 10.0, 10.0, 0);
        let b = det(5.0, 0.0, 15.0, 10.0, 0);
        // 50 / (100 + 100 - 50)
        assert_relative_eq!(a.iou(&b), 1.0 / 3.0);
    }
}
