/// How far a video run has got.
///
/// `frames_total == 0` means the source did not declare a frame count; the
/// percentage is unknown until the run finishes and the total is fixed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessingProgress {
    frames_done: usize,
    frames_total: usize,
}

impl ProcessingProgress {
    pub fn new(frames_total: usize) -> Self {
        Self {
            frames_done: 0,
            frames_total,
        }
    }

    pub fn frames_done(&self) -> usize {
        self.frames_done
    }

    pub fn frames_total(&self) -> usize {
        self.frames_total
    }

    pub fn is_bounded(&self) -> bool {
        self.frames_total > 0
    }

    /// Records one more processed frame.
    pub fn advance(&mut self) {
        debug_assert!(
            !self.is_bounded() || self.frames_done < self.frames_total,
            "cannot advance past the declared frame count"
        );
        self.frames_done += 1;
    }

    /// Fixes the total to the frames actually processed.
    ///
    /// Used when the source runs dry before its declared count, or never
    /// declared one.
    pub fn finish(&mut self) {
        self.frames_total = self.frames_done;
    }

    pub fn is_complete(&self) -> bool {
        self.is_bounded() && self.frames_done == self.frames_total
    }

    pub fn fraction(&self) -> Option<f64> {
        if self.is_bounded() {
            Some(self.frames_done as f64 / self.frames_total as f64)
        } else {
            None
        }
    }

    pub fn percent(&self) -> Option<f64> {
        self.fraction().map(|f| f * 100.0)
    }

    /// Status line shown while a video is being processed.
    pub fn status_text(&self) -> String {
        match self.percent() {
            Some(pct) => format!("Processing video: {pct:.2}%"),
            None => format!("Processing video: frame {}", self.frames_done),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_starts_at_zero() {
        let p = ProcessingProgress::new(100);
        assert_eq!(p.frames_done(), 0);
        assert_eq!(p.percent(), Some(0.0));
        assert_eq!(p.status_text(), "Processing video: 0.00%");
    }

    #[test]
    fn test_advance_updates_fraction() {
        let mut p = ProcessingProgress::new(3);
        p.advance();
        assert_relative_eq!(p.fraction().unwrap(), 1.0 / 3.0);
        assert_eq!(p.status_text(), "Processing video: 33.33%");
        p.advance();
        p.advance();
        assert!(p.is_complete());
        assert_eq!(p.status_text(), "Processing video: 100.00%");
    }

    #[test]
    fn test_unbounded_has_no_percent() {
        let mut p = ProcessingProgress::new(0);
        p.advance();
        p.advance();
        assert_eq!(p.percent(), None);
        assert!(!p.is_complete());
        assert_eq!(p.status_text(), "Processing video: frame 2");
    }

    #[test]
    fn test_finish_corrects_overcounted_total() {
        let mut p = ProcessingProgress::new(10);
        for _ in 0..7 {
            p.advance();
        }
        p.finish();
        assert_eq!(p.frames_total(), 7);
        assert!(p.is_complete());
        assert_relative_eq!(p.percent().unwrap(), 100.0);
    }
}
