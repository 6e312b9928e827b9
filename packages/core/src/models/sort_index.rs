//! Sparse sibling ordering
//!
//! Sort indices are spaced `step` apart (10,000 by default) so a node can be
//! placed between two siblings without renumbering them. When a gap is used
//! up, the whole sibling list is rebalanced.

/// Default distance between consecutive sort indices
pub const DEFAULT_SORT_INDEX_STEP: i64 = 10_000;

/// Largest accepted step; keeps `count * step` far from `i64::MAX`
pub const MAX_SORT_INDEX_STEP: i64 = 1_000_000_000;

/// Calculates the sort index for inserting a node between two siblings
#[derive(Debug, Clone, Copy)]
pub struct SortIndexCalculator {
    step: i64,
}

impl Default for SortIndexCalculator {
    fn default() -> Self {
        Self {
            step: DEFAULT_SORT_INDEX_STEP,
        }
    }
}

impl SortIndexCalculator {
    pub fn new(step: i64) -> Self {
        Self {
            step: step.clamp(2, MAX_SORT_INDEX_STEP),
        }
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    /// Sort index for a node inserted between `prev` and `next`
    ///
    /// Returns `None` when there is no free integer between the neighbours, or
    /// the neighbours sit too far apart to subtract, and the caller must
    /// rebalance.
    ///
    /// # Examples
    /// ```
    /// use outliner_core::models::SortIndexCalculator;
    ///
    /// let calc = SortIndexCalculator::new(10_000);
    /// assert_eq!(calc.between(None, None), Some(10_000));
    /// assert_eq!(calc.between(Some(10_000), None), Some(20_000));
    /// assert_eq!(calc.between(None, Some(10_000)), Some(0));
    /// assert_eq!(calc.between(Some(10_000), Some(20_000)), Some(15_000));
    /// assert_eq!(calc.between(Some(7), Some(8)), None);
    /// ```
    pub fn between(&self, prev: Option<i64>, next: Option<i64>) -> Option<i64> {
        match (prev, next) {
            (None, None) => Some(self.step),
            (None, Some(next)) => next.checked_sub(self.step),
            (Some(prev), None) => prev.checked_add(self.step),
            (Some(prev), Some(next)) => {
                let gap = next.checked_sub(prev)?;
                if gap < 2 {
                    None
                } else {
                    Some(prev + gap / 2)
                }
            }
        }
    }

    /// Evenly spaced indices for `count` siblings: step, 2*step, ...
    pub fn rebalance(&self, count: usize) -> Vec<i64> {
        (1..=count as i64).map(|i| i.saturating_mul(self.step)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_first_child() {
        assert_eq!(SortIndexCalculator::default().between(None, None), Some(10_000));
    }

    #[test]
    fn test_between_before_first() {
        let calc = SortIndexCalculator::default();
        assert_eq!(calc.between(None, Some(30_000)), Some(20_000));
    }

    #[test]
    fn test_between_after_last() {
        let calc = SortIndexCalculator::default();
        assert_eq!(calc.between(Some(30_000), None), Some(40_000));
    }

    #[test]
    fn test_between_exhausted_gap() {
        let calc = SortIndexCalculator::default();
        assert_eq!(calc.between(Some(5), Some(6)), None);
        assert_eq!(calc.between(Some(5), Some(7)), Some(6));
    }

    #[test]
    fn test_between_far_apart_neighbours() {
        let calc = SortIndexCalculator::default();
        let far = 9_000_000_000_000_000_000;
        assert_eq!(calc.between(Some(-far), Some(far)), None);
        assert_eq!(calc.between(Some(i64::MIN), Some(i64::MAX)), None);
        assert_eq!(calc.between(Some(i64::MAX), None), None);
        assert_eq!(calc.between(None, Some(i64::MIN)), None);
        // Wide but representable gaps still split
        assert_eq!(calc.between(Some(-far / 2), Some(far / 2)), Some(0));
    }

    #[test]
    fn test_step_is_bounded() {
        assert_eq!(SortIndexCalculator::new(0).step(), 2);
        assert_eq!(SortIndexCalculator::new(i64::MAX).step(), MAX_SORT_INDEX_STEP);
    }

    #[test]
    fn test_rebalance() {
        let calc = SortIndexCalculator::new(100);
        assert_eq!(calc.rebalance(3), vec![100, 200, 300]);
        assert!(calc.rebalance(0).is_empty());
    }
}
