//! Rolling median over the most recent raw samples.

use std::collections::VecDeque;

use crate::units::avg2_round_nearest_i32;

/// Fixed-capacity FIFO window that reports its median after each push.
///
/// Even-sized windows report the mean of the two middle samples, rounded to
/// nearest with ties away from zero.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    capacity: usize,
    window: VecDeque<i32>,
    // Same samples as `window`, kept sorted.
    sorted: Vec<i32>,
}

impl MedianFilter {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window: VecDeque::with_capacity(capacity),
            sorted: Vec::with_capacity(capacity),
        }
    }

    /// Add a sample, evicting the oldest one when full, and return the new median.
    pub fn push(&mut self, sample: i32) -> i32 {
        if self.window.len() == self.capacity {
            if let Some(old) = self.window.pop_front() {
                if let Ok(pos) = self.sorted.binary_search(&old) {
                    self.sorted.remove(pos);
                }
            }
        }
        self.window.push_back(sample);
        let pos = self.sorted.binary_search(&sample).unwrap_or_else(|p| p);
        self.sorted.insert(pos, sample);
        self.median().unwrap_or(sample)
    }

    /// Median of the current contents; `None` while empty.
    pub fn median(&self) -> Option<i32> {
        let n = self.sorted.len();
        if n == 0 {
            return None;
        }
        let mid = n / 2;
        if n % 2 == 1 {
            Some(self.sorted[mid])
        } else {
            Some(avg2_round_nearest_i32(self.sorted[mid - 1], self.sorted[mid]))
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.window.clear();
        self.sorted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_pushes_give_exact_medians() {
        let mut f = MedianFilter::new(3);
        assert_eq!(f.push(10), 10);
        assert_eq!(f.push(20), 15);
        assert_eq!(f.push(0), 10);
        // 10 evicted -> [20, 0, 5]
        assert_eq!(f.push(5), 5);
        // 20 evicted -> [0, 5, 100]
        assert_eq!(f.push(100), 5);
        assert!(f.is_full());
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn even_window_rounds_ties_away_from_zero() {
        let mut f = MedianFilter::new(4);
        f.push(-1);
        assert_eq!(f.push(-2), -2);
        let mut f = MedianFilter::new(2);
        f.push(1);
        assert_eq!(f.push(2), 2);
    }

    #[test]
    fn duplicates_are_evicted_one_at_a_time() {
        let mut f = MedianFilter::new(3);
        f.push(7);
        f.push(7);
        f.push(1);
        // one 7 evicted -> [7, 1, 1]
        assert_eq!(f.push(1), 1);
        // other 7 evicted -> [1, 1, 9]
        assert_eq!(f.push(9), 1);
    }

    #[test]
    fn zero_capacity_acts_as_one() {
        let mut f = MedianFilter::new(0);
        assert_eq!(f.capacity(), 1);
        assert_eq!(f.push(4), 4);
        assert_eq!(f.push(-9), -9);
    }

    #[test]
    fn clear_empties_the_window() {
        let mut f = MedianFilter::new(5);
        f.push(1);
        f.push(2);
        f.clear();
        assert!(f.is_empty());
        assert_eq!(f.median(), None);
        assert_eq!(f.push(3), 3);
    }
}
