//! Per-track history of recent (bbox, keypoints) pairs.
//!
//! Both sequences live in one ring of pairs, so they can never drift to
//! different lengths.

use std::fmt;

use contracts::{BBox, Keypoints17};
use ringbuf::{traits::*, HeapRb};

/// One frame of history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub bbox: BBox,
    pub keypoints: Keypoints17,
}

impl HistoryEntry {
    #[inline]
    pub fn new(bbox: BBox, keypoints: Keypoints17) -> Self {
        Self { bbox, keypoints }
    }
}

/// Bounded FIFO of the last `capacity` frames of one track
pub struct TrackHistory {
    entries: HeapRb<HistoryEntry>,
    capacity: usize,
}

impl fmt::Debug for TrackHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackHistory")
            .field("len", &self.entries.occupied_len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl TrackHistory {
    /// Capacity is clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HeapRb::new(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Holds a full window of prior frames
    #[inline]
    pub fn is_warm(&self) -> bool {
        self.entries.is_full()
    }

    /// Append during warm-up; the oldest entry is dropped if already full
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.is_full() {
            let _ = self.entries.try_pop();
        }
        let _ = self.entries.try_push(entry);
    }

    /// Pop the oldest entry and append `entry`; returns the popped one
    pub fn rotate(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let oldest = self.entries.try_pop();
        let _ = self.entries.try_push(entry);
        oldest
    }

    #[inline]
    pub fn oldest(&self) -> Option<&HistoryEntry> {
        self.entries.iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(y: f64) -> HistoryEntry {
        let kps = Keypoints17::from_flat(1, &[0.0; 34]).unwrap();
        HistoryEntry::new(BBox::new(0.0, y, 50.0, 100.0), kps)
    }

    #[test]
    fn test_warms_after_capacity() {
        let mut history = TrackHistory::new(3);
        assert!(!history.is_warm());
        for y in [1.0, 2.0, 3.0] {
            history.push(entry(y));
        }
        assert!(history.is_warm());
        assert_eq!(history.oldest().unwrap().bbox.y, 1.0);
        assert_eq!(history.iter().last().unwrap().bbox.y, 3.0);
    }

    #[test]
    fn test_rotate_returns_oldest() {
        let mut history = TrackHistory::new(2);
        history.push(entry(1.0));
        history.push(entry(2.0));

        let popped = history.rotate(entry(3.0)).unwrap();
        assert_eq!(popped.bbox.y, 1.0);
        assert_eq!(history.len(), 2);
        assert_eq!(history.oldest().unwrap().bbox.y, 2.0);
    }

    #[test]
    fn test_push_when_full_drops_oldest() {
        let mut history = TrackHistory::new(2);
        for y in [1.0, 2.0, 3.0] {
            history.push(entry(y));
        }
        let ys: Vec<f64> = history.iter().map(|e| e.bbox.y).collect();
        assert_eq!(ys, vec![2.0, 3.0]);
    }
}
