// src/pairing.rs
//
// Pairs overlay surfaces with camera frames. Overlays are produced from
// RSS snapshots asynchronously to the camera stream; both carry the same
// monotonically increasing frame-sequence numbers, and a surface is only
// composited once the camera image with the equal number is shown.

use std::collections::VecDeque;

use crate::surface::OverlaySurface;

/// A surface waiting for its matching camera frame.
#[derive(Debug)]
pub struct PendingSurface {
    pub frame: u64,
    pub surface: OverlaySurface,
    /// Number of drawn items (for drop diagnostics).
    pub item_count: usize,
}

/// Bounded FIFO of pending surfaces keyed by frame number.
#[derive(Debug)]
pub struct PendingSurfaces {
    entries: VecDeque<PendingSurface>,
    capacity: usize,
    /// Items on surfaces evicted at capacity, reported by the next
    /// `take_matching`.
    evicted_items: usize,
}

impl PendingSurfaces {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            evicted_items: 0,
        }
    }

    pub fn contains(&self, frame: u64) -> bool {
        self.entries.iter().any(|entry| entry.frame == frame)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffer a surface. The oldest entry is evicted past capacity and its
    /// items join the drop count.
    pub fn push(&mut self, pending: PendingSurface) {
        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                self.evicted_items += evicted.item_count;
            }
        }
        self.entries.push_back(pending);
    }

    /// Pop the surface matching `frame`, discarding stale entries with
    /// lower frame numbers. Returns the match (if any) and the total item
    /// count of surfaces that were discarded unrendered, whether stale or
    /// evicted at capacity.
    pub fn take_matching(&mut self, frame: u64) -> (Option<PendingSurface>, usize) {
        let mut dropped_items = std::mem::take(&mut self.evicted_items);

        while let Some(front) = self.entries.front() {
            if front.frame < frame {
                let stale = self.entries.pop_front().expect("front checked above");
                dropped_items += stale.item_count;
            } else {
                break;
            }
        }

        let matched = match self.entries.front() {
            Some(front) if front.frame == frame => self.entries.pop_front(),
            _ => None,
        };

        (matched, dropped_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(frame: u64, item_count: usize) -> PendingSurface {
        PendingSurface {
            frame,
            surface: OverlaySurface::new(4, 4, 1.0).unwrap(),
            item_count,
        }
    }

    #[test]
    fn test_take_matching_discards_stale_entries() {
        let mut buffer = PendingSurfaces::new(8);
        buffer.push(pending(10, 2));
        buffer.push(pending(11, 1));
        buffer.push(pending(12, 3));

        let (matched, dropped) = buffer.take_matching(12);
        assert_eq!(matched.unwrap().frame, 12);
        assert_eq!(dropped, 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_matching_keeps_future_entries() {
        let mut buffer = PendingSurfaces::new(8);
        buffer.push(pending(20, 1));

        let (matched, dropped) = buffer.take_matching(15);
        assert!(matched.is_none());
        assert_eq!(dropped, 0);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_push_is_bounded() {
        let mut buffer = PendingSurfaces::new(2);
        buffer.push(pending(1, 1));
        buffer.push(pending(2, 1));
        buffer.push(pending(3, 1));

        assert_eq!(buffer.len(), 2);
        assert!(!buffer.contains(1));
        assert!(buffer.contains(3));
    }

    #[test]
    fn test_capacity_evictions_join_drop_count() {
        let mut buffer = PendingSurfaces::new(2);
        buffer.push(pending(1, 4));
        buffer.push(pending(2, 1));
        buffer.push(pending(3, 1)); // evicts frame 1 with its 4 items

        let (matched, dropped) = buffer.take_matching(3);
        assert_eq!(matched.unwrap().frame, 3);
        // 4 evicted at capacity plus 1 stale (frame 2).
        assert_eq!(dropped, 5);

        // Already reported: a later take starts from zero.
        let (_, dropped) = buffer.take_matching(4);
        assert_eq!(dropped, 0);
    }
}
