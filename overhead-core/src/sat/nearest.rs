///! Bounded nearest-N candidate ranking used during initial catalog ingestion
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A candidate keyed by great-circle distance from the observer.
///
/// Ordering is distance ascending with ties broken by ascending catalog id,
/// so repeated runs over the same pool retain the same set regardless of
/// insertion order.
#[derive(Debug, Clone)]
pub struct RankedCandidate<T> {
    pub distance_m: f64,
    pub catalog_id: u32,
    pub value: T,
}

impl<T> PartialEq for RankedCandidate<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for RankedCandidate<T> {}

impl<T> PartialOrd for RankedCandidate<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for RankedCandidate<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_m
            .total_cmp(&other.distance_m)
            .then_with(|| self.catalog_id.cmp(&other.catalog_id))
    }
}

/// Keeps the N candidates closest to the observer.
///
/// Below capacity every candidate is accepted. At capacity a candidate is
/// accepted only if it ranks below the current worst retained one, which is
/// then evicted (a bounded max-heap keyed by distance).
pub struct NearestSet<T> {
    capacity: usize,
    heap: BinaryHeap<RankedCandidate<T>>,
}

impl<T> NearestSet<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Offer a candidate; returns whether it was retained. Non-finite
    /// distances are rejected outright.
    pub fn offer(&mut self, distance_m: f64, catalog_id: u32, value: T) -> bool {
        if self.capacity == 0 || !distance_m.is_finite() {
            return false;
        }

        let candidate = RankedCandidate {
            distance_m,
            catalog_id,
            value,
        };

        if self.heap.len() < self.capacity {
            self.heap.push(candidate);
            return true;
        }

        match self.heap.peek() {
            Some(worst) if candidate.cmp(worst) == Ordering::Less => {
                self.heap.pop();
                self.heap.push(candidate);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into a vector sorted by ascending distance
    pub fn into_sorted(self) -> Vec<RankedCandidate<T>> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_capacity_accepts_all() {
        let mut set = NearestSet::new(3);
        assert!(set.offer(5_000_000.0, 2, "b"));
        assert!(set.offer(100_000.0, 1, "a"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_capacity_one_keeps_nearest() {
        // observer at (0,0); candidates at 100 km and 5000 km
        let mut set = NearestSet::new(1);
        set.offer(100_000.0, 1, "near");
        set.offer(5_000_000.0, 2, "far");
        let retained = set.into_sorted();
        assert_eq!(retained.len(), 1);
        assert_eq!(retained[0].value, "near");

        // insertion order must not matter
        let mut set = NearestSet::new(1);
        set.offer(5_000_000.0, 2, "far");
        set.offer(100_000.0, 1, "near");
        assert_eq!(set.into_sorted()[0].value, "near");
    }

    #[test]
    fn test_eviction_replaces_current_maximum() {
        let mut set = NearestSet::new(2);
        set.offer(300.0, 3, 3u32);
        set.offer(100.0, 1, 1u32);
        assert!(set.offer(200.0, 2, 2u32));
        let ids: Vec<u32> = set.into_sorted().iter().map(|c| c.value).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_distance_tie_breaks_by_catalog_id() {
        let mut set = NearestSet::new(1);
        set.offer(500.0, 20002, "high");
        assert!(set.offer(500.0, 20001, "low"));
        assert_eq!(set.into_sorted()[0].catalog_id, 20001);

        // and the lower id wins in either insertion order
        let mut set = NearestSet::new(1);
        set.offer(500.0, 20001, "low");
        assert!(!set.offer(500.0, 20002, "high"));
        assert_eq!(set.into_sorted()[0].catalog_id, 20001);
    }

    #[test]
    fn test_output_sorted_ascending() {
        let mut set = NearestSet::new(10);
        for (d, id) in [(900.0, 5), (100.0, 9), (400.0, 7)] {
            set.offer(d, id, id);
        }
        let distances: Vec<f64> = set.into_sorted().iter().map(|c| c.distance_m).collect();
        assert_eq!(distances, vec![100.0, 400.0, 900.0]);
    }

    #[test]
    fn test_non_finite_distance_rejected() {
        let mut set = NearestSet::new(2);
        assert!(!set.offer(f64::NAN, 1, ()));
        assert!(!set.offer(f64::INFINITY, 2, ()));
        assert!(set.is_empty());
    }
}
