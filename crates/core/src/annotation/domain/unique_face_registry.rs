use std::collections::BTreeSet;

use crate::tracking::domain::track::TrackId;
use crate::tracking::domain::track_manager::TrackSnapshot;

/// Every track ID that has ever been reported as confirmed.
///
/// Append-only: the count never decreases during a run.
#[derive(Clone, Debug, Default)]
pub struct UniqueFaceRegistry {
    ids: BTreeSet<TrackId>,
}

impl UniqueFaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the IDs of `tracks`. Returns each ID not seen before, paired
    /// with the registry count right after it was added.
    pub fn record(&mut self, tracks: &[TrackSnapshot]) -> Vec<(TrackId, usize)> {
        let mut added = Vec::new();
        for track in tracks {
            if self.ids.insert(track.id) {
                added.push((track.id, self.ids.len()));
            }
        }
        added
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// IDs in ascending order.
    pub fn ids(&self) -> Vec<TrackId> {
        self.ids.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    fn snap(id: TrackId) -> TrackSnapshot {
        TrackSnapshot {
            id,
            bbox: BoundingBox::new(0, 0, 10, 10).unwrap(),
            estimate: None,
            detection: None,
            hit_count: 1,
            time_since_update: 0,
        }
    }

    #[test]
    fn test_insertion_is_idempotent() {
        let mut registry = UniqueFaceRegistry::new();
        assert_eq!(registry.record(&[snap(1), snap(2)]).len(), 2);
        assert!(registry.record(&[snap(2), snap(1)]).is_empty());
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_new_faces_in_one_frame_get_distinct_counts() {
        let mut registry = UniqueFaceRegistry::new();
        registry.record(&[snap(2)]);
        let added = registry.record(&[snap(2), snap(5), snap(9)]);
        assert_eq!(added, vec![(5, 2), (9, 3)]);
    }

    #[test]
    fn test_count_never_decreases() {
        let mut registry = UniqueFaceRegistry::new();
        let frames = [vec![snap(1)], vec![], vec![snap(3)], vec![snap(1), snap(3)]];
        let mut last = 0;
        for tracks in &frames {
            registry.record(tracks);
            assert!(registry.count() >= last);
            last = registry.count();
        }
        assert_eq!(registry.ids(), vec![1, 3]);
    }
}
