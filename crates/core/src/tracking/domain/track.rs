use serde::Serialize;

use super::kalman_filter::KalmanState;
use crate::embedding::domain::embedding::Embedding;
use crate::shared::bounding_box::BoundingBox;

/// Unique, never-reused track identifier. Starts at 1.
pub type TrackId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TrackState {
    Tentative,
    Confirmed,
    Deleted,
}

/// One hypothesized physical face, followed across sampled frames.
#[derive(Clone, Debug)]
pub struct Track {
    id: TrackId,
    state: TrackState,
    last_box: BoundingBox,
    last_embedding: Embedding,
    filter: KalmanState,
    age: u32,
    time_since_update: u32,
    hit_count: u32,
}

impl Track {
    /// A fresh track already counts its spawning detection as one hit.
    pub fn new(id: TrackId, bbox: BoundingBox, embedding: Embedding, n_init: u32) -> Self {
        let state = if n_init <= 1 {
            TrackState::Confirmed
        } else {
            TrackState::Tentative
        };
        Self {
            id,
            state,
            last_box: bbox,
            last_embedding: embedding,
            filter: KalmanState::initiate(bbox.to_xyah()),
            age: 1,
            time_since_update: 0,
            hit_count: 1,
        }
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    pub fn is_tentative(&self) -> bool {
        self.state == TrackState::Tentative
    }

    pub fn is_deleted(&self) -> bool {
        self.state == TrackState::Deleted
    }

    pub fn last_box(&self) -> BoundingBox {
        self.last_box
    }

    pub fn last_embedding(&self) -> &Embedding {
        &self.last_embedding
    }

    pub fn filter(&self) -> &KalmanState {
        &self.filter
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn time_since_update(&self) -> u32 {
        self.time_since_update
    }

    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    /// Motion step. Ages the track; does not touch match bookkeeping.
    pub fn predict(&mut self) {
        self.filter.predict();
        self.age += 1;
    }

    /// Folds a matched detection into the track.
    pub fn mark_hit(
        &mut self,
        bbox: BoundingBox,
        embedding: &Embedding,
        alpha: f64,
        n_init: u32,
    ) {
        self.filter.update(bbox.to_xyah());
        self.last_box = bbox;
        self.last_embedding = self.last_embedding.blend(embedding, alpha);
        self.hit_count += 1;
        self.time_since_update = 0;
        if self.is_tentative() && self.hit_count >= n_init {
            self.state = TrackState::Confirmed;
        }
    }

    /// Records a sampled frame without a match; deletes the track when it
    /// has gone unmatched for more than `max_age` frames.
    pub fn mark_missed(&mut self, max_age: u32, prune_tentative: bool) {
        self.time_since_update += 1;
        if (prune_tentative && self.is_tentative()) || self.time_since_update > max_age {
            self.state = TrackState::Deleted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(10, 10, 50, 60).unwrap()
    }

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_n_init_one_confirms_at_spawn() {
        let track = Track::new(1, bbox(), emb(&[1.0, 0.0]), 1);
        assert!(track.is_confirmed());
        assert_eq!(track.hit_count(), 1);
    }

    #[test]
    fn test_tentative_until_enough_hits() {
        let mut track = Track::new(1, bbox(), emb(&[1.0, 0.0]), 3);
        assert!(track.is_tentative());
        track.predict();
        track.mark_hit(bbox(), &emb(&[1.0, 0.0]), 0.6, 3);
        assert!(track.is_tentative());
        track.predict();
        track.mark_hit(bbox(), &emb(&[1.0, 0.0]), 0.6, 3);
        assert!(track.is_confirmed());
        assert_eq!(track.hit_count(), 3);
    }

    #[test]
    fn test_hit_resets_time_since_update() {
        let mut track = Track::new(1, bbox(), emb(&[1.0, 0.0]), 1);
        track.predict();
        track.mark_missed(30, false);
        assert_eq!(track.time_since_update(), 1);
        track.predict();
        track.mark_hit(bbox(), &emb(&[1.0, 0.0]), 0.6, 1);
        assert_eq!(track.time_since_update(), 0);
        assert_eq!(track.age(), 3);
    }

    #[test]
    fn test_deleted_after_exceeding_max_age() {
        let mut track = Track::new(1, bbox(), emb(&[1.0, 0.0]), 1);
        for _ in 0..2 {
            track.predict();
            track.mark_missed(2, false);
        }
        assert!(track.is_confirmed());
        track.predict();
        track.mark_missed(2, false);
        assert!(track.is_deleted());
    }

    #[test]
    fn test_prune_tentative_on_first_miss() {
        let mut track = Track::new(1, bbox(), emb(&[1.0, 0.0]), 2);
        track.predict();
        track.mark_missed(30, true);
        assert!(track.is_deleted());
    }

    #[test]
    fn test_embedding_is_smoothed() {
        let mut track = Track::new(1, bbox(), emb(&[1.0, 0.0]), 1);
        track.predict();
        track.mark_hit(bbox(), &emb(&[0.0, 1.0]), 0.6, 1);
        let v = track.last_embedding().as_slice();
        assert!(v[0] > 0.0 && v[1] > v[0]);
    }
}
