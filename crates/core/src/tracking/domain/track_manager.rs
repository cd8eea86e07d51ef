//! Online multi-face tracker: Kalman prediction, appearance matching under a
//! motion gate, an overlap fallback, then ageing and spawning.
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::assignment::{greedy_assign, Candidate};
use super::track::{Track, TrackId};
use super::tracker_config::TrackerConfig;
use crate::detection::domain::detection::Detection;
use crate::shared::bounding_box::BoundingBox;

/// What the tracker reports for one confirmed track on one sampled frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    /// Box of the last associated detection.
    pub bbox: BoundingBox,
    /// Motion-model estimate for this frame.
    pub estimate: Option<BoundingBox>,
    /// Index of the detection matched on this frame, if any.
    pub detection: Option<usize>,
    pub hit_count: u32,
    pub time_since_update: u32,
}

pub struct TrackManager {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: TrackId,
}

impl TrackManager {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    /// Live (tentative or confirmed) tracks.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Runs one association cycle for a sampled frame and returns the
    /// confirmed tracks, ordered by ID.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackSnapshot> {
        let updated_last_frame: Vec<bool> = self
            .tracks
            .iter()
            .map(|t| t.time_since_update() == 0)
            .collect();
        for track in &mut self.tracks {
            track.predict();
        }

        let mut matches = self.match_by_appearance(detections);
        let fallback = self.match_by_overlap(detections, &matches, &updated_last_frame);
        matches.extend(fallback);

        let matched_tracks: HashSet<usize> = matches.iter().map(|(ti, _)| *ti).collect();
        let matched_dets: HashSet<usize> = matches.iter().map(|(_, di)| *di).collect();
        let mut assigned: HashMap<TrackId, usize> = matches
            .iter()
            .map(|(ti, di)| (self.tracks[*ti].id(), *di))
            .collect();

        self.apply_matches(&matches, detections);
        self.age_unmatched_tracks(&matched_tracks);
        self.tracks.retain(|t| !t.is_deleted());
        assigned.extend(self.create_new_tracks(detections, &matched_dets));

        self.confirmed_snapshots(&assigned)
    }

    /// Stage one: cosine distance between stored and detected appearance,
    /// restricted to pairs that pass both the appearance and motion gates.
    fn match_by_appearance(&self, detections: &[Detection]) -> Vec<(usize, usize)> {
        let mut candidates = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (di, det) in detections.iter().enumerate() {
                let cost = track.last_embedding().cosine_distance(&det.embedding);
                if cost > self.config.max_cosine_distance {
                    continue;
                }
                let gate = track.filter().gating_distance(det.bbox.to_xyah());
                if gate > self.config.gating_threshold {
                    log::trace!(
                        "Track {} / detection {di}: motion gate {gate:.2} rejects cost {cost:.3}",
                        track.id()
                    );
                    continue;
                }
                candidates.push(Candidate {
                    track: ti,
                    detection: di,
                    cost,
                    track_age: track.age(),
                    track_id: track.id(),
                });
            }
        }
        greedy_assign(candidates)
    }

    /// Stage two: tracks that were matched on the previous sampled frame
    /// but lost their appearance match are paired by box overlap with the
    /// predicted position.
    fn match_by_overlap(
        &self,
        detections: &[Detection],
        matched: &[(usize, usize)],
        updated_last_frame: &[bool],
    ) -> Vec<(usize, usize)> {
        let used_tracks: HashSet<usize> = matched.iter().map(|(ti, _)| *ti).collect();
        let used_dets: HashSet<usize> = matched.iter().map(|(_, di)| *di).collect();

        let mut candidates = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            if used_tracks.contains(&ti) || !updated_last_frame.get(ti).copied().unwrap_or(false) {
                continue;
            }
            let predicted = BoundingBox::from_ltrb(track.filter().ltrb()).unwrap_or(track.last_box());
            for (di, det) in detections.iter().enumerate() {
                if used_dets.contains(&di) {
                    continue;
                }
                let cost = 1.0 - predicted.iou(&det.bbox);
                if cost > self.config.max_iou_distance {
                    continue;
                }
                candidates.push(Candidate {
                    track: ti,
                    detection: di,
                    cost,
                    track_age: track.age(),
                    track_id: track.id(),
                });
            }
        }
        greedy_assign(candidates)
    }

    fn apply_matches(&mut self, matches: &[(usize, usize)], detections: &[Detection]) {
        let alpha = self.config.embedding_alpha;
        let n_init = self.config.n_init;
        for (ti, di) in matches {
            let det = &detections[*di];
            self.tracks[*ti].mark_hit(det.bbox, &det.embedding, alpha, n_init);
        }
    }

    fn age_unmatched_tracks(&mut self, matched: &HashSet<usize>) {
        let max_age = self.config.max_age;
        let prune = self.config.prune_tentative_on_miss;
        for (ti, track) in self.tracks.iter_mut().enumerate() {
            if matched.contains(&ti) {
                continue;
            }
            track.mark_missed(max_age, prune);
            if track.is_deleted() {
                log::debug!(
                    "Track {} deleted after {} missed frame(s)",
                    track.id(),
                    track.time_since_update()
                );
            }
        }
    }

    /// Returns the new track IDs with the detection each was spawned from.
    fn create_new_tracks(
        &mut self,
        detections: &[Detection],
        matched: &HashSet<usize>,
    ) -> Vec<(TrackId, usize)> {
        let mut spawned = Vec::new();
        for (di, det) in detections.iter().enumerate() {
            if matched.contains(&di) {
                continue;
            }
            let track = Track::new(
                self.next_id,
                det.bbox,
                det.embedding.clone(),
                self.config.n_init,
            );
            log::debug!("Track {} spawned from detection {di}", track.id());
            spawned.push((track.id(), di));
            self.tracks.push(track);
            self.next_id += 1;
        }
        spawned
    }

    fn confirmed_snapshots(&self, assigned: &HashMap<TrackId, usize>) -> Vec<TrackSnapshot> {
        let mut snapshots: Vec<TrackSnapshot> = self
            .tracks
            .iter()
            .filter(|t| t.is_confirmed())
            .map(|t| TrackSnapshot {
                id: t.id(),
                bbox: t.last_box(),
                estimate: BoundingBox::from_ltrb(t.filter().ltrb()),
                detection: assigned.get(&t.id()).copied(),
                hit_count: t.hit_count(),
                time_since_update: t.time_since_update(),
            })
            .collect();
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }
}

impl Default for TrackManager {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
