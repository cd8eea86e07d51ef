use std::cmp::Ordering;
use std::collections::HashSet;

use super::track::TrackId;

/// A gated track/detection pairing with its association cost.
///
/// `track` and `detection` are indices into the caller's slices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub track: usize,
    pub detection: usize,
    pub cost: f64,
    pub track_age: u32,
    pub track_id: TrackId,
}

/// Lower cost first, then the older track, then lower IDs and indices so
/// the outcome never depends on input order.
fn priority(a: &Candidate, b: &Candidate) -> Ordering {
    a.cost
        .total_cmp(&b.cost)
        .then_with(|| b.track_age.cmp(&a.track_age))
        .then_with(|| a.track_id.cmp(&b.track_id))
        .then_with(|| a.detection.cmp(&b.detection))
}

/// Greedy one-to-one matching. Returns `(track, detection)` index pairs in
/// the order they were accepted.
pub fn greedy_assign(mut candidates: Vec<Candidate>) -> Vec<(usize, usize)> {
    candidates.sort_by(priority);

    let mut used_tracks = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for c in &candidates {
        if !used_tracks.contains(&c.track) && !used_dets.contains(&c.detection) {
            used_tracks.insert(c.track);
            used_dets.insert(c.detection);
            matches.push((c.track, c.detection));
        }
    }
    matches
}
