use std::fmt;

use serde::Serialize;

use crate::tracking::domain::track::TrackId;

/// Outcome of one counting run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CountReport {
    pub unique_faces: usize,
    /// Every identity that was ever confirmed, ascending.
    pub track_ids: Vec<TrackId>,
    pub frames_read: usize,
    pub frames_sampled: usize,
    pub frames_written: usize,
    /// Validated detections handed to the tracker, summed over all samples.
    pub detections: usize,
    pub sampling_interval: usize,
}

impl CountReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for CountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unique faces: {}", self.unique_faces)?;
        if !self.track_ids.is_empty() {
            let ids: Vec<String> = self.track_ids.iter().map(|id| id.to_string()).collect();
            writeln!(f, "Track IDs: {}", ids.join(", "))?;
        }
        writeln!(
            f,
            "Frames: {} read, {} sampled (every {}), {} written",
            self.frames_read, self.frames_sampled, self.sampling_interval, self.frames_written
        )?;
        write!(f, "Detections: {}", self.detections)
    }
}
