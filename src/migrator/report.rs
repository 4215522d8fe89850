use serde::{Deserialize, Serialize};

/// Counters of one migration run.
///
/// "processed" counts attempts and "failed" the subset of attempts that did
/// not reach the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatistics {
    tracks_processed: u64,
    tracks_failed: u64,
    playlists_processed: u64,
    playlists_failed: u64,
    playlist_tracks_processed: u64,
    playlist_tracks_failed: u64,
}

impl MigrationStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn track_processed(&mut self) {
        self.tracks_processed += 1;
    }

    pub(crate) fn track_failed(&mut self) {
        self.tracks_failed += 1;
    }

    pub(crate) fn playlist_processed(&mut self) {
        self.playlists_processed += 1;
    }

    pub(crate) fn playlist_failed(&mut self) {
        self.playlists_failed += 1;
    }

    pub(crate) fn playlist_track_processed(&mut self) {
        self.playlist_tracks_processed += 1;
    }

    pub(crate) fn playlist_track_failed(&mut self) {
        self.playlist_tracks_failed += 1;
    }

    pub fn tracks_processed(&self) -> u64 {
        self.tracks_processed
    }

    pub fn tracks_failed(&self) -> u64 {
        self.tracks_failed
    }

    pub fn playlists_processed(&self) -> u64 {
        self.playlists_processed
    }

    pub fn playlists_failed(&self) -> u64 {
        self.playlists_failed
    }

    pub fn playlist_tracks_processed(&self) -> u64 {
        self.playlist_tracks_processed
    }

    pub fn playlist_tracks_failed(&self) -> u64 {
        self.playlist_tracks_failed
    }

    /// Replaces every counter with the one from `other`. Counters are not
    /// summed: the later phase's statistics win.
    // TODO: decide whether merge should sum. Callers currently seed the later
    // phase with a copy of the earlier counters so nothing is lost.
    pub fn merge(&mut self, other: &MigrationStatistics) {
        self.tracks_processed = other.tracks_processed;
        self.tracks_failed = other.tracks_failed;
        self.playlists_processed = other.playlists_processed;
        self.playlists_failed = other.playlists_failed;
        self.playlist_tracks_processed = other.playlist_tracks_processed;
        self.playlist_tracks_failed = other.playlist_tracks_failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let mut stats = MigrationStatistics::new();
        stats.track_processed();
        stats.track_processed();
        stats.track_failed();
        stats.playlist_processed();
        stats.playlist_track_processed();
        stats.playlist_track_failed();

        assert_eq!(stats.tracks_processed(), 2);
        assert_eq!(stats.tracks_failed(), 1);
        assert_eq!(stats.playlists_processed(), 1);
        assert_eq!(stats.playlists_failed(), 0);
        assert_eq!(stats.playlist_tracks_processed(), 1);
        assert_eq!(stats.playlist_tracks_failed(), 1);
    }

    #[test]
    fn test_merge_overwrites_instead_of_summing() {
        let mut track_phase = MigrationStatistics::new();
        for _ in 0..10 {
            track_phase.track_processed();
        }
        track_phase.track_failed();
        track_phase.track_failed();

        let mut playlist_phase = MigrationStatistics::new();
        for _ in 0..3 {
            playlist_phase.playlist_processed();
        }

        track_phase.merge(&playlist_phase);

        assert_eq!(track_phase.tracks_processed(), 0);
        assert_eq!(track_phase.tracks_failed(), 0);
        assert_eq!(track_phase.playlists_processed(), 3);
        assert_eq!(track_phase, playlist_phase);
    }

    #[test]
    fn test_serializes_counters() {
        let mut stats = MigrationStatistics::new();
        stats.track_processed();

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["tracks_processed"], 1);
        assert_eq!(json["playlist_tracks_failed"], 0);
    }
}
