use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::target::models::{PlaylistHandle, Rating, TargetPlaylist, TargetTrack, TrackHandle};

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "aac", "aif", "aiff", "m4a", "m4b", "m4p", "m4v", "mov", "mp3", "mp4", "wav",
];

/// Writable catalog the library is migrated into.
///
/// Writes to a freshly registered track may fail with
/// [`AppError::NotModifiable`] while the catalog is still processing the file.
#[async_trait]
pub trait TargetLibrary: Send + Sync {
    /// Adds the file at `path` to the catalog. The catalog stamps the
    /// "date added" itself.
    async fn register_file(&mut self, path: &Path) -> Result<TrackHandle>;

    async fn set_played_count(&mut self, track: TrackHandle, count: i32) -> Result<()>;

    async fn set_played_date(&mut self, track: TrackHandle, date: DateTime<Utc>) -> Result<()>;

    async fn set_rating(&mut self, track: TrackHandle, rating: Rating) -> Result<()>;

    async fn set_skipped_count(&mut self, track: TrackHandle, count: i32) -> Result<()>;

    async fn set_skipped_date(&mut self, track: TrackHandle, date: DateTime<Utc>) -> Result<()>;

    /// Reads back the current attributes of a track.
    async fn track(&self, track: TrackHandle) -> Result<TargetTrack>;

    async fn create_playlist(&mut self, name: &str) -> Result<PlaylistHandle>;

    async fn add_to_playlist(&mut self, playlist: PlaylistHandle, track: TrackHandle)
    -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Catalog {
    next_id: u64,
    tracks: Vec<TargetTrack>,
    playlists: Vec<TargetPlaylist>,
}

/// Catalog kept in memory and persisted as one JSON document.
pub struct CatalogStore {
    path: Option<PathBuf>,
    catalog: Catalog,
}

impl CatalogStore {
    /// Opens the catalog at `path`, starting empty if the file does not exist
    /// yet.
    pub fn open(path: &Path) -> Result<Self> {
        let catalog = if path.exists() {
            let json = fs::read_to_string(path).map_err(|e| {
                AppError::TargetUnavailable(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&json).map_err(|e| {
                AppError::TargetUnavailable(format!("Malformed catalog {}: {}", path.display(), e))
            })?
        } else {
            Catalog::default()
        };

        info!(
            "Opened catalog {} ({} tracks, {} playlists)",
            path.display(),
            catalog.tracks.len(),
            catalog.playlists.len()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            catalog,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            catalog: Catalog::default(),
        }
    }

    pub fn tracks(&self) -> &[TargetTrack] {
        &self.catalog.tracks
    }

    pub fn playlists(&self) -> &[TargetPlaylist] {
        &self.catalog.playlists
    }

    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.catalog)?;
        fs::write(path, json)?;

        info!("Catalog saved to: {}", path.display());

        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        self.catalog.next_id += 1;
        self.catalog.next_id
    }

    fn track_mut(&mut self, track: TrackHandle) -> Result<&mut TargetTrack> {
        self.catalog
            .tracks
            .iter_mut()
            .find(|t| t.id == track)
            .ok_or_else(|| AppError::NotFound(format!("track {}", track.0)))
    }
}

async fn check_readable(path: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| AppError::UnreadableFile(format!("{}: {}", path.display(), e)))?;

    if !metadata.is_file() {
        return Err(AppError::UnreadableFile(format!(
            "{}: not a regular file",
            path.display()
        )));
    }
    if metadata.len() == 0 {
        return Err(AppError::UnreadableFile(format!("{}: empty file", path.display())));
    }

    tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::UnreadableFile(format!("{}: {}", path.display(), e)))?;

    Ok(())
}

fn check_supported(path: &Path) -> Result<()> {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false);

    if supported {
        Ok(())
    } else {
        Err(AppError::UnsupportedFile(path.display().to_string()))
    }
}

#[async_trait]
impl TargetLibrary for CatalogStore {
    async fn register_file(&mut self, path: &Path) -> Result<TrackHandle> {
        check_readable(path).await?;
        check_supported(path)?;

        let location = path.display().to_string();
        if let Some(existing) = self.catalog.tracks.iter().find(|t| t.location == location) {
            debug!("File already in catalog: {}", location);
            return Ok(existing.id);
        }

        let id = TrackHandle(self.next_id());
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.catalog.tracks.push(TargetTrack {
            id,
            location,
            name,
            artist: String::new(),
            date_added: Utc::now(),
            played_count: 0,
            played_date: None,
            rating: Rating::NoStars,
            skipped_count: 0,
            skipped_date: None,
        });

        Ok(id)
    }

    async fn set_played_count(&mut self, track: TrackHandle, count: i32) -> Result<()> {
        self.track_mut(track)?.played_count = count;
        Ok(())
    }

    async fn set_played_date(&mut self, track: TrackHandle, date: DateTime<Utc>) -> Result<()> {
        self.track_mut(track)?.played_date = Some(date);
        Ok(())
    }

    async fn set_rating(&mut self, track: TrackHandle, rating: Rating) -> Result<()> {
        self.track_mut(track)?.rating = rating;
        Ok(())
    }

    async fn set_skipped_count(&mut self, track: TrackHandle, count: i32) -> Result<()> {
        self.track_mut(track)?.skipped_count = count;
        Ok(())
    }

    async fn set_skipped_date(&mut self, track: TrackHandle, date: DateTime<Utc>) -> Result<()> {
        self.track_mut(track)?.skipped_date = Some(date);
        Ok(())
    }

    async fn track(&self, track: TrackHandle) -> Result<TargetTrack> {
        self.catalog
            .tracks
            .iter()
            .find(|t| t.id == track)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("track {}", track.0)))
    }

    async fn create_playlist(&mut self, name: &str) -> Result<PlaylistHandle> {
        let id = PlaylistHandle(self.next_id());
        self.catalog.playlists.push(TargetPlaylist {
            id,
            name: name.to_string(),
            tracks: Vec::new(),
        });

        info!("Created catalog playlist: {}", name);

        Ok(id)
    }

    async fn add_to_playlist(
        &mut self,
        playlist: PlaylistHandle,
        track: TrackHandle,
    ) -> Result<()> {
        if !self.catalog.tracks.iter().any(|t| t.id == track) {
            return Err(AppError::NotFound(format!("track {}", track.0)));
        }

        let playlist = self
            .catalog
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist)
            .ok_or_else(|| AppError::NotFound(format!("playlist {}", playlist.0)))?;
        playlist.tracks.push(track);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_register_and_set_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "Song.mp3", b"ID3");
        let mut store = CatalogStore::in_memory();

        let handle = store.register_file(&file).await.unwrap();
        let played = Utc.with_ymd_and_hms(2014, 5, 6, 7, 8, 9).unwrap();
        store.set_played_count(handle, 12).await.unwrap();
        store.set_played_date(handle, played).await.unwrap();
        store.set_rating(handle, Rating::FourStars).await.unwrap();
        store.set_skipped_count(handle, 2).await.unwrap();

        let track = store.track(handle).await.unwrap();
        assert_eq!(track.name, "Song");
        assert_eq!(track.played_count, 12);
        assert_eq!(track.played_date, Some(played));
        assert_eq!(track.rating, Rating::FourStars);
        assert_eq!(track.skipped_count, 2);
        assert_eq!(track.skipped_date, None);
    }

    #[tokio::test]
    async fn test_register_same_file_twice_returns_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "song.m4a", b"data");
        let mut store = CatalogStore::in_memory();

        let first = store.register_file(&file).await.unwrap();
        let second = store.register_file(&file).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.tracks().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_and_empty_files_are_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write_file(dir.path(), "empty.mp3", b"");
        let mut store = CatalogStore::in_memory();

        let missing = store.register_file(&dir.path().join("missing.mp3")).await;
        assert!(matches!(missing, Err(AppError::UnreadableFile(_))));

        let empty = store.register_file(&empty).await;
        assert!(matches!(empty, Err(AppError::UnreadableFile(_))));
    }

    #[tokio::test]
    async fn test_unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write_file(dir.path(), "notes.txt", b"not music");
        let mut store = CatalogStore::in_memory();

        let result = store.register_file(&notes).await;
        assert!(matches!(result, Err(AppError::UnsupportedFile(_))));
        assert!(store.tracks().is_empty());
    }

    #[tokio::test]
    async fn test_playlist_membership() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "a.wav", b"RIFF");
        let mut store = CatalogStore::in_memory();

        let track = store.register_file(&file).await.unwrap();
        let playlist = store.create_playlist("Road Trip").await.unwrap();
        store.add_to_playlist(playlist, track).await.unwrap();

        assert_eq!(store.playlists()[0].name, "Road Trip");
        assert_eq!(store.playlists()[0].tracks, vec![track]);

        let dangling = store.add_to_playlist(playlist, TrackHandle(999)).await;
        assert!(matches!(dangling, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "a.mp3", b"ID3");
        let catalog_path = dir.path().join("out").join("catalog.json");

        let mut store = CatalogStore::open(&catalog_path).unwrap();
        let handle = store.register_file(&file).await.unwrap();
        store.set_rating(handle, Rating::TwoStars).await.unwrap();
        store.flush().unwrap();

        let reopened = CatalogStore::open(&catalog_path).unwrap();
        assert_eq!(reopened.tracks().len(), 1);
        assert_eq!(reopened.tracks()[0].rating, Rating::TwoStars);
    }

    #[test]
    fn test_open_malformed_catalog_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "catalog.json", b"{ not json");

        let result = CatalogStore::open(&path);
        assert!(matches!(result, Err(AppError::TargetUnavailable(_))));
    }
}
