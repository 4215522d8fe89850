use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::source::models::{SourcePlaylist, SourceTrack};

/// Read-only view of the library being migrated.
#[async_trait]
pub trait SourceLibrary: Send + Sync {
    /// Every track of the library, in library order.
    async fn all_tracks(&self) -> Result<Vec<SourceTrack>>;

    /// Playlists with their members resolved. The flags are passed through to
    /// the library and decide whether smart and hidden (system) playlists are
    /// part of the result.
    async fn playlists(
        &self,
        include_smart: bool,
        include_hidden: bool,
    ) -> Result<Vec<SourcePlaylist>>;
}

#[derive(Debug, Deserialize)]
struct LibraryExport {
    #[serde(default)]
    tracks: Vec<SourceTrack>,
    #[serde(default)]
    playlists: Vec<ExportPlaylist>,
}

#[derive(Debug, Deserialize)]
struct ExportPlaylist {
    name: String,
    #[serde(default)]
    smart: bool,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    members: Vec<String>,
}

/// Library export stored as a single JSON document.
pub struct JsonLibrary {
    export: LibraryExport,
}

impl JsonLibrary {
    pub fn open(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::SourceLibrary(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let library = Self::from_json(&json)?;

        info!(
            "Opened library export {} ({} tracks, {} playlists)",
            path.display(),
            library.export.tracks.len(),
            library.export.playlists.len()
        );

        Ok(library)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let export: LibraryExport = serde_json::from_str(json)
            .map_err(|e| AppError::SourceLibrary(format!("Malformed library export: {}", e)))?;
        Ok(Self { export })
    }

    /// Members that do not name a track of the export are dropped with a
    /// warning; the rest of the playlist is kept.
    fn resolve_members(&self, playlist: &ExportPlaylist) -> Vec<SourceTrack> {
        let by_url: HashMap<&str, &SourceTrack> = self
            .export
            .tracks
            .iter()
            .map(|t| (t.content_url.as_str(), t))
            .collect();

        playlist
            .members
            .iter()
            .filter_map(|url| match by_url.get(url.as_str()) {
                Some(track) => Some((*track).clone()),
                None => {
                    warn!(
                        "Playlist \"{}\" references unknown track {}. Skipping member",
                        playlist.name, url
                    );
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl SourceLibrary for JsonLibrary {
    async fn all_tracks(&self) -> Result<Vec<SourceTrack>> {
        Ok(self.export.tracks.clone())
    }

    async fn playlists(
        &self,
        include_smart: bool,
        include_hidden: bool,
    ) -> Result<Vec<SourcePlaylist>> {
        let mut playlists = Vec::new();

        for playlist in &self.export.playlists {
            if (playlist.smart && !include_smart) || (playlist.hidden && !include_hidden) {
                debug!("Skipping playlist {}", playlist.name);
                continue;
            }

            playlists.push(SourcePlaylist {
                name: playlist.name.clone(),
                smart: playlist.smart,
                hidden: playlist.hidden,
                members: self.resolve_members(playlist),
            });
        }

        Ok(playlists)
    }
}
