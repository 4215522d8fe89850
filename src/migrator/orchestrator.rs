use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;

use crate::clock::{DateAddedWorkaround, HostClock, HostCommand, SystemClock};
use crate::config::Config;
use crate::convert::{to_bounded_int, to_star_rating};
use crate::error::{AppError, Result};
use crate::migrator::report::MigrationStatistics;
use crate::migrator::retry::RetryPolicy;
use crate::source::{JsonLibrary, SourceLibrary, SourcePlaylist, SourceTrack};
use crate::target::{CatalogStore, Rating, TargetLibrary, TrackHandle};

/// Which parts of the library a run migrates.
#[derive(Debug, Clone, Default)]
pub struct MigrationScope {
    /// Only migrate playlists with one of these names (case-insensitive).
    /// Empty means all playlists.
    pub playlist_names: Vec<String>,
    /// Skip the track phase and only migrate playlists and their members.
    pub playlists_only: bool,
}

pub struct Migrator<S, T, C> {
    source: S,
    target: T,
    workaround: DateAddedWorkaround<C>,
    retry: RetryPolicy,
    show_progress: bool,
}

impl<T: TargetLibrary> Migrator<JsonLibrary, T, HostClock> {
    /// Builds a migrator reading the library export at `export_path`. With
    /// `use_clock_workaround` the host clock is changed for every track to
    /// backdate its "date added".
    pub fn from_export(
        export_path: &Path,
        target: T,
        max_retries: u32,
        use_clock_workaround: bool,
        config: &Config,
    ) -> Result<Self> {
        let source = JsonLibrary::open(export_path)?;

        let workaround = if use_clock_workaround {
            let clock = match config.clock_resync_command.as_deref() {
                Some(command) => HostCommand::parse(command)
                    .map(HostClock::with_resync_command)
                    .ok_or_else(|| AppError::Config("CLOCK_RESYNC_COMMAND is empty".into()))?,
                None => HostClock::new(),
            };
            DateAddedWorkaround::Enabled(clock)
        } else {
            DateAddedWorkaround::Disabled
        };

        Ok(Self::new(
            source,
            target,
            workaround,
            config.retry_policy(max_retries),
        ))
    }
}

impl<S: SourceLibrary, C: SystemClock> Migrator<S, CatalogStore, C> {
    /// Runs [`Migrator::migrate`] and saves the catalog afterwards, also when
    /// the migration was aborted, so tracks registered before the abort are
    /// kept. The migration error wins over a failure to save.
    pub async fn migrate_and_save(
        &mut self,
        scope: &MigrationScope,
    ) -> Result<MigrationStatistics> {
        let result = self.migrate(scope).await;

        match (result, self.target.flush()) {
            (Ok(stats), Ok(())) => Ok(stats),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(flush_err)) => {
                warn!("Failed to save catalog after aborted migration: {}", flush_err);
                Err(e)
            }
        }
    }
}

impl<S, T, C> Migrator<S, T, C>
where
    S: SourceLibrary,
    T: TargetLibrary,
    C: SystemClock,
{
    pub fn new(
        source: S,
        target: T,
        workaround: DateAddedWorkaround<C>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            target,
            workaround,
            retry,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Migrates tracks, then playlists.
    ///
    /// Only errors that make the source or the target unusable are returned.
    /// Everything that goes wrong with a single track or playlist is logged
    /// and counted.
    pub async fn migrate(&mut self, scope: &MigrationScope) -> Result<MigrationStatistics> {
        info!(
            "Starting migration (retries={}, date added workaround={}, playlists only={})",
            self.retry.max_retries,
            self.workaround.is_enabled(),
            scope.playlists_only
        );

        let mut stats = MigrationStatistics::new();

        let playlist_stats = if scope.playlists_only {
            // Playlist members reach the catalog for the first time here
            let result = self
                .migrate_playlists(stats.clone(), scope, true, true)
                .await;
            self.resync_clock().await;
            result?
        } else {
            stats = self.migrate_tracks().await?;
            // Members were migrated with their attributes in the track phase
            self.migrate_playlists(stats.clone(), scope, false, false)
                .await?
        };

        stats.merge(&playlist_stats);

        Ok(stats)
    }

    async fn migrate_tracks(&mut self) -> Result<MigrationStatistics> {
        let result = self.migrate_all_tracks().await;
        self.resync_clock().await;
        result
    }

    async fn migrate_all_tracks(&mut self) -> Result<MigrationStatistics> {
        let mut stats = MigrationStatistics::new();

        let tracks = self.source.all_tracks().await?;
        info!("Found {} tracks", tracks.len());

        let pb = self.progress_bar(
            tracks.len(),
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        );

        for track in &tracks {
            pb.set_message(format!("{} - {}", track.artist, track.name));
            stats.track_processed();

            let added = add_track(
                &mut self.target,
                self.workaround.clock(),
                &self.retry,
                track,
                true,
            )
            .await?;
            match added {
                Some(handle) => self.log_track(stats.tracks_processed(), handle, track).await,
                None => stats.track_failed(),
            }
            pb.inc(1);
        }

        pb.finish_with_message("Tracks migrated");

        Ok(stats)
    }

    async fn migrate_playlists(
        &mut self,
        mut stats: MigrationStatistics,
        scope: &MigrationScope,
        set_properties: bool,
        use_clock: bool,
    ) -> Result<MigrationStatistics> {
        let playlists = self.source.playlists(true, true).await?;
        let playlists = select_playlists(playlists, &scope.playlist_names);
        info!("Found {} playlists", playlists.len());

        let pb = self.progress_bar(
            playlists.len(),
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        );

        for playlist in &playlists {
            pb.set_message(format!("Migrating: {}", playlist.name));
            stats.playlist_processed();

            let target_playlist = match self.target.create_playlist(&playlist.name).await {
                Ok(target_playlist) => target_playlist,
                Err(e) if e.is_systemic() => return Err(e),
                Err(e) => {
                    warn!(
                        "Failed to create catalog playlist \"{}\": {}",
                        playlist.name, e
                    );
                    stats.playlist_failed();
                    pb.inc(1);
                    continue;
                }
            };
            info!(
                "Created playlist #{}: {}",
                stats.playlists_processed(),
                playlist.name
            );

            for member in &playlist.members {
                stats.playlist_track_processed();

                let clock = if use_clock {
                    self.workaround.clock()
                } else {
                    None
                };
                let Some(handle) =
                    add_track(&mut self.target, clock, &self.retry, member, set_properties).await?
                else {
                    stats.playlist_track_failed();
                    continue;
                };

                match self.target.add_to_playlist(target_playlist, handle).await {
                    Ok(()) => info!(
                        "Added playlist track #{}: Playlist \"{}\" - Track {} - {}",
                        stats.playlist_tracks_processed(),
                        playlist.name,
                        member.artist,
                        member.name
                    ),
                    Err(e) if e.is_systemic() => return Err(e),
                    Err(e) => {
                        warn!(
                            "Failed to add {} to playlist \"{}\": {}",
                            member.content_url, playlist.name, e
                        );
                        stats.playlist_track_failed();
                    }
                }
            }
            pb.inc(1);
        }

        pb.finish_with_message("Playlists migrated");

        Ok(stats)
    }

    async fn resync_clock(&self) {
        let Some(clock) = self.workaround.clock() else {
            return;
        };

        debug!("Trying to resync system time from time server");
        if let Err(e) = clock.resync().await {
            warn!("Failed to resync system clock: {}", e);
        }
    }

    async fn log_track(&self, index: u64, handle: TrackHandle, source: &SourceTrack) {
        match self.target.track(handle).await {
            Ok(track) => info!(
                "Added track #{}: {} - {}: created={}; lastPlayed={}; lastSkipped={}; playCount={}; rating={}; skipCount={}; path={}",
                index,
                source.artist,
                source.name,
                track.date_added,
                fmt_date(track.played_date),
                fmt_date(track.skipped_date),
                track.played_count,
                fmt_rating(track.rating),
                track.skipped_count,
                source.content_url
            ),
            Err(e) => debug!(
                "Added track #{} but could not read it back: {}",
                index, e
            ),
        }
    }

    fn progress_bar(&self, len: usize, template: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

fn fmt_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339()).unwrap_or_else(|| "-".to_string())
}

fn fmt_rating(rating: Rating) -> String {
    format!("{} ({}%)", rating, rating.percent())
}

fn select_playlists(playlists: Vec<SourcePlaylist>, names: &[String]) -> Vec<SourcePlaylist> {
    if names.is_empty() {
        return playlists;
    }

    for name in names {
        if !playlists
            .iter()
            .any(|p| p.name.to_lowercase() == name.to_lowercase())
        {
            warn!("Playlist not found in library: {}", name);
        }
    }

    playlists
        .into_iter()
        .filter(|p| {
            names
                .iter()
                .any(|name| p.name.to_lowercase() == name.to_lowercase())
        })
        .collect()
}

/// Attribute values of a source track in the catalog's form.
#[derive(Debug, Clone, PartialEq)]
struct TrackAttributes {
    played_count: i32,
    played_date: Option<DateTime<Utc>>,
    rating: Rating,
    skipped_count: i32,
    skipped_date: Option<DateTime<Utc>>,
}

impl TrackAttributes {
    fn from_source(track: &SourceTrack) -> Result<Self> {
        Ok(Self {
            played_count: to_bounded_int(track.play_count)?,
            played_date: track.last_played,
            rating: to_star_rating(track.rating)?,
            skipped_count: to_bounded_int(track.skip_count)?,
            skipped_date: track.last_skipped,
        })
    }

    async fn apply<T: TargetLibrary>(&self, target: &mut T, track: TrackHandle) -> Result<()> {
        target.set_played_count(track, self.played_count).await?;
        if let Some(date) = self.played_date {
            target.set_played_date(track, date).await?;
        }
        target.set_rating(track, self.rating).await?;
        target.set_skipped_count(track, self.skipped_count).await?;
        if let Some(date) = self.skipped_date {
            target.set_skipped_date(track, date).await?;
        }
        Ok(())
    }
}

/// Resolves a content URL to an absolute local path. Fails for malformed URLs
/// and URLs that do not point into the file system.
fn to_absolute_path(content_url: &str) -> Result<PathBuf> {
    let url = Url::parse(content_url).map_err(|e| AppError::InvalidUri {
        url: content_url.to_string(),
        reason: e.to_string(),
    })?;

    url.to_file_path().map_err(|()| AppError::InvalidUri {
        url: content_url.to_string(),
        reason: "not a valid path within the file system".to_string(),
    })
}

/// Adds one track to the catalog.
///
/// Returns `Ok(None)` when the track was skipped; the reason has been logged.
/// A track the catalog reports as not modifiable yet is registered again from
/// scratch, up to `retry.max_retries` times.
async fn add_track<T, C>(
    target: &mut T,
    clock: Option<&C>,
    retry: &RetryPolicy,
    track: &SourceTrack,
    set_properties: bool,
) -> Result<Option<TrackHandle>>
where
    T: TargetLibrary,
    C: SystemClock,
{
    let path = match to_absolute_path(&track.content_url) {
        Ok(path) => path,
        Err(e) => {
            warn!("Error adding track to the catalog ({}). Skipping track", e);
            return Ok(None);
        }
    };

    let attributes = if set_properties {
        match TrackAttributes::from_source(track) {
            Ok(attributes) => Some(attributes),
            Err(e) => {
                warn!(
                    "Track attributes cannot be migrated ({}). Skipping file: {}",
                    e, track.content_url
                );
                return Ok(None);
            }
        }
    } else {
        None
    };

    let mut retries = retry.start();
    loop {
        let err = match register(target, clock, track, &path, attributes.as_ref()).await {
            Ok(handle) => return Ok(Some(handle)),
            Err(e) => e,
        };

        if err.is_systemic() {
            return Err(err);
        }

        if err.is_transient() {
            match retries.next_attempt() {
                Some(delay) => {
                    debug!(
                        "Track was added, but error setting attributes ({}). Retrying {} more times. File: {}",
                        err,
                        retries.remaining() + 1,
                        track.content_url
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
                None => {
                    warn!(
                        "Unable to set track attributes, tried {} times without luck. Skipping. You might add the file manually: {}",
                        retry.max_retries + 1,
                        track.content_url
                    );
                    return Ok(None);
                }
            }
        }

        match &err {
            AppError::UnreadableFile(reason) => {
                warn!(
                    "File not added by the catalog. File corrupt, missing or not supported? Skipping file: {} ({})",
                    track.content_url, reason
                );
                return Ok(None);
            }
            AppError::UnsupportedFile(_) => {
                warn!(
                    "File not added by the catalog. Unsupported type? Skipping file: {}",
                    track.content_url
                );
                return Ok(None);
            }
            other => {
                warn!(
                    "Failed to add track to the catalog ({}). Skipping file: {}",
                    other, track.content_url
                );
                return Ok(None);
            }
        }
    }
}

async fn register<T, C>(
    target: &mut T,
    clock: Option<&C>,
    track: &SourceTrack,
    path: &Path,
    attributes: Option<&TrackAttributes>,
) -> Result<TrackHandle>
where
    T: TargetLibrary,
    C: SystemClock,
{
    if let (Some(clock), Some(_)) = (clock, attributes) {
        // The catalog stamps "date added" from the host clock on registration
        debug!("Setting system time to {}", track.created);
        if let Err(e) = clock.set(track.created).await {
            warn!("Failed to set system clock to {}: {}", track.created, e);
        }
    }

    let handle = target.register_file(path).await?;

    if let Some(attributes) = attributes {
        attributes.apply(target, handle).await?;
    }

    Ok(handle)
}
