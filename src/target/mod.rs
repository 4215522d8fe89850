pub mod catalog;
pub mod models;

pub use catalog::{CatalogStore, TargetLibrary};
pub use models::{PlaylistHandle, Rating, TargetPlaylist, TargetTrack, TrackHandle};
