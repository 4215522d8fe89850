pub mod library;
pub mod models;

pub use library::{JsonLibrary, SourceLibrary};
pub use models::{SourcePlaylist, SourceTrack};
