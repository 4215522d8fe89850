pub mod clock;
pub mod config;
pub mod convert;
pub mod error;
pub mod migrator;
pub mod source;
pub mod target;

pub use clock::{DateAddedWorkaround, HostClock, SystemClock};
pub use config::Config;
pub use error::{AppError, Result};
pub use migrator::{MigrationScope, MigrationStatistics, Migrator, RetryPolicy};
pub use source::{JsonLibrary, SourceLibrary, SourcePlaylist, SourceTrack};
pub use target::{CatalogStore, Rating, TargetLibrary, TargetTrack};
