pub mod orchestrator;
pub mod report;
pub mod retry;

pub use orchestrator::{MigrationScope, Migrator};
pub use report::MigrationStatistics;
pub use retry::{RetryPolicy, RetryState};
