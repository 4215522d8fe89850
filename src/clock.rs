//! Host clock manipulation used to backdate "date added" in the catalog.
//!
//! The catalog stamps "date added" from the host clock when a file is
//! registered and offers no way to change it afterwards. Setting the host clock
//! to the original creation time right before registration works around that.
//! This needs administrator rights, races with everything else running on the
//! host and leaves the clock wrong if the process dies mid-run, so every
//! failure here is reported and otherwise ignored.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use tokio::process::Command;
use tracing::debug;

use crate::error::{AppError, Result};

#[async_trait]
pub trait SystemClock: Send + Sync {
    /// Sets the host clock to `time`.
    async fn set(&self, time: DateTime<Utc>) -> Result<()>;

    /// Resynchronizes the host clock with a time source.
    async fn resync(&self) -> Result<()>;
}

/// Whether the run backdates "date added" through the host clock.
pub enum DateAddedWorkaround<C> {
    Disabled,
    Enabled(C),
}

impl<C> DateAddedWorkaround<C> {
    pub fn clock(&self) -> Option<&C> {
        match self {
            DateAddedWorkaround::Disabled => None,
            DateAddedWorkaround::Enabled(clock) => Some(clock),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, DateAddedWorkaround::Enabled(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HostCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Splits a whitespace separated command line. No shell quoting.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }

    fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run(&self) -> Result<()> {
        debug!("Running host command: {}", self.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| {
                AppError::Clock(format!(
                    "Changing the system clock failed (\"{}\") with exception: {}",
                    self.display(),
                    e
                ))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match output.status.code() {
            Some(code) => format!("exit value {}", code),
            None => "terminated by signal".to_string(),
        };
        Err(AppError::Clock(format!(
            "Changing the system clock failed (\"{}\"): {} {}",
            self.display(),
            reason,
            stderr.trim()
        )))
    }
}

/// `cmd /C date dd-MM-yy & time HH:mm`, in local time.
fn windows_set_command(local: NaiveDateTime) -> HostCommand {
    let date = local.format("%d-%m-%y").to_string();
    let time = local.format("%H:%M").to_string();
    HostCommand::new("cmd", &["/C", "date", &date, "&", "time", &time])
}

/// `date -u -s "YYYY-MM-DD HH:MM:SS"`, in UTC.
fn unix_set_command(time: DateTime<Utc>) -> HostCommand {
    let stamp = time.format("%Y-%m-%d %H:%M:%S").to_string();
    HostCommand::new("date", &["-u", "-s", &stamp])
}

fn default_resync_command() -> HostCommand {
    if cfg!(windows) {
        HostCommand::new("cmd", &["/C", "w32tm", "/resync", "/force"])
    } else if cfg!(target_os = "macos") {
        HostCommand::new("sntp", &["-sS", "time.apple.com"])
    } else {
        HostCommand::new("hwclock", &["--hctosys"])
    }
}

/// Clock of the machine the migration runs on.
pub struct HostClock {
    resync: HostCommand,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            resync: default_resync_command(),
        }
    }

    pub fn with_resync_command(resync: HostCommand) -> Self {
        Self { resync }
    }

    pub fn set_command(time: DateTime<Utc>) -> HostCommand {
        if cfg!(windows) {
            windows_set_command(time.with_timezone(&Local).naive_local())
        } else {
            unix_set_command(time)
        }
    }
}

#[async_trait]
impl SystemClock for HostClock {
    async fn set(&self, time: DateTime<Utc>) -> Result<()> {
        Self::set_command(time).run().await
    }

    async fn resync(&self) -> Result<()> {
        self.resync.run().await
    }
}
