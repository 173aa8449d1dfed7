//! Logging utilities for cubby
//!
//! This module is only available with the `logging` feature.
//!
//! The organizer emits two kinds of `tracing` events: `warn!` for the
//! placement diagnostics that also land on the build report, and `debug!`
//! for protocol steps (tagging renames, manual bucket records, placement
//! decisions). Library users should install their own subscriber; the
//! helpers here are for hosts that have none.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Verbosity of the organizer's own events.
///
/// The levels map onto what the workspace actually emits, so there is no
/// `Error` variant: failures are returned as [`Error`](crate::Error)
/// values, never logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// No output.
    Silent,
    /// Placement diagnostics: everything that becomes an
    /// [`OrganizeWarning`](crate::OrganizeWarning) on the build report,
    /// plus restore failures caught by the drop backstop.
    #[default]
    Warn,
    /// Diagnostics plus per-phase protocol steps.
    Debug,
}

impl LogLevel {
    /// Filter directives scoped to the workspace crates, so a host's own
    /// dependencies stay quiet even at `Debug`.
    fn as_directives(&self) -> &'static str {
        match self {
            LogLevel::Silent => "cubby=off,cubby_graph=off",
            LogLevel::Warn => "cubby=warn,cubby_graph=warn",
            LogLevel::Debug => "cubby=debug,cubby_graph=debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogLevel::Silent => "silent",
            LogLevel::Warn => "warn",
            LogLevel::Debug => "debug",
        })
    }
}

/// Install a process-global subscriber showing the organizer's events at
/// `level`. The level is exact; `RUST_LOG` is not consulted (use
/// [`init_logging_from_env`] for that).
///
/// Safe to call from multiple threads; only the first call per process
/// takes effect.
///
/// # Example
///
/// ```rust,no_run
/// use cubby::logging::{LogLevel, init_logging};
/// use cubby::{Organizer, OrganizerOptions};
///
/// # fn main() -> cubby::Result<()> {
/// init_logging(LogLevel::Debug);
///
/// let organizer = Organizer::new(OrganizerOptions::new("/app/src"))?;
/// // Sessions now trace tagging renames and grouping decisions.
/// # Ok(())
/// # }
/// ```
pub fn init_logging(level: LogLevel) {
    init_with_filter(EnvFilter::new(level.as_directives()));
}

/// Install the subscriber with directives taken from `RUST_LOG`, falling
/// back to [`LogLevel::Warn`]'s workspace-scoped defaults when the
/// variable is unset or unparsable.
///
/// # Example
///
/// ```rust,no_run
/// use cubby::logging::init_logging_from_env;
///
/// // RUST_LOG=cubby=debug traces the organizer without touching the host.
/// init_logging_from_env();
/// ```
pub fn init_logging_from_env() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::default().as_directives()));
    init_with_filter(filter);
}

fn init_with_filter(filter: EnvFilter) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer().compact().with_target(false).without_time(), // Hosts control timestamps
            )
            .init();
    });
}
