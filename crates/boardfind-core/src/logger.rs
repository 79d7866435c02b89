//! Stderr logging for the pipeline crates.
//!
//! `init_with_level` installs a small `log` backend printing
//! `[elapsed LEVEL stage] message`, where `stage` is the module path with the
//! `boardfind_` prefix dropped (`lines::hough`, `board::detector`, …).
//! Records from other crates (image decoders and the like) are capped at
//! `warn`. With the `tracing` feature, `init_tracing` installs a
//! `tracing-subscriber` instead.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_PREFIX: &str = "boardfind";
const FOREIGN_LEVEL: LevelFilter = LevelFilter::Warn;

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn level_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_PREFIX) {
            self.level
        } else {
            self.level.min(FOREIGN_LEVEL)
        }
    }
}

fn stage_name(target: &str) -> &str {
    target
        .strip_prefix("boardfind_")
        .or_else(|| target.strip_prefix(OWN_PREFIX))
        .map(|s| s.trim_start_matches("::"))
        .filter(|s| !s.is_empty())
        .unwrap_or(target)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{:8.3}s {:<5} {}] {}",
            elapsed,
            record.level(),
            stage_name(record.target()),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. `level` applies to the `boardfind-*` crates.
///
/// Only the first call installs anything; later calls return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Filter directives equivalent to the stderr logger at `level`.
#[cfg(any(feature = "tracing", test))]
fn default_directives(level: LevelFilter) -> String {
    let foreign = level.min(FOREIGN_LEVEL);
    format!(
        "{},{OWN_PREFIX}={}",
        foreign.as_str().to_ascii_lowercase(),
        level.as_str().to_ascii_lowercase()
    )
}

/// Install a `tracing` subscriber. `RUST_LOG` overrides the default filter,
/// which applies `level` the way `init_with_level` does. Span close events
/// carry per-stage timings.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
