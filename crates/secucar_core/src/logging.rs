//! Process-wide logging for the persistence core.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend behind the `log` facade once.
//! - Send records to size-rotated files, or to stderr when no directory is set.
//! - Report panics as one sanitized `event=panic_captured` line.
//!
//! # Invariants
//! - Repeating `init_logging` with the same level and target is a no-op.
//! - Asking for a different level or target after start is an error.
//! - Nothing here panics.
//!
//! Severity mapping: DEBUG -> `debug!`, ERROR -> `error!`, FATAL -> `error!`
//! with a `severity=fatal` field.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "secucar";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_SUMMARY_MAX_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    Directory(PathBuf),
}

impl LogTarget {
    fn resolve(log_dir: Option<&Path>) -> Result<Self, String> {
        let Some(dir) = log_dir else {
            return Ok(Self::Stderr);
        };
        if dir.as_os_str().is_empty() {
            return Err("log directory cannot be empty".to_string());
        }
        if !dir.is_absolute() {
            return Err(format!(
                "log directory must be absolute, got `{}`",
                dir.display()
            ));
        }
        Ok(Self::Directory(dir.to_path_buf()))
    }

    fn directory(&self) -> Option<&Path> {
        match self {
            Self::Stderr => None,
            Self::Directory(dir) => Some(dir.as_path()),
        }
    }
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

struct ActiveLogger {
    level: &'static str,
    target: LogTarget,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn ensure_matches(&self, level: &'static str, target: &LogTarget) -> Result<(), String> {
        if self.target != *target {
            return Err(format!(
                "logging already writes to `{}`; refusing to switch to `{target}`",
                self.target
            ));
        }
        if self.level != level {
            return Err(format!(
                "logging already runs at `{}`; refusing to switch to `{level}`",
                self.level
            ));
        }
        Ok(())
    }
}

/// Starts logging at `level`.
///
/// `log_dir = None` writes to stderr; `Some(dir)` writes rotated
/// `secucar*.log` files under `dir`, creating it when needed.
///
/// # Errors
/// - Unknown level names.
/// - A relative or empty `log_dir`, or one that cannot be created.
/// - Logging already started with another level or target.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), String> {
    let level = normalize_level(level)?;
    let target = LogTarget::resolve(log_dir)?;

    let active = ACTIVE.get_or_try_init(|| start_logger(level, &target))?;
    active.ensure_matches(level, &target)
}

/// Active `(level, log_dir)`, or `None` before `init_logging` succeeded.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    ACTIVE.get().map(|active| {
        (
            active.level,
            active.target.directory().map(Path::to_path_buf),
        )
    })
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

pub(crate) fn normalize_level(level: &str) -> Result<&'static str, String> {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        other => {
            return Err(format!(
                "unsupported log level `{other}`; expected trace|debug|info|warn|error"
            ))
        }
    };
    Ok(level)
}

fn start_logger(level: &'static str, target: &LogTarget) -> Result<ActiveLogger, String> {
    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let logger = match target {
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| format!("cannot create log directory `{}`: {err}", dir.display()))?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };

    let handle = logger
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;
    install_panic_hook();

    info!(
        "event=logging_init module=core status=ok level={} target={} version={}",
        level,
        target,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        target: target.clone(),
        _handle: handle,
    })
}

fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let chained = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
            error!(
                "event=panic_captured module=core status=error location={} payload={}",
                location,
                panic_summary(info)
            );
            chained(info);
        }));
    });
}

// Payloads can carry record fields; flatten and cap them.
fn panic_summary(info: &PanicHookInfo<'_>) -> String {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    single_line(&payload, PANIC_SUMMARY_MAX_CHARS)
}

fn single_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, normalize_level, single_line, LogTarget};
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_log_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "secucar-logs-{tag}-{}-{nanos}",
            std::process::id()
        ))
    }

    #[test]
    fn level_names_are_normalized() {
        assert_eq!(normalize_level(" WARNING ").unwrap(), "warn");
        assert_eq!(normalize_level("Error").unwrap(), "error");
        assert!(normalize_level("fatal").is_err());
    }

    #[test]
    fn relative_directory_is_not_a_target() {
        let err = LogTarget::resolve(Some(Path::new("logs/dev"))).unwrap_err();
        assert!(err.contains("absolute"));
        assert_eq!(LogTarget::resolve(None).unwrap(), LogTarget::Stderr);
    }

    #[test]
    fn long_multiline_payload_is_flattened_and_capped() {
        let summary = single_line("first\nsecond\rthird", 8);
        assert_eq!(summary, "first se...");
        assert_eq!(single_line("short", 8), "short");
    }

    #[test]
    fn second_init_must_repeat_the_first_setup() {
        let dir = scratch_log_dir("active");
        let other = scratch_log_dir("other");

        init_logging("info", Some(&dir)).unwrap();
        init_logging("INFO", Some(&dir)).unwrap();

        for err in [
            init_logging("debug", Some(&dir)).unwrap_err(),
            init_logging("info", Some(&other)).unwrap_err(),
            init_logging("info", None).unwrap_err(),
        ] {
            assert!(err.contains("refusing to switch"), "{err}");
        }

        assert_eq!(logging_status(), Some(("info", Some(dir))));
    }
}
