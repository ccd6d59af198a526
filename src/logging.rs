use std::fs::OpenOptions;
use std::path::PathBuf;

use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

use crate::broker::AuditEvent;
use crate::config::Settings;

/// Install the process logger: stderr always, plus an append-only log file
/// when `settings.log_file` is non-empty.
///
/// Best-effort: an unopenable log file or a logger that is already installed
/// is reported on stderr and otherwise ignored (logging must never block
/// command execution).
pub fn init(settings: &Settings) {
    let level = settings
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);
    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_time_format_rfc3339()
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file_path(&settings.log_file) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
            Err(e) => eprintln!("kubeops-gate: cannot open log file {}: {e}", path.display()),
        }
    }

    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("kubeops-gate: logger already initialized: {e}");
    }
}

/// Expand `~` and env vars in the configured log path. Empty disables file logging.
fn log_file_path(raw: &str) -> Option<PathBuf> {
    if raw.trim().is_empty() {
        return None;
    }
    let expanded = shellexpand::full(raw).ok()?;
    Some(PathBuf::from(expanded.as_ref()))
}

/// Default audit sink: one JSON line at info level on the `audit` target.
pub fn log_audit(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(line) => log::info!(target: "audit", "{line}"),
        Err(e) => log::warn!(target: "audit", "unserializable audit event: {e}"),
    }
}

/// UTC timestamp (RFC 3339, second precision) without external deps.
pub fn timestamp_now() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_timestamp(dur.as_secs())
}

fn format_timestamp(secs: u64) -> String {
    let days = secs / 86400;
    let rem = secs % 86400;
    let h = rem / 3600;
    let m = (rem % 3600) / 60;
    let s = rem % 60;
    let (year, month, day) = epoch_days_to_date(days);
    format!("{year:04}-{month:02}-{day:02}T{h:02}:{m:02}:{s:02}Z")
}

/// Convert days since Unix epoch to (year, month, day).
fn epoch_days_to_date(days: u64) -> (u64, u64, u64) {
    // Civil calendar from days algorithm (Howard Hinnant)
    let z = days + 719468;
    let era = z / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_start() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn leap_day() {
        // 2024-02-29T12:30:45Z
        assert_eq!(format_timestamp(1_709_209_845), "2024-02-29T12:30:45Z");
    }

    #[test]
    fn now_is_well_formed() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn empty_log_path_disables_file() {
        assert!(log_file_path("").is_none());
        assert!(log_file_path("   ").is_none());
    }

    #[test]
    fn absolute_log_path_kept() {
        assert_eq!(
            log_file_path("/var/log/kubeops.log"),
            Some(PathBuf::from("/var/log/kubeops.log"))
        );
    }
}
