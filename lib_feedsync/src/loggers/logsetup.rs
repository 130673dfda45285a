use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use log::LevelFilter;

/// Installs the global logger and returns the path of this run's log file.
///
/// The file is `<log_dir>/<file_prefix>_<local timestamp>.log`. Older `.log`
/// files in `log_dir` are removed first so that only the newest previous run
/// survives next to the new one.
///
/// # Errors
/// Fails if the directory or file cannot be created, or if a global logger is
/// already installed.
pub fn setup_logging(log_dir: &Path, file_prefix: &str, log_level: &str) -> Result<PathBuf> {
    fs::create_dir_all(log_dir).with_context(|| format!("cannot create log dir {}", log_dir.display()))?;

    // Clean up old log files, keeping only the most recent one
    cleanup_old_logs(log_dir, 1)?;

    let log_file_name = format!("{file_prefix}_{}.log", chrono::Local::now().format("%Y-%m-%d_%H-%M-%S"));
    let log_path = log_dir.join(log_file_name);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(parse_level(log_level))
        // Transport internals are noisy at debug.
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(&log_path)?)
        .apply()?;

    Ok(log_path)
}

/// Maps a level name to a filter. Unknown names fall back to `Info`.
pub fn parse_level(log_level: &str) -> LevelFilter {
    match log_level.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" | "warning" => LevelFilter::Warn,
        "error" | "fatal" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Deletes all but the `keep` most recently modified `.log` files in `log_dir`.
/// Returns how many files were removed.
pub fn cleanup_old_logs(log_dir: &Path, keep: usize) -> Result<usize> {
    let mut entries: Vec<(SystemTime, PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "log"))
        .map(|p| {
            let modified = fs::metadata(&p)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, p)
        })
        .collect();

    // Newest first
    entries.sort_by_key(|(modified, _)| Reverse(*modified));

    let mut removed = 0;
    for (_, path) in entries.iter().skip(keep) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Failed to delete old log file {}: {e}", path.display()),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs)).unwrap();
        path
    }

    #[test]
    fn keeps_only_newest_log_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = touch(dir.path(), "feed_watch_old.log", 300);
        let older = touch(dir.path(), "feed_watch_older.log", 600);
        let newest = touch(dir.path(), "feed_watch_new.log", 10);
        let other = touch(dir.path(), "feed_watch.conf", 900);

        assert_eq!(cleanup_old_logs(dir.path(), 1).unwrap(), 2);
        assert!(newest.exists());
        assert!(!old.exists());
        assert!(!older.exists());
        assert!(other.exists());
    }

    #[test]
    fn empty_dir_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(dir.path(), 1).unwrap(), 0);
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("fatal"), LevelFilter::Error);
        assert_eq!(parse_level("verbose"), LevelFilter::Info);
    }
}
