use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use txe_types::SCHEME;

/// Subfolder of the incoming root holding per-transaction working
/// directories.
const TRANSACTION_AREA: &str = "Transaction";

/// Subfolder of the incoming root holding package archives.
const ZIP_AREA: &str = "Zip";

/// Result of one retention sweep.
#[derive(Clone, Debug, Default)]
pub struct SweepReport {
    /// Entries (files or whole directories) deleted.
    pub removed: usize,
    /// Aged entries that could not be deleted.
    pub failed: usize,
}

/// Age-based reclamation of leftover transaction artifacts.
///
/// Consumers are expected to delete what they retrieve, but crashed
/// producers and incurious pollers leak files. The sweeper walks four
/// areas and deletes whatever has outlived the configured maximum age:
/// scheme-prefixed files at the top of the incoming root, the
/// `Transaction/` and `Zip/` subfolders (scheme-prefixed directories go
/// wholesale, files go regardless of name), and the external temporary
/// folder when one is configured. Without a maximum age every run is a
/// no-op.
pub struct RetentionSweeper {
    incoming_root: PathBuf,
    temporary_folder: Option<PathBuf>,
    max_age: Option<Duration>,
}

impl RetentionSweeper {
    /// `max_age_minutes: None` disables sweeping entirely.
    pub fn new(
        incoming_root: impl Into<PathBuf>,
        temporary_folder: Option<PathBuf>,
        max_age_minutes: Option<u64>,
    ) -> Self {
        Self {
            incoming_root: incoming_root.into(),
            temporary_folder,
            max_age: max_age_minutes.map(|minutes| Duration::from_secs(minutes * 60)),
        }
    }

    /// Whether a finite maximum age is configured.
    pub fn is_enabled(&self) -> bool {
        self.max_age.is_some()
    }

    /// Sweep all areas. Per-entry failures are logged and counted; none
    /// of them aborts the sweep.
    pub fn run(&self) -> SweepReport {
        let Some(max_age) = self.max_age else {
            debug!("no maximum state age configured; sweep skipped");
            return SweepReport::default();
        };

        let now = SystemTime::now();
        let mut report = SweepReport::default();

        self.sweep_root_files(now, max_age, &mut report);
        self.sweep_area(
            &self.incoming_root.join(TRANSACTION_AREA),
            now,
            max_age,
            &mut report,
        );
        self.sweep_area(&self.incoming_root.join(ZIP_AREA), now, max_age, &mut report);
        if let Some(temp) = &self.temporary_folder {
            self.sweep_area(temp, now, max_age, &mut report);
        }

        info!(
            removed = report.removed,
            failed = report.failed,
            "retention sweep finished"
        );
        report
    }

    /// Top-level files in the incoming root. Only scheme-prefixed names
    /// are transaction artifacts; uploaded packages and the metadata
    /// document are left alone, and so are the area subfolders.
    fn sweep_root_files(&self, now: SystemTime, max_age: Duration, report: &mut SweepReport) {
        let entries = match fs::read_dir(&self.incoming_root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.incoming_root.display(),
                    error = %e,
                    "cannot read incoming root; sweep area skipped"
                );
                return;
            }
        };
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() || !has_scheme_prefix(&entry) {
                continue;
            }
            if is_aged(&entry, now, max_age) {
                remove_file(&entry.path(), report);
            }
        }
    }

    /// An archive area: scheme-prefixed directories are removed with
    /// everything in them, files are removed regardless of name.
    fn sweep_area(&self, dir: &Path, now: SystemTime, max_age: Duration, report: &mut SweepReport) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => {
                debug!(path = %dir.display(), "sweep area not present; skipped");
                return;
            }
        };
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if has_scheme_prefix(&entry) && is_aged(&entry, now, max_age) {
                    remove_dir(&entry.path(), report);
                }
            } else if file_type.is_file() && is_aged(&entry, now, max_age) {
                remove_file(&entry.path(), report);
            }
        }
    }
}

fn has_scheme_prefix(entry: &fs::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with(SCHEME))
        .unwrap_or(false)
}

/// Strictly older than the maximum; an entry exactly at the limit, with an
/// unreadable mtime, or with an mtime in the future is retained.
fn is_aged(entry: &fs::DirEntry, now: SystemTime, max_age: Duration) -> bool {
    let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
        return false;
    };
    match now.duration_since(modified) {
        Ok(age) => age > max_age,
        Err(_) => false,
    }
}

fn remove_file(path: &Path, report: &mut SweepReport) {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "aged file removed");
            report.removed += 1;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not remove aged file");
            report.failed += 1;
        }
    }
}

fn remove_dir(path: &Path, report: &mut SweepReport) {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "aged working directory removed");
            report.removed += 1;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not remove aged directory");
            report.failed += 1;
        }
    }
}
