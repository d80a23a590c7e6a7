//! Transform configuration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Default suffix appended to the input path for the backup copy.
pub const DEFAULT_BACKUP_SUFFIX: &str = ".backup";

/// Configuration for one transform run.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Whether to copy the original bytes aside before overwriting the input.
    pub backup: bool,

    /// Suffix appended to the input path to name the backup.
    pub backup_suffix: String,

    /// Whether an existing backup file may be replaced.
    pub overwrite_backup: bool,

    /// Whether verification also compares fingerprints of carried-over bytes,
    /// not only lengths and region boundaries.
    pub verify_fingerprints: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            backup: true,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            overwrite_backup: false,
            verify_fingerprints: true,
        }
    }
}

impl TransformConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to back up the input before overwriting it.
    #[must_use]
    pub const fn backup(mut self, value: bool) -> Self {
        self.backup = value;
        self
    }

    /// Sets the backup suffix.
    #[must_use]
    pub fn backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    /// Sets whether an existing backup may be replaced.
    #[must_use]
    pub const fn overwrite_backup(mut self, value: bool) -> Self {
        self.overwrite_backup = value;
        self
    }

    /// Sets whether verification compares fingerprints.
    #[must_use]
    pub const fn verify_fingerprints(mut self, value: bool) -> Self {
        self.verify_fingerprints = value;
        self
    }

    /// Backup path for `input`: the input path with the suffix appended.
    #[must_use]
    pub fn backup_path_for(&self, input: &Path) -> PathBuf {
        let mut name: OsString = input.as_os_str().to_owned();
        name.push(&self.backup_suffix);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TransformConfig::default();
        assert!(config.backup);
        assert!(!config.overwrite_backup);
        assert!(config.verify_fingerprints);
        assert_eq!(config.backup_suffix, ".backup");
    }

    #[test]
    fn builder_pattern() {
        let config = TransformConfig::new()
            .backup(false)
            .backup_suffix(".bak")
            .overwrite_backup(true);

        assert!(!config.backup);
        assert!(config.overwrite_backup);
        assert_eq!(config.backup_suffix, ".bak");
    }

    #[test]
    fn backup_path_appends_suffix() {
        let config = TransformConfig::default();
        assert_eq!(
            config.backup_path_for(Path::new("ep176/snapshotTxStatusData")),
            PathBuf::from("ep176/snapshotTxStatusData.backup")
        );
        assert_eq!(
            config.backup_path_for(Path::new("logEventState.db")),
            PathBuf::from("logEventState.db.backup")
        );
    }
}
