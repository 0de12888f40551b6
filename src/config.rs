use std::path::Path;

use config::{Config, Environment, File as ConfigFile};
use flate2::Compression;
use serde::Deserialize;

use crate::archive::{ArchiveLayout, DEFAULT_ARCHIVE_NAME};
use crate::engine::{WalkConfig, DEFAULT_MAX_OPEN};
use crate::error::FileUtilError;
use crate::paths::is_plain_file_name;

/// Base name of the optional settings file looked up in the working
/// directory (`fileutil.toml`, `fileutil.yaml`, ...).
pub const SETTINGS_FILE: &str = "fileutil";

/// Prefix of environment overrides, e.g. `FILEUTIL_MAX_OPEN_DIRS=8`.
pub const ENV_PREFIX: &str = "FILEUTIL";

/// Tunables that are not part of the positional command line.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Cap on directory handles open during a walk.
    pub max_open_dirs: usize,

    /// File name of the container written into the storage directory.
    pub archive_name: String,

    pub archive_layout: ArchiveLayout,

    /// End the walk after the first match has been handled.
    pub stop_on_first_match: bool,

    /// gzip level, 0 (store) to 9 (best).
    pub compression_level: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_open_dirs: DEFAULT_MAX_OPEN,
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            archive_layout: ArchiveLayout::PerMatch,
            stop_on_first_match: false,
            compression_level: 6,
        }
    }
}

impl Settings {
    /// Load `fileutil.*` from the working directory if present, then apply
    /// `FILEUTIL_*` environment overrides.
    pub fn load() -> Result<Self, FileUtilError> {
        let settings: Settings = Config::builder()
            .add_source(ConfigFile::with_name(SETTINGS_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from one explicit file, without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, FileUtilError> {
        let settings: Settings = Config::builder()
            .add_source(ConfigFile::from(path).required(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), FileUtilError> {
        if self.max_open_dirs == 0 {
            return Err(FileUtilError::InvalidSetting(
                "max_open_dirs must be at least 1".into(),
            ));
        }
        if !is_plain_file_name(&self.archive_name) {
            return Err(FileUtilError::InvalidSetting(format!(
                "archive_name `{}` must be a plain file name",
                self.archive_name
            )));
        }
        if self.compression_level > 9 {
            return Err(FileUtilError::InvalidSetting(format!(
                "compression_level {} is outside 0..=9",
                self.compression_level
            )));
        }
        Ok(())
    }

    pub fn walk_config(&self) -> WalkConfig {
        WalkConfig { max_open: self.max_open_dirs }
    }

    pub fn compression(&self) -> Compression {
        Compression::new(self.compression_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.max_open_dirs, 20);
        assert_eq!(s.archive_name, "a1.tar");
        assert_eq!(s.archive_layout, ArchiveLayout::PerMatch);
        assert!(!s.stop_on_first_match);
    }

    #[test]
    fn file_overrides_only_what_it_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fileutil.toml");
        fs::write(&path, "max_open_dirs = 4\narchive_layout = \"bundle\"\n").unwrap();

        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.max_open_dirs, 4);
        assert_eq!(s.archive_layout, ArchiveLayout::Bundle);
        assert_eq!(s.archive_name, "a1.tar");
        assert_eq!(s.walk_config().max_open, 4);
    }

    #[test]
    fn rejects_bad_values() {
        let zero = Settings { max_open_dirs: 0, ..Default::default() };
        assert!(matches!(zero.validate(), Err(FileUtilError::InvalidSetting(_))));

        let nested = Settings { archive_name: "sub/a1.tar".into(), ..Default::default() };
        assert!(matches!(nested.validate(), Err(FileUtilError::InvalidSetting(_))));

        let level = Settings { compression_level: 12, ..Default::default() };
        assert!(matches!(level.validate(), Err(FileUtilError::InvalidSetting(_))));
    }

    #[test]
    fn invalid_file_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fileutil.toml");
        fs::write(&path, "max_open_dirs = 0\n").unwrap();
        assert!(Settings::from_file(&path).is_err());
    }
}
