//! Persistent record of where vendor libraries were found
//!
//! The store is a two-column CSV file (`item,location`) kept in the user's
//! home directory. A lookup that misses, or points at a file that no longer
//! exists, falls back to a recursive search below the vendor's install folder
//! and appends the result.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use domain::{DeviceError, Result};
use serde::{Deserialize, Serialize};

use crate::config::LibrarySettings;

pub const STORE_DIR: &str = ".optobench";
pub const STORE_FILE: &str = "dlllocations.csv";

/// One row of the location store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRecord {
    pub item: String,
    pub location: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LibraryLocator {
    store_path: PathBuf,
    search_root: PathBuf,
}

impl LibraryLocator {
    pub fn new(store_path: impl Into<PathBuf>, search_root: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            search_root: search_root.into(),
        }
    }

    pub fn from_config(settings: &LibrarySettings) -> Result<Self> {
        let store_path = match &settings.store_path {
            Some(path) => path.clone(),
            None => Self::default_store_path()?,
        };
        Ok(Self::new(store_path, &settings.search_root))
    }

    /// `~/.optobench/dlllocations.csv`
    pub fn default_store_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(STORE_DIR).join(STORE_FILE))
            .ok_or_else(|| DeviceError::InvalidConfig("home directory not available".to_string()))
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Creates the store with its header row when it does not exist yet
    pub fn ensure_store(&self) -> Result<()> {
        if self.store_path.exists() {
            return Ok(());
        }
        self.write_empty_store()
    }

    /// Replaces the store with an empty one
    pub fn reset(&self) -> Result<()> {
        tracing::info!(store = %self.store_path.display(), "Resetting library location store");
        self.write_empty_store()
    }

    fn write_empty_store(&self) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.store_error(e))?;
        }
        let mut writer = csv::Writer::from_path(&self.store_path).map_err(|e| self.store_error(e))?;
        writer
            .write_record(["item", "location"])
            .map_err(|e| self.store_error(e))?;
        writer.flush().map_err(|e| self.store_error(e))
    }

    pub fn records(&self) -> Result<Vec<LibraryRecord>> {
        self.ensure_store()?;
        let mut reader = csv::Reader::from_path(&self.store_path).map_err(|e| self.store_error(e))?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<LibraryRecord>, _>>()
            .map_err(|e| self.store_error(e))
    }

    /// Most recently stored location of `library`
    pub fn lookup(&self, library: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .records()?
            .into_iter()
            .rev()
            .find(|record| record.item == library)
            .map(|record| record.location))
    }

    /// Appends a location to the store
    pub fn remember(&self, library: &str, location: &Path) -> Result<()> {
        self.ensure_store()?;
        let file = OpenOptions::new()
            .append(true)
            .open(&self.store_path)
            .map_err(|e| self.store_error(e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(LibraryRecord {
                item: library.to_string(),
                location: location.to_path_buf(),
            })
            .map_err(|e| self.store_error(e))?;
        writer.flush().map_err(|e| self.store_error(e))
    }

    /// Path of `library`, searching below `<search_root>/<vendor_folder>` on a miss
    pub fn locate(&self, library: &str, vendor_folder: &str) -> Result<PathBuf> {
        if let Some(stored) = self.lookup(library)? {
            if stored.is_file() {
                return Ok(stored);
            }
            tracing::warn!(library, stale = %stored.display(), "Stored library location no longer exists");
        }

        let root = self.search_root.join(vendor_folder);
        if !root.is_dir() {
            return Err(DeviceError::Library {
                library: library.to_string(),
                message: format!("vendor folder {} not found", root.display()),
            });
        }

        let found = find_file(&root, library).ok_or_else(|| DeviceError::Library {
            library: library.to_string(),
            message: format!("not found below {}", root.display()),
        })?;
        tracing::info!(library, location = %found.display(), "Located vendor library");
        self.remember(library, &found)?;
        Ok(found)
    }

    fn store_error(&self, error: impl std::fmt::Display) -> DeviceError {
        DeviceError::Library {
            library: self.store_path.display().to_string(),
            message: format!("location store: {error}"),
        }
    }
}

/// Depth-first search for a file named `name`, ignoring ASCII case
fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
            return Some(path);
        }
    }
    subdirs.sort();
    subdirs.iter().find_map(|sub| find_file(sub, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn setup() -> (TempDir, LibraryLocator) {
        let dir = tempfile::tempdir().unwrap();
        let locator = LibraryLocator::new(
            dir.path().join("store").join(STORE_FILE),
            dir.path().join("Program Files"),
        );
        (dir, locator)
    }

    fn install(dir: &TempDir, relative: &str) -> PathBuf {
        let path = dir.path().join("Program Files").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"MZ").unwrap();
        path
    }

    #[test]
    fn test_store_created_with_header() {
        let (_dir, locator) = setup();
        locator.ensure_store().unwrap();
        let content = fs::read_to_string(locator.store_path()).unwrap();
        assert_eq!(content.trim(), "item,location");
        assert!(locator.records().unwrap().is_empty());
    }

    #[test]
    fn test_locate_searches_and_remembers() {
        let (dir, locator) = setup();
        let installed = install(&dir, "Thorlabs/Kinesis/Thorlabs.MotionControl.KCube.DCServo.dll");

        let found = locator
            .locate("Thorlabs.MotionControl.KCube.DCServo.dll", "Thorlabs")
            .unwrap();
        assert_eq!(found, installed);
        assert_eq!(
            locator.lookup("Thorlabs.MotionControl.KCube.DCServo.dll").unwrap(),
            Some(installed)
        );
    }

    #[test]
    fn test_search_ignores_case() {
        let (dir, locator) = setup();
        let installed = install(&dir, "IDS/uEye/Develop/Bin/UEYE_API_64.DLL");
        assert_eq!(locator.locate("uEye_api_64.dll", "IDS").unwrap(), installed);
    }

    #[test]
    #[traced_test]
    fn test_stale_entry_triggers_search() {
        let (dir, locator) = setup();
        locator
            .remember("TLPM_64.dll", &dir.path().join("gone").join("TLPM_64.dll"))
            .unwrap();
        let installed = install(&dir, "IVI Foundation/VISA/Win64/Bin/TLPM_64.dll");

        assert_eq!(locator.locate("TLPM_64.dll", "IVI Foundation").unwrap(), installed);
        assert_eq!(locator.records().unwrap().len(), 2);
        assert!(logs_contain("Stored library location no longer exists"));
    }

    #[test]
    fn test_missing_vendor_folder() {
        let (_dir, locator) = setup();
        let err = locator.locate("TLCCS_64.dll", "IVI Foundation").unwrap_err();
        assert!(matches!(err, DeviceError::Library { .. }));
    }

    #[test]
    fn test_missing_library_is_not_remembered() {
        let (dir, locator) = setup();
        install(&dir, "Thorlabs/readme.txt");
        assert!(locator.locate("TLPM_64.dll", "Thorlabs").is_err());
        assert!(locator.records().unwrap().is_empty());
    }

    #[test]
    fn test_reset_clears_entries() {
        let (dir, locator) = setup();
        locator.remember("TLPM_64.dll", &dir.path().join("TLPM_64.dll")).unwrap();
        locator.reset().unwrap();
        assert!(locator.records().unwrap().is_empty());
    }
}
