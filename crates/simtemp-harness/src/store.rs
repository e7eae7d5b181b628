//! Named-parameter access to the device's sysfs attributes.
//!
//! The store is a trait so scenarios can run against an in-memory double;
//! [`SysfsStore`] is the production implementation.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::StoreError;

/// Default location of the device's parameter namespace.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/nxp_simtemp/simtemp";

/// Read/write access to device parameters by name.
///
/// Writes carry no ordering guarantee between distinct names; each `set` is
/// independent.
pub trait ParameterStore {
    /// Write `value` to parameter `name`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the parameter does not exist,
    /// [`StoreError::PermissionDenied`] when the write is refused, and
    /// [`StoreError::Other`] for any other failure (including a value the
    /// device rejects).
    fn set(&self, name: &str, value: &str) -> Result<(), StoreError>;

    /// Read the current value of `name`, whitespace-trimmed.
    ///
    /// Any failure is reported as `None`.
    fn get(&self, name: &str) -> Option<String>;

    /// Short human description used in logs and reports.
    fn describe(&self) -> String;
}

impl<T: ParameterStore + ?Sized> ParameterStore for &T {
    fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(name, value)
    }

    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Parameter store backed by one file per parameter under a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsStore {
    root: PathBuf,
}

impl SysfsStore {
    /// Store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory holding the attribute files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when the root directory exists (module loaded).
    pub fn is_present(&self) -> bool {
        self.root.is_dir()
    }

    /// Attribute path for `name`, or `None` when the name cannot denote a
    /// single file directly under the root.
    fn attribute_path(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(std::path::is_separator);
        plain.then(|| self.root.join(name))
    }
}

impl Default for SysfsStore {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl ParameterStore for SysfsStore {
    fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let Some(path) = self.attribute_path(name) else {
            return Err(StoreError::NotFound(name.to_string()));
        };

        // Attributes are never created; a missing file means unknown name.
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| StoreError::from_io(&path, &e))?;
        file.write_all(value.as_bytes())
            .map_err(|e| StoreError::from_io(&path, &e))?;

        debug!(param = name, value, "parameter written");
        Ok(())
    }

    fn get(&self, name: &str) -> Option<String> {
        let path = self.attribute_path(name)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Some(raw.trim().to_string()),
            Err(e) => {
                trace!(param = name, error = %e, "parameter read failed");
                None
            }
        }
    }

    fn describe(&self) -> String {
        format!("sysfs:{}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn attr_dir(names: &[(&str, &str)]) -> Result<TempDir, std::io::Error> {
        let dir = tempfile::tempdir()?;
        for (name, value) in names {
            fs::write(dir.path().join(name), value)?;
        }
        Ok(dir)
    }

    #[test]
    fn test_set_then_get() -> TestResult {
        let dir = attr_dir(&[("ramp_max", "100000\n")])?;
        let store = SysfsStore::new(dir.path());

        store.set("ramp_max", "50000")?;
        assert_eq!(store.get("ramp_max").as_deref(), Some("50000"));
        Ok(())
    }

    #[test]
    fn test_get_trims_trailing_newline() -> TestResult {
        let dir = attr_dir(&[("mode", "ramp\n")])?;
        let store = SysfsStore::new(dir.path());
        assert_eq!(store.get("mode").as_deref(), Some("ramp"));
        Ok(())
    }

    #[test]
    fn test_set_unknown_name_is_not_found() -> TestResult {
        let dir = attr_dir(&[])?;
        let store = SysfsStore::new(dir.path());

        let result = store.set("bogus", "1");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(!dir.path().join("bogus").exists());
        Ok(())
    }

    #[test]
    fn test_set_rejects_path_like_names() -> TestResult {
        let dir = attr_dir(&[])?;
        let store = SysfsStore::new(dir.path());

        for name in ["", ".", "..", "../mode", "a/b"] {
            assert!(matches!(store.set(name, "1"), Err(StoreError::NotFound(_))));
            assert_eq!(store.get(name), None);
        }
        Ok(())
    }

    #[test]
    fn test_get_missing_is_none() -> TestResult {
        let dir = attr_dir(&[])?;
        let store = SysfsStore::new(dir.path());
        assert_eq!(store.get("mode"), None);
        Ok(())
    }

    #[test]
    fn test_missing_root_is_not_present() {
        let store = SysfsStore::new("/nonexistent/simtemp/root");
        assert!(!store.is_present());
        assert!(matches!(
            store.set("mode", "ramp"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_describe_names_root() {
        let store = SysfsStore::default();
        assert_eq!(store.describe(), "sysfs:/sys/class/nxp_simtemp/simtemp");
    }
}
