//! Command implementations for simtempctl

pub mod configure;
pub mod params;
pub mod read;

use std::path::{Path, PathBuf};

use anyhow::Result;
use simtemp_harness::{
    ConfigurationPlan, DevicePath, HarnessConfig, MalformedAssignment, SysfsStore,
};

use crate::error::CliError;
use crate::output;

/// Settings shared by every command, after merging the config file with
/// command-line flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub json: bool,
    pub harness: HarnessConfig,
}

impl Context {
    /// Load the optional config file, then let explicit flags win.
    pub fn build(
        json: bool,
        config: Option<&Path>,
        device: Option<PathBuf>,
        sysfs_root: Option<PathBuf>,
    ) -> Result<Self> {
        let mut harness = match config {
            Some(path) => HarnessConfig::load(path).map_err(CliError::from)?,
            None => HarnessConfig::default(),
        };
        if let Some(device) = device {
            harness.device_path = device;
        }
        if let Some(root) = sysfs_root {
            harness.sysfs_root = root;
        }
        Ok(Self { json, harness })
    }

    pub fn store(&self) -> SysfsStore {
        SysfsStore::new(&self.harness.sysfs_root)
    }

    pub fn device(&self) -> DevicePath {
        DevicePath::new(&self.harness.device_path)
    }

    /// Store handle, failing when the namespace directory is absent.
    pub fn present_store(&self) -> Result<SysfsStore, CliError> {
        let store = self.store();
        if store.is_present() {
            Ok(store)
        } else {
            Err(CliError::NamespaceNotFound(
                self.harness.sysfs_root.display().to_string(),
            ))
        }
    }
}

/// Parse `KEY=VALUE` items, warning about and dropping malformed ones.
pub fn parse_assignments(items: &[String]) -> ConfigurationPlan {
    let (plan, rejected): (ConfigurationPlan, Vec<MalformedAssignment>) =
        ConfigurationPlan::from_assignments(items);
    for item in &rejected {
        output::print_warning(&item.to_string());
    }
    plan
}
