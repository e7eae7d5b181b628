//! In-memory parameter store.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use simtemp_harness::{ParameterStore, StoreError};
use simtemp_protocol::{Parameter, defaults};

/// A [`ParameterStore`] backed by a map.
///
/// By default any name is accepted. [`MemoryStore::with_known`] restricts the
/// namespace so unknown names fail with [`StoreError::NotFound`], like the
/// sysfs directory does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
    known: Option<BTreeSet<String>>,
    read_only: BTreeSet<String>,
}

impl MemoryStore {
    /// Store accepting any name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store accepting only `names`.
    pub fn with_known<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Store shaped like a freshly loaded module: every known parameter,
    /// seeded with its default value.
    pub fn simtemp_defaults() -> Self {
        let store = Self::with_known(Parameter::ALL.iter().map(|p| p.name()));
        store.seed(Parameter::Mode.name(), defaults::MODE.as_str());
        store.seed(Parameter::SamplingMs.name(), defaults::SAMPLING_MS.to_string());
        store.seed(Parameter::RampMin.name(), defaults::RAMP_MIN_MC.to_string());
        store.seed(Parameter::RampMax.name(), defaults::RAMP_MAX_MC.to_string());
        store.seed(
            Parameter::RampPeriodMs.name(),
            defaults::RAMP_PERIOD_MS.to_string(),
        );
        store.seed(Parameter::ThresholdMc.name(), defaults::THRESHOLD_MC.to_string());
        store.seed(
            Parameter::HysteresisMc.name(),
            defaults::HYSTERESIS_MC.to_string(),
        );
        store
    }

    /// Make `name` refuse writes with [`StoreError::PermissionDenied`].
    #[must_use]
    pub fn read_only(mut self, name: impl Into<String>) -> Self {
        self.read_only.insert(name.into());
        self
    }

    /// Set a value directly, bypassing the write log.
    pub fn seed(&self, name: impl Into<String>, value: impl Into<String>) {
        self.values.lock().insert(name.into(), value.into());
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().clone()
    }
}

impl ParameterStore for MemoryStore {
    fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
        if let Some(known) = &self.known
            && !known.contains(name)
        {
            return Err(StoreError::NotFound(name.to_string()));
        }
        if self.read_only.contains(name) {
            return Err(StoreError::PermissionDenied(name.to_string()));
        }
        self.values
            .lock()
            .insert(name.to_string(), value.to_string());
        self.writes
            .lock()
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn get(&self, name: &str) -> Option<String> {
        self.values.lock().get(name).map(|v| v.trim().to_string())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
