//! Ordered batches of parameter writes.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::store::ParameterStore;

/// An ordered mapping from parameter name to value.
///
/// Insertion order is preserved; inserting an existing name replaces its value
/// in place. Values are carried as strings and written verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationPlan {
    entries: Vec<(String, String)>,
}

/// A `KEY=VALUE` item that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed assignment '{0}', expected KEY=VALUE")]
pub struct MalformedAssignment(pub String);

impl ConfigurationPlan {
    /// Empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Parse `KEY=VALUE` items. Well-formed items land in the plan in order;
    /// malformed ones are returned separately.
    pub fn from_assignments<I, S>(items: I) -> (Self, Vec<MalformedAssignment>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut plan = Self::new();
        let mut rejected = Vec::new();
        for item in items {
            let item = item.as_ref();
            match item.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    plan.insert(key.trim(), value.trim());
                }
                _ => rejected.push(MalformedAssignment(item.to_string())),
            }
        }
        (plan, rejected)
    }

    /// Entries in application order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Value planned for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the plan has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for ConfigurationPlan {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut plan = Self::new();
        for (k, v) in iter {
            plan.insert(k, v);
        }
        plan
    }
}

/// Outcome of one write in an applied plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamOutcome {
    /// Parameter name.
    pub name: String,
    /// Value that was written.
    pub value: String,
    /// Store result for this write.
    pub result: Result<(), StoreError>,
}

/// A parameter whose read-back differs from what was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Parameter name.
    pub name: String,
    /// Value written.
    pub expected: String,
    /// Value read back, `None` if unreadable.
    pub observed: Option<String>,
}

/// Per-key results of [`apply`], in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    outcomes: Vec<ParamOutcome>,
}

impl ApplyReport {
    /// All outcomes in plan order.
    pub fn outcomes(&self) -> &[ParamOutcome] {
        &self.outcomes
    }

    /// True when every write succeeded.
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Failed writes only.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &StoreError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
    }

    /// Read back every successfully written parameter and report those whose
    /// trimmed value differs from what was written.
    pub fn verify(&self, store: &dyn ParameterStore) -> Vec<Mismatch> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .filter_map(|o| {
                let observed = store.get(&o.name);
                (observed.as_deref() != Some(o.value.trim())).then(|| Mismatch {
                    name: o.name.clone(),
                    expected: o.value.clone(),
                    observed,
                })
            })
            .collect()
    }
}

/// Write every entry of `plan` in order, continuing past failures.
pub fn apply(store: &dyn ParameterStore, plan: &ConfigurationPlan) -> ApplyReport {
    let outcomes: Vec<ParamOutcome> = plan
        .entries()
        .map(|(name, value)| {
            let result = store.set(name, value);
            if let Err(e) = &result {
                warn!(param = name, value, error = %e, "parameter write failed");
            }
            ParamOutcome {
                name: name.to_string(),
                value: value.to_string(),
                result,
            }
        })
        .collect();

    let report = ApplyReport { outcomes };
    info!(
        store = %store.describe(),
        written = report.outcomes.len(),
        failed = report.failures().count(),
        "configuration plan applied"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order_and_replaces() {
        let plan = ConfigurationPlan::new()
            .with("mode", "ramp")
            .with("ramp_max", 100_000)
            .with("mode", "normal");

        let entries: Vec<_> = plan.entries().collect();
        assert_eq!(entries, vec![("mode", "normal"), ("ramp_max", "100000")]);
    }

    #[test]
    fn test_from_assignments_splits_malformed() {
        let (plan, rejected) =
            ConfigurationPlan::from_assignments(["mode=ramp", "oops", "=5", "threshold_mC = 10000"]);

        assert_eq!(plan.get("mode"), Some("ramp"));
        assert_eq!(plan.get("threshold_mC"), Some("10000"));
        assert_eq!(plan.len(), 2);
        assert_eq!(
            rejected,
            vec![
                MalformedAssignment("oops".into()),
                MalformedAssignment("=5".into())
            ]
        );
    }

    #[test]
    fn test_value_may_contain_equals() {
        let (plan, rejected) = ConfigurationPlan::from_assignments(["label=a=b"]);
        assert!(rejected.is_empty());
        assert_eq!(plan.get("label"), Some("a=b"));
    }
}
