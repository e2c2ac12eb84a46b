//! The configuration object the whole loading layer passes around. `Opt` is
//! an immutable value: "mutating" it produces a new value, so per-instance
//! tweaks can never leak back into a parent's configuration.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::core::agents::AgentError;

pub const OVERRIDE_KEY: &str = "override";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Opt {
    values: BTreeMap<String, Value>,
}

impl Opt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|value| value.as_str())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(|value| value.as_bool())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(|value| value.as_u64())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns a new `Opt` with `key` set to `value`.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Opt {
        let mut values = self.values.clone();
        values.insert(key.into(), value.into());
        Opt { values }
    }

    /// Returns a new `Opt` without `key`.
    pub fn without(&self, key: &str) -> Opt {
        let mut values = self.values.clone();
        values.remove(key);
        Opt { values }
    }

    /// The `override` sub-mapping: keys here forcibly overwrite anything
    /// loaded from a persisted options file.
    pub fn overrides(&self) -> Option<Opt> {
        let map = self.values.get(OVERRIDE_KEY)?.as_object()?;
        Some(Opt {
            values: map
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Opt, AgentError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save(&self, path: &Path) -> Result<(), AgentError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

impl FromIterator<(String, Value)> for Opt {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Opt {
            values: iter.into_iter().collect(),
        }
    }
}

/// Companion path of a persisted checkpoint's options file.
pub fn opt_file_path(model_file: &str) -> PathBuf {
    PathBuf::from(format!("{}.opt", model_file))
}

/// Recovers the configuration persisted next to `model_file`, merged with
/// the caller's configuration. Returns `Ok(None)` when no companion file
/// exists. Precedence: the caller's `override` sub-map always wins (with a
/// warning per replaced value), the loaded file wins over everything else,
/// caller keys absent from the file are copied in, and `model_file` is
/// forced back to the caller's path so relocated trees keep working.
pub fn load_opt_file(model_file: &str, caller: &Opt) -> Result<Option<Opt>, AgentError> {
    let opt_path = opt_file_path(model_file);
    if !opt_path.exists() {
        return Ok(None);
    }
    let loaded = Opt::load(&opt_path)?;

    // batchindex is run-specific, never a property of the model
    let mut merged = loaded.without("batchindex");

    if let Some(overrides) = caller.overrides() {
        for (key, value) in overrides.iter() {
            if merged.get(key) != Some(value) {
                warn!(
                    key,
                    new_value = %value,
                    old_value = ?merged.get(key),
                    "overriding option recovered from the saved model"
                );
                merged = merged.with(key, value.clone());
            }
        }
    }

    for (key, value) in caller.iter() {
        if !merged.contains(key) {
            merged = merged.with(key, value.clone());
        }
    }

    Ok(Some(merged.with("model_file", model_file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_leaves_original_untouched() {
        let opt = Opt::new().with("task", "synthetic");
        let changed = opt.with("task", "other");
        assert_eq!(opt.get_str("task"), Some("synthetic"));
        assert_eq!(changed.get_str("task"), Some("other"));
    }

    #[test]
    fn test_recovery_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let model_file = dir.path().join("model").to_string_lossy().into_owned();

        let saved = Opt::new()
            .with("a", 1)
            .with("b", 2)
            .with("batchindex", 3)
            .with("model_file", "/somewhere/else/model");
        saved.save(&opt_file_path(&model_file)).expect("save");

        let caller = Opt::new()
            .with("c", 3)
            .with("model_file", model_file.as_str())
            .with(OVERRIDE_KEY, json!({"a": 9}));

        let merged = load_opt_file(&model_file, &caller)
            .expect("load")
            .expect("companion file present");
        assert_eq!(merged.get_u64("a"), Some(9));
        assert_eq!(merged.get_u64("b"), Some(2));
        assert_eq!(merged.get_u64("c"), Some(3));
        assert_eq!(merged.get_str("model_file"), Some(model_file.as_str()));
        assert!(!merged.contains("batchindex"));
    }

    #[test]
    fn test_recovery_skipped_without_companion_file() {
        let caller = Opt::new().with("model_file", "/nonexistent/model");
        let merged = load_opt_file("/nonexistent/model", &caller).expect("load");
        assert!(merged.is_none());
    }

    #[test]
    fn test_opt_json_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.opt");
        let opt = Opt::new()
            .with("model", "seq2seq")
            .with("batch_sort", true)
            .with("num_epochs", 3);
        opt.save(&path).expect("save");
        assert_eq!(Opt::load(&path).expect("load"), opt);
    }
}
