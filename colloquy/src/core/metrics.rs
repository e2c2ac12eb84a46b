//! Minimal metrics aggregate. Teachers accumulate named sums plus an example
//! count; multi-task reports are merged with [`aggregate_metrics`].

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    exs: usize,
    sums: BTreeMap<String, f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exs(&self) -> usize {
        self.exs
    }

    pub fn increment_exs(&mut self) {
        self.exs += 1;
    }

    pub fn add(&mut self, key: &str, value: f64) {
        *self.sums.entry(key.to_owned()).or_insert(0.0) += value;
    }

    /// Raw accumulated sum for `key`.
    pub fn sum(&self, key: &str) -> Option<f64> {
        self.sums.get(key).copied()
    }

    /// Per-example mean for `key`, once any examples have been seen.
    pub fn mean(&self, key: &str) -> Option<f64> {
        if self.exs == 0 {
            return None;
        }
        self.sums.get(key).map(|sum| sum / self.exs as f64)
    }

    pub fn clear(&mut self) {
        self.exs = 0;
        self.sums.clear();
    }
}

/// Merges per-teacher reports into one aggregate: example counts and sums
/// add up across sub-teachers.
pub fn aggregate_metrics(reports: &[Metrics]) -> Metrics {
    let mut total = Metrics::new();
    for report in reports {
        total.exs += report.exs;
        for (key, value) in &report.sums {
            *total.sums.entry(key.clone()).or_insert(0.0) += value;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_sums_counts_and_values() {
        let mut first = Metrics::new();
        first.increment_exs();
        first.add("accuracy", 1.0);
        let mut second = Metrics::new();
        second.increment_exs();
        second.increment_exs();
        second.add("accuracy", 1.0);

        let total = aggregate_metrics(&[first, second]);
        assert_eq!(total.exs(), 3);
        assert_eq!(total.sum("accuracy"), Some(2.0));
        assert!((total.mean("accuracy").expect("mean") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_requires_examples() {
        let mut metrics = Metrics::new();
        metrics.add("accuracy", 1.0);
        assert_eq!(metrics.mean("accuracy"), None);
    }
}
