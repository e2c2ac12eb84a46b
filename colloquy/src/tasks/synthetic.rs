//! A self-contained arithmetic task that needs no downloads: `synthetic_size`
//! single-example episodes of the form "a + a = ?". The candidate variant
//! additionally attaches every answer in the dataset as label candidates,
//! which is all ranking models need to be exercised.

use std::sync::{Arc, Mutex};

use crate::core::agents::{Agent, SharedState, Teacher};
use crate::core::message::Message;
use crate::core::metrics::Metrics;
use crate::core::opt::Opt;
use crate::core::registry::{TaskModule, TeacherEntry};

pub const SYNTHETIC_MODULE: &str = "colloquy.tasks.synthetic.agents";

const DEFAULT_SIZE: usize = 8;

/// The teacher classes this module exports.
pub fn module() -> TaskModule {
    TaskModule::new()
        .with_teacher(
            "DefaultTeacher",
            TeacherEntry {
                factory: |_, opt| Ok(Box::new(SyntheticTeacher::new(opt))),
                from_shared: |_, shared| Ok(Box::new(SyntheticTeacher::from_shared(&shared))),
            },
        )
        .with_teacher(
            "CandidateTeacher",
            TeacherEntry {
                factory: |_, opt| Ok(Box::new(SyntheticTeacher::with_candidates(opt))),
                from_shared: |_, shared| Ok(Box::new(SyntheticTeacher::from_shared(&shared))),
            },
        )
}

pub struct SyntheticTeacher {
    id: String,
    kind: String,
    opt: Opt,
    size: usize,
    cursor: usize,
    include_candidates: bool,
    metrics: Arc<Mutex<Metrics>>,
}

impl SyntheticTeacher {
    pub fn new(opt: Opt) -> Self {
        Self::build(opt, "DefaultTeacher", false)
    }

    pub fn with_candidates(opt: Opt) -> Self {
        Self::build(opt, "CandidateTeacher", true)
    }

    fn build(opt: Opt, class_name: &str, include_candidates: bool) -> Self {
        let size = opt
            .get_u64("synthetic_size")
            .map(|size| size as usize)
            .unwrap_or(DEFAULT_SIZE);
        let id = opt.get_str("task").unwrap_or("teacher").to_owned();
        Self {
            id,
            kind: format!("{}:{}", SYNTHETIC_MODULE, class_name),
            opt,
            size,
            cursor: 0,
            include_candidates,
            metrics: Arc::new(Mutex::new(Metrics::new())),
        }
    }

    /// Sibling constructor: fresh cursor, shared metrics.
    pub fn from_shared(shared: &SharedState) -> Self {
        let include_candidates = shared.kind().ends_with(":CandidateTeacher");
        let mut teacher = Self::build(
            shared.opt().clone(),
            if include_candidates {
                "CandidateTeacher"
            } else {
                "DefaultTeacher"
            },
            include_candidates,
        );
        if let Some(metrics) = shared.metrics() {
            teacher.metrics = metrics;
        }
        teacher
    }

    fn example(&self, index: usize) -> Message {
        let message = Message::text(format!("{} + {} = ?", index, index))
            .with_id(self.id.clone())
            .with_labels(vec![(index + index).to_string()])
            .with_episode_done(true);
        if self.include_candidates {
            message.with_label_candidates((0..self.size).map(|i| (i + i).to_string()).collect())
        } else {
            message
        }
    }
}

impl Agent for SyntheticTeacher {
    fn id(&self) -> &str {
        &self.id
    }

    fn observe(&mut self, observation: Message) -> Message {
        observation
    }

    fn act(&mut self) -> Message {
        if self.cursor >= self.size {
            return Message::done().with_id(self.id.clone());
        }
        let message = self.example(self.cursor);
        self.cursor += 1;
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.increment_exs();
        }
        message
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn reset_metrics(&mut self) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.clear();
        }
    }

    fn report(&self) -> Metrics {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    fn share(&self) -> SharedState {
        SharedState::with_metrics(self.kind.clone(), self.opt.clone(), Arc::clone(&self.metrics))
    }
}

impl Teacher for SyntheticTeacher {
    fn epoch_done(&self) -> bool {
        self.cursor >= self.size
    }

    fn num_examples(&self) -> Option<usize> {
        Some(self.size)
    }

    fn num_episodes(&self) -> Option<usize> {
        Some(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized_opt(size: u64) -> Opt {
        Opt::new()
            .with("task", "synthetic")
            .with("synthetic_size", size)
    }

    #[test]
    fn test_single_example_episodes_until_exhausted() {
        let mut teacher = SyntheticTeacher::new(sized_opt(2));
        for index in 0..2 {
            let message = teacher.act();
            assert_eq!(message.text.as_deref(), Some(format!("{0} + {0} = ?", index).as_str()));
            assert_eq!(
                message.labels.as_deref(),
                Some(&[(index + index).to_string()][..])
            );
            assert!(message.episode_done);
        }
        assert!(teacher.epoch_done());
        let done = teacher.act();
        assert!(done.episode_done);
        assert!(done.text.is_none());
    }

    #[test]
    fn test_counts_and_metrics() {
        let mut teacher = SyntheticTeacher::new(sized_opt(3));
        assert_eq!(teacher.num_examples(), Some(3));
        assert_eq!(teacher.num_episodes(), Some(3));
        teacher.act();
        teacher.act();
        assert_eq!(teacher.report().exs(), 2);
        teacher.reset_metrics();
        assert_eq!(teacher.report().exs(), 0);
    }

    #[test]
    fn test_candidate_variant_attaches_all_answers() {
        let mut teacher = SyntheticTeacher::with_candidates(sized_opt(3));
        let message = teacher.act();
        assert_eq!(
            message.label_candidates.as_deref(),
            Some(&["0".to_owned(), "2".to_owned(), "4".to_owned()][..])
        );
        // the plain variant carries none
        let mut teacher = SyntheticTeacher::new(sized_opt(3));
        assert!(teacher.act().label_candidates.is_none());
    }

    #[test]
    fn test_reset_restarts_the_epoch() {
        let mut teacher = SyntheticTeacher::new(sized_opt(1));
        teacher.act();
        assert!(teacher.epoch_done());
        teacher.reset();
        assert!(!teacher.epoch_done());
        assert!(teacher.act().text.is_some());
    }

    #[test]
    fn test_shared_sibling_reuses_metrics_but_not_position() {
        let mut teacher = SyntheticTeacher::new(sized_opt(2));
        teacher.act();

        let mut sibling = SyntheticTeacher::from_shared(&teacher.share());
        assert!(!sibling.epoch_done());
        assert_eq!(sibling.report().exs(), 1);
        sibling.act();
        assert_eq!(teacher.report().exs(), 2);
    }

    #[test]
    fn test_candidate_kind_round_trips_through_share() {
        let teacher = SyntheticTeacher::with_candidates(sized_opt(2));
        let mut sibling = SyntheticTeacher::from_shared(&teacher.share());
        assert!(sibling.act().label_candidates.is_some());
    }
}
