//! The multi-task composite: several independently resolved teachers behave
//! as one, interleaving turn-by-turn either round-robin or by uniform random
//! choice, with merged metrics and aggregate counts.

use once_cell::sync::OnceCell;
use rand::Rng;
use tracing::warn;

use crate::core::agents::{Agent, AgentError, SharedState, Teacher};
use crate::core::loader::create_task_teachers;
use crate::core::message::Message;
use crate::core::metrics::{aggregate_metrics, Metrics};
use crate::core::opt::Opt;
use crate::core::registry::AgentRegistry;

pub const MULTITASK_KIND: &str = "colloquy.core.multitask:MultiTaskTeacher";

pub struct MultiTaskTeacher {
    id: String,
    opt: Opt,
    tasks: Vec<Box<dyn Teacher>>,
    task_index: usize,
    /// true = the next act() has to (re)select a sub-teacher first
    new_task: bool,
    /// uniform random selection, enabled only while training
    random: bool,
    num_examples_cache: OnceCell<Option<usize>>,
    num_episodes_cache: OnceCell<Option<usize>>,
}

impl MultiTaskTeacher {
    /// Builds one teacher per comma-separated sub-spec. Each sub-teacher gets
    /// its own configuration whose `task` is just that sub-spec; module-level
    /// factories may expand a single spec into several teachers.
    pub fn new(registry: &AgentRegistry, opt: Opt) -> Result<Self, AgentError> {
        let task_string = opt
            .get_str("task")
            .ok_or(AgentError::NoTaskSpecified)?
            .to_owned();

        let opt = if opt.get_bool("batch_sort").unwrap_or(false) {
            warn!("batch_sort is incompatible with multi-task interleaving, disabling it");
            opt.with("batch_sort", false)
        } else {
            opt
        };

        let mut tasks: Vec<Box<dyn Teacher>> = Vec::new();
        for sub_spec in task_string.split(',') {
            let sub_spec = sub_spec.trim();
            if sub_spec.is_empty() {
                continue;
            }
            let sub_opt = opt.with("task", sub_spec);
            tasks.extend(create_task_teachers(registry, &sub_opt, sub_spec)?);
        }
        if tasks.is_empty() {
            return Err(AgentError::MalformedSpec(format!(
                "task string named no tasks: {}",
                task_string
            )));
        }

        Ok(Self::assemble(opt, tasks))
    }

    /// Rebuilds the composite from a snapshot without re-running resolution:
    /// every child snapshot is dispatched back through the registry.
    pub fn from_shared(registry: &AgentRegistry, shared: SharedState) -> Result<Self, AgentError> {
        let children = shared.children().unwrap_or(&[]);
        let mut tasks = Vec::with_capacity(children.len());
        for child in children {
            tasks.push(registry.teacher_from_shared(child.clone())?);
        }
        if tasks.is_empty() {
            return Err(AgentError::MalformedSpec(
                "shared multi-task snapshot had no sub-teachers".to_owned(),
            ));
        }
        Ok(Self::assemble(shared.opt().clone(), tasks))
    }

    fn assemble(opt: Opt, tasks: Vec<Box<dyn Teacher>>) -> Self {
        let random = opt.get_str("datatype") == Some("train");
        Self {
            id: "multitask".to_owned(),
            opt,
            tasks,
            task_index: 0,
            new_task: true,
            random,
            num_examples_cache: OnceCell::new(),
            num_episodes_cache: OnceCell::new(),
        }
    }

    pub fn tasks(&self) -> &[Box<dyn Teacher>] {
        &self.tasks
    }

    /// Picks the sub-teacher the next act() delegates to. Returns false when
    /// every sub-teacher is exhausted and the call must synthesize a done
    /// message instead of delegating.
    fn select_task(&mut self) -> bool {
        if self.random {
            self.task_index = rand::thread_rng().gen_range(0..self.tasks.len());
            return true;
        }
        let total = self.tasks.len();
        for _ in 0..total {
            self.task_index = (self.task_index + 1) % total;
            if !self.tasks[self.task_index].epoch_done() {
                return true;
            }
        }
        // the sweep wrapped all the way around; if even the teacher the
        // cursor settled on is done, everything is exhausted
        !self.tasks[self.task_index].epoch_done()
    }
}

impl Agent for MultiTaskTeacher {
    fn id(&self) -> &str {
        &self.id
    }

    fn observe(&mut self, observation: Message) -> Message {
        self.tasks[self.task_index].observe(observation)
    }

    fn act(&mut self) -> Message {
        if self.new_task {
            self.new_task = false;
            if !self.select_task() {
                // all sub-teachers exhausted: stay in the awaiting state and
                // keep signaling done until someone resets us
                self.new_task = true;
                return Message::done();
            }
        }
        let message = self.tasks[self.task_index].act();
        if message.episode_done {
            self.new_task = true;
        }
        message
    }

    fn reset(&mut self) {
        for task in self.tasks.iter_mut() {
            task.reset();
        }
        self.new_task = true;
    }

    fn reset_metrics(&mut self) {
        for task in self.tasks.iter_mut() {
            task.reset_metrics();
        }
    }

    fn report(&self) -> Metrics {
        let reports: Vec<Metrics> = self.tasks.iter().map(|task| task.report()).collect();
        aggregate_metrics(&reports)
    }

    fn save(&mut self) {
        for task in self.tasks.iter_mut() {
            task.save();
        }
    }

    fn share(&self) -> SharedState {
        SharedState::composite(
            MULTITASK_KIND,
            self.opt.clone(),
            self.tasks.iter().map(|task| task.share()).collect(),
        )
    }

    fn shutdown(&mut self) {
        for task in self.tasks.iter_mut() {
            task.shutdown();
        }
    }
}

impl Teacher for MultiTaskTeacher {
    fn epoch_done(&self) -> bool {
        self.tasks.iter().all(|task| task.epoch_done())
    }

    /// Sum across sub-teachers; unknown if any one of them is unknown.
    /// Cached, since sub-teacher counts are static for the life of the
    /// instance.
    fn num_examples(&self) -> Option<usize> {
        *self.num_examples_cache.get_or_init(|| {
            let mut total = 0usize;
            for task in &self.tasks {
                total += task.num_examples()?;
            }
            Some(total)
        })
    }

    fn num_episodes(&self) -> Option<usize> {
        *self.num_episodes_cache.get_or_init(|| {
            let mut total = 0usize;
            for task in &self.tasks {
                total += task.num_episodes()?;
            }
            Some(total)
        })
    }
}
