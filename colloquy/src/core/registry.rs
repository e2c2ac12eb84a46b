//! The implementation registry. Resolution (see `resolve`) turns short specs
//! into module-path keys; this registry maps those keys to factories, built
//! broker-style with chained `register_*` calls at process start.

use std::collections::HashMap;

use crate::core::agents::{Agent, AgentError, SharedState, Teacher};
use crate::core::multitask::{MultiTaskTeacher, MULTITASK_KIND};
use crate::core::opt::Opt;
use crate::core::resolve::{ResolvedModel, ResolvedTask};

pub type AgentResult = Result<Box<dyn Agent>, AgentError>;
pub type TeacherResult = Result<Box<dyn Teacher>, AgentError>;

pub type AgentFactory = fn(&AgentRegistry, Opt) -> AgentResult;
pub type SharedAgentFactory = fn(&AgentRegistry, SharedState) -> AgentResult;
pub type TeacherFactory = fn(&AgentRegistry, Opt) -> TeacherResult;
pub type SharedTeacherFactory = fn(&AgentRegistry, SharedState) -> TeacherResult;
/// Module-level factory: may hand back several teachers at once, bypassing
/// the class lookup entirely.
pub type TaskFactory = fn(&AgentRegistry, Opt) -> Result<Vec<Box<dyn Teacher>>, AgentError>;

/// One registered model class. `version` and `loadable` are explicit
/// capability markers: implementations opt in instead of being probed.
#[derive(Debug)]
pub struct ModelEntry {
    pub factory: AgentFactory,
    pub from_shared: SharedAgentFactory,
    pub version: Option<u64>,
    pub loadable: bool,
}

pub struct TeacherEntry {
    pub factory: TeacherFactory,
    pub from_shared: SharedTeacherFactory,
}

/// Everything one task module exports: an optional `create_agents` factory
/// plus its named teacher classes.
#[derive(Default)]
pub struct TaskModule {
    pub create_agents: Option<TaskFactory>,
    pub teachers: HashMap<String, TeacherEntry>,
}

impl TaskModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_agents(mut self, factory: TaskFactory) -> Self {
        self.create_agents = Some(factory);
        self
    }

    pub fn with_teacher(mut self, class_name: impl Into<String>, entry: TeacherEntry) -> Self {
        self.teachers.insert(class_name.into(), entry);
        self
    }
}

pub struct AgentRegistry {
    models: HashMap<String, ModelEntry>,
    tasks: HashMap<String, TaskModule>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
            tasks: HashMap::new(),
        }
    }

    /// The registry with every built-in implementation registered.
    pub fn standard() -> Self {
        Self::new()
            .register_model(
                crate::agents::repeat_label::REPEAT_LABEL_KIND,
                crate::agents::repeat_label::RepeatLabelAgent::entry(),
            )
            .register_task(
                crate::tasks::synthetic::SYNTHETIC_MODULE,
                crate::tasks::synthetic::module(),
            )
    }

    pub fn register_model(mut self, key: impl Into<String>, entry: ModelEntry) -> Self {
        self.models.insert(key.into(), entry);
        self
    }

    pub fn register_task(mut self, module: impl Into<String>, task: TaskModule) -> Self {
        self.tasks.insert(module.into(), task);
        self
    }

    /// Looks a resolved model up, trying the shorthand fallback module when
    /// the primary location has nothing registered.
    pub fn model(&self, resolved: &ResolvedModel) -> Result<(String, &ModelEntry), AgentError> {
        let primary = resolved.key();
        if let Some(entry) = self.models.get(&primary) {
            return Ok((primary, entry));
        }
        if let Some(fallback) = resolved.fallback_key() {
            if let Some(entry) = self.models.get(&fallback) {
                return Ok((fallback, entry));
            }
            return Err(AgentError::Resolution {
                spec: resolved.spec.clone(),
                tried: format!("{} (fallback {})", primary, fallback),
            });
        }
        Err(AgentError::Resolution {
            spec: resolved.spec.clone(),
            tried: primary,
        })
    }

    pub fn task_module(&self, resolved: &ResolvedTask) -> Result<&TaskModule, AgentError> {
        self.tasks
            .get(&resolved.module)
            .ok_or_else(|| AgentError::Resolution {
                spec: resolved.spec.clone(),
                tried: resolved.module.clone(),
            })
    }

    pub fn teacher(&self, resolved: &ResolvedTask) -> Result<&TeacherEntry, AgentError> {
        self.task_module(resolved)?
            .teachers
            .get(&resolved.class_name)
            .ok_or_else(|| AgentError::Resolution {
                spec: resolved.spec.clone(),
                tried: resolved.key(),
            })
    }

    /// Rebuilds an agent from a captured snapshot, dispatching on its tag.
    pub fn model_from_shared(&self, shared: SharedState) -> AgentResult {
        let entry = self
            .models
            .get(shared.kind())
            .ok_or_else(|| AgentError::Resolution {
                spec: shared.kind().to_owned(),
                tried: shared.kind().to_owned(),
            })?;
        (entry.from_shared)(self, shared)
    }

    /// Rebuilds a teacher from a captured snapshot. The multi-task composite
    /// is part of the core, so its tag is handled here rather than through a
    /// task module.
    pub fn teacher_from_shared(&self, shared: SharedState) -> TeacherResult {
        if shared.kind() == MULTITASK_KIND {
            return Ok(Box::new(MultiTaskTeacher::from_shared(self, shared)?));
        }
        let kind = shared.kind().to_owned();
        let (module, class_name) = kind.rsplit_once(':').ok_or_else(|| AgentError::Resolution {
            spec: kind.clone(),
            tried: kind.clone(),
        })?;
        let entry = self
            .tasks
            .get(module)
            .and_then(|task| task.teachers.get(class_name))
            .ok_or_else(|| AgentError::Resolution {
                spec: kind.clone(),
                tried: kind.clone(),
            })?;
        (entry.from_shared)(self, shared)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
