//! The construction facade: the single entry points that turn a
//! configuration into live agents and teachers, recovering persisted options
//! and fetching model-zoo artifacts along the way.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::agents::{Agent, AgentError, SharedState, Teacher};
use crate::core::multitask::MultiTaskTeacher;
use crate::core::opt::{load_opt_file, Opt};
use crate::core::registry::{AgentRegistry, AgentResult};
use crate::core::resolve::{resolve_model, resolve_task, ResolvedTask};
use crate::core::zoo::{modelzoo_path, ZooRegistry};

/// Default location for datasets and model artifacts when the configuration
/// names none.
pub fn default_datapath() -> PathBuf {
    match directories::ProjectDirs::from("ai", "colloquy", "colloquy") {
        Some(dirs) => dirs.data_dir().to_owned(),
        None => "colloquy_data".into(),
    }
}

/// Creates an agent from the configuration. Recovery from a persisted
/// `<model_file>.opt` wins over plain construction; virtual `models:` paths
/// are rewritten (and fetched) before anything touches the disk.
pub async fn create_agent(
    registry: &AgentRegistry,
    zoo: &ZooRegistry,
    opt: Opt,
    require_model_exists: bool,
) -> AgentResult {
    let opt = match opt.get_str("datapath") {
        Some(_) => opt,
        None => opt.with("datapath", default_datapath().to_string_lossy().as_ref()),
    };
    let datapath = PathBuf::from(opt.get_str("datapath").unwrap_or_default());

    let opt = match opt.get_str("model_file") {
        Some(model_file) => {
            let resolved_path = modelzoo_path(zoo, &datapath, model_file).await?;
            opt.with("model_file", resolved_path.to_string_lossy().as_ref())
        }
        None => opt,
    };

    if let Some(model_file) = opt.get_str("model_file") {
        if require_model_exists && !Path::new(model_file).exists() {
            return Err(AgentError::MissingModelFile(PathBuf::from(model_file)));
        }
        let model_file = model_file.to_owned();
        if let Some(agent) = create_agent_from_opt_file(registry, &opt, &model_file)? {
            return Ok(agent);
        }
    }

    let model = opt
        .get_str("model")
        .ok_or(AgentError::NoModelSpecified)?
        .to_owned();
    let resolved = resolve_model(&model)?;
    let (_, entry) = registry.model(&resolved)?;
    if opt.get_str("model_file").is_some() && !entry.loadable {
        warn!(
            %model,
            "model_file is configured but this model does not support loading"
        );
    }
    (entry.factory)(registry, opt)
}

/// Recovery path of §create_agent: when a companion options file exists, the
/// *loaded* model identity decides which class gets built, and a version
/// mismatch against the registered marker is fatal.
fn create_agent_from_opt_file(
    registry: &AgentRegistry,
    opt: &Opt,
    model_file: &str,
) -> Result<Option<Box<dyn Agent>>, AgentError> {
    let merged = match load_opt_file(model_file, opt)? {
        Some(merged) => merged,
        None => return Ok(None),
    };
    let model = merged
        .get_str("model")
        .ok_or(AgentError::NoModelSpecified)?
        .to_owned();
    let resolved = resolve_model(&model)?;
    let (_, entry) = registry.model(&resolved)?;
    if let Some(current) = entry.version {
        let stored = merged.get_u64("model_version").unwrap_or(0);
        if stored != current {
            return Err(AgentError::StaleModelVersion {
                model,
                stored,
                current,
            });
        }
    }
    Ok(Some((entry.factory)(registry, merged)?))
}

/// Rebuilds an agent from a previously captured snapshot, skipping
/// resolution entirely.
pub fn create_agent_from_shared(registry: &AgentRegistry, shared: SharedState) -> AgentResult {
    registry.model_from_shared(shared)
}

/// Rebuilds a teacher (possibly the multi-task composite) from a snapshot.
pub fn create_task_agent_from_shared(
    registry: &AgentRegistry,
    shared: SharedState,
) -> Result<Box<dyn Teacher>, AgentError> {
    registry.teacher_from_shared(shared)
}

/// Creates the teachers for the configured task string. A comma-joined
/// string becomes one multi-task composite; a single spec may still expand
/// into several teachers through its module's `create_agents` factory.
pub fn create_task_agent_from_taskname(
    registry: &AgentRegistry,
    opt: &Opt,
) -> Result<Vec<Box<dyn Teacher>>, AgentError> {
    let task = opt
        .get_str("task")
        .ok_or(AgentError::NoTaskSpecified)?
        .to_owned();
    if task.contains(',') {
        Ok(vec![Box::new(MultiTaskTeacher::new(
            registry,
            opt.clone(),
        )?)])
    } else {
        create_task_teachers(registry, opt, &task)
    }
}

/// Resolves and constructs the teachers of one (non-composite) task spec.
/// The spec's optional third field is written back under `task` for the
/// class to interpret itself.
pub(crate) fn create_task_teachers(
    registry: &AgentRegistry,
    opt: &Opt,
    spec: &str,
) -> Result<Vec<Box<dyn Teacher>>, AgentError> {
    let resolved = resolve_task(spec)?;
    let task_opt = task_opt(opt, &resolved, spec);
    let module = registry.task_module(&resolved)?;
    if let Some(create_agents) = module.create_agents {
        return create_agents(registry, task_opt);
    }
    let entry = registry.teacher(&resolved)?;
    Ok(vec![(entry.factory)(registry, task_opt)?])
}

fn task_opt(opt: &Opt, resolved: &ResolvedTask, spec: &str) -> Opt {
    match &resolved.task_param {
        Some(param) => opt.with("task", param.as_str()),
        None => opt.with("task", spec),
    }
}
