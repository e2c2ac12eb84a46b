//! Pure string resolution: short human-friendly identifiers become the
//! module path and class name of a registered implementation. Nothing here
//! touches the registry; these transforms only decide where to look.

use crate::core::agents::AgentError;

pub const DEFAULT_NAMESPACE: &str = "colloquy";
pub const INTERNAL_NAMESPACE: &str = "colloquy_internal";

/// Where a model spec points: a primary module, an optional shorthand
/// fallback module, and the class name within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub spec: String,
    pub module: String,
    pub fallback_module: Option<String>,
    pub class_name: String,
}

impl ResolvedModel {
    pub fn key(&self) -> String {
        format!("{}:{}", self.module, self.class_name)
    }

    pub fn fallback_key(&self) -> Option<String> {
        self.fallback_module
            .as_ref()
            .map(|module| format!("{}:{}", module, self.class_name))
    }
}

/// Where a task spec points, plus the optional third field the task class
/// interprets itself (written back into the configuration's `task` key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTask {
    pub spec: String,
    pub module: String,
    pub class_name: String,
    pub task_param: Option<String>,
}

impl ResolvedTask {
    pub fn key(&self) -> String {
        format!("{}:{}", self.module, self.class_name)
    }
}

fn split_namespace(spec: &str) -> (&'static str, &str) {
    match spec.strip_prefix("internal:") {
        Some(rest) => (INTERNAL_NAMESPACE, rest),
        None => (DEFAULT_NAMESPACE, spec),
    }
}

/// `local_human` -> `LocalHumanAgent`: capitalize each underscore-delimited
/// word, drop the underscores, append `Agent`.
pub fn name_to_agent_class(name: &str) -> String {
    let mut class_name = String::with_capacity(name.len() + 5);
    for word in name.split('_') {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            class_name.extend(first.to_uppercase());
            class_name.push_str(chars.as_str());
        }
    }
    class_name.push_str("Agent");
    class_name
}

/// Resolves a model spec. Supported forms, tried in this order:
/// `legacy:<name>:<version>`, `<dir>/<variant>`, fully-qualified
/// `<module>:<Class>`, and bare shorthand `<name>` (with an `agents`-module
/// fallback). An `internal:` prefix switches the namespace.
pub fn resolve_model(spec: &str) -> Result<ResolvedModel, AgentError> {
    let (namespace, stripped) = split_namespace(spec);

    if stripped.starts_with("legacy:") {
        let fields: Vec<&str> = stripped.split(':').collect();
        if fields.len() != 3 {
            return Err(AgentError::MalformedSpec(format!(
                "legacy model specs look like legacy:<model>:<version>, got {}",
                spec
            )));
        }
        let name = fields[1];
        let version = fields[2];
        return Ok(ResolvedModel {
            spec: spec.to_owned(),
            module: format!("{}.legacy_agents.{}.{}_v{}", namespace, name, name, version),
            fallback_module: None,
            class_name: name_to_agent_class(name),
        });
    }

    if let Some((dir, variant)) = stripped.split_once('/') {
        return Ok(ResolvedModel {
            spec: spec.to_owned(),
            module: format!("{}.agents.{}.{}", namespace, dir, variant),
            fallback_module: None,
            class_name: name_to_agent_class(variant),
        });
    }

    if let Some((module, class_name)) = stripped.rsplit_once(':') {
        return Ok(ResolvedModel {
            spec: spec.to_owned(),
            module: module.to_owned(),
            fallback_module: None,
            class_name: class_name.to_owned(),
        });
    }

    Ok(ResolvedModel {
        spec: spec.to_owned(),
        module: format!("{}.agents.{}.{}", namespace, stripped, stripped),
        fallback_module: Some(format!("{}.agents.{}.agents", namespace, stripped)),
        class_name: name_to_agent_class(stripped),
    })
}

/// Resolves a task spec: `<task>[:<teacher_variant>][:<task_param>]`, a
/// dotted already-qualified module, or the fixed `pytorch_teacher` bridge.
pub fn resolve_task(spec: &str) -> Result<ResolvedTask, AgentError> {
    let (namespace, stripped) = split_namespace(spec);
    if stripped.is_empty() {
        return Err(AgentError::MalformedSpec("empty task spec".to_owned()));
    }

    let fields: Vec<&str> = stripped.split(':').collect();
    if fields.len() > 3 {
        return Err(AgentError::MalformedSpec(format!(
            "task specs carry at most three colon-delimited fields, got {}",
            spec
        )));
    }
    let task = fields[0];

    if task == "pytorch_teacher" {
        return Ok(ResolvedTask {
            spec: spec.to_owned(),
            module: format!("{}.core.pytorch_data_teacher", namespace),
            class_name: "PytorchDataTeacher".to_owned(),
            task_param: None,
        });
    }

    let module = if task.contains('.') {
        task.to_owned()
    } else {
        format!("{}.tasks.{}.agents", namespace, task)
    };

    // only the first letter gets upcased, the rest of the variant is kept
    // exactly as written
    let class_name = match fields.get(1) {
        Some(variant) if !variant.is_empty() => {
            let mut chars = variant.chars();
            match chars.next() {
                Some(first) => {
                    let mut class_name: String = first.to_uppercase().collect();
                    class_name.push_str(chars.as_str());
                    class_name.push_str("Teacher");
                    class_name
                }
                None => "DefaultTeacher".to_owned(),
            }
        }
        _ => "DefaultTeacher".to_owned(),
    };

    Ok(ResolvedTask {
        spec: spec.to_owned(),
        module,
        class_name,
        task_param: fields.get(2).map(|param| (*param).to_owned()),
    })
}
