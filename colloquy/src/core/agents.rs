//! The polymorphic contracts every pluggable implementation satisfies, the
//! shared-state snapshot used to build lightweight siblings, and the error
//! taxonomy of the whole loading layer.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::core::message::Message;
use crate::core::metrics::Metrics;
use crate::core::opt::Opt;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("malformed spec: {0}")]
    MalformedSpec(String),

    #[error("could not resolve {spec}: nothing registered at {tried}")]
    Resolution { spec: String, tried: String },

    #[error(
        "checkpoint for {model} uses an older format (version {stored}, current {current}); \
         load it explicitly with --model legacy:{model}:{stored}"
    )]
    StaleModelVersion {
        model: String,
        stored: u64,
        current: u64,
    },

    #[error("model file does not exist: {0}")]
    MissingModelFile(PathBuf),

    #[error("no model specified, use the --model flag to pick one")]
    NoModelSpecified,

    #[error("no task specified, use the --task flag to pick one")]
    NoTaskSpecified,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("fetch error: {0}")]
    Fetch(#[from] fetch_data::FetchError),
}

/// Snapshot produced by `share()`: the registry key of the implementation,
/// the configuration it was built with, and whatever heavyweight handles the
/// implementation wants its siblings to reuse. Reconstruction dispatches on
/// the tag, so composites nest naturally.
#[derive(Clone)]
pub struct SharedState {
    kind: String,
    opt: Opt,
    payload: SharedPayload,
}

#[derive(Clone)]
pub enum SharedPayload {
    None,
    /// Teachers hand their metrics to siblings so reports accumulate in one
    /// place.
    Metrics(Arc<Mutex<Metrics>>),
    /// Composite teachers snapshot every sub-teacher recursively.
    Composite(Vec<SharedState>),
}

impl SharedState {
    pub fn new(kind: impl Into<String>, opt: Opt) -> Self {
        Self {
            kind: kind.into(),
            opt,
            payload: SharedPayload::None,
        }
    }

    pub fn with_metrics(kind: impl Into<String>, opt: Opt, metrics: Arc<Mutex<Metrics>>) -> Self {
        Self {
            kind: kind.into(),
            opt,
            payload: SharedPayload::Metrics(metrics),
        }
    }

    pub fn composite(kind: impl Into<String>, opt: Opt, children: Vec<SharedState>) -> Self {
        Self {
            kind: kind.into(),
            opt,
            payload: SharedPayload::Composite(children),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn opt(&self) -> &Opt {
        &self.opt
    }

    pub fn payload(&self) -> &SharedPayload {
        &self.payload
    }

    pub fn metrics(&self) -> Option<Arc<Mutex<Metrics>>> {
        match &self.payload {
            SharedPayload::Metrics(metrics) => Some(Arc::clone(metrics)),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&[SharedState]> {
        match &self.payload {
            SharedPayload::Composite(children) => Some(children),
            _ => None,
        }
    }
}

/// The minimal contract every agent satisfies. Observations are stored (and
/// echoed back); `act()` turns the current observation into a response.
pub trait Agent: Send {
    fn id(&self) -> &str;

    fn observe(&mut self, observation: Message) -> Message;

    fn act(&mut self) -> Message;

    /// Clears per-instance message state.
    fn reset(&mut self);

    fn reset_metrics(&mut self) {}

    fn report(&self) -> Metrics {
        Metrics::new()
    }

    fn save(&mut self) {}

    fn share(&self) -> SharedState;

    fn shutdown(&mut self) {}
}

impl std::fmt::Debug for dyn Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent").field("id", &self.id()).finish()
    }
}

/// An agent that drives a task and reports evaluation metrics. `None` counts
/// mean the teacher cannot say how large its dataset is.
pub trait Teacher: Agent {
    fn epoch_done(&self) -> bool;

    fn num_examples(&self) -> Option<usize> {
        None
    }

    fn num_episodes(&self) -> Option<usize> {
        None
    }
}

impl std::fmt::Debug for dyn Teacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teacher").field("id", &self.id()).finish()
    }
}
