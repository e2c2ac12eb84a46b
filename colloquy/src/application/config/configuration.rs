use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::core::loader::default_datapath;
use crate::core::opt::Opt;

#[derive(Serialize, Deserialize, Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Configuration {
    #[clap(short, long, default_value_os_t = default_datapath())]
    #[serde(default = "default_datapath")]
    /// Directory where datasets and model artifacts are stored
    pub datapath: PathBuf,

    #[clap(short, long)]
    /// Task spec, comma-joined for multi-task runs
    pub task: Option<String>,

    #[clap(short, long)]
    /// Model spec naming a registered agent class
    pub model: Option<String>,

    #[clap(long)]
    /// Path of a persisted model checkpoint
    pub model_file: Option<String>,

    #[clap(long, default_value_t = default_datatype())]
    #[serde(default = "default_datatype")]
    /// One of train / valid / test
    pub datatype: String,

    #[clap(short, long, default_value_t = default_num_display())]
    #[serde(default = "default_num_display")]
    /// Number of examples to display before stopping
    pub num_display: usize,
}

impl Configuration {
    /// Directory where logs are written to
    pub fn log_dir(&self) -> PathBuf {
        self.datapath.join("logs")
    }

    /// Flattens the configuration into the key/value form the loading layer
    /// passes around. Absent optional flags leave their keys unset.
    pub fn to_opt(&self) -> Opt {
        let mut opt = Opt::new()
            .with("datapath", self.datapath.to_string_lossy().as_ref())
            .with("datatype", self.datatype.as_str())
            .with("num_display", self.num_display as u64);
        if let Some(task) = &self.task {
            opt = opt.with("task", task.as_str());
        }
        if let Some(model) = &self.model {
            opt = opt.with("model", model.as_str());
        }
        if let Some(model_file) = &self.model_file {
            opt = opt.with("model_file", model_file.as_str());
        }
        opt
    }
}

fn default_datatype() -> String {
    "train".to_owned()
}

fn default_num_display() -> usize {
    10
}
