//! Prints examples from a task so datasets can be eyeballed:
//! `display_data --task synthetic,synthetic:candidate --num-display 4`

use anyhow::Context;
use clap::Parser;

use colloquy::application::config::configuration::Configuration;
use colloquy::application::logging::tracing::tracing_subscribe;
use colloquy::core::loader::create_task_agent_from_taskname;
use colloquy::core::registry::AgentRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::parse();
    if !tracing_subscribe(&configuration) {
        eprintln!("Failed to initialize logging");
    }

    let registry = AgentRegistry::standard();
    let opt = configuration.to_opt();
    let mut teachers =
        create_task_agent_from_taskname(&registry, &opt).context("constructing task teachers")?;
    let teacher = teachers
        .first_mut()
        .context("task produced no teachers")?;

    for _ in 0..configuration.num_display {
        if teacher.epoch_done() {
            break;
        }
        let message = teacher.act();
        let id = message.id.as_deref().unwrap_or("teacher");
        if let Some(text) = &message.text {
            println!("[{}]: {}", id, text);
        }
        if let Some(labels) = &message.labels {
            println!("[labels]: {}", labels.join(", "));
        }
        if let Some(candidates) = &message.label_candidates {
            println!("[candidates]: {}", candidates.join(" | "));
        }
        if message.episode_done {
            println!("- - - - - - - - - - - - - - - - - - - - -");
        }
    }

    let report = teacher.report();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
