//! colloquy is a research framework for building and evaluating dialogue
//! agents. The core is a registry-backed plugin layer: short identifier
//! strings name tasks and models, get resolved to registered implementations,
//! and the instances get wired together so they can trade observation/action
//! messages.

pub mod agents;
pub mod application;
pub mod core;
pub mod tasks;
