pub mod agents;
pub mod loader;
pub mod message;
pub mod metrics;
pub mod multitask;
pub mod opt;
pub mod registry;
pub mod resolve;
pub mod zoo;
