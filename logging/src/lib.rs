//! Shared http client construction for the workspace. Every crate that talks
//! to the network goes through [`new_client`] so outgoing requests get traced
//! uniformly.

pub mod trace_client;
pub mod trace_middleware;

pub use trace_client::new_client;
