//! Generic data fetching for datasets and pretrained artifacts: resumable
//! http downloads with retry, `.built` version stamps so finished work is
//! never repeated, archive extraction and the handful of filesystem moves
//! that downloads need.

pub mod built;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod gdrive;

pub use built::{built, mark_built, remove_built};
pub use download::download;
pub use error::FetchError;
