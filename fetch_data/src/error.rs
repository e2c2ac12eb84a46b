use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download of {url} failed after {attempts} attempts")]
    DownloadExhausted { url: String, attempts: u32 },

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("ReqwestMiddleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive has no parent directory to extract into: {0}")]
    NoParentDir(PathBuf),
}
