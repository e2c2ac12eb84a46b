//! Google Drive hosts several of the public pretrained bundles. Large files
//! need a confirmation-token handshake: the first response sets a
//! `download_warning*` cookie whose value has to come back as the `confirm`
//! query parameter.

use std::path::Path;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::FetchError;

const DRIVE_URL: &str = "https://docs.google.com/uc?export=download";

pub async fn download_from_google_drive(gd_id: &str, target: &Path) -> Result<(), FetchError> {
    let client = reqwest::Client::builder().cookie_store(true).build()?;

    let response = client.get(DRIVE_URL).query(&[("id", gd_id)]).send().await?;
    let token = response
        .cookies()
        .find(|cookie| cookie.name().starts_with("download_warning"))
        .map(|cookie| cookie.value().to_owned());

    let response = match token {
        Some(token) => {
            debug!(gd_id, "confirming google drive download");
            client
                .get(DRIVE_URL)
                .query(&[("id", gd_id), ("confirm", token.as_str())])
                .send()
                .await?
        }
        None => response,
    };
    let response = response.error_for_status()?;

    if let Some(dir) = target.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut file = tokio::fs::File::create(target).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
