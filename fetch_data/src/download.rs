//! Resumable http downloads. A `.part` sidecar holds whatever bytes have
//! arrived so far; a killed transfer can be picked up again with a ranged
//! request as long as the server honors `Accept-Ranges`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT_RANGES, RANGE};
use reqwest_middleware::ClientWithMiddleware;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, trace, warn};

use crate::error::FetchError;

const DOWNLOAD_ATTEMPTS: u32 = 5;

enum AttemptOutcome {
    Complete { received: u64, expected: Option<u64> },
    RangesUnsupported,
}

/// One attempt of moving bytes from `url` into the `.part` file, starting at
/// `resume_pos`. The retry loop owns the attempt budget and the backoff.
#[async_trait]
trait Transfer: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        part: &Path,
        resume_pos: u64,
    ) -> Result<AttemptOutcome, FetchError>;
}

/// Downloads `url` into `<dir>/<filename>`. When the target already exists
/// and `redownload` is false the call is a no-op. Transient connection
/// failures burn one of five attempts with an exponential backoff between
/// them; running out of attempts is fatal.
pub async fn download(
    url: &str,
    dir: &Path,
    filename: &str,
    redownload: bool,
) -> Result<PathBuf, FetchError> {
    let transfer = HttpTransfer {
        client: logging::new_client(),
    };
    download_with(&transfer, url, dir, filename, redownload).await
}

async fn download_with(
    transfer: &dyn Transfer,
    url: &str,
    dir: &Path,
    filename: &str,
    redownload: bool,
) -> Result<PathBuf, FetchError> {
    let target = dir.join(filename);
    if target.exists() && !redownload {
        debug!(path = %target.display(), "already downloaded, skipping");
        return Ok(target);
    }
    tokio::fs::create_dir_all(dir).await?;

    let part = part_path(&target);
    let mut resumable = true;

    for attempt in 0..DOWNLOAD_ATTEMPTS {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1));
            debug!(attempt, delay_s = delay.as_secs(), %url, "retrying download");
            tokio::time::sleep(delay).await;
        }

        let resume_pos = if resumable { existing_len(&part).await } else { 0 };
        match transfer.fetch(url, &part, resume_pos).await {
            Ok(AttemptOutcome::Complete { received, expected }) => {
                if let Some(expected) = expected {
                    if received < expected {
                        warn!(
                            received,
                            expected,
                            %url,
                            "download finished short of the expected size"
                        );
                    }
                }
                finalize_part(&part, &target).await?;
                info!(path = %target.display(), %url, "download complete");
                return Ok(target);
            }
            Ok(AttemptOutcome::RangesUnsupported) => {
                warn!(%url, "server does not honor range requests, restarting from scratch");
                let _ = tokio::fs::remove_file(&part).await;
                resumable = false;
            }
            Err(error) if is_transient(&error) => {
                warn!(%error, %url, attempt, "download attempt failed");
            }
            Err(error) => return Err(error),
        }
    }

    Err(FetchError::DownloadExhausted {
        url: url.to_owned(),
        attempts: DOWNLOAD_ATTEMPTS,
    })
}

struct HttpTransfer {
    client: ClientWithMiddleware,
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn fetch(
        &self,
        url: &str,
        part: &Path,
        resume_pos: u64,
    ) -> Result<AttemptOutcome, FetchError> {
        let mut request = self.client.get(url);
        if resume_pos > 0 {
            request = request.header(RANGE, format!("bytes={}-", resume_pos));
        }
        let response = request.send().await?.error_for_status()?;

        if resume_pos > 0 {
            let ranges_honored = response
                .headers()
                .get(ACCEPT_RANGES)
                .and_then(|value| value.to_str().ok())
                .map(|value| value != "none")
                .unwrap_or(false);
            if !ranges_honored {
                return Ok(AttemptOutcome::RangesUnsupported);
            }
        }

        // content-length covers only the remaining bytes of a ranged response
        let expected = response.content_length().map(|len| len + resume_pos);
        let mut file = open_part(part, resume_pos > 0).await?;
        let mut received = resume_pos;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            trace!(bytes = received, total = ?expected, %url, "download progress");
        }
        file.flush().await?;

        Ok(AttemptOutcome::Complete { received, expected })
    }
}

async fn open_part(part: &Path, resume: bool) -> Result<File, FetchError> {
    let file = if resume {
        OpenOptions::new().append(true).create(true).open(part).await?
    } else {
        File::create(part).await?
    };
    Ok(file)
}

async fn finalize_part(part: &Path, target: &Path) -> Result<(), FetchError> {
    tokio::fs::rename(part, target).await?;
    Ok(())
}

async fn existing_len(part: &Path) -> u64 {
    match tokio::fs::metadata(part).await {
        Ok(metadata) => metadata.len(),
        Err(_) => 0,
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn is_transient(error: &FetchError) -> bool {
    match error {
        FetchError::Reqwest(error) => !error.is_status(),
        FetchError::Middleware(_) => true,
        FetchError::Io(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::io::AsyncWriteExt;

    struct FailingTransfer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transfer for FailingTransfer {
        async fn fetch(
            &self,
            _url: &str,
            _part: &Path,
            _resume_pos: u64,
        ) -> Result<AttemptOutcome, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )))
        }
    }

    /// Drops the connection partway through the first attempt, then serves
    /// the rest of the payload from wherever the retry resumes.
    struct FlakyTransfer {
        payload: Vec<u8>,
        cut_at: usize,
        calls: AtomicUsize,
        resume_positions: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl Transfer for FlakyTransfer {
        async fn fetch(
            &self,
            _url: &str,
            part: &Path,
            resume_pos: u64,
        ) -> Result<AttemptOutcome, FetchError> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            self.resume_positions
                .lock()
                .expect("lock")
                .push(resume_pos);
            if attempt == 0 {
                std::fs::write(part, &self.payload[..self.cut_at])?;
                return Err(FetchError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionAborted,
                    "connection aborted",
                )));
            }
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(part)?;
            file.write_all(&self.payload[resume_pos as usize..])?;
            Ok(AttemptOutcome::Complete {
                received: self.payload.len() as u64,
                expected: Some(self.payload.len() as u64),
            })
        }
    }

    #[test]
    fn test_part_path_appends_suffix() {
        let part = part_path(Path::new("/tmp/data/wiki.tgz"));
        assert_eq!(part, PathBuf::from("/tmp/data/wiki.tgz.part"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_exhausts_the_attempt_budget() {
        let dir = tempfile::tempdir().expect("tempdir");
        let transfer = FailingTransfer {
            calls: AtomicUsize::new(0),
        };
        let error = download_with(
            &transfer,
            "http://example.com/data.tgz",
            dir.path(),
            "data.tgz",
            false,
        )
        .await
        .expect_err("must fail");
        assert!(matches!(
            error,
            FetchError::DownloadExhausted {
                attempts: DOWNLOAD_ATTEMPTS,
                ..
            }
        ));
        assert_eq!(transfer.calls.load(Ordering::SeqCst), 5);
        assert!(!dir.path().join("data.tgz").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_resumes_from_part_offset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payload = b"the quick brown fox jumps over the lazy dog".to_vec();
        let transfer = FlakyTransfer {
            payload: payload.clone(),
            cut_at: 10,
            calls: AtomicUsize::new(0),
            resume_positions: Mutex::new(Vec::new()),
        };
        let target = download_with(
            &transfer,
            "http://example.com/data.bin",
            dir.path(),
            "data.bin",
            false,
        )
        .await
        .expect("download");

        assert_eq!(std::fs::read(&target).expect("read"), payload);
        // the retry asked for bytes from where the first attempt stopped
        assert_eq!(
            *transfer.resume_positions.lock().expect("lock"),
            vec![0, 10]
        );
        assert!(!part_path(&target).exists());
    }

    #[tokio::test]
    async fn test_resumed_part_matches_single_pass() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payload = b"the quick brown fox jumps over the lazy dog".to_vec();

        // single uninterrupted pass
        let single_target = dir.path().join("single.bin");
        let single_part = part_path(&single_target);
        let mut file = open_part(&single_part, false).await.expect("open");
        file.write_all(&payload).await.expect("write");
        file.flush().await.expect("flush");
        drop(file);
        finalize_part(&single_part, &single_target)
            .await
            .expect("finalize");

        // interrupted after 10 bytes, then resumed in append mode
        let resumed_target = dir.path().join("resumed.bin");
        let resumed_part = part_path(&resumed_target);
        let mut file = open_part(&resumed_part, false).await.expect("open");
        file.write_all(&payload[..10]).await.expect("write");
        file.flush().await.expect("flush");
        drop(file);

        let resume_pos = existing_len(&resumed_part).await;
        assert_eq!(resume_pos, 10);
        let mut file = open_part(&resumed_part, true).await.expect("reopen");
        file.write_all(&payload[resume_pos as usize..])
            .await
            .expect("append");
        file.flush().await.expect("flush");
        drop(file);
        finalize_part(&resumed_part, &resumed_target)
            .await
            .expect("finalize");

        let single = std::fs::read(&single_target).expect("read");
        let resumed = std::fs::read(&resumed_target).expect("read");
        assert_eq!(single, resumed);
        assert!(!resumed_part.exists());
    }

    #[tokio::test]
    async fn test_existing_len_of_missing_part_is_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(existing_len(&dir.path().join("nothing.part")).await, 0);
    }
}
