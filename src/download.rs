/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::download
  ------------------------------------------------------------
  Purpose:
    Stream installer artifacts to disk and manage the scratch
    directory they live in.

  Security / Safety Notes:
    Destinations are created exclusively; an existing file is
    never overwritten. Any failed download removes its partial
    file so it cannot be executed later.

  Dependencies:
    reqwest for HTTP, futures-util for body streaming,
    tokio::fs for file I/O, urlencoding for artifact names.

  Operational Scope:
    Used by the Windows/macOS global installer.

  Revision History:
    2026-10-19 COD  Implemented streaming downloader.
============================================================*/

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::config::DownloadConfig;
use crate::error::{GlobalSdkError, Result};

/// Build the HTTP client used for installer downloads.
pub fn build_client(config: &DownloadConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|err| GlobalSdkError::Network(format!("Failed to build HTTP client: {err}")))
}

/// File name for an artifact: the final path segment of its URL.
pub fn artifact_file_name(url: &str) -> Result<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let segment = without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| GlobalSdkError::Download(format!("No file name in URL {url}")))?;
    let decoded = urlencoding::decode(segment)
        .map_err(|err| GlobalSdkError::Download(format!("Bad file name in URL {url}: {err}")))?;
    if decoded.contains(['/', '\\']) || decoded == ".." {
        return Err(GlobalSdkError::Download(format!(
            "Refusing file name `{decoded}` from {url}"
        )));
    }
    Ok(decoded.into_owned())
}

/// Remove every entry inside `dir`, keeping `dir` itself. A missing
/// directory counts as already wiped. Returns how many entries were removed.
pub async fn wipe_directory(dir: &Path) -> Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(cleanup_error(dir, err)),
    };

    let mut removed = 0usize;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| cleanup_error(dir, err))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|err| cleanup_error(&path, err))?;
        let outcome = if file_type.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        match outcome {
            Ok(()) => removed += 1,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(cleanup_error(&path, err)),
        }
    }
    Ok(removed)
}

fn cleanup_error(path: &Path, err: io::Error) -> GlobalSdkError {
    GlobalSdkError::Cleanup(format!("Failed to wipe {}: {err}", path.display()))
}

/// Stream `url` into a freshly created `dest`. Fails without touching `dest`
/// if it already exists; removes the partial file on any other failure, and
/// also when the returned future is dropped before it completes.
pub async fn download_to_file(client: &reqwest::Client, url: &str, dest: &Path) -> Result<u64> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await
        .map_err(|err| {
            if err.kind() == io::ErrorKind::AlreadyExists {
                GlobalSdkError::Download(format!("Destination {} already exists", dest.display()))
            } else {
                GlobalSdkError::Download(format!("Failed to create {}: {err}", dest.display()))
            }
        })?;
    let mut partial = PartialArtifact::new(dest);

    let outcome = stream_body(client, url, &mut file).await;
    drop(file);

    match outcome {
        Ok(bytes) => {
            partial.keep();
            Ok(bytes)
        }
        Err(err) => {
            partial.keep();
            discard_partial(dest).await?;
            Err(err)
        }
    }
}

/// Removes an unfinished artifact when dropped unless told to keep it.
struct PartialArtifact<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialArtifact<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn keep(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialArtifact<'_> {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(self.path);
        }
    }
}

async fn stream_body(client: &reqwest::Client, url: &str, file: &mut fs::File) -> Result<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| GlobalSdkError::Download(format!("Request to {url} failed: {err}")))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(GlobalSdkError::Download(format!(
            "{url} answered {}",
            status.as_u16()
        )));
    }

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| {
            GlobalSdkError::Download(format!("Transfer from {url} interrupted: {err}"))
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|err| GlobalSdkError::Download(format!("Failed to write artifact: {err}")))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|err| GlobalSdkError::Download(format!("Failed to flush artifact: {err}")))?;
    Ok(written)
}

async fn discard_partial(dest: &Path) -> Result<()> {
    match fs::remove_file(dest).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(cleanup_error(dest, err)),
    }
}

/// Scratch path an artifact from `url` will be written to.
pub fn artifact_path(scratch_dir: &Path, url: &str) -> Result<PathBuf> {
    Ok(scratch_dir.join(artifact_file_name(url)?))
}
