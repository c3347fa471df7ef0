//! HTTP downloads with retry, used for fetching installers and archives.

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::common::files;
use crate::common::package::Output;
use crate::ui::prelude::*;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Error, the file to download already exists: '{}'", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Not found: {url}")]
    NotFound { url: String },

    #[error("Forbidden ({status}): {url}")]
    Forbidden { url: String, status: u16 },

    #[error("Checksum mismatch for {url}: {reason}")]
    Checksum { url: String, reason: String },

    #[error("Error downloading file {url}: '{cause}'")]
    Failed { url: String, cause: String },

    #[error("Could not write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    Basic {
        user: String,
        password: Option<String>,
    },
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Total attempts for transient failures (at least one is made).
    pub retry: u32,
    /// Seconds between attempts.
    pub retry_wait: u64,
    pub overwrite: bool,
    pub auth: Option<Auth>,
    pub headers: Vec<(String, String)>,
    /// Expected SHA-256 of the downloaded file.
    pub sha256: Option<String>,
    /// Expected MD5, checked after `sha256` when both are set.
    pub md5: Option<String>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            retry: 2,
            retry_wait: 5,
            overwrite: false,
            auth: None,
            headers: Vec::new(),
            sha256: None,
            md5: None,
        }
    }
}

enum AttemptError {
    Fatal(DownloadError),
    Transient(String),
}

/// Download `url` to `dest`.
///
/// Missing and forbidden resources fail immediately; anything else is
/// retried according to `options`.
pub fn download(
    url: &str,
    dest: &Path,
    options: &DownloadOptions,
    out: &mut dyn Output,
) -> Result<(), DownloadError> {
    if dest.exists() && !options.overwrite {
        return Err(DownloadError::AlreadyExists(dest.to_path_buf()));
    }

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("syspkg/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DownloadError::Failed {
            url: url.to_string(),
            cause: e.to_string(),
        })?;

    let attempts = options.retry.max(1);
    let mut last_cause = String::new();
    for attempt in 1..=attempts {
        emit(
            Level::Debug,
            "syspkg.download.attempt",
            &format!("GET {} (attempt {}/{})", url, attempt, attempts),
            None,
        );
        match fetch(&client, url, dest, options) {
            Ok(()) => return verify(url, dest, options),
            Err(AttemptError::Fatal(err)) => return Err(err),
            Err(AttemptError::Transient(cause)) => {
                out.warn(&format!("Error downloading file {}: '{}'", url, cause));
                last_cause = cause;
                if attempt < attempts {
                    out.info(&format!("Waiting {} seconds to retry...", options.retry_wait));
                    std::thread::sleep(Duration::from_secs(options.retry_wait));
                }
            }
        }
    }

    Err(DownloadError::Failed {
        url: url.to_string(),
        cause: last_cause,
    })
}

fn fetch(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &Path,
    options: &DownloadOptions,
) -> Result<(), AttemptError> {
    let mut request = client.get(url);
    for (name, value) in &options.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request = match &options.auth {
        Some(Auth::Basic { user, password }) => request.basic_auth(user, password.as_ref()),
        Some(Auth::Bearer(token)) => request.bearer_auth(token),
        None => request,
    };

    let mut response = request
        .send()
        .map_err(|e| AttemptError::Transient(e.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AttemptError::Fatal(DownloadError::NotFound {
            url: url.to_string(),
        }));
    }
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AttemptError::Fatal(DownloadError::Forbidden {
            url: url.to_string(),
            status: status.as_u16(),
        }));
    }
    if !status.is_success() {
        return Err(AttemptError::Transient(status.to_string()));
    }

    let io_error = |source| {
        AttemptError::Fatal(DownloadError::Io {
            path: dest.to_path_buf(),
            source,
        })
    };
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let partial = partial_path(dest);
    let file = fs::File::create(&partial).map_err(io_error)?;
    let pb = progress_bar(response.content_length());
    let mut writer = pb.wrap_write(file);

    let copied = response.copy_to(&mut writer);
    let flushed = writer.flush();
    pb.finish_and_clear();
    drop(writer);

    if let Err(err) = copied {
        let _ = fs::remove_file(&partial);
        return Err(AttemptError::Transient(err.to_string()));
    }
    flushed.map_err(io_error)?;
    fs::rename(&partial, dest).map_err(io_error)?;
    Ok(())
}

fn verify(url: &str, dest: &Path, options: &DownloadOptions) -> Result<(), DownloadError> {
    let checked = match (&options.sha256, &options.md5) {
        (None, None) => return Ok(()),
        (Some(sha256), md5) => files::check_sha256(dest, sha256)
            .and_then(|()| md5.as_deref().map_or(Ok(()), |md5| files::check_md5(dest, md5))),
        (None, Some(md5)) => files::check_md5(dest, md5),
    };
    checked.map_err(|err| {
        let _ = fs::remove_file(dest);
        DownloadError::Checksum {
            url: url.to_string(),
            reason: err.to_string(),
        }
    })
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn progress_bar(len: Option<u64>) -> ProgressBar {
    if get_output_format() == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    match len {
        Some(len) => {
            let pb = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
            {
                pb.set_style(style);
            }
            pb
        }
        None => ProgressBar::new_spinner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::package::BufferOutput;
    use tempfile::TempDir;

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.tgz");
        fs::write(&dest, "old").unwrap();

        let mut out = BufferOutput::new();
        let err = download(
            "http://127.0.0.1:1/file.tgz",
            &dest,
            &DownloadOptions::default(),
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, DownloadError::AlreadyExists(_)));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "old");
        assert!(out.contents().is_empty());
    }

    #[test]
    fn test_connection_failures_are_retried() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.tgz");

        let mut out = BufferOutput::new();
        let options = DownloadOptions {
            retry: 3,
            retry_wait: 0,
            ..DownloadOptions::default()
        };
        let err = download("http://127.0.0.1:1/file.tgz", &dest, &options, &mut out).unwrap_err();

        assert!(matches!(err, DownloadError::Failed { .. }));
        assert_eq!(
            out.contents().matches("Waiting 0 seconds to retry...").count(),
            2
        );
        assert!(!dest.exists());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/a.tar.gz")),
            PathBuf::from("/tmp/a.tar.gz.part")
        );
    }

    #[test]
    fn test_md5_mismatch_removes_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("file.tgz");
        fs::write(&dest, "abc").unwrap();

        let options = DownloadOptions {
            md5: Some("900150983cd24fb0d6963f7d28e17f72".into()),
            ..DownloadOptions::default()
        };
        verify("http://host/file.tgz", &dest, &options).unwrap();
        assert!(dest.exists());

        let options = DownloadOptions {
            md5: Some("deadbeef".into()),
            ..DownloadOptions::default()
        };
        let err = verify("http://host/file.tgz", &dest, &options).unwrap_err();
        assert!(matches!(err, DownloadError::Checksum { .. }));
        assert!(!dest.exists());
    }
}
