//! File uploads and the upload status handle.
//!
//! An upload is started with [`Client::start_upload`]. The server then
//! processes the file in the background; the returned [`Upload`] is polled
//! until it leaves the in-progress state, after which the dataset can be
//! published.

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::multipart::Form;
use serde_json::{Value, json};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::{Client, Method, read_json};
use crate::error::{Error, Result};
use crate::models::{UploadRequest, UploadRequestReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    InProgress,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatus {
    pub state: UploadState,
    /// Server explanation, set when the upload failed.
    pub message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct UploadStatusReply {
    status: String,
    #[serde(default)]
    status_message: Option<String>,
}

impl UploadStatusReply {
    fn into_status(self) -> Result<UploadStatus> {
        let state = match self.status.as_str() {
            "queued" | "processing" => UploadState::InProgress,
            "complete" => UploadState::Succeeded,
            "failed" => UploadState::Failed,
            other => return Err(Error::new(format!("unknown upload status [{}]", other))),
        };
        Ok(UploadStatus {
            state,
            message: self.status_message,
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct UploadReply {
    job_status_token: String,
}

/// An in-flight upload. Poll with [`Upload::in_progress`] until it returns
/// `false`, then check [`Upload::is_success`].
#[derive(Debug)]
pub struct Upload<'a> {
    client: &'a Client,
    dataset: String,
    job_status_token: String,
    status: Option<UploadStatus>,
}

impl<'a> Upload<'a> {
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn job_status_token(&self) -> &str {
        &self.job_status_token
    }

    /// Asks the server for the current status and remembers it.
    pub fn refresh(&mut self) -> Result<&UploadStatus> {
        let reply: UploadStatusReply = self.client.request_json(
            Method::Get,
            &format!("{}/upload_request/status", self.dataset),
            &json!({ "job_status_token": self.job_status_token }),
        )?;
        let status = reply.into_status()?;

        if self.status.as_ref().map(|s| s.state) != Some(status.state) {
            info!(dataset = %self.dataset, state = ?status.state, "upload state");
        }
        Ok(self.status.insert(status))
    }

    /// Refreshes the status and reports whether the server is still working.
    pub fn in_progress(&mut self) -> Result<bool> {
        Ok(self.refresh()?.state == UploadState::InProgress)
    }

    /// Last observed status, without contacting the server.
    pub fn status(&self) -> Option<&UploadStatus> {
        self.status.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.state() == Some(UploadState::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        self.state() == Some(UploadState::Failed)
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.message.as_deref())
    }

    fn state(&self) -> Option<UploadState> {
        self.status.as_ref().map(|s| s.state)
    }

    /// Polls at the client's poll interval until the upload finishes.
    ///
    /// A failed upload is returned as an [`Error`] carrying the status message.
    pub fn wait(&mut self) -> Result<()> {
        let interval = self.client.poll_interval();
        let spinner = self.client.progress().then(|| {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})") {
                pb.set_style(style);
            }
            pb.set_message(format!("processing upload for {}", self.dataset));
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        let result = loop {
            match self.in_progress() {
                Ok(true) => thread::sleep(interval),
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        result?;

        if self.is_failure() {
            return Err(Error::new(
                self.status_message().unwrap_or("upload failed").to_string(),
            ));
        }
        Ok(())
    }
}

impl Client {
    /// Asks the server where a file for `dataset` may be uploaded.
    pub fn create_upload_request(&self, dataset: &str) -> Result<UploadRequest> {
        let reply: UploadRequestReply = self.request_json(
            Method::Post,
            &format!("{}/upload_request", dataset),
            &Value::Null,
        )?;
        Ok(reply.upload_request)
    }

    /// Uploads `file` to `dataset` and returns a handle to poll for the
    /// server-side processing.
    pub fn start_upload(
        &self,
        dataset: &str,
        file: &Path,
        release_notes: Option<&str>,
    ) -> Result<Upload<'_>> {
        let upload_request = self.create_upload_request(dataset)?;
        let url = self.url_for(&upload_request.url);

        let form = Form::new()
            .text("api_key", self.api_key().to_string())
            .text("upload_code", upload_request.upload_code)
            .text("release_notes", release_notes.unwrap_or_default().to_string())
            .file("file", file)
            .map_err(|e| Error::with_source(format!("failed to open {}", file.display()), e))?;

        debug!(dataset, file = %file.display(), url = %url, "uploading");
        let resp = self.dispatch(self.http.post(&url).multipart(form))?;
        let reply: UploadReply = read_json(resp)?;

        Ok(Upload {
            client: self,
            dataset: dataset.to_string(),
            job_status_token: reply.job_status_token,
            status: None,
        })
    }

    /// Uploads `file` and blocks until the server has processed it.
    pub fn upload(&self, dataset: &str, file: &Path, release_notes: Option<&str>) -> Result<()> {
        let mut upload = self.start_upload(dataset, file, release_notes)?;
        upload.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: &str, message: Option<&str>) -> UploadStatusReply {
        UploadStatusReply {
            status: status.to_string(),
            status_message: message.map(str::to_string),
        }
    }

    #[test]
    fn maps_wire_states() {
        assert_eq!(reply("queued", None).into_status().unwrap().state, UploadState::InProgress);
        assert_eq!(reply("processing", None).into_status().unwrap().state, UploadState::InProgress);
        assert_eq!(reply("complete", None).into_status().unwrap().state, UploadState::Succeeded);

        let failed = reply("failed", Some("Unable to parse CSV")).into_status().unwrap();
        assert_eq!(failed.state, UploadState::Failed);
        assert_eq!(failed.message.as_deref(), Some("Unable to parse CSV"));
    }

    #[test]
    fn unknown_state_is_an_error() {
        let err = reply("exploded", None).into_status().unwrap_err();
        assert_eq!(err.message(), "unknown upload status [exploded]");
    }
}
