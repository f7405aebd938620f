use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::load_config;
use crate::error::{Error, Result, is_intercepted, translate_error};
use crate::models::{
    Dataset, DatasetSummary, DeletedDataset, DownloadRequestReply, HistoryEntry, License,
    NewDataset, SearchResult, Topic, User,
};
use crate::util::{flatten_params, guess_filename_from_url, urljoin};

/// Default BuzzData API root.
pub const DEFAULT_URL: &str = "https://buzzdata.com/api";

/// HTTP verbs understood by [`Client::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, typically `https://buzzdata.com/api`.
    pub url: String,
    /// API key sent as the `api_key` parameter on every call.
    pub api_key: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Optional `username` entry of the configuration file.
    pub username: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    api_key: String,
    username: Option<String>,

    timeout: Duration,
    poll_interval: Duration,
    progress: bool,

    pub(crate) http: HttpClient,
}

impl Client {
    /// Creates a client from `BUZZDATA_API_KEY` or `~/.buzzdata`.
    ///
    /// This is equivalent to `Client::new(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None)
    }

    /// Creates a client with an explicit API key. No configuration file is read.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::new(Some(api_key.into()), None)
    }

    /// Creates a client using (in order of precedence):
    /// - the explicit `api_key` argument
    /// - the YAML file at `config_file`, if given
    /// - the `BUZZDATA_API_KEY` environment variable
    /// - `~/.buzzdata`, if it exists
    pub fn new(api_key: Option<String>, config_file: Option<&Path>) -> Result<Self> {
        let cfg = load_config(api_key, config_file)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("buzzdata-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("buzzdata-rs")),
        );

        // Timeouts are applied per API call; uploads and downloads run unbounded.
        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(None);

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| Error::with_source("failed to build HTTP client", e))?;

        Ok(Self {
            url: cfg.url,
            api_key: cfg.api_key,
            username: cfg.username,
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            progress: false,
            http,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sleep between upload status checks in [`Upload::wait`](crate::Upload::wait).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Show progress bars for uploads and downloads on stderr.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn progress(&self) -> bool {
        self.progress
    }

    pub fn url_for(&self, path: &str) -> String {
        urljoin(&self.url, path)
    }

    /// Sends `params` plus `api_key` to `path` with the given verb.
    ///
    /// `params` must serialize to a JSON object (or `null` for none). POST
    /// carries the parameters as a form body, every other verb as query
    /// parameters. Responses with status 403, 404 or 500 become an [`Error`]
    /// carrying the server's `message`; every other response is returned as is.
    pub fn request<P: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        params: &P,
    ) -> Result<Response> {
        let url = self.url_for(path);
        let params = serde_json::to_value(params)
            .map_err(|e| Error::with_source("failed to encode request parameters", e))?;

        let mut pairs = flatten_params(&params)?;
        pairs.retain(|(k, _)| k != "api_key");
        pairs.push(("api_key".to_string(), self.api_key.clone()));

        debug!(method = method.as_str(), url = %url, "sending request");

        let req = match method {
            Method::Get => self.http.get(&url).query(&pairs),
            Method::Put => self.http.put(&url).query(&pairs),
            Method::Delete => self.http.delete(&url).query(&pairs),
            Method::Post => self.http.post(&url).form(&pairs),
        };
        self.dispatch(req.timeout(self.timeout))
    }

    /// Like [`Client::request`], then parses the body as JSON.
    pub fn request_json<T: DeserializeOwned, P: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        params: &P,
    ) -> Result<T> {
        let resp = self.request(method, path, params)?;
        read_json(resp)
    }

    pub(crate) fn dispatch(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.send().map_err(Error::connection)?;
        let status = resp.status();
        debug!(status = status.as_u16(), "received response");

        if is_intercepted(status) {
            let text = resp.text().map_err(Error::connection)?;
            return Err(translate_error(status, &text));
        }
        Ok(resp)
    }

    pub fn dataset_overview(&self, dataset: &str) -> Result<Dataset> {
        self.request_json(Method::Get, dataset, &Value::Null)
    }

    pub fn dataset_history(&self, dataset: &str) -> Result<Vec<HistoryEntry>> {
        self.request_json(Method::Get, &format!("{}/history", dataset), &Value::Null)
    }

    pub fn datasets_list(&self, username: &str) -> Result<Vec<DatasetSummary>> {
        self.request_json(Method::Get, &format!("{}/datasets/list", username), &Value::Null)
    }

    /// Creates a dataset in `attributes.username`'s namespace.
    pub fn create_dataset(&self, attributes: &NewDataset) -> Result<Dataset> {
        self.request_json(
            Method::Post,
            &format!("{}/datasets", attributes.username),
            &json!({ "dataset": attributes }),
        )
    }

    /// Updates the given attributes of an existing dataset.
    pub fn update_dataset<A: Serialize + ?Sized>(
        &self,
        dataset: &str,
        attributes: &A,
    ) -> Result<Dataset> {
        let attributes = serde_json::to_value(attributes)
            .map_err(|e| Error::with_source("failed to encode dataset attributes", e))?;
        self.request_json(Method::Put, dataset, &json!({ "dataset": attributes }))
    }

    pub fn delete_dataset(&self, dataset: &str) -> Result<DeletedDataset> {
        self.request_json(Method::Delete, dataset, &Value::Null)
    }

    /// Makes the latest uploaded version the public one.
    ///
    /// Publishing an already published dataset returns whatever the server
    /// replies; the client does not interpret it.
    pub fn publish_dataset(&self, dataset: &str) -> Result<Dataset> {
        self.request_json(Method::Post, &format!("{}/publish", dataset), &Value::Null)
    }

    /// Copies a published dataset of another user into the caller's namespace.
    pub fn clone_dataset(&self, dataset: &str) -> Result<Dataset> {
        self.request_json(Method::Post, &format!("{}/clone", dataset), &Value::Null)
    }

    pub fn licenses(&self) -> Result<Vec<License>> {
        self.request_json(Method::Get, "licenses", &Value::Null)
    }

    pub fn topics(&self) -> Result<Vec<Topic>> {
        self.request_json(Method::Get, "topics", &Value::Null)
    }

    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.request_json(Method::Get, "search", &json!({ "query": query }))
    }

    pub fn user_info(&self, username: &str) -> Result<User> {
        self.request_json(Method::Get, username, &Value::Null)
    }

    /// Downloads the published data of a dataset into memory.
    pub fn download_data(&self, dataset: &str) -> Result<Vec<u8>> {
        let url = self.download_url(dataset)?;
        let resp = self.raw_get(&url)?;
        let bytes = resp.bytes().map_err(Error::connection)?;
        Ok(bytes.to_vec())
    }

    /// Streams the published data of a dataset to `target`.
    ///
    /// An empty `target` uses the file name of the download URL.
    pub fn download_data_to(&self, dataset: &str, target: &Path) -> Result<PathBuf> {
        let url = self.download_url(dataset)?;

        let target = if target.as_os_str().is_empty() {
            guess_filename_from_url(&url)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("download"))
        } else {
            target.to_path_buf()
        };

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    let msg = format!("failed to create directory {}", parent.display());
                    Error::with_source(msg, e)
                })?;
            }
        }

        let mut resp = self.raw_get(&url)?;

        let pb = if self.progress {
            let pb = match resp.content_length() {
                Some(len) => ProgressBar::new(len),
                None => ProgressBar::new_spinner(),
            };
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                )
                .map(|s| s.progress_chars("=>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            Some(pb)
        } else {
            None
        };

        let copied = copy_to_file(&mut resp, &target, pb.as_ref());
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        copied?;

        debug!(dataset, path = %target.display(), "download finished");
        Ok(target)
    }

    fn download_url(&self, dataset: &str) -> Result<String> {
        let reply: DownloadRequestReply = self.request_json(
            Method::Post,
            &format!("{}/download_request", dataset),
            &Value::Null,
        )?;
        Ok(reply.download_request.url)
    }

    /// Plain GET without the API key or status translation.
    fn raw_get(&self, url: &str) -> Result<Response> {
        debug!(url, "fetching");
        let resp = self.http.get(url).send().map_err(Error::connection)?;
        let status = resp.status();
        if !status.is_success() {
            let msg = format!("download failed: HTTP {} for url ({})", status, url);
            return Err(match resp.text() {
                Ok(text) => Error::from_status(status, format!("{}\n{}", msg, text.trim())),
                Err(e) => Error::with_source(msg, e).with_status(status),
            });
        }
        Ok(resp)
    }
}

/// Copies `reader` into a fresh file at `target`. The file is removed again
/// if the copy does not complete.
fn copy_to_file(reader: &mut impl Read, target: &Path, pb: Option<&ProgressBar>) -> Result<()> {
    let mut out = File::create(target)
        .map_err(|e| Error::with_source(format!("failed to open {}", target.display()), e))?;

    let result = copy_stream(reader, &mut out, pb).map_err(|e| match e {
        CopyError::Read(e) => Error::with_source("download interrupted", e),
        CopyError::Write(e) => {
            Error::with_source(format!("failed to write {}", target.display()), e)
        }
    });

    if result.is_err() {
        drop(out);
        if let Err(e) = std::fs::remove_file(target) {
            warn!(path = %target.display(), error = %e, "failed to remove partial download");
        }
    }
    result
}

enum CopyError {
    Read(std::io::Error),
    Write(std::io::Error),
}

fn copy_stream(
    reader: &mut impl Read,
    out: &mut File,
    pb: Option<&ProgressBar>,
) -> std::result::Result<(), CopyError> {
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(CopyError::Read)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(CopyError::Write)?;
        if let Some(pb) = pb {
            pb.inc(n as u64);
        }
    }
    out.flush().map_err(CopyError::Write)
}

pub(crate) fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let mut url = resp.url().clone();
    url.set_query(None);

    let text = resp.text().map_err(Error::connection)?;
    serde_json::from_str::<T>(&text).map_err(|e| {
        Error::with_source(
            format!("failed to parse API JSON (url={}, status={})", url, status),
            e,
        )
    })
}
