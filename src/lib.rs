//! A small blocking Rust client for the BuzzData dataset hosting API.
//!
//! Datasets are created, uploaded to, published, cloned, listed, searched,
//! downloaded and deleted through thin calls that attach the API key and
//! translate the server's error replies into [`Error`].
//!
//! ## Quick start
//! - Configure authentication with an explicit key, the `BUZZDATA_API_KEY`
//!   environment variable, or a YAML file (`~/.buzzdata` or a custom path)
//!   containing `api_key: ...`.
//! - Upload a file, wait for the server to process it, then publish.
//!
//! ```no_run
//! use buzzdata::Client;
//! use std::path::Path;
//! use std::{thread, time::Duration};
//!
//! fn main() -> buzzdata::Result<()> {
//!     let client = Client::from_env()?;
//!     let mut upload = client.start_upload("eviltrout/kittens", Path::new("kittens.csv"), None)?;
//!     while upload.in_progress()? {
//!         thread::sleep(Duration::from_secs(1));
//!     }
//!     if upload.is_success() {
//!         let dataset = client.publish_dataset("eviltrout/kittens")?;
//!         assert!(dataset.published);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod models;
mod upload;
mod util;

pub use client::{Client, ClientConfig, DEFAULT_URL, Method};
pub use error::{Error, Result};
pub use models::{
    Dataset, DatasetSummary, DeletedDataset, HistoryEntry, License, NewDataset, SearchResult,
    Topic, UploadRequest, User,
};
pub use upload::{Upload, UploadState, UploadStatus};
