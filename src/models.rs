use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A dataset as returned by the overview, create, update, publish and clone calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// `username/shortname`.
    pub id: String,
    pub username: String,
    pub shortname: String,
    pub name: String,
    #[serde(default)]
    pub readme: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    pub public: bool,
    pub published: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub data_updated_at: Option<String>,
}

/// An entry of a user's dataset list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub shortname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: u64,
    pub created_at: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedDataset {
    pub id: String,
    pub deleted: bool,
}

/// Attributes sent when creating or updating a dataset.
///
/// Validation (required fields, valid license and topics, name uniqueness)
/// happens on the server and is reported as an [`Error`](crate::Error).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDataset {
    pub username: String,
    pub name: String,
    pub readme: String,
    pub license: String,
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub label: String,
    pub value: String,
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct UploadRequestReply {
    pub(crate) upload_request: UploadRequest,
}

/// Where and with which code a file for a dataset may be uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub upload_code: String,
    pub url: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct DownloadRequestReply {
    pub(crate) download_request: DownloadRequest,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct DownloadRequest {
    pub(crate) url: String,
}
