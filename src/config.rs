use serde_yaml::{Mapping, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::client::{ClientConfig, DEFAULT_URL};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct FileConfig {
    api_key: Option<String>,
    url: Option<String>,
    verify: Option<bool>,
    username: Option<String>,
}

pub(crate) fn load_config(
    api_key: Option<String>,
    config_file: Option<&Path>,
) -> Result<ClientConfig> {
    resolve(
        api_key,
        std::env::var("BUZZDATA_API_KEY").ok(),
        std::env::var("BUZZDATA_URL").ok(),
        config_file,
        default_config_file(),
    )
}

/// Resolution order for the key: explicit argument, then a custom
/// configuration file if one was given. Without a custom file,
/// `BUZZDATA_API_KEY` is used, then the default file if it exists.
fn resolve(
    api_key: Option<String>,
    env_key: Option<String>,
    env_url: Option<String>,
    config_file: Option<&Path>,
    default_file: Option<PathBuf>,
) -> Result<ClientConfig> {
    let mut file = FileConfig::default();
    let api_key = match (api_key, config_file) {
        (Some(key), _) => Some(key),
        (None, Some(path)) => {
            file = read_config_file(path)?;
            None
        }
        (None, None) => match (env_key, default_file.filter(|p| p.exists())) {
            (Some(key), _) => Some(key),
            (None, Some(path)) => {
                file = read_config_file(&path)?;
                None
            }
            (None, None) => None,
        },
    };

    let api_key = api_key
        .or(file.api_key)
        .ok_or_else(|| Error::new("No API key provided"))?;
    let url = env_url
        .or(file.url)
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    Ok(ClientConfig {
        url,
        api_key,
        verify: file.verify.unwrap_or(true),
        username: file.username,
    })
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;

    let value: Value = serde_yaml::from_str(&text).map_err(|e| {
        Error::with_source(
            format!("Configuration file ({}) is invalid YAML", path.display()),
            e,
        )
    })?;
    let Value::Mapping(map) = value else {
        return Err(Error::new(format!(
            "Configuration file ({}) is not a Hash",
            path.display()
        )));
    };

    let api_key = scalar(&map, "api_key").ok_or_else(|| {
        Error::new(format!(
            "API key missing from configuration file ({})",
            path.display()
        ))
    })?;

    Ok(FileConfig {
        api_key: Some(api_key),
        url: scalar(&map, "url"),
        verify: map.get("verify").and_then(Value::as_bool),
        username: scalar(&map, "username"),
    })
}

fn read_error(path: &Path, err: std::io::Error) -> Error {
    let reason = match err.kind() {
        ErrorKind::NotFound => "No such file or directory",
        ErrorKind::PermissionDenied => "Permission denied",
        _ => "Unable to read configuration file",
    };
    Error::with_source(format!("{} ({})", reason, path.display()), err)
}

fn scalar(map: &Mapping, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn default_config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".buzzdata"))
}
