use serde_json::Value;

use crate::error::{Error, Result};

pub(crate) fn guess_filename_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().and_then(|s| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    })
}

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Flattens a JSON object into Rails-style form pairs:
/// `{"dataset": {"name": "x", "topics": ["a"]}}` becomes
/// `dataset[name]=x`, `dataset[topics][]=a`. Nulls are dropped; `null`
/// itself means no parameters. Anything else is rejected.
pub(crate) fn flatten_params(value: &Value) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(k, v, &mut out);
            }
        }
        _ => return Err(Error::new("request parameters must be a map")),
    }
    Ok(out)
}

fn flatten_into(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((key.to_string(), b.to_string())),
        Value::Number(n) => out.push((key.to_string(), n.to_string())),
        Value::String(s) => out.push((key.to_string(), s.clone())),
        Value::Array(items) => {
            let key = format!("{}[]", key);
            for item in items {
                flatten_into(&key, item, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(&format!("{}[{}]", key, k), v, out);
            }
        }
    }
}
