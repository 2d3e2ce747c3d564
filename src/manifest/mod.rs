//! Manifest reading for mod metadata files.
//!
//! Manifests are JSON with comments and trailing commas allowed. Only a few
//! top-level fields are interpreted; everything else passes through untouched.

pub mod mask;
pub mod patch;

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Result, TransarcError};

pub use mask::mask_comments;
pub use patch::{apply_translation, contains_cjk, patch_field, ManifestField};

/// `Nexus:<digits>` inside an update key, case-insensitive.
static NEXUS_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)nexus:(\d+)").expect("nexus pattern is valid")
});

/// The interpreted subset of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub name: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Trimmed; `None` when absent or blank.
    pub unique_id: Option<String>,
    pub update_keys: Vec<String>,
}

impl Manifest {
    /// Parse raw manifest text.
    pub fn parse(text: &str) -> Result<Self> {
        let masked = mask_comments(text);
        let value: Value = serde_json::from_str(&masked)?;
        let Value::Object(map) = value else {
            return Err(TransarcError::Other(
                "manifest root is not a JSON object".into(),
            ));
        };

        let update_keys = match field(&map, "UpdateKeys") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            name: string_field(&map, "Name"),
            author: string_field(&map, "Author"),
            version: version_field(&map),
            description: string_field(&map, "Description"),
            unique_id: string_field(&map, "UniqueID")
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            update_keys,
        })
    }

    /// Parse and attach the file path to any failure.
    pub fn parse_file(text: &str, path: &str) -> Result<Self> {
        Self::parse(text).map_err(|e| TransarcError::Parse {
            path: path.to_string(),
            detail: e.to_string(),
        })
    }

    /// The UniqueID, or a `MissingUniqueId` error naming `path`.
    pub fn require_unique_id(&self, path: &str) -> Result<&str> {
        self.unique_id
            .as_deref()
            .ok_or_else(|| TransarcError::MissingUniqueId {
                path: path.to_string(),
            })
    }

    /// First marketplace id found in the update keys.
    #[must_use]
    pub fn nexus_id(&self) -> Option<String> {
        self.update_keys
            .iter()
            .find_map(|key| NEXUS_KEY.captures(key))
            .map(|caps| caps[1].to_string())
    }
}

/// Case-insensitive top-level lookup; an exact match wins.
fn field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    field(map, key).and_then(Value::as_str).map(str::to_string)
}

/// Versions are usually strings but old manifests use `{MajorVersion, ...}`.
fn version_field(map: &Map<String, Value>) -> Option<String> {
    match field(map, "Version")? {
        Value::String(s) => Some(s.clone()),
        Value::Object(parts) => {
            let num = |k: &str| field(parts, k).and_then(Value::as_u64).unwrap_or(0);
            Some(format!(
                "{}.{}.{}",
                num("MajorVersion"),
                num("MinorVersion"),
                num("PatchVersion")
            ))
        }
        _ => None,
    }
}
