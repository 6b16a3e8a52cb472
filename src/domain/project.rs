use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::null_as_default;
use super::user::UserId;

pub type ProjectId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub website_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extra_data: BTreeMap<String, String>,
    #[serde(default)]
    pub created_by_user_id: Option<UserId>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assets_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Website URL without its `http://` or `https://` scheme.
    pub fn domain(&self) -> &str {
        self.website_url
            .strip_prefix("https://")
            .or_else(|| self.website_url.strip_prefix("http://"))
            .unwrap_or(&self.website_url)
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// Payload for `POST /projects`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub website_url: String,
}

/// Payload for `PATCH /projects/:id`. Absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_user_email: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.website_url.is_none()
            && self.extra_data.is_none()
            && self.add_user_email.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraField {
    pub key: String,
    pub value: String,
}

impl ExtraField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Trims, collapses whitespace runs to `_` and upper-cases: `" cdn  region"` -> `"CDN_REGION"`.
pub fn normalize_extra_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// Builds the submitted `extra_data` map. Entries whose key normalizes to an
/// empty string are dropped; colliding keys keep the last value.
pub fn build_extra_data(fields: &[ExtraField]) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    for field in fields {
        let key = normalize_extra_key(&field.key);
        if !key.is_empty() {
            data.insert(key, field.value.trim().to_string());
        }
    }
    data
}
