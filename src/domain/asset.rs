use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::MediaKind;
use super::null_as_default;
use super::project::{Project, ProjectId};
use super::user::UserId;

pub type AssetId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub id: AssetId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub uploaded_by_user_id: Option<UserId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_id: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub folder: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bytes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub format: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_filename: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Parent project, present on the cross-project `/users/assets` listing.
    #[serde(default)]
    pub project: Option<Project>,
}

impl Asset {
    pub fn is_video(&self) -> bool {
        self.resource_type == "video" || MediaKind::from_name(&self.url) == MediaKind::Video
    }

    /// Original filename without its extension, first letter capitalised.
    pub fn display_name(&self) -> String {
        let filename = self.original_filename.as_str();
        let base = match filename.rfind('.') {
            Some(dot) if dot > 0 => &filename[..dot],
            _ => filename,
        };
        let mut chars = base.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Asset".to_string(),
        }
    }

    pub fn size_label(&self) -> String {
        format_bytes(self.bytes)
    }

    /// `"W × H"` when both dimensions are known, else the duration, else `"Asset"`.
    pub fn detail_label(&self) -> String {
        match (self.width, self.height, self.duration) {
            (Some(w), Some(h), _) if w > 0 && h > 0 => format!("{} × {}", w, h),
            (_, _, Some(duration)) if duration > 0.0 => format!("{}", duration),
            _ => "Asset".to_string(),
        }
    }

    pub fn format_label(&self) -> String {
        if self.format.is_empty() {
            "FILE".to_string()
        } else {
            self.format.to_uppercase()
        }
    }

    /// URL to show in a grid. Videos use their server-issued thumbnail; images
    /// are shown directly.
    pub fn preview_url(&self) -> &str {
        match &self.thumbnail_url {
            Some(thumbnail) if self.is_video() => thumbnail,
            _ => &self.url,
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000 {
        format!("{:.1} MB", bytes as f64 / 1_000_000.0)
    } else {
        format!("{:.0} KB", (bytes as f64 / 1_000.0).max(0.1))
    }
}

/// Per-project counters, classified by URL extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub total: usize,
    pub images: usize,
    pub videos: usize,
}

impl AssetStats {
    pub fn from_assets(assets: &[Asset]) -> Self {
        assets.iter().fold(
            Self {
                total: assets.len(),
                ..Default::default()
            },
            |mut stats, asset| {
                match MediaKind::from_name(&asset.url) {
                    MediaKind::Image => stats.images += 1,
                    MediaKind::Video => stats.videos += 1,
                    MediaKind::Unsupported => {}
                }
                stats
            },
        )
    }
}
