use serde::{Deserialize, Serialize};
use std::path::Path;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg", "bmp", "tiff"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi", "mpeg", "mpg"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Unsupported,
}

impl MediaKind {
    /// Classifies a file name or URL by the text after its last `.`.
    pub fn from_name(name: &str) -> Self {
        let ext = extension(name);
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Unsupported
        }
    }

    pub fn is_supported(self) -> bool {
        self != MediaKind::Unsupported
    }
}

/// Lower-cased extension, or the whole input when it has no dot.
pub fn extension(name: &str) -> String {
    name.rsplit('.').next().unwrap_or_default().to_lowercase()
}

/// A user-selected file, read fully into memory before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_name(&self.name)
    }
}
