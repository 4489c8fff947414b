use crate::upload::UploadError;
use std::path::Path;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// How an upload is analysed, decided by its MIME type prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Unsupported,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Self {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.starts_with("image/") {
            MediaKind::Image
        } else if content_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Unsupported
        }
    }
}

/// Lower-cased extension of `name`, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_allowed_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext) || VIDEO_EXTENSIONS.contains(&ext)
}

/// MIME type browsers typically send for an allowed extension.
pub fn content_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "bmp" => Some("image/bmp"),
        "mp4" => Some("video/mp4"),
        "avi" => Some("video/x-msvideo"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}

/// A single file received from the uploader.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Accepts an upload whose extension is on the allow list.
    ///
    /// A missing or empty content type is inferred from the extension.
    pub fn accept(
        name: impl Into<String>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadError> {
        let name = name.into();
        let ext = extension_of(&name)
            .filter(|ext| is_allowed_extension(ext))
            .ok_or_else(|| UploadError::UnsupportedType(name.clone()))?;
        let content_type = match content_type.map(str::trim) {
            Some(value) if !value.is_empty() && value != "application/octet-stream" => {
                value.to_string()
            }
            _ => content_type_for_extension(&ext)
                .unwrap_or("application/octet-stream")
                .to_string(),
        };
        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }

    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_content_type(&self.content_type)
    }

    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / (1024.0 * 1024.0)
    }

    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}
