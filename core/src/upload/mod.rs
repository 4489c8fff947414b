//! Upload handling: accepted file types, the per-user analysis flow and the
//! scoped temporary file used for video analysis.

pub mod media;
pub mod session;
pub mod temp;

pub use media::{MediaKind, UploadedFile, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
pub use session::{AnalysisSession, SessionError, SessionState};
pub use temp::TempVideoFile;

#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("no file was uploaded")]
    NoFile,
    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
