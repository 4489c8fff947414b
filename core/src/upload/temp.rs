use crate::upload::UploadError;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// Uploaded video bytes written to a uniquely named file for analysis.
///
/// The file is removed when this value is dropped, so every exit path of the
/// analysis (success, error, unwind) cleans it up.
#[derive(Debug)]
pub struct TempVideoFile {
    file: NamedTempFile,
}

impl TempVideoFile {
    /// Writes `bytes` into `dir`, creating the directory if needed.
    pub fn create(dir: &Path, extension: &str, bytes: &[u8]) -> Result<Self, UploadError> {
        fs::create_dir_all(dir)?;
        let suffix = format!(".{extension}");
        let mut file = Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        log::debug!("wrote temp video {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Deletes the file now, surfacing any I/O error.
    pub fn close(self) -> Result<(), UploadError> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        log::debug!("removed temp video {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn file_exists_while_held_and_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");
        let path = {
            let temp = TempVideoFile::create(&target, "mp4", b"frames").unwrap();
            assert!(temp.path().exists());
            assert_eq!(fs::read(temp.path()).unwrap(), b"frames");
            assert!(temp.path().to_string_lossy().ends_with(".mp4"));
            temp.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn close_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempVideoFile::create(dir.path(), "avi", b"x").unwrap();
        let path = temp.path().to_path_buf();
        temp.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn file_is_removed_when_analysis_panics() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_path_buf();
        let outcome = panic::catch_unwind(move || {
            let temp = TempVideoFile::create(&dir_path, "mov", b"x").unwrap();
            assert!(temp.path().exists());
            panic!("analysis blew up");
        });
        assert!(outcome.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
