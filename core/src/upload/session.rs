use crate::upload::media::{MediaKind, UploadedFile};

/// Where a user's upload stands between UI events.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState<R, E> {
    Idle,
    FilePresent(UploadedFile),
    Analyzing(UploadedFile),
    Result { file: UploadedFile, outcome: R },
    Error { file: UploadedFile, failure: E },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("no file has been selected")]
    NoFile,
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// Per-user upload/analyze flow.
///
/// `R` is the rendered analysis outcome and `E` the user-facing failure.
#[derive(Debug, Clone)]
pub struct AnalysisSession<R, E> {
    state: SessionState<R, E>,
}

impl<R, E> Default for AnalysisSession<R, E> {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }
}

impl<R, E> AnalysisSession<R, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState<R, E> {
        &self.state
    }

    pub fn state_name(&self) -> &'static str {
        match self.state {
            SessionState::Idle => "idle",
            SessionState::FilePresent(_) => "file present",
            SessionState::Analyzing(_) => "analyzing",
            SessionState::Result { .. } => "showing results",
            SessionState::Error { .. } => "showing an error",
        }
    }

    /// The file currently tied to the session, in any non-idle state.
    pub fn file(&self) -> Option<&UploadedFile> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::FilePresent(file) | SessionState::Analyzing(file) => Some(file),
            SessionState::Result { file, .. } | SessionState::Error { file, .. } => Some(file),
        }
    }

    /// Whether the selected file gets a preview; unsupported types don't.
    pub fn previewable(&self) -> bool {
        self.file()
            .map(|file| file.media_kind() != MediaKind::Unsupported)
            .unwrap_or(false)
    }

    /// Selecting a file replaces whatever the session held before.
    pub fn select(&mut self, file: UploadedFile) -> Result<(), SessionError> {
        if let SessionState::Analyzing(_) = self.state {
            return Err(self.invalid("select a file"));
        }
        self.state = SessionState::FilePresent(file);
        Ok(())
    }

    /// Moves to `Analyzing` and returns the file to analyse.
    pub fn begin_analysis(&mut self) -> Result<UploadedFile, SessionError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::FilePresent(file) => {
                self.state = SessionState::Analyzing(file.clone());
                Ok(file)
            }
            SessionState::Idle => Err(SessionError::NoFile),
            other => {
                self.state = other;
                Err(self.invalid("start analysis"))
            }
        }
    }

    pub fn finish(&mut self, outcome: Result<R, E>) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Analyzing(file) => {
                self.state = match outcome {
                    Ok(outcome) => SessionState::Result { file, outcome },
                    Err(failure) => SessionState::Error { file, failure },
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.invalid("finish analysis"))
            }
        }
    }

    /// Returns a finished session to `FilePresent` so the same file can be
    /// analysed again on the user's request.
    pub fn rearm(&mut self) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Result { file, .. } | SessionState::Error { file, .. } => {
                self.state = SessionState::FilePresent(file);
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.invalid("re-run analysis"))
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Session = AnalysisSession<usize, String>;

    fn png_upload() -> UploadedFile {
        UploadedFile::accept("road.png", Some("image/png"), vec![1, 2, 3]).unwrap()
    }

    #[test]
    fn happy_path_walks_every_state() {
        let mut session = Session::new();
        assert_eq!(session.state(), &SessionState::Idle);

        session.select(png_upload()).unwrap();
        assert!(matches!(session.state(), SessionState::FilePresent(_)));
        assert!(session.previewable());

        let file = session.begin_analysis().unwrap();
        assert_eq!(file.name, "road.png");
        assert!(matches!(session.state(), SessionState::Analyzing(_)));

        session.finish(Ok(3)).unwrap();
        assert!(matches!(session.state(), SessionState::Result { outcome: 3, .. }));

        session.reset();
        assert!(session.file().is_none());
    }

    #[test]
    fn failures_land_in_error_state() {
        let mut session = Session::new();
        session.select(png_upload()).unwrap();
        session.begin_analysis().unwrap();
        session.finish(Err("decode failed".into())).unwrap();
        match session.state() {
            SessionState::Error { failure, .. } => assert_eq!(failure, "decode failed"),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn illegal_transitions_are_rejected_without_changing_state() {
        let mut session = Session::new();
        assert_eq!(session.begin_analysis().unwrap_err(), SessionError::NoFile);
        assert!(session.finish(Ok(1)).is_err());
        assert_eq!(session.state(), &SessionState::Idle);

        session.select(png_upload()).unwrap();
        session.begin_analysis().unwrap();
        assert!(session.select(png_upload()).is_err());
        assert!(session.begin_analysis().is_err());
        assert!(matches!(session.state(), SessionState::Analyzing(_)));
    }

    #[test]
    fn finished_session_can_be_rearmed_with_the_same_file() {
        let mut session = Session::new();
        assert!(session.rearm().is_err());
        session.select(png_upload()).unwrap();
        session.begin_analysis().unwrap();
        session.finish(Ok(2)).unwrap();

        session.rearm().unwrap();
        assert!(matches!(session.state(), SessionState::FilePresent(f) if f.name == "road.png"));
        session.begin_analysis().unwrap();
    }

    #[test]
    fn unsupported_types_are_not_previewable() {
        let mut session = Session::new();
        let file = UploadedFile::accept("clip.mp4", Some("application/x-foo"), vec![]).unwrap();
        session.select(file).unwrap();
        assert!(!session.previewable());
    }
}
