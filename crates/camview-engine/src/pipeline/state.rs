use std::fmt;

/// Lifecycle of a [`super::PreviewPipeline`].
///
/// ```text
/// Created --create--> Running --pause--> Paused --resume--> Running
/// any --dispose--> Disposed (terminal)
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PipelineState {
    Created,
    Running,
    Paused,
    Disposed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Disposed => "disposed",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Disposed
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
