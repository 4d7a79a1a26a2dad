use crate::parser::ParsingError;
use std::fmt;

/// Why a pipeline could not be launched.
#[derive(Debug)]
pub enum LaunchError {
    /// The line does not describe a runnable pipeline; nothing was allocated or spawned.
    Parse(ParsingError),
    /// `pipe` failed; nothing was spawned.
    Channel(nix::Error),
    /// `fork` failed for `stage`; earlier stages were reaped before this is returned.
    Fork { stage: usize, source: nix::Error },
}

impl LaunchError {
    /// Whether the interpreter has to stop: it is out of descriptors or processes.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LaunchError::Parse(_))
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::Parse(e) => write!(f, "{}", e),
            LaunchError::Channel(e) => write!(f, "pipe failed: {}", e),
            LaunchError::Fork { stage, source } => {
                write!(f, "fork failed for stage {}: {}", stage, source)
            }
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::Parse(e) => Some(e),
            LaunchError::Channel(e) => Some(e),
            LaunchError::Fork { source, .. } => Some(source),
        }
    }
}

impl From<ParsingError> for LaunchError {
    fn from(e: ParsingError) -> Self {
        LaunchError::Parse(e)
    }
}
