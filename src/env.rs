use std::env as stdenv;
use std::path::PathBuf;

/// Interpreter-wide state that builtins are allowed to look at or change.
///
/// The working directory itself is process state; `Environment` only carries what the
/// process does not already track.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Absolute location of the history log, fixed at startup.
    pub history_file: PathBuf,
    /// When set to true, the read-eval loop stops after the current line.
    pub should_exit: bool,
}

impl Environment {
    /// Creates an environment whose history log lives at `history_file`.
    ///
    /// A relative path is anchored at the current working directory so that a later `cd`
    /// does not move the log.
    pub fn new(history_file: impl Into<PathBuf>) -> Self {
        let history_file = history_file.into();
        let history_file = if history_file.is_absolute() {
            history_file
        } else {
            stdenv::current_dir()
                .map(|cwd| cwd.join(&history_file))
                .unwrap_or(history_file)
        };
        Self {
            history_file,
            should_exit: false,
        }
    }

    /// Value of a variable of the interpreter process.
    pub fn get_var(&self, key: &str) -> Option<String> {
        stdenv::var(key).ok()
    }
}
