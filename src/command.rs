use crate::env::Environment;
use anyhow::Result;
use std::collections::HashMap;
use std::io::{Read, Write};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Where a builtin must run for its effect to be observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Changes interpreter state (e.g. the working directory). When it is the whole pipeline
    /// it runs in the interpreter process instead of a forked stage.
    InterpreterState,
    /// Only reads and writes its standard streams; always runs inside its stage.
    StreamOnly,
    /// Replaces the stage image with another program.
    Delegating,
}

/// Object-safe trait for an argument-bound builtin ready to run.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// `stdout` is the stage's standard output when running in a stage and the
    /// interpreter's when running in the interpreter.
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Factory that binds a builtin to its arguments.
pub trait CommandFactory {
    /// Name the builtin answers to.
    fn name(&self) -> &'static str;

    fn kind(&self) -> BuiltinKind;

    /// Create a command instance for the provided arguments (not including the name).
    fn create(&self, args: &[&str]) -> Box<dyn ExecutableCommand>;
}

/// Immutable mapping from command name to builtin factory.
///
/// Built once at startup and handed out by reference; lookups never mutate it.
pub struct BuiltinTable {
    entries: HashMap<&'static str, Box<dyn CommandFactory>>,
}

impl BuiltinTable {
    /// Create a table from a set of factories. A later factory with the same name wins.
    pub fn new(factories: Vec<Box<dyn CommandFactory>>) -> Self {
        let entries = factories.into_iter().map(|f| (f.name(), f)).collect();
        Self { entries }
    }

    /// A table without builtins: every command goes to `execvp`.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn CommandFactory> {
        self.entries.get(name).map(|f| f.as_ref())
    }
}

impl Default for BuiltinTable {
    /// The shell's builtins: `cd`, `ls`, `pwd` and `history`.
    fn default() -> Self {
        crate::builtin::default_table()
    }
}
