//! A tiny interactive shell that runs `|`-separated command chains as real processes.
//!
//! Each input line is split into stages, stages are connected with kernel pipes and every
//! stage runs in its own forked process. A handful of builtins (`cd`, `ls`, `pwd`,
//! `history`) are executed without `exec`, either inside the forked stage or, for commands
//! that must change the interpreter itself, directly in the interpreter process.
//!
//! The main entry point is [`Interpreter`], which owns the builtin table, the history log
//! and the interrupt flag and runs the read-eval loop. The engine pieces ([`parser`],
//! [`channel`], [`spawner`], [`reaper`]) are public so they can be driven without a REPL.

mod builtin;
pub mod channel;
pub mod command;
pub mod env;
pub mod errors;
pub mod history;
mod input;
mod interpreter;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod reaper;
pub mod signals;
pub mod spawner;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::{DEFAULT_HISTORY_FILE, DEFAULT_PROMPT, Interpreter, LineOutcome};
