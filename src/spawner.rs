//! Forks one process per pipeline stage and wires it to its neighbours.
//!
//! A stage process walks through a fixed sequence: restore the default signal dispositions,
//! move its channel endpoints onto stdin/stdout, close every channel descriptor it still
//! holds, then either run a builtin and exit or `execvp` the command. It never returns to the
//! caller.

use crate::channel::Channels;
use crate::command::{BuiltinTable, ExitCode};
use crate::env::Environment;
use crate::errors::LaunchError;
use crate::parser::{ParsingError, Pipeline, Stage};
use crate::reaper::{self, StageStatus, syscall};
use crate::signals::restore_default_dispositions;
use nix::errno::Errno;
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::unistd::{ForkResult, Pid, dup2, execvp, fork};
use std::ffi::CString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::mem::ManuallyDrop;
use std::os::fd::{FromRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::process;

/// Status of a stage whose command could not be found.
pub const NOT_FOUND: ExitCode = 127;
/// Status of a stage whose command was found but could not be executed.
pub const NOT_EXECUTABLE: ExitCode = 126;

/// A stage with its argument vector already converted for `execvp`.
///
/// The conversion happens before anything is forked so the stage process has nothing left
/// that can fail before `exec`. `name` and `args` are the lossy UTF-8 view used for builtin
/// dispatch and messages; `argv` keeps the original bytes.
#[derive(Debug)]
pub struct PreparedStage {
    name: String,
    args: Vec<String>,
    argv: Vec<CString>,
}

impl PreparedStage {
    pub fn new(stage: &Stage) -> Result<Self, ParsingError> {
        let argv = stage
            .argv()
            .iter()
            .map(|word| {
                CString::new(word.as_bytes()).map_err(|_| ParsingError::NulByte {
                    word: word.to_string_lossy().into_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: stage.name().to_string_lossy().into_owned(),
            args: stage
                .args()
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
            argv,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Launches pipelines against a fixed builtin table.
pub struct Spawner<'a> {
    builtins: &'a BuiltinTable,
    env: &'a Environment,
}

impl<'a> Spawner<'a> {
    pub fn new(builtins: &'a BuiltinTable, env: &'a Environment) -> Self {
        Self { builtins, env }
    }

    /// Runs `pipeline` to completion and returns the status of every stage, in stage order.
    ///
    /// Nothing is allocated or spawned when a stage cannot be prepared. When `fork` fails
    /// midway, the stages already running are reaped before the error is returned.
    pub fn launch(&self, pipeline: &Pipeline) -> Result<Vec<StageStatus>, LaunchError> {
        let stages = pipeline
            .stages()
            .iter()
            .map(PreparedStage::new)
            .collect::<Result<Vec<_>, _>>()?;
        if stages.is_empty() {
            return Ok(Vec::new());
        }

        // Anything still buffered would be written again by every forked stage.
        let _ = std::io::stdout().flush();

        let mut channels = Channels::allocate(stages.len()).map_err(LaunchError::Channel)?;
        let mut pids: Vec<Pid> = Vec::with_capacity(stages.len());

        for (index, stage) in stages.iter().enumerate() {
            // SAFETY: the child only touches its own copies of `channels`, `stage` and the
            // environment before it execs or exits.
            match unsafe { fork() } {
                Ok(ForkResult::Parent { child }) => {
                    tracing::debug!(stage = index, command = stage.name(), pid = %child, "stage spawned");
                    pids.push(child);
                    channels.release_spawned(index);
                }
                Ok(ForkResult::Child) => self.run_stage(index, stage, &mut channels),
                Err(source) => {
                    channels.close_all();
                    reaper::reap(&pids);
                    return Err(LaunchError::Fork {
                        stage: index,
                        source,
                    });
                }
            }
        }

        channels.close_all();
        debug_assert_eq!(channels.open_endpoints(), 0);
        Ok(reaper::reap(&pids))
    }

    /// Body of the stage process.
    fn run_stage(&self, index: usize, stage: &PreparedStage, channels: &mut Channels) -> ! {
        if let Err(e) = restore_default_dispositions() {
            die(stage.name(), "cannot reset signal handlers", e);
        }

        if let Some(fd) = channels.stdin_for(index) {
            if let Err(e) = syscall(|| dup2(fd, STDIN_FILENO)) {
                die(stage.name(), "cannot redirect stdin", e);
            }
        }
        if let Some(fd) = channels.stdout_for(index) {
            if let Err(e) = syscall(|| dup2(fd, STDOUT_FILENO)) {
                die(stage.name(), "cannot redirect stdout", e);
            }
        }

        // The dup2 copies above keep the stream alive; every original endpoint has to go or a
        // reader downstream never sees end of stream.
        channels.close_all();

        if let Some(factory) = self.builtins.lookup(stage.name()) {
            let args: Vec<&str> = stage.args.iter().map(String::as_str).collect();
            let cmd = factory.create(&args);
            let mut env = self.env.clone();

            let mut stdin = raw_stream(STDIN_FILENO);
            let out = raw_stream(STDOUT_FILENO);
            let mut stdout = BufWriter::new(&*out);
            let code = match cmd.execute(&mut *stdin, &mut stdout, &mut env) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("{}: {:#}", stage.name(), e);
                    1
                }
            };
            let code = match stdout.flush() {
                Ok(()) => code,
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => code,
                Err(e) => {
                    eprintln!("{}: {}", stage.name(), e);
                    1
                }
            };
            process::exit(code);
        }

        let Err(errno) = execvp(&stage.argv[0], &stage.argv);
        let (reason, code) = match errno {
            Errno::ENOENT => ("command not found".to_string(), NOT_FOUND),
            other => (other.desc().to_string(), NOT_EXECUTABLE),
        };
        eprintln!("ccsh: {}: {}", stage.name(), reason);
        process::exit(code)
    }
}

fn die(name: &str, what: &str, e: nix::Error) -> ! {
    eprintln!("ccsh: {}: {}: {}", name, what, e);
    process::exit(1)
}

/// Borrows a standard descriptor as a `File` without taking ownership of it.
fn raw_stream(fd: RawFd) -> ManuallyDrop<File> {
    // SAFETY: the descriptor stays open for the life of the stage process and the `File`
    // is never dropped, so it is never closed twice.
    ManuallyDrop::new(unsafe { File::from_raw_fd(fd) })
}
