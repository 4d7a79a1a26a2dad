use crate::command::{
    BuiltinKind, BuiltinTable, CommandFactory, ExecutableCommand, ExitCode,
};
use crate::env::Environment;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use nix::unistd::execvp;
use std::env;
use std::ffi::CString;
use std::fs;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed without `exec`.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "ls" or "cd".
    fn name() -> &'static str;

    /// Where the command has to run, see [`BuiltinKind`].
    fn kind() -> BuiltinKind;

    /// How many leading arguments are parsed; the rest are ignored.
    const MAX_ARGS: usize = 0;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdin, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                eprintln!("{}: {:#}", T::name(), e);
                Ok(1)
            }
        }
    }
}

/// What `argh` produced instead of a command: help text or a usage error.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl InvalidArgs {
    /// `argh` output already ends in a newline; print it with exactly one.
    fn text(&self) -> &str {
        self.output.trim_end_matches('\n')
    }
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            eprintln!("{}", self.text());
            Ok(1)
        } else {
            writeln!(stdout, "{}", self.text())?;
            Ok(0)
        }
    }
}

/// Factory for a single builtin type.
pub(crate) struct Factory<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn kind(&self) -> BuiltinKind {
        T::kind()
    }

    /// Binds `args` to a fresh `T`.
    ///
    /// Words past `T::MAX_ARGS` are dropped and the kept ones follow `--`, so `ls -la` or
    /// `cd -x` never trip over an unknown flag. A lone leading `--help` still reaches `argh`.
    fn create(&self, args: &[&str]) -> Box<dyn ExecutableCommand> {
        let argv: Vec<&str> = match args {
            ["--help", ..] => vec!["--help"],
            _ => std::iter::once("--")
                .chain(args.iter().take(T::MAX_ARGS).copied())
                .collect(),
        };
        match T::from_args(&[T::name()], &argv) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        }
    }
}

pub(crate) fn default_table() -> BuiltinTable {
    BuiltinTable::new(vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Ls>::default()),
        Box::new(Factory::<Pwd>::default()),
        Box::new(Factory::<History>::default()),
    ])
}

#[derive(FromArgs)]
/// Print the current working directory to standard output. Arguments are ignored.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn kind() -> BuiltinKind {
        BuiltinKind::StreamOnly
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let cwd = env::current_dir().context("cannot determine current directory")?;
        stdout.write_all(cwd.as_os_str().as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
/// Always succeeds; a directory that cannot be entered leaves the current one in place.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn kind() -> BuiltinKind {
        BuiltinKind::InterpreterState
    }

    const MAX_ARGS: usize = 1;

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if let Err(e) = self.change_dir(env) {
            tracing::debug!("cd: {:#}", e);
        }
        Ok(0)
    }
}

impl Cd {
    fn change_dir(&self, env: &Environment) -> Result<()> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => return Err(anyhow::anyhow!("no target and HOME not set")),
            },
        };

        let canonical = fs::canonicalize(&target)
            .with_context(|| format!("can't canonicalize {}", target.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("can't chdir to {}", canonical.display()))?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// List the entries of the current directory on one line. Arguments are ignored.
pub struct Ls {}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn kind() -> BuiltinKind {
        BuiltinKind::StreamOnly
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let cwd = env::current_dir().context("cannot determine current directory")?;
        let mut names = fs::read_dir(&cwd)
            .with_context(|| format!("cannot read {}", cwd.display()))?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("cannot read {}", cwd.display()))?;
        names.sort();

        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                stdout.write_all(b" ")?;
            }
            stdout.write_all(name.as_bytes())?;
        }
        stdout.write_all(b"\n")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print every line entered so far. Arguments are ignored.
pub struct History {}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn kind() -> BuiltinKind {
        BuiltinKind::Delegating
    }

    /// Replaces the current process with `cat <history file>`; returns only on failure.
    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        stdout.flush()?;
        let program = c"cat";
        let path = CString::new(env.history_file.as_os_str().as_bytes())
            .context("history file path contains a NUL byte")?;
        let Err(errno) = execvp(program, &[program, path.as_c_str()]);
        Err(anyhow::Error::new(errno).context("cannot run cat"))
    }
}
