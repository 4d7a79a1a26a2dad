use crate::command::{BuiltinKind, BuiltinTable};
use crate::env::Environment;
use crate::errors::LaunchError;
use crate::history::HistoryLog;
use crate::input::{LineReader, ReadOutcome};
use crate::parser::{self, Pipeline};
use crate::reaper::StageStatus;
use crate::signals::InterruptFlag;
use crate::spawner::Spawner;
use std::io::Write;

/// Prompt printed before every read unless configured otherwise.
pub const DEFAULT_PROMPT: &str = "ccsh > ";

/// Default location of the history log, relative to the starting directory.
pub const DEFAULT_HISTORY_FILE: &str = ".ccsh_history";

/// What the read-eval loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Exit,
}

/// An interactive shell that runs each line as a pipeline of processes.
///
/// The interpreter owns the builtin table, the history log and the interrupt flag. Pipelines
/// are launched through [`Spawner`]; builtins that have to change the interpreter itself run
/// here without forking.
///
/// Example
/// ```no_run
/// use ccsh::{Interpreter, LineOutcome};
/// let mut sh = Interpreter::default();
/// assert_eq!(sh.execute_line("echo hello | wc -c").unwrap(), LineOutcome::Continue);
/// ```
pub struct Interpreter {
    env: Environment,
    builtins: BuiltinTable,
    history: HistoryLog,
    prompt: String,
    interrupts: InterruptFlag,
}

impl Interpreter {
    /// Create a new interpreter with a custom builtin table.
    pub fn new(builtins: BuiltinTable, env: Environment) -> Self {
        let history = HistoryLog::new(env.history_file.clone());
        tracing::debug!(path = %history.path().display(), "history log");
        Self {
            env,
            builtins,
            history,
            prompt: DEFAULT_PROMPT.to_string(),
            interrupts: InterruptFlag::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Records `line` in the history log, then parses and runs it.
    ///
    /// `line` is taken as raw bytes. Errors are returned only for lines that could not be
    /// launched; a command that fails inside its stage is not an error here.
    pub fn execute_line(&mut self, line: impl AsRef<[u8]>) -> Result<LineOutcome, LaunchError> {
        let line = line.as_ref();
        if let Err(e) = self.history.append(line) {
            tracing::warn!("{:#}", e);
        }

        let pipeline = parser::parse_line(line)?;
        tracing::debug!(stages = pipeline.len(), "line parsed");

        if pipeline.is_exit() {
            self.env.should_exit = true;
            return Ok(LineOutcome::Exit);
        }
        if !pipeline.is_empty() {
            self.run_pipeline(&pipeline)?;
        }
        Ok(LineOutcome::Continue)
    }

    /// Runs an already parsed pipeline and returns the status of each stage.
    pub fn run_pipeline(&mut self, pipeline: &Pipeline) -> Result<Vec<StageStatus>, LaunchError> {
        if let [stage] = pipeline.stages() {
            let factory = stage.name().to_str().and_then(|name| self.builtins.lookup(name));
            if let Some(factory) = factory {
                if factory.kind() == BuiltinKind::InterpreterState {
                    let args: Vec<String> = stage
                        .args()
                        .iter()
                        .map(|arg| arg.to_string_lossy().into_owned())
                        .collect();
                    let args: Vec<&str> = args.iter().map(String::as_str).collect();
                    let cmd = factory.create(&args);
                    let code = cmd
                        .execute(&mut std::io::stdin(), &mut std::io::stdout(), &mut self.env)
                        .unwrap_or_else(|e| {
                            eprintln!("{}: {:#}", factory.name(), e);
                            1
                        });
                    let _ = std::io::stdout().flush();
                    return Ok(vec![StageStatus::Exited(code)]);
                }
            }
        }

        Spawner::new(&self.builtins, &self.env).launch(pipeline)
    }

    /// The read-eval loop: prompt, read, record, run, until `exit` or end of input.
    ///
    /// Returns an error only when the line editor fails or a pipeline could not be launched
    /// for lack of descriptors or processes. A line that cannot be decoded is reported and
    /// skipped.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        self.interrupts = InterruptFlag::install()?;
        let mut reader = LineReader::for_stdin()?;

        while !self.env.should_exit {
            match reader.read_line(&self.prompt)? {
                ReadOutcome::Line(line) => {
                    self.report_interrupt();
                    match self.execute_line(&line) {
                        Ok(_) => {}
                        Err(e) if e.is_fatal() => {
                            tracing::error!(error = %e, "cannot launch pipeline");
                            return Err(e.into());
                        }
                        Err(e) => eprintln!("ccsh: {}", e),
                    }
                    self.report_interrupt();
                }
                ReadOutcome::Rejected(reason) => eprintln!("ccsh: {}", reason),
                ReadOutcome::Interrupted => {
                    // The editor already echoed ^C; just prompt again.
                    self.interrupts.take();
                }
                ReadOutcome::Eof => break,
            }
        }

        Ok(())
    }

    fn report_interrupt(&self) {
        if self.interrupts.take() {
            println!();
        }
    }
}

impl Default for Interpreter {
    /// An interpreter with the builtins `cd`, `ls`, `pwd`, `history` and the history log in
    /// `.ccsh_history` of the current directory.
    fn default() -> Self {
        Self::new(
            BuiltinTable::default(),
            Environment::new(DEFAULT_HISTORY_FILE),
        )
    }
}
