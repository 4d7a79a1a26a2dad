//! Where the interpreter's lines come from.
//!
//! On a terminal lines go through the line editor. Anything else (a pipe, a file) is read as
//! raw bytes up to each newline, so a line that is not valid UTF-8 reaches the lexer unchanged.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, ErrorKind, IsTerminal, Write};

/// Result of one read.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line without its terminating newline.
    Line(Vec<u8>),
    /// A line the editor could not decode; it has been consumed and is skipped.
    Rejected(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    Eof,
}

pub enum LineReader {
    Editor(DefaultEditor),
    Raw(Box<dyn BufRead>),
}

impl LineReader {
    /// The editor when stdin is a terminal, the raw reader otherwise.
    pub fn for_stdin() -> anyhow::Result<Self> {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            Ok(LineReader::Editor(DefaultEditor::new()?))
        } else {
            Ok(LineReader::raw(stdin.lock()))
        }
    }

    pub fn raw(input: impl BufRead + 'static) -> Self {
        LineReader::Raw(Box::new(input))
    }

    /// Shows `prompt` and reads the next line.
    pub fn read_line(&mut self, prompt: &str) -> anyhow::Result<ReadOutcome> {
        match self {
            LineReader::Editor(rl) => match rl.readline(prompt) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    Ok(ReadOutcome::Line(line.into_bytes()))
                }
                Err(ReadlineError::Io(e)) if e.kind() == ErrorKind::InvalidData => {
                    Ok(ReadOutcome::Rejected(e.to_string()))
                }
                Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
                Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
                Err(err) => Err(err.into()),
            },
            LineReader::Raw(input) => {
                if !prompt.is_empty() {
                    let mut out = io::stdout().lock();
                    out.write_all(prompt.as_bytes())?;
                    out.flush()?;
                }
                read_raw_line(input.as_mut())
            }
        }
    }
}

fn read_raw_line(input: &mut dyn BufRead) -> anyhow::Result<ReadOutcome> {
    let mut line = Vec::new();
    if input.read_until(b'\n', &mut line)? == 0 {
        return Ok(ReadOutcome::Eof);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    Ok(ReadOutcome::Line(line))
}
