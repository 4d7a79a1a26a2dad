use crate::lexer::{self, Token};
use std::ffi::{OsStr, OsString};
use std::fmt;

/// One command of a pipeline: the command name followed by its arguments.
///
/// A stage built by [`construct_pipeline`] always has at least one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    tokens: Vec<OsString>,
}

impl Stage {
    /// Builds a stage from already split tokens.
    ///
    /// Returns `None` for an empty token list, which can never be executed.
    pub fn new(tokens: Vec<OsString>) -> Option<Self> {
        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    /// The command name, `argv[0]`.
    pub fn name(&self) -> &OsStr {
        &self.tokens[0]
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[OsString] {
        &self.tokens[1..]
    }

    /// The whole argument vector, command name included.
    pub fn argv(&self) -> &[OsString] {
        &self.tokens
    }
}

/// An ordered chain of stages; stdout of stage `i` feeds stdin of stage `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True for a line that held nothing but spaces.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// True when the whole line is the single word `exit`.
    pub fn is_exit(&self) -> bool {
        match self.stages.as_slice() {
            [stage] => stage.argv() == ["exit"],
            _ => false,
        }
    }
}

/// Errors that can occur while turning a line into a [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// A `|` with no command on one of its sides, e.g. `| wc`, `ls || wc` or `ls |`.
    ///
    /// A trailing `|` is rejected too rather than silently dropped.
    EmptyStage { index: usize },
    /// A word containing a NUL byte, which cannot be passed to `execvp`.
    NulByte { word: String },
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::EmptyStage { .. } => {
                write!(f, "syntax error near unexpected token '|'")
            }
            ParsingError::NulByte { word } => {
                write!(f, "argument contains a NUL byte: {:?}", word)
            }
        }
    }
}

impl std::error::Error for ParsingError {}

struct PipelineBuilder {
    stages: Vec<Stage>,
    current: Vec<OsString>,
    saw_pipe: bool,
}

impl PipelineBuilder {
    fn new() -> Self {
        Self {
            stages: Vec::new(),
            current: Vec::new(),
            saw_pipe: false,
        }
    }

    fn build(mut self, tokens: Vec<Token>) -> Result<Pipeline, ParsingError> {
        for token in tokens {
            match token {
                Token::Word(word) => self.current.push(word),
                Token::PipeOp => {
                    self.saw_pipe = true;
                    self.close_stage()?;
                }
            }
        }

        // A line without any `|` and without words is just empty input.
        if self.saw_pipe || !self.current.is_empty() {
            self.close_stage()?;
        }

        Ok(Pipeline {
            stages: self.stages,
        })
    }

    fn close_stage(&mut self) -> Result<(), ParsingError> {
        let index = self.stages.len();
        let stage = Stage::new(std::mem::take(&mut self.current))
            .ok_or(ParsingError::EmptyStage { index })?;
        self.stages.push(stage);
        Ok(())
    }
}

/// Builds a pipeline out of the lexer output.
pub fn construct_pipeline(tokens: Vec<Token>) -> Result<Pipeline, ParsingError> {
    PipelineBuilder::new().build(tokens)
}

/// Lexes and parses one raw input line.
pub fn parse_line(line: impl AsRef<[u8]>) -> Result<Pipeline, ParsingError> {
    construct_pipeline(lexer::split_into_tokens(line))
}
