//! Lexical analysis of a single input line.
//!
//! The language has exactly two delimiters: the space character, which separates words, and
//! `|`, which separates pipeline stages. There is no quoting and no escaping, so a word can
//! never contain either delimiter. The scanner works on raw bytes; a word is whatever the
//! terminal or pipe delivered, valid UTF-8 or not.

use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;

/// Represents a token resulting from lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A maximal run of bytes that are neither a space nor `|`.
    Word(OsString),
    /// The pipe operator, `|`.
    PipeOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
}

struct LexingFSM<'a> {
    input: std::slice::Iter<'a, u8>,
    state: LexingState,
    buffer: Vec<u8>,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a [u8]) -> Self {
        LexingFSM {
            input: line.iter(),
            state: LexingState::Start,
            buffer: Vec::new(),
        }
    }

    /// Runs the machine to the end of the input.
    ///
    /// Consecutive delimiters never produce empty words; a word still being read when the
    /// input ends is flushed.
    fn make_tokens(mut self) -> Vec<Token> {
        let mut out = Vec::new();

        while let Some(&byte) = self.input.next() {
            match byte {
                b' ' => self.finish_word(&mut out),
                b'|' => {
                    self.finish_word(&mut out);
                    out.push(Token::PipeOp);
                }
                b => {
                    self.buffer.push(b);
                    self.state = LexingState::ReadingWord;
                }
            }
        }

        self.finish_word(&mut out);
        out
    }

    fn finish_word(&mut self, out: &mut Vec<Token>) {
        if self.state == LexingState::ReadingWord {
            let word = std::mem::take(&mut self.buffer);
            out.push(Token::Word(OsString::from_vec(word)));
        }
        self.state = LexingState::Start;
    }
}

/// Splits `line` into words and pipe operators.
pub fn split_into_tokens(line: impl AsRef<[u8]>) -> Vec<Token> {
    LexingFSM::new(line.as_ref()).make_tokens()
}
