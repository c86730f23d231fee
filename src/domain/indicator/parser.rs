//! Indicator expression parser.
//!
//! Recursive descent over the grammar
//!
//! ```text
//! indicator := NAME '(' integer [ ',' indicator ] ')'
//! NAME      := SMA | EMA | ROC
//! ```
//!
//! The optional second argument is only accepted by `ROC` and applies the rate
//! of change to the nested indicator, e.g. `ROC(5, SMA(10))`. Names are
//! case-insensitive. Errors carry the byte offset where parsing stopped.

use crate::domain::error::ParseError;
use crate::domain::indicator::Indicator;

/// Deepest accepted `ROC(k, ...)` nesting.
pub const MAX_NESTING: usize = 32;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn peek_word(&self) -> &'a str {
        let remaining = self.remaining();
        let end = remaining
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(remaining.len());
        &remaining[..end]
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        if start == self.pos {
            return Err(ParseError {
                message: "expected integer".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    fn parse_indicator(&mut self) -> Result<Indicator, ParseError> {
        self.skip_whitespace();
        let name_pos = self.pos;
        let word = self.peek_word();
        let name = word.to_ascii_uppercase();
        if !matches!(name.as_str(), "SMA" | "EMA" | "ROC") {
            let found = if word.is_empty() {
                self.peek()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "end of input".to_string())
            } else {
                word.to_string()
            };
            return Err(self.error(format!(
                "expected indicator (SMA, EMA, ROC), found '{}'",
                found
            )));
        }
        self.pos += word.len();

        self.expect_char('(')?;
        let period = self.parse_integer()?;
        self.skip_whitespace();

        let indicator = if self.peek() == Some(',') {
            if name != "ROC" {
                return Err(ParseError {
                    message: format!("{} takes a single period argument", name),
                    position: name_pos,
                });
            }
            self.advance();
            if self.depth >= MAX_NESTING {
                return Err(self.error(format!(
                    "indicator nested deeper than {} levels",
                    MAX_NESTING
                )));
            }
            self.depth += 1;
            let base = self.parse_indicator()?;
            self.depth -= 1;
            base.roc_of(period)
        } else {
            match name.as_str() {
                "SMA" => Indicator::Sma(period),
                "EMA" => Indicator::Ema(period),
                _ => Indicator::Roc(period),
            }
        };

        self.expect_char(')')?;
        Ok(indicator)
    }
}

/// Parse an indicator expression such as `EMA(20)` or `ROC(5, SMA(10))`.
pub fn parse(input: &str) -> Result<Indicator, ParseError> {
    let mut parser = Parser::new(input);
    let indicator = parser.parse_indicator()?;
    parser.skip_whitespace();
    if let Some(ch) = parser.peek() {
        return Err(parser.error(format!("unexpected trailing input '{}'", ch)));
    }
    Ok(indicator)
}
