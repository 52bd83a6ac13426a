// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::fmt;
use strum_macros::Display;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum Severity {
    #[strum(serialize = "warning")]
    Warning,
    #[strum(serialize = "error")]
    Error,
}

/// A message produced while compiling, with an optional source position.
#[derive(Clone, PartialEq, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    /// Source line followed by a caret line, if a column is known.
    pub excerpt: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, line: usize) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            line: if line > 0 { Some(line) } else { None },
            column: None,
            excerpt: None,
        }
    }

    pub fn warning(message: impl Into<String>, line: usize) -> Self {
        Diagnostic { severity: Severity::Warning, ..Self::error(message, line) }
    }

    /// Attach a column and render the excerpt from `source`.
    pub fn at_column(mut self, source: &str, column: usize) -> Self {
        if let Some(line) = self.line {
            self.excerpt = excerpt(source, line, column);
        }
        self.column = Some(column);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        match (self.line, self.column) {
            (Some(l), Some(c)) => write!(f, " at line {}, column {}", l, c)?,
            (Some(l), None) => write!(f, " in line {}", l)?,
            _ => (),
        }
        write!(f, ": {}", self.message)?;
        if let Some(ex) = &self.excerpt {
            write!(f, "\n{}", ex)?;
        }
        Ok(())
    }
}

/// Render source line `line` (1-based) with a caret under `column` (1-based).
pub fn excerpt(source: &str, line: usize, column: usize) -> Option<String> {
    let text = source.lines().nth(line.checked_sub(1)?)?;
    let pad: String = text.chars()
                          .take(column.saturating_sub(1))
                          .map(|c| if c == '\t' { '\t' } else { ' ' })
                          .collect();
    Some(format!("{}\n{}^", text, pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caret_under_column() {
        let src = "let a = 1\nlet b = $\n";
        assert_eq!(excerpt(src, 2, 9).unwrap(), "let b = $\n        ^");
        assert!(excerpt(src, 5, 1).is_none());
        assert!(excerpt(src, 0, 1).is_none());
    }
}
