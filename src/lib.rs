// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! A compiler for GGcode, a small parametric language that expands into
//! plain G-code.
//!
//! GGcode adds variables, arrays, arithmetic, loops, conditionals and
//! functions on top of G-code lines:
//!
//! ```text
//! let r = 5
//! for i = 0..<4 {
//!     G1 X[r * cos(i * TAU / 4)] Y[r * sin(i * TAU / 4)]
//! }
//! note { Radius: [r] }
//! ```
//!
//! ## Basic usage
//!
//! Use `ggcode::parse::parse` to get an AST, then run it through an
//! `ggcode::emit::Emitter`, which evaluates all expressions with an
//! `ggcode::eval::Evaluator` and yields the output lines together with any
//! diagnostics.  The `compile` function does both steps.
//!
//! ```rust
//! use ggcode::{compile, Config, RuntimeStrings};
//!
//! let result = compile("G0 X[1 + 2]", &Config::default(), &RuntimeStrings::default());
//! assert_eq!(result.lines, ["%", "000", "N10 G0 X3.000"]);
//! assert!(!result.has_errors);
//! ```
//!
//! The "ggcode-parse" demo binary parses a file and prints the display form
//! of the AST, which is the same program in a consistent format and cleaned
//! of comments.

use std::path::{Path, PathBuf};

pub mod ast;
pub mod config;
pub mod diag;
pub mod emit;
pub mod eval;
pub mod lexer;
pub mod parse;

// internal helpers
pub(crate) mod util;

pub use crate::config::{Config, RuntimeStrings};
pub use crate::diag::Diagnostic;
pub use crate::emit::{Emission, Emitter, Sink, Stats};

/// Everything a caller needs after compiling one source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    /// Output lines; empty if the program could not be parsed or aborted.
    pub lines: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: Stats,
    /// Whether any diagnostic is an error.
    pub has_errors: bool,
}

/// Parse and run a program.
///
/// The file name for diagnostics is taken from `strings`.
pub fn compile(source: &str, config: &Config, strings: &RuntimeStrings) -> Compilation {
    let program = match parse::parse(&strings.file_name, source) {
        Ok(program) => program,
        Err(e) => return Compilation {
            lines: Vec::new(),
            diagnostics: vec![e.to_diagnostic()],
            stats: Stats::default(),
            has_errors: true,
        },
    };
    let emitter = Emitter::new(config.clone(), strings.clone());
    let mut rt = eval::Evaluator::new(config);
    match emitter.emit_with(&mut rt, &program) {
        Ok(emission) => Compilation {
            has_errors: emission.has_errors(),
            lines: emission.lines,
            diagnostics: emission.diagnostics,
            stats: emission.stats,
        },
        Err(e) => {
            let mut diagnostics = program.warnings.clone();
            diagnostics.extend(rt.take_diagnostics());
            diagnostics.push(Diagnostic::error(e.fatal.to_string(), e.lineno));
            Compilation { lines: Vec::new(), diagnostics, stats: Stats::default(), has_errors: true }
        }
    }
}

/// Default place for compiled files: `part.ggcode` becomes `<dir>/part.g.gcode`,
/// any other name gets `.g.gcode` appended.
pub fn output_path(input: &Path, dir: &Path) -> PathBuf {
    let name = input.file_name().map_or_else(|| "out".into(), |n| n.to_string_lossy());
    let stem = name.strip_suffix(".ggcode").unwrap_or(&*name);
    dir.join(format!("{}.g.gcode", stem))
}
