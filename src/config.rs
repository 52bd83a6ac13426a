// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Settings that influence how a program is compiled.

/// Largest number of decimal places accepted for G-code arguments.
pub const MAX_DECIMALS: u8 = 6;

/// Compilation settings.
///
/// The defaults produce numbered lines starting at `N10` in steps of 5, with
/// three decimal places per argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Prefix each G-code line with `N<k>`.
    pub line_numbers: bool,
    pub line_start: u32,
    pub line_step: u32,
    /// Decimal places for G-code argument values (0 to 6).
    pub decimals: u8,
    /// Maximum nesting of user function calls.
    pub max_recursion: usize,
    /// Maximum number of passes of a single `while` loop.
    pub max_while_iterations: usize,
    /// Emit `debug` level log records while compiling.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            line_numbers: true,
            line_start: 10,
            line_step: 5,
            decimals: 3,
            max_recursion: 100,
            max_while_iterations: 1_000_000,
            debug: false,
        }
    }
}

impl Config {
    /// Set the decimal precision, ignoring values outside the valid range.
    ///
    /// Returns whether the value was accepted.
    pub fn set_decimals(&mut self, decimals: f64) -> bool {
        if decimals.is_finite() && decimals >= 0. && decimals <= MAX_DECIMALS as f64 {
            self.decimals = decimals as u8;
            true
        } else {
            false
        }
    }
}

/// Strings injected into `note` blocks as `[time]` and `[ggcode_file_name]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStrings {
    pub time: String,
    pub file_name: String,
}

impl RuntimeStrings {
    pub fn new(time: impl Into<String>, file_name: impl Into<String>) -> Self {
        RuntimeStrings { time: time.into(), file_name: file_name.into() }
    }
}
