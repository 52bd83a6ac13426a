// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use thiserror::Error;

use crate::ast::Op;

/// A recoverable runtime problem.  It is recorded as a diagnostic and the
/// offending value is replaced by zero.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrType {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("function '{0}' not found")]
    UnknownFunction(String),
    #[error("{name} takes {expected} argument(s), got {found}")]
    BuiltinArity { name: String, expected: usize, found: usize },
    #[error("value is not an array")]
    NotAnArray,
    #[error("{0} must be a number, got an array")]
    NotANumber(&'static str),
    #[error("array index {0} is invalid")]
    InvalidIndex(f64),
    #[error("array index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("operator '{0}' is not supported for arrays")]
    UnsupportedOperand(Op),
    #[error("division by zero: {0} / 0")]
    DivByZero(f64),
    #[error("invalid assignment target")]
    InvalidTarget,
    #[error("maximum recursion depth {limit} exceeded in call to '{name}'")]
    RecursionLimit { name: String, limit: usize },
    #[error("while loop exceeded {0} iterations, aborting loop")]
    WhileLimit(usize),
    #[error("for loop step must not be zero")]
    ZeroStep,
    #[error("for loop makes no progress from {0}")]
    StalledLoop(f64),
    #[error("for loop bounds must be finite")]
    NonFiniteRange,
    #[error("argument {0} evaluated to {1}, using 0")]
    NonFiniteArgument(char, f64),
    #[error("invalid value {1} for setting '{0}'")]
    InvalidSetting(&'static str, f64),
    #[error("'return' outside of a function is ignored")]
    ReturnOutsideFunction,
}

/// Problems that abort the whole compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fatal {
    #[error("too many live variables (limit {0})")]
    TooManyBindings(usize),
    #[error("array of {0} elements exceeds the limit of {1}")]
    ArrayTooLarge(usize, usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error in line {lineno}: {fatal}")]
pub struct EvalError {
    pub lineno: usize,
    pub fatal: Fatal,
}

pub type EvalResult<T> = Result<T, EvalError>;
