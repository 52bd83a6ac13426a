// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::fmt;
use itertools::Itertools;

use super::error::ErrType;
use crate::util::fmt_general;

/// A runtime value.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Number(f64),
    Array(Vec<Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(if b { 1. } else { 0. })
    }
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Array(_) => None,
        }
    }

    /// Store `value` at the nested position `indices`, growing arrays as
    /// needed.  New gaps are zero-filled; a new intermediate slot becomes an
    /// empty array.
    pub(crate) fn store(&mut self, indices: &[usize], value: Value) -> Result<(), ErrType> {
        let (&idx, rest) = match indices.split_first() {
            None => {
                *self = value;
                return Ok(());
            }
            Some(split) => split,
        };
        let items = match self {
            Value::Array(items) => items,
            Value::Number(_) => return Err(ErrType::NotAnArray),
        };
        if idx >= items.len() {
            items.resize(idx + 1, Value::Number(0.));
            if !rest.is_empty() {
                items[idx] = Value::Array(Vec::new());
            }
        }
        items[idx].store(rest, value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", fmt_general(*n)),
            Value::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
        }
    }
}
