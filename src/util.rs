// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Run `f` on a fresh stack segment if less than the red zone is left.
///
/// Wraps every recursive step of parsing and execution, so deep programs
/// are limited by the configured ceilings and not by the thread's stack.
pub fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, f)
}

/// Helper for converting a floating number to an array index, or a suitable error.
///
/// Fractional indices are truncated toward zero.
pub fn num_to_index<T>(inp: f64, err: impl FnOnce(f64) -> T) -> Result<usize, T> {
    if inp.is_finite() && inp > -1. && inp < usize::MAX as f64 {
        Ok(inp.trunc() as usize)
    } else {
        Err(err(inp))
    }
}

/// Format with a fixed number of decimals, never producing a negative zero.
pub fn fmt_fixed(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.into(),
        _ => s,
    }
}

/// Format like C's `%g`: six significant digits, trailing zeros removed,
/// scientific notation for very large or small magnitudes.
pub fn fmt_general(value: f64) -> String {
    const PRECISION: i32 = 6;
    if value == 0. {
        return "0".into();
    } else if value.is_nan() {
        return "nan".into();
    } else if value.is_infinite() {
        return if value > 0. { "inf".into() } else { "-inf".into() };
    }
    // rounding to the precision may bump the exponent, so read it back
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let s = format!("{:.*}", (PRECISION - 1 - exp) as usize, value);
        trim_zeros(&s).into()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_format() {
        assert_eq!(fmt_general(5.), "5");
        assert_eq!(fmt_general(-2.5), "-2.5");
        assert_eq!(fmt_general(3.14159265), "3.14159");
        assert_eq!(fmt_general(123456789.), "1.23457e+08");
        assert_eq!(fmt_general(0.0001), "0.0001");
        assert_eq!(fmt_general(0.00001), "1e-05");
        assert_eq!(fmt_general(9999999.), "1e+07");
    }

    #[test]
    fn fixed_format() {
        assert_eq!(fmt_fixed(1., 3), "1.000");
        assert_eq!(fmt_fixed(-0.0001, 3), "0.000");
        assert_eq!(fmt_fixed(-1.5, 2), "-1.50");
        assert_eq!(fmt_fixed(2.4, 0), "2");
    }

    #[test]
    fn index_conversion() {
        assert_eq!(num_to_index(3.7, |_| ()), Ok(3));
        assert_eq!(num_to_index(-0.5, |_| ()), Ok(0));
        assert!(num_to_index(-1., |_| ()).is_err());
        assert!(num_to_index(f64::NAN, |_| ()).is_err());
    }
}
