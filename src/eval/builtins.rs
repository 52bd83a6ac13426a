// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::f64::consts;
use strum_macros::{Display, EnumString};

/// The built-in constants and math functions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumString)]
pub enum Builtin {
    // constants
    #[strum(serialize = "PI")]
    Pi,
    #[strum(serialize = "TAU")]
    Tau,
    #[strum(serialize = "EU")]
    Eu,
    #[strum(serialize = "DEG_TO_RAD")]
    DegToRad,
    #[strum(serialize = "RAD_TO_DEG")]
    RadToDeg,

    #[strum(serialize = "abs")]
    Abs,
    #[strum(serialize = "mod")]
    Mod,
    #[strum(serialize = "floor")]
    Floor,
    #[strum(serialize = "ceil")]
    Ceil,
    #[strum(serialize = "round")]
    Round,
    #[strum(serialize = "min")]
    Min,
    #[strum(serialize = "max")]
    Max,
    #[strum(serialize = "clamp")]
    Clamp,
    #[strum(serialize = "sin")]
    Sin,
    #[strum(serialize = "cos")]
    Cos,
    #[strum(serialize = "tan")]
    Tan,
    #[strum(serialize = "asin")]
    Asin,
    #[strum(serialize = "acos")]
    Acos,
    #[strum(serialize = "atan")]
    Atan,
    #[strum(serialize = "atan2")]
    Atan2,
    #[strum(serialize = "deg")]
    Deg,
    #[strum(serialize = "rad")]
    Rad,
    #[strum(serialize = "sqrt")]
    Sqrt,
    #[strum(serialize = "pow")]
    Pow,
    #[strum(serialize = "hypot")]
    Hypot,
    #[strum(serialize = "lerp")]
    Lerp,
    #[strum(serialize = "map")]
    Map,
    #[strum(serialize = "distance")]
    Distance,
    #[strum(serialize = "sign")]
    Sign,
    #[strum(serialize = "log")]
    Log,
    #[strum(serialize = "exp")]
    Exp,
    #[strum(serialize = "noise")]
    Noise,
    #[strum(serialize = "safe_divide")]
    SafeDivide,
    #[strum(serialize = "is_finite")]
    IsFinite,
    #[strum(serialize = "is_nan")]
    IsNan,
    #[strum(serialize = "is_inf")]
    IsInf,
}

impl Builtin {
    /// The value of a constant, or `None` for functions.
    pub fn constant(self) -> Option<f64> {
        use Builtin::*;
        Some(match self {
            Pi => consts::PI,
            Tau => consts::TAU,
            Eu => consts::E,
            DegToRad => consts::PI / 180.,
            RadToDeg => 180. / consts::PI,
            _ => return None,
        })
    }

    /// Number of arguments a function takes.  Constants take none.
    pub fn arity(self) -> usize {
        use Builtin::*;
        match self {
            Pi | Tau | Eu | DegToRad | RadToDeg => 0,
            Mod | Min | Max | Atan2 | Pow | Hypot | SafeDivide => 2,
            Clamp | Lerp => 3,
            Distance => 4,
            Map => 5,
            _ => 1,
        }
    }

    /// Apply the function to exactly `arity()` arguments.
    pub fn apply(self, args: &[f64]) -> f64 {
        use Builtin::*;
        let a = |i: usize| args.get(i).copied().unwrap_or(0.);
        match self {
            Abs => a(0).abs(),
            Mod => floor_mod(a(0), a(1)),
            Floor => a(0).floor(),
            Ceil => a(0).ceil(),
            Round => a(0).round(),
            Min => a(0).min(a(1)),
            Max => a(0).max(a(1)),
            Clamp => a(0).max(a(1)).min(a(2)),
            Sin | Noise => a(0).sin(),
            Cos => a(0).cos(),
            Tan => a(0).tan(),
            Asin => a(0).asin(),
            Acos => a(0).acos(),
            Atan => a(0).atan(),
            Atan2 => a(0).atan2(a(1)),
            Deg => a(0).to_degrees(),
            Rad => a(0).to_radians(),
            Sqrt => a(0).sqrt(),
            Pow => a(0).powf(a(1)),
            Hypot => a(0).hypot(a(1)),
            Lerp => a(0) + a(2) * (a(1) - a(0)),
            Map => a(3) + (a(0) - a(1)) * (a(4) - a(3)) / (a(2) - a(1)),
            Distance => (a(2) - a(0)).hypot(a(3) - a(1)),
            Sign => if a(0) > 0. { 1. } else if a(0) < 0. { -1. } else { 0. },
            Log => a(0).ln(),
            Exp => a(0).exp(),
            SafeDivide => a(0) / a(1),
            IsFinite => bool_num(a(0).is_finite()),
            IsNan => bool_num(a(0).is_nan()),
            IsInf => bool_num(a(0).is_infinite()),
            _ => self.constant().unwrap_or(0.),
        }
    }
}

fn bool_num(b: bool) -> f64 {
    if b { 1. } else { 0. }
}

/// Modulo with the sign of the divisor.
fn floor_mod(x: f64, y: f64) -> f64 {
    if y == 0. {
        f64::NAN
    } else {
        x - y * (x / y).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn lookup_and_apply() {
        assert_eq!(Builtin::from_str("safe_divide"), Ok(Builtin::SafeDivide));
        assert_eq!(Builtin::from_str("DEG_TO_RAD"), Ok(Builtin::DegToRad));
        assert!(Builtin::from_str("Sin").is_err());

        assert_eq!(Builtin::Mod.apply(&[-1., 3.]), 2.);
        assert!(Builtin::Mod.apply(&[1., 0.]).is_nan());
        assert_eq!(Builtin::Clamp.apply(&[5., 0., 2.]), 2.);
        assert_eq!(Builtin::Lerp.apply(&[0., 10., 0.25]), 2.5);
        assert_eq!(Builtin::Map.apply(&[5., 0., 10., 0., 100.]), 50.);
        assert_eq!(Builtin::Distance.apply(&[0., 0., 3., 4.]), 5.);
        assert_eq!(Builtin::Sign.apply(&[0.]), 0.);
        assert_eq!(Builtin::Sign.apply(&[-3.]), -1.);
        assert_eq!(Builtin::IsInf.apply(&[f64::INFINITY]), 1.);
    }
}
