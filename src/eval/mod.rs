// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

mod builtins;
mod error;
mod value;

use std::collections::HashMap;
use std::convert::TryFrom;
use std::str::FromStr;
use log::{debug, warn};

use crate::ast::*;
use crate::config::Config;
use crate::diag::Diagnostic;
use crate::util::{num_to_index, with_stack};

pub use self::builtins::Builtin;
pub use self::error::*;
pub use self::value::Value;

/// Upper bound on simultaneously live variable bindings.
pub const MAX_BINDINGS: usize = 65_536;
/// Upper bound on the length of a single array.
pub const MAX_ARRAY_LEN: usize = 1_000_000;

/// Runs statement bodies on behalf of the evaluator, for user function calls.
///
/// Returns the value of an executed `return`, if any.
pub trait BodyRunner<'p> {
    fn run_body(&mut self, rt: &mut Evaluator<'p>, body: &'p [Stmt]) -> EvalResult<Option<Value>>;
}

#[derive(Debug)]
struct Binding {
    name: String,
    value: Value,
    level: usize,
}

/// The Evaluator gives expressions their meaning: it owns the variable
/// bindings and the function table, and evaluates expressions against them.
///
/// Statements are executed elsewhere and reach back here for every embedded
/// expression.  Function definitions are borrowed from the program, so the
/// evaluator cannot outlive it.
pub struct Evaluator<'p> {
    config: Config,
    // newest binding last
    bindings: Vec<Binding>,
    level: usize,
    functions: HashMap<&'p str, &'p FunctionDef>,
    depth: usize,
    // line of the statement being executed
    lineno: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'p> Evaluator<'p> {
    pub fn new(config: &Config) -> Self {
        Evaluator {
            config: config.clone(),
            bindings: Vec::new(),
            level: 0,
            functions: HashMap::new(),
            depth: 0,
            lineno: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Forget all variables, functions and diagnostics.
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.level = 0;
        self.functions.clear();
        self.depth = 0;
        self.lineno = 0;
        self.diagnostics.clear();
    }

    /// The settings in effect, including changes made by the program.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn set_line(&mut self, lineno: usize) {
        self.lineno = lineno;
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Record a recoverable problem at the current line.
    pub fn report(&mut self, err: ErrType) {
        warn!("line {}: {}", self.lineno, err);
        self.diagnostics.push(Diagnostic::error(err.to_string(), self.lineno));
    }

    pub fn warn(&mut self, err: ErrType) {
        warn!("line {}: {}", self.lineno, err);
        self.diagnostics.push(Diagnostic::warning(err.to_string(), self.lineno));
    }

    fn fatal(&self, fatal: Fatal) -> EvalError {
        EvalError { lineno: self.lineno, fatal }
    }

    // -- scopes and variables --

    pub fn enter_scope(&mut self) {
        self.level += 1;
    }

    pub fn exit_scope(&mut self) {
        if self.level == 0 {
            return;
        }
        let level = self.level;
        // globals created from inside the scope may sit above its bindings
        self.bindings.retain(|b| b.level != level);
        self.level -= 1;
    }

    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.bindings.iter().rev().find(|b| b.name == name).map(|b| &b.value)
    }

    /// Assign to the nearest visible binding, or create a global one.
    pub fn set_var(&mut self, name: &str, value: Value) -> EvalResult<()> {
        self.apply_setting(name, &value);
        if let Some(b) = self.bindings.iter_mut().rev().find(|b| b.name == name) {
            b.value = value;
            return Ok(());
        }
        self.push_binding(name, value, 0)
    }

    /// Bind a name in the current scope.
    pub fn declare_var(&mut self, name: &str, value: Value) -> EvalResult<()> {
        self.apply_setting(name, &value);
        let level = self.level;
        if let Some(b) = self.bindings.iter_mut().rev()
                                      .take_while(|b| b.level == level)
                                      .find(|b| b.name == name) {
            b.value = value;
            return Ok(());
        }
        self.push_binding(name, value, level)
    }

    fn push_binding(&mut self, name: &str, value: Value, level: usize) -> EvalResult<()> {
        if self.bindings.len() >= MAX_BINDINGS {
            return Err(self.fatal(Fatal::TooManyBindings(MAX_BINDINGS)));
        }
        self.bindings.push(Binding { name: name.into(), value, level });
        Ok(())
    }

    /// Assignments to `nline` and `decimalpoint` change the output settings.
    fn apply_setting(&mut self, name: &str, value: &Value) {
        let n = match (name, value) {
            ("nline", Value::Number(n)) | ("decimalpoint", Value::Number(n)) => *n,
            _ => return,
        };
        if name == "nline" {
            self.config.line_numbers = n != 0.;
        } else if !self.config.set_decimals(n) {
            self.report(ErrType::InvalidSetting("decimalpoint", n));
        }
    }

    // -- functions --

    /// Register a function; a later definition with the same name wins.
    pub fn define_function(&mut self, def: &'p FunctionDef) {
        if self.config.debug {
            debug!("defining function {}({})", def.name, def.params.join(", "));
        }
        self.functions.insert(def.name.as_str(), def);
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    fn call(&mut self, name: &str, args: &[Expr], runner: &mut dyn BodyRunner<'p>) -> EvalResult<Value> {
        if let Ok(builtin) = Builtin::from_str(name) {
            if let Some(c) = builtin.constant() {
                return Ok(Value::Number(c));
            }
            if builtin.arity() == args.len() {
                let mut nums = Vec::with_capacity(args.len());
                for arg in args {
                    nums.push(self.eval_number(arg, runner, "function argument")?.unwrap_or(0.));
                }
                if builtin == Builtin::SafeDivide && nums[1] == 0. {
                    self.report(ErrType::DivByZero(nums[0]));
                }
                return Ok(Value::Number(builtin.apply(&nums)));
            }
            // built-in names cannot be redefined, so there is nothing to fall back to
            self.report(ErrType::BuiltinArity {
                name: name.into(), expected: builtin.arity(), found: args.len()
            });
            return Ok(Value::default());
        }

        let def = match self.functions.get(name) {
            Some(&def) => def,
            None => {
                self.report(ErrType::UnknownFunction(name.into()));
                return Ok(Value::default());
            }
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, runner)?);
        }
        if self.depth >= self.config.max_recursion {
            self.report(ErrType::RecursionLimit { name: name.into(), limit: self.config.max_recursion });
            return Ok(Value::default());
        }

        let lineno = self.lineno;
        self.depth += 1;
        self.enter_scope();
        let mut values = values.into_iter();
        let mut result = Ok(None);
        for param in &def.params {
            if let Err(e) = self.declare_var(param, values.next().unwrap_or_default()) {
                result = Err(e);
                break;
            }
        }
        if result.is_ok() {
            result = runner.run_body(self, &def.body);
        }
        self.exit_scope();
        self.depth -= 1;
        self.lineno = lineno;
        Ok(result?.unwrap_or_default())
    }

    // -- expressions --

    pub fn eval(&mut self, expr: &Expr, runner: &mut dyn BodyRunner<'p>) -> EvalResult<Value> {
        with_stack(|| self.eval_expr(expr, runner))
    }

    fn eval_expr(&mut self, expr: &Expr, runner: &mut dyn BodyRunner<'p>) -> EvalResult<Value> {
        Ok(match expr {
            Expr::Num(n) => Value::Number(*n),
            Expr::Var(name) => match self.get_var(name) {
                Some(v) => v.clone(),
                None => {
                    self.report(ErrType::UndefinedVariable(name.clone()));
                    Value::default()
                }
            },
            Expr::Index(arr, idx) => self.eval_index(arr, idx, runner)?,
            Expr::Array(items) => {
                if items.len() > MAX_ARRAY_LEN {
                    return Err(self.fatal(Fatal::ArrayTooLarge(items.len(), MAX_ARRAY_LEN)));
                }
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, runner)?);
                }
                Value::Array(values)
            }
            Expr::Call(name, args) => self.call(name, args, runner)?,
            Expr::Op(op, lhs, rhs) => {
                let lhs = self.eval(lhs, runner)?;
                let rhs = self.eval(rhs, runner)?;
                self.binary(*op, lhs, rhs)
            }
            Expr::Unop(op, ex) => match (op, self.eval(ex, runner)?) {
                (UnOp::Neg, Value::Number(n)) => Value::Number(-n),
                (UnOp::Not, Value::Number(n)) => Value::from(n == 0.),
                (UnOp::Not, Value::Array(_)) => {
                    self.report(ErrType::NotANumber("operand of '!'"));
                    Value::default()
                }
                (UnOp::Neg, Value::Array(_)) => {
                    self.report(ErrType::NotANumber("operand of '-'"));
                    Value::default()
                }
            },
            Expr::Ternary(cond, then, els) => {
                let c = self.eval_number(cond, runner, "condition")?.unwrap_or(0.);
                if c != 0. {
                    self.eval(then, runner)?
                } else {
                    self.eval(els, runner)?
                }
            }
        })
    }

    /// Evaluate an expression that must produce a number.  Arrays are
    /// reported and yield `None`.
    pub fn eval_number(&mut self, expr: &Expr, runner: &mut dyn BodyRunner<'p>,
                       what: &'static str) -> EvalResult<Option<f64>> {
        match self.eval(expr, runner)? {
            Value::Number(n) => Ok(Some(n)),
            Value::Array(_) => {
                self.report(ErrType::NotANumber(what));
                Ok(None)
            }
        }
    }

    /// Apply a binary operator.  Only equality is defined for arrays.
    pub fn binary(&mut self, op: Op, lhs: Value, rhs: Value) -> Value {
        let (l, r) = match (lhs, rhs) {
            (Value::Number(l), Value::Number(r)) => (l, r),
            (lhs, rhs) => return match op {
                Op::Eq => Value::from(lhs == rhs),
                Op::Ne => Value::from(lhs != rhs),
                _ => {
                    self.report(ErrType::UnsupportedOperand(op));
                    Value::default()
                }
            },
        };
        Value::Number(match op {
            Op::Add => l + r,
            Op::Sub => l - r,
            Op::Mul => l * r,
            Op::Div => {
                if r == 0. {
                    self.report(ErrType::DivByZero(l));
                }
                l / r
            }
            Op::Eq => return Value::from(l == r),
            Op::Ne => return Value::from(l != r),
            Op::Gt => return Value::from(l > r),
            Op::Ge => return Value::from(l >= r),
            Op::Lt => return Value::from(l < r),
            Op::Le => return Value::from(l <= r),
            Op::And => return Value::from(l != 0. && r != 0.),
            Op::Or => return Value::from(l != 0. || r != 0.),
            Op::Pow => l.powf(r),
            Op::BitAnd => ((l as i64) & (r as i64)) as f64,
            Op::BitOr => ((l as i64) | (r as i64)) as f64,
            Op::Shl => shift(l, r, true),
            Op::Shr => shift(l, r, false),
        })
    }

    fn index_of(&mut self, expr: &Expr, runner: &mut dyn BodyRunner<'p>) -> EvalResult<Option<usize>> {
        Ok(match self.eval_number(expr, runner, "array index")? {
            None => None,
            Some(n) => match num_to_index(n, ErrType::InvalidIndex) {
                Ok(i) => Some(i),
                Err(e) => {
                    self.report(e);
                    None
                }
            },
        })
    }

    fn eval_index(&mut self, arr: &Expr, idx: &Expr, runner: &mut dyn BodyRunner<'p>) -> EvalResult<Value> {
        // a plain variable is looked up in place instead of being copied
        let owned;
        let index;
        let array = if let Expr::Var(name) = arr {
            index = self.index_of(idx, runner)?;
            match self.get_var(name) {
                Some(v) => v,
                None => {
                    self.report(ErrType::UndefinedVariable(name.clone()));
                    return Ok(Value::default());
                }
            }
        } else {
            owned = self.eval(arr, runner)?;
            index = self.index_of(idx, runner)?;
            &owned
        };
        let items = match (array, index) {
            (_, None) => return Ok(Value::default()),
            (Value::Array(items), _) => items,
            (Value::Number(_), _) => {
                self.report(ErrType::NotAnArray);
                return Ok(Value::default());
            }
        };
        let index = index.unwrap_or(0);
        match items.get(index) {
            Some(v) => Ok(v.clone()),
            None => {
                let len = items.len();
                self.report(ErrType::IndexOutOfBounds { index, len });
                Ok(Value::default())
            }
        }
    }

    /// Perform `target = value` where target is a (possibly chained) index
    /// expression rooted at a variable.  Indices are evaluated left to right,
    /// before the value.
    pub fn assign_index(&mut self, target: &Expr, value: &Expr,
                        runner: &mut dyn BodyRunner<'p>) -> EvalResult<()> {
        let mut chain = Vec::new();
        let mut node = target;
        while let Expr::Index(arr, idx) = node {
            chain.push(&**idx);
            node = &**arr;
        }
        chain.reverse();
        let name = match node {
            Expr::Var(name) if !chain.is_empty() => name,
            _ => {
                self.report(ErrType::InvalidTarget);
                return Ok(());
            }
        };

        let mut indices = Vec::with_capacity(chain.len());
        let mut valid = true;
        for idx in chain {
            match self.index_of(idx, runner)? {
                Some(i) if i >= MAX_ARRAY_LEN =>
                    return Err(self.fatal(Fatal::ArrayTooLarge(i + 1, MAX_ARRAY_LEN))),
                Some(i) => indices.push(i),
                None => valid = false,
            }
        }
        let value = self.eval(value, runner)?;
        if !valid {
            return Ok(());
        }

        if self.get_var(name).is_none() {
            self.set_var(name, Value::Array(Vec::new()))?;
        }
        let result = match self.bindings.iter_mut().rev().find(|b| b.name == *name) {
            Some(b) => b.value.store(&indices, value),
            None => Ok(()),
        };
        if let Err(e) = result {
            self.report(e);
        }
        Ok(())
    }
}

/// Integer shift of the truncated operands.  Shifting by a negative amount
/// or by 64 and more bits clears the value (left) or leaves only the sign
/// (right).
fn shift(l: f64, r: f64, left: bool) -> f64 {
    let (value, amount) = (l as i64, r as i64);
    let result = match u32::try_from(amount) {
        Ok(n) if n < 64 => if left { value << n } else { value >> n },
        _ if left => 0,
        _ => value >> 63,
    };
    result as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parser;

    struct NoBodies;

    impl<'p> BodyRunner<'p> for NoBodies {
        fn run_body(&mut self, _: &mut Evaluator<'p>, _: &'p [Stmt]) -> EvalResult<Option<Value>> {
            Ok(None)
        }
    }

    fn eval_str(rt: &mut Evaluator, src: &str) -> Value {
        let expr = Parser::new(src).expression().unwrap();
        rt.eval(&expr, &mut NoBodies).unwrap()
    }

    #[test]
    fn precedence() {
        let mut rt = Evaluator::new(&Config::default());
        assert_eq!(eval_str(&mut rt, "2 + 3 * 4"), Value::Number(14.));
        assert_eq!(eval_str(&mut rt, "(2 + 3) * 4"), Value::Number(20.));
        assert_eq!(eval_str(&mut rt, "10 - 2 + 1"), Value::Number(9.));
        assert_eq!(eval_str(&mut rt, "6 & 3"), Value::Number(2.));
        assert_eq!(eval_str(&mut rt, "6 | 3"), Value::Number(7.));
        assert_eq!(eval_str(&mut rt, "1 + 1 == 2 && 3 > 2"), Value::Number(1.));
        assert_eq!(eval_str(&mut rt, "-2 * -3"), Value::Number(6.));
        assert_eq!(eval_str(&mut rt, "!0 + 1"), Value::Number(2.));
        assert_eq!(eval_str(&mut rt, "1 > 0 ? 7 : 9"), Value::Number(7.));
        assert_eq!(eval_str(&mut rt, "2 ^ 3 ^ 2"), Value::Number(512.));
        assert_eq!(eval_str(&mut rt, "2 ^ -1"), Value::Number(0.5));
        assert_eq!(eval_str(&mut rt, "1 << 3 + 1"), Value::Number(16.));
        assert_eq!(eval_str(&mut rt, "7.9 >> 1"), Value::Number(3.));
        assert!(rt.diagnostics().is_empty());
    }

    #[test]
    fn shifts_out_of_range() {
        let mut rt = Evaluator::new(&Config::default());
        assert_eq!(eval_str(&mut rt, "1 << 63"), Value::Number(i64::MIN as f64));
        assert_eq!(eval_str(&mut rt, "1 << 64"), Value::Number(0.));
        assert_eq!(eval_str(&mut rt, "1 << -1"), Value::Number(0.));
        assert_eq!(eval_str(&mut rt, "-8 >> 70"), Value::Number(-1.));
        assert_eq!(eval_str(&mut rt, "8 >> 70"), Value::Number(0.));
        assert!(rt.diagnostics().is_empty());
    }

    #[test]
    fn scopes() {
        let mut rt = Evaluator::new(&Config::default());
        rt.declare_var("a", 1.0.into()).unwrap();
        rt.enter_scope();
        rt.declare_var("a", 2.0.into()).unwrap();
        rt.declare_var("b", 3.0.into()).unwrap();
        // unbound names become globals even from inside a scope
        rt.set_var("c", 4.0.into()).unwrap();
        assert_eq!(rt.get_var("a"), Some(&Value::Number(2.)));
        rt.exit_scope();
        assert_eq!(rt.get_var("a"), Some(&Value::Number(1.)));
        assert_eq!(rt.get_var("b"), None);
        assert_eq!(rt.get_var("c"), Some(&Value::Number(4.)));
    }

    #[test]
    fn runtime_faults_fall_back_to_zero() {
        let mut rt = Evaluator::new(&Config::default());
        assert_eq!(eval_str(&mut rt, "nothing + 1"), Value::Number(1.));
        assert_eq!(eval_str(&mut rt, "[1, 2][5]"), Value::Number(0.));
        assert_eq!(eval_str(&mut rt, "nosuch(1)"), Value::Number(0.));
        assert_eq!(eval_str(&mut rt, "sin(1, 2)"), Value::Number(0.));
        assert_eq!(rt.diagnostics().len(), 4);

        let v = eval_str(&mut rt, "1 / 0");
        assert_eq!(v, Value::Number(f64::INFINITY));
        assert_eq!(rt.diagnostics().len(), 5);
    }

    #[test]
    fn builtins_and_constants() {
        let mut rt = Evaluator::new(&Config::default());
        assert_eq!(eval_str(&mut rt, "max(2, 5) + abs(-1)"), Value::Number(6.));
        assert_eq!(eval_str(&mut rt, "PI"), Value::Number(std::f64::consts::PI));
        assert_eq!(eval_str(&mut rt, "round(TAU / PI)"), Value::Number(2.));
        assert_eq!(eval_str(&mut rt, "[1, [2, 3]][1][0]"), Value::Number(2.));
    }

    #[test]
    fn settings_from_variables() {
        let mut rt = Evaluator::new(&Config::default());
        rt.set_var("decimalpoint", 2.0.into()).unwrap();
        rt.set_var("nline", 0.0.into()).unwrap();
        assert_eq!(rt.config().decimals, 2);
        assert!(!rt.config().line_numbers);
        rt.set_var("decimalpoint", 9.0.into()).unwrap();
        assert_eq!(rt.config().decimals, 2);
        assert_eq!(rt.diagnostics().len(), 1);
    }
}
