// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Executes a parsed program and produces G-code lines.

mod note;

use log::debug;

use crate::ast::*;
use crate::config::{Config, RuntimeStrings};
use crate::diag::{Diagnostic, Severity};
use crate::eval::{BodyRunner, ErrType, EvalResult, Evaluator, Value};
use crate::util::{fmt_fixed, fmt_general, with_stack};

pub use self::note::{pieces, Piece};

/// Tolerance for the end of an inclusive `for` range.
const RANGE_EPSILON: f64 = 1e-9;

/// Receiver for finished output lines.
pub trait Sink {
    fn append(&mut self, line: &str);
}

impl Sink for String {
    fn append(&mut self, line: &str) {
        self.push_str(line);
        self.push('\n');
    }
}

impl Sink for Vec<String> {
    fn append(&mut self, line: &str) {
        self.push(line.into());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of statements executed.
    pub statements: usize,
    /// Number of output lines, including the preamble.
    pub lines: usize,
}

/// The result of running a program.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub lines: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: Stats,
}

impl Emission {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn write_to(&self, sink: &mut impl Sink) {
        for line in &self.lines {
            sink.append(line);
        }
    }

    /// All lines, each terminated by a newline.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

/// Runs programs with a fixed configuration and set of runtime strings.
///
/// Every call to `emit` starts from a fresh evaluator, so emitting the same
/// program twice gives identical results.
pub struct Emitter {
    config: Config,
    strings: RuntimeStrings,
}

impl Emitter {
    pub fn new(config: Config, strings: RuntimeStrings) -> Self {
        Emitter { config, strings }
    }

    pub fn emit(&self, program: &Program) -> EvalResult<Emission> {
        let mut rt = Evaluator::new(&self.config);
        self.emit_with(&mut rt, program)
    }

    /// Run the program on an existing evaluator, which keeps its variables,
    /// functions and settings.  Call `Evaluator::reset` for a clean run.
    pub fn emit_with<'p>(&self, rt: &mut Evaluator<'p>, program: &'p Program) -> EvalResult<Emission> {
        let mut out = Output::new(&self.strings, rt.config().line_start);
        // top level returns are reported and dropped, so the flow is always normal
        out.block(rt, &program.body)?;

        let id = match rt.get_var("id").and_then(Value::as_number) {
            Some(n) if n.is_finite() => fmt_fixed(n, 0),
            _ => "000".into(),
        };
        let mut lines = Vec::with_capacity(out.lines.len() + 2);
        lines.push("%".to_string());
        lines.push(id);
        lines.append(&mut out.lines);

        let mut diagnostics = program.warnings.clone();
        diagnostics.extend(rt.take_diagnostics());
        let stats = Stats { statements: out.statements, lines: lines.len() };
        Ok(Emission { lines, diagnostics, stats })
    }
}

/// How control leaves a block.
enum Flow {
    Normal,
    Return(Value),
}

/// Per-run output state.
struct Output<'e> {
    strings: &'e RuntimeStrings,
    lines: Vec<String>,
    // wider than the configured start and step, so numbering never wraps
    next_number: u64,
    // last emitted mnemonic, for folding repeated G1
    last_code: Option<String>,
    statements: usize,
}

impl<'e, 'p> BodyRunner<'p> for Output<'e> {
    fn run_body(&mut self, rt: &mut Evaluator<'p>, body: &'p [Stmt]) -> EvalResult<Option<Value>> {
        Ok(match self.block(rt, body)? {
            Flow::Return(v) => Some(v),
            Flow::Normal => None,
        })
    }
}

impl<'e> Output<'e> {
    fn new(strings: &'e RuntimeStrings, line_start: u32) -> Self {
        Output {
            strings,
            lines: Vec::new(),
            next_number: line_start.into(),
            last_code: None,
            statements: 0,
        }
    }

    fn block<'p>(&mut self, rt: &mut Evaluator<'p>, block: &'p [Stmt]) -> EvalResult<Flow> {
        for stmt in block {
            if let Flow::Return(v) = self.stmt(rt, stmt)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    fn scoped<'p>(&mut self, rt: &mut Evaluator<'p>, block: &'p [Stmt]) -> EvalResult<Flow> {
        rt.enter_scope();
        let flow = self.block(rt, block);
        rt.exit_scope();
        flow
    }

    fn stmt<'p>(&mut self, rt: &mut Evaluator<'p>, stmt: &'p Stmt) -> EvalResult<Flow> {
        with_stack(|| self.exec(rt, stmt))
    }

    fn exec<'p>(&mut self, rt: &mut Evaluator<'p>, stmt: &'p Stmt) -> EvalResult<Flow> {
        rt.set_line(stmt.lineno);
        self.statements += 1;
        if rt.config().debug {
            let kind: &'static str = (&stmt.kind).into();
            debug!("line {}: {} (scope {}, depth {})", stmt.lineno, kind, rt.level(), rt.depth());
        }

        match &stmt.kind {
            StmtKind::Nop => (),
            StmtKind::Let(name, ex) => {
                let v = rt.eval(ex, self)?;
                rt.declare_var(name, v)?;
            }
            StmtKind::Assign(name, ex) => {
                let v = rt.eval(ex, self)?;
                rt.set_var(name, v)?;
            }
            StmtKind::CompoundAssign(name, op, ex) => {
                let current = match rt.get_var(name) {
                    Some(v) => v.clone(),
                    None => {
                        rt.report(ErrType::UndefinedVariable(name.clone()));
                        Value::default()
                    }
                };
                let rhs = rt.eval(ex, self)?;
                let v = rt.binary(*op, current, rhs);
                rt.set_var(name, v)?;
            }
            StmtKind::AssignIndex(target, ex) => rt.assign_index(target, ex, self)?,
            StmtKind::Function(def) => rt.define_function(def),
            StmtKind::Return(ex) => {
                if rt.depth() == 0 {
                    rt.warn(ErrType::ReturnOutsideFunction);
                } else {
                    let v = match ex {
                        Some(ex) => rt.eval(ex, self)?,
                        None => Value::default(),
                    };
                    return Ok(Flow::Return(v));
                }
            }
            StmtKind::Gcode(code, args) => self.gcode(rt, code, args)?,
            StmtKind::While(cond, body) => return self.while_loop(rt, stmt.lineno, cond, body),
            StmtKind::For(lp) => return self.for_loop(rt, lp),
            StmtKind::Block(body) => return self.scoped(rt, body),
            StmtKind::Note(text) => self.note(rt, text),
            StmtKind::If(cond, then, els) => {
                match rt.eval_number(cond, self, "if condition")? {
                    Some(c) if c != 0. => return self.scoped(rt, then),
                    Some(_) => if let Some(els) = els {
                        return self.scoped(rt, els);
                    },
                    None => (),
                }
            }
            StmtKind::Expr(ex) => {
                rt.eval(ex, self)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn gcode(&mut self, rt: &mut Evaluator, code: &str, args: &[GArg]) -> EvalResult<()> {
        let mut parts = Vec::with_capacity(args.len() + 2);
        let repeated = code == "G1" && self.last_code.as_deref() == Some("G1");
        if !repeated {
            parts.push(code.to_string());
            self.last_code = Some(code.into());
        }
        for arg in args {
            let mut value = match &arg.value {
                Some(ex) => rt.eval_number(ex, self, "G-code argument")?.unwrap_or(0.),
                None => 0.,
            };
            if !value.is_finite() {
                rt.report(ErrType::NonFiniteArgument(arg.key, value));
                value = 0.;
            }
            parts.push(format!("{}{}", arg.key, fmt_fixed(value, rt.config().decimals as usize)));
        }
        // a folded bare G1 still takes its line number
        if rt.config().line_numbers {
            parts.insert(0, format!("N{}", self.next_number));
            self.next_number = self.next_number.saturating_add(rt.config().line_step.into());
        }
        if !parts.is_empty() {
            self.lines.push(parts.join(" "));
        }
        Ok(())
    }

    fn while_loop<'p>(&mut self, rt: &mut Evaluator<'p>, lineno: usize, cond: &'p Expr,
                      body: &'p [Stmt]) -> EvalResult<Flow> {
        let limit = rt.config().max_while_iterations;
        let mut passes = 0;
        loop {
            rt.set_line(lineno);
            match rt.eval_number(cond, self, "while condition")? {
                Some(c) if c != 0. => (),
                _ => break,
            }
            if passes >= limit {
                rt.report(ErrType::WhileLimit(limit));
                break;
            }
            passes += 1;
            if let Flow::Return(v) = self.scoped(rt, body)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    /// The loop variable is assigned like a plain variable, so it keeps its
    /// last value after the loop.
    fn for_loop<'p>(&mut self, rt: &mut Evaluator<'p>, lp: &'p ForLoop) -> EvalResult<Flow> {
        let from = rt.eval_number(&lp.from, self, "for loop start")?;
        let to = rt.eval_number(&lp.to, self, "for loop end")?;
        let step = match &lp.step {
            Some(ex) => rt.eval_number(ex, self, "for loop step")?,
            None => Some(1.),
        };
        let (from, to, step) = match (from, to, step) {
            (Some(from), Some(to), Some(step)) => (from, to, step),
            _ => return Ok(Flow::Normal),
        };
        if step == 0. {
            rt.report(ErrType::ZeroStep);
            return Ok(Flow::Normal);
        }
        if !(from.is_finite() && to.is_finite() && step.is_finite()) {
            rt.report(ErrType::NonFiniteRange);
            return Ok(Flow::Normal);
        }

        let end = match (lp.exclusive, step > 0.) {
            (true, _) => to,
            (false, true) => to + RANGE_EPSILON,
            (false, false) => to - RANGE_EPSILON,
        };
        let mut i = from;
        while (step > 0. && i < end) || (step < 0. && i > end) {
            rt.set_var(&lp.var, Value::Number(i))?;
            if let Flow::Return(v) = self.scoped(rt, &lp.body)? {
                return Ok(Flow::Return(v));
            }
            let next = i + step;
            if next == i {
                rt.report(ErrType::StalledLoop(i));
                break;
            }
            i = next;
        }
        Ok(Flow::Normal)
    }

    fn note(&mut self, rt: &Evaluator, text: &str) {
        let lines = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        for line in lines.filter(|l| !l.trim().is_empty()) {
            let mut out = String::with_capacity(line.len() + 2);
            out.push('(');
            for piece in pieces(line) {
                match piece {
                    Piece::Text(s) => out.push_str(s),
                    Piece::Placeholder("time") => out.push_str(&self.strings.time),
                    Piece::Placeholder("ggcode_file_name") => out.push_str(&self.strings.file_name),
                    Piece::Placeholder(name) => match rt.get_var(name).and_then(Value::as_number) {
                        Some(n) => out.push_str(&fmt_general(n)),
                        None => out.push('0'),
                    },
                }
            }
            out.push(')');
            self.lines.push(out);
        }
    }
}
