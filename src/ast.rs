// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::fmt::{self, Display, Formatter};
use itertools::Itertools;
use strum_macros::{Display, IntoStaticStr};

use crate::diag::Diagnostic;

#[derive(Debug)]
pub struct Program {
    pub filename: String,
    pub body: Block,
    /// Non-fatal problems found while parsing.
    pub warnings: Vec<Diagnostic>,
}

pub type Block = Vec<Stmt>;

#[derive(Debug)]
pub struct Stmt {
    pub lineno: usize,
    pub kind: StmtKind,
}

#[derive(Debug, IntoStaticStr)]
pub enum StmtKind {
    Nop,
    Let(String, Expr),
    Assign(String, Expr),
    CompoundAssign(String, Op, Expr),
    /// Target is always an `Expr::Index`.
    AssignIndex(Expr, Expr),
    Function(FunctionDef),
    Return(Option<Expr>),
    Gcode(String, Vec<GArg>),
    While(Expr, Block),
    For(ForLoop),
    Block(Block),
    Note(String),
    If(Expr, Block, Option<Block>),
    Expr(Expr),
}

#[derive(Debug)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

#[derive(Debug)]
pub struct ForLoop {
    pub var: String,
    pub from: Expr,
    pub to: Expr,
    pub step: Option<Expr>,
    pub exclusive: bool,
    pub body: Block,
}

/// A G-code argument like `X[expr]`.  A bare key has no value.
#[derive(Debug)]
pub struct GArg {
    pub key: char,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(String),
    Index(Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    Call(String, Vec<Expr>),
    Op(Op, Box<Expr>, Box<Expr>),
    Unop(UnOp, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Op {
    #[strum(serialize = "^")]
    Pow,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "|")]
    BitOr,
}

impl Op {
    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Op::And | Op::Or | Op::BitAnd | Op::BitOr => 0,
            Op::Eq | Op::Ne | Op::Gt | Op::Ge | Op::Lt | Op::Le => 1,
            Op::Shl | Op::Shr => 2,
            Op::Add | Op::Sub => 3,
            Op::Mul | Op::Div => 4,
            Op::Pow => 5,
        }
    }

    /// Only `^` groups to the right: `2 ^ 3 ^ 2` is `2 ^ 9`.
    pub fn is_right_assoc(self) -> bool {
        self == Op::Pow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "!")]
    Not,
}

impl Stmt {
    pub fn new(lineno: usize, kind: StmtKind) -> Self {
        Stmt { lineno, kind }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for stmt in &self.body {
            fmt_stmt(f, stmt, 0)?;
        }
        Ok(())
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fmt_stmt(f, self, 0)
    }
}

fn fmt_block(f: &mut Formatter, block: &[Stmt], indent: usize) -> fmt::Result {
    writeln!(f, "{{")?;
    for stmt in block {
        fmt_stmt(f, stmt, indent + 1)?;
    }
    write!(f, "{:1$}}}", "", 4 * indent)
}

fn fmt_stmt(f: &mut Formatter, stmt: &Stmt, indent: usize) -> fmt::Result {
    write!(f, "{:1$}", "", 4 * indent)?;
    match &stmt.kind {
        StmtKind::Nop => (),
        StmtKind::Let(name, ex) => write!(f, "let {} = {}", name, ex)?,
        StmtKind::Assign(name, ex) => write!(f, "{} = {}", name, ex)?,
        StmtKind::CompoundAssign(name, op, ex) => write!(f, "{} {}= {}", name, op, ex)?,
        StmtKind::AssignIndex(target, ex) => write!(f, "{} = {}", target, ex)?,
        StmtKind::Function(def) => {
            write!(f, "function {}({}) ", def.name, def.params.iter().join(", "))?;
            fmt_block(f, &def.body, indent)?;
        }
        StmtKind::Return(None) => write!(f, "return")?,
        StmtKind::Return(Some(ex)) => write!(f, "return {}", ex)?,
        StmtKind::Gcode(code, args) => {
            write!(f, "{}", code)?;
            for arg in args {
                match &arg.value {
                    Some(ex) => write!(f, " {}[{}]", arg.key, ex)?,
                    None => write!(f, " {}", arg.key)?,
                }
            }
        }
        StmtKind::While(cond, body) => {
            write!(f, "while {} ", cond)?;
            fmt_block(f, body, indent)?;
        }
        StmtKind::For(lp) => {
            write!(f, "for {} = {} {} {}", lp.var, lp.from,
                   if lp.exclusive { "..<" } else { ".." }, lp.to)?;
            if let Some(step) = &lp.step {
                write!(f, " step {}", step)?;
            }
            write!(f, " ")?;
            fmt_block(f, &lp.body, indent)?;
        }
        StmtKind::Block(body) => fmt_block(f, body, indent)?,
        StmtKind::Note(text) => write!(f, "note {{{}}}", text)?,
        StmtKind::If(cond, then, els) => {
            write!(f, "if {} ", cond)?;
            fmt_block(f, then, indent)?;
            if let Some(els) = els {
                write!(f, " else ")?;
                fmt_block(f, els, indent)?;
            }
        }
        StmtKind::Expr(ex) => write!(f, "{}", ex)?,
    }
    writeln!(f)
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{}", n),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Index(arr, idx) => {
                let wrap = matches!(**arr, Expr::Op(..) | Expr::Unop(..) | Expr::Ternary(..));
                fmt_operand(f, arr, wrap)?;
                write!(f, "[{}]", idx)
            }
            Expr::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
            Expr::Call(func, args) => write!(f, "{}({})", func, args.iter().join(", ")),
            Expr::Op(op, lhs, rhs) => {
                // parenthesize subexpressions that bind more loosely
                let wrap_l = binds_looser(lhs, op.precedence(), op.is_right_assoc());
                let wrap_r = binds_looser(rhs, op.precedence(), !op.is_right_assoc());
                fmt_operand(f, lhs, wrap_l)?;
                write!(f, " {} ", op)?;
                fmt_operand(f, rhs, wrap_r)
            }
            Expr::Unop(op, ex) => {
                write!(f, "{}", op)?;
                let wrap = matches!(**ex, Expr::Op(..) | Expr::Ternary(..)) ||
                    matches!(**ex, Expr::Num(n) if n < 0.);
                fmt_operand(f, ex, wrap)
            }
            Expr::Ternary(cond, a, b) => {
                let wrap = matches!(**cond, Expr::Ternary(..));
                fmt_operand(f, cond, wrap)?;
                write!(f, " ? {} : {}", a, b)
            }
        }
    }
}

/// `tie` wraps an operand of equal precedence, for the side that does not
/// associate.
fn binds_looser(ex: &Expr, prec: u8, tie: bool) -> bool {
    match ex {
        Expr::Op(op, ..) => op.precedence() < prec || (tie && op.precedence() == prec),
        Expr::Ternary(..) => true,
        _ => false,
    }
}

fn fmt_operand(f: &mut Formatter, ex: &Expr, wrap: bool) -> fmt::Result {
    if wrap {
        write!(f, "({})", ex)
    } else {
        write!(f, "{}", ex)
    }
}
