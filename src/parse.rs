// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Recursive descent parser producing the AST in `crate::ast`.

use std::mem;
use fixedbitset::FixedBitSet as BitSet;
use thiserror::Error;

use crate::ast::*;
use crate::diag::{self, Diagnostic};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::util::with_stack;

/// How deeply expressions and blocks may nest.
pub const MAX_NESTING: usize = 1024;

/// A syntax error.  Parsing stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// Offending source line with a caret under the column.
    pub excerpt: String,
}

impl ParseError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.message.clone(), self.line);
        diag.column = Some(self.column);
        if !self.excerpt.is_empty() {
            diag.excerpt = Some(self.excerpt.clone());
        }
        diag
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a whole program.
pub fn parse(filename: &str, input: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(input);
    let body = parser.program()?;
    Ok(Program { filename: filename.into(), body, warnings: parser.warnings })
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    warnings: Vec<Diagnostic>,
    depth: usize,
}

fn binop(kind: TokenKind) -> Option<Op> {
    use TokenKind::*;
    Some(match kind {
        Caret => Op::Pow,
        Star => Op::Mul,
        Slash => Op::Div,
        Plus => Op::Add,
        Minus => Op::Sub,
        Shl => Op::Shl,
        Shr => Op::Shr,
        Eq => Op::Eq,
        Ne => Op::Ne,
        Gt => Op::Gt,
        Ge => Op::Ge,
        Lt => Op::Lt,
        Le => Op::Le,
        AndAnd => Op::And,
        OrOr => Op::Or,
        Amp => Op::BitAnd,
        Pipe => Op::BitOr,
        _ => return None,
    })
}

fn compound_op(kind: TokenKind) -> Option<Op> {
    use TokenKind::*;
    Some(match kind {
        PlusAssign => Op::Add,
        MinusAssign => Op::Sub,
        StarAssign => Op::Mul,
        SlashAssign => Op::Div,
        CaretAssign => Op::Pow,
        AmpAssign => Op::BitAnd,
        PipeAssign => Op::BitOr,
        ShlAssign => Op::Shl,
        ShrAssign => Op::Shr,
        _ => return None,
    })
}

fn is_name(tok: &Token) -> bool {
    matches!(tok.kind, TokenKind::Ident | TokenKind::GcodeWord)
}

fn arg_key(tok: &Token) -> Option<char> {
    if !is_name(tok) || tok.text.len() != 1 {
        return None;
    }
    tok.text.chars().next().filter(char::is_ascii_uppercase)
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        let previous = current.clone();
        Parser { lexer, current, previous, warnings: Vec::new(), depth: 0 }
    }

    /// Parse statements until the end of input.
    pub fn program(&mut self) -> ParseResult<Block> {
        let mut body = Vec::new();
        while self.current.kind != TokenKind::Eof {
            self.statement_into(&mut body)?;
        }
        Ok(body)
    }

    // -- token handling --

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.previous = mem::replace(&mut self.current, next);
    }

    fn peek(&self) -> Token {
        self.lexer.peek_token()
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        if self.current.kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> ParseResult<()> {
        if self.accept(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}' {}", kind, context)))
        }
    }

    fn expect_name(&mut self, context: &str) -> ParseResult<String> {
        if is_name(&self.current) {
            let name = self.current.text.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected(&format!("identifier {}", context)))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.current.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.current.text),
        };
        self.error(&self.current, format!("expected {}, found {}", expected, found))
    }

    fn error(&self, tok: &Token, message: String) -> ParseError {
        ParseError {
            message,
            line: tok.line,
            column: tok.column,
            excerpt: diag::excerpt(self.lexer.source(), tok.line, tok.column).unwrap_or_default(),
        }
    }

    fn descend(&mut self, what: &str) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(&self.current, format!("{} nested too deeply", what)));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run one level of recursive descent, refusing to go past `MAX_NESTING`.
    fn nested<T>(&mut self, what: &str, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let outer = self.depth;
        self.descend(what)?;
        let result = with_stack(|| f(self));
        self.depth = outer;
        result
    }

    fn warn(&mut self, tok: &Token, message: String) {
        let warning = Diagnostic::warning(message, tok.line).at_column(self.lexer.source(), tok.column);
        self.warnings.push(warning);
    }

    // -- statements --

    fn statement_into(&mut self, block: &mut Block) -> ParseResult<()> {
        let lineno = self.current.line;
        let kind = self.statement()?;
        if !matches!(kind, StmtKind::Nop) {
            block.push(Stmt::new(lineno, kind));
        }
        Ok(())
    }

    fn statement(&mut self) -> ParseResult<StmtKind> {
        use TokenKind::*;
        match self.current.kind {
            Function => self.function(),
            Return => {
                self.advance();
                if matches!(self.current.kind, RBrace | Eof) {
                    Ok(StmtKind::Return(None))
                } else {
                    Ok(StmtKind::Return(Some(self.expression()?)))
                }
            }
            While => {
                self.advance();
                let cond = self.expression()?;
                Ok(StmtKind::While(cond, self.block()?))
            }
            For => self.for_loop(),
            If => self.conditional(),
            Let => {
                self.advance();
                let name = self.expect_name("after 'let'")?;
                self.expect(Assign, "after variable name")?;
                Ok(StmtKind::Let(name, self.expression()?))
            }
            Note => self.note(),
            LBrace => Ok(StmtKind::Block(self.block()?)),
            Ident => self.ident_statement(),
            GcodeWord => self.gcode(),
            Unknown => {
                let tok = self.current.clone();
                self.warn(&tok, format!("ignoring unexpected character '{}'", tok.text));
                self.advance();
                Ok(StmtKind::Nop)
            }
            _ => Ok(StmtKind::Expr(self.expression()?)),
        }
    }

    fn block(&mut self) -> ParseResult<Block> {
        self.nested("blocks", Self::block_body)
    }

    fn block_body(&mut self) -> ParseResult<Block> {
        self.expect(TokenKind::LBrace, "to open block")?;
        let mut body = Vec::new();
        while !self.accept(TokenKind::RBrace) {
            if self.current.kind == TokenKind::Eof {
                return Err(self.unexpected("'}' to close block"));
            }
            self.statement_into(&mut body)?;
        }
        Ok(body)
    }

    fn ident_statement(&mut self) -> ParseResult<StmtKind> {
        let next = self.peek().kind;
        if next == TokenKind::Assign {
            let name = self.current.text.clone();
            self.advance();
            self.advance();
            return Ok(StmtKind::Assign(name, self.expression()?));
        }
        if let Some(op) = compound_op(next) {
            let name = self.current.text.clone();
            self.advance();
            self.advance();
            return Ok(StmtKind::CompoundAssign(name, op, self.expression()?));
        }
        if next == TokenKind::LBracket {
            let target = self.expression()?;
            if let Expr::Index(..) = target {
                if self.accept(TokenKind::Assign) {
                    return Ok(StmtKind::AssignIndex(target, self.expression()?));
                }
            }
            return Ok(StmtKind::Expr(target));
        }
        if next == TokenKind::LParen || next == TokenKind::Question || binop(next).is_some() {
            return Ok(StmtKind::Expr(self.expression()?));
        }
        // a lone name declares it with a zero value
        let name = self.current.text.clone();
        self.advance();
        Ok(StmtKind::Assign(name, Expr::Num(0.)))
    }

    fn function(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let name = self.expect_name("after 'function'")?;
        self.expect(TokenKind::LParen, "after function name")?;
        let mut params = Vec::new();
        if !self.accept(TokenKind::RParen) {
            loop {
                params.push(self.expect_name("in parameter list")?);
                if self.accept(TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma, "between parameters")?;
            }
        }
        let body = self.block()?;
        Ok(StmtKind::Function(FunctionDef { name, params, body }))
    }

    fn for_loop(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let var = self.expect_name("after 'for'")?;
        self.expect(TokenKind::Assign, "after loop variable")?;
        let from = self.expression()?;
        let exclusive = match self.current.kind {
            TokenKind::Range => false,
            TokenKind::RangeExcl => true,
            _ => return Err(self.unexpected("'..' or '..<' in range")),
        };
        self.advance();
        let to = self.expression()?;
        let step = if self.current.kind == TokenKind::Ident && self.current.text == "step" {
            self.advance();
            Some(self.expression()?)
        } else {
            None
        };
        let body = self.block()?;
        Ok(StmtKind::For(ForLoop { var, from, to, step, exclusive, body }))
    }

    fn conditional(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let cond = self.expression()?;
        let then = self.block()?;
        let els = if self.accept(TokenKind::Else) {
            if self.current.kind == TokenKind::If {
                let lineno = self.current.line;
                Some(vec![Stmt::new(lineno, self.nested("blocks", Self::conditional)?)])
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        Ok(StmtKind::If(cond, then, els))
    }

    fn note(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        // the lexer stands right after the brace, so grab the raw text from there
        if self.current.kind != TokenKind::LBrace {
            return Err(self.unexpected("'{' after 'note'"));
        }
        let open = self.current.clone();
        let text = match self.lexer.raw_block() {
            Some(text) => text.to_string(),
            None => return Err(self.error(&open, "unterminated note block".into())),
        };
        self.advance();
        Ok(StmtKind::Note(text))
    }

    fn gcode(&mut self) -> ParseResult<StmtKind> {
        let mut words = vec![self.current.text.clone()];
        self.advance();
        while self.current.kind == TokenKind::GcodeWord && self.current.line == self.previous.line {
            // e.g. the T in "M6 T[1]" is an argument
            if arg_key(&self.current).is_some() && self.peek().kind == TokenKind::LBracket {
                break;
            }
            words.push(self.current.text.clone());
            self.advance();
        }

        let mut args = Vec::new();
        let mut seen = BitSet::with_capacity(26);
        while self.current.line == self.previous.line {
            let key = match arg_key(&self.current) {
                Some(key) if self.peek().kind != TokenKind::Assign => key,
                _ => break,
            };
            let key_tok = self.current.clone();
            self.advance();
            let value = if self.accept(TokenKind::LBracket) {
                let ex = self.expression()?;
                self.expect(TokenKind::RBracket, "after argument value")?;
                Some(ex)
            } else {
                None
            };
            let slot = (key as u8 - b'A') as usize;
            if seen.put(slot) {
                self.warn(&key_tok, format!("argument {} given more than once", key));
            }
            args.push(GArg { key, value });
        }
        Ok(StmtKind::Gcode(words.join(" "), args))
    }

    // -- expressions --

    pub fn expression(&mut self) -> ParseResult<Expr> {
        self.nested("expression", Self::ternary)
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        let cond = self.binary(0)?;
        if self.accept(TokenKind::Question) {
            let then = self.expression()?;
            self.expect(TokenKind::Colon, "in conditional expression")?;
            let els = self.expression()?;
            Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(els)))
        } else {
            Ok(cond)
        }
    }

    fn binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let outer = self.depth;
        let result = self.binary_chain(min_prec);
        self.depth = outer;
        result
    }

    /// Precedence climbing over the binary operators.  Every operator and
    /// index applied makes the tree one level deeper, and counts against the
    /// nesting limit until the chain is done.
    fn binary_chain(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        while let Some(op) = binop(self.current.kind) {
            if op.precedence() < min_prec {
                break;
            }
            self.descend("expression")?;
            self.advance();
            let next_prec = if op.is_right_assoc() { op.precedence() } else { op.precedence() + 1 };
            let rhs = with_stack(|| self.binary(next_prec))?;
            lhs = Expr::Op(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current.kind {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Bang => UnOp::Not,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.nested("expression", Self::unary)?;
        Ok(Expr::Unop(op, Box::new(operand)))
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut ex = self.primary()?;
        while self.current.kind == TokenKind::LBracket {
            self.descend("expression")?;
            self.advance();
            let index = self.expression()?;
            self.expect(TokenKind::RBracket, "after index")?;
            ex = Expr::Index(Box::new(ex), Box::new(index));
        }
        Ok(ex)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        use TokenKind::*;
        match self.current.kind {
            Number => {
                let n = self.current.number();
                self.advance();
                Ok(Expr::Num(n))
            }
            Ident | GcodeWord | Builtin => {
                let is_builtin = self.current.kind == Builtin;
                let name = self.current.text.clone();
                self.advance();
                if self.current.kind == LParen {
                    Ok(Expr::Call(name, self.call_args()?))
                } else if is_builtin {
                    Ok(Expr::Call(name, Vec::new()))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            LParen => {
                self.advance();
                let ex = self.expression()?;
                self.expect(RParen, "after expression")?;
                Ok(ex)
            }
            LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.accept(RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if self.accept(RBracket) {
                            break;
                        }
                        self.expect(Comma, "between array elements")?;
                    }
                }
                Ok(Expr::Array(items))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn call_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(TokenKind::LParen, "to start arguments")?;
        let mut args = Vec::new();
        if !self.accept(TokenKind::RParen) {
            loop {
                args.push(self.expression()?);
                if self.accept(TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma, "between arguments")?;
            }
        }
        Ok(args)
    }
}
