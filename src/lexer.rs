// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Pull-based tokenizer for GGcode source.

use std::str::FromStr;
use strum_macros::{Display, EnumString};

use crate::eval::Builtin;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumString)]
pub enum TokenKind {
    Number,
    Ident,
    Builtin,
    GcodeWord,

    // keywords
    #[strum(serialize = "let")]
    Let,
    #[strum(serialize = "for")]
    For,
    #[strum(serialize = "while")]
    While,
    #[strum(serialize = "if")]
    If,
    #[strum(serialize = "else")]
    Else,
    #[strum(serialize = "note")]
    Note,
    #[strum(serialize = "function")]
    Function,
    #[strum(serialize = "return")]
    Return,

    // operators
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "+=")]
    PlusAssign,
    #[strum(serialize = "-=")]
    MinusAssign,
    #[strum(serialize = "*=")]
    StarAssign,
    #[strum(serialize = "/=")]
    SlashAssign,
    #[strum(serialize = "^=")]
    CaretAssign,
    #[strum(serialize = "&=")]
    AmpAssign,
    #[strum(serialize = "|=")]
    PipeAssign,
    #[strum(serialize = "<<=")]
    ShlAssign,
    #[strum(serialize = ">>=")]
    ShrAssign,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "&&")]
    AndAnd,
    #[strum(serialize = "||")]
    OrOr,
    #[strum(serialize = "&")]
    Amp,
    #[strum(serialize = "|")]
    Pipe,
    #[strum(serialize = "^")]
    Caret,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "?")]
    Question,
    #[strum(serialize = ":")]
    Colon,

    // delimiters
    #[strum(serialize = "(")]
    LParen,
    #[strum(serialize = ")")]
    RParen,
    #[strum(serialize = "{")]
    LBrace,
    #[strum(serialize = "}")]
    RBrace,
    #[strum(serialize = "[")]
    LBracket,
    #[strum(serialize = "]")]
    RBracket,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = "..")]
    Range,
    #[strum(serialize = "..<")]
    RangeExcl,
    #[strum(serialize = "...")]
    Ellipsis,

    Unknown,
    #[strum(serialize = "end of input")]
    Eof,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(self, Let | For | While | If | Else | Note | Function | Return)
    }

    pub fn is_compound_assign(self) -> bool {
        use TokenKind::*;
        matches!(self, PlusAssign | MinusAssign | StarAssign | SlashAssign | CaretAssign |
                 AmpAssign | PipeAssign | ShlAssign | ShrAssign)
    }

    /// After one of these, a `-` directly before a digit is a negative literal.
    fn folds_sign(self) -> bool {
        use TokenKind::*;
        matches!(self, Plus | Minus | Star | Slash | Assign | Eq | Ne | Lt | Le |
                 Gt | Ge | AndAnd | OrOr | Amp | Pipe | Caret | Shl | Shr | Bang |
                 Question | Colon | LParen | LBracket | Comma) || self.is_compound_assign()
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text; for numbers, the repaired literal.
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn number(&self) -> f64 {
        self.text.parse().unwrap_or(0.)
    }
}

/// Tokenizer state.  Cloning the lexer is how lookahead is done.
#[derive(Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    last: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0, line: 1, column: 1, last: None }
    }

    pub fn source(&self) -> &'a str {
        self.src
    }

    /// Return the next token without consuming it.
    pub fn peek_token(&self) -> Token {
        self.clone().next_token()
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        let kind = self.scan();
        let text = match kind {
            TokenKind::Number => self.number_text(start),
            TokenKind::Eof => String::new(),
            _ => self.src[start..self.pos].to_string(),
        };
        self.last = Some(kind);
        Token { kind, text, line, column }
    }

    /// Capture the raw text up to the `}` that closes an already consumed `{`.
    ///
    /// Returns `None` if the input ends first.
    pub fn raw_block(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let mut depth = 1;
        while let Some(c) = self.peek_char() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let body = &self.src[start..self.pos];
                        self.bump();
                        self.last = Some(TokenKind::RBrace);
                        return Some(body);
                    }
                }
                _ => (),
            }
            self.bump();
        }
        None
    }

    // -- private API --

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek_byte_at(0), self.peek_byte_at(1)) {
                (Some(b' '), _) | (Some(b'\t'), _) | (Some(b'\r'), _) |
                (Some(b'\n'), _) | (Some(b';'), _) => self.bump(),
                (Some(b'/'), Some(b'/')) => {
                    while !matches!(self.peek_char(), None | Some('\n')) {
                        self.bump();
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    self.bump_n(2);
                    loop {
                        match (self.peek_byte_at(0), self.peek_byte_at(1)) {
                            (None, _) => break,
                            (Some(b'*'), Some(b'/')) => { self.bump_n(2); break; }
                            _ => self.bump(),
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn starts_number(&self, offset: usize) -> bool {
        match self.peek_byte_at(offset) {
            Some(b) if b.is_ascii_digit() => true,
            Some(b'.') => matches!(self.peek_byte_at(offset + 1), Some(b) if b.is_ascii_digit()),
            _ => false,
        }
    }

    fn scan(&mut self) -> TokenKind {
        use TokenKind::*;

        let c = match self.peek_char() {
            None => return Eof,
            Some(c) => c,
        };
        let next = self.peek_byte_at(1);
        let sign_allowed = self.last.map_or(true, TokenKind::folds_sign);

        if self.starts_number(0) || (c == '-' && sign_allowed && self.starts_number(1)) {
            self.scan_number();
            return Number;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return self.scan_word();
        }

        let (kind, len) = match (c, next) {
            ('.', Some(b'.')) => match self.peek_byte_at(2) {
                Some(b'.') => (Ellipsis, 3),
                Some(b'<') => (RangeExcl, 3),
                _ => (Range, 2),
            },
            ('<', Some(b'<')) => match self.peek_byte_at(2) {
                Some(b'=') => (ShlAssign, 3),
                _ => (Shl, 2),
            },
            ('>', Some(b'>')) => match self.peek_byte_at(2) {
                Some(b'=') => (ShrAssign, 3),
                _ => (Shr, 2),
            },
            ('=', Some(b'=')) => (Eq, 2),
            ('!', Some(b'=')) => (Ne, 2),
            ('<', Some(b'=')) => (Le, 2),
            ('>', Some(b'=')) => (Ge, 2),
            ('&', Some(b'&')) => (AndAnd, 2),
            ('|', Some(b'|')) => (OrOr, 2),
            ('+', Some(b'=')) => (PlusAssign, 2),
            ('-', Some(b'=')) => (MinusAssign, 2),
            ('*', Some(b'=')) => (StarAssign, 2),
            ('/', Some(b'=')) => (SlashAssign, 2),
            ('^', Some(b'=')) => (CaretAssign, 2),
            ('&', Some(b'=')) => (AmpAssign, 2),
            ('|', Some(b'=')) => (PipeAssign, 2),
            ('.', _) => (Dot, 1),
            ('+', _) => (Plus, 1),
            ('-', _) => (Minus, 1),
            ('*', _) => (Star, 1),
            ('/', _) => (Slash, 1),
            ('=', _) => (Assign, 1),
            ('<', _) => (Lt, 1),
            ('>', _) => (Gt, 1),
            ('&', _) => (Amp, 1),
            ('|', _) => (Pipe, 1),
            ('^', _) => (Caret, 1),
            ('!', _) => (Bang, 1),
            ('?', _) => (Question, 1),
            (':', _) => (Colon, 1),
            ('(', _) => (LParen, 1),
            (')', _) => (RParen, 1),
            ('{', _) => (LBrace, 1),
            ('}', _) => (RBrace, 1),
            ('[', _) => (LBracket, 1),
            (']', _) => (RBracket, 1),
            (',', _) => (Comma, 1),
            _ => (Unknown, 1),
        };
        self.bump_n(len);
        kind
    }

    fn scan_number(&mut self) {
        if self.peek_char() == Some('-') {
            self.bump();
        }
        while let Some(b) = self.peek_byte_at(0) {
            if b.is_ascii_digit() {
                self.bump();
            } else if b == b'.' && self.peek_byte_at(1) != Some(b'.') {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Keep the first decimal point of a literal and drop any further ones.
    fn number_text(&self, start: usize) -> String {
        let mut seen_dot = false;
        self.src[start..self.pos].chars().filter(|&c| {
            if c == '.' {
                let keep = !seen_dot;
                seen_dot = true;
                keep
            } else {
                true
            }
        }).collect()
    }

    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        let word = &self.src[start..self.pos];
        match TokenKind::from_str(word) {
            Ok(kind) if kind.is_keyword() => kind,
            _ if Builtin::from_str(word).is_ok() => TokenKind::Builtin,
            _ if word.starts_with(|c| c == 'G' || c == 'M' || c == 'T') => TokenKind::GcodeWord,
            _ => TokenKind::Ident,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    /// Iterates over all tokens up to, but not including, the end of input.
    fn next(&mut self) -> Option<Token> {
        let tok = self.next_token();
        if tok.kind == TokenKind::Eof { None } else { Some(tok) }
    }
}
