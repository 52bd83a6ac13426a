use ggcode::lexer::{Lexer, TokenKind};
use TokenKind::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    Lexer::new(src).map(|t| t.kind).collect()
}

fn texts(src: &str) -> Vec<String> {
    Lexer::new(src).map(|t| t.text).collect()
}

#[test]
fn test_numbers() {
    // extra decimal points are dropped
    assert_eq!(texts("1.2.3"), ["1.23"]);
    assert_eq!(Lexer::new("1.2.3").next_token().number(), 1.23);

    assert_eq!(kinds("1..3"), [Number, Range, Number]);
    assert_eq!(kinds("0..<5"), [Number, RangeExcl, Number]);
    assert_eq!(kinds("a...b"), [Ident, Ellipsis, Ident]);
}

#[test]
fn test_negative_literals() {
    assert_eq!(kinds("x = -2"), [Ident, Assign, Number]);
    assert_eq!(texts("x = -2")[2], "-2");
    assert_eq!(kinds("x - 2"), [Ident, Minus, Number]);
    assert_eq!(kinds("x-2"), [Ident, Minus, Number]);
    assert_eq!(kinds("5 -3"), [Number, Minus, Number]);
    assert_eq!(texts("(-1.5)"), ["(", "-1.5", ")"]);
    assert_eq!(texts("[1, -2]"), ["[", "1", ",", "-2", "]"]);
    // no literal to fold into
    assert_eq!(kinds("-a"), [Minus, Ident]);
}

#[test]
fn test_words() {
    assert_eq!(kinds("G1 M3 Total TAU tool X sin"),
               [GcodeWord, GcodeWord, GcodeWord, Builtin, Ident, Ident, Builtin]);
    assert_eq!(kinds("let for while if else note function return"),
               [Let, For, While, If, Else, Note, Function, Return]);
    assert_eq!(kinds("letter _x step"), [Ident, Ident, Ident]);
}

#[test]
fn test_operators() {
    assert_eq!(kinds("== != <= >= && || & | ! ? : < > ="),
               [Eq, Ne, Le, Ge, AndAnd, OrOr, Amp, Pipe, Bang, Question, Colon, Lt, Gt, Assign]);
    assert_eq!(kinds("a += 1; b -= 2 c *= 3 d /= 4"),
               [Ident, PlusAssign, Number, Ident, MinusAssign, Number,
                Ident, StarAssign, Number, Ident, SlashAssign, Number]);
    assert_eq!(kinds("^ << >> ^= &= |= <<= >>= <= >="),
               [Caret, Shl, Shr, CaretAssign, AmpAssign, PipeAssign, ShlAssign, ShrAssign, Le, Ge]);
    assert_eq!(texts("x << -2"), ["x", "<<", "-2"]);
    assert_eq!(texts("2^-1"), ["2", "^", "-1"]);
    assert_eq!(kinds("f(a, b)[0] { }"),
               [Ident, LParen, Ident, Comma, Ident, RParen, LBracket, Number, RBracket,
                LBrace, RBrace]);
}

#[test]
fn test_comments_and_positions() {
    let mut lexer = Lexer::new("// line comment\n/* block\nspanning */ x\n  y");
    let x = lexer.next_token();
    assert_eq!((x.kind, x.text.as_str(), x.line, x.column), (Ident, "x", 3, 13));
    let y = lexer.next_token();
    assert_eq!((y.line, y.column), (4, 3));

    // an unterminated block comment runs to the end
    assert!(kinds("a /* b c").len() == 1);
    assert_eq!(kinds("a / b"), [Ident, Slash, Ident]);
}

#[test]
fn test_unknown_and_eof() {
    let mut lexer = Lexer::new("é @ x");
    let tok = lexer.next_token();
    assert_eq!((tok.kind, tok.text.as_str()), (Unknown, "é"));
    assert_eq!(lexer.next_token().kind, Unknown);
    let x = lexer.next_token();
    assert_eq!((x.kind, x.column), (Ident, 5));
    assert_eq!(lexer.next_token().kind, Eof);
    assert_eq!(lexer.next_token().kind, Eof);
}

#[test]
fn test_peek_and_raw_block() {
    let mut lexer = Lexer::new("note { a [b] {nested} } G0");
    assert_eq!(lexer.peek_token().kind, Note);
    assert_eq!(lexer.next_token().kind, Note);
    assert_eq!(lexer.next_token().kind, LBrace);
    assert_eq!(lexer.raw_block(), Some(" a [b] {nested} "));
    assert_eq!(lexer.next_token().text, "G0");

    let mut lexer = Lexer::new("{ open");
    lexer.next_token();
    assert_eq!(lexer.raw_block(), None);
}
