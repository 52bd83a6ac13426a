use ggcode::diag::Severity;
use ggcode::eval::Evaluator;
use ggcode::{compile, parse, Compilation, Config, Emitter, RuntimeStrings};

fn strings() -> RuntimeStrings {
    RuntimeStrings::new("2024-01-01 00:00:00", "test.ggcode")
}

fn run_with(src: &str, config: &Config) -> Compilation {
    compile(src, config, &strings())
}

fn run(src: &str) -> Compilation {
    run_with(src, &Config::default())
}

/// Output lines after the preamble.
fn body(result: &Compilation) -> Vec<&str> {
    result.lines.iter().skip(2).map(String::as_str).collect()
}

fn messages(result: &Compilation) -> Vec<&str> {
    result.diagnostics.iter().map(|d| d.message.as_str()).collect()
}

#[test]
fn test_arithmetic() {
    let result = run("G0 X[2 + 3 * 4] Y[(2 + 3) * 4] Z[10 - 2 + 1] A[6 & 3]");
    assert_eq!(result.lines, ["%", "000", "N10 G0 X14.000 Y20.000 Z9.000 A2.000"]);
    assert!(result.diagnostics.is_empty());
    assert!(!result.has_errors);
}

#[test]
fn test_preamble_id() {
    let result = run("let id = 1234\nG0 X[1]");
    assert_eq!(&result.lines[..2], ["%", "1234"]);
}

#[test]
fn test_g1_folding() {
    let result = run("G1 X[1]\nG1 X[2]\nG1\nG0 X[3]\nG1 X[4]\nG1 Y[5]");
    assert_eq!(body(&result), [
        "N10 G1 X1.000",
        "N15 X2.000",
        "N20",
        "N25 G0 X3.000",
        "N30 G1 X4.000",
        "N35 Y5.000",
    ]);

    // without numbers there is nothing left to write
    let config = Config { line_numbers: false, ..Config::default() };
    assert_eq!(body(&run_with("G1 X[1]\nG1\nG1 X[2]", &config)), ["G1 X1.000", "X2.000"]);
}

#[test]
fn test_line_numbers_past_u32() {
    let config = Config { line_start: u32::MAX - 1, ..Config::default() };
    let result = run_with("G0 X[1]\nG0 X[2]\nG0 X[3]", &config);
    assert_eq!(body(&result), [
        "N4294967294 G0 X1.000",
        "N4294967299 G0 X2.000",
        "N4294967304 G0 X3.000",
    ]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_for_ranges() {
    let result = run("for i = 1..3 { G0 X[i] }\nfor i = 1..<3 { G0 Y[i] }");
    assert_eq!(body(&result), [
        "N10 G0 X1.000",
        "N15 G0 X2.000",
        "N20 G0 X3.000",
        "N25 G0 Y1.000",
        "N30 G0 Y2.000",
    ]);

    let result = run("for i = 3..1 step -1 { G0 X[i] }");
    assert_eq!(body(&result), ["N10 G0 X3.000", "N15 G0 X2.000", "N20 G0 X1.000"]);

    let result = run("for i = 0..1 step 0.25 { G0 X[i] }");
    assert_eq!(body(&result).len(), 5);

    let result = run("for i = 0..3 step 0 { G0 X[i] }");
    assert!(body(&result).is_empty());
    assert_eq!(messages(&result), ["for loop step must not be zero"]);
}

#[test]
fn test_for_variable_outlives_loop() {
    assert_eq!(body(&run("for i = 1..3 { }\nG0 X[i]")), ["N10 G0 X3.000"]);

    // an existing binding is updated in place
    let src = "let i = 7\n{\n    for i = 0..<2 { }\n}\nG0 X[i]";
    assert_eq!(body(&run(src)), ["N10 G0 X1.000"]);

    // a loop that never runs leaves it alone
    assert_eq!(body(&run("let i = 7\nfor i = 5..1 { }\nG0 X[i]")), ["N10 G0 X7.000"]);
}

#[test]
fn test_loop_faults() {
    let result = run("while [1] { G0 X[1] }\nG0 Y[1]");
    assert_eq!(body(&result), ["N10 G0 Y1.000"]);
    assert_eq!(messages(&result), ["while condition must be a number, got an array"]);

    let result = run("for i = [1]..3 { G0 X[i] }");
    assert!(body(&result).is_empty());
    assert_eq!(messages(&result), ["for loop start must be a number, got an array"]);

    let result = run("for i = 0..[2] step [1] { G0 X[i] }");
    assert!(body(&result).is_empty());
    assert_eq!(messages(&result), [
        "for loop end must be a number, got an array",
        "for loop step must be a number, got an array",
    ]);

    let result = run("for i = 0..10 ^ 400 { G0 X[i] }");
    assert!(body(&result).is_empty());
    assert_eq!(messages(&result), ["for loop bounds must be finite"]);

    // adding the step to 1e20 gives 1e20 again
    let result = run("for i = 10 ^ 20..10 ^ 20 * 2 { G0 X[1] }");
    assert_eq!(body(&result), ["N10 G0 X1.000"]);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].message.starts_with("for loop makes no progress from 1000"));
}

#[test]
fn test_notes() {
    let src = r#"let r = 5
let d = 2.5
note { Radius: [r], diameter [d] }
note {
    File [ggcode_file_name] at [time]

    Missing [missing]
}"#;
    let result = run(src);
    assert_eq!(body(&result), [
        "( Radius: 5, diameter 2.5 )",
        "(    File test.ggcode at 2024-01-01 00:00:00)",
        "(    Missing 0)",
    ]);
    assert!(result.diagnostics.is_empty());

    // only a trailing carriage return is dropped
    let result = run("let a = 1\nnote {\r\n  Part [a]\r\n   \r\n[ a ]\t\r\n}");
    assert_eq!(body(&result), ["(  Part 1)", "(0\t)"]);
}

#[test]
fn test_array_growth() {
    let src = r#"let arr = []
arr[5] = 9
for i = 0..<6 {
    G0 X[arr[i]]
}
G0 Y[arr[6]]"#;
    let result = run(src);
    let lines = body(&result);
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "N10 G0 X0.000");
    assert_eq!(lines[5], "N35 G0 X9.000");
    assert_eq!(lines[6], "N40 G0 Y0.000");
    assert_eq!(messages(&result), ["array index 6 out of bounds (length 6)"]);

    let result = run("let m = []\nm[1][2] = 7\nG0 X[m[1][2]] Y[m[0]]");
    assert_eq!(body(&result), ["N10 G0 X7.000 Y0.000"]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_scopes() {
    let src = r#"let a = 1
for i = 1..2 {
    let inner = 5
}
G0 X[inner] Y[a] Z[i]"#;
    let result = run(src);
    assert_eq!(body(&result), ["N10 G0 X0.000 Y1.000 Z2.000"]);
    assert_eq!(messages(&result), ["undefined variable 'inner'"]);
    assert_eq!(result.diagnostics[0].line, Some(5));

    // plain assignment of an unknown name creates a global
    let src = r#"function f() {
    g = 7
    let local = 3
    return 0
}
f()
G0 X[g] Y[local]"#;
    let result = run(src);
    assert_eq!(body(&result), ["N10 G0 X7.000 Y0.000"]);
    assert_eq!(messages(&result), ["undefined variable 'local'"]);

    // functions see the bindings of their callers
    let src = r#"function show() {
    G0 X[outer]
}
{
    let outer = 4
    show()
}"#;
    assert_eq!(body(&run(src)), ["N10 G0 X4.000"]);
}

#[test]
fn test_functions() {
    let src = r#"function add(a, b) {
    return a + b
}
function square(s) {
    G1 X[s] Y[0]
    G1 X[s] Y[s]
}
G0 X[add(1)] Y[add(1, 2, 3)]
square(2)
let Total = 3
G0 Z[Total]"#;
    let result = run(src);
    assert_eq!(body(&result), [
        "N10 G0 X1.000 Y3.000",
        "N15 G1 X2.000 Y0.000",
        "N20 X2.000 Y2.000",
        "N25 G0 Z3.000",
    ]);
    assert!(result.diagnostics.is_empty());

    let result = run("G0 X[nope(1)] Y[sqrt(16)] Z[PI > 3]");
    assert_eq!(body(&result), ["N10 G0 X0.000 Y4.000 Z1.000"]);
    assert_eq!(messages(&result), ["function 'nope' not found"]);

    let result = run("G0 X[sin(1, 2)] Y[pow(2)]");
    assert_eq!(body(&result), ["N10 G0 X0.000 Y0.000"]);
    assert_eq!(messages(&result), ["sin takes 1 argument(s), got 2", "pow takes 2 argument(s), got 1"]);
}

#[test]
fn test_recursion_limit() {
    let src = r#"function down(n) {
    if n <= 0 {
        return 0
    }
    return 1 + down(n - 1)
}
G0 X[down(99)]
G0 Y[down(100)]"#;
    let result = run(src);
    assert_eq!(body(&result), ["N10 G0 X99.000", "N15 G0 Y100.000"]);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].message.starts_with("maximum recursion depth 100 exceeded"));

    let src = r#"function ping(n) {
    return pong(n + 1)
}
function pong(n) {
    return ping(n + 1)
}
let r = 5
G0 X[ping(0)]"#;
    let program = parse::parse("test.ggcode", src).unwrap();
    let emitter = Emitter::new(Config::default(), strings());
    let mut rt = Evaluator::new(&Config::default());
    let emission = emitter.emit_with(&mut rt, &program).unwrap();
    assert_eq!(emission.lines[2], "N10 G0 X0.000");
    assert_eq!(emission.diagnostics.len(), 1);
    assert_eq!(rt.depth(), 0);
    assert_eq!(rt.level(), 0);
    assert!(rt.has_function("ping") && rt.has_function("pong"));

    // nothing leaks into the next compilation
    assert!(!run("G0 X[1]").has_errors);
}

#[test]
fn test_recursion_through_nested_blocks() {
    let src = "function f(n) { for a = 0..0 { for b = 0..0 { if n >= 0 { \
               while 1 { if 1 { return f(n + 1) } } } } } }  G0 X[f(0)]";
    let result = run(src);
    assert_eq!(body(&result), ["N10 G0 X0.000"]);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "maximum recursion depth 100 exceeded in call to 'f'");

    // a raised ceiling is limited by memory, not by the thread's stack
    let config = Config { max_recursion: 5_000, ..Config::default() };
    let src = r#"function down(n) {
    if n <= 0 {
        return 0
    }
    return 1 + down(n - 1)
}
G0 X[down(4000)]"#;
    let result = run_with(src, &config);
    assert_eq!(body(&result), ["N10 G0 X4000.000"]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_nesting_limit() {
    let src = format!("G0 X[{}1{}]", "(".repeat(50_000), ")".repeat(50_000));
    let result = run(&src);
    assert!(result.lines.is_empty());
    assert_eq!(messages(&result), ["expression nested too deeply"]);

    let src = format!("G0 X[1]\n{}{}", "{".repeat(50_000), "}".repeat(50_000));
    assert_eq!(messages(&run(&src)), ["blocks nested too deeply"]);

    let src = format!("G0 X[{}1{}]", "(".repeat(100), ")".repeat(100));
    assert_eq!(body(&run(&src)), ["N10 G0 X1.000"]);
}

#[test]
fn test_settings() {
    let src = r#"let decimalpoint = 2
G1 X[1]
nline = 0
G1 X[2]
decimalpoint = 9
G0 X[3]"#;
    let result = run(src);
    assert_eq!(body(&result), ["N10 G1 X1.00", "X2.00", "G0 X3.00"]);
    assert_eq!(messages(&result), ["invalid value 9 for setting 'decimalpoint'"]);

    let config = Config { line_numbers: false, decimals: 6, ..Config::default() };
    assert_eq!(body(&run_with("G0 X[1 / 3]", &config)), ["G0 X0.333333"]);
}

#[test]
fn test_assignment_operators() {
    let src = r#"let x = 3
x += 2
G0 X[x]
x *= 4
x -= 2
x /= 3
G0 X[x] Y[x > 4 ? 1 : 2]"#;
    assert_eq!(body(&run(src)), ["N10 G0 X5.000", "N15 G0 X6.000 Y1.000"]);

    let src = r#"let x = 3
x ^= 2
G0 X[x]
x <<= 2
G0 X[x]
x >>= 3
x &= 6
x |= 1
G0 X[x]"#;
    let result = run(src);
    assert_eq!(body(&result), ["N10 G0 X9.000", "N15 G0 X36.000", "N20 G0 X5.000"]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_power_and_shifts() {
    let src = "let a = 2 ^ 3\nG0 X[a] Y[2 ^ 3 ^ 2] Z[1 << 4]\nG0 X[256 >> 2 + 1] Y[-8 >> 1] Z[2 * 3 ^ 2]";
    let result = run(src);
    assert_eq!(body(&result), [
        "N10 G0 X8.000 Y512.000 Z16.000",
        "N15 G0 X32.000 Y-4.000 Z18.000",
    ]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_while_limit() {
    let config = Config { max_while_iterations: 10, ..Config::default() };
    let src = "let n = 0\nwhile 1 {\n    n += 1\n}\nG0 X[n]";
    let result = run_with(src, &config);
    assert_eq!(body(&result), ["N10 G0 X10.000"]);
    assert_eq!(messages(&result), ["while loop exceeded 10 iterations, aborting loop"]);
    assert_eq!(result.diagnostics[0].line, Some(2));
}

#[test]
fn test_runtime_faults() {
    let result = run("G0 X[1 / 0]");
    assert_eq!(body(&result), ["N10 G0 X0.000"]);
    assert_eq!(result.diagnostics.len(), 2);
    assert!(result.has_errors);

    let result = run("if [1] { G0 X[1] }\nG0 Y[1]");
    assert_eq!(body(&result), ["N10 G0 Y1.000"]);
    assert_eq!(messages(&result), ["if condition must be a number, got an array"]);

    let result = run("return 5\nG0 X[1]");
    assert_eq!(body(&result), ["N10 G0 X1.000"]);
    assert_eq!(result.diagnostics[0].severity, Severity::Warning);
    assert!(!result.has_errors);

    // oversized arrays abort the run
    let result = run("let a = []\na[2000000] = 1");
    assert!(result.lines.is_empty());
    assert!(result.has_errors);
    let last = result.diagnostics.last().unwrap();
    assert_eq!(last.message, "array of 2000001 elements exceeds the limit of 1000000");
    assert_eq!(last.line, Some(2));
}

#[test]
fn test_syntax_error() {
    let result = run("G0 X[1");
    assert!(result.lines.is_empty());
    assert!(result.has_errors);
    assert_eq!(result.diagnostics.len(), 1);
    let diag = &result.diagnostics[0];
    assert_eq!((diag.line, diag.column), (Some(1), Some(7)));
    assert_eq!(diag.excerpt.as_deref(), Some("G0 X[1\n      ^"));
}

#[test]
fn test_repeatable() {
    let src = "let r = 5\nfor i = 0..<3 { G1 X[r * cos(i)] Y[r * sin(i)] }\nnote { [time] }";
    assert_eq!(run(src), run(src));

    let program = parse::parse("test.ggcode", src).unwrap();
    let emitter = Emitter::new(Config::default(), strings());
    assert_eq!(emitter.emit(&program).unwrap(), emitter.emit(&program).unwrap());

    let mut first = Evaluator::new(&Config::default());
    let mut second = Evaluator::new(&Config::default());
    first.reset();
    second.reset();
    assert_eq!(emitter.emit_with(&mut first, &program).unwrap(),
               emitter.emit_with(&mut second, &program).unwrap());
}

#[test]
fn test_evaluator_reuse() {
    let program = parse::parse("test.ggcode", "G0 X[counter]\ncounter = 1").unwrap();
    let emitter = Emitter::new(Config::default(), strings());
    let mut rt = Evaluator::new(&Config::default());

    assert!(emitter.emit_with(&mut rt, &program).unwrap().has_errors());
    // the variable survives into the second run
    let second = emitter.emit_with(&mut rt, &program).unwrap();
    assert!(!second.has_errors());
    assert_eq!(second.lines[2], "N10 G0 X1.000");

    rt.reset();
    assert!(rt.get_var("counter").is_none());
    assert!(emitter.emit_with(&mut rt, &program).unwrap().has_errors());
}

#[test]
fn test_stats_and_sinks() {
    let program = parse::parse("test.ggcode", "let a = 1\nfor i = 0..<3 {\n    G0 X[i]\n}").unwrap();
    let emission = Emitter::new(Config::default(), strings()).emit(&program).unwrap();
    assert_eq!(emission.stats.statements, 5);
    assert_eq!(emission.stats.lines, 5);

    let mut lines: Vec<String> = Vec::new();
    emission.write_to(&mut lines);
    assert_eq!(lines, emission.lines);
    assert_eq!(emission.text(),
               "%\n000\nN10 G0 X0.000\nN15 G0 X1.000\nN20 G0 X2.000\n");
}
