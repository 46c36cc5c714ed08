mod common;

use cxc::analyzer::Type;
use cxc::codegen::{Assembly, Codegen, Instruction, Label, Runtime};
use cxc::context::{CompilationContext, CompileOptions};
use cxc::error::CompileError;
use cxc::lexer::Lexer;
use cxc::parser::*;
use cxc::{compile, compile_in};

use common::{init_logger, run, Outcome};

fn output_of(input: &str) -> Vec<String> {
    init_logger();
    let asm = compile(input, CompileOptions::default()).unwrap();
    run(&asm).output
}

fn lines(expected: &[&str]) -> Vec<String> {
    expected.iter().map(|s| s.to_string()).collect()
}

fn entry_body(asm: &Assembly) -> &[Instruction] {
    let start = asm
        .text
        .iter()
        .position(|i| *i == Instruction::Label(Label::Entry))
        .unwrap();
    &asm.text[start + 1..]
}

#[test]
fn declared_types_are_recorded() {
    let mut ctx = CompilationContext::default();
    compile_in(
        &mut ctx,
        "var num n = 3; var str s = \"x\"; var log b = false; var inferred = \"y\";",
    )
    .unwrap();
    assert_eq!(ctx.symbol_table.type_of("n"), Some(Type::Number));
    assert_eq!(ctx.symbol_table.type_of("s"), Some(Type::String));
    assert_eq!(ctx.symbol_table.type_of("b"), Some(Type::Boolean));
    assert_eq!(ctx.symbol_table.type_of("inferred"), Some(Type::String));
}

#[test]
fn arithmetic_follows_precedence() {
    assert_eq!(
        output_of(
            "print 2 + 3 * 4 - 10 / 2;
             print 2 ^ 3 ^ 2;
             print (2 ^ 3) ^ 2;
             print (1 + 2) * 3;
             print 3 - 10;
             print -7 / 2;
             print 7 - -2;
             print 2 ^ -1;"
        ),
        lines(&["9", "512", "64", "9", "-7", "-3", "9", "0"])
    );
}

#[test]
fn arithmetic_over_variables() {
    assert_eq!(
        output_of("var a = 6; var b = 4; var c = a * b - a / b; print c; c = c ^ 2; print c;"),
        lines(&["23", "529"])
    );
}

#[test]
fn product_binds_tighter_than_sum() {
    let mut ctx = CompilationContext::default();
    let tokens = Lexer::tokenize("var x = 1 + 2 * 3;").unwrap();
    let program = Parser::new(tokens, &mut ctx).parse().unwrap();

    let NodeKind::VarDecl { init, .. } = ctx.ast.kind(program.head.unwrap()) else {
        panic!();
    };
    let NodeKind::BinaryOp {
        op: BinOpKind::Add,
        left,
        right,
    } = ctx.ast.kind(*init)
    else {
        panic!();
    };
    assert_eq!(ctx.ast.kind(*left), &NodeKind::NumberLiteral(1));
    let NodeKind::BinaryOp {
        op: BinOpKind::Mul,
        left,
        right,
    } = ctx.ast.kind(*right)
    else {
        panic!();
    };
    assert_eq!(ctx.ast.kind(*left), &NodeKind::NumberLiteral(2));
    assert_eq!(ctx.ast.kind(*right), &NodeKind::NumberLiteral(3));
}

#[test]
fn string_into_number_emits_nothing() {
    let result = compile("var num x = 0; x = \"hello\";", CompileOptions::default());
    assert!(matches!(
        result,
        Err(CompileError::TypeMismatch {
            expected: Type::Number,
            found: Type::String,
            ..
        })
    ));
}

#[test]
fn printing_undeclared_variable() {
    assert_eq!(
        compile("print x;", CompileOptions::default()),
        Err(CompileError::UndeclaredIdentifier("x".to_string()))
    );
}

#[test]
fn constant_division_by_zero() {
    assert_eq!(
        compile("var x = 4 / (2 - 2);", CompileOptions::default()),
        Err(CompileError::DivisionByZero)
    );
}

#[test]
fn semantic_errors_are_reported_together() {
    let err = compile(
        "var num n = 1; var str s = \"a\"; n = s; undefined(); print s - 1;",
        CompileOptions::default(),
    )
    .unwrap_err();
    let errors = err.errors();
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], CompileError::TypeMismatch { .. }));
    assert_eq!(
        errors[1],
        &CompileError::UndefinedFunction("undefined".to_string())
    );
    assert!(matches!(errors[2], CompileError::TypeMismatch { .. }));
}

#[test]
fn generation_is_repeatable() {
    let mut ctx = CompilationContext::default();
    let tokens = Lexer::tokenize(
        "var str a = \"first\"; print \"second\"; a = \"first\"; print a; print \"third\";",
    )
    .unwrap();
    let program = Parser::new(tokens, &mut ctx).parse().unwrap();

    let first = Codegen::new(&mut ctx).generate(program);
    let second = Codegen::new(&mut ctx).generate(program);
    assert_eq!(first, second);
    assert_eq!(first.strings, lines(&["first", "second", "third"]));
    assert_eq!(
        run(&first).output,
        lines(&["second", "first", "third"])
    );
}

#[test]
fn if_else_branches_to_else_label() {
    let asm = compile(
        "if (1 < 2) { print 1; } else { print 2; }",
        CompileOptions::default(),
    )
    .unwrap();
    let body = entry_body(&asm);

    let Instruction::JumpIfZero(Label::Else(id)) = &body[5] else {
        panic!("expected branch to else, got {:?}", body[5]);
    };
    assert_eq!(
        body[..5],
        [
            Instruction::LoadImm(2),
            Instruction::Push,
            Instruction::LoadImm(1),
            Instruction::PopScratch,
            Instruction::Compare(RelOpKind::LessThan),
        ]
    );
    assert_eq!(
        body[6..10],
        [
            Instruction::LoadImm(1),
            Instruction::CallRuntime(Runtime::PrintNum),
            Instruction::CallRuntime(Runtime::PrintNewline),
            Instruction::Jump(Label::EndIf(*id)),
        ]
    );
    assert_eq!(body[10], Instruction::Label(Label::Else(*id)));
    assert_eq!(run(&asm).output, lines(&["1"]));
}

#[test]
fn else_if_chain() {
    let program = "
        var x = 0;
        while (x < 4) {
            if (x == 0) { print \"zero\"; }
            else if (x == 1) { print \"one\"; }
            else { print x; }
            x = x + 1;
        }";
    assert_eq!(output_of(program), lines(&["zero", "one", "2", "3"]));
}

#[test]
fn false_while_skips_body() {
    for peephole in [false, true] {
        let asm = compile(
            "var i = 5; while (i < 3) { print i; i = i + 1; }",
            CompileOptions { peephole },
        )
        .unwrap();
        let first_branch = asm
            .text
            .iter()
            .find_map(|i| match i {
                Instruction::JumpIfZero(l) | Instruction::JumpUnless { target: l, .. } => Some(l),
                _ => None,
            })
            .unwrap();
        assert!(matches!(first_branch, Label::LoopEnd(_)));
        assert_eq!(run(&asm).output, Vec::<String>::new());
    }
}

#[test]
fn peephole_preserves_behaviour() {
    let programs = [
        "var i = 0; while (i < 5) { print i; i = i + 1; }",
        "var i = 10; while (i >= 7) { i = i - 1; } print i;",
        "for (var k = 0; k != 3; k = k + 1) { print k * k; }",
        "var n = 0; for (var j = 1; j <= 100; j = j * 2) { n = n + 1; } print n;",
        "var m = 0; while (m + 1 < 4 && true) { m = m + 1; } print m;",
    ];
    for program in programs {
        let plain = compile(program, CompileOptions::default()).unwrap();
        let optimised = compile(program, CompileOptions { peephole: true }).unwrap();
        assert_eq!(run(&plain), run(&optimised), "{}", program);
    }
}

#[test]
fn do_while_runs_body_first() {
    assert_eq!(
        output_of("var i = 0; do { print i; i = i + 1; } while (i < 3);"),
        lines(&["0", "1", "2"])
    );
    assert_eq!(
        output_of("var i = 9; do { print i; } while (false)"),
        lines(&["9"])
    );
}

#[test]
fn for_loop() {
    assert_eq!(
        output_of("for (var j = 0; j < 4; j = j + 1) { print j * j; }"),
        lines(&["0", "1", "4", "9"])
    );
}

#[test]
fn functions_take_arguments_and_return() {
    let program = "
        func fact(num n): num {
            var r = 1;
            while (n > 1) { r = r * n; n = n - 1; }
            return r;
        }
        func greet(str who) { print who; }
        func nothing() { }
        print fact(5);
        greet(\"hello\");
        print nothing();
        print fact(3) + fact(4);";
    assert_eq!(output_of(program), lines(&["120", "hello", "0", "30"]));
}

#[test]
fn values_print_by_type() {
    assert_eq!(
        output_of(
            "var s = \"it's\"; var b = 2 > 3; print s; print b; print b || 1 == 1; print true && b;"
        ),
        lines(&["it's", "false", "true", "false"])
    );
}

#[test]
fn top_level_return_sets_exit_status() {
    let asm = compile("print 1; return 7; print 2;", CompileOptions::default()).unwrap();
    assert_eq!(
        run(&asm),
        Outcome {
            output: lines(&["1"]),
            status: 7,
        }
    );

    let asm = compile("print 1;", CompileOptions::default()).unwrap();
    assert_eq!(run(&asm).status, 0);
}

#[test]
fn rendered_assembly() {
    let asm = compile(
        "func sq(num v): num { return v * v; } var x = sq(3); if (x > 5) { print \"big\"; }",
        CompileOptions::default(),
    )
    .unwrap();
    let text = asm.to_string();
    assert!(text.contains("var_v: dq 0\n"));
    assert!(text.contains("var_x: dq 0\n"));
    assert!(text.contains("str_0: db 'big', 0\n"));
    assert!(text.contains("fn_sq:\n  push rbp\n  mov rbp, rsp\n"));
    assert!(text.contains("  call fn_sq\n  pop rbx\n  mov [rel var_v], rbx\n  mov [rel var_x], rax\n"));
    assert!(text.contains("  setg al\n"));
    assert!(text.contains("  call print_str\n  call print_newline\n"));
    assert!(text.contains(".endif_"));
}

#[test]
fn context_can_be_reused_after_reset() {
    let mut ctx = CompilationContext::new(CompileOptions { peephole: true });
    let first = compile_in(&mut ctx, "var s = \"a\"; print s;").unwrap();
    assert_eq!(first.variables, lines(&["s"]));

    ctx.reset();
    assert!(ctx.ast.is_empty());
    assert!(ctx.literal_pool.is_empty());

    let second = compile_in(&mut ctx, "var s = 2; print s * 2;").unwrap();
    assert_eq!(second.strings, Vec::<String>::new());
    assert_eq!(run(&second).output, lines(&["4"]));
}

#[test]
fn recursion_keeps_each_activation_separate() {
    assert_eq!(
        output_of(
            "func fib(num n): num { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); }
             print fib(6);
             print fib(fib(5));"
        ),
        lines(&["8", "5"])
    );
    assert_eq!(
        output_of(
            "func down(num n) { if (n > 0) { print n; down(n - 1); print n; } }
             down(2);"
        ),
        lines(&["2", "1", "1", "2"])
    );
}

#[test]
fn recursion_keeps_locals() {
    assert_eq!(
        output_of(
            "func sum(num k): num { var acc = k; if (k > 0) { acc = acc + sum(k - 1); } return acc; }
             print sum(4);"
        ),
        lines(&["10"])
    );
}

#[test]
fn mutual_recursion() {
    assert_eq!(
        output_of(
            "func is_even(num n): log { if (n == 0) { return true; } return is_odd(n - 1); }
             func is_odd(num m): log { if (m == 0) { return false; } return is_even(m - 1); }
             print is_even(10);
             print is_odd(7);
             print is_even(3);"
        ),
        lines(&["true", "true", "false"])
    );
}

#[test]
fn parameter_names_share_the_flat_scope() {
    assert_eq!(
        compile(
            "func f(num x) { } func g(num x) { }",
            CompileOptions::default()
        ),
        Err(CompileError::Redeclaration("x".to_string()))
    );
}

#[test]
fn long_expressions_fail_cleanly() {
    let sum = vec!["1"; 200].join(" + ");
    assert_eq!(output_of(&format!("print {};", sum)), lines(&["200"]));

    let sum = vec!["1"; 10_000].join(" + ");
    assert_eq!(
        compile(&format!("var x = 0;\nprint {};", sum), CompileOptions::default()),
        Err(CompileError::NestingTooDeep {
            limit: MAX_NESTING,
            line: 2,
        })
    );
}
