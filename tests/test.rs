use std::{rc::Rc, sync::Once};
use toyc::{
    check::Checker,
    err::{Handler, SemanticErrorKind},
    parse::{
        ast::{BinOp, ExprKind, Prog, Stmt},
        Parser,
    },
    Compiler,
};

/// Setup function that is only run once, even if called multiple times.
fn setup() {
    static INIT: Once = Once::new();
    INIT.call_once(env_logger::init);
}

fn run_ok(src: &str) {
    setup();
    let mut c = Compiler::new();
    c.run(src).unwrap();
}

fn run_err(src: &str) {
    setup();
    let mut c = Compiler::new();
    assert!(c.run(src).is_err());
}

fn parse(src: &str) -> Prog {
    setup();
    let src: Rc<str> = src.into();
    let handler = Rc::new(Handler::new(&src));
    let mut parser = Parser::new(src, &handler);
    parser.parse().expect("program should parse")
}

fn parse_err(src: &str) -> Rc<Handler> {
    setup();
    let src: Rc<str> = src.into();
    let handler = Rc::new(Handler::new(&src));
    let mut parser = Parser::new(src, &handler);
    parser.parse().unwrap_err();
    assert!(handler.has_parse_err());
    handler
}

/// Parse, check, and collect the semantic diagnostic kinds in report order.
fn semantic_kinds(src: &str) -> Vec<SemanticErrorKind> {
    setup();
    let src: Rc<str> = src.into();
    let handler = Rc::new(Handler::new(&src));
    let mut parser = Parser::new(src, &handler);
    let prog = parser.parse().expect("program should parse");
    Checker::new(&handler).check(&prog).unwrap();
    handler.semantic_err_kinds()
}

#[test]
fn empty_function() {
    run_ok("fn main() { }");
}

#[test]
fn arithmetic_and_locals() {
    run_ok(
        r#"
        fn main() {
            let a = 10;
            let b = 20;
            let c = a + b * 2 - a / 5;
        }
    "#,
    );
}

#[test]
fn comments_including_nested_blocks() {
    run_ok(
        r#"
        // a line comment
        fn main() {
            /* outer /* nested */ still in the outer comment */
            let x = 1;
        }
    "#,
    );
}

#[test]
fn parsing_is_deterministic() {
    let src = r#"
        fn main(a: i32, mut b: i32) -> i32 {
            let t = (a, b, 3);
            let arr = [1, 2, 3];
            if a < b { return t.0; } else { return arr[0]; }
        }
    "#;
    assert_eq!(parse(src), parse(src));
}

#[test]
fn mul_binds_tighter_than_add() {
    let prog = parse("fn f() { let x = 1 + 2 * 3; }");
    let init = match &prog.funcs[0].body.stmts[0] {
        Stmt::VarDecl { init: Some(e), .. } => e,
        s => panic!("expected a declaration, got {:?}", s),
    };
    match &init.kind {
        ExprKind::Binary {
            op: BinOp::Add,
            right,
            ..
        } => {
            assert!(matches!(
                right.kind,
                ExprKind::Binary { op: BinOp::Mul, .. }
            ));
        }
        k => panic!("expected an addition at the root, got {:?}", k),
    }
}

#[test]
fn comparisons_chain_left_associatively() {
    let prog = parse("fn f(a: i32, b: i32, c: i32) { let x = a < b < c; }");
    let init = match &prog.funcs[0].body.stmts[0] {
        Stmt::VarDecl { init: Some(e), .. } => e,
        s => panic!("expected a declaration, got {:?}", s),
    };
    match &init.kind {
        ExprKind::Binary {
            op: BinOp::Lt,
            left,
            ..
        } => {
            assert!(matches!(
                left.kind,
                ExprKind::Binary { op: BinOp::Lt, .. }
            ));
        }
        k => panic!("expected a comparison at the root, got {:?}", k),
    }
}

#[test]
fn single_parenthesized_expr_is_not_a_tuple() {
    let prog = parse("fn f() { let x = (1); let y = (1, 2); }");
    let kind_of = |stmt: &Stmt| match stmt {
        Stmt::VarDecl { init: Some(e), .. } => match &e.kind {
            ExprKind::Paren(_) => "paren",
            ExprKind::Tuple(_) => "tuple",
            _ => "other",
        },
        _ => "other",
    };
    assert_eq!(kind_of(&prog.funcs[0].body.stmts[0]), "paren");
    assert_eq!(kind_of(&prog.funcs[0].body.stmts[1]), "tuple");
}

#[test]
fn unit_literal_is_rejected() {
    parse_err("fn f() { let x = (); }");
}

#[test]
fn unknown_token_stops_the_parse() {
    let handler = parse_err("fn f() { let x = 1 @ 2; }");
    assert!(handler.has_lex_err());
}

#[test]
fn unknown_multibyte_token_is_reported() {
    let handler = parse_err("fn main() { let x = 1 § 2; }");
    assert!(handler.has_lex_err());
}

#[test]
fn statement_position_garbage_is_reported() {
    parse_err("fn f() { -> }");
}

#[test]
fn else_chain_keeps_clause_order() {
    let prog = parse(
        r#"
        fn f(a: i32) {
            if a < 1 { } else if a < 2 { } else { }
        }
    "#,
    );
    let ifs = match &prog.funcs[0].body.stmts[0] {
        Stmt::If(ifs) => ifs,
        s => panic!("expected an if statement, got {:?}", s),
    };
    assert_eq!(ifs.else_clauses.len(), 2);
    assert!(ifs.else_clauses[0].cond.is_some());
    assert!(ifs.else_clauses[1].cond.is_none());
}

#[test]
fn control_flow_statements() {
    run_ok(
        r#"
        fn main() {
            let mut n = 0;
            while n < 10 {
                n = n + 1;
                if n == 5 { continue; }
            }
            for i in 0 .. 10 {
                let twice = i + i;
            }
            loop {
                break;
            }
        }
    "#,
    );
}

#[test]
fn loop_break_with_value() {
    run_ok(
        r#"
        fn main() {
            let x = loop {
                break 10;
            };
        }
    "#,
    );
}

#[test]
fn if_expression_requires_both_arms() {
    run_ok("fn f(a: i32) { let x = if a < 1 { 1 } else { 2 }; }");
    parse_err("fn f(a: i32) { let x = if a < 1 { 1 }; }");
}

#[test]
fn if_expression_arms_must_agree() {
    let kinds = semantic_kinds("fn f(a: i32) { let x = if a < 1 { 1 } else { }; }");
    assert_eq!(kinds, vec![SemanticErrorKind::TypeMismatch]);
}

#[test]
fn forward_references_resolve() {
    run_ok(
        r#"
        fn main() {
            let r = helper(1);
        }
        fn helper(x: i32) -> i32 {
            return x;
        }
    "#,
    );
}

#[test]
fn shadowing_redeclaration_is_allowed() {
    run_ok(
        r#"
        fn main() {
            let x = 1;
            let x = x + 1;
        }
    "#,
    );
}

#[test]
fn use_before_init_is_reported_once() {
    let kinds = semantic_kinds("fn main() { let x: i32; let y = x; }");
    assert_eq!(kinds, vec![SemanticErrorKind::UninitializedVariable]);
}

#[test]
fn assignment_initializes() {
    run_ok(
        r#"
        fn main() {
            let x: i32;
            x = 1;
            let y = x;
        }
    "#,
    );
}

#[test]
fn assignment_settles_an_unannotated_binding() {
    run_ok(
        r#"
        fn main() {
            let x;
            x = 1;
            let y = x;
        }
    "#,
    );
}

#[test]
fn unresolved_binding_is_an_inference_failure() {
    let kinds = semantic_kinds("fn main() { let x; }");
    assert_eq!(kinds, vec![SemanticErrorKind::TypeInferenceFailure]);
}

#[test]
fn undeclared_variable_is_reported() {
    let kinds = semantic_kinds("fn main() { let y = z; }");
    assert_eq!(kinds, vec![SemanticErrorKind::UndeclaredVariable]);
}

#[test]
fn inner_scope_bindings_do_not_leak() {
    let kinds = semantic_kinds(
        r#"
        fn main() {
            if 1 < 2 {
                let inner = 1;
            }
            let y = inner;
        }
    "#,
    );
    assert_eq!(kinds, vec![SemanticErrorKind::UndeclaredVariable]);
}

#[test]
fn outer_bindings_are_visible_inside() {
    run_ok(
        r#"
        fn main() {
            let outer = 1;
            while outer < 10 {
                let y = outer + 1;
            }
        }
    "#,
    );
}

#[test]
fn loop_variable_counts_as_initialized() {
    run_ok("fn main() { for i in 0 .. 3 { let y = i; } }");
}

#[test]
fn parameters_are_exempt_from_init_checking() {
    run_ok("fn f(a: i32) -> i32 { return a; }");
}

#[test]
fn arity_is_checked() {
    let kinds = semantic_kinds(
        r#"
        fn main() { helper(1, 2); }
        fn helper(x: i32) -> i32 { return x; }
    "#,
    );
    assert_eq!(kinds, vec![SemanticErrorKind::ArgCountMismatch]);
}

#[test]
fn undefined_call_still_checks_its_arguments() {
    let kinds = semantic_kinds("fn main() { ghost(w); }");
    assert_eq!(
        kinds,
        vec![
            SemanticErrorKind::UndefinedFunctionCall,
            SemanticErrorKind::UndeclaredVariable,
        ]
    );
}

#[test]
fn void_function_must_not_return_a_value() {
    let kinds = semantic_kinds("fn f() { return 1; }");
    assert_eq!(kinds, vec![SemanticErrorKind::VoidFuncReturnValue]);
}

#[test]
fn value_function_must_return_one() {
    let kinds = semantic_kinds("fn f() -> i32 { return; }");
    assert_eq!(kinds, vec![SemanticErrorKind::MissingReturnValue]);
}

#[test]
fn returning_a_void_call_is_a_type_mismatch() {
    let kinds = semantic_kinds(
        r#"
        fn v() { }
        fn f() -> i32 { return v(); }
    "#,
    );
    assert_eq!(kinds, vec![SemanticErrorKind::FuncReturnTypeMismatch]);
}

#[test]
fn assigning_to_an_undeclared_name_is_reported() {
    let kinds = semantic_kinds("fn main() { x = 1; }");
    assert_eq!(kinds, vec![SemanticErrorKind::AssignToUndeclaredVar]);
}

#[test]
fn compound_assignment_targets_are_rejected() {
    let kinds = semantic_kinds(
        r#"
        fn main() {
            let a = [1, 2, 3];
            a[0] = 5;
        }
    "#,
    );
    assert_eq!(kinds, vec![SemanticErrorKind::AssignToNonVariable]);
}

#[test]
fn references_and_element_accesses() {
    run_ok(
        r#"
        fn main() {
            let a = [1, 2, 3];
            let t = (1, 2);
            let r = &a;
            let m = &mut t;
            let x = a[1] + t.0 + *r;
        }
    "#,
    );
}

#[test]
fn composite_types_in_headers() {
    run_ok(
        r#"
        fn f(a: [i32; 3], b: (i32, i32), c: &i32, d: &mut [i32; 2]) -> i32 {
            return a[0] + b.1;
        }
    "#,
    );
}

#[test]
fn symbol_dump_lists_functions_and_scoped_variables() {
    setup();
    let out = Compiler::new()
        .run(
            r#"
            fn main() {
                let x = 1;
                if x < 2 {
                    let y = 2;
                }
            }
        "#,
        )
        .unwrap();
    let dump = out.table.dump();
    assert!(dump.contains("fn main: argc=0, ret=Null (deduced)"));
    assert!(dump.contains("var global::main::x: I32"));
    assert!(dump.contains("var global::main::if1::y: I32"));
}

#[test]
fn semantic_failure_is_an_error() {
    run_err("fn main() { let y = z; }");
}

#[test]
fn parse_failure_is_an_error() {
    run_err("fn main() { let = 1; }");
}
