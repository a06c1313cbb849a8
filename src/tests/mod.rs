//! End-to-end behaviour of state expressions and type clauses over the real
//! parser and checker.

use crate::language::{
    ast::*,
    clauses::{ClauseKind, ClauseKindDescriptor, ClauseRegistry},
    errors::CODE_BAD_CONSTRUCT,
    parser::{parse_unit, ParsedUnit},
    typecheck::{
        check_unit, context::ContextHost, CheckOptions, Checker, DiagnosticCategory, TypeError,
        TypeErrorKind,
    },
    types::Type,
};

fn parse_clean(registry: &ClauseRegistry, source: &str) -> ParsedUnit {
    let parsed = parse_unit(registry, source);
    assert!(parsed.errors.is_empty(), "syntax errors in {source}: {:?}", parsed.errors);
    parsed
}

fn check(registry: &ClauseRegistry, unit: &CompilationUnit) -> Vec<TypeError> {
    check_unit(registry, unit, CheckOptions::default()).expect("checker invariants hold")
}

fn categories(errors: &[TypeError]) -> Vec<DiagnosticCategory> {
    errors.iter().map(TypeError::category).collect()
}

fn collect_expr<'a>(expr: &'a Expr, out: &mut Vec<&'a InvocationNode>) {
    match expr {
        Expr::State(node) => {
            out.push(node);
            node.arguments.iter().for_each(|arg| collect_expr(arg, out));
        }
        Expr::Binary { left, right, .. } => {
            collect_expr(left, out);
            collect_expr(right, out);
        }
        Expr::Unary { expr, .. } => collect_expr(expr, out),
        Expr::FieldAccess { base, .. } => collect_expr(base, out),
        Expr::Call { callee, args, .. } => {
            collect_expr(callee, out);
            args.iter().for_each(|arg| collect_expr(arg, out));
        }
        Expr::Identifier(_)
        | Expr::Int(..)
        | Expr::Bool(..)
        | Expr::Result(_)
        | Expr::Error(_) => {}
    }
}

fn collect_statement<'a>(statement: &'a Statement, out: &mut Vec<&'a InvocationNode>) {
    match statement {
        Statement::Local(decl) | Statement::Ghost { decl, .. } => {
            decl.init.iter().for_each(|init| collect_expr(init, out));
        }
        Statement::Assign { value, .. } => collect_expr(value, out),
        Statement::Labeled { body, .. } => collect_statement(body, out),
        Statement::Clause(clause) => collect_expr(&clause.expr, out),
        Statement::Return { value, .. } => value.iter().for_each(|v| collect_expr(v, out)),
        Statement::Expr(expr) => collect_expr(expr, out),
        Statement::Block(block) => block
            .statements
            .iter()
            .for_each(|statement| collect_statement(statement, out)),
        Statement::Error(_) => {}
    }
}

/// Every state invocation of the unit, outermost first, in source order.
fn state_nodes(unit: &CompilationUnit) -> Vec<&InvocationNode> {
    let mut out = Vec::new();
    for member in unit.classes.iter().flat_map(|class| &class.members) {
        match member {
            Member::Field(field) => field.init.iter().for_each(|init| collect_expr(init, &mut out)),
            Member::Clause(clause) => collect_expr(&clause.expr, &mut out),
            Member::Method(method) => {
                for clause in method.spec_cases.iter().flat_map(|case| &case.clauses) {
                    collect_expr(&clause.expr, &mut out);
                }
                for statement in &method.body.statements {
                    collect_statement(statement, &mut out);
                }
            }
        }
    }
    out
}

/// A class with an `int x` field where `expr` sits in a clause of `kind`.
fn place(kind: ClauseKind, expr: &str) -> Option<String> {
    let keyword = kind.keyword();
    let source = match kind {
        ClauseKind::TypeClause(_) => format!("class C {{ int x; {keyword} {expr} == 0; }}"),
        ClauseKind::MethodSpec(_) => {
            format!("class C {{ int x; {keyword} {expr} == 0; void m() {{ L: x = 1; }} }}")
        }
        ClauseKind::Statement(_) => {
            format!("class C {{ int x; void m() {{ L: x = 1; {keyword} {expr} == 0; }} }}")
        }
        ClauseKind::Declaration => {
            format!("class C {{ int x; void m() {{ L: x = 1; {keyword} int g = {expr}; }} }}")
        }
        ClauseKind::State(_) => return None,
    };
    Some(source)
}

fn clause_kinds(registry: &ClauseRegistry) -> Vec<ClauseKindDescriptor> {
    registry
        .iter()
        .filter(|descriptor| descriptor.state_keyword().is_none())
        .copied()
        .collect()
}

#[test]
fn unlabeled_state_outside_clauses_is_the_argument_type() {
    let registry = ClauseRegistry::standard();
    let parsed = parse_clean(
        &registry,
        r"class C { int x; boolean b; int y = \old(x); boolean c = \past(b); }",
    );
    assert!(check(&registry, &parsed.unit).is_empty());
    let types: Vec<_> = state_nodes(&parsed.unit).iter().map(|n| n.ty().cloned()).collect();
    assert_eq!(types, [Some(Type::Int), Some(Type::Boolean)]);
}

#[test]
fn entry_state_is_rejected_wherever_the_clause_forbids_it() {
    let registry = ClauseRegistry::standard();
    let mut exercised = 0;
    for descriptor in clause_kinds(&registry) {
        if descriptor.accepts_prev_entry_state() {
            continue;
        }
        for payload in [r"\pre(x)", r"\pre(x + true)", r"\pre(nowhere)"] {
            let Some(source) = place(descriptor.kind, payload) else {
                continue;
            };
            let parsed = parse_clean(&registry, &source);
            let errors = check(&registry, &parsed.unit);
            assert_eq!(
                categories(&errors),
                [DiagnosticCategory::ContextLegality],
                "{source}"
            );
            let nodes = state_nodes(&parsed.unit);
            assert_eq!(nodes[0].ty(), Some(&Type::Error), "{source}");
            exercised += 1;
        }
    }
    // invariant, constraint, axiom, initially, requires, ghost
    assert_eq!(exercised, 6 * 3);
}

#[test]
fn unlabeled_old_follows_the_capability_flag() {
    let registry = ClauseRegistry::standard();
    for descriptor in clause_kinds(&registry) {
        let Some(source) = place(descriptor.kind, r"\old(x)") else {
            continue;
        };
        let parsed = parse_clean(&registry, &source);
        let errors = check(&registry, &parsed.unit);
        let ty = state_nodes(&parsed.unit)[0].ty().cloned();

        if descriptor.accepts_unlabeled_prev_state() || descriptor.kind.is_declaration() {
            assert!(errors.is_empty(), "{source}: {errors:?}");
            assert_eq!(ty, Some(Type::Int), "{source}");
        } else {
            assert_eq!(categories(&errors), [DiagnosticCategory::ContextLegality]);
            assert_eq!(ty, Some(Type::Error), "{source}");
        }
    }
}

#[test]
fn labeled_old_and_past_agree() {
    let registry = ClauseRegistry::standard();
    let parsed = parse_clean(
        &registry,
        r"class C {
            int x;
            void m() {
                int local = 1;
                L: x = 2;
                assert \old(x, L) == \past(x, L);
                assume \old(local, L) == \past(local, L);
            }
        }",
    );
    assert!(check(&registry, &parsed.unit).is_empty());
    let types: Vec<_> = state_nodes(&parsed.unit).iter().map(|n| n.ty().cloned()).collect();
    assert_eq!(types, vec![Some(Type::Int); 4]);
}

#[test]
fn unresolvable_label_is_an_error_under_every_clause_kind() {
    let registry = ClauseRegistry::standard();
    for descriptor in clause_kinds(&registry) {
        for keyword in [r"\old", r"\past"] {
            let Some(source) = place(descriptor.kind, &format!("{keyword}(x, Nowhere)")) else {
                continue;
            };
            let parsed = parse_clean(&registry, &source);
            let errors = check(&registry, &parsed.unit);
            assert!(
                categories(&errors).contains(&DiagnosticCategory::LabelResolution),
                "{source}: {errors:?}"
            );
            assert_eq!(state_nodes(&parsed.unit)[0].ty(), Some(&Type::Error));
        }
    }
}

#[test]
fn resolution_is_idempotent() {
    let registry = ClauseRegistry::standard();
    let parsed = parse_clean(
        &registry,
        r"class C {
            int x;
            invariant \pre(x) > 0;
            ensures \old(x) == x;
            void m() { L: x = 1; assert \old(x, L) == 0 && \old(x, M) == 0; }
        }",
    );
    let first = check(&registry, &parsed.unit);
    let types_first: Vec<_> = state_nodes(&parsed.unit).iter().map(|n| n.ty().cloned()).collect();
    let second = check(&registry, &parsed.unit);
    let types_second: Vec<_> = state_nodes(&parsed.unit).iter().map(|n| n.ty().cloned()).collect();
    assert_eq!(first, second);
    assert_eq!(types_first, types_second);
    assert_eq!(first.len(), 2);
}

#[test]
fn every_push_is_popped_on_degraded_paths() {
    let registry = ClauseRegistry::standard();
    let parsed = parse_unit(
        &registry,
        r"class C {
            int x;
            invariant \pre(\old(x, L), \result) > \past();
            requires \old(\pre(x)) == \old(x, y, z);
            int m() {
                assert \old(\old(x, Q), \pre(x));
                ghost int g = \pre(\old(nowhere));
                return \old(x;
            }
        }",
    );
    let mut checker = Checker::new(&registry, CheckOptions::default());
    let errors = checker.check(&parsed.unit).expect("checker invariants hold");
    assert!(!errors.is_empty());
    let contexts = checker.contexts();
    assert!(contexts.push_count() > 0);
    assert_eq!(contexts.push_count(), contexts.pop_count());
    assert_eq!(contexts.depth(), 0);
}

#[test]
fn entry_state_with_two_arguments_attributes_nothing() {
    let registry = ClauseRegistry::standard();
    for descriptor in clause_kinds(&registry) {
        let Some(source) = place(descriptor.kind, r"\pre(unknown, alsoUnknown)") else {
            continue;
        };
        let parsed = parse_clean(&registry, &source);
        let errors = check(&registry, &parsed.unit);
        assert_eq!(
            errors[0].kind,
            TypeErrorKind::OneArgument {
                keyword: "\\pre",
                found: 2
            },
            "{source}"
        );
        // Neither argument is looked up.
        assert!(errors
            .iter()
            .all(|err| !matches!(err.kind, TypeErrorKind::UnknownSymbol(_))));
        assert_eq!(state_nodes(&parsed.unit)[0].ty(), Some(&Type::Error));
    }
}

#[test]
fn invariant_over_old_field_is_int() {
    let registry = ClauseRegistry::standard();
    let parsed = parse_clean(&registry, r"class Counter { int count; invariant \old(count) <= count; }");
    assert!(check(&registry, &parsed.unit).is_empty());
    let nodes = state_nodes(&parsed.unit);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].ty(), Some(&Type::Int));
}

#[test]
fn broken_constraint_costs_one_diagnostic() {
    let registry = ClauseRegistry::standard();
    let parsed = parse_unit(
        &registry,
        r"class C {
            int count;
            constraint count >= \old(count) + ;
            int after;
            invariant after >= 0;
        }",
    );
    assert_eq!(parsed.errors.len(), 1);
    assert_eq!(parsed.errors[0].code, Some(CODE_BAD_CONSTRUCT));

    let class = &parsed.unit.classes[0];
    assert!(class.fields().any(|field| field.name.name == "after"));
    assert_eq!(class.clauses().count(), 2);

    // The placeholder body stays quiet in the checker.
    assert!(check(&registry, &parsed.unit).is_empty());
}

#[test]
fn ghost_field_rejects_unlabeled_old_outside_methods() {
    let registry = ClauseRegistry::standard();
    let parsed = parse_clean(&registry, r"class C { int x; ghost int g = \old(x); }");
    let errors = check(&registry, &parsed.unit);
    assert_eq!(categories(&errors), [DiagnosticCategory::ContextLegality]);
    let nodes = state_nodes(&parsed.unit);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].ty(), Some(&Type::Error));
}
