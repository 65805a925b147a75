//! End-to-end semantic-analysis edge cases, driven through the full
//! `ewvmc_par::parse` → `analyze` pipeline rather than `SemanticAnalyzer`
//! directly, complementing the narrower unit tests in [`crate::analysis`].

use ewvmc_par::ast::Program;
use ewvmc_util::diagnostic::Handler;
use ewvmc_util::Interner;

fn check(source: &str) -> (Program, Interner, Handler) {
    let mut interner = Interner::new();
    let mut handler = Handler::new();
    let program = ewvmc_par::parse(source, &mut interner, &mut handler)
        .expect("source must parse for this test");
    crate::analyze(&program, &interner, &handler);
    (program, interner, handler)
}

#[test]
fn indexing_a_string_variable_is_accepted() {
    let (_, _, handler) = check(
        "program p; var s: string; begin if s[1] = 'h' then s := s end.",
    );
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
}

#[test]
fn indexing_a_non_array_non_string_variable_is_an_error() {
    let (_, _, handler) = check(
        "program p; var x: integer; begin x := x[1] end.",
    );
    assert!(handler.has_errors());
}

#[test]
fn assigning_a_real_target_from_an_integer_value_widens() {
    let (_, _, handler) = check("program p; var r: real; begin r := 1 end.");
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
}

#[test]
fn assigning_an_integer_target_from_a_real_value_is_an_error() {
    let (_, _, handler) = check("program p; var i: integer; begin i := 1.5 end.");
    assert!(handler.has_errors());
}

#[test]
fn assigning_to_a_procedure_name_is_an_error() {
    let (_, _, handler) = check(
        "program p; procedure greet; begin end; begin greet := 1 end.",
    );
    assert!(handler.has_errors());
}

#[test]
fn calling_a_plain_variable_is_an_error() {
    let (_, _, handler) = check(
        "program p; var x: integer; begin x := x() end.",
    );
    assert!(handler.has_errors());
}

#[test]
fn wrong_argument_count_to_a_user_function_is_an_error() {
    let (_, _, handler) = check(
        "program p; function sq(n: integer): integer; begin sq := n * n end; \
         var x: integer; begin x := sq(1, 2) end.",
    );
    assert!(handler.has_errors());
}

#[test]
fn length_rejects_an_integer_argument() {
    let (_, _, handler) = check(
        "program p; var x: integer; begin x := length(x) end.",
    );
    assert!(handler.has_errors());
}

#[test]
fn for_loop_control_variable_must_be_integer() {
    let (_, _, handler) = check(
        "program p; var b: boolean; begin for b := 1 to 3 do begin end end.",
    );
    assert!(handler.has_errors());
}

#[test]
fn while_condition_rejects_a_non_boolean_expression() {
    let (_, _, handler) = check(
        "program p; var x: integer; begin while x do x := x - 1 end.",
    );
    assert!(handler.has_errors());
}

#[test]
fn duplicate_parameter_names_across_two_parameter_groups_is_rejected() {
    let (_, _, handler) = check(
        "program p; procedure f(a: integer; a: integer); begin end; begin f(1, 2) end.",
    );
    assert!(handler.has_errors());
}

#[test]
fn a_global_variable_is_reachable_from_inside_a_subprogram() {
    let (_, _, handler) = check(
        "program p; var total: integer; procedure bump; begin total := total + 1 end; \
         begin bump() end.",
    );
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
}
