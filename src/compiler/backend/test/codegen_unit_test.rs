use crate::compiler::BuildOptions;
use crate::compiler::backend::{BackEndGenerator, CppSourceGenerator};
use crate::compiler::parser::{AstParser, PestEelParser};
use crate::compiler::semantic_analyser::{EelSemanticAnalyser, SemanticAnalyser};

fn generate(source: &str) -> String {
    let root = PestEelParser::default().parse(source);
    let analyser = EelSemanticAnalyser::default();
    let mut analysis = analyser.analyse(&root, &BuildOptions::default());
    assert!(analysis.errors.is_empty(), "unexpected diagnostics: {:?}", analysis.errors);
    CppSourceGenerator::default().generate(&root, &mut analysis.symbol_table)
}

#[test]
fn emits_runtime_include_and_main() {
    let generated = generate("setup {} loop {}");
    assert!(generated.starts_with("#include <runtime/all.hpp>\n"));
    assert!(generated.contains("\nint main(void) {\n"));
    assert!(generated.ends_with("return 0; }\n"));
}

#[test]
fn sync_setup_lowers_to_invoke_functor() {
    let generated = generate("setup { u8 x = 2; }");
    assert!(generated.contains("struct __eel_setup { static void invoke() {u8 __v14 = 2;} };"));
    assert!(generated.contains("__eel_setup::invoke();\n"));
}

#[test]
fn sync_loop_is_invoked_from_the_dispatch_loop() {
    let generated = generate("loop { u8 x = 1; }");
    assert!(generated.contains("struct __eel_loop { static void invoke() {u8 __v14 = 1;} };"));
    assert!(generated.contains("while (true) {\n__eel_loop::invoke();\n}\n"));
}

#[test]
fn top_level_pin_declaration_emits_pin_binding() {
    let generated = generate("digital led 13; setup { set led 1; set led mode 1; set led pin 9; }");
    assert!(generated.contains("pin<digital> __v14 { 13 };"));
    assert!(generated.contains("__v14.write(1);"));
    assert!(generated.contains("__v14.set_mode(1);"));
    assert!(generated.contains("__v14.pin_id = 9;"));
}

#[test]
fn pin_reads_emit_read_calls() {
    let generated = generate("analog knob 3; u8 level = 0; loop { level = read knob; }");
    assert!(generated.contains("pin<analog> __v14 { 3 };"));
    assert!(generated.contains("__v15 = __v14.read();"));
}

#[test]
fn expressions_parenthesise_operands() {
    let generated = generate("setup { u8 x = 1; u8 y = (x + 2) * 3; }");
    assert!(generated.contains("u8 __v15 = ((__v14)+(2))*(3);"));
}

#[test]
fn casts_lower_to_static_cast() {
    let generated = generate("setup { u8 x = 1; u16 y = x as u16; }");
    assert!(generated.contains("u16 __v15 = static_cast<u16>(__v14);"));
}

#[test]
fn extern_calls_use_their_target_identifier() {
    let generated = generate("setup { serial_begin(9600); }");
    assert!(generated.contains("Serial.begin(9600);"));
}

/*
 * Predicate-less event dispatch. The emitted program must declare the
 * handler functor, the event aggregate, and dispatch it from the main
 * loop so one emit leads to exactly one handler invocation.
 */
#[test]
fn predicateless_event_dispatch() {
    let generated = generate("bool x = false; event e; on e { x = true; } loop { emit e; }");

    assert!(generated.contains("bool __v14 = false;"));
    assert!(generated.contains("struct event15_handle0 { static void invoke() {__v14 = true;} };"));
    assert!(generated.contains("Event<PredicateLess, event15_handle0> event15 {};"));
    assert!(generated.contains("event15.emit();"));
    assert!(generated.contains("run_handles<decltype(event15)>(event15);\n"));
}

#[test]
fn event_predicates_emit_their_own_functor() {
    let generated = generate("bool x = false; event e { return x; } on e { x = false; }");

    assert!(generated.contains("struct event15_predicate { static bool invoke() {return __v14;} };"));
    assert!(generated.contains("Event<event15_predicate, event15_handle0> event15 {};"));
}

#[test]
fn async_setup_lowers_to_state_machine() {
    let generated = generate("event e; setup { await e; u8 x = 2; }");

    assert!(generated.contains("struct __eel_setup : AsyncFunction {struct State {u8 s;u8 __v15;"));
    assert!(generated.contains("static int step(State& state) {switch (state.s) {"));
    assert!(generated.contains("case 0: {if (event14.has_emit_flag()) state.s += 1;return 0;}"));
    assert!(generated.contains("case 1: {state.__v15 = 2;state.s += 1; return 0; }"));
    assert!(generated.contains("case 2: { return 1; }"));
    assert!(generated.contains("__eel_setup::State __setup_state {};\nwhile (!__eel_setup::step(__setup_state)) {\n"));
}

#[test]
fn async_state_reads_go_through_the_state_struct() {
    let generated = generate("event e; setup { u8 x = 0; await e; x = x + 1; }");

    assert!(generated.contains("case 0: {state.__v15 = 0;"));
    assert!(generated.contains("state.__v15 = (state.__v15)+(1);"));
}

#[test]
fn async_loop_state_is_reset_on_completion() {
    let generated = generate("event e; loop { await e; }");

    assert!(generated.contains("__eel_loop::State __loop_state {};\n"));
    assert!(generated.contains("if (__eel_loop::step(__loop_state)) __loop_state.s = 0;\n"));
}

#[test]
fn awaiting_a_boolean_variable_polls_it() {
    let generated = generate("bool ready = false; setup { await ready; }");
    assert!(generated.contains("case 0: {if (__v14) state.s += 1;return 0;}"));
}

#[test]
fn async_while_lowers_to_header_and_backedge_cases() {
    let generated = generate("event e; setup { while (true) { await e; } }");

    // header case 1 tests the condition and jumps past the body
    assert!(generated.contains("case 1: {if (!(true)) { state.s = 3; return 0; }"));
    // the await inside the body becomes case 2
    assert!(generated.contains("case 2: {if (event14.has_emit_flag()) state.s += 1;return 0;}"));
    // the backedge returns to the header case
    assert!(generated.contains("state.s = 1; return 0; }"));
    assert!(generated.contains("case 3: { return 1; }"));
}

#[test]
fn sync_while_keeps_plain_loop_text() {
    let generated = generate("loop { u8 x = 0; while (x < 3) { x = x + 1; } }");
    assert!(generated.contains("while ((__v14)<(3)) {__v14 = (__v14)+(1);}"));
}

#[test]
fn async_if_branch_gets_dispatch_and_rejoin_cases() {
    let generated = generate("event e; setup { if (true) { await e; } u8 x = 1; }");

    // the branch dispatch stub jumps into the buffered branch cases
    assert!(generated.contains("if (true){ state.s = 1; return 0; }"));
    // the await inside the branch
    assert!(generated.contains("case 3: {if (event14.has_emit_flag()) state.s += 1;return 0;}"));
    // rejoin case picks up the statement after the if
    assert!(generated.contains("case 5: {state.__v15 = 1;"));
}

#[test]
fn state_struct_collects_variables_of_every_async_block() {
    let generated = generate("event e; setup { u8 a = 1; if (true) { u8 b = 2; await e; } }");

    assert!(generated.contains("u8 __v15;"));
    assert!(generated.contains("u8 __v16;"));
}

#[test]
fn sync_blocks_inside_async_functions_keep_plain_locals() {
    let generated = generate("event e; setup { await e; if (true) { u8 y = 1; y = 2; } }");

    // the if block never yields, so y stays a plain local
    assert!(generated.contains("u8 __v15 = 1;"));
    assert!(generated.contains("__v15 = 2;"));
    assert!(!generated.contains("state.__v15"));
}

#[test]
fn constants_emit_const_declarations() {
    let generated = generate("const u16 interval = 500;");
    assert!(generated.contains("const u16 __v14 = 500;"));
}

#[test]
fn test_library_is_available_when_testing_is_enabled() {
    let root = PestEelParser::default().parse("setup { assert_true(true); pass(0); }");
    let analyser = EelSemanticAnalyser::default();
    let mut analysis = analyser.analyse(&root, &BuildOptions { testing: true });
    assert!(analysis.errors.is_empty(), "unexpected diagnostics: {:?}", analysis.errors);
    let generated = CppSourceGenerator::default().generate(&root, &mut analysis.symbol_table);

    assert!(generated.contains("assert_true(true);"));
    assert!(generated.contains("pass(0);"));
}

#[test]
fn events_dispatch_during_async_setup_stepping() {
    let generated = generate("event e; event f; setup { await e; }");

    assert!(generated.contains("while (!__eel_setup::step(__setup_state)) {\nrun_handles<decltype(event14)>(event14);\nrun_handles<decltype(event15)>(event15);\n}\n"));
}
