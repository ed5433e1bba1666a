use crate::compiler::ast::ASTNode;
use crate::compiler::error::{CompileError, ErrorKind};
use crate::compiler::parser::{AstParser, PestEelParser};
use crate::compiler::semantic_analyser::{BUILTIN_LOOP_NAME, BUILTIN_SETUP_NAME};
use crate::compiler::semantic_analyser::scope_analysis::ScopeAnalysisVisitor;
use crate::compiler::symbol_table::{ScopeId, SymbolTable};
use crate::compiler::symbol_table::symbols::SymbolKind;

fn scope_analysis(source: &str) -> (SymbolTable, Vec<CompileError>) {
    let root = PestEelParser::default().parse(source);
    let mut table = SymbolTable::new();
    let mut visitor = ScopeAnalysisVisitor::new(&mut table);
    match &root {
        ASTNode::PROGRAM(_) => visitor.visit_program(&root),
        node => panic!("Expected a program root, found {:?}", node),
    }
    let errors = std::mem::take(&mut visitor.errors);
    drop(visitor);
    (table, errors)
}

#[test]
fn scope_bleed() {
    let (table, errors) = scope_analysis("setup{u8 x = 2;} loop{f32 x = 2.2;}");
    assert!(errors.is_empty());
    assert_eq!(table.scope_count(), 3);

    let x1 = table.find(ScopeId::new(1), "x").unwrap();
    let x2 = table.find(ScopeId::new(2), "x").unwrap();
    assert_eq!(table.get_symbol(x1).kind(), SymbolKind::Variable);
    assert_eq!(table.get_symbol(x2).kind(), SymbolKind::Variable);

    let t1 = table.get_symbol(table.get_symbol(x1).variable().datatype).name.clone();
    let t2 = table.get_symbol(table.get_symbol(x2).variable().datatype).name.clone();
    assert_ne!(t1, t2);
}

#[test]
fn scope_overshadowing() {
    let (table, errors) = scope_analysis("setup{u8 x = 2; if(true) { u16 x = 4; } }");
    assert!(errors.is_empty());
    assert_eq!(table.scope_count(), 3);

    let x1 = table.find(ScopeId::new(1), "x").unwrap();
    let x2 = table.find(ScopeId::new(2), "x").unwrap();
    assert_ne!(x1, x2);

    let t1 = table.get_symbol(table.get_symbol(x1).variable().datatype).name.clone();
    let t2 = table.get_symbol(table.get_symbol(x2).variable().datatype).name.clone();
    assert_ne!(t1, t2);
}

#[test]
fn predicate_less_events() {
    let (table, errors) = scope_analysis("event x;");
    assert!(errors.is_empty());
    assert_eq!(table.scope_count(), 1);

    let x = table.find(ScopeId::root(), "x").unwrap();
    assert_eq!(table.get_symbol(x).kind(), SymbolKind::Event);
    let event = table.get_symbol(x).event();
    assert!(!event.has_predicate);
    assert!(event.is_complete);
}

#[test]
fn deferred_event_declaration() {
    let (table, errors) = scope_analysis("on x {} event x {return true;}");
    assert!(errors.is_empty());
    assert_eq!(table.scope_count(), 3);

    let x = table.find(ScopeId::root(), "x").unwrap();
    assert_eq!(table.get_symbol(x).kind(), SymbolKind::Event);
    let event = table.get_symbol(x).event();
    assert!(event.has_predicate);
    assert!(event.is_complete);
    assert_eq!(event.get_handles().len(), 1);
}

#[test]
fn duplicate_event() {
    let (_table, errors) = scope_analysis("event x { return true; } event x { return true;  }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::DuplicateEvent);
}

#[test]
fn setup_loop_void_function() {
    let (table, errors) = scope_analysis("setup{} loop{}");
    assert!(errors.is_empty());
    assert_eq!(table.scope_count(), 3);

    let setup = table.find(ScopeId::root(), BUILTIN_SETUP_NAME).unwrap();
    let loop_ = table.find(ScopeId::root(), BUILTIN_LOOP_NAME).unwrap();
    assert_eq!(table.get_symbol(setup).kind(), SymbolKind::Function);
    assert!(!table.get_symbol(setup).function().has_return_type());
    assert_eq!(table.get_symbol(loop_).kind(), SymbolKind::Function);
    assert!(!table.get_symbol(loop_).function().has_return_type());
}

#[test]
fn await_marks_function_async() {
    let (table, errors) = scope_analysis("event e; setup{ await e; } loop{}");
    assert!(errors.is_empty());

    let setup = table.find(ScopeId::root(), BUILTIN_SETUP_NAME).unwrap();
    assert!(table.get_symbol(setup).function().is_async());
    let loop_ = table.find(ScopeId::root(), BUILTIN_LOOP_NAME).unwrap();
    assert!(!table.get_symbol(loop_).function().is_async());
}

#[test]
fn nested_await_promotes_the_whole_block_chain() {
    let (table, errors) = scope_analysis("event e; setup{ if(true) { await e; } }");
    assert!(errors.is_empty());

    let setup = table.find(ScopeId::root(), BUILTIN_SETUP_NAME).unwrap();
    let function = table.get_symbol(setup).function();
    assert!(function.is_async());
    // the function scope and the if block scope both host async blocks
    assert_eq!(function.sequence.as_ref().unwrap().async_block_scopes().len(), 2);
}

#[test]
fn awaiting_a_known_event_marks_it_awaited() {
    let (table, errors) = scope_analysis("event e; setup{ await e; }");
    assert!(errors.is_empty());

    let e = table.find(ScopeId::root(), "e").unwrap();
    assert!(table.get_symbol(e).event().is_awaited);
}

#[test]
fn undeclared_type_is_deferred() {
    let (table, errors) = scope_analysis("setup{ widget x = 2; }");
    assert!(errors.is_empty());
    assert_eq!(table.unresolved_symbols().len(), 1);
    assert_eq!(table.unresolved_symbols()[0].expected_kind, SymbolKind::Type);
    assert_eq!(table.unresolved_symbols()[0].name, "widget");
}

#[test]
fn undeclared_identifier_reference_is_deferred() {
    let (table, errors) = scope_analysis("setup{ x = 2; }");
    assert!(errors.is_empty());
    assert_eq!(table.unresolved_symbols().len(), 1);
    assert_eq!(table.unresolved_symbols()[0].expected_kind, SymbolKind::Variable);
}

#[test]
fn duplicate_variable_in_same_scope_is_reported() {
    let (_table, errors) = scope_analysis("setup{ u8 x = 1; u8 x = 2; }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::AlreadyDefined);
}

#[test]
fn event_name_clash_is_already_defined() {
    let (_table, errors) = scope_analysis("u8 x = 1; event x { return true; }");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::AlreadyDefined);
}

#[test]
fn handler_order_follows_source_positions() {
    let (table, errors) = scope_analysis("on x {} on x {} event x { return true; }");
    assert!(errors.is_empty());

    let x = table.find(ScopeId::root(), "x").unwrap();
    let handles: Vec<String> = table.get_symbol(x).event()
        .get_handles().values()
        .map(|handle| handle.type_id.clone())
        .collect();
    let id = &table.get_symbol(x).event().id;
    assert_eq!(handles, vec![format!("{}_handle0", id), format!("{}_handle1", id)]);
}
