use crate::compiler::ast::SourcePos;
use crate::compiler::error::ErrorKind;
use crate::compiler::symbol_table::{ScopeId, SymbolTable};
use crate::compiler::symbol_table::symbols::{Function, SymbolKind};

/*
 * Tests finding symbols across scope boundaries.
 * Specifically accessing variable symbols defined in an outer scope
 * from an inner scope.
 */
#[test]
fn symbol_lookup_propagates_into_parent_scope() {
    let mut table = SymbolTable::new();

    let scope_a = table.derive_scope();
    let datatype = table.find(ScopeId::root(), "u8").unwrap();

    table.declare_var(ScopeId::root(), datatype, "symbol_a", false).unwrap();
    let symbol = table.find(scope_a, "symbol_a");

    assert!(symbol.is_some());
    assert_eq!(table.get_symbol(symbol.unwrap()).kind(), SymbolKind::Variable);
}

/*
 * Tests shadowing of symbols from outer scopes. The inner declaration
 * must produce a distinct symbol that wins lookups from the inner scope.
 */
#[test]
fn symbol_shadows_similar_symbol_from_outer_scope() {
    let mut table = SymbolTable::new();

    let datatype = table.find(ScopeId::root(), "u8").unwrap();
    table.declare_var(ScopeId::root(), datatype, "symbol_a", false).unwrap();
    let outer_symbol = table.find(ScopeId::root(), "symbol_a").unwrap();

    let inner_scope = table.derive_scope();
    table.declare_var(inner_scope, datatype, "symbol_a", false).unwrap();
    let inner_symbol = table.find(inner_scope, "symbol_a").unwrap();

    assert_ne!(inner_symbol, outer_symbol);
}

#[test]
fn duplicate_declaration_in_same_scope_is_rejected() {
    let mut table = SymbolTable::new();

    let datatype = table.find(ScopeId::root(), "u8").unwrap();
    assert!(table.declare_var(ScopeId::root(), datatype, "symbol_a", false).is_some());
    assert!(table.declare_var(ScopeId::root(), datatype, "symbol_a", false).is_none());
}

/*
 * Tests handling of an undeclared expected static symbol: a deferred
 * reference resolves once a matching static declaration is seen.
 */
#[test]
fn static_declaration_resolves_expected_symbol() {
    let mut table = SymbolTable::new();

    let deferred = table.defer_symbol(ScopeId::root(), "symbol_a", SymbolKind::Variable);
    let datatype = table.find(ScopeId::root(), "u8").unwrap();

    assert_eq!(table.get_symbol(deferred).kind(), SymbolKind::Indirect);
    assert_eq!(table.resolve(deferred), deferred);

    table.declare_var(ScopeId::root(), datatype, "symbol_a", true).unwrap();
    table.try_resolve_unresolved();

    let resolved = table.resolve(deferred);
    assert_ne!(resolved, deferred);
    assert_eq!(table.get_symbol(resolved).kind(), SymbolKind::Variable);
    assert_eq!(table.get_symbol(resolved).name, "symbol_a");
    assert!(table.unresolved_symbols().is_empty());
}

/*
 * A deferred variable must not resolve against a non-static declaration.
 */
#[test]
fn non_static_declaration_leaves_symbol_unresolved() {
    let mut table = SymbolTable::new();

    let deferred = table.defer_symbol(ScopeId::root(), "symbol_a", SymbolKind::Variable);
    let datatype = table.find(ScopeId::root(), "u8").unwrap();

    table.declare_var(ScopeId::root(), datatype, "symbol_a", false).unwrap();
    table.try_resolve_unresolved();

    assert_eq!(table.resolve(deferred), deferred);
    assert_eq!(table.unresolved_symbols().len(), 1);
}

#[test]
fn try_resolve_unresolved_is_idempotent() {
    let mut table = SymbolTable::new();

    let deferred = table.defer_symbol(ScopeId::root(), "symbol_a", SymbolKind::Variable);
    let datatype = table.find(ScopeId::root(), "u8").unwrap();
    table.declare_var(ScopeId::root(), datatype, "symbol_a", true).unwrap();

    table.try_resolve_unresolved();
    let first = table.resolve(deferred);
    table.try_resolve_unresolved();

    assert_eq!(table.resolve(deferred), first);
    assert!(table.unresolved_symbols().is_empty());
}

/*
 * Symbol handles must survive arena growth: a handle issued early still
 * dereferences to the same record after many further insertions.
 */
#[test]
fn symbol_handles_stay_valid_across_growth() {
    let mut table = SymbolTable::new();

    let datatype = table.find(ScopeId::root(), "u8").unwrap();
    let early = table.declare_var(ScopeId::root(), datatype, "early", false).unwrap();

    for index in 0..256 {
        let scope = table.derive_scope();
        table.declare_var(scope, datatype, &format!("filler{}", index), false).unwrap();
    }

    assert_eq!(table.get_symbol(early).name, "early");
    assert_eq!(table.get_symbol(early).kind(), SymbolKind::Variable);
}

#[test]
fn scope_parent_chains_terminate_at_root() {
    let mut table = SymbolTable::new();

    let mut scope = table.derive_scope();
    for _ in 0..8 {
        scope = table.derive_scope_from(scope);
    }

    let mut current = scope;
    let mut steps = 0;
    while let Some(parent) = table.get_scope(current).parent() {
        current = parent;
        steps += 1;
        assert!(steps <= 16);
    }
    assert!(current.is_root());
}

#[test]
fn primitives_are_registered_with_target_names() {
    let table = SymbolTable::new();

    let digital = table.find(ScopeId::root(), "digital").unwrap();
    assert_eq!(table.get_symbol(digital).kind(), SymbolKind::Type);
    assert_eq!(table.get_symbol(digital).type_def().target_name(), "pin<digital>");

    let u8_type = table.find(ScopeId::root(), "u8").unwrap();
    assert_eq!(table.get_symbol(u8_type).type_def().target_name(), "u8");
}

/*
 * Event declaration lifecycle.
 */

#[test]
fn predicateless_event_is_complete_on_declaration() {
    let mut table = SymbolTable::new();

    let event = table.declare_event("button", None).unwrap();
    let event = table.get_symbol(event).event();
    assert!(event.is_complete);
    assert!(!event.has_predicate);
    assert_eq!(event.id, format!("event{}", table.symbol_count() - 1));
}

#[test]
fn duplicate_event_declaration_is_rejected_without_mutation() {
    let mut table = SymbolTable::new();

    let event = table.declare_event("button", None).unwrap();
    let result = table.declare_event("button", None);

    assert_eq!(result.unwrap_err(), ErrorKind::DuplicateEvent);
    let event = table.get_symbol(event).event();
    assert!(event.is_complete);
    assert!(!event.has_predicate);
}

#[test]
fn event_name_clash_with_other_symbol_is_already_defined() {
    let mut table = SymbolTable::new();

    let datatype = table.find(ScopeId::root(), "u8").unwrap();
    table.declare_var(ScopeId::root(), datatype, "button", false).unwrap();

    assert_eq!(table.declare_event("button", None).unwrap_err(), ErrorKind::AlreadyDefined);
}

#[test]
fn handle_declaration_creates_incomplete_event() {
    let mut table = SymbolTable::new();

    let scope = table.derive_scope();
    let pos = SourcePos::new(1, 1);
    let event = table.declare_event_handle("button", pos, Function::new(scope));

    let record = table.get_symbol(event).event();
    assert!(!record.is_complete);
    assert_eq!(record.get_handles().len(), 1);
    assert!(record.get_handles().contains_key(&pos.packed()));
}

#[test]
fn later_declaration_completes_handled_event_with_predicate() {
    let mut table = SymbolTable::new();

    let handler_scope = table.derive_scope();
    let event = table.declare_event_handle("button", SourcePos::new(1, 1), Function::new(handler_scope));

    let predicate_scope = table.derive_scope();
    let mut predicate = Function::new(predicate_scope);
    predicate.return_type = table.find(ScopeId::root(), "bool");

    let completed = table.declare_event("button", Some(predicate)).unwrap();
    assert_eq!(completed, event);

    let record = table.get_symbol(event).event();
    assert!(record.is_complete);
    assert!(record.has_predicate);
    assert_eq!(record.predicate.as_ref().unwrap().type_id, format!("{}_predicate", record.id));
}

#[test]
fn completing_a_handled_event_without_predicate_is_rejected() {
    let mut table = SymbolTable::new();

    let scope = table.derive_scope();
    table.declare_event_handle("button", SourcePos::new(1, 1), Function::new(scope));

    assert_eq!(table.declare_event("button", None).unwrap_err(), ErrorKind::DuplicateEvent);
}

#[test]
fn handles_iterate_in_source_order() {
    let mut table = SymbolTable::new();

    let scope = table.derive_scope();
    table.declare_event_handle("button", SourcePos::new(4, 1), Function::new(scope));
    let scope = table.derive_scope();
    table.declare_event_handle("button", SourcePos::new(2, 9), Function::new(scope));
    let scope = table.derive_scope();
    let event = table.declare_event_handle("button", SourcePos::new(9, 1), Function::new(scope));

    let keys: Vec<u64> = table.get_symbol(event).event().get_handles().keys().copied().collect();
    assert_eq!(keys, vec![
        SourcePos::new(2, 9).packed(),
        SourcePos::new(4, 1).packed(),
        SourcePos::new(9, 1).packed(),
    ]);
}

#[test]
fn reserved_function_names_keep_their_spelling() {
    let mut table = SymbolTable::new();

    let setup = table.declare_func("__eel_setup", None).unwrap();
    assert_eq!(table.get_symbol(setup).function().type_id, "__eel_setup");

    let custom = table.declare_func("blink", None).unwrap();
    let expected = format!("func{}_blink", custom.index());
    assert_eq!(table.get_symbol(custom).function().type_id, expected);
}
