pub mod symbols;

#[cfg(test)]
mod test;

use std::collections::HashMap;

use super::ast::{ASTNode, SourcePos};
use super::error::{ErrorKind, InternalError, Subsystem};

use self::symbols::{
    Constant, Event, ExternFunction, Function, Indirect, Primitive, PrimitiveClass,
    Symbol, SymbolKind, SymbolValue, TypeDef, Variable,
};

/// Stable handle to a symbol owned by a SymbolTable.
/// Ids are dense and assigned monotonically at creation; they stay valid
/// across arena growth for the lifetime of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(usize);

impl SymbolId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Stable handle to a scope owned by a SymbolTable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub(crate) fn new(id: usize) -> Self {
        ScopeId(id)
    }

    pub fn root() -> Self {
        ScopeId(0)
    }

    pub fn is_root(&self) -> bool {
        self.0 == 0
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// A lexical naming context. Scopes form an ordered parent chain rooted
/// at the table's root scope; each holds at most one symbol per name.
#[derive(Debug, Clone)]
pub struct Scope {
    id: ScopeId,
    parent: Option<ScopeId>,
    symbol_map: HashMap<String, SymbolId>,
}

impl Scope {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn members(&self) -> &HashMap<String, SymbolId> {
        &self.symbol_map
    }

    /// Member symbols ordered by declaration (symbol id). Used where
    /// emission order must be deterministic.
    pub fn members_ordered(&self) -> Vec<SymbolId> {
        let mut ids: Vec<SymbolId> = self.symbol_map.values().copied().collect();
        ids.sort();
        ids
    }

    /// Add symbol to the scope map.
    /// @return true if successful, false if the name is already taken
    fn add_symbol(&mut self, name: &str, id: SymbolId) -> bool {
        if self.symbol_map.contains_key(name) {
            return false;
        }
        self.symbol_map.insert(String::from(name), id);
        true
    }
}

/// Info used to track unresolved symbols until batch resolution.
#[derive(Debug, Clone)]
pub struct UnresolvedSymbol {
    /// The kind of symbol that is expected.
    pub expected_kind: SymbolKind,

    /// The scope in which the symbol was found to be unresolvable.
    pub origin_scope: ScopeId,

    /// The indirect symbol that dependants use to refer to the symbol
    /// without knowing whether it exists.
    pub indirection_symbol: SymbolId,

    /// The name of the symbol.
    pub name: String,
}

/// A table for managing program symbols.
///
/// The table owns every scope and symbol it hands out; handles are plain
/// indices into append-only storage so references never dangle while the
/// table lives. It is mutated by scope analysis, read by type analysis,
/// and read (with a single late reconciliation) by code generation.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    unresolved_symbols: Vec<UnresolvedSymbol>,
}

impl SymbolTable {
    /// Create a table holding only the root scope with the primitive
    /// types registered in it.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            scopes: vec![Scope {
                id: ScopeId::root(),
                parent: None,
                symbol_map: HashMap::new(),
            }],
            symbols: Vec::new(),
            unresolved_symbols: Vec::new(),
        };
        table.register_primitives();
        table
    }

    fn register_primitives(&mut self) {
        let primitives = [
            Primitive::named("u8", PrimitiveClass::Unsigned),
            Primitive::named("u16", PrimitiveClass::Unsigned),
            Primitive::named("u32", PrimitiveClass::Unsigned),
            Primitive::named("u64", PrimitiveClass::Unsigned),
            Primitive::named("i8", PrimitiveClass::Signed),
            Primitive::named("i16", PrimitiveClass::Signed),
            Primitive::named("i32", PrimitiveClass::Signed),
            Primitive::named("i64", PrimitiveClass::Signed),
            Primitive::named("f32", PrimitiveClass::Float),
            Primitive::named("f64", PrimitiveClass::Float),
            Primitive::named("bool", PrimitiveClass::Bool),
            Primitive::named("usize", PrimitiveClass::Size),
            Primitive::with_target("digital", "pin<digital>", PrimitiveClass::Pin),
            Primitive::with_target("analog", "pin<analog>", PrimitiveClass::Pin),
        ];
        for primitive in primitives {
            self.declare_type(ScopeId::root(), TypeDef::Primitive(primitive));
        }
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Derive a new scope from the root scope.
    pub fn derive_scope(&mut self) -> ScopeId {
        self.derive_scope_from(ScopeId::root())
    }

    /// Derive a new scope from the given parent scope.
    pub fn derive_scope_from(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            id,
            parent: Some(parent),
            symbol_map: HashMap::new(),
        });
        id
    }

    pub fn get_scope(&self, id: ScopeId) -> &Scope {
        match self.scopes.get(id.0) {
            Some(scope) => scope,
            None => InternalError::fatal(Subsystem::SymbolTable, "Scope lookup with an id the table never issued."),
        }
    }

    pub fn get_symbol(&self, id: SymbolId) -> &Symbol {
        match self.symbols.get(id.0) {
            Some(symbol) => symbol,
            None => InternalError::fatal(Subsystem::SymbolTable, "Symbol lookup with an id the table never issued."),
        }
    }

    pub fn get_symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        match self.symbols.get_mut(id.0) {
            Some(symbol) => symbol,
            None => InternalError::fatal(Subsystem::SymbolTable, "Symbol lookup with an id the table never issued."),
        }
    }

    fn push_symbol(&mut self, name: &str, value: SymbolValue) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol {
            id,
            name: String::from(name),
            value,
        });
        id
    }

    /// Search the given scope and its ancestors for a name.
    pub fn find(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = scope;
        loop {
            let scope = self.get_scope(current);
            if let Some(&id) = scope.symbol_map.get(name) {
                return Some(id);
            }
            match scope.parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Search only the given scope for a name, without ascending.
    /// Used for member access and for async state lookups.
    pub fn find_member(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.get_scope(scope).symbol_map.get(name).copied()
    }

    /// Substitute an indirect symbol with its resolution target.
    /// Unresolved indirections are returned unchanged; the caller's kind
    /// check is responsible for rejecting them.
    pub fn resolve(&self, id: SymbolId) -> SymbolId {
        match &self.get_symbol(id).value {
            SymbolValue::Indirect(indirect) => indirect.resolved.unwrap_or(id),
            _ => id,
        }
    }

    /// Defer the declaration of a symbol for later. Creates an indirect
    /// placeholder symbol and files an unresolved record for it.
    pub fn defer_symbol(&mut self, scope: ScopeId, name: &str, expected_kind: SymbolKind) -> SymbolId {
        if self.get_scope(scope).symbol_map.contains_key(name) {
            InternalError::fatal(Subsystem::SymbolTable, "Deferred a symbol whose name is already declared in scope.");
        }

        let id = self.push_symbol(name, SymbolValue::Indirect(Indirect {
            expected_kind,
            resolved: None,
        }));
        self.report_unresolved_symbol(UnresolvedSymbol {
            expected_kind,
            origin_scope: scope,
            indirection_symbol: id,
            name: String::from(name),
        });
        id
    }

    /// Declare a variable in the given scope.
    /// @return None when the name is already declared in the scope;
    ///         reporting that as a user error is the caller's concern.
    pub fn declare_var(&mut self, scope: ScopeId, datatype: SymbolId, name: &str, is_static: bool) -> Option<SymbolId> {
        if self.get_scope(scope).symbol_map.contains_key(name) {
            return None;
        }
        let id = self.push_symbol(name, SymbolValue::Variable(Variable {
            datatype,
            is_static,
            has_value: false,
        }));
        self.scopes[scope.0].add_symbol(name, id);
        Some(id)
    }

    /// Declare a constant in the given scope.
    pub fn declare_const(&mut self, scope: ScopeId, datatype: SymbolId, name: &str, expression: ASTNode) -> Option<SymbolId> {
        if self.get_scope(scope).symbol_map.contains_key(name) {
            return None;
        }
        let id = self.push_symbol(name, SymbolValue::Constant(Constant {
            datatype,
            expression,
        }));
        self.scopes[scope.0].add_symbol(name, id);
        Some(id)
    }

    /// Register a type under its source name so it resolves as written
    /// in EEL (`digital` rather than `pin<digital>`).
    pub fn declare_type(&mut self, scope: ScopeId, type_def: TypeDef) -> SymbolId {
        let name = String::from(type_def.source_name());
        if self.get_scope(scope).symbol_map.contains_key(&name) {
            InternalError::fatal(Subsystem::SymbolTable, "Type registered twice under the same name.");
        }
        let id = self.push_symbol(&name, SymbolValue::Type(type_def));
        self.scopes[scope.0].add_symbol(&name, id);
        id
    }

    /// Declare a namespace: a symbol owning a scope derived from the
    /// declaring scope.
    pub fn declare_namespace(&mut self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        if self.get_scope(scope).symbol_map.contains_key(name) {
            return None;
        }
        let nested = self.derive_scope_from(scope);
        let id = self.push_symbol(name, SymbolValue::Namespace(nested));
        self.scopes[scope.0].add_symbol(name, id);
        Some(id)
    }

    /// Declare a function in the root scope with a freshly derived scope
    /// and no sequence. The reserved setup/loop names keep their spelling
    /// as the emitted functor identifier; everything else mangles to
    /// `func{id}_{name}`.
    pub fn declare_func(&mut self, name: &str, return_type: Option<SymbolId>) -> Option<SymbolId> {
        if self.get_scope(ScopeId::root()).symbol_map.contains_key(name) {
            return None;
        }
        let id = SymbolId(self.symbols.len());
        let scope = self.derive_scope();
        let mut function = Function::new(scope);
        function.return_type = return_type;
        function.type_id = if name.starts_with("__eel") {
            String::from(name)
        } else {
            format!("func{}_{}", id.0, name)
        };
        let id = self.push_symbol(name, SymbolValue::Function(function));
        self.scopes[0].add_symbol(name, id);
        Some(id)
    }

    /// Install a foreign function in the root scope. Calls emit against
    /// the given target identifier.
    pub fn declare_fn_cpp(&mut self, eel_name: &str, target_name: &str, return_type: Option<SymbolId>, parameters: Vec<SymbolId>) -> Option<SymbolId> {
        if self.get_scope(ScopeId::root()).symbol_map.contains_key(eel_name) {
            return None;
        }
        let id = self.push_symbol(eel_name, SymbolValue::ExternFunction(ExternFunction {
            target_id: String::from(target_name),
            parameters,
            return_type,
        }));
        self.scopes[0].add_symbol(eel_name, id);
        Some(id)
    }

    /// Declare an event in the root scope, or complete an event that an
    /// earlier handler declaration auto-created as incomplete.
    ///
    /// Redeclaring a complete event, and redeclaring an incomplete event
    /// without supplying a predicate, is a DuplicateEvent user error; a
    /// non-event symbol under the name is AlreadyDefined. A rejected
    /// declaration never mutates the existing symbol.
    pub fn declare_event(&mut self, name: &str, predicate: Option<Function>) -> Result<SymbolId, ErrorKind> {
        if let Some(id) = self.find_member(ScopeId::root(), name) {
            let symbol = self.get_symbol_mut(id);
            let event = match &mut symbol.value {
                SymbolValue::Event(event) => event,
                _ => return Err(ErrorKind::AlreadyDefined),
            };
            if event.is_complete {
                return Err(ErrorKind::DuplicateEvent);
            }
            if predicate.is_none() {
                return Err(ErrorKind::DuplicateEvent);
            }

            event.is_complete = true;
            event.has_predicate = true;
            let mut function = predicate.unwrap();
            function.type_id = format!("{}_predicate", event.id);
            event.predicate = Some(function);
            return Ok(id);
        }

        let id = SymbolId(self.symbols.len());
        let mut event = Event::new(format!("event{}", id.0));
        event.is_complete = true;
        if let Some(mut function) = predicate {
            function.type_id = format!("{}_predicate", event.id);
            event.has_predicate = true;
            event.predicate = Some(function);
        }
        let id = self.push_symbol(name, SymbolValue::Event(event));
        self.scopes[0].add_symbol(name, id);
        Ok(id)
    }

    /// Register a handler for the named event, auto-creating the event as
    /// incomplete when no declaration has been seen yet. The handler is
    /// keyed by its source position.
    pub fn declare_event_handle(&mut self, event_name: &str, pos: SourcePos, handle: Function) -> SymbolId {
        let id = match self.find_member(ScopeId::root(), event_name) {
            Some(id) => id,
            None => {
                let id = SymbolId(self.symbols.len());
                let event = Event::new(format!("event{}", id.0));
                let id = self.push_symbol(event_name, SymbolValue::Event(event));
                self.scopes[0].add_symbol(event_name, id);
                id
            }
        };
        self.get_symbol_mut(id).event_mut().add_handle(pos, handle);
        id
    }

    /// Handle to a registered primitive type. Absence is an
    /// implementation bug since primitives are installed at construction.
    pub fn primitive(&self, name: &str) -> SymbolId {
        match self.find_member(ScopeId::root(), name) {
            Some(id) if self.get_symbol(id).kind() == SymbolKind::Type => id,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Primitive type missing from the root scope."),
        }
    }

    pub fn report_unresolved_symbol(&mut self, symbol: UnresolvedSymbol) {
        self.unresolved_symbols.push(symbol);
    }

    pub fn unresolved_symbols(&self) -> &[UnresolvedSymbol] {
        &self.unresolved_symbols
    }

    /// Attempt to resolve unresolved symbols. Every record whose name now
    /// resolves to a symbol of the expected kind (and, for variables, a
    /// static one) patches its indirection symbol and leaves the pending
    /// list; leftovers stay for the driver to report.
    pub fn try_resolve_unresolved(&mut self) {
        let pending = std::mem::take(&mut self.unresolved_symbols);
        let mut remaining = Vec::new();
        let mut patches = Vec::new();

        for record in pending {
            let matching = self.find(record.origin_scope, &record.name);
            let resolved = match matching {
                Some(id) => {
                    let symbol = self.get_symbol(id);
                    symbol.kind() == record.expected_kind
                        && (record.expected_kind != SymbolKind::Variable
                            || symbol.variable().is_static)
                }
                None => false,
            };

            if resolved {
                patches.push((record.indirection_symbol, matching.unwrap()));
            } else {
                remaining.push(record);
            }
        }

        self.unresolved_symbols = remaining;
        for (indirection, target) in patches {
            match &mut self.get_symbol_mut(indirection).value {
                SymbolValue::Indirect(indirect) => indirect.resolved = Some(target),
                _ => InternalError::fatal(Subsystem::SymbolTable, "Unresolved record points at a non-indirect symbol."),
            }
        }
    }
}
