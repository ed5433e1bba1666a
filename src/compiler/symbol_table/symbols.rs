use std::collections::BTreeMap;

use strum_macros::Display;

use super::{ScopeId, SymbolId};
use super::super::ast::{ASTNode, SourcePos};
use super::super::error::{InternalError, Subsystem};
use super::super::sequence::Sequence;

/// Symbol kinds. The payload of a symbol is a discriminated union whose
/// tag always matches the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SymbolKind {
    Variable,
    Constant,
    Function,
    ExternFunction,
    Type,
    Namespace,
    Event,
    Indirect,
}

/// A named program entity owned by the symbol table.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub value: SymbolValue,
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match &self.value {
            SymbolValue::Variable(_) => SymbolKind::Variable,
            SymbolValue::Constant(_) => SymbolKind::Constant,
            SymbolValue::Function(_) => SymbolKind::Function,
            SymbolValue::ExternFunction(_) => SymbolKind::ExternFunction,
            SymbolValue::Type(_) => SymbolKind::Type,
            SymbolValue::Namespace(_) => SymbolKind::Namespace,
            SymbolValue::Event(_) => SymbolKind::Event,
            SymbolValue::Indirect(_) => SymbolKind::Indirect,
        }
    }

    pub fn variable(&self) -> &Variable {
        match &self.value {
            SymbolValue::Variable(variable) => variable,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Symbol payload is not a variable."),
        }
    }

    pub fn function(&self) -> &Function {
        match &self.value {
            SymbolValue::Function(function) => function,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Symbol payload is not a function."),
        }
    }

    pub fn function_mut(&mut self) -> &mut Function {
        match &mut self.value {
            SymbolValue::Function(function) => function,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Symbol payload is not a function."),
        }
    }

    pub fn type_def(&self) -> &TypeDef {
        match &self.value {
            SymbolValue::Type(type_def) => type_def,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Symbol payload is not a type."),
        }
    }

    pub fn event(&self) -> &Event {
        match &self.value {
            SymbolValue::Event(event) => event,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Symbol payload is not an event."),
        }
    }

    pub fn event_mut(&mut self) -> &mut Event {
        match &mut self.value {
            SymbolValue::Event(event) => event,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Symbol payload is not an event."),
        }
    }
}

/// Symbol payloads. One variant per symbol kind.
#[derive(Debug, Clone)]
pub enum SymbolValue {
    Variable(Variable),
    Constant(Constant),
    Function(Function),
    ExternFunction(ExternFunction),
    Type(TypeDef),
    Namespace(ScopeId),
    Event(Event),
    Indirect(Indirect),
}

/// Variable payload. The datatype handle may point at an indirect symbol
/// while the declared type is still unresolved.
#[derive(Debug, Clone)]
pub struct Variable {
    pub datatype: SymbolId,
    pub is_static: bool,
    pub has_value: bool,
}

/// Constant payload. The initializer expression is carried opaquely.
#[derive(Debug, Clone)]
pub struct Constant {
    pub datatype: SymbolId,
    pub expression: ASTNode,
}

/// Function payload. Owns the function's scope, body and sequence graph.
/// `type_id` is the identifier of the functor type emitted for the
/// function in the target source.
#[derive(Debug, Clone)]
pub struct Function {
    pub scope: ScopeId,
    pub parameters: Vec<SymbolId>,
    pub return_type: Option<SymbolId>,
    pub body: Option<ASTNode>,
    pub sequence: Option<Sequence>,
    pub type_id: String,
}

impl Function {
    pub fn new(scope: ScopeId) -> Self {
        Function {
            scope,
            parameters: Vec::new(),
            return_type: None,
            body: None,
            sequence: None,
            type_id: String::new(),
        }
    }

    pub fn has_return_type(&self) -> bool {
        self.return_type.is_some()
    }

    pub fn is_async(&self) -> bool {
        match &self.sequence {
            Some(sequence) => sequence.is_async(),
            None => false,
        }
    }
}

/// Foreign function payload. Calls lower to a plain call on the stored
/// target identifier.
#[derive(Debug, Clone)]
pub struct ExternFunction {
    pub target_id: String,
    pub parameters: Vec<SymbolId>,
    pub return_type: Option<SymbolId>,
}

/// Classification of a primitive used for literal unification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveClass {
    Unsigned,
    Signed,
    Size,
    Float,
    Bool,
    Pin,
}

/// A primitive type. Records both the name used in EEL source and the
/// name emitted in target code (the two differ for pin element types,
/// e.g. `digital` emits as `pin<digital>`).
#[derive(Debug, Clone)]
pub struct Primitive {
    pub source_name: String,
    pub target_name: String,
    pub class: PrimitiveClass,
}

impl Primitive {
    pub fn named(name: &str, class: PrimitiveClass) -> Self {
        Primitive {
            source_name: String::from(name),
            target_name: String::from(name),
            class,
        }
    }

    pub fn with_target(source_name: &str, target_name: &str, class: PrimitiveClass) -> Self {
        Primitive {
            source_name: String::from(source_name),
            target_name: String::from(target_name),
            class,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.class, PrimitiveClass::Unsigned | PrimitiveClass::Signed | PrimitiveClass::Size)
    }
}

/// Type payload. Only primitives are fully realised; the remaining kinds
/// exist so the data model can carry them but no grammar rule produces
/// them yet.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Primitive(Primitive),
    Struct { member_scope: ScopeId },
    Union,
    UntaggedUnion,
    Enum,
    Trait,
}

impl TypeDef {
    pub fn source_name(&self) -> &str {
        match self {
            TypeDef::Primitive(primitive) => &primitive.source_name,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Only primitive types carry a source name."),
        }
    }

    pub fn target_name(&self) -> &str {
        match self {
            TypeDef::Primitive(primitive) => &primitive.target_name,
            _ => InternalError::fatal(Subsystem::SymbolTable, "Only primitive types carry a target name."),
        }
    }

    pub fn primitive(&self) -> Option<&Primitive> {
        match self {
            TypeDef::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }
}

/// Event payload. Owns the optional predicate function and the handler
/// functions. Handlers are keyed by packed source position so iteration
/// order is declaration order.
#[derive(Debug, Clone)]
pub struct Event {
    pub has_predicate: bool,
    pub is_complete: bool,
    pub is_awaited: bool,
    pub predicate: Option<Function>,
    pub id: String,
    handles: BTreeMap<u64, Function>,
}

impl Event {
    pub fn new(id: String) -> Self {
        Event {
            has_predicate: false,
            is_complete: false,
            is_awaited: false,
            predicate: None,
            id,
            handles: BTreeMap::new(),
        }
    }

    pub fn add_handle(&mut self, pos: SourcePos, mut handle: Function) {
        handle.type_id = format!("{}_handle{}", self.id, self.handles.len());
        self.handles.insert(pos.packed(), handle);
    }

    pub fn get_handle_mut(&mut self, pos: SourcePos) -> &mut Function {
        match self.handles.get_mut(&pos.packed()) {
            Some(handle) => handle,
            None => InternalError::fatal(Subsystem::SymbolTable, "No event handle registered at the given position."),
        }
    }

    pub fn get_handles(&self) -> &BTreeMap<u64, Function> {
        &self.handles
    }
}

/// Placeholder payload for a use-before-declaration reference.
/// `resolved` is patched by the symbol table once a matching static
/// declaration is seen.
#[derive(Debug, Clone)]
pub struct Indirect {
    pub expected_kind: SymbolKind,
    pub resolved: Option<SymbolId>,
}

impl Indirect {
    pub fn is_set(&self) -> bool {
        self.resolved.is_some()
    }
}
