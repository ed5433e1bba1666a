use super::{BUILTIN_LOOP_NAME, BUILTIN_SETUP_NAME};
use super::super::ast::{ASTNode, Literal, NodeContext, SourcePos};
use super::super::error::{CompileError, ErrorKind, InternalError, Subsystem};
use super::super::symbol_table::{ScopeId, SymbolId, SymbolTable};
use super::super::symbol_table::symbols::{PrimitiveClass, SymbolKind, SymbolValue, TypeDef};

/// Abstract literal families produced while typing expressions.
/// Integer and Float unify with any primitive of the matching class;
/// Char and String currently only unify with themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    None,
    Undefined,
    NotAType,
    Integer,
    Float,
    Bool,
    Char,
    String,
}

fn literal_str(kind: LiteralKind) -> &'static str {
    match kind {
        LiteralKind::Undefined => "undefined",
        LiteralKind::None => "None",
        LiteralKind::Integer => "Integer",
        LiteralKind::Float => "Float",
        LiteralKind::Bool => "Bool",
        LiteralKind::Char => "Char",
        LiteralKind::String => "String",
        LiteralKind::NotAType => "ERROR",
    }
}

#[derive(Debug, Clone, Copy)]
enum TypeValue {
    Literal(LiteralKind),
    Symbol(SymbolId),
}

/// Type of an expression during analysis: either an abstract literal
/// family or a symbol whose underlying type is projected during
/// comparison. Carries the token position used to anchor diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct AnalysedType {
    value: TypeValue,
    pub pos: SourcePos,
}

impl AnalysedType {
    pub fn none() -> Self {
        AnalysedType { value: TypeValue::Literal(LiteralKind::None), pos: SourcePos::default() }
    }

    pub fn literal(kind: LiteralKind, pos: SourcePos) -> Self {
        AnalysedType { value: TypeValue::Literal(kind), pos }
    }

    /// Wraps a symbol lookup result; an empty lookup produces the null
    /// type rather than a symbol type.
    pub fn symbol(symbol: Option<SymbolId>, pos: SourcePos) -> Self {
        match symbol {
            Some(symbol) => AnalysedType { value: TypeValue::Symbol(symbol), pos },
            None => AnalysedType { value: TypeValue::Literal(LiteralKind::None), pos },
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.value, TypeValue::Literal(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, TypeValue::Literal(LiteralKind::None))
    }

    pub fn is_literal_kind(&self, kind: LiteralKind) -> bool {
        matches!(self.value, TypeValue::Literal(found) if found == kind)
    }

    pub fn symbol_id(&self) -> Option<SymbolId> {
        match self.value {
            TypeValue::Symbol(symbol) => Some(symbol),
            TypeValue::Literal(_) => None,
        }
    }

    /// Source-level name of the type, used in diagnostic messages.
    pub fn to_string(&self, table: &SymbolTable) -> String {
        match self.value {
            TypeValue::Literal(kind) => String::from(literal_str(kind)),
            TypeValue::Symbol(symbol) => symbol_source_name(table, symbol),
        }
    }

    /// Type compatibility.
    ///
    /// Variable and constant symbols are substituted by their declared
    /// type, events equal the Bool family, two literal families must be
    /// identical, two symbol types must agree on their source name, and
    /// a literal family against a type symbol unifies by primitive class.
    pub fn equals(&self, other: &AnalysedType, table: &SymbolTable) -> bool {
        match (self.value, other.value) {
            (TypeValue::Literal(left), TypeValue::Literal(right)) => left == right,
            (TypeValue::Symbol(_), TypeValue::Symbol(_)) => {
                self.to_string(table) == other.to_string(table)
            }
            (TypeValue::Literal(kind), TypeValue::Symbol(symbol))
            | (TypeValue::Symbol(symbol), TypeValue::Literal(kind)) => {
                let projected = match &table.get_symbol(symbol).value {
                    SymbolValue::Variable(variable) => variable.datatype,
                    SymbolValue::Constant(constant) => constant.datatype,
                    SymbolValue::Event(_) => return kind == LiteralKind::Bool,
                    _ => symbol,
                };
                let primitive = match &table.get_symbol(projected).value {
                    SymbolValue::Type(TypeDef::Primitive(primitive)) => primitive,
                    _ => return false,
                };
                match kind {
                    LiteralKind::Integer => primitive.is_integer(),
                    LiteralKind::Float => primitive.class == PrimitiveClass::Float,
                    LiteralKind::Bool => primitive.class == PrimitiveClass::Bool,
                    _ => false,
                }
            }
        }
    }
}

/// Source name a symbol contributes to type comparison: variables and
/// constants project their declared type, functions their return type,
/// types their own registered name.
fn symbol_source_name(table: &SymbolTable, symbol: SymbolId) -> String {
    let symbol = table.get_symbol(symbol);
    match &symbol.value {
        SymbolValue::Variable(variable) => table.get_symbol(variable.datatype).name.clone(),
        SymbolValue::Constant(constant) => table.get_symbol(constant.datatype).name.clone(),
        SymbolValue::Function(function) => match function.return_type {
            Some(return_type) => table.get_symbol(return_type).name.clone(),
            None => String::from("none"),
        },
        SymbolValue::Type(_) => symbol.name.clone(),
        _ => String::from("none"),
    }
}

/// Return type signature of the function whose body is being checked.
#[derive(Debug, Clone, Copy)]
struct FunctionSignature {
    return_type: Option<SymbolId>,
}

/// Second analysis walk over the syntax tree.
///
/// Resolves expression types against the symbol table built by scope
/// analysis and records conformance diagnostics. The `scope_index`
/// counter mirrors the order in which scope analysis created scopes;
/// both passes visit blocks in identical order so the counter always
/// lands on the scope the previous pass derived.
pub struct TypeAnalysisVisitor<'a> {
    table: &'a SymbolTable,
    current_scope: ScopeId,
    scope_index: usize,
    current_function: Option<FunctionSignature>,
    expected_type: AnalysedType,
    statement_context: NodeContext,
    pub errors: Vec<CompileError>,
}

impl<'a> TypeAnalysisVisitor<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        TypeAnalysisVisitor {
            table,
            current_scope: ScopeId::root(),
            scope_index: 0,
            current_function: None,
            expected_type: AnalysedType::none(),
            statement_context: NodeContext::default(),
            errors: Vec::new(),
        }
    }

    pub fn visit_program(&mut self, root: &ASTNode) {
        match root {
            ASTNode::PROGRAM(declarations) => {
                for declaration in declarations {
                    self.visit_declaration(declaration);
                }
            }
            _ => InternalError::fatal(Subsystem::ScopeAnalysis, "Program root is not a PROGRAM node."),
        }
    }

    fn push_error(&mut self, kind: ErrorKind, pos: SourcePos, expected: &str) {
        let context = self.statement_context.clone();
        self.errors.push(CompileError::new(kind, pos, &context, expected));
    }

    fn visit_declaration(&mut self, node: &ASTNode) {
        match node {
            ASTNode::SETUP_DECL { body, context } => {
                self.visit_function_decl(BUILTIN_SETUP_NAME, body, context);
            }
            ASTNode::LOOP_DECL { body, context } => {
                self.visit_function_decl(BUILTIN_LOOP_NAME, body, context);
            }
            ASTNode::EVENT_DECL { identifier, predicate, context } => {
                self.visit_event_decl(identifier, predicate.as_deref(), context);
            }
            ASTNode::ON_DECL { fqn, body, context } => {
                self.visit_on_decl(fqn, body, context);
            }
            ASTNode::VARIABLE_DECL { .. }
            | ASTNode::CONST_DECL { .. }
            | ASTNode::PIN_DECL { .. } => {
                self.visit_statement(node);
            }
            _ => InternalError::fatal(Subsystem::ScopeAnalysis, "Unexpected node at program top level."),
        }
    }

    fn visit_function_decl(&mut self, name: &str, body: &ASTNode, _context: &NodeContext) {
        let func = match self.table.find(self.current_scope, name) {
            Some(func) if self.table.get_symbol(func).kind() == SymbolKind::Function => func,
            _ => return, // scope analysis rejected the declaration
        };
        let function = self.table.get_symbol(func).function();
        let signature = FunctionSignature { return_type: function.return_type };
        let scope = function.scope;

        let outer_scope = self.current_scope;
        let outer_function = self.current_function.replace(signature);
        self.current_scope = scope;
        self.scope_index = scope.index();
        for statement in body.block_statements() {
            self.visit_statement(statement);
        }
        self.current_scope = outer_scope;
        self.current_function = outer_function;
    }

    fn visit_event_decl(&mut self, identifier: &str, predicate: Option<&ASTNode>, _context: &NodeContext) {
        let block = match predicate {
            Some(block) => block,
            None => return,
        };
        let event = match self.table.find(self.current_scope, identifier) {
            Some(symbol) if self.table.get_symbol(symbol).kind() == SymbolKind::Event => symbol,
            _ => return,
        };
        let event = self.table.get_symbol(event).event();
        let function = match &event.predicate {
            Some(function) if event.has_predicate => function,
            _ => return,
        };
        // Only the declaration that actually owns the predicate advances
        // into its scope; a rejected duplicate must not desync the
        // counter.
        if function.scope.index() != self.scope_index + 1 {
            return;
        }

        let signature = FunctionSignature { return_type: function.return_type };
        let outer_function = self.current_function.replace(signature);
        self.visit_statement(block);
        self.current_function = outer_function;
    }

    fn visit_on_decl(&mut self, fqn: &str, body: &ASTNode, context: &NodeContext) {
        self.statement_context = context.clone();
        match self.table.find(self.current_scope, fqn) {
            None => {
                self.push_error(ErrorKind::TypeMismatch, context.pos, "Event");
            }
            Some(symbol) => {
                if self.table.get_symbol(symbol).kind() != SymbolKind::Event {
                    self.push_error(ErrorKind::TypeMismatch, context.pos, "Event");
                }
            }
        }

        // Handlers have no return value.
        let signature = FunctionSignature { return_type: None };
        let outer_function = self.current_function.replace(signature);
        self.visit_statement(body);
        self.current_function = outer_function;
    }

    /// Resolve the declared type of a typed identifier.
    fn typed_identifier_type(&self, type_name: &str, context: &NodeContext) -> AnalysedType {
        match self.table.find(self.current_scope, type_name) {
            Some(symbol) if self.table.get_symbol(symbol).kind() == SymbolKind::Type => {
                AnalysedType::symbol(Some(symbol), context.pos)
            }
            _ => AnalysedType::literal(LiteralKind::Undefined, context.pos),
        }
    }

    fn check_initializer(&mut self, declared: AnalysedType, expression: &ASTNode) {
        self.expected_type = declared;
        let expression_type = self.visit_expression(expression);
        self.expected_type = AnalysedType::none();

        if expression_type.is_literal_kind(LiteralKind::Undefined) {
            self.push_error(ErrorKind::UndefinedType, expression_type.pos, "");
        } else if !declared.equals(&expression_type, self.table) {
            let expected = declared.to_string(self.table);
            self.push_error(ErrorKind::TypeMismatch, expression_type.pos, &expected);
        }
    }

    fn visit_statement(&mut self, node: &ASTNode) {
        match node {
            ASTNode::VARIABLE_DECL { type_name, expression, context, .. } => {
                self.statement_context = context.clone();
                let declared = self.typed_identifier_type(type_name, context);
                if declared.is_literal_kind(LiteralKind::Undefined) {
                    self.push_error(ErrorKind::UndefinedType, context.pos, "");
                } else if let Some(expression) = expression {
                    self.check_initializer(declared, expression);
                }
            }
            ASTNode::CONST_DECL { type_name, expression, context, .. } => {
                self.statement_context = context.clone();
                let declared = self.typed_identifier_type(type_name, context);
                if declared.is_literal_kind(LiteralKind::Undefined) {
                    self.push_error(ErrorKind::UndefinedType, context.pos, "");
                } else {
                    self.check_initializer(declared, expression);
                }
            }
            ASTNode::PIN_DECL { expression, context, .. } => {
                self.statement_context = context.clone();
                if let Some(expression) = expression {
                    let expression_type = self.visit_expression(expression);
                    let u8_type = AnalysedType::symbol(self.table.find(ScopeId::root(), "u8"), SourcePos::default());
                    if !u8_type.equals(&expression_type, self.table) {
                        let expected = u8_type.to_string(self.table);
                        self.push_error(ErrorKind::TypeMismatch, expression_type.pos, &expected);
                    }
                }
            }
            ASTNode::STMT_BLOCK(statements) => {
                self.scope_index += 1;
                if self.scope_index >= self.table.scope_count() {
                    InternalError::fatal(Subsystem::ScopeAnalysis, "Type analysis visited a block the scope analysis never created.");
                }
                let outer_scope = self.current_scope;
                self.current_scope = ScopeId::new(self.scope_index);
                for statement in statements {
                    self.visit_statement(statement);
                }
                self.current_scope = outer_scope;
            }
            ASTNode::EXPRESSION_STMT { expression, context } => {
                self.statement_context = context.clone();
                self.visit_expression(expression);
            }
            ASTNode::AWAIT_STMT { expression, context } => {
                self.statement_context = context.clone();
                let expression_type = self.visit_expression(expression);
                let boolean = AnalysedType::literal(LiteralKind::Bool, SourcePos::default());
                if !expression_type.equals(&boolean, self.table) {
                    self.push_error(ErrorKind::TypeMismatch, expression_type.pos, "Bool");
                }
            }
            ASTNode::RETURN_STMT { expression, context } => {
                self.statement_context = context.clone();
                self.visit_return_stmt(expression.as_deref(), context);
            }
            ASTNode::IF_STMT { condition, if_branch, else_branch, context } => {
                self.statement_context = context.clone();
                self.check_condition(condition);
                self.visit_statement(if_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_statement(else_branch);
                }
            }
            ASTNode::WHILE_STMT { condition, body, context } => {
                self.statement_context = context.clone();
                self.check_condition(condition);
                self.visit_statement(body);
            }
            ASTNode::BREAK_STMT { .. } | ASTNode::CONTINUE_STMT { .. } => {}
            ASTNode::EMIT_STMT { fqn, context } => {
                self.statement_context = context.clone();
                match self.table.find(self.current_scope, fqn) {
                    Some(symbol) if self.table.get_symbol(symbol).kind() == SymbolKind::Event => {}
                    Some(_) => self.push_error(ErrorKind::TypeMismatch, context.pos, "Event"),
                    None => {} // surfaced through the unresolved symbol list
                }
            }
            ASTNode::SET_PIN_VALUE_STMT { fqn, fqn_pos, expression, context }
            | ASTNode::SET_PIN_MODE_STMT { fqn, fqn_pos, expression, context }
            | ASTNode::SET_PIN_NUMBER_STMT { fqn, fqn_pos, expression, context } => {
                self.statement_context = context.clone();
                let pin = AnalysedType::symbol(self.table.find(self.current_scope, fqn), *fqn_pos);
                let expression_type = self.visit_expression(expression);
                self.check_pin_stmt(pin, expression_type);
            }
            _ => InternalError::fatal(Subsystem::ScopeAnalysis, "Unexpected node in statement position."),
        }
    }

    fn check_condition(&mut self, condition: &ASTNode) {
        let condition_type = self.visit_expression(condition);
        if condition_type.is_null() {
            return;
        }
        let boolean = AnalysedType::literal(LiteralKind::Bool, SourcePos::default());
        if !condition_type.equals(&boolean, self.table) {
            self.push_error(ErrorKind::TypeMismatch, condition_type.pos, "Bool");
        }
    }

    fn check_pin_stmt(&mut self, pin: AnalysedType, expression: AnalysedType) {
        let digital = AnalysedType::symbol(Some(self.table.primitive("digital")), SourcePos::default());
        let analog = AnalysedType::symbol(Some(self.table.primitive("analog")), SourcePos::default());
        let u8_type = AnalysedType::symbol(Some(self.table.primitive("u8")), SourcePos::default());

        if pin.is_null() {
            return;
        }
        if !pin.equals(&digital, self.table) && !pin.equals(&analog, self.table) {
            self.push_error(ErrorKind::TypeMismatch, pin.pos, "digital or analog");
            return;
        }
        if expression.is_null() || !expression.equals(&u8_type, self.table) {
            let expected = u8_type.to_string(self.table);
            self.push_error(ErrorKind::TypeMismatch, expression.pos, &expected);
        }
    }

    fn visit_return_stmt(&mut self, expression: Option<&ASTNode>, context: &NodeContext) {
        let signature = match self.current_function {
            Some(signature) => signature,
            None => InternalError::fatal(Subsystem::ScopeAnalysis, "Return statement outside of a function body."),
        };

        match expression {
            None => {
                if let Some(return_type) = signature.return_type {
                    let expected = AnalysedType::symbol(Some(return_type), SourcePos::default()).to_string(self.table);
                    self.push_error(ErrorKind::InvalidReturnType, context.pos, &expected);
                }
            }
            Some(expression) => {
                let expression_type = self.visit_expression(expression);
                match signature.return_type {
                    None => {
                        if !expression_type.is_literal_kind(LiteralKind::Undefined) {
                            self.push_error(ErrorKind::InvalidReturnType, expression_type.pos, "return;");
                        }
                    }
                    Some(return_type) => {
                        let declared = AnalysedType::symbol(Some(return_type), SourcePos::default());
                        if !expression_type.equals(&declared, self.table) {
                            let expected = declared.to_string(self.table);
                            self.push_error(ErrorKind::InvalidReturnType, expression_type.pos, &expected);
                        }
                    }
                }
            }
        }
    }

    fn visit_expression(&mut self, node: &ASTNode) -> AnalysedType {
        match node {
            ASTNode::LITERAL { value, pos } => {
                let kind = match value {
                    Literal::INTEGER(_) => LiteralKind::Integer,
                    Literal::FLOAT(_) => LiteralKind::Float,
                    Literal::BOOL(_) => LiteralKind::Bool,
                    Literal::CHAR(_) => LiteralKind::Char,
                    Literal::STRING(_) => LiteralKind::String,
                };
                AnalysedType::literal(kind, *pos)
            }
            ASTNode::FQN_EXPR { text, pos } => {
                match self.table.find(self.current_scope, text) {
                    Some(symbol) => AnalysedType::symbol(Some(symbol), *pos),
                    None => AnalysedType::literal(LiteralKind::Undefined, *pos),
                }
            }
            ASTNode::UNARY_OP { expression, .. } => self.visit_expression(expression),
            ASTNode::CAST_EXPR { expression, type_name, pos } => {
                self.visit_expression(expression);
                match self.table.find(self.current_scope, type_name) {
                    Some(symbol) if self.table.get_symbol(symbol).kind() == SymbolKind::Type => {
                        AnalysedType::symbol(Some(symbol), *pos)
                    }
                    _ => AnalysedType::literal(LiteralKind::Undefined, *pos),
                }
            }
            ASTNode::BINARY_OP { op, lhs, rhs, .. } => {
                let left = self.visit_expression(lhs);
                let right = self.visit_expression(rhs);
                if op.is_logical() {
                    self.check_logical_operand(left);
                    self.check_logical_operand(right);
                    return left;
                }
                self.check_binary_operands(left, right);
                if op.is_comparison() {
                    return AnalysedType::literal(LiteralKind::Bool, left.pos);
                }
                left
            }
            ASTNode::ASSIGN_EXPR { target, expression, .. } => {
                let variable = self.visit_expression(target);
                let expression_type = self.visit_expression(expression);
                self.check_assignment(variable, expression_type);
                variable
            }
            ASTNode::FUNC_CALL { fqn, arguments, pos } => {
                let outer_expected = self.expected_type;
                self.expected_type = AnalysedType::none();
                for argument in arguments {
                    self.visit_expression(argument);
                }
                self.expected_type = outer_expected;

                match self.table.find(self.current_scope, fqn) {
                    Some(symbol) => match &self.table.get_symbol(symbol).value {
                        SymbolValue::Function(function) => AnalysedType::symbol(function.return_type, *pos),
                        SymbolValue::ExternFunction(function) => AnalysedType::symbol(function.return_type, *pos),
                        _ => AnalysedType::literal(LiteralKind::Undefined, *pos),
                    },
                    None => AnalysedType::literal(LiteralKind::Undefined, *pos),
                }
            }
            ASTNode::READ_PIN_EXPR { fqn, pos } => {
                let pin = AnalysedType::symbol(self.table.find(self.current_scope, fqn), *pos);
                let digital = AnalysedType::symbol(Some(self.table.primitive("digital")), SourcePos::default());
                let analog = AnalysedType::symbol(Some(self.table.primitive("analog")), SourcePos::default());
                if !pin.is_null()
                    && !pin.equals(&digital, self.table)
                    && !pin.equals(&analog, self.table) {
                    self.push_error(ErrorKind::TypeMismatch, pin.pos, "digital or analog");
                }
                AnalysedType::symbol(self.table.find(ScopeId::root(), "u8"), *pos)
            }
            _ => InternalError::fatal(Subsystem::ScopeAnalysis, "Unexpected node in expression position."),
        }
    }

    /// Binary arithmetic, bitwise and comparison operands must satisfy
    /// the contextual expected type when one is set, and otherwise must
    /// agree with each other.
    fn check_binary_operands(&mut self, left: AnalysedType, right: AnalysedType) {
        if self.expected_type.is_null() {
            if !left.equals(&right, self.table) {
                let expected = left.to_string(self.table);
                self.push_error(ErrorKind::TypeMismatch, right.pos, &expected);
            }
        } else {
            let expected_type = self.expected_type;
            if !left.equals(&expected_type, self.table) {
                let expected = expected_type.to_string(self.table);
                self.push_error(ErrorKind::TypeMismatch, right.pos, &expected);
            }
        }
    }

    fn check_logical_operand(&mut self, operand: AnalysedType) {
        let boolean = AnalysedType::literal(LiteralKind::Bool, SourcePos::default());
        if operand.is_null() || !operand.equals(&boolean, self.table) {
            self.push_error(ErrorKind::TypeMismatch, operand.pos, "Bool");
        }
    }

    fn check_assignment(&mut self, variable: AnalysedType, expression: AnalysedType) {
        let is_variable_symbol = match variable.symbol_id() {
            Some(symbol) => self.table.get_symbol(symbol).kind() == SymbolKind::Variable,
            None => false,
        };
        if variable.is_null() || variable.is_literal() || !is_variable_symbol {
            self.push_error(ErrorKind::ExpectedVariable, variable.pos, "");
            return;
        }
        if !variable.equals(&expression, self.table) {
            let expected = variable.to_string(self.table);
            self.push_error(ErrorKind::TypeMismatch, expression.pos, &expected);
        }
    }
}
