use super::{BUILTIN_LOOP_NAME, BUILTIN_SETUP_NAME};
use super::super::ast::{ASTNode, NodeContext};
use super::super::error::{CompileError, ErrorKind, InternalError, Subsystem};
use super::super::sequence::Sequence;
use super::super::symbol_table::{ScopeId, SymbolId, SymbolTable};
use super::super::symbol_table::symbols::{Function, SymbolKind, SymbolValue};

/// First analysis walk over the syntax tree.
///
/// Creates scopes, declares variables, constants, events and handlers,
/// builds the sequence graph of every function body and records forward
/// references as unresolved symbols. Diagnostics accumulate locally;
/// malformed trees that the parser should have rejected are fatal.
pub struct ScopeAnalysisVisitor<'a> {
    table: &'a mut SymbolTable,
    current_scope: ScopeId,
    /// Event whose predicate body is currently being analysed.
    #[allow(dead_code)] // Kept as visitor context; nothing consumes it yet
    current_event: Option<SymbolId>,
    /// Sequence graph of the enclosing function body, if any.
    active_sequence: Option<Sequence>,
    pub errors: Vec<CompileError>,
}

impl<'a> ScopeAnalysisVisitor<'a> {
    pub fn new(table: &'a mut SymbolTable) -> Self {
        ScopeAnalysisVisitor {
            table,
            current_scope: ScopeId::root(),
            current_event: None,
            active_sequence: None,
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

    /// Setup and loop bodies both become functions under their reserved
    /// names, installed in the root scope.
    fn visit_function_decl(&mut self, name: &str, body: &ASTNode, context: &NodeContext) {
        if !self.current_scope.is_root() {
            InternalError::fatal(Subsystem::ScopeAnalysis, "Setup/loop declaration encountered in non-root scope context.");
        }

        let func = match self.table.declare_func(name, None) {
            Some(func) => func,
            None => {
                self.errors.push(CompileError::new(ErrorKind::AlreadyDefined, context.pos, context, ""));
                return;
            }
        };

        let scope = self.table.get_symbol(func).function().scope;
        self.table.get_symbol_mut(func).function_mut().body = Some(body.clone());

        let outer_scope = self.current_scope;
        self.current_scope = scope;
        self.active_sequence = Some(Sequence::new(scope));
        for statement in body.block_statements() {
            self.visit_statement(statement);
        }
        let sequence = self.active_sequence.take().unwrap();
        self.table.get_symbol_mut(func).function_mut().sequence = Some(sequence);
        self.current_scope = outer_scope;
    }

    fn visit_event_decl(&mut self, identifier: &str, predicate: Option<&ASTNode>, context: &NodeContext) {
        // Pre-check the name so no scope is derived on the error paths;
        // the type analysis pass relies on scope creation order.
        if let Some(existing) = self.table.find_member(ScopeId::root(), identifier) {
            let symbol = self.table.get_symbol(existing);
            let event = match &symbol.value {
                SymbolValue::Event(event) => event,
                _ => {
                    self.errors.push(CompileError::new(ErrorKind::AlreadyDefined, context.pos, context, ""));
                    return;
                }
            };
            if event.is_complete || predicate.is_none() {
                self.errors.push(CompileError::new(ErrorKind::DuplicateEvent, context.pos, context, ""));
                return;
            }
        }

        let predicate_function = predicate.map(|body| {
            let scope = self.table.derive_scope_from(self.current_scope);
            let mut function = Function::new(scope);
            function.return_type = Some(self.table.primitive("bool"));
            function.body = Some(body.clone());
            function
        });

        let event = match self.table.declare_event(identifier, predicate_function) {
            Ok(event) => event,
            Err(kind) => {
                self.errors.push(CompileError::new(kind, context.pos, context, ""));
                return;
            }
        };

        if let Some(body) = predicate {
            let scope = self.table.get_symbol(event).event()
                .predicate.as_ref().unwrap().scope;

            self.current_event = Some(event);
            let outer_scope = self.current_scope;
            self.current_scope = scope;
            self.active_sequence = Some(Sequence::new(scope));
            for statement in body.block_statements() {
                self.visit_statement(statement);
            }
            let sequence = self.active_sequence.take().unwrap();
            self.table.get_symbol_mut(event).event_mut()
                .predicate.as_mut().unwrap().sequence = Some(sequence);
            self.current_scope = outer_scope;
            self.current_event = None;
        }
    }

    fn visit_on_decl(&mut self, fqn: &str, body: &ASTNode, context: &NodeContext) {
        let pos = context.pos;
        let scope = self.table.derive_scope_from(self.current_scope);
        let mut function = Function::new(scope);
        function.body = Some(body.clone());

        // A handler for a name taken by a non-event symbol is a user
        // error reported by type analysis; the body is still analysed so
        // the two passes stay in step.
        let event = match self.table.find_member(ScopeId::root(), fqn) {
            Some(existing) if self.table.get_symbol(existing).kind() != SymbolKind::Event => None,
            _ => Some(self.table.declare_event_handle(fqn, pos, function)),
        };

        let outer_scope = self.current_scope;
        self.current_scope = scope;
        self.active_sequence = Some(Sequence::new(scope));
        for statement in body.block_statements() {
            self.visit_statement(statement);
        }
        let sequence = self.active_sequence.take().unwrap();
        if let Some(event) = event {
            self.table.get_symbol_mut(event).event_mut()
                .get_handle_mut(pos).sequence = Some(sequence);
        }
        self.current_scope = outer_scope;
    }

    /// Resolve a declared type by name, deferring it for later resolution
    /// when no declaration has been seen yet.
    fn resolve_or_defer_type(&mut self, type_name: &str) -> SymbolId {
        match self.table.find(self.current_scope, type_name) {
            Some(existing) => existing,
            None => self.table.defer_symbol(self.current_scope, type_name, SymbolKind::Type),
        }
    }

    fn visit_statement(&mut self, node: &ASTNode) {
        match node {
            ASTNode::VARIABLE_DECL { type_name, identifier, expression, is_static, context } => {
                let datatype = self.resolve_or_defer_type(type_name);
                match self.table.declare_var(self.current_scope, datatype, identifier, *is_static) {
                    Some(var) => {
                        if expression.is_some() {
                            match &mut self.table.get_symbol_mut(var).value {
                                SymbolValue::Variable(variable) => variable.has_value = true,
                                _ => unreachable!(),
                            }
                        }
                    }
                    None => {
                        self.errors.push(CompileError::new(ErrorKind::AlreadyDefined, context.pos, context, ""));
                    }
                }
                if let Some(expression) = expression {
                    self.visit_expression(expression);
                }
            }
            ASTNode::CONST_DECL { type_name, identifier, expression, context } => {
                let datatype = self.resolve_or_defer_type(type_name);
                if self.table.declare_const(self.current_scope, datatype, identifier, expression.as_ref().clone()).is_none() {
                    self.errors.push(CompileError::new(ErrorKind::AlreadyDefined, context.pos, context, ""));
                }
                self.visit_expression(expression);
            }
            ASTNode::PIN_DECL { identifier, pin_type, expression, context } => {
                let datatype = self.resolve_or_defer_type(pin_type);
                if self.table.declare_var(self.current_scope, datatype, identifier, false).is_none() {
                    self.errors.push(CompileError::new(ErrorKind::AlreadyDefined, context.pos, context, ""));
                }
                if let Some(expression) = expression {
                    self.visit_expression(expression);
                }
            }
            ASTNode::STMT_BLOCK(statements) => {
                if self.active_sequence.is_none() {
                    InternalError::fatal(Subsystem::ScopeAnalysis, "Statement block visited without an active sequence.");
                }
                let inner_scope = self.table.derive_scope_from(self.current_scope);
                self.active_sequence.as_mut().unwrap().enter_block(inner_scope);

                let outer_scope = self.current_scope;
                self.current_scope = inner_scope;
                for statement in statements {
                    self.visit_statement(statement);
                }
                self.current_scope = outer_scope;
                self.active_sequence.as_mut().unwrap().leave_block();
            }
            ASTNode::AWAIT_STMT { expression, .. } => {
                if self.active_sequence.is_none() {
                    InternalError::fatal(Subsystem::ScopeAnalysis, "Await statement visited without an active sequence.");
                }
                self.active_sequence.as_mut().unwrap().yield_point();

                // Record the awaited flag when the expression names an
                // event that is already known.
                if let ASTNode::FQN_EXPR { text, .. } = expression.as_ref() {
                    if let Some(symbol) = self.table.find(self.current_scope, text) {
                        if self.table.get_symbol(symbol).kind() == SymbolKind::Event {
                            self.table.get_symbol_mut(symbol).event_mut().is_awaited = true;
                            return;
                        }
                    }
                }
                self.visit_expression(expression);
            }
            ASTNode::RETURN_STMT { expression, .. } => {
                if let Some(expression) = expression {
                    self.visit_expression(expression);
                }
            }
            ASTNode::IF_STMT { condition, if_branch, else_branch, .. } => {
                self.visit_expression(condition);
                self.visit_statement(if_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_statement(else_branch);
                }
            }
            ASTNode::WHILE_STMT { condition, body, .. } => {
                self.visit_expression(condition);
                self.visit_statement(body);
            }
            ASTNode::BREAK_STMT { .. } | ASTNode::CONTINUE_STMT { .. } => {}
            ASTNode::EMIT_STMT { fqn, .. } => {
                if self.table.find(self.current_scope, fqn).is_none() {
                    self.table.defer_symbol(self.current_scope, fqn, SymbolKind::Event);
                }
            }
            ASTNode::SET_PIN_VALUE_STMT { fqn, expression, .. }
            | ASTNode::SET_PIN_MODE_STMT { fqn, expression, .. }
            | ASTNode::SET_PIN_NUMBER_STMT { fqn, expression, .. } => {
                if self.table.find(self.current_scope, fqn).is_none() {
                    self.table.defer_symbol(self.current_scope, fqn, SymbolKind::Variable);
                }
                self.visit_expression(expression);
            }
            ASTNode::EXPRESSION_STMT { expression, .. } => {
                self.visit_expression(expression);
            }
            _ => InternalError::fatal(Subsystem::ScopeAnalysis, "Unexpected node in statement position."),
        }
    }

    fn visit_expression(&mut self, node: &ASTNode) {
        match node {
            ASTNode::FQN_EXPR { text, .. } => {
                if self.table.find(self.current_scope, text).is_none() {
                    self.table.defer_symbol(self.current_scope, text, SymbolKind::Variable);
                }
            }
            ASTNode::LITERAL { .. } => {}
            ASTNode::UNARY_OP { expression, .. } => {
                self.visit_expression(expression);
            }
            ASTNode::CAST_EXPR { expression, .. } => {
                self.visit_expression(expression);
            }
            ASTNode::BINARY_OP { lhs, rhs, .. } => {
                self.visit_expression(lhs);
                self.visit_expression(rhs);
            }
            ASTNode::ASSIGN_EXPR { target, expression, .. } => {
                self.visit_expression(target);
                self.visit_expression(expression);
            }
            ASTNode::FUNC_CALL { arguments, .. } => {
                // The call target is left to the code generator; only
                // argument expressions introduce identifier references.
                for argument in arguments {
                    self.visit_expression(argument);
                }
            }
            ASTNode::READ_PIN_EXPR { fqn, .. } => {
                if self.table.find(self.current_scope, fqn).is_none() {
                    self.table.defer_symbol(self.current_scope, fqn, SymbolKind::Variable);
                }
            }
            _ => InternalError::fatal(Subsystem::ScopeAnalysis, "Unexpected node in expression position."),
        }
    }
}
