use super::BackEndGenerator;

use super::super::ast::{ASTNode, UnaryOperation};
use super::super::error::{InternalError, Subsystem};
use super::super::semantic_analyser::{BUILTIN_LOOP_NAME, BUILTIN_SETUP_NAME};
use super::super::sequence::{PointKind, Sequence};
use super::super::symbol_table::{ScopeId, SymbolId, SymbolTable};
use super::super::symbol_table::symbols::{Function, SymbolKind, SymbolValue};

/// CppSourceGenerator is a Backend for EEL.
/// It generates C++ source targeting the EEL runtime headers from an
/// analysed Abstract Syntax Tree.
///
/// # Implementation Details
///   + Every function lowers to a functor type. A synchronous function
///     becomes `struct T { static R invoke() { ... } };`. An asynchronous
///     function becomes an AsyncFunction with a `State` struct holding the
///     program counter `s`, an optional return slot `r` and one field per
///     variable declared in an Async block, plus `step`/`begin_invoke`
///     members driving a switch-based state machine.
///   + Events lower to `Event<Predicate, Handles...>` aggregates; the
///     assembled `main` dispatches them through `run_handles` each tick.
pub struct CppSourceGenerator;

impl BackEndGenerator for CppSourceGenerator {
    /// Creates a default configuration of CppSourceGenerator
    fn default() -> Self {
        CppSourceGenerator
    }

    /// Generates target source from an Abstract Syntax Tree
    fn generate(self, tree: &ASTNode, table: &mut SymbolTable) -> String {
        let mut visitor = CodegenVisitor::new(table);
        visitor.generate_program(tree);
        visitor.out
    }
}

/// Mangled identifier of a variable symbol in the emitted source.
fn variable_id(symbol: SymbolId) -> String {
    format!("__v{}", symbol.index())
}

/// Third walk over the syntax tree. Emits target text by querying the
/// symbol table and each function's sequence graph; the cursor of a
/// cloned sequence tracks the statement walk so the generator always
/// knows whether it is inside an Async region.
pub(crate) struct CodegenVisitor<'a> {
    table: &'a mut SymbolTable,
    pub out: String,

    current_scope: ScopeId,
    current_sequence: Option<Sequence>,
    async_state_counter: usize,
    is_in_async_state_case: bool,

    events: Vec<SymbolId>,
}

impl<'a> CodegenVisitor<'a> {
    pub fn new(table: &'a mut SymbolTable) -> Self {
        // Serial helpers are always available to generated programs.
        // Parameter types are omitted for the print functions due to not
        // having a way of handling overloaded functions.
        let usize_type = table.primitive("usize");
        let u32_type = table.primitive("u32");
        table.declare_fn_cpp("serial_print", "Serial.print", Some(usize_type), vec![]);
        table.declare_fn_cpp("serial_println", "Serial.println", Some(usize_type), vec![]);
        table.declare_fn_cpp("serial_begin", "Serial.begin", Some(usize_type), vec![u32_type]);

        CodegenVisitor {
            table,
            out: String::new(),
            current_scope: ScopeId::root(),
            current_sequence: None,
            async_state_counter: 0,
            is_in_async_state_case: false,
            events: Vec::new(),
        }
    }

    fn emit(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn generate_program(&mut self, root: &ASTNode) {
        let declarations = match root {
            ASTNode::PROGRAM(declarations) => declarations,
            _ => InternalError::fatal(Subsystem::Codegen, "Program root is not a PROGRAM node."),
        };

        self.emit("#include <runtime/all.hpp>\n");
        for declaration in declarations {
            self.generate_declaration(declaration);
        }
        self.generate_main();
    }

    fn generate_declaration(&mut self, node: &ASTNode) {
        match node {
            ASTNode::SETUP_DECL { .. } => self.generate_builtin_functor(BUILTIN_SETUP_NAME),
            ASTNode::LOOP_DECL { .. } => self.generate_builtin_functor(BUILTIN_LOOP_NAME),
            ASTNode::EVENT_DECL { identifier, predicate, .. } => {
                self.generate_event_decl(identifier, predicate.is_some());
            }
            ASTNode::ON_DECL { .. } => {
                // handler code is generated as part of the event declaration
            }
            ASTNode::VARIABLE_DECL { .. }
            | ASTNode::CONST_DECL { .. }
            | ASTNode::PIN_DECL { .. } => {
                self.generate_statement(node);
            }
            _ => InternalError::fatal(Subsystem::Codegen, "Unexpected node at program top level."),
        }
    }

    fn generate_builtin_functor(&mut self, name: &str) {
        let symbol = match self.table.find(ScopeId::root(), name) {
            Some(symbol) => symbol,
            None => InternalError::fatal(Subsystem::Codegen, "Reserved function missing from the root scope."),
        };
        let function = self.table.get_symbol(symbol).function().clone();
        self.generate_functor(&function);
    }

    fn generate_functor(&mut self, function: &Function) {
        if function.is_async() {
            self.generate_async_functor_type(function);
        } else {
            self.generate_sync_functor_type(function);
        }
    }

    /// Target name of a type symbol, following one indirection hop.
    fn type_target_name(&self, symbol: SymbolId) -> String {
        let symbol = self.table.resolve(symbol);
        match &self.table.get_symbol(symbol).value {
            SymbolValue::Type(type_def) => String::from(type_def.target_name()),
            _ => InternalError::fatal(Subsystem::Codegen, "Expected a type symbol while emitting a type name."),
        }
    }

    /*
     * Functor emission
     */

    fn generate_sync_functor_type(&mut self, function: &Function) {
        let return_type_name = match function.return_type {
            Some(return_type) => self.type_target_name(return_type),
            None => String::from("void"),
        };
        let header = format!("struct {} {{ static {} invoke() {{", function.type_id, return_type_name);
        self.emit(&header);
        self.generate_functor_core(function);
        self.emit("} };");
    }

    fn generate_async_functor_type(&mut self, function: &Function) {
        self.async_state_counter = 0;
        self.is_in_async_state_case = false;

        let header = format!("struct {} : AsyncFunction {{struct State {{u8 s;", function.type_id);
        self.emit(&header);

        if let Some(return_type) = function.return_type {
            let slot = format!("{} r;", self.type_target_name(return_type));
            self.emit(&slot);
        }

        // Every variable declared in an Async block survives a suspension
        // and therefore becomes a state field.
        let sequence = match &function.sequence {
            Some(sequence) => sequence,
            None => InternalError::fatal(Subsystem::Codegen, "Async functor requested for a function without a sequence."),
        };
        let mut fields = String::new();
        for scope in sequence.async_block_scopes() {
            for member in self.table.get_scope(scope).members_ordered() {
                let symbol = self.table.get_symbol(member);
                if symbol.kind() != SymbolKind::Variable {
                    continue;
                }
                let datatype = symbol.variable().datatype;
                fields.push_str(&format!("{} {};\n", self.type_target_name(datatype), variable_id(member)));
            }
        }
        self.emit(&fields);

        self.emit("};");
        self.emit("static int step(State& state) {switch (state.s) {");
        self.generate_functor_core(function);
        self.emit("} } static int begin_invoke(State& state");

        for &parameter in &function.parameters {
            let datatype = self.table.get_symbol(parameter).variable().datatype;
            let declaration = format!(", {}& {}", self.type_target_name(datatype), variable_id(parameter));
            self.emit(&declaration);
        }
        self.emit(") { state.s = 0;");
        for &parameter in &function.parameters {
            let name = variable_id(parameter);
            self.emit(&format!("state.{} = {};", name, name));
        }
        self.emit("return step(state);} };");
    }

    fn generate_functor_core(&mut self, function: &Function) {
        let mut sequence = match &function.sequence {
            Some(sequence) => sequence.clone(),
            None => InternalError::fatal(Subsystem::Codegen, "Function has no sequence graph."),
        };
        sequence.reset();

        let outer_scope = self.current_scope;
        self.current_scope = sequence.root_scope();
        self.current_sequence = Some(sequence);

        let body = match &function.body {
            Some(body) => body,
            None => InternalError::fatal(Subsystem::Codegen, "Function has no body."),
        };
        for statement in body.block_statements() {
            self.generate_statement(statement);
        }

        if function.is_async() {
            self.close_open_async_case();
            let done = format!("case {}: {{ return 1; }}", self.async_state_counter);
            self.emit(&done);
        }

        self.current_scope = outer_scope;
        self.current_sequence = None;
    }

    fn close_open_async_case(&mut self) {
        if self.is_in_async_state_case {
            self.emit("state.s += 1; return 0; }");
            self.is_in_async_state_case = false;
        }
    }

    fn open_async_case(&mut self) {
        let case = format!("case {}: {{", self.async_state_counter);
        self.async_state_counter += 1;
        self.emit(&case);
        self.is_in_async_state_case = true;
    }

    /*
     * Event emission
     */

    fn generate_event_decl(&mut self, identifier: &str, has_predicate_block: bool) {
        let symbol = match self.table.find(ScopeId::root(), identifier) {
            Some(symbol) if self.table.get_symbol(symbol).kind() == SymbolKind::Event => symbol,
            _ => InternalError::fatal(Subsystem::Codegen, "Invalid symbol. Expected event."),
        };
        if !self.table.get_symbol(symbol).event().is_complete {
            InternalError::fatal(Subsystem::Codegen, "Incomplete event encountered during codegen.");
        }

        self.events.push(symbol);

        // Late reconciliation: a declaration without a predicate block
        // leaves the event predicateless even if an earlier incomplete
        // record claimed otherwise.
        if !has_predicate_block {
            self.table.get_symbol_mut(symbol).event_mut().has_predicate = false;
        }

        let event = self.table.get_symbol(symbol).event().clone();

        for handle in event.get_handles().values() {
            self.generate_functor(handle);
        }

        let mut predicate_type = String::from("PredicateLess");
        if event.has_predicate {
            let predicate = event.predicate.as_ref().unwrap();
            predicate_type = predicate.type_id.clone();
            self.generate_functor(predicate);
        }

        self.emit(&format!("Event<{}", predicate_type));
        for handle in event.get_handles().values() {
            self.emit(&format!(", {}", handle.type_id));
        }
        self.emit(&format!("> {} {{}};\n", event.id));
    }

    /*
     * Statements
     */

    fn generate_statement(&mut self, node: &ASTNode) {
        // Inside an async region every statement lives in a numbered
        // dispatch case. Await statements open their own case.
        let is_await = matches!(node, ASTNode::AWAIT_STMT { .. });
        let should_open = match &self.current_sequence {
            Some(sequence) => {
                sequence.current_block_is_async()
                    && !is_await
                    && !self.is_in_async_state_case
            }
            None => false,
        };
        if should_open {
            self.open_async_case();
        }

        match node {
            ASTNode::VARIABLE_DECL { identifier, expression, .. } => {
                self.generate_variable_decl(identifier, expression.as_deref());
            }
            ASTNode::CONST_DECL { identifier, expression, .. } => {
                self.generate_const_decl(identifier, expression);
            }
            ASTNode::PIN_DECL { identifier, expression, .. } => {
                self.generate_pin_decl(identifier, expression.as_deref());
            }
            ASTNode::STMT_BLOCK(statements) => {
                self.generate_stmt_block(statements);
            }
            ASTNode::AWAIT_STMT { expression, .. } => {
                self.generate_await_stmt(expression);
            }
            ASTNode::RETURN_STMT { expression, .. } => {
                self.generate_return_stmt(expression.as_deref());
            }
            ASTNode::IF_STMT { condition, if_branch, else_branch, .. } => {
                self.generate_if_stmt(condition, if_branch, else_branch.as_deref());
            }
            ASTNode::WHILE_STMT { condition, body, .. } => {
                self.generate_while_stmt(condition, body);
            }
            ASTNode::BREAK_STMT { .. } => {
                self.emit("break;");
            }
            ASTNode::CONTINUE_STMT { .. } => {
                self.emit("continue;");
            }
            ASTNode::EMIT_STMT { fqn, .. } => {
                self.generate_emit_stmt(fqn);
            }
            ASTNode::SET_PIN_VALUE_STMT { fqn, expression, .. } => {
                let pin_name = self.generate_identifier(fqn);
                let value = self.generate_expression(expression);
                self.emit(&format!("{}.write({});", pin_name, value));
            }
            ASTNode::SET_PIN_MODE_STMT { fqn, expression, .. } => {
                let pin_name = self.generate_identifier(fqn);
                let value = self.generate_expression(expression);
                self.emit(&format!("{}.set_mode({});", pin_name, value));
            }
            ASTNode::SET_PIN_NUMBER_STMT { fqn, expression, .. } => {
                let pin_name = self.generate_identifier(fqn);
                let value = self.generate_expression(expression);
                self.emit(&format!("{}.pin_id = {};", pin_name, value));
            }
            ASTNode::EXPRESSION_STMT { expression, .. } => {
                let text = self.generate_expression(expression);
                self.emit(&format!("{};", text));
            }
            _ => InternalError::fatal(Subsystem::Codegen, "Unexpected node in statement position."),
        }
    }

    fn generate_variable_decl(&mut self, identifier: &str, expression: Option<&ASTNode>) {
        let symbol = match self.table.find(self.current_scope, identifier) {
            Some(symbol) if self.table.get_symbol(symbol).kind() == SymbolKind::Variable => symbol,
            _ => InternalError::fatal(Subsystem::Codegen, "Declared variable missing from its scope."),
        };
        let datatype = self.table.get_symbol(symbol).variable().datatype;

        let sync_position = match &self.current_sequence {
            Some(sequence) => !sequence.current_point_is_async(),
            None => true,
        };

        if sync_position {
            match expression {
                Some(expression) => {
                    let init = self.generate_expression(expression);
                    let text = format!("{} {} = {};", self.type_target_name(datatype), variable_id(symbol), init);
                    self.emit(&text);
                }
                None => {
                    let text = format!("{} {};", self.type_target_name(datatype), variable_id(symbol));
                    self.emit(&text);
                }
            }
        } else if let Some(expression) = expression {
            // The field itself lives in the functor's State struct.
            let init = self.generate_expression(expression);
            self.emit(&format!("state.{} = {};", variable_id(symbol), init));
        }
    }

    fn generate_const_decl(&mut self, identifier: &str, expression: &ASTNode) {
        let symbol = match self.table.find(self.current_scope, identifier) {
            Some(symbol) if self.table.get_symbol(symbol).kind() == SymbolKind::Constant => symbol,
            _ => InternalError::fatal(Subsystem::Codegen, "Declared constant missing from its scope."),
        };
        let datatype = match &self.table.get_symbol(symbol).value {
            SymbolValue::Constant(constant) => constant.datatype,
            _ => unreachable!(),
        };
        let init = self.generate_expression(expression);
        let text = format!("const {} {} = {};", self.type_target_name(datatype), variable_id(symbol), init);
        self.emit(&text);
    }

    fn generate_pin_decl(&mut self, identifier: &str, expression: Option<&ASTNode>) {
        let symbol = match self.table.find(self.current_scope, identifier) {
            Some(symbol) => self.table.resolve(symbol),
            None => InternalError::fatal(Subsystem::Codegen, "Declared pin missing from its scope."),
        };
        if self.table.get_symbol(symbol).kind() != SymbolKind::Variable {
            InternalError::fatal(Subsystem::Codegen, "Pin declaration does not refer to a variable.");
        }
        let datatype = self.table.get_symbol(symbol).variable().datatype;

        let pin_id = match expression {
            Some(expression) => self.generate_expression(expression),
            None => String::from("0"),
        };
        let text = format!("{} {} {{ {} }};", self.type_target_name(datatype), variable_id(symbol), pin_id);
        self.emit(&text);
    }

    fn generate_stmt_block(&mut self, statements: &[ASTNode]) {
        let sequence = match &mut self.current_sequence {
            Some(sequence) => sequence,
            None => InternalError::fatal(Subsystem::Codegen, "Statement block outside of a function body."),
        };
        let point = match sequence.next() {
            Some(point) if sequence.point(point).is_block() => point,
            _ => InternalError::fatal(Subsystem::Codegen, "Out of sync sequence point. Block object expected."),
        };
        let block_scope = sequence.point(point).scope().unwrap();
        let is_async_block = sequence.point(point).kind == PointKind::Async;

        if is_async_block {
            self.close_open_async_case();
            let case = format!("case {}:", self.async_state_counter);
            self.async_state_counter += 1;
            self.emit(&case);
            self.is_in_async_state_case = true;
        }

        let outer_scope = self.current_scope;
        self.current_scope = block_scope;

        self.emit("{");
        for statement in statements {
            self.generate_statement(statement);
        }

        if is_async_block {
            self.close_open_async_case();
        } else {
            self.emit("}");
        }
        self.current_scope = outer_scope;
    }

    fn generate_await_stmt(&mut self, expression: &ASTNode) {
        let sequence = match &mut self.current_sequence {
            Some(sequence) => sequence,
            None => InternalError::fatal(Subsystem::Codegen, "Await statement outside of a function body."),
        };
        match sequence.next() {
            Some(point) if sequence.point(point).kind == PointKind::Yield => {}
            _ => InternalError::fatal(Subsystem::Codegen, "Out of sync sequence point. YieldPoint expected."),
        }

        // Awaiting an event polls its emit flag; any other expression is
        // polled as written.
        let predicate = match expression {
            ASTNode::FQN_EXPR { text, .. } => {
                let symbol = match self.table.find(self.current_scope, text) {
                    Some(symbol) => self.table.resolve(symbol),
                    None => InternalError::fatal(Subsystem::Codegen, "Symbol lookup failure in await statement."),
                };
                match self.table.get_symbol(symbol).kind() {
                    SymbolKind::Event => format!("{}.has_emit_flag()", self.table.get_symbol(symbol).event().id),
                    SymbolKind::Variable => self.generate_identifier(text),
                    _ => InternalError::fatal(Subsystem::Codegen, "Cannot await non-event/bool expr."),
                }
            }
            _ => self.generate_expression(expression),
        };

        self.close_open_async_case();
        let case = format!("case {}: {{if ({}) state.s += 1;return 0;}}", self.async_state_counter, predicate);
        self.async_state_counter += 1;
        self.emit(&case);
    }

    fn generate_return_stmt(&mut self, expression: Option<&ASTNode>) {
        let is_async_return = match &self.current_sequence {
            Some(sequence) => sequence.is_async(),
            None => false,
        };
        match expression {
            Some(expression) => {
                let value = self.generate_expression(expression);
                if is_async_return {
                    self.emit(&format!("state.r = {};return 1;", value));
                } else {
                    self.emit(&format!("return {};", value));
                }
            }
            None => {
                if is_async_return {
                    self.emit("return 1;");
                } else {
                    self.emit("return;");
                }
            }
        }
    }

    /// Whether a branch owns a sequence point of its own.
    fn branch_has_sequence_point(branch: &ASTNode) -> bool {
        matches!(branch, ASTNode::STMT_BLOCK(_) | ASTNode::AWAIT_STMT { .. })
    }

    fn generate_if_stmt(&mut self, condition: &ASTNode, if_branch: &ASTNode, else_branch: Option<&ASTNode>) {
        let condition_text = self.generate_expression(condition);

        // Pre-scan the branch sequence points to decide which branches
        // need their own dispatch cases.
        let sequence = match &mut self.current_sequence {
            Some(sequence) => sequence,
            None => InternalError::fatal(Subsystem::Codegen, "If statement outside of a function body."),
        };
        let snapshot = sequence.snapshot();
        sequence.next();

        let mut if_is_async = false;
        if Self::branch_has_sequence_point(if_branch) {
            if_is_async = sequence.current_point_is_async();
            // Assuming the presence of a sequence point for a block or
            // yield in an else branch it is adjacent to the current point.
            sequence.skip_to_adjacent();
        }
        let else_is_async = match else_branch {
            Some(else_branch) => {
                Self::branch_has_sequence_point(else_branch) && sequence.current_point_is_async()
            }
            None => false,
        };
        sequence.restore(snapshot);

        let in_async_block = sequence.current_block_is_async();
        if in_async_block && !self.is_in_async_state_case {
            self.open_async_case();
        }

        self.emit(&format!("if ({})", condition_text));

        // All branches synchronous: plain if/else text.
        if !(if_is_async | else_is_async) {
            let suppressed = self.is_in_async_state_case;
            self.is_in_async_state_case = true;
            self.generate_statement(if_branch);
            if let Some(else_branch) = else_branch {
                self.emit("else ");
                self.generate_statement(else_branch);
            }
            self.is_in_async_state_case = suppressed;
            return;
        }

        self.is_in_async_state_case = false;

        // Async branches are emitted into a buffer and appended behind a
        // dispatch stub so each gets its own numbered case.
        let mut if_buffer = String::new();
        if if_is_async {
            self.emit(&format!("{{ state.s = {}; return 0; }}", self.async_state_counter));
            let mark = self.out.len();
            self.generate_statement(if_branch);
            if_buffer = self.out.split_off(mark);
        } else {
            let suppressed = self.is_in_async_state_case;
            self.is_in_async_state_case = true;
            self.generate_statement(if_branch);
            self.is_in_async_state_case = suppressed;
        }

        let if_case_is_closed = !self.is_in_async_state_case;
        let if_redirection_case = if if_case_is_closed {
            let case = self.async_state_counter;
            self.async_state_counter += 1;
            case
        } else {
            0
        };
        self.is_in_async_state_case = false;

        let mut else_buffer = String::new();
        if let Some(else_branch) = else_branch {
            self.emit("else ");
            if else_is_async {
                self.emit(&format!("{{ state.s = {}; return 0; }}", self.async_state_counter));
                let mark = self.out.len();
                self.generate_statement(else_branch);
                else_buffer = self.out.split_off(mark);
            } else {
                let suppressed = self.is_in_async_state_case;
                self.is_in_async_state_case = true;
                self.generate_statement(else_branch);
                self.is_in_async_state_case = suppressed;
            }
        }

        // Proceed to the rejoin case after the if/else statement. This is
        // dead code when both branches are async, which the target
        // compiler is left to discard.
        self.emit(&format!("state.s = {}; return 0; }}", self.async_state_counter));

        let buffered = if_buffer;
        self.emit(&buffered);

        if if_is_async {
            if if_case_is_closed {
                self.emit(&format!("case {}: {{", if_redirection_case));
            }
            // Jump from the end of the if branch to the rejoin case.
            self.emit(&format!("state.s = {}; return 0;}}", self.async_state_counter));
        }

        if else_branch.is_some() {
            let buffered = else_buffer;
            self.emit(&buffered);
            self.close_open_async_case();
        }

        self.open_async_case();
    }

    fn generate_while_stmt(&mut self, condition: &ASTNode, body: &ASTNode) {
        let condition_text = self.generate_expression(condition);
        let sequence = match &mut self.current_sequence {
            Some(sequence) => sequence,
            None => InternalError::fatal(Subsystem::Codegen, "While statement outside of a function body."),
        };
        let point = match sequence.next() {
            Some(point) if sequence.point(point).is_block() => point,
            _ => InternalError::fatal(Subsystem::Codegen, "Out of sync sequence point. Block object expected."),
        };
        let block_scope = sequence.point(point).scope().unwrap();
        let is_async = sequence.point(point).is_async();

        let outer_scope = self.current_scope;
        self.current_scope = block_scope;

        if is_async {
            self.close_open_async_case();

            let while_starting_case = self.async_state_counter;
            self.async_state_counter += 1;

            let mark = self.out.len();
            for statement in body.block_statements() {
                self.generate_statement(statement);
            }
            let buffered = self.out.split_off(mark);

            // Header case: leave the loop when the condition fails, fall
            // into the body otherwise; the tail edge jumps back to the
            // header.
            self.emit(&format!("case {}: {{if (!({})) {{ state.s = {}; return 0; }}",
                               while_starting_case, condition_text, self.async_state_counter));
            self.emit(&buffered);
            self.emit(&format!("state.s = {}; return 0; }}", while_starting_case));
        } else {
            self.emit(&format!("while ({}) {{", condition_text));
            for statement in body.block_statements() {
                self.generate_statement(statement);
            }
            self.emit("}");
        }

        self.current_scope = outer_scope;
    }

    fn generate_emit_stmt(&mut self, fqn: &str) {
        let symbol = match self.table.find(self.current_scope, fqn) {
            Some(symbol) => self.table.resolve(symbol),
            None => InternalError::fatal(Subsystem::Codegen, "Symbol lookup failure in emit statement."),
        };
        match &self.table.get_symbol(symbol).value {
            SymbolValue::Event(event) => {
                let text = format!("{}.emit();", event.id);
                self.emit(&text);
            }
            _ => InternalError::fatal(Subsystem::Codegen, "Emit target is not an event."),
        }
    }

    /*
     * Expressions - All expression generators produce a target source
     *             string.
     */

    fn generate_expression(&mut self, node: &ASTNode) -> String {
        match node {
            ASTNode::LITERAL { value, .. } => value.as_target_text(),
            ASTNode::FQN_EXPR { text, .. } => self.generate_identifier(text),
            ASTNode::UNARY_OP { op, expression, .. } => {
                let inner = self.generate_expression(expression);
                match op {
                    UnaryOperation::POSITIVE => inner,
                    UnaryOperation::NEGATE => format!("-({})", inner),
                    UnaryOperation::NOT => format!("!({})", inner),
                    UnaryOperation::BIT_COMPLEMENT => format!("~({})", inner),
                }
            }
            ASTNode::BINARY_OP { op, lhs, rhs, .. } => {
                format!("({}){}({})",
                        self.generate_expression(lhs),
                        op.as_target_text(),
                        self.generate_expression(rhs))
            }
            ASTNode::ASSIGN_EXPR { op, target, expression, .. } => {
                format!("{} {} {}",
                        self.generate_expression(target),
                        op.as_target_text(),
                        self.generate_expression(expression))
            }
            ASTNode::CAST_EXPR { expression, type_name, .. } => {
                let type_symbol = match self.table.find(self.current_scope, type_name) {
                    Some(symbol) => symbol,
                    None => InternalError::fatal(Subsystem::Codegen, "Cast to an unknown type."),
                };
                format!("static_cast<{}>({})",
                        self.type_target_name(type_symbol),
                        self.generate_expression(expression))
            }
            ASTNode::FUNC_CALL { fqn, arguments, .. } => {
                self.generate_function_call(fqn, arguments)
            }
            ASTNode::READ_PIN_EXPR { fqn, .. } => {
                format!("{}.read()", self.generate_identifier(fqn))
            }
            _ => InternalError::fatal(Subsystem::Codegen, "Unexpected node in expression position."),
        }
    }

    /// Emit an identifier reference. Inside an async function a variable
    /// declared in an Async block lives in the functor state and is
    /// accessed through `state.`; everything else uses the plain mangled
    /// id.
    fn generate_identifier(&mut self, text: &str) -> String {
        let mut symbol = None;
        let mut is_in_async_state = false;

        if let Some(sequence) = &self.current_sequence {
            if sequence.is_async() {
                let state_root = sequence.root_scope();
                let async_scopes = sequence.async_block_scopes();
                let mut current = self.current_scope;
                loop {
                    if let Some(found) = self.table.find_member(current, text) {
                        symbol = Some(found);
                        is_in_async_state = async_scopes.contains(&current);
                        break;
                    }
                    if current == state_root {
                        break;
                    }
                    current = match self.table.get_scope(current).parent() {
                        Some(parent) => parent,
                        None => break,
                    };
                }
            }
        }

        let symbol = match symbol.or_else(|| self.table.find(self.current_scope, text)) {
            Some(symbol) => self.table.resolve(symbol),
            None => InternalError::fatal(Subsystem::Codegen, "Symbol lookup failure."),
        };
        if self.table.get_symbol(symbol).kind() != SymbolKind::Variable {
            InternalError::fatal(Subsystem::Codegen, "Symbol referenced in an expression is not a Variable.");
        }

        let id = variable_id(symbol);
        if is_in_async_state {
            format!("state.{}", id)
        } else {
            id
        }
    }

    fn generate_function_call(&mut self, fqn: &str, arguments: &[ASTNode]) -> String {
        let symbol = match self.table.find(self.current_scope, fqn) {
            Some(symbol) => self.table.resolve(symbol),
            None => InternalError::fatal(Subsystem::Codegen, "Symbol lookup failure in function call."),
        };

        let target = match &self.table.get_symbol(symbol).value {
            SymbolValue::ExternFunction(function) => function.target_id.clone(),
            SymbolValue::Function(_) => {
                InternalError::fatal(Subsystem::Codegen, "Call to non external functions is not currently supported.")
            }
            _ => InternalError::fatal(Subsystem::Codegen, "Call to non function symbol encountered."),
        };

        let arguments: Vec<String> = arguments.iter()
            .map(|argument| self.generate_expression(argument))
            .collect();
        format!("{}({})", target, arguments.join(","))
    }

    /*
     * Main assembly
     */

    fn generate_main(&mut self) {
        static SETUP_STATE_ID: &str = "__setup_state";
        static LOOP_STATE_ID: &str = "__loop_state";

        let event_ids: Vec<String> = self.events.iter()
            .map(|&event| self.table.get_symbol(event).event().id.clone())
            .collect();

        let setup = self.table.find(ScopeId::root(), BUILTIN_SETUP_NAME)
            .map(|symbol| {
                let function = self.table.get_symbol(symbol).function();
                (function.type_id.clone(), function.is_async())
            });
        let loop_ = self.table.find(ScopeId::root(), BUILTIN_LOOP_NAME)
            .map(|symbol| {
                let function = self.table.get_symbol(symbol).function();
                (function.type_id.clone(), function.is_async())
            });

        self.emit("\nint main(void) {\n");

        if let Some((type_id, is_async)) = &setup {
            if *is_async {
                // Events keep dispatching while an asynchronous setup is
                // still stepping.
                self.emit(&format!("{}::State {} {{}};\nwhile (!{}::step({})) {{\n",
                                   type_id, SETUP_STATE_ID, type_id, SETUP_STATE_ID));
                for event_id in &event_ids {
                    self.emit(&format!("run_handles<decltype({})>({});\n", event_id, event_id));
                }
                self.emit("}\n");
            } else {
                self.emit(&format!("{}::invoke();\n", type_id));
            }
        }

        if let Some((type_id, is_async)) = &loop_ {
            if *is_async {
                self.emit(&format!("{}::State {} {{}};\n", type_id, LOOP_STATE_ID));
            }
        }

        self.emit("while (true) {\n");
        for event_id in &event_ids {
            self.emit(&format!("run_handles<decltype({})>({});\n", event_id, event_id));
        }
        if let Some((type_id, is_async)) = &loop_ {
            if *is_async {
                self.emit(&format!("if ({}::step({})) {}.s = 0;\n",
                                   type_id, LOOP_STATE_ID, LOOP_STATE_ID));
            } else {
                self.emit(&format!("{}::invoke();\n", type_id));
            }
        }
        self.emit("}\n");
        self.emit("return 0; }\n");
    }
}
