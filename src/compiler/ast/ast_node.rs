use super::literals::Literal;
use super::operators::{UnaryOperation, BinaryOperation, AssignOperation};
use super::source_pos::{NodeContext, SourcePos};

#[derive(Debug, Clone, PartialEq)]
#[allow(non_camel_case_types)]
pub enum ASTNode {
    /// Root of a parsed EEL program. Holds the top level declarations
    /// in source order.
    PROGRAM(Vec<ASTNode>),

    /// Setup declaration. The body runs once at boot before the main
    /// dispatch loop is entered.
    ///
    /// # Example:
    ///     setup { serial_begin(9600); }
    SETUP_DECL {
        body: Box<ASTNode>,
        context: NodeContext
    },

    /// Loop declaration. The body runs once per tick of the main
    /// dispatch loop.
    ///
    /// # Example:
    ///     loop { x = x + 1; }
    LOOP_DECL {
        body: Box<ASTNode>,
        context: NodeContext
    },

    /// Event declaration. An event with a body gains a boolean predicate
    /// evaluated each tick; without a body the event only fires when
    /// explicitly emitted.
    ///
    /// # Example:
    ///     event button_down { return read btn == 1; }
    ///     event manual;
    EVENT_DECL {
        identifier: String,
        predicate: Option<Box<ASTNode>>,
        context: NodeContext
    },

    /// Event handler declaration. Runs whenever the named event fires.
    ///
    /// # Example:
    ///     on button_down { set led 1; }
    ON_DECL {
        fqn: String,
        body: Box<ASTNode>,
        context: NodeContext
    },

    /// Pin declaration. Declares a variable bound to a digital or
    /// analog hardware pin.
    ///
    /// # Example:
    ///     digital led 13;
    PIN_DECL {
        identifier: String,
        pin_type: String,
        expression: Option<Box<ASTNode>>,
        context: NodeContext
    },

    /// Variable declaration with explicit type and optional initializer.
    /// `is_static` marks declarations visible to forward references.
    ///
    /// # Example:
    ///     u8 x = 2;
    ///     static bool flag = false;
    VARIABLE_DECL {
        type_name: String,
        identifier: String,
        expression: Option<Box<ASTNode>>,
        is_static: bool,
        context: NodeContext
    },

    /// Constant declaration. The initializer expression is required.
    ///
    /// # Example:
    ///     const u16 interval = 500;
    CONST_DECL {
        type_name: String,
        identifier: String,
        expression: Box<ASTNode>,
        context: NodeContext
    },

    /// Statement block. Introduces a new lexical scope.
    STMT_BLOCK(Vec<ASTNode>),

    /// Expression used in statement position.
    EXPRESSION_STMT {
        expression: Box<ASTNode>,
        context: NodeContext
    },

    /// Await statement. Suspends the enclosing function until the
    /// expression holds. The expression is either a boolean expression
    /// or a reference to an event.
    ///
    /// # Example:
    ///     await button_down;
    AWAIT_STMT {
        expression: Box<ASTNode>,
        context: NodeContext
    },

    /// Return statement with optional value.
    RETURN_STMT {
        expression: Option<Box<ASTNode>>,
        context: NodeContext
    },

    /// Conditional statement. `else_branch` holds either a block or a
    /// chained IF_STMT.
    IF_STMT {
        condition: Box<ASTNode>,
        if_branch: Box<ASTNode>,
        else_branch: Option<Box<ASTNode>>,
        context: NodeContext
    },

    /// While loop. The body is always a statement block.
    WHILE_STMT {
        condition: Box<ASTNode>,
        body: Box<ASTNode>,
        context: NodeContext
    },

    BREAK_STMT { context: NodeContext },
    CONTINUE_STMT { context: NodeContext },

    /// Emit statement. Raises the named event's emit flag so its
    /// handlers run on the next dispatch.
    ///
    /// # Example:
    ///     emit manual;
    EMIT_STMT {
        fqn: String,
        context: NodeContext
    },

    /// Pin write statement.
    ///
    /// # Example:
    ///     set led 1;
    SET_PIN_VALUE_STMT {
        fqn: String,
        fqn_pos: SourcePos,
        expression: Box<ASTNode>,
        context: NodeContext
    },

    /// Pin mode statement.
    ///
    /// # Example:
    ///     set led mode 1;
    SET_PIN_MODE_STMT {
        fqn: String,
        fqn_pos: SourcePos,
        expression: Box<ASTNode>,
        context: NodeContext
    },

    /// Pin number statement. Rebinds the pin variable to a hardware pin.
    ///
    /// # Example:
    ///     set led pin 13;
    SET_PIN_NUMBER_STMT {
        fqn: String,
        fqn_pos: SourcePos,
        expression: Box<ASTNode>,
        context: NodeContext
    },

    /// Literal is a constant value used within an expression.
    ///
    /// # Example:
    ///     u8 x = 4;
    ///            ^ -> Literal
    LITERAL {
        value: Literal,
        pos: SourcePos
    },

    /// Fully qualified name expression referencing a symbol.
    /// Member access (`a.b`, `a::b`) is carried as the joined source
    /// text and resolved by direct lookup.
    FQN_EXPR {
        text: String,
        pos: SourcePos
    },

    /// Unary operation is an expression operation with only one argument.
    ///
    /// # Example:
    ///     bool y = !(x);
    ///              ^ -> Unary Operator
    UNARY_OP {
        op: UnaryOperation,
        expression: Box<ASTNode>,
        pos: SourcePos
    },

    /// Binary operation is an expression operation with two arguments.
    ///
    /// # Example:
    ///     u8 x = 40 + 2;
    ///               ^ -> Binary Operator
    BINARY_OP {
        op: BinaryOperation,
        lhs: Box<ASTNode>,
        rhs: Box<ASTNode>,
        pos: SourcePos
    },

    /// Assignment expression, plain or compound. The target is always
    /// an FQN_EXPR.
    ASSIGN_EXPR {
        op: AssignOperation,
        target: Box<ASTNode>,
        expression: Box<ASTNode>,
        pos: SourcePos
    },

    /// Cast expression.
    ///
    /// # Example:
    ///     u16 y = x as u16;
    CAST_EXPR {
        expression: Box<ASTNode>,
        type_name: String,
        pos: SourcePos
    },

    /// Function call expression.
    ///
    /// # Example:
    ///     serial_println(x);
    FUNC_CALL {
        fqn: String,
        arguments: Vec<ASTNode>,
        pos: SourcePos
    },

    /// Pin read expression. Reads the current value of a pin.
    ///
    /// # Example:
    ///     u8 v = read btn;
    READ_PIN_EXPR {
        fqn: String,
        pos: SourcePos
    },
}

impl ASTNode {
    /// Statements of a STMT_BLOCK node.
    /// Function bodies are visited through this accessor so the body block
    /// itself never becomes a nested sequence block.
    pub(crate) fn block_statements(&self) -> &Vec<ASTNode> {
        match self {
            ASTNode::STMT_BLOCK(statements) => statements,
            _ => panic!("Malformed AST! Node {:?} was meant to be a STMT_BLOCK but wasn't!", self)
        }
    }

    /// Anchor position of an expression node, used when a diagnostic
    /// points at the expression.
    pub(crate) fn expression_pos(&self) -> SourcePos {
        match self {
            ASTNode::LITERAL { pos, .. }
            | ASTNode::FQN_EXPR { pos, .. }
            | ASTNode::UNARY_OP { pos, .. }
            | ASTNode::BINARY_OP { pos, .. }
            | ASTNode::ASSIGN_EXPR { pos, .. }
            | ASTNode::CAST_EXPR { pos, .. }
            | ASTNode::FUNC_CALL { pos, .. }
            | ASTNode::READ_PIN_EXPR { pos, .. } => *pos,
            _ => SourcePos::default()
        }
    }
}
