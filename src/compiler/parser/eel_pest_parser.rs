use crate::pest::Parser;
use pest::iterators::Pair;

use super::AstParser;
use super::super::ast::{
    ASTNode,
    Literal,
    UnaryOperation,
    BinaryOperation,
    AssignOperation,
    SourcePos,
    NodeContext
};

/// Pest EEL Parser parses a string into a series of tokens.
/// These tokens are defined as a Context-Free-Grammar in the src/eel.pest file.
/// The tokens generated from this parser are then formalised into the generic
/// abstract syntax tree implementation.
#[derive(Parser)]
#[grammar = "eel.pest"]
struct EelParser;

/// PestEelParser is a concrete AstParser.
/// It uses the pest library to generate a token sequence from a source string
/// that is then converted into an AbstractSyntaxTree.
pub struct PestEelParser;

fn source_pos(pair: &Pair<Rule>) -> SourcePos {
    let (line, column) = pair.as_span().start_pos().line_col();
    SourcePos::new(line, column)
}

fn node_context(pair: &Pair<Rule>) -> NodeContext {
    NodeContext::new(String::from(pair.as_str()), source_pos(pair))
}

impl PestEelParser {

    /// Parses source string into an ASTNode.
    fn parse_into_node_tree(&self, source: &str) -> ASTNode {
        match EelParser::parse(Rule::program, source) {
            Ok(mut pairs) => {
                let program = pairs.next().unwrap();
                let declarations = program.into_inner()
                    .filter(|pair| pair.as_rule() != Rule::EOI)
                    .map(|pair| self.parse_pair_node(pair))
                    .collect();
                ASTNode::PROGRAM(declarations)
            }
            Err(error) => {
                panic!("Syntax Error: {}", error)
            }
        }
    }

    /// Parses all pest pair tokens into a valid ASTNode
    fn parse_pair_node(&self, pair: Pair<Rule>) -> ASTNode {
        match pair.as_rule() {
            Rule::setup_decl =>          { self.parse_pair_setup_decl(pair) }
            Rule::loop_decl =>           { self.parse_pair_loop_decl(pair) }
            Rule::event_decl =>          { self.parse_pair_event_decl(pair) }
            Rule::on_decl =>             { self.parse_pair_on_decl(pair) }
            Rule::pin_decl =>            { self.parse_pair_pin_decl(pair) }
            Rule::variable_decl =>       { self.parse_pair_variable_decl(pair, false) }
            Rule::static_decl =>         { self.parse_pair_variable_decl(pair, true) }
            Rule::const_decl =>          { self.parse_pair_const_decl(pair) }
            Rule::stmt_block =>          { self.parse_pair_stmt_block(pair) }
            Rule::await_stmt =>          { self.parse_pair_await_stmt(pair) }
            Rule::return_stmt =>         { self.parse_pair_return_stmt(pair) }
            Rule::if_stmt =>             { self.parse_pair_if_stmt(pair) }
            Rule::while_stmt =>          { self.parse_pair_while_stmt(pair) }
            Rule::break_stmt =>          { ASTNode::BREAK_STMT { context: node_context(&pair) } }
            Rule::continue_stmt =>       { ASTNode::CONTINUE_STMT { context: node_context(&pair) } }
            Rule::emit_stmt =>           { self.parse_pair_emit_stmt(pair) }
            Rule::set_pin_value_stmt |
            Rule::set_pin_mode_stmt |
            Rule::set_pin_number_stmt => { self.parse_pair_set_pin_stmt(pair) }
            Rule::expression_stmt =>     { self.parse_pair_expression_stmt(pair) }
            Rule::condition_block =>     { self.parse_pair_node(pair.into_inner().next().unwrap()) }
            Rule::assign_expr =>         { self.parse_pair_assign_expression(pair) }
            Rule::logical_or =>          { self.parse_pair_fixed_binary_expression(pair, BinaryOperation::LOGICAL_OR) }
            Rule::logical_and =>         { self.parse_pair_fixed_binary_expression(pair, BinaryOperation::LOGICAL_AND) }
            Rule::bit_or |
            Rule::bit_xor |
            Rule::bit_and |
            Rule::comparison |
            Rule::shift |
            Rule::additive |
            Rule::scaling =>             { self.parse_pair_binary_expression(pair) }
            Rule::unary =>               { self.parse_pair_unary_expression(pair) }
            Rule::cast =>                { self.parse_pair_cast_expression(pair) }
            Rule::func_call =>           { self.parse_pair_function_call(pair) }
            Rule::read_pin_expr =>       { self.parse_pair_read_pin_expression(pair) }
            Rule::fqn_expr =>            { self.parse_pair_fqn_expression(pair) }
            Rule::integer_literal |
            Rule::float_literal |
            Rule::bool_literal |
            Rule::char_literal |
            Rule::string_literal =>      { self.parse_pair_literal(pair) }
            _ => { panic!("Whoops! Unprocessed pest rule: {:?}", pair.as_rule()) }
        }
    }

    fn parse_pair_setup_decl(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let body = pair.into_inner().next().unwrap();
        ASTNode::SETUP_DECL {
            body: Box::new(self.parse_pair_node(body)),
            context
        }
    }

    fn parse_pair_loop_decl(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let body = pair.into_inner().next().unwrap();
        ASTNode::LOOP_DECL {
            body: Box::new(self.parse_pair_node(body)),
            context
        }
    }

    fn parse_pair_event_decl(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let mut inner = pair.into_inner();
        let identifier = String::from(inner.next().unwrap().as_str());
        let predicate = inner.next().map(|block| Box::new(self.parse_pair_node(block)));
        ASTNode::EVENT_DECL { identifier, predicate, context }
    }

    fn parse_pair_on_decl(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let mut inner = pair.into_inner();
        let fqn = String::from(inner.next().unwrap().as_str());
        let body = self.parse_pair_node(inner.next().unwrap());
        ASTNode::ON_DECL { fqn, body: Box::new(body), context }
    }

    fn parse_pair_pin_decl(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let mut inner = pair.into_inner();
        let pin_type = String::from(inner.next().unwrap().as_str());
        let identifier = String::from(inner.next().unwrap().as_str());
        let expression = inner.next().map(|expr| Box::new(self.parse_pair_node(expr)));
        ASTNode::PIN_DECL { identifier, pin_type, expression, context }
    }

    fn parse_pair_variable_decl(&self, pair: Pair<Rule>, is_static: bool) -> ASTNode {
        let context = node_context(&pair);
        let mut inner = pair.into_inner();
        let (type_name, identifier) = self.parse_pair_typed_identifier(inner.next().unwrap());
        let expression = inner.next().map(|expr| Box::new(self.parse_pair_node(expr)));
        ASTNode::VARIABLE_DECL { type_name, identifier, expression, is_static, context }
    }

    fn parse_pair_const_decl(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let mut inner = pair.into_inner();
        let (type_name, identifier) = self.parse_pair_typed_identifier(inner.next().unwrap());
        let expression = Box::new(self.parse_pair_node(inner.next().unwrap()));
        ASTNode::CONST_DECL { type_name, identifier, expression, context }
    }

    fn parse_pair_typed_identifier(&self, pair: Pair<Rule>) -> (String, String) {
        let mut inner = pair.into_inner();
        let type_name = String::from(inner.next().unwrap().as_str());
        let identifier = String::from(inner.next().unwrap().as_str());
        (type_name, identifier)
    }

    fn parse_pair_stmt_block(&self, pair: Pair<Rule>) -> ASTNode {
        ASTNode::STMT_BLOCK(pair.into_inner().map(|statement| self.parse_pair_node(statement)).collect())
    }

    fn parse_pair_await_stmt(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let expression = self.parse_pair_node(pair.into_inner().next().unwrap());
        ASTNode::AWAIT_STMT { expression: Box::new(expression), context }
    }

    fn parse_pair_return_stmt(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let expression = pair.into_inner().next().map(|expr| Box::new(self.parse_pair_node(expr)));
        ASTNode::RETURN_STMT { expression, context }
    }

    fn parse_pair_if_stmt(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let mut inner = pair.into_inner();
        let condition = Box::new(self.parse_pair_node(inner.next().unwrap()));
        let if_branch = Box::new(self.parse_pair_node(inner.next().unwrap()));
        let else_branch = inner.next().map(|branch| Box::new(self.parse_pair_node(branch)));
        ASTNode::IF_STMT { condition, if_branch, else_branch, context }
    }

    fn parse_pair_while_stmt(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let mut inner = pair.into_inner();
        let condition = Box::new(self.parse_pair_node(inner.next().unwrap()));
        let body = Box::new(self.parse_pair_node(inner.next().unwrap()));
        ASTNode::WHILE_STMT { condition, body, context }
    }

    fn parse_pair_emit_stmt(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let fqn = String::from(pair.into_inner().next().unwrap().as_str());
        ASTNode::EMIT_STMT { fqn, context }
    }

    fn parse_pair_set_pin_stmt(&self, pair: Pair<Rule>) -> ASTNode {
        let rule = pair.as_rule();
        let context = node_context(&pair);
        let mut inner = pair.into_inner();
        let fqn_pair = inner.next().unwrap();
        let fqn_pos = source_pos(&fqn_pair);
        let fqn = String::from(fqn_pair.as_str());
        let expression = Box::new(self.parse_pair_node(inner.next().unwrap()));
        match rule {
            Rule::set_pin_value_stmt => ASTNode::SET_PIN_VALUE_STMT { fqn, fqn_pos, expression, context },
            Rule::set_pin_mode_stmt => ASTNode::SET_PIN_MODE_STMT { fqn, fqn_pos, expression, context },
            Rule::set_pin_number_stmt => ASTNode::SET_PIN_NUMBER_STMT { fqn, fqn_pos, expression, context },
            _ => panic!("Whoops! Unprocessed pin statement rule: {:?}", rule)
        }
    }

    fn parse_pair_expression_stmt(&self, pair: Pair<Rule>) -> ASTNode {
        let context = node_context(&pair);
        let expression = self.parse_pair_node(pair.into_inner().next().unwrap());
        ASTNode::EXPRESSION_STMT { expression: Box::new(expression), context }
    }

    fn parse_pair_assign_expression(&self, pair: Pair<Rule>) -> ASTNode {
        let pos = source_pos(&pair);
        let mut inner = pair.into_inner();
        let fqn_pair = inner.next().unwrap();
        let target = ASTNode::FQN_EXPR {
            text: String::from(fqn_pair.as_str()),
            pos: source_pos(&fqn_pair)
        };
        let op = match inner.next().unwrap().as_str() {
            "=" => AssignOperation::ASSIGN,
            "+=" => AssignOperation::ADD_ASSIGN,
            "-=" => AssignOperation::SUB_ASSIGN,
            "*=" => AssignOperation::MUL_ASSIGN,
            "/=" => AssignOperation::DIV_ASSIGN,
            "<<=" => AssignOperation::LSHIFT_ASSIGN,
            ">>=" => AssignOperation::RSHIFT_ASSIGN,
            "&=" => AssignOperation::AND_ASSIGN,
            "|=" => AssignOperation::OR_ASSIGN,
            "^=" => AssignOperation::XOR_ASSIGN,
            op => panic!("Whoops! Unprocessed assignment operator: {}", op)
        };
        let expression = Box::new(self.parse_pair_node(inner.next().unwrap()));
        ASTNode::ASSIGN_EXPR { op, target: Box::new(target), expression, pos }
    }

    /// Parses a left associative chain whose operator is implied by the
    /// rule itself (the logical operators).
    fn parse_pair_fixed_binary_expression(&self, pair: Pair<Rule>, op: BinaryOperation) -> ASTNode {
        let mut inner = pair.into_inner();
        let mut node = self.parse_pair_node(inner.next().unwrap());
        for rhs in inner {
            let pos = node.expression_pos();
            node = ASTNode::BINARY_OP {
                op,
                lhs: Box::new(node),
                rhs: Box::new(self.parse_pair_node(rhs)),
                pos
            };
        }
        node
    }

    /// Parses a left associative chain with explicit operator tokens.
    fn parse_pair_binary_expression(&self, pair: Pair<Rule>) -> ASTNode {
        let mut inner = pair.into_inner();
        let mut node = self.parse_pair_node(inner.next().unwrap());
        while let Some(op_pair) = inner.next() {
            let op = match op_pair.as_str() {
                "+" => BinaryOperation::ADD,
                "-" => BinaryOperation::SUB,
                "*" => BinaryOperation::MUL,
                "/" => BinaryOperation::DIV,
                "<<" => BinaryOperation::LSHIFT,
                ">>" => BinaryOperation::RSHIFT,
                "&" => BinaryOperation::BIT_AND,
                "|" => BinaryOperation::BIT_OR,
                "^" => BinaryOperation::BIT_XOR,
                "==" => BinaryOperation::EQUAL,
                "!=" => BinaryOperation::NOT_EQUAL,
                ">" => BinaryOperation::GREATER_THAN,
                "<" => BinaryOperation::LESS_THAN,
                ">=" => BinaryOperation::GREATER_EQUAL,
                "<=" => BinaryOperation::LESS_EQUAL,
                op => panic!("Whoops! Unprocessed binary operator: {}", op)
            };
            let rhs = self.parse_pair_node(inner.next().unwrap());
            let pos = node.expression_pos();
            node = ASTNode::BINARY_OP { op, lhs: Box::new(node), rhs: Box::new(rhs), pos };
        }
        node
    }

    fn parse_pair_unary_expression(&self, pair: Pair<Rule>) -> ASTNode {
        let pairs: Vec<Pair<Rule>> = pair.into_inner().collect();
        let (operand, ops) = pairs.split_last().unwrap();
        let mut node = self.parse_pair_node(operand.clone());
        for op_pair in ops.iter().rev() {
            let op = match op_pair.as_str() {
                "!" => UnaryOperation::NOT,
                "~" => UnaryOperation::BIT_COMPLEMENT,
                "+" => UnaryOperation::POSITIVE,
                "-" => UnaryOperation::NEGATE,
                op => panic!("Whoops! Unprocessed unary operator: {}", op)
            };
            node = ASTNode::UNARY_OP {
                op,
                expression: Box::new(node),
                pos: source_pos(op_pair)
            };
        }
        node
    }

    fn parse_pair_cast_expression(&self, pair: Pair<Rule>) -> ASTNode {
        let pos = source_pos(&pair);
        let mut inner = pair.into_inner();
        let mut node = self.parse_pair_node(inner.next().unwrap());
        for type_pair in inner {
            node = ASTNode::CAST_EXPR {
                expression: Box::new(node),
                type_name: String::from(type_pair.as_str()),
                pos
            };
        }
        node
    }

    fn parse_pair_function_call(&self, pair: Pair<Rule>) -> ASTNode {
        let pos = source_pos(&pair);
        let mut inner = pair.into_inner();
        let fqn = String::from(inner.next().unwrap().as_str());
        let arguments = match inner.next() {
            Some(list) => list.into_inner().map(|expr| self.parse_pair_node(expr)).collect(),
            None => vec![]
        };
        ASTNode::FUNC_CALL { fqn, arguments, pos }
    }

    fn parse_pair_read_pin_expression(&self, pair: Pair<Rule>) -> ASTNode {
        let pos = source_pos(&pair);
        let fqn = String::from(pair.into_inner().next().unwrap().as_str());
        ASTNode::READ_PIN_EXPR { fqn, pos }
    }

    fn parse_pair_fqn_expression(&self, pair: Pair<Rule>) -> ASTNode {
        let pos = source_pos(&pair);
        ASTNode::FQN_EXPR { text: String::from(pair.as_str()), pos }
    }

    /// Parses a pest token pair into an AST literal
    fn parse_pair_literal(&self, pair: Pair<Rule>) -> ASTNode {
        let pos = source_pos(&pair);
        let value = match pair.as_rule() {
            Rule::integer_literal => {
                Literal::INTEGER(pair.as_str().parse().unwrap())
            }
            Rule::float_literal => {
                Literal::FLOAT(pair.as_str().parse().unwrap())
            }
            Rule::bool_literal => {
                Literal::BOOL(pair.as_str().parse().unwrap())
            }
            Rule::char_literal => {
                Literal::CHAR(String::from(pair.as_str()))
            }
            Rule::string_literal => {
                Literal::STRING(String::from(pair.as_str()))
            }
            _ => { panic!("Whoops! Unprocessed literal rule: {:?}", pair.as_rule()) }
        };
        ASTNode::LITERAL { value, pos }
    }
}

/// AstParser Trait Concrete Implementation
impl AstParser for PestEelParser {
    fn default() -> Self {
        PestEelParser
    }

    /// Parse processes a source string into an abstract syntax tree
    fn parse(self, source: &str) -> ASTNode {
        self.parse_into_node_tree(source)
    }
}
