use crate::compiler::ast::{ASTNode, BinaryOperation, Literal, UnaryOperation};
use crate::compiler::parser::{AstParser, PestEelParser};

fn parse(source: &str) -> Vec<ASTNode> {
    match PestEelParser::default().parse(source) {
        ASTNode::PROGRAM(declarations) => declarations,
        node => panic!("Expected a program root, found {:?}", node),
    }
}

#[test]
fn parses_empty_setup_and_loop() {
    let declarations = parse("setup {} loop {}");
    assert_eq!(declarations.len(), 2);
    assert!(matches!(declarations[0], ASTNode::SETUP_DECL { .. }));
    assert!(matches!(declarations[1], ASTNode::LOOP_DECL { .. }));
}

#[test]
fn parses_variable_declaration_with_initializer() {
    let declarations = parse("setup { u8 x = 2; }");
    let body = match &declarations[0] {
        ASTNode::SETUP_DECL { body, .. } => body.block_statements(),
        node => panic!("Expected a setup declaration, found {:?}", node),
    };
    match &body[0] {
        ASTNode::VARIABLE_DECL { type_name, identifier, expression, is_static, .. } => {
            assert_eq!(type_name, "u8");
            assert_eq!(identifier, "x");
            assert!(!*is_static);
            match expression.as_deref() {
                Some(ASTNode::LITERAL { value: Literal::INTEGER(2), .. }) => {}
                other => panic!("Expected an integer initializer, found {:?}", other),
            }
        }
        node => panic!("Expected a variable declaration, found {:?}", node),
    }
}

#[test]
fn parses_static_declaration() {
    let declarations = parse("static bool flag = false;");
    match &declarations[0] {
        ASTNode::VARIABLE_DECL { is_static, .. } => assert!(*is_static),
        node => panic!("Expected a static declaration, found {:?}", node),
    }
}

#[test]
fn parses_event_forms() {
    let declarations = parse("event a; event b { return true; }");
    match &declarations[0] {
        ASTNode::EVENT_DECL { identifier, predicate, .. } => {
            assert_eq!(identifier, "a");
            assert!(predicate.is_none());
        }
        node => panic!("Expected an event declaration, found {:?}", node),
    }
    match &declarations[1] {
        ASTNode::EVENT_DECL { identifier, predicate, .. } => {
            assert_eq!(identifier, "b");
            assert!(predicate.is_some());
        }
        node => panic!("Expected an event declaration, found {:?}", node),
    }
}

#[test]
fn parses_on_declaration() {
    let declarations = parse("on button_down { x = true; }");
    match &declarations[0] {
        ASTNode::ON_DECL { fqn, body, .. } => {
            assert_eq!(fqn, "button_down");
            assert_eq!(body.block_statements().len(), 1);
        }
        node => panic!("Expected an on declaration, found {:?}", node),
    }
}

#[test]
fn parses_pin_declaration_and_pin_statements() {
    let declarations = parse("setup { digital led 13; set led 1; set led mode 1; set led pin 9; }");
    let body = match &declarations[0] {
        ASTNode::SETUP_DECL { body, .. } => body.block_statements(),
        node => panic!("Expected a setup declaration, found {:?}", node),
    };
    assert!(matches!(&body[0], ASTNode::PIN_DECL { pin_type, .. } if pin_type == "digital"));
    assert!(matches!(&body[1], ASTNode::SET_PIN_VALUE_STMT { .. }));
    assert!(matches!(&body[2], ASTNode::SET_PIN_MODE_STMT { .. }));
    assert!(matches!(&body[3], ASTNode::SET_PIN_NUMBER_STMT { .. }));
}

#[test]
fn binary_expressions_are_left_associative() {
    let declarations = parse("setup { 1 + 2 + 3; }");
    let body = match &declarations[0] {
        ASTNode::SETUP_DECL { body, .. } => body.block_statements(),
        node => panic!("Expected a setup declaration, found {:?}", node),
    };
    let expression = match &body[0] {
        ASTNode::EXPRESSION_STMT { expression, .. } => expression.as_ref(),
        node => panic!("Expected an expression statement, found {:?}", node),
    };
    match expression {
        ASTNode::BINARY_OP { op: BinaryOperation::ADD, lhs, rhs, .. } => {
            assert!(matches!(lhs.as_ref(), ASTNode::BINARY_OP { op: BinaryOperation::ADD, .. }));
            assert!(matches!(rhs.as_ref(), ASTNode::LITERAL { value: Literal::INTEGER(3), .. }));
        }
        node => panic!("Expected an additive chain, found {:?}", node),
    }
}

#[test]
fn comparison_binds_looser_than_shift() {
    let declarations = parse("setup { 1 << 2 < 3; }");
    let body = match &declarations[0] {
        ASTNode::SETUP_DECL { body, .. } => body.block_statements(),
        node => panic!("Expected a setup declaration, found {:?}", node),
    };
    let expression = match &body[0] {
        ASTNode::EXPRESSION_STMT { expression, .. } => expression.as_ref(),
        node => panic!("Expected an expression statement, found {:?}", node),
    };
    match expression {
        ASTNode::BINARY_OP { op: BinaryOperation::LESS_THAN, lhs, .. } => {
            assert!(matches!(lhs.as_ref(), ASTNode::BINARY_OP { op: BinaryOperation::LSHIFT, .. }));
        }
        node => panic!("Expected a comparison, found {:?}", node),
    }
}

#[test]
fn negative_literals_parse_as_negation() {
    let declarations = parse("setup { i8 x = -32; }");
    let body = match &declarations[0] {
        ASTNode::SETUP_DECL { body, .. } => body.block_statements(),
        node => panic!("Expected a setup declaration, found {:?}", node),
    };
    let expression = match &body[0] {
        ASTNode::VARIABLE_DECL { expression, .. } => expression.as_deref().unwrap(),
        node => panic!("Expected a variable declaration, found {:?}", node),
    };
    match expression {
        ASTNode::UNARY_OP { op: UnaryOperation::NEGATE, expression, .. } => {
            assert!(matches!(expression.as_ref(), ASTNode::LITERAL { value: Literal::INTEGER(32), .. }));
        }
        node => panic!("Expected a negation, found {:?}", node),
    }
}

#[test]
fn parses_await_emit_and_control_statements() {
    let declarations = parse("setup { await ready; emit tick; while (true) { break; } if (x) { continue; } else { return; } }");
    let body = match &declarations[0] {
        ASTNode::SETUP_DECL { body, .. } => body.block_statements(),
        node => panic!("Expected a setup declaration, found {:?}", node),
    };
    assert!(matches!(&body[0], ASTNode::AWAIT_STMT { .. }));
    assert!(matches!(&body[1], ASTNode::EMIT_STMT { fqn, .. } if fqn == "tick"));
    assert!(matches!(&body[2], ASTNode::WHILE_STMT { .. }));
    match &body[3] {
        ASTNode::IF_STMT { else_branch, .. } => assert!(else_branch.is_some()),
        node => panic!("Expected an if statement, found {:?}", node),
    }
}

#[test]
fn parses_cast_read_and_call_expressions() {
    let declarations = parse("setup { u16 y = x as u16; u8 v = read btn; serial_begin(9600); }");
    let body = match &declarations[0] {
        ASTNode::SETUP_DECL { body, .. } => body.block_statements(),
        node => panic!("Expected a setup declaration, found {:?}", node),
    };
    match &body[0] {
        ASTNode::VARIABLE_DECL { expression, .. } => {
            assert!(matches!(expression.as_deref(), Some(ASTNode::CAST_EXPR { type_name, .. }) if type_name == "u16"));
        }
        node => panic!("Expected a variable declaration, found {:?}", node),
    }
    match &body[1] {
        ASTNode::VARIABLE_DECL { expression, .. } => {
            assert!(matches!(expression.as_deref(), Some(ASTNode::READ_PIN_EXPR { fqn, .. }) if fqn == "btn"));
        }
        node => panic!("Expected a variable declaration, found {:?}", node),
    }
    match &body[2] {
        ASTNode::EXPRESSION_STMT { expression, .. } => {
            assert!(matches!(expression.as_ref(), ASTNode::FUNC_CALL { fqn, arguments, .. } if fqn == "serial_begin" && arguments.len() == 1));
        }
        node => panic!("Expected an expression statement, found {:?}", node),
    }
}

#[test]
fn source_positions_are_one_based() {
    let declarations = parse("setup { u8 x = 2; }");
    let body = match &declarations[0] {
        ASTNode::SETUP_DECL { body, .. } => body.block_statements(),
        node => panic!("Expected a setup declaration, found {:?}", node),
    };
    match &body[0] {
        ASTNode::VARIABLE_DECL { context, .. } => {
            assert_eq!(context.pos.line, 1);
            assert_eq!(context.pos.column, 9);
            assert_eq!(context.source, "u8 x = 2;");
        }
        node => panic!("Expected a variable declaration, found {:?}", node),
    }
}

#[test]
#[should_panic(expected = "Syntax Error")]
fn rejects_malformed_source() {
    parse("setup { u8 = ; }");
}
