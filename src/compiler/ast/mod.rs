pub(super) mod literals;
pub(super) mod operators;
pub(super) mod ast_node;
pub(super) mod source_pos;

pub(super) use self::{
    ast_node::ASTNode,
    literals::Literal,
    operators::{
        UnaryOperation,
        BinaryOperation,
        AssignOperation
    },
    source_pos::{SourcePos, NodeContext}
};
