/// Unary Operations are symbolic functions with one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum UnaryOperation {
    POSITIVE,       // + <rhs>
    NEGATE,         // - <rhs>
    NOT,            // ! <rhs>
    BIT_COMPLEMENT, // ~ <rhs>
}

/// Binary Operations are symbolic functions with two arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BinaryOperation {
    ADD,            // <lhs> + <rhs>
    SUB,            // <lhs> - <rhs>
    MUL,            // <lhs> * <rhs>
    DIV,            // <lhs> / <rhs>

    LSHIFT,         // <lhs> << <rhs>
    RSHIFT,         // <lhs> >> <rhs>
    BIT_AND,        // <lhs> & <rhs>
    BIT_OR,         // <lhs> | <rhs>
    BIT_XOR,        // <lhs> ^ <rhs>

    EQUAL,          // <lhs> == <rhs>
    NOT_EQUAL,      // <lhs> != <rhs>
    GREATER_THAN,   // <lhs> >  <rhs>
    LESS_THAN,      // <lhs> <  <rhs>
    GREATER_EQUAL,  // <lhs> >= <rhs>
    LESS_EQUAL,     // <lhs> <= <rhs>

    LOGICAL_AND,    // <lhs> && <rhs>
    LOGICAL_OR,     // <lhs> || <rhs>
}

impl BinaryOperation {
    /// Operator token as written in the target language.
    /// EEL operators are a 1:1 match with their C++ counterparts.
    pub fn as_target_text(&self) -> &'static str {
        match self {
            BinaryOperation::ADD => "+",
            BinaryOperation::SUB => "-",
            BinaryOperation::MUL => "*",
            BinaryOperation::DIV => "/",
            BinaryOperation::LSHIFT => "<<",
            BinaryOperation::RSHIFT => ">>",
            BinaryOperation::BIT_AND => "&",
            BinaryOperation::BIT_OR => "|",
            BinaryOperation::BIT_XOR => "^",
            BinaryOperation::EQUAL => "==",
            BinaryOperation::NOT_EQUAL => "!=",
            BinaryOperation::GREATER_THAN => ">",
            BinaryOperation::LESS_THAN => "<",
            BinaryOperation::GREATER_EQUAL => ">=",
            BinaryOperation::LESS_EQUAL => "<=",
            BinaryOperation::LOGICAL_AND => "&&",
            BinaryOperation::LOGICAL_OR => "||",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self,
            BinaryOperation::EQUAL | BinaryOperation::NOT_EQUAL
            | BinaryOperation::GREATER_THAN | BinaryOperation::LESS_THAN
            | BinaryOperation::GREATER_EQUAL | BinaryOperation::LESS_EQUAL)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperation::LOGICAL_AND | BinaryOperation::LOGICAL_OR)
    }
}

/// Assignment operators. Plain assignment and the compound arithmetic,
/// shifting and bitwise forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum AssignOperation {
    ASSIGN,         // <lhs> = <rhs>
    ADD_ASSIGN,     // <lhs> += <rhs>
    SUB_ASSIGN,     // <lhs> -= <rhs>
    MUL_ASSIGN,     // <lhs> *= <rhs>
    DIV_ASSIGN,     // <lhs> /= <rhs>
    LSHIFT_ASSIGN,  // <lhs> <<= <rhs>
    RSHIFT_ASSIGN,  // <lhs> >>= <rhs>
    AND_ASSIGN,     // <lhs> &= <rhs>
    OR_ASSIGN,      // <lhs> |= <rhs>
    XOR_ASSIGN,     // <lhs> ^= <rhs>
}

impl AssignOperation {
    pub fn as_target_text(&self) -> &'static str {
        match self {
            AssignOperation::ASSIGN => "=",
            AssignOperation::ADD_ASSIGN => "+=",
            AssignOperation::SUB_ASSIGN => "-=",
            AssignOperation::MUL_ASSIGN => "*=",
            AssignOperation::DIV_ASSIGN => "/=",
            AssignOperation::LSHIFT_ASSIGN => "<<=",
            AssignOperation::RSHIFT_ASSIGN => ">>=",
            AssignOperation::AND_ASSIGN => "&=",
            AssignOperation::OR_ASSIGN => "|=",
            AssignOperation::XOR_ASSIGN => "^=",
        }
    }
}
