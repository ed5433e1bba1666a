
/// Literals are defined constants within a program. See ASTNode for more detail on their usage.
/// They are divided by their representation in text.
///
/// Note: signed literals are stored in the AST as a negate unary operation. For example
/// -32 <=> UNARY_OP{UnaryOperation::NEGATE, Literal::INTEGER(32)}
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Form: %d
    INTEGER(u64),

    /// Form: %d.%d
    FLOAT(f64),

    /// Form: false | true
    BOOL(bool),

    /// Form: '%c'
    /// Stored verbatim including quotes; emitted as-is by the generator.
    CHAR(String),

    /// Form: "%c*"
    /// Stored verbatim including quotes; emitted as-is by the generator.
    STRING(String),
}

impl Literal {
    /// Render the literal as target source text.
    /// Bool/int/float literals are a 1:1 match with the target language,
    /// char and string literals are currently passed through verbatim.
    pub fn as_target_text(&self) -> String {
        match self {
            Literal::INTEGER(value) => format!("{}", value),
            Literal::FLOAT(value) => format!("{:?}", value),
            Literal::BOOL(value) => format!("{}", value),
            Literal::CHAR(text) => text.clone(),
            Literal::STRING(text) => text.clone(),
        }
    }
}
