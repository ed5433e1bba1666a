use std::fmt;

use strum_macros::Display;

use super::ast::{NodeContext, SourcePos};

/// Kinds of user-facing diagnostics produced by the analysis passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    None,
    TypeMismatch,
    InvalidReturnType,
    DuplicateEvent,
    AlreadyDefined,
    ExpectedVariable,
    UndefinedType,
}

/// A user-facing diagnostic. Diagnostics accumulate in the visitor that
/// produced them; analysis always continues after recording one.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,

    /// Verbatim source slice of the offending statement or declaration.
    pub source: String,

    /// Description of what was expected, rendered after the message.
    pub expected: String,

    /// Position of the offending token.
    pub location: SourcePos,

    /// Column of the start of the source slice. Used to place the caret
    /// under the offending token.
    pub offset: usize,
}

impl CompileError {
    pub fn new(kind: ErrorKind, location: SourcePos, context: &NodeContext, expected: &str) -> Self {
        CompileError {
            kind,
            source: context.source.clone(),
            expected: String::from(expected),
            location,
            offset: context.offset,
        }
    }

    /// Diagnostic without a source anchor, used for leftover unresolved
    /// symbol records which only carry a name.
    pub fn without_context(kind: ErrorKind, name: &str, expected: &str) -> Self {
        CompileError {
            kind,
            source: String::from(name),
            expected: String::from(expected),
            location: SourcePos::default(),
            offset: 0,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::TypeMismatch => "Type mismatch expected: ",
            ErrorKind::InvalidReturnType => "Invalid return type expected: ",
            ErrorKind::UndefinedType => "Undefined type",
            ErrorKind::ExpectedVariable => "Expected Variable",
            ErrorKind::DuplicateEvent => "Duplicate event",
            ErrorKind::AlreadyDefined => "Already defined",
            ErrorKind::None => "Unknown error",
        }
    }
}

/// Reference rendering:
///     {source}
///         ^~ {message}{expected} on Line: {l} Column: {c}
impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = self.location.column.saturating_sub(self.offset);
        writeln!(f, "{}", self.source)?;
        write!(f, "{}^~ {}{} on Line: {} Column: {}",
               " ".repeat(indent),
               self.message(),
               self.expected,
               self.location.line,
               self.location.column)
    }
}

/// Compiler subsystems that can raise fatal internal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Subsystem {
    SymbolTable,
    ScopeAnalysis,
    Codegen,
}

/// Internal errors mark invariant violations that the parser or an earlier
/// pass should have made impossible. They are fatal and never shown as
/// user diagnostics.
#[derive(Debug, Clone)]
pub struct InternalError {
    pub subsystem: Subsystem,
    pub message: String,
}

impl InternalError {
    /// Abort compilation over a broken invariant.
    pub fn fatal(subsystem: Subsystem, message: &str) -> ! {
        panic!("{}", InternalError { subsystem, message: String::from(message) })
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal error [{}]: {}", self.subsystem, self.message)
    }
}

impl std::error::Error for InternalError {}
