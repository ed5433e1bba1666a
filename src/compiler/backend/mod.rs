mod cpp_source_generator;

#[cfg(test)]
mod test;

use super::ast::ASTNode;
use super::symbol_table::SymbolTable;

// Abstract Definitions

/// BackEndGenerator takes an analysed AbstractSyntaxTree and generates
/// target source text.
pub trait BackEndGenerator {
    /// Generate default generator configuration
    fn default() -> Self;

    /// Generate target source from an abstract syntax tree and the
    /// symbol table produced by semantic analysis.
    fn generate(self, tree: &ASTNode, table: &mut SymbolTable) -> String;
}

// Concrete Definition Export
pub use self::cpp_source_generator::CppSourceGenerator;
