pub mod scope_analysis;
pub mod type_analysis;

#[cfg(test)]
mod test;

use super::ast::ASTNode;
use super::error::{CompileError, ErrorKind};
use super::symbol_table::SymbolTable;
use super::symbol_table::symbols::SymbolKind;
use super::BuildOptions;

use self::scope_analysis::ScopeAnalysisVisitor;
use self::type_analysis::TypeAnalysisVisitor;

/// Names under which the setup and loop bodies are installed in the root
/// scope. Reserved so user declarations cannot collide with them.
pub const BUILTIN_SETUP_NAME: &str = "__eel_setup";
pub const BUILTIN_LOOP_NAME: &str = "__eel_loop";

/// Result of semantic analysis: the populated symbol table and the user
/// diagnostics collected across both passes.
pub struct Analysis {
    pub symbol_table: SymbolTable,
    pub errors: Vec<CompileError>,
}

/// SemanticAnalyser runs the analysis passes over an abstract syntax tree.
pub trait SemanticAnalyser {
    /// Creates a default configuration of a SemanticAnalyser
    fn default() -> Self;

    /// Analyse an Abstract Syntax Tree into an Analysis result
    fn analyse(self, root: &ASTNode, options: &BuildOptions) -> Analysis;
}

/// EelSemanticAnalyser is a concrete SemanticAnalyser.
/// It drives the two analysis walks in order: scope analysis builds the
/// symbol table and sequence graphs, deferred references are batch
/// resolved, then type analysis checks expression conformance. Leftover
/// unresolved records surface as user diagnostics at the end.
pub struct EelSemanticAnalyser;

impl SemanticAnalyser for EelSemanticAnalyser {
    fn default() -> Self {
        EelSemanticAnalyser
    }

    fn analyse(self, root: &ASTNode, options: &BuildOptions) -> Analysis {
        let mut table = SymbolTable::new();

        if options.testing {
            register_test_library(&mut table);
        }

        let mut scope_visitor = ScopeAnalysisVisitor::new(&mut table);
        scope_visitor.visit_program(root);
        let mut errors = std::mem::take(&mut scope_visitor.errors);
        drop(scope_visitor);

        table.try_resolve_unresolved();

        let mut type_visitor = TypeAnalysisVisitor::new(&table);
        type_visitor.visit_program(root);
        errors.append(&mut type_visitor.errors);

        for record in table.unresolved_symbols() {
            let kind = match record.expected_kind {
                SymbolKind::Type => ErrorKind::UndefinedType,
                _ => ErrorKind::ExpectedVariable,
            };
            errors.push(CompileError::without_context(kind, &record.name, &record.expected_kind.to_string()));
        }

        Analysis { symbol_table: table, errors }
    }
}

/// Register the assertion helpers emitted against `runtime/test.hpp`.
/// Enabled by the `--test` driver flag.
fn register_test_library(table: &mut SymbolTable) {
    let bool_type = table.primitive("bool");
    let i32_type = table.primitive("i32");

    table.declare_fn_cpp("assert_true", "assert_true", None, vec![bool_type]);
    table.declare_fn_cpp("assert_false", "assert_false", None, vec![bool_type]);
    table.declare_fn_cpp("fail", "fail", None, vec![]);
    table.declare_fn_cpp("pass", "pass", None, vec![i32_type]);
}
