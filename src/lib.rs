// External Modules
extern crate pest;
#[macro_use]
extern crate pest_derive;

// Internal Modules
mod compiler;

pub use compiler::{Compiler, BuildOptions};
pub use compiler::{PestEelParser, EelSemanticAnalyser, CppSourceGenerator};
pub use compiler::error::CompileError;

// Compiler types to use
type PARSER = compiler::PestEelParser;
type ANALYSER = compiler::EelSemanticAnalyser;
type GENERATOR = compiler::CppSourceGenerator;

/// Compile an EEL source string into target C++ source.
/// Returns the generated text, or the diagnostics collected during
/// analysis if the program did not check out.
pub fn compile_str(source: &str, options: BuildOptions) -> Result<String, Vec<CompileError>> {
    let compiler: Compiler<PARSER, ANALYSER, GENERATOR> = Compiler::default()
        .set_options(options);
    compiler.compile_str(source)
}
