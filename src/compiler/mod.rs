mod ast;
pub mod backend;
pub mod error;
pub mod parser;
pub mod semantic_analyser;
pub mod sequence;
pub mod symbol_table;

use std::path::Path;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::error::Error;

// Interface Definitions
use self::parser::AstParser;
use self::backend::BackEndGenerator;
use self::semantic_analyser::SemanticAnalyser;
use self::error::CompileError;

// Concrete Definitions Re-Export
pub use self::parser::PestEelParser;
pub use self::semantic_analyser::EelSemanticAnalyser;
pub use self::backend::CppSourceGenerator;

/// Build options shared across the pipeline stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Registers the assertion helpers of the runtime test header before
    /// analysis so programs may call them.
    pub testing: bool,
}

/// Compiler is a simple class that holds the configuration of a compilation.
/// Compiler takes three typed parameters defining:
///  the AstParser being used,
///  the SemanticAnalyser being used,
///  and the BackEndGenerator being used.
///
/// # Compilation Diagram
/// eel_code -> AstParser -> AbstractSyntaxTree -> SemanticAnalyser -> SymbolTable + Diagnostics -> BackEndGenerator -> C++ Source
pub struct Compiler<P: AstParser, A: SemanticAnalyser, G: BackEndGenerator> {
    parser: P,
    semantic_analyser: A,
    generator: G,
    options: BuildOptions,
}

#[allow(dead_code)] // Many of the functions on compiler act as a library interface and are not used
impl<P: AstParser, A: SemanticAnalyser, G: BackEndGenerator> Compiler<P, A, G> {

    /// Default generates a default compiler configuration. Default configuration is determined by
    /// the default methods of the parser, analyser and generator.
    pub fn default() -> Self {
        Compiler {
            parser: P::default(),
            semantic_analyser: A::default(),
            generator: G::default(),
            options: BuildOptions::default(),
        }
    }

    /// Create new compiler using a preconfigured parser, analyser and generator.
    pub fn new(parser: P, semantic_analyser: A, generator: G, options: BuildOptions) -> Self {
        Compiler {
            parser,
            semantic_analyser,
            generator,
            options,
        }
    }

    pub fn set_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Compiles an EEL source string into target source text.
    /// @return: Generated text, or the diagnostics collected during
    /// analysis. Code generation only runs on a diagnostic-free program.
    pub fn compile_str(self, source: &str) -> Result<String, Vec<CompileError>> {
        let ast = self.parser.parse(source);
        let mut analysis = self.semantic_analyser.analyse(&ast, &self.options);
        if !analysis.errors.is_empty() {
            return Err(analysis.errors);
        }
        Ok(self.generator.generate(&ast, &mut analysis.symbol_table))
    }

    /// Compiles a program file into target source text.
    /// @return: Generated text if Ok. Otherwise IO Error from a failed read.
    pub fn compile(self, source_filename: &Path) -> Result<Result<String, Vec<CompileError>>, Box<dyn Error>> {
        let source_str = fs::read_to_string(source_filename)?;

        Ok(self.compile_str(source_str.as_str()))
    }

    /// Compiles a program file and writes the generated target source into
    /// the destination file path. Diagnostics are printed to stdout.
    /// @return: Ok if the program was read; the file is only written for a
    /// diagnostic-free compilation.
    pub fn compile_and_save(self, source_filename: &Path, dest_filename: &Path) -> Result<(), Box<dyn Error>> {
        let display_dest = dest_filename.display().to_string();

        match self.compile(source_filename)? {
            Ok(generated) => {
                let mut file = match File::create(dest_filename) {
                    Err(why) => panic!("Couldn't create {}: {}", display_dest, why),
                    Ok(file) => file,
                };
                match file.write_all(generated.as_bytes()) {
                    Err(why) => panic!("Couldn't write to {}: {}", display_dest, why),
                    Ok(_) => println!("Successfully wrote to {}", display_dest),
                };
            }
            Err(errors) => {
                for error in errors {
                    println!("{}", error);
                }
            }
        }

        Ok(())
    }
}
