// External Modules
extern crate pest;
extern crate exitcode;
#[macro_use]
extern crate pest_derive;

// Internal Modules
mod compiler;
use compiler::Compiler;
use compiler::BuildOptions;

// Standard Imports
use clap::Parser;
use simple_error::bail;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

// Basic Compiler Configuration
type PARSER = compiler::PestEelParser;
type ANALYSER = compiler::EelSemanticAnalyser;
type GENERATOR = compiler::CppSourceGenerator;

/// Target platforms the generated source can be built for.
/// Targets only differ in the runtime headers they ship; the emitted
/// source is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
enum Target {
    Avr,
}

impl Target {
    fn from_name(name: &str) -> Result<Target, Box<dyn std::error::Error>> {
        for target in Target::iter() {
            if target.to_string() == name {
                return Ok(target);
            }
        }
        bail!("Unknown target '{}'", name)
    }
}

/// Command Line interface struct
/// Describes possible arguments using the clap library
#[derive(Parser)]
#[clap(name = "eelc", about = "Compiler for the EEL language")]
struct CompilerCLIOptions {
    /// Select target platform (default: avr)
    #[clap(short, long, default_value = "avr")]
    target: String,

    /// Sets source file path
    #[clap(short, long, parse(from_os_str))]
    file: Option<std::path::PathBuf>,

    // Flags

    /// Lists available target platforms
    #[clap(long, action)]
    list_targets: bool,

    /// Enables use of the testing library
    #[clap(long, action)]
    test: bool,
}

fn main() {
    // Parse Command line arguments
    let cli_args = CompilerCLIOptions::parse();

    if cli_args.list_targets {
        for target in Target::iter() {
            println!("{}", target);
        }
        std::process::exit(exitcode::OK);
    }

    if let Err(why) = Target::from_name(&cli_args.target) {
        println!("{}", why);
        std::process::exit(exitcode::USAGE);
    }

    let source_path = match cli_args.file {
        Some(path) => path,
        None => {
            println!("Source file path is required.");
            std::process::exit(exitcode::OK);
        }
    };

    let source = match std::fs::read_to_string(&source_path) {
        Ok(source) => source,
        Err(why) => {
            println!("Couldn't read {}: {}", source_path.display(), why);
            std::process::exit(exitcode::IOERR);
        }
    };

    let compiler: Compiler<PARSER, ANALYSER, GENERATOR> = Compiler::default()
        .set_options(BuildOptions { testing: cli_args.test });

    match compiler.compile_str(&source) {
        Ok(generated) => {
            let dest_path = format!("{}.cc", source_path.display());
            match std::fs::write(&dest_path, generated) {
                Ok(_) => println!("Successfully wrote to {}", dest_path),
                Err(why) => {
                    println!("Couldn't write to {}: {}", dest_path, why);
                    std::process::exit(exitcode::IOERR);
                }
            }
        }
        Err(errors) => {
            for error in errors {
                println!("{}", error);
            }
        }
    }

    std::process::exit(exitcode::OK);
}
