use std::path::PathBuf;

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};

use siltc::{
    backend,
    frontend::{SourceFile, SourceFileOrigin, parser::Parser},
    middle::resolve::ScopeBuilder,
};

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Silt source file to compile
    source_file: PathBuf,
    /// Where to write the IR listing (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    if !args.source_file.exists() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!(
                    "Source file '{}' does not exist!",
                    args.source_file.display()
                ),
            )
            .exit()
    }

    if !args.source_file.is_file() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!(
                    "Input path '{}' is not a file!",
                    args.source_file.display()
                ),
            )
            .exit()
    }

    let contents = std::fs::read_to_string(&args.source_file)
        .expect("Failed to read input file (or invalid UTF-8)");

    let source_file = SourceFile {
        contents,
        origin: SourceFileOrigin::File(args.source_file),
    };

    let unit = Parser::parse_unit(&source_file);

    let (scopes, diagnostics) = ScopeBuilder::build_scopes(&unit);

    // Lowering assumes a valid program; refuse to run on any diagnostic
    if !diagnostics.is_empty() {
        for diagnostic in &diagnostics {
            diagnostic.render(&source_file);
        }

        std::process::exit(1);
    }

    let ir = backend::lower(&unit, scopes);

    match &args.output {
        Some(path) => std::fs::write(path, ir).expect("Failed to write output file"),
        None => print!("{ir}"),
    }
}
