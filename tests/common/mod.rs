use siltc::{
    backend,
    frontend::{SourceFile, SourceFileOrigin, parser::Parser},
    middle::resolve::ScopeBuilder,
};

/// Runs the full pipeline on an in-memory source file and returns the IR
/// listing. Panics on any diagnostic: these tests only feed valid programs.
pub fn compile(source: &str) -> String {
    let source = SourceFile {
        contents: source.to_owned(),
        origin: SourceFileOrigin::Memory,
    };

    let unit = Parser::parse_unit(&source);
    let (scopes, diagnostics) = ScopeBuilder::build_scopes(&unit);

    assert!(
        diagnostics.is_empty(),
        "test program failed scope building: {diagnostics:?}"
    );

    backend::lower(&unit, scopes)
}

/// Extracts one function's text from a listing, header line through closing
/// brace
#[allow(dead_code)]
pub fn function_body<'ir>(ir: &'ir str, name: &str) -> &'ir str {
    let needle = format!("@{name}(");

    let start = ir
        .lines()
        .scan(0, |offset, line| {
            let line_start = *offset;
            *offset += line.len() + 1;
            Some((line_start, line))
        })
        .find(|(_, line)| line.starts_with("define") && line.contains(&needle))
        .map(|(offset, _)| offset)
        .unwrap_or_else(|| panic!("function `{name}` not found in:\n{ir}"));

    let end = ir[start..]
        .find("\n}")
        .map(|i| start + i + 2)
        .unwrap_or(ir.len());

    &ir[start..end]
}
