use std::path::PathBuf;

use colored::Colorize;

use self::lexer::Span;

pub mod ast;
pub mod intern;
pub mod lexer;
pub mod parser;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn value_of_span(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// 1-based line number of a byte position
    pub fn row_for_position(&self, position: usize) -> usize {
        self.contents[..position.min(self.contents.len())]
            .bytes()
            .filter(|b| *b == b'\n')
            .count()
            + 1
    }

    /// 1-based column number of a byte position
    pub fn column_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());
        let line_start = self.contents[..position]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        position - line_start + 1
    }

    /// Prints the line containing the span with a caret marker underneath
    pub fn highlight_span(&self, span: Span) {
        let start = span.start.min(self.contents.len());
        let line_start = self.contents[..start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let line_end = self.contents[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(self.contents.len());

        let line = &self.contents[line_start..line_end];
        let caret_offset = start - line_start;
        let caret_width = (span.end.min(line_end) - start).max(1);

        eprintln!("{line}");
        eprintln!(
            "{}{}",
            " ".repeat(caret_offset),
            "^".repeat(caret_width).red().bold()
        );
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}
