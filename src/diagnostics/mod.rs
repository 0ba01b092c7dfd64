//! Diagnostic rendering for the `ashc` binary.
//!
//! Spanned errors are rendered as ariadne reports with the offending
//! source range labelled; module and output errors print as plain lines.

use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use ashc::driver::CompileError;
use ashc::token::Span;

fn clamped_range(span: Span, source: &str) -> Range<usize> {
    let start = span.start.min(source.len());
    let mut end = span.end.min(source.len());
    if end <= start {
        end = (start + 1).min(source.len());
    }
    if end <= start {
        // zero-width at end of input; point at the last byte if any
        let last = source.len().saturating_sub(1);
        return last..source.len();
    }
    start..end
}

fn print_range_report(
    filename: &str,
    source: &str,
    span_range: Range<usize>,
    message: &str,
) -> std::io::Result<()> {
    Report::build(ReportKind::Error, (filename, span_range.clone()))
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_message(message)
        .with_label(
            Label::new((filename, span_range))
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((filename, Source::from(source)))
}

fn report_spanned(filename: &str, source: &str, span: Span, message: &str) {
    let range = clamped_range(span, source);
    if print_range_report(filename, source, range, message).is_err() {
        eprintln!(
            "Error: {} (at {}:{}:{})",
            message, filename, span.line, span.column
        );
    }
}

/// Reports a compile error to standard error.
pub(crate) fn report_error(error: &CompileError) {
    match error {
        CompileError::Lex {
            file,
            source,
            error,
        } => {
            report_spanned(file, source, error.span(), error.message());
        }
        CompileError::Parse {
            file,
            source,
            error,
        } => {
            report_spanned(file, source, error.span(), error.message());
        }
        CompileError::Semantic {
            file,
            source,
            error,
        } => {
            report_spanned(file, source, error.span(), error.message());
        }
        CompileError::Codegen {
            file,
            source,
            error,
        } => match error.span() {
            Some(span) => report_spanned(file, source, span, error.message()),
            None => eprintln!("Error in {}: {}", file, error.message()),
        },
        CompileError::Module(error) => {
            eprintln!("Error: {}", error);
        }
        CompileError::Output(error) => {
            eprintln!("Error: {}", error);
        }
    }
}
