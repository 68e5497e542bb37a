//! Build-report rendering of parse errors.

use ariadne::{Config, Label, Report, ReportKind, Source};
use cbx_parse::ParseError;

/// Render `error` in `source` as a plain-text report headed by `name`.
pub fn render_parse_error(name: &str, source: &str, error: &ParseError) -> String {
    let len = source.len();
    let start = (error.span.start as usize).min(len);
    let end = (error.span.end as usize).clamp(start, len);
    let id = name.to_string();

    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, id.clone(), start)
        .with_config(Config::default().with_color(false))
        .with_message(format!("SyntaxError: {error}"))
        .with_label(Label::new((id.clone(), start..end)).with_message(error.to_string()))
        .finish()
        .write((id, Source::from(source)), &mut out);
    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => format!("{name}: SyntaxError: {error}"),
    }
}
