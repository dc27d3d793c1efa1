//! # Format Annotation Builders
//!
//! Each builder scans one source format in a single pass and classifies every
//! byte as prose or markup, producing an [`AnnotatedText`].
//!
//! ## Modules
//!
//! - [`latex`]: LaTeX and RSweave, driven by a mode stack and signature catalogs
//! - [`markdown`]: streams `pulldown-cmark` offset events with an ancestor stack
//! - [`rst`]: line and block oriented reStructuredText scanner
//! - [`html`]: `quick-xml` event stream with an open-element stack
//! - [`program`]: comments of source code, read as Markdown
//! - [`plaintext`]: everything is prose
//!
//! ## Key Invariants
//!
//! - Builders hold configuration only. All scan state lives in a value created
//!   per [`CodeAnnotatedTextBuilder::annotate`] call.
//! - Every loop iteration consumes input. A stalled scan is reported by
//!   [`ProgressGuard`] as an error in strict mode and skipped otherwise.

pub mod html;
pub mod latex;
pub mod markdown;
pub mod plaintext;
pub mod program;
pub mod rst;

use annotext_config::Settings;
use thiserror::Error;

use crate::text::{AnnotatedText, AnnotatedTextBuilder};

pub use html::HtmlAnnotatedTextBuilder;
pub use latex::LatexAnnotatedTextBuilder;
pub use markdown::MarkdownAnnotatedTextBuilder;
pub use plaintext::PlaintextAnnotatedTextBuilder;
pub use program::ProgramAnnotatedTextBuilder;
pub use rst::RestructuredtextAnnotatedTextBuilder;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotateError {
    #[error("{builder} builder made no progress at offset {offset}; remaining input: \"{context}\"")]
    NoProgress {
        builder: &'static str,
        offset: usize,
        context: String,
    },
}

/// Converts one source format into annotated text.
pub trait CodeAnnotatedTextBuilder: Send + Sync {
    fn annotate(&self, code: &str) -> Result<AnnotatedText, AnnotateError>;
}

/// Creates the builder for a code language id. Programming language ids
/// check their comments; unknown ids fall back to plaintext.
pub fn create_builder(code_language_id: &str, settings: &Settings) -> Box<dyn CodeAnnotatedTextBuilder> {
    match code_language_id {
        "latex" => Box::new(LatexAnnotatedTextBuilder::new(settings)),
        "rsweave" => Box::new(LatexAnnotatedTextBuilder::rsweave(settings)),
        "markdown" => Box::new(MarkdownAnnotatedTextBuilder::new(settings)),
        "restructuredtext" => Box::new(RestructuredtextAnnotatedTextBuilder::new(settings)),
        "html" => Box::new(HtmlAnnotatedTextBuilder),
        "plaintext" => Box::new(PlaintextAnnotatedTextBuilder),
        other => match ProgramAnnotatedTextBuilder::new(other, settings) {
            Some(builder) => Box::new(builder),
            None => {
                log::warn!("Unknown code language id {other:?}, treating the document as plain text");
                Box::new(PlaintextAnnotatedTextBuilder)
            }
        },
    }
}

/// Detects scan iterations that consumed nothing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProgressGuard {
    builder: &'static str,
    strict: bool,
}

impl ProgressGuard {
    pub(crate) fn new(builder: &'static str, strict: bool) -> Self {
        Self { builder, strict }
    }

    /// Call once per iteration with the position the iteration started at.
    pub(crate) fn check(
        &self,
        out: &mut AnnotatedTextBuilder<'_>,
        started_at: usize,
    ) -> Result<(), AnnotateError> {
        if out.pos() != started_at || out.eof() {
            return Ok(());
        }

        let context: String = out.rest().chars().take(100).collect::<String>().escape_debug().to_string();
        if self.strict {
            return Err(AnnotateError::NoProgress {
                builder: self.builder,
                offset: started_at,
                context,
            });
        }

        log::warn!(
            "{} builder made no progress at offset {}, skipping one character; remaining input: \"{}\"",
            self.builder,
            started_at,
            context
        );
        out.add_markup(out.next_char_len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("latex", r"A \textbf{b} $c$.", "A b Dummy0.")]
    #[case("rsweave", "A <<x>>=\n1\n@ b", "A b")]
    #[case("markdown", "A *b* `c`.", "A b Dummy0.")]
    #[case("restructuredtext", "A **b** ``c``.", "A b Dummy0.")]
    #[case("html", "<p>A <b>b</b> &amp; c.</p>", "\n\nA b & c.")]
    #[case("rust", "// A *b* `c`.\nfn main() {}\n", "A b Dummy0.")]
    #[case("plaintext", r"A \textbf{b}", r"A \textbf{b}")]
    #[case("cobol", r"A \textbf{b}", r"A \textbf{b}")]
    fn factory_dispatches_on_language_id(
        #[case] id: &str,
        #[case] code: &str,
        #[case] expected: &str,
    ) {
        let builder = create_builder(id, &Settings::default());
        let text = builder.annotate(code).unwrap();
        assert_eq!(text.plain_text(), expected);
    }

    #[test]
    fn strict_guard_reports_stalls() {
        let guard = ProgressGuard::new("test", true);
        let mut out = AnnotatedTextBuilder::new("ab\n");
        let err = guard.check(&mut out, 0).unwrap_err();
        assert_eq!(
            err,
            AnnotateError::NoProgress {
                builder: "test",
                offset: 0,
                context: "ab\\n".to_string()
            }
        );
    }

    #[test]
    fn lenient_guard_skips_one_character() {
        let guard = ProgressGuard::new("test", false);
        let mut out = AnnotatedTextBuilder::new("éa");
        guard.check(&mut out, 0).unwrap();
        assert_eq!(out.pos(), 2);
        guard.check(&mut out, 0).unwrap();
        assert_eq!(out.pos(), 2);
    }
}
