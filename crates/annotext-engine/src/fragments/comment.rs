use std::sync::LazyLock;

use annotext_config::Settings;
use regex::Regex;

use super::{CodeFragment, CodeFragmentizer, magic_comment_splits, split_at};
use crate::parsing::program::comment_syntax;

static HTML_MAGIC_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*<!--[ \t]*(?i:annotext):(.*?)[ \t]*-->")
        .expect("valid magic comment regex")
});

/// Splits at `annotext:` comments written in the comment syntax of the
/// format. Used for HTML and for source code.
#[derive(Debug, Clone)]
pub struct CommentFragmentizer {
    code_language_id: String,
    magic_comment: Regex,
}

impl CommentFragmentizer {
    /// `<!-- annotext: ... -->` at the start of a line.
    pub fn html(code_language_id: &str) -> Self {
        Self {
            code_language_id: code_language_id.to_string(),
            magic_comment: HTML_MAGIC_COMMENT.clone(),
        }
    }

    /// A line comment such as `// annotext: ...` on a line of its own.
    /// `None` when the language has no known line comment marker.
    pub fn program(code_language_id: &str) -> Option<Self> {
        let marker = comment_syntax(code_language_id)?.line?;
        let pattern = format!(
            r"(?m)^[ \t]*{}[ \t]*(?i:annotext):(.*?)[ \t]*\r?$",
            regex::escape(marker)
        );
        let magic_comment = Regex::new(&pattern)
            .map_err(|err| log::warn!("Invalid magic comment pattern for {code_language_id}: {err}"))
            .ok()?;
        Some(Self {
            code_language_id: code_language_id.to_string(),
            magic_comment,
        })
    }
}

impl CodeFragmentizer for CommentFragmentizer {
    fn fragmentize(&self, code: &str, settings: &Settings) -> Vec<CodeFragment> {
        let splits = magic_comment_splits(code, &self.magic_comment);
        split_at(code, &self.code_language_id, settings, splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn summary(fragments: &[CodeFragment]) -> Vec<(usize, &str, &str)> {
        fragments
            .iter()
            .map(|f| (f.from_pos, f.code_language_id.as_str(), f.settings.language.as_str()))
            .collect()
    }

    #[test]
    fn html_directive_starts_a_fragment() {
        let code = "<p>One</p>\n<!-- annotext: language=de-DE -->\n<p>Zwei</p>\n";
        let fragments = CommentFragmentizer::html("html").fragmentize(code, &Settings::default());
        assert_eq!(
            summary(&fragments),
            vec![(0, "html", "en-US"), (11, "html", "de-DE")]
        );
    }

    #[rstest]
    #[case("rust", "fn a() {}\n    // annotext: language=fr\n// Bonjour\n", 10)]
    #[case("python", "x = 1\n# ANNOTEXT: language=fr\n# Bonjour\n", 6)]
    #[case("sql", "SELECT 1;\n-- annotext: language=fr\n", 10)]
    fn program_directive_starts_a_fragment(
        #[case] code_language_id: &str,
        #[case] code: &str,
        #[case] split: usize,
    ) {
        let fragments = CommentFragmentizer::program(code_language_id)
            .unwrap()
            .fragmentize(code, &Settings::default());
        assert_eq!(
            summary(&fragments),
            vec![
                (0, code_language_id, "en-US"),
                (split, code_language_id, "fr")
            ]
        );
    }

    #[test]
    fn trailing_directive_is_not_a_split() {
        let code = "let x = 1; // annotext: language=fr\n";
        let fragments = CommentFragmentizer::program("rust")
            .unwrap()
            .fragmentize(code, &Settings::default());
        assert_eq!(fragments.len(), 1);
    }

    #[test]
    fn unknown_language_has_no_fragmentizer() {
        assert!(CommentFragmentizer::program("cobol").is_none());
    }
}
