use std::sync::LazyLock;

use annotext_config::Settings;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use regex::Regex;

use super::{CodeFragment, CodeFragmentizer, child_fragments, magic_comment_splits, split_at};
use crate::parsing::markdown::parser_options;
use crate::text::Span;

/// `[comment]: <> "annotext: ..."` or `<!-- annotext: ... -->` on a line of
/// its own.
static MAGIC_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*(?:\[[^\]]+\]:[ \t]*<>[ \t]*"[ \t]*(?i:annotext):(.*?)"|<!--[ \t]*(?i:annotext):(.*?)[ \t]*-->)[ \t]*\r?$"#,
    )
    .expect("valid magic comment regex")
});

/// Code language id for the info string of a fenced code block whose
/// content is checked as prose.
fn embedded_language(info: &str) -> Option<&'static str> {
    let tag = info.split_whitespace().next()?.to_ascii_lowercase();
    match tag.as_str() {
        "latex" | "tex" => Some("latex"),
        "markdown" | "md" => Some("markdown"),
        "rst" | "restructuredtext" => Some("restructuredtext"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFragmentizer;

impl MarkdownFragmentizer {
    pub fn new() -> Self {
        Self
    }

    /// Fenced code blocks in a supported markup language, with the range of
    /// their content.
    fn embedded_blocks(code: &str) -> Vec<(&'static str, Span)> {
        let mut blocks = Vec::new();
        let mut current: Option<(&'static str, Option<Span>)> = None;

        for (event, range) in Parser::new_ext(code, parser_options()).into_offset_iter() {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    current = embedded_language(&info).map(|language| (language, None));
                }
                Event::Text(_) => {
                    if let Some((_, body)) = current.as_mut() {
                        *body = Some(match *body {
                            Some(span) => Span::new(span.start, range.end),
                            None => Span::from(range),
                        });
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((language, Some(body))) = current.take() {
                        blocks.push((language, body));
                    }
                }
                _ => {}
            }
        }

        blocks
    }
}

impl CodeFragmentizer for MarkdownFragmentizer {
    fn fragmentize(&self, code: &str, settings: &Settings) -> Vec<CodeFragment> {
        let splits = magic_comment_splits(code, &MAGIC_COMMENT);

        let mut fragments = Vec::new();
        for piece in split_at(code, "markdown", settings, splits) {
            for (language, body) in Self::embedded_blocks(&piece.code) {
                fragments.extend(child_fragments(&piece, body, language, &piece.settings));
            }
            fragments.push(piece);
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn summary(fragments: &[CodeFragment]) -> Vec<(&str, usize, &str)> {
        fragments
            .iter()
            .map(|f| (f.code_language_id.as_str(), f.from_pos, f.settings.language.as_str()))
            .collect()
    }

    #[rstest]
    #[case::reference_comment(
        "Sentence 1\n\n[comment]: <> \"annotext: language=de-DE\"\n\nSentence 2\n\n\
         [comment]:\t<>\"annotext:\tlanguage=en-US\"\n\nSentence 3\n",
        "[comment]: <>",
        "[comment]:\t<>"
    )]
    #[case::html_comment(
        "Sentence 1\n\n  <!-- annotext: language=de-DE-->      \n\nSentence 2\n\n\
         <!--\t\t\tannotext:\t\t\t\tlanguage=en-US\t\t-->\n\nSentence 3\n",
        "  <!-- annotext",
        "<!--\t"
    )]
    fn directives_split_the_document(
        #[case] code: &str,
        #[case] second_marker: &str,
        #[case] third_marker: &str,
    ) {
        let fragments = MarkdownFragmentizer::new().fragmentize(code, &Settings::default());

        let second = code.find(second_marker).unwrap();
        let third = code.find(third_marker).unwrap();
        assert_eq!(second, 12);
        assert_eq!(
            summary(&fragments),
            vec![
                ("markdown", 0, "en-US"),
                ("markdown", second, "de-DE"),
                ("markdown", third, "en-US"),
            ]
        );
    }

    #[test]
    fn directive_inside_a_line_is_not_a_split() {
        let code = "Text <!-- annotext: language=de-DE --> more text\n";
        let fragments = MarkdownFragmentizer::new().fragmentize(code, &Settings::default());
        assert_eq!(summary(&fragments), vec![("markdown", 0, "en-US")]);
    }

    #[test]
    fn fenced_latex_block_becomes_a_child() {
        let code = "Intro\n\n```latex\nSome \\emph{prose}.\n```\n\n```rust\nlet x = 1;\n```\n";
        let fragments = MarkdownFragmentizer::new().fragmentize(code, &Settings::default());

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].code_language_id, "latex");
        assert_eq!(fragments[0].code, "Some \\emph{prose}.\n");
        assert_eq!(fragments[0].from_pos, code.find("Some").unwrap());
        assert_eq!(fragments[1].code, code);
    }

    #[rstest]
    #[case("tex", Some("latex"))]
    #[case("Markdown", Some("markdown"))]
    #[case("rst {.class}", Some("restructuredtext"))]
    #[case("python", None)]
    #[case("", None)]
    fn info_strings(#[case] info: &str, #[case] expected: Option<&str>) {
        assert_eq!(embedded_language(info), expected);
    }
}
