use annotext_config::Settings;
use regex::Regex;

use super::{AnnotateError, CodeAnnotatedTextBuilder, MarkdownAnnotatedTextBuilder};
use crate::text::{AnnotatedText, AnnotatedTextBuilder};

/// Comment delimiters of a programming language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line: Option<&'static str>,
    pub block: Option<(&'static str, &'static str)>,
}

const C_LIKE: CommentSyntax = CommentSyntax {
    line: Some("//"),
    block: Some(("/*", "*/")),
};

const HASH: CommentSyntax = CommentSyntax {
    line: Some("#"),
    block: None,
};

/// Comment syntax for a code language id, `None` when the id is not a
/// known programming language.
pub fn comment_syntax(code_language_id: &str) -> Option<CommentSyntax> {
    let syntax = match code_language_id {
        "c" | "cpp" | "csharp" | "dart" | "go" | "groovy" | "java" | "javascript"
        | "javascriptreact" | "kotlin" | "php" | "rust" | "scala" | "swift" | "typescript"
        | "typescriptreact" | "verilog" => C_LIKE,
        "perl" | "r" | "shellscript" | "elixir" | "puppet" => HASH,
        "python" => CommentSyntax {
            line: Some("#"),
            block: Some(("\"\"\"", "\"\"\"")),
        },
        "ruby" => CommentSyntax {
            line: Some("#"),
            block: Some(("=begin", "=end")),
        },
        "julia" => CommentSyntax {
            line: Some("#"),
            block: Some(("#=", "=#")),
        },
        "powershell" => CommentSyntax {
            line: Some("#"),
            block: Some(("<#", "#>")),
        },
        "coffeescript" => CommentSyntax {
            line: Some("#"),
            block: Some(("###", "###")),
        },
        "lua" => CommentSyntax {
            line: Some("--"),
            block: Some(("--[[", "]]")),
        },
        "haskell" => CommentSyntax {
            line: Some("--"),
            block: Some(("{-", "-}")),
        },
        "sql" => CommentSyntax {
            line: Some("--"),
            block: Some(("/*", "*/")),
        },
        "matlab" => CommentSyntax {
            line: Some("%"),
            block: Some(("%{", "%}")),
        },
        "erlang" => CommentSyntax {
            line: Some("%"),
            block: None,
        },
        "clojure" | "lisp" => CommentSyntax {
            line: Some(";"),
            block: None,
        },
        "vb" => CommentSyntax {
            line: Some("'"),
            block: None,
        },
        _ => return None,
    };
    Some(syntax)
}

impl CommentSyntax {
    /// Matches one block comment (`block` group, delimiters excluded) or a
    /// run of consecutive line comments (`line` group, markers included).
    /// A line comment must start a line or follow whitespace.
    pub fn pattern(&self) -> Result<Regex, regex::Error> {
        let mut alternatives = Vec::new();
        if let Some((start, end)) = self.block {
            alternatives.push(format!(
                r"{}(?P<block>(?s:.*?)){}",
                regex::escape(start),
                regex::escape(end)
            ));
        }
        if let Some(marker) = self.line {
            let marker = regex::escape(marker);
            alternatives.push(format!(
                r"(?m)(?:^|[ \t])(?P<line>{marker}[^\n]*(?:\n[ \t]*{marker}[^\n]*)*)"
            ));
        }
        Regex::new(&alternatives.join("|"))
    }
}

/// The character every non-blank line of a comment starts with, if it is
/// one of the usual decoration characters.
fn common_first_character(comment: &str) -> Option<char> {
    let mut common = None;
    for line in comment.lines() {
        let Some(first) = line.trim_start_matches([' ', '\t']).chars().next() else {
            continue;
        };
        if !"#$%*+-/".contains(first) {
            return None;
        }
        match common {
            None => common = Some(first),
            Some(c) if c != first => return None,
            Some(_) => {}
        }
    }
    common
}

/// Checks the comments of source code as Markdown and skips everything
/// else.
///
/// Each comment line loses its indentation, comment marker and decoration
/// (`///`, ` * `, `##`) before its content is annotated. Code between
/// two comments reads as a paragraph break.
#[derive(Debug, Clone)]
pub struct ProgramAnnotatedTextBuilder {
    syntax: CommentSyntax,
    comments: Regex,
    markdown: MarkdownAnnotatedTextBuilder,
}

impl ProgramAnnotatedTextBuilder {
    pub fn new(code_language_id: &str, settings: &Settings) -> Option<Self> {
        let syntax = comment_syntax(code_language_id)?;
        let comments = syntax
            .pattern()
            .map_err(|err| log::warn!("Invalid comment pattern for {code_language_id}: {err}"))
            .ok()?;
        Some(Self {
            syntax,
            comments,
            markdown: MarkdownAnnotatedTextBuilder::new(settings),
        })
    }

    fn add_comment(
        &self,
        out: &mut AnnotatedTextBuilder<'_>,
        comment: regex::Match<'_>,
        is_line_comment: bool,
    ) -> Result<(), AnnotateError> {
        let marker = if is_line_comment { self.syntax.line } else { None };
        let decoration = common_first_character(comment.as_str());
        let mut line_start = comment.start();

        for (index, line) in comment.as_str().split('\n').enumerate() {
            let content = line.strip_suffix('\r').unwrap_or(line);
            let prefix = prefix_len(content, marker, decoration);
            let content_start = line_start + prefix;

            if index == 0 {
                out.add_markup_until(content_start);
            } else {
                out.add_markup_as(content_start - out.pos(), "\n");
            }

            let content = &content[prefix..];
            if !content.is_empty() {
                out.add_annotated(&self.markdown.annotate(content)?);
            }
            line_start += line.len() + 1;
        }
        Ok(())
    }
}

/// Indentation, comment marker and decoration at the start of a comment
/// line.
fn prefix_len(line: &str, marker: Option<&str>, decoration: Option<char>) -> usize {
    let mut rest = line.trim_start_matches([' ', '\t']);
    if let Some(marker) = marker {
        rest = rest.strip_prefix(marker).unwrap_or(rest);
    }
    if let Some(decoration) = decoration {
        rest = rest.strip_prefix(decoration).unwrap_or(rest);
    }
    rest = rest.strip_prefix('!').unwrap_or(rest);
    rest = rest.trim_start_matches([' ', '\t']);
    line.len() - rest.len()
}

impl CodeAnnotatedTextBuilder for ProgramAnnotatedTextBuilder {
    fn annotate(&self, code: &str) -> Result<AnnotatedText, AnnotateError> {
        let mut out = AnnotatedTextBuilder::new(code);

        for caps in self.comments.captures_iter(code) {
            let (comment, is_line_comment) = match (caps.name("line"), caps.name("block")) {
                (Some(line), _) => (line, true),
                (None, Some(block)) => (block, false),
                (None, None) => continue,
            };
            if out.pos() == 0 {
                out.add_markup_until(comment.start());
            } else if comment.start() > out.pos() {
                out.add_markup_as(comment.start() - out.pos(), "\n\n");
            }
            self.add_comment(&mut out, comment, is_line_comment)?;
        }

        Ok(out.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::invariants;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn plain(code_language_id: &str, code: &str) -> String {
        let text = ProgramAnnotatedTextBuilder::new(code_language_id, &Settings::default())
            .unwrap()
            .annotate(code)
            .unwrap();
        invariants::check(code, &text);
        text.plain_text().to_string()
    }

    #[test]
    fn rust_doc_comments_read_as_markdown() {
        let code = "/// Adds *two* numbers.\n/// Returns `sum`.\nfn add(a: u8) -> u8 {\n    a + 2 // plus two\n}\n";
        assert_eq!(
            plain("rust", code),
            "Adds two numbers.\nReturns Dummy0.\n\nplus two"
        );
    }

    #[test]
    fn block_comment_decoration_is_stripped() {
        let code = "/**\n * First line.\n * Second line.\n */\nint x;\n";
        assert_eq!(plain("java", code), "\nFirst line.\nSecond line.\n");
    }

    #[rstest]
    #[case("python", "x = 1  # set x\n", "set x")]
    #[case("python", "## Title\nx = 1\n", "Title")]
    #[case("python", "\"\"\"Module *docs*.\"\"\"\nx = 1  # one\n", "Module docs.\n\none")]
    #[case("lua", "--[[ long\nnote]]\n-- short\n", "long\nnote\n\nshort")]
    #[case("shellscript", "echo $# # count\n", "count")]
    fn comment_markers_per_language(
        #[case] code_language_id: &str,
        #[case] code: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(plain(code_language_id, code), expected);
    }

    #[test]
    fn url_in_string_is_not_a_comment() {
        assert_eq!(plain("javascript", r#"fetch("https://example.com");"#), "");
    }

    #[test]
    fn unknown_language_has_no_builder() {
        assert!(ProgramAnnotatedTextBuilder::new("cobol", &Settings::default()).is_none());
        assert!(comment_syntax("markdown").is_none());
    }

    #[rstest]
    #[case("* text", None, Some('*'), 2)]
    #[case("  //! docs", Some("//"), Some('/'), 6)]
    #[case("# ## x", Some("#"), Some('#'), 2)]
    fn prefix_lengths(
        #[case] line: &str,
        #[case] marker: Option<&str>,
        #[case] decoration: Option<char>,
        #[case] expected: usize,
    ) {
        assert_eq!(prefix_len(line, marker, decoration), expected);
    }
}
