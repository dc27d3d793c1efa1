use std::sync::LazyLock;

use annotext_config::Settings;
use regex::Regex;

use super::{AnnotateError, CodeAnnotatedTextBuilder, ProgressGuard};
use crate::dummy::DummyGenerator;
use crate::text::{AnnotatedText, AnnotatedTextBuilder};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!("valid ", stringify!($name), " regex")));
    };
}

pattern!(BLOCK_SEPARATOR, r"^(?:[ \t]*\r?\n)+");
pattern!(INDENTATION, r"^[ \t]*");

pattern!(
    FOOTNOTE,
    r"^\.\. \[(?:[0-9]+|[#*]|#[0-9A-Za-z\-_.:+]+)\](?:[ \t\r\n]|$)"
);
pattern!(DIRECTIVE, r"^\.\. [0-9A-Za-z\-_.:+]+::(?:[ \t\r\n]|$)");
pattern!(COMMENT, r"^\.\.(?:[ \t\r\n]|$)");

pattern!(GRID_TABLE_START, r"^(?:\+-{3,}){2,}\+\r?\n");
pattern!(SIMPLE_TABLE_START, r"^={3,}(?: +={3,})+\r?\n");
pattern!(
    SECTION_ADORNMENT,
    r#"^(?:={3,}|-{3,}|`{3,}|:{3,}|\.{3,}|'{3,}|"{3,}|~{3,}|\^{3,}|_{3,}|\*{3,}|\+{3,}|#{3,})\r?\n"#
);
pattern!(LINE_BLOCK_START, r"^\|[ \t]+");
pattern!(BULLET_LIST, "^[*+\\-\u{2022}\u{2023}\u{2043}][ \t]+");
pattern!(
    ENUMERATED_LIST,
    r"^(?:(?:[0-9]+|[A-Za-z#]|[IVXLCDM]+|[ivxlcdm]+)\.|\(?(?:[0-9]+|[A-Za-z#]|[IVXLCDM]+|[ivxlcdm]+)\))[ \t]+"
);

pattern!(STRONG_EMPHASIS, r"^\*\*");
pattern!(EMPHASIS, r"^\*");
pattern!(INLINE_LITERAL, r"^``");
pattern!(INTERPRETED_TEXT_START, r"^(?::[0-9A-Za-z\-_.:+]+:)?`");
pattern!(INTERPRETED_TEXT_END, r"^`(?::[0-9A-Za-z\-_.:+]+:)?");
pattern!(INTERNAL_TARGET_START, r"^_`");
pattern!(INTERNAL_TARGET_END, r"^`");
pattern!(FOOTNOTE_REFERENCE_START, r"^\[");
pattern!(FOOTNOTE_REFERENCE_END, r"^\]_");
pattern!(HYPERLINK_REFERENCE_START, r"^`");
pattern!(HYPERLINK_REFERENCE_END, r"^`__?");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockType {
    Paragraph,
    Footnote,
    Directive,
    Comment,
    GridTable,
    SimpleTable,
}

impl BlockType {
    fn is_explicit(self) -> bool {
        matches!(self, Self::Footnote | Self::Directive | Self::Comment)
    }

    fn is_table(self) -> bool {
        matches!(self, Self::GridTable | Self::SimpleTable)
    }

    /// Blocks whose content is never prose.
    fn is_markup_only(self) -> bool {
        matches!(self, Self::Comment | Self::GridTable | Self::SimpleTable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Strong,
    Plain,
}

/// What an inline match does to the open-markup state.
#[derive(Debug, Clone, Copy)]
enum Inline {
    Open(Emphasis),
    Close(Emphasis),
    StartIgnored,
    EndIgnored,
}

fn is_inline_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

fn may_precede_inline_start(byte: u8) -> bool {
    is_inline_whitespace(byte) || b"-:/'\"<([{".contains(&byte)
}

fn may_follow_inline_end(byte: u8) -> bool {
    is_inline_whitespace(byte) || b"-.,:;!?\\/'\")]}>".contains(&byte)
}

/// reStructuredText builder.
#[derive(Debug, Clone)]
pub struct RestructuredtextAnnotatedTextBuilder {
    language: String,
    strict: bool,
}

impl RestructuredtextAnnotatedTextBuilder {
    pub fn new(settings: &Settings) -> Self {
        Self {
            language: settings.language.clone(),
            strict: false,
        }
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl CodeAnnotatedTextBuilder for RestructuredtextAnnotatedTextBuilder {
    fn annotate(&self, code: &str) -> Result<AnnotatedText, AnnotateError> {
        Scan::new(self, code).run()
    }
}

struct Scan<'b, 'a> {
    config: &'b RestructuredtextAnnotatedTextBuilder,
    code: &'a str,
    out: AnnotatedTextBuilder<'a>,
    guard: ProgressGuard,
    dummy_counter: usize,
    indentation: Option<usize>,
    last_indentation: Option<usize>,
    block_type: BlockType,
    in_ignored_markup: bool,
    open_emphasis: Option<Emphasis>,
}

impl<'b, 'a> Scan<'b, 'a> {
    fn new(config: &'b RestructuredtextAnnotatedTextBuilder, code: &'a str) -> Self {
        Self {
            config,
            code,
            out: AnnotatedTextBuilder::new(code),
            guard: ProgressGuard::new("reStructuredText", config.strict),
            dummy_counter: 0,
            indentation: None,
            last_indentation: None,
            block_type: BlockType::Paragraph,
            in_ignored_markup: false,
            open_emphasis: None,
        }
    }

    fn run(mut self) -> Result<AnnotatedText, AnnotateError> {
        while !self.out.eof() {
            let started_at = self.out.pos();
            self.step();
            self.guard.check(&mut self.out, started_at)?;
        }
        Ok(self.out.build())
    }

    fn step(&mut self) {
        let pos = self.out.pos();
        let is_start_of_line = pos == 0 || self.code.as_bytes()[pos - 1] == b'\n';
        let mut is_start_of_block = false;

        if is_start_of_line {
            let separator = self.find(&BLOCK_SEPARATOR);
            if pos == 0 || separator.is_some() {
                is_start_of_block = true;
                if let Some(separator) = separator {
                    self.out.add_markup_as(separator.len(), "\n");
                }
            }

            let indentation = self.find(&INDENTATION).map_or(0, str::len);
            self.last_indentation = self.indentation;
            self.indentation = Some(indentation);
            self.out.add_markup(indentation);

            if self.out.eof() {
                return;
            }
        }

        if is_start_of_block {
            self.in_ignored_markup = false;
            self.open_emphasis = None;

            let dedented = self.indentation == Some(0)
                || match (self.indentation, self.last_indentation) {
                    (Some(current), Some(last)) => current < last,
                    _ => false,
                };
            if (self.block_type.is_explicit() && dedented) || self.block_type.is_table() {
                self.block_type = BlockType::Paragraph;
            }
        }

        if is_start_of_line && self.process_line_start() {
            return;
        }

        if self.block_type.is_markup_only() {
            self.out.add_markup(self.out.next_char_len());
            return;
        }

        if self.process_inline() {
            return;
        }

        let len = self.out.next_char_len();
        if self.in_ignored_markup {
            self.out.add_markup(len);
        } else {
            self.out.add_text(len);
        }
    }

    /// Block and list markers that are only recognised at the start of a
    /// line.
    fn process_line_start(&mut self) -> bool {
        let block_starts = [
            (&FOOTNOTE, Some(BlockType::Footnote)),
            (&DIRECTIVE, Some(BlockType::Directive)),
            (&COMMENT, Some(BlockType::Comment)),
            (&GRID_TABLE_START, Some(BlockType::GridTable)),
            (&SIMPLE_TABLE_START, Some(BlockType::SimpleTable)),
            (&SECTION_ADORNMENT, None),
        ];

        for (pattern, block_type) in block_starts {
            if let Some(marker) = self.find(pattern) {
                if let Some(block_type) = block_type {
                    self.block_type = block_type;
                }
                self.out.add_markup(marker.len());
                return true;
            }
        }

        if let Some(len) = self.line_block_marker() {
            self.out.add_markup(len);
            return true;
        }

        for pattern in [&BULLET_LIST, &ENUMERATED_LIST] {
            if let Some(marker) = self.find(pattern) {
                self.out.add_markup(marker.len());
                return true;
            }
        }

        false
    }

    /// `| ` followed by a line whose last character is not `|`.
    fn line_block_marker(&self) -> Option<usize> {
        let marker = self.find(&LINE_BLOCK_START)?;
        let rest = &self.out.rest()[marker.len()..];
        let line = rest.split('\n').next().unwrap_or("");
        let line = line.strip_suffix('\r').unwrap_or(line);
        match line.chars().next_back() {
            Some(last) if last != '|' => Some(marker.len()),
            _ => None,
        }
    }

    fn process_inline(&mut self) -> bool {
        // (pattern, is start-string, effect) in precedence order
        let rules: [(&Regex, bool, Inline); 14] = [
            (&*STRONG_EMPHASIS, true, Inline::Open(Emphasis::Strong)),
            (&*STRONG_EMPHASIS, false, Inline::Close(Emphasis::Strong)),
            (&*EMPHASIS, true, Inline::Open(Emphasis::Plain)),
            (&*EMPHASIS, false, Inline::Close(Emphasis::Plain)),
            (&*INLINE_LITERAL, true, Inline::StartIgnored),
            (&*INLINE_LITERAL, false, Inline::EndIgnored),
            (&*INTERPRETED_TEXT_START, true, Inline::StartIgnored),
            (&*INTERPRETED_TEXT_END, false, Inline::EndIgnored),
            (&*INTERNAL_TARGET_START, true, Inline::StartIgnored),
            (&*INTERNAL_TARGET_END, false, Inline::EndIgnored),
            (&*FOOTNOTE_REFERENCE_START, true, Inline::StartIgnored),
            (&*FOOTNOTE_REFERENCE_END, false, Inline::EndIgnored),
            (&*HYPERLINK_REFERENCE_START, true, Inline::StartIgnored),
            (&*HYPERLINK_REFERENCE_END, false, Inline::EndIgnored),
        ];

        for (pattern, is_start, effect) in rules {
            if !self.may_apply(effect) {
                continue;
            }
            let matched = if is_start {
                self.match_inline_start(pattern)
            } else {
                self.match_inline_end(pattern)
            };
            if let Some(len) = matched {
                self.apply_inline(len, effect);
                return true;
            }
        }
        false
    }

    /// End-strings only count while their start-string is open. Inside
    /// ignored markup only its end-string is recognised.
    fn may_apply(&self, effect: Inline) -> bool {
        match effect {
            Inline::EndIgnored => self.in_ignored_markup,
            _ if self.in_ignored_markup => false,
            Inline::Open(_) => self.open_emphasis.is_none(),
            Inline::Close(emphasis) => self.open_emphasis == Some(emphasis),
            Inline::StartIgnored => true,
        }
    }

    fn apply_inline(&mut self, len: usize, effect: Inline) {
        match effect {
            Inline::Open(emphasis) => {
                self.out.add_markup(len);
                self.open_emphasis = Some(emphasis);
            }
            Inline::Close(_) => {
                self.out.add_markup(len);
                self.open_emphasis = None;
            }
            Inline::StartIgnored => {
                let dummy = self.generate_dummy();
                self.out.add_markup_as(len, dummy);
                self.in_ignored_markup = true;
            }
            Inline::EndIgnored => {
                self.out.add_markup(len);
                self.in_ignored_markup = false;
            }
        }
    }

    fn generate_dummy(&mut self) -> String {
        let dummy = DummyGenerator::new().generate(&self.config.language, self.dummy_counter, false);
        self.dummy_counter += 1;
        dummy
    }

    /// Non-empty match of `pattern` at the current position.
    fn find(&self, pattern: &Regex) -> Option<&'a str> {
        pattern
            .find(self.out.rest())
            .map(|m| m.as_str())
            .filter(|m| !m.is_empty())
    }

    /// Length of an inline start-string at the current position.
    fn match_inline_start(&self, pattern: &Regex) -> Option<usize> {
        let bytes = self.code.as_bytes();
        let pos = self.out.pos();

        if pos > 0 && !may_precede_inline_start(bytes[pos - 1]) {
            return None;
        }
        let len = self.find(pattern)?.len();
        if pos == 0 || pos + 1 >= bytes.len() {
            return Some(len);
        }

        match bytes.get(pos + len) {
            Some(&next) if !is_inline_whitespace(next) => {}
            _ => return None,
        }

        let forbidden = match bytes[pos - 1] {
            b'\'' => b'\'',
            b'"' => b'"',
            b'<' => b'>',
            b'(' => b')',
            b'[' => b']',
            b'{' => b'}',
            _ => return Some(len),
        };
        (bytes[pos + 1] != forbidden).then_some(len)
    }

    /// Length of an inline end-string at the current position.
    fn match_inline_end(&self, pattern: &Regex) -> Option<usize> {
        let bytes = self.code.as_bytes();
        let pos = self.out.pos();

        if pos == 0 || is_inline_whitespace(bytes[pos - 1]) {
            return None;
        }
        let len = self.find(pattern)?.len();
        match bytes.get(pos + len) {
            None => Some(len),
            Some(&next) if may_follow_inline_end(next) => Some(len),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::invariants;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn plain(code: &str) -> String {
        let text = RestructuredtextAnnotatedTextBuilder::new(&Settings::default())
            .strict(true)
            .annotate(code)
            .unwrap();
        invariants::check(code, &text);
        text.plain_text().to_string()
    }

    #[rstest]
    #[case("This is **strong** and *emphasis*.", "This is strong and emphasis.")]
    #[case("Use ``code`` here.", "Use Dummy0 here.")]
    #[case("See :ref:`intro` and `link`_.", "See Dummy0 and Dummy1.")]
    #[case("A footnote [1]_ here.", "A footnote Dummy0 here.")]
    #[case("A _`target` here.", "A Dummy0 here.")]
    #[case("Ends with ``code``", "Ends with Dummy0")]
    #[case("2*3*4 stays", "2*3*4 stays")]
    #[case("x = a*b", "x = a*b")]
    #[case("5 * 3", "5 * 3")]
    #[case("\u{e9}*\u{e9}*", "\u{e9}*\u{e9}*")]
    #[case("stray** end", "stray** end")]
    #[case("*one* then two*", "one then two*")]
    fn inline_markup(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(plain(code), expected);
    }

    #[test]
    fn section_titles_and_paragraphs() {
        assert_eq!(plain("Title\n=====\n\nBody text."), "Title\n\nBody text.");
    }

    #[test]
    fn list_markers_are_markup() {
        assert_eq!(plain("- one\n- two\n\n1. three\n(b) four"), "one\ntwo\n\nthree\nfour");
    }

    #[test]
    fn comments_are_skipped_until_dedent() {
        let code = ".. This is a comment\n   still comment\n\nVisible.";
        assert_eq!(plain(code), "\nVisible.");
    }

    #[test]
    fn directive_content_is_text() {
        let code = ".. note::\n\n   Indented note.\n\nAfter.";
        assert_eq!(plain(code), "\nIndented note.\n\nAfter.");
    }

    #[test]
    fn tables_are_markup() {
        let code = "=====  =====\nA      B\n=====  =====\n\nAfter.";
        assert_eq!(plain(code), "\nAfter.");
    }

    #[test]
    fn line_blocks() {
        assert_eq!(plain("| First line\n| Second"), "First line\nSecond");
    }
}
