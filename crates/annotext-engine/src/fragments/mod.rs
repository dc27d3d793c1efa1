//! # Code Fragments
//!
//! A document is split into fragments before annotation. Each fragment is a
//! contiguous piece of the document with its own format and settings:
//! embedded `annotext:` directives switch the language for the rest of the
//! document, and some constructs (babel language switches, footnotes, embedded
//! Markdown) are extracted as child fragments of their own.
//!
//! ## Key Invariants
//!
//! - `from_pos` is absolute in the top-level document at every nesting level.
//! - Children come before the fragment they were extracted from, so the first
//!   fragment containing an offset is the innermost one.
//! - Directive text stays in the fragment it opens, where the builder treats
//!   it as markup.

pub mod babel;
pub mod comment;
pub mod latex;
pub mod markdown;

use std::sync::LazyLock;

use annotext_config::Settings;
use regex::Regex;

use crate::text::Span;

pub use comment::CommentFragmentizer;
pub use latex::LatexFragmentizer;
pub use markdown::MarkdownFragmentizer;

static RST_MAGIC_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\.\.[ \t]*(?i:annotext):(.*?)[ \t]*\r?$")
        .expect("valid magic comment regex")
});

/// A piece of a document checked with one format and one settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    pub code_language_id: String,
    pub code: String,
    /// Byte offset of `code` in the top-level document.
    pub from_pos: usize,
    pub settings: Settings,
}

impl CodeFragment {
    pub fn new(
        code_language_id: impl Into<String>,
        code: impl Into<String>,
        from_pos: usize,
        settings: Settings,
    ) -> Self {
        Self {
            code_language_id: code_language_id.into(),
            code: code.into(),
            from_pos,
            settings,
        }
    }

    /// Range of the fragment in the top-level document.
    pub fn span(&self) -> Span {
        Span::new(self.from_pos, self.from_pos + self.code.len())
    }

    fn shifted(mut self, offset: usize) -> Self {
        self.from_pos += offset;
        self
    }
}

/// Splits a document of one format into fragments.
pub trait CodeFragmentizer: Send + Sync {
    fn fragmentize(&self, code: &str, settings: &Settings) -> Vec<CodeFragment>;
}

/// Creates the fragmentizer for a code language id. Programming language
/// ids split at their line comments; unknown ids fall back to plaintext.
pub fn create_fragmentizer(code_language_id: &str) -> Box<dyn CodeFragmentizer> {
    match code_language_id {
        "latex" | "rsweave" => Box::new(LatexFragmentizer::new(code_language_id)),
        "markdown" => Box::new(MarkdownFragmentizer::new()),
        "restructuredtext" => Box::new(RestructuredtextFragmentizer),
        "html" => Box::new(CommentFragmentizer::html(code_language_id)),
        "plaintext" => Box::new(PlaintextFragmentizer),
        other => match CommentFragmentizer::program(other) {
            Some(fragmentizer) => Box::new(fragmentizer),
            None => {
                log::warn!("Unknown code language id {other:?}, treating the document as plain text");
                Box::new(PlaintextFragmentizer)
            }
        },
    }
}

pub fn fragmentize(code_language_id: &str, code: &str, settings: &Settings) -> Vec<CodeFragment> {
    create_fragmentizer(code_language_id).fragmentize(code, settings)
}

/// The whole document as one fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextFragmentizer;

impl CodeFragmentizer for PlaintextFragmentizer {
    fn fragmentize(&self, code: &str, settings: &Settings) -> Vec<CodeFragment> {
        vec![CodeFragment::new("plaintext", code, 0, settings.clone())]
    }
}

/// Splits at `.. annotext: ...` comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestructuredtextFragmentizer;

impl CodeFragmentizer for RestructuredtextFragmentizer {
    fn fragmentize(&self, code: &str, settings: &Settings) -> Vec<CodeFragment> {
        let splits = magic_comment_splits(code, &RST_MAGIC_COMMENT);
        split_at(code, "restructuredtext", settings, splits)
    }
}

/// How a split point changes the settings of the fragment it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SettingsChange {
    /// `key=value` pairs of an `annotext:` directive.
    Directive(String),
    Language(String),
}

impl SettingsChange {
    fn apply(&self, settings: &Settings) -> Settings {
        match self {
            Self::Language(language) => settings.with_language(language.as_str()),
            Self::Directive(text) => {
                let mut settings = settings.clone();
                for pair in text.split_whitespace() {
                    match pair.split_once('=') {
                        Some(("language", value)) if !value.is_empty() => {
                            settings = settings.with_language(value);
                        }
                        Some((key, _)) if key != "language" => {
                            log::warn!("Ignoring unknown annotext directive key {key:?}");
                        }
                        _ => log::warn!("Ignoring malformed annotext directive setting {pair:?}"),
                    }
                }
                settings
            }
        }
    }
}

/// Position at which a new fragment starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Split {
    pub start: usize,
    pub change: SettingsChange,
}

/// Every match of `pattern`. The directive text is the first participating
/// capture group.
pub(crate) fn magic_comment_splits(code: &str, pattern: &Regex) -> Vec<Split> {
    pattern
        .captures_iter(code)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let text = caps.iter().skip(1).flatten().next()?.as_str();
            Some(Split {
                start,
                change: SettingsChange::Directive(text.to_string()),
            })
        })
        .collect()
}

/// Cuts `code` at each split. Each piece inherits the settings of the piece
/// before it with the split's change applied. Empty pieces are dropped, but
/// a document always yields at least one fragment.
pub(crate) fn split_at(
    code: &str,
    code_language_id: &str,
    settings: &Settings,
    mut splits: Vec<Split>,
) -> Vec<CodeFragment> {
    splits.sort_by_key(|split| split.start);

    let mut fragments = Vec::with_capacity(splits.len() + 1);
    let mut current_settings = settings.clone();
    let mut current_start = 0;

    for split in splits {
        if split.start > current_start {
            fragments.push(CodeFragment::new(
                code_language_id,
                &code[current_start..split.start],
                current_start,
                current_settings.clone(),
            ));
        }
        current_settings = split.change.apply(&current_settings);
        current_start = split.start;
    }

    if current_start < code.len() || fragments.is_empty() {
        fragments.push(CodeFragment::new(
            code_language_id,
            &code[current_start..],
            current_start,
            current_settings,
        ));
    }

    fragments
}

/// Fragmentizes `code[body]` of `parent` with the fragmentizer for
/// `code_language_id`, with offsets relative to the top-level document.
pub(crate) fn child_fragments(
    parent: &CodeFragment,
    body: Span,
    code_language_id: &str,
    settings: &Settings,
) -> Vec<CodeFragment> {
    if body.is_empty() {
        return Vec::new();
    }
    let offset = parent.from_pos + body.start;
    fragmentize(code_language_id, &parent.code[body.start..body.end], settings)
        .into_iter()
        .map(|fragment| fragment.shifted(offset))
        .collect()
}
