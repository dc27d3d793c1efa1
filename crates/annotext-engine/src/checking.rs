//! # Checking Pipeline
//!
//! Glue between a whole document and an external checker that only
//! understands plain text. [`AnnotatedDocument`] fragmentizes the document,
//! annotates every fragment and maps the checker's plain text ranges back to
//! source ranges and editor positions.

use annotext_config::Settings;
use thiserror::Error;

use crate::fragments::{CodeFragment, fragmentize};
use crate::parsing::create_builder;
use crate::position::{DocumentPositionIndex, Position};
use crate::text::{AnnotatedText, Span};

/// A finding reported by a checker, in plain text offsets of one fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleMatch {
    pub rule_id: String,
    pub sentence: String,
    pub from_pos: usize,
    pub to_pos: usize,
    pub message: String,
    pub suggested_replacements: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error("Checker failed: {0}")]
    Checker(String),
}

/// Grammar or style checker consuming annotated plain text.
pub trait TextChecker {
    fn check(&mut self, fragment: &AnnotatedTextFragment) -> Result<Vec<RuleMatch>, CheckError>;
}

/// A code fragment with its annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedTextFragment {
    pub fragment: CodeFragment,
    pub annotated_text: AnnotatedText,
}

impl AnnotatedTextFragment {
    pub fn plain_text(&self) -> &str {
        self.annotated_text.plain_text()
    }
}

/// A rule match located in the top-level document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMatch {
    pub fragment_index: usize,
    pub rule_match: RuleMatch,
    /// Byte range in the document.
    pub span: Span,
    pub start: Position,
    pub end: Position,
}

/// A document split into annotated fragments.
#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    fragments: Vec<AnnotatedTextFragment>,
    index: DocumentPositionIndex,
}

impl AnnotatedDocument {
    pub fn new(text: &str, code_language_id: &str, settings: &Settings) -> Self {
        let fragments = fragmentize(code_language_id, text, settings)
            .into_iter()
            .filter_map(|fragment| {
                let builder = create_builder(&fragment.code_language_id, &fragment.settings);
                match builder.annotate(&fragment.code) {
                    Ok(annotated_text) => {
                        log::debug!(
                            "Annotated {} fragment at {}: {} source bytes, {} plain bytes",
                            fragment.code_language_id,
                            fragment.from_pos,
                            fragment.code.len(),
                            annotated_text.plain_text().len()
                        );
                        Some(AnnotatedTextFragment {
                            fragment,
                            annotated_text,
                        })
                    }
                    Err(err) => {
                        log::warn!("Skipping fragment at {}: {err}", fragment.from_pos);
                        None
                    }
                }
            })
            .collect();

        Self {
            fragments,
            index: DocumentPositionIndex::new(text),
        }
    }

    pub fn fragments(&self) -> &[AnnotatedTextFragment] {
        &self.fragments
    }

    pub fn position_index(&self) -> &DocumentPositionIndex {
        &self.index
    }

    /// Index of the innermost fragment containing `offset`.
    pub fn fragment_at(&self, offset: usize) -> Option<usize> {
        self.fragments
            .iter()
            .position(|f| f.fragment.span().contains(offset))
    }

    /// Runs `checker` on every fragment. A failing fragment is logged and
    /// contributes no matches.
    pub fn check(&self, checker: &mut impl TextChecker) -> Vec<DocumentMatch> {
        let mut matches = Vec::new();
        for (fragment_index, fragment) in self.fragments.iter().enumerate() {
            match checker.check(fragment) {
                Ok(rule_matches) => matches.extend(
                    rule_matches
                        .iter()
                        .filter_map(|rule_match| self.resolve(fragment_index, rule_match)),
                ),
                Err(err) => log::warn!(
                    "Checking fragment at {} failed: {err}",
                    fragment.fragment.from_pos
                ),
            }
        }
        matches
    }

    /// Maps a fragment-relative rule match to document coordinates.
    pub fn resolve(&self, fragment_index: usize, rule_match: &RuleMatch) -> Option<DocumentMatch> {
        let Some(fragment) = self.fragments.get(fragment_index) else {
            log::warn!("Dropping match {:?} for unknown fragment {fragment_index}", rule_match.rule_id);
            return None;
        };

        let plain_len = fragment.plain_text().len();
        if rule_match.from_pos > rule_match.to_pos || rule_match.to_pos > plain_len {
            log::warn!(
                "Dropping match {:?} at {}..{} outside fragment plain text of length {plain_len}",
                rule_match.rule_id,
                rule_match.from_pos,
                rule_match.to_pos
            );
            return None;
        }

        let span = fragment
            .annotated_text
            .original_range_for(Span::new(rule_match.from_pos, rule_match.to_pos))
            .shifted(fragment.fragment.from_pos);

        Some(DocumentMatch {
            fragment_index,
            rule_match: rule_match.clone(),
            span,
            start: self.index.to_position(span.start),
            end: self.index.to_position(span.end),
        })
    }
}
