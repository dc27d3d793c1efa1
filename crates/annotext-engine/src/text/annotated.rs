use std::fmt;

use super::span::Span;

/// Classification of a consumed source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// Checkable prose, emitted verbatim.
    Text,
    /// Structural syntax, emitted as nothing or as its `interpret_as` text.
    Markup,
}

/// One classified span of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    pub kind: PartKind,
    /// Source bytes consumed by this part; may be empty.
    pub span: Span,
    /// Substitution text for markup parts.
    pub interpret_as: Option<String>,
}

impl TextPart {
    /// The text this part contributes to the plain text.
    pub fn emitted<'s>(&'s self, source: &'s str) -> &'s str {
        match self.kind {
            PartKind::Text => &source[self.span.start..self.span.end],
            PartKind::Markup => self.interpret_as.as_deref().unwrap_or(""),
        }
    }
}

/// Source text together with its classified parts and the derived plain text.
///
/// Immutable after construction. Plain text offsets can be mapped back to the
/// source with [`AnnotatedText::original_offset_for`] and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedText {
    source: String,
    parts: Vec<TextPart>,
    plain_text: String,
    /// Plain text span of each part, parallel to `parts`.
    plain_spans: Vec<Span>,
}

impl AnnotatedText {
    /// Builds the plain text and the inverse mapping from ordered parts.
    pub fn from_parts(source: impl Into<String>, parts: Vec<TextPart>) -> Self {
        let source = source.into();
        let mut plain_text = String::new();
        let mut plain_spans = Vec::with_capacity(parts.len());

        for part in &parts {
            let start = plain_text.len();
            plain_text.push_str(part.emitted(&source));
            plain_spans.push(Span::new(start, plain_text.len()));
        }

        Self {
            source,
            parts,
            plain_text,
            plain_spans,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[TextPart] {
        &self.parts
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    /// Maps a plain text offset to the source offset it was produced from.
    ///
    /// Offsets inside a text part map exactly; offsets inside a substitution
    /// map to the start of the markup that produced it. The end of the plain
    /// text maps to the end of the source.
    pub fn original_offset_for(&self, plain_offset: usize) -> usize {
        if plain_offset >= self.plain_text.len() {
            return self.source.len();
        }

        let idx = self.part_index_at(plain_offset);
        let part = &self.parts[idx];
        match part.kind {
            PartKind::Text => part.span.start + (plain_offset - self.plain_spans[idx].start),
            PartKind::Markup => part.span.start,
        }
    }

    /// Maps an exclusive plain text end offset to an exclusive source end.
    ///
    /// Ending inside a substitution maps past the whole markup span.
    pub fn original_end_for(&self, plain_end: usize) -> usize {
        let plain_end = plain_end.min(self.plain_text.len());
        if plain_end == 0 {
            return self.original_offset_for(0);
        }

        let idx = self.part_index_at(plain_end - 1);
        let part = &self.parts[idx];
        match part.kind {
            PartKind::Text => part.span.start + (plain_end - self.plain_spans[idx].start),
            PartKind::Markup => part.span.end,
        }
    }

    /// Maps a plain text range to the source range it covers.
    pub fn original_range_for(&self, plain: Span) -> Span {
        let start = self.original_offset_for(plain.start);
        if plain.is_empty() {
            return Span::new(start, start);
        }
        Span::new(start, self.original_end_for(plain.end).max(start))
    }

    /// Index of the non-empty part whose plain span contains `plain_offset`.
    /// Requires `plain_offset < plain_text.len()`.
    fn part_index_at(&self, plain_offset: usize) -> usize {
        self.plain_spans
            .partition_point(|span| span.end <= plain_offset)
    }
}

impl fmt::Display for AnnotatedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            let consumed = &self.source[part.span.start..part.span.end];
            match (part.kind, &part.interpret_as) {
                (PartKind::Text, _) => writeln!(f, "text   {consumed:?}")?,
                (PartKind::Markup, None) => writeln!(f, "markup {consumed:?}")?,
                (PartKind::Markup, Some(as_text)) => {
                    writeln!(f, "markup {consumed:?} => {as_text:?}")?
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn part(kind: PartKind, start: usize, end: usize, interpret_as: Option<&str>) -> TextPart {
        TextPart {
            kind,
            span: Span::new(start, end),
            interpret_as: interpret_as.map(String::from),
        }
    }

    /// `Hi \textbf{you} $x$.` with the math replaced by a placeholder.
    fn sample() -> AnnotatedText {
        AnnotatedText::from_parts(
            r"Hi \textbf{you} $x$.",
            vec![
                part(PartKind::Text, 0, 3, None),
                part(PartKind::Markup, 3, 11, None),
                part(PartKind::Text, 11, 14, None),
                part(PartKind::Markup, 14, 15, None),
                part(PartKind::Text, 15, 16, None),
                part(PartKind::Markup, 16, 19, Some("Dummy0")),
                part(PartKind::Text, 19, 20, None),
            ],
        )
    }

    #[test]
    fn plain_text_is_concatenated_emission() {
        assert_eq!(sample().plain_text(), "Hi you Dummy0.");
    }

    #[test]
    fn text_offsets_map_exactly() {
        let text = sample();
        assert_eq!(text.original_offset_for(0), 0);
        assert_eq!(text.original_offset_for(3), 11);
        assert_eq!(text.original_offset_for(5), 13);
        assert_eq!(text.original_offset_for(13), 19);
    }

    #[test]
    fn substitution_maps_to_markup_start() {
        let text = sample();
        assert_eq!(text.original_offset_for(7), 16);
        assert_eq!(text.original_offset_for(12), 16);
    }

    #[test]
    fn end_of_plain_text_maps_to_end_of_source() {
        let text = sample();
        assert_eq!(text.original_offset_for(14), 20);
        assert_eq!(text.original_offset_for(100), 20);
    }

    #[test]
    fn range_ending_in_substitution_covers_whole_markup() {
        let text = sample();
        assert_eq!(text.original_range_for(Span::new(7, 13)), Span::new(16, 19));
        assert_eq!(text.original_range_for(Span::new(3, 6)), Span::new(11, 14));
        assert_eq!(text.original_range_for(Span::new(4, 4)), Span::new(12, 12));
    }

    #[test]
    fn mapping_is_monotonic() {
        let text = sample();
        let offsets: Vec<usize> = (0..=text.plain_text().len())
            .map(|p| text.original_offset_for(p))
            .collect();
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn empty_text_maps_everything_to_source_end() {
        let text = AnnotatedText::from_parts("%c", vec![part(PartKind::Markup, 0, 2, None)]);
        assert_eq!(text.plain_text(), "");
        assert_eq!(text.original_offset_for(0), 2);
        assert_eq!(text.original_end_for(0), 2);
    }

    #[test]
    fn display_lists_parts() {
        let text = AnnotatedText::from_parts(
            "a $b$",
            vec![
                part(PartKind::Text, 0, 2, None),
                part(PartKind::Markup, 2, 5, Some("Dummy0")),
            ],
        );
        insta::assert_snapshot!(text.to_string(), @r#"
        text   "a "
        markup "$b$" => "Dummy0"
        "#);
    }
}
