use super::annotated::{AnnotatedText, PartKind, TextPart};
use super::span::Span;

/// Accumulates parts over a source while tracking the scan position.
///
/// Every `add_*` call consumes the next `len` bytes of the source, so parts
/// are contiguous and strictly ordered by construction. Adjacent text parts
/// and adjacent plain markup parts are merged.
#[derive(Debug, Clone)]
pub struct AnnotatedTextBuilder<'a> {
    source: &'a str,
    pos: usize,
    parts: Vec<TextPart>,
}

impl<'a> AnnotatedTextBuilder<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            parts: Vec::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Current byte position in the source.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Unconsumed remainder of the source.
    pub fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Character at the current position.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Checks if the remaining input starts with `pat`.
    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    pub fn add_text(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let span = self.consume(len);
        if let Some(last) = self.parts.last_mut() {
            if last.kind == PartKind::Text && last.span.end == span.start {
                last.span.end = span.end;
                return;
            }
        }
        self.parts.push(TextPart {
            kind: PartKind::Text,
            span,
            interpret_as: None,
        });
    }

    pub fn add_markup(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let span = self.consume(len);
        if let Some(last) = self.parts.last_mut() {
            if last.kind == PartKind::Markup
                && last.interpret_as.is_none()
                && last.span.end == span.start
            {
                last.span.end = span.end;
                return;
            }
        }
        self.parts.push(TextPart {
            kind: PartKind::Markup,
            span,
            interpret_as: None,
        });
    }

    /// Consumes markup that reads as `interpret_as` in the plain text.
    ///
    /// An empty substitution degrades to plain markup. A non-empty one is
    /// kept even when `len` is zero.
    pub fn add_markup_as(&mut self, len: usize, interpret_as: impl Into<String>) {
        let interpret_as = interpret_as.into();
        if interpret_as.is_empty() {
            self.add_markup(len);
            return;
        }
        let span = self.consume(len);
        self.parts.push(TextPart {
            kind: PartKind::Markup,
            span,
            interpret_as: Some(interpret_as),
        });
    }

    /// Consumes everything up to `end` as markup.
    pub fn add_markup_until(&mut self, end: usize) {
        if end > self.pos {
            self.add_markup(end - self.pos);
        }
    }

    /// Splices in the parts of `inner`, which was built over the source
    /// starting at the current position.
    pub fn add_annotated(&mut self, inner: &AnnotatedText) {
        debug_assert!(
            self.rest().starts_with(inner.source()),
            "spliced text is not a slice of the source at {}",
            self.pos
        );
        for part in inner.parts() {
            let len = part.span.len();
            match (part.kind, &part.interpret_as) {
                (PartKind::Text, _) => self.add_text(len),
                (PartKind::Markup, Some(interpret_as)) => self.add_markup_as(len, interpret_as.as_str()),
                (PartKind::Markup, None) => self.add_markup(len),
            }
        }
    }

    /// Length in bytes of the character at the current position.
    pub fn next_char_len(&self) -> usize {
        self.peek().map_or(0, char::len_utf8)
    }

    /// Finishes the build, consuming any remainder as markup.
    pub fn build(mut self) -> AnnotatedText {
        let end = self.source.len();
        self.add_markup_until(end);
        AnnotatedText::from_parts(self.source, self.parts)
    }

    fn consume(&mut self, len: usize) -> Span {
        let end = (self.pos + len).min(self.source.len());
        debug_assert!(
            self.source.is_char_boundary(end),
            "part end {end} is not a char boundary"
        );
        let span = Span::new(self.pos, end);
        self.pos = end;
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_basics() {
        let mut b = AnnotatedTextBuilder::new("ab%c");
        assert_eq!(b.pos(), 0);
        assert_eq!(b.peek(), Some('a'));
        b.add_text(1);
        b.add_text(1);
        assert!(b.starts_with("%"));
        b.add_markup(2);
        assert!(b.eof());

        let text = b.build();
        assert_eq!(text.parts().len(), 2);
        assert_eq!(text.parts()[0].span, Span::new(0, 2));
        assert_eq!(text.plain_text(), "ab");
    }

    #[test]
    fn substitutions_are_not_merged() {
        let mut b = AnnotatedTextBuilder::new("~~");
        b.add_markup_as(1, "\u{a0}");
        b.add_markup_as(1, "\u{a0}");
        let text = b.build();
        assert_eq!(text.parts().len(), 2);
        assert_eq!(text.plain_text(), "\u{a0}\u{a0}");
    }

    #[test]
    fn empty_substitution_is_plain_markup() {
        let mut b = AnnotatedTextBuilder::new("{}");
        b.add_markup(1);
        b.add_markup_as(1, "");
        let text = b.build();
        assert_eq!(text.parts().len(), 1);
        assert_eq!(text.parts()[0].interpret_as, None);
    }

    #[test]
    fn spliced_parts_keep_absolute_offsets() {
        let mut inner = AnnotatedTextBuilder::new("*em* x");
        inner.add_markup(1);
        inner.add_text(2);
        inner.add_markup_as(1, "");
        inner.add_markup_as(1, " ");
        inner.add_text(1);
        let inner = inner.build();

        let mut b = AnnotatedTextBuilder::new("// *em* x");
        b.add_markup(3);
        b.add_annotated(&inner);
        let text = b.build();

        assert_eq!(text.plain_text(), "em x");
        assert_eq!(text.original_offset_for(0), 4);
        assert_eq!(text.original_offset_for(3), 8);
    }

    #[test]
    fn build_consumes_remainder() {
        let mut b = AnnotatedTextBuilder::new("héllo");
        b.add_text(1);
        assert_eq!(b.next_char_len(), 2);
        let text = b.build();
        assert_eq!(text.plain_text(), "h");
        assert_eq!(text.parts()[1].span, Span::new(1, 6));
    }
}
