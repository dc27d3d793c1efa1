use std::ops::Range;

use annotext_config::Settings;
use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag};

use super::{AnnotateError, CodeAnnotatedTextBuilder};
use crate::dummy::DummyGenerator;
use crate::text::{AnnotatedText, AnnotatedTextBuilder};

/// Markdown node types as named in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading,
    BlockQuote,
    FencedCodeBlock,
    IndentedCodeBlock,
    HtmlBlock,
    List,
    Item,
    FootnoteDefinition,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    AutoLink,
    Image,
    MetadataBlock,
    Text,
    Code,
    InlineMath,
    DisplayMath,
    Html,
    InlineHtml,
    FootnoteReference,
    SoftBreak,
    HardBreak,
    ThematicBreak,
    TaskListMarker,
    Other,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Document => "Document",
            Self::Paragraph => "Paragraph",
            Self::Heading => "Heading",
            Self::BlockQuote => "BlockQuote",
            Self::FencedCodeBlock => "FencedCodeBlock",
            Self::IndentedCodeBlock => "IndentedCodeBlock",
            Self::HtmlBlock => "HtmlBlock",
            Self::List => "List",
            Self::Item => "Item",
            Self::FootnoteDefinition => "FootnoteDefinition",
            Self::Table => "Table",
            Self::TableHead => "TableHead",
            Self::TableRow => "TableRow",
            Self::TableCell => "TableCell",
            Self::Emphasis => "Emphasis",
            Self::Strong => "Strong",
            Self::Strikethrough => "Strikethrough",
            Self::Link => "Link",
            Self::AutoLink => "AutoLink",
            Self::Image => "Image",
            Self::MetadataBlock => "MetadataBlock",
            Self::Text => "Text",
            Self::Code => "Code",
            Self::InlineMath => "InlineMath",
            Self::DisplayMath => "DisplayMath",
            Self::Html => "Html",
            Self::InlineHtml => "InlineHtml",
            Self::FootnoteReference => "FootnoteReference",
            Self::SoftBreak => "SoftBreak",
            Self::HardBreak => "HardBreak",
            Self::ThematicBreak => "ThematicBreak",
            Self::TaskListMarker => "TaskListMarker",
            Self::Other => "Other",
        }
    }

    /// Whether `names` lists this kind. `CodeBlock` stands for both code
    /// block kinds.
    pub fn is_listed_in(self, names: &[String]) -> bool {
        names.iter().any(|name| {
            name == self.name()
                || (name == "CodeBlock"
                    && matches!(self, Self::FencedCodeBlock | Self::IndentedCodeBlock))
        })
    }

    fn from_tag(tag: &Tag<'_>) -> Self {
        match tag {
            Tag::Paragraph => Self::Paragraph,
            Tag::Heading { .. } => Self::Heading,
            Tag::BlockQuote(_) => Self::BlockQuote,
            Tag::CodeBlock(CodeBlockKind::Fenced(_)) => Self::FencedCodeBlock,
            Tag::CodeBlock(CodeBlockKind::Indented) => Self::IndentedCodeBlock,
            Tag::HtmlBlock => Self::HtmlBlock,
            Tag::List(_) => Self::List,
            Tag::Item => Self::Item,
            Tag::FootnoteDefinition(_) => Self::FootnoteDefinition,
            Tag::Table(_) => Self::Table,
            Tag::TableHead => Self::TableHead,
            Tag::TableRow => Self::TableRow,
            Tag::TableCell => Self::TableCell,
            Tag::Emphasis => Self::Emphasis,
            Tag::Strong => Self::Strong,
            Tag::Strikethrough => Self::Strikethrough,
            Tag::Link {
                link_type: LinkType::Autolink | LinkType::Email,
                ..
            } => Self::AutoLink,
            Tag::Link { .. } => Self::Link,
            Tag::Image { .. } => Self::Image,
            Tag::MetadataBlock(_) => Self::MetadataBlock,
            _ => Self::Other,
        }
    }

    /// Kind of an event that has no children.
    fn from_leaf(event: &Event<'_>) -> Self {
        match event {
            Event::Text(_) => Self::Text,
            Event::Code(_) => Self::Code,
            Event::InlineMath(_) => Self::InlineMath,
            Event::DisplayMath(_) => Self::DisplayMath,
            Event::Html(_) => Self::Html,
            Event::InlineHtml(_) => Self::InlineHtml,
            Event::FootnoteReference(_) => Self::FootnoteReference,
            Event::SoftBreak => Self::SoftBreak,
            Event::HardBreak => Self::HardBreak,
            Event::Rule => Self::ThematicBreak,
            Event::TaskListMarker(_) => Self::TaskListMarker,
            _ => Self::Other,
        }
    }
}

pub(crate) fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    options.insert(Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS);
    options.insert(Options::ENABLE_MATH);
    options
}

/// Markdown builder over `pulldown-cmark` offset events.
#[derive(Debug, Clone)]
pub struct MarkdownAnnotatedTextBuilder {
    language: String,
    dummy_node_types: Vec<String>,
    ignore_node_types: Vec<String>,
}

impl MarkdownAnnotatedTextBuilder {
    pub fn new(settings: &Settings) -> Self {
        Self {
            language: settings.language.clone(),
            dummy_node_types: settings.markdown.dummy.clone(),
            ignore_node_types: settings.markdown.ignore.clone(),
        }
    }
}

impl CodeAnnotatedTextBuilder for MarkdownAnnotatedTextBuilder {
    fn annotate(&self, code: &str) -> Result<AnnotatedText, AnnotateError> {
        let mut walk = Walk::new(self, code);
        for (event, range) in Parser::new_ext(code, parser_options()).into_offset_iter() {
            walk.event(&event, range);
        }
        Ok(walk.finish())
    }
}

/// Per-call walk state.
struct Walk<'b, 'a> {
    config: &'b MarkdownAnnotatedTextBuilder,
    out: AnnotatedTextBuilder<'a>,
    dummy_counter: usize,
    /// Kinds of the open nodes, outermost first.
    ancestors: Vec<NodeKind>,
    /// While set, events are dropped until the ancestor stack shrinks back
    /// to this depth.
    skip_to_depth: Option<usize>,
    first_node: bool,
    in_front_matter: bool,
}

impl<'b, 'a> Walk<'b, 'a> {
    fn new(config: &'b MarkdownAnnotatedTextBuilder, code: &'a str) -> Self {
        Self {
            config,
            out: AnnotatedTextBuilder::new(code),
            dummy_counter: 0,
            ancestors: Vec::new(),
            skip_to_depth: None,
            first_node: true,
            in_front_matter: false,
        }
    }

    fn event(&mut self, event: &Event<'_>, range: Range<usize>) {
        if let Some(depth) = self.skip_to_depth {
            match event {
                Event::Start(_) => self.ancestors.push(NodeKind::Other),
                Event::End(_) => {
                    self.ancestors.pop();
                    if self.ancestors.len() == depth {
                        self.skip_to_depth = None;
                    }
                }
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) => self.visit(NodeKind::from_tag(tag), range, true, None),
            Event::End(_) => {
                self.ancestors.pop();
            }
            Event::Code(literal) | Event::InlineMath(literal) | Event::DisplayMath(literal) => {
                self.visit(NodeKind::from_leaf(event), range, false, Some(&**literal))
            }
            leaf => self.visit(NodeKind::from_leaf(leaf), range, false, None),
        }
    }

    /// `literal` is the content of a code or math leaf, which the parser
    /// reports without a text child.
    fn visit(
        &mut self,
        kind: NodeKind,
        range: Range<usize>,
        has_children: bool,
        literal: Option<&str>,
    ) {
        let mut skip_node = false;

        if kind == NodeKind::ThematicBreak {
            if self.first_node {
                self.in_front_matter = true;
                skip_node = true;
            } else if self.in_front_matter {
                self.in_front_matter = false;
                skip_node = true;
            }
        } else if self.in_front_matter || kind == NodeKind::MetadataBlock {
            skip_node = true;
        }

        self.first_node = false;

        if skip_node {
            self.add_markup(range.end);
            self.skip_children(has_children);
        } else if kind == NodeKind::Text {
            if self.is_ignored() {
                self.add_markup(range.end);
            } else {
                self.add_markup(range.start);
                self.add_text(range.end);
            }
        } else if kind.is_listed_in(&self.config.dummy_node_types) {
            self.add_markup(range.start);
            if range.end > self.out.pos() {
                let dummy = DummyGenerator::new().generate(
                    &self.config.language,
                    self.dummy_counter,
                    false,
                );
                self.dummy_counter += 1;
                self.out.add_markup_as(range.end - self.out.pos(), dummy);
            }
            self.skip_children(has_children);
        } else if let Some(literal) = literal {
            let source = &self.out.source()[range.clone()];
            match source.find(literal).filter(|_| !literal.is_empty()) {
                Some(offset) if !kind.is_listed_in(&self.config.ignore_node_types)
                    && !self.is_ignored() =>
                {
                    self.add_markup(range.start + offset);
                    self.add_text(range.start + offset + literal.len());
                }
                _ => self.add_markup(range.end),
            }
        } else {
            if kind == NodeKind::Paragraph {
                self.add_markup(range.start);
            }
            if has_children {
                self.ancestors.push(kind);
            }
        }
    }

    fn is_ignored(&self) -> bool {
        self.ancestors
            .iter()
            .any(|ancestor| ancestor.is_listed_in(&self.config.ignore_node_types))
    }

    fn skip_children(&mut self, has_children: bool) {
        if has_children {
            self.skip_to_depth = Some(self.ancestors.len());
            self.ancestors.push(NodeKind::Other);
        }
    }

    /// Emits markup up to `end`. Each line break in it reads as a space
    /// inside a paragraph and as a newline elsewhere.
    fn add_markup(&mut self, end: usize) {
        let end = end.min(self.out.source().len());
        let in_paragraph = self.ancestors.contains(&NodeKind::Paragraph);
        let line_break = if in_paragraph { " " } else { "\n" };

        while self.out.pos() < end {
            let rest = &self.out.rest()[..end - self.out.pos()];
            match rest.find(['\r', '\n']) {
                Some(offset) => {
                    self.out.add_markup(offset);
                    let len = if self.out.rest().starts_with("\r\n") && end - self.out.pos() >= 2 {
                        2
                    } else {
                        1
                    };
                    self.out.add_markup_as(len, line_break);
                }
                None => self.out.add_markup(rest.len()),
            }
        }
    }

    fn add_text(&mut self, end: usize) {
        if end > self.out.pos() {
            self.out.add_text(end - self.out.pos());
        }
    }

    fn finish(mut self) -> AnnotatedText {
        let end = self.out.source().len();
        self.add_markup(end);
        self.out.build()
    }
}
