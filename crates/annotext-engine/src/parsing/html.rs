use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;

use super::{AnnotateError, CodeAnnotatedTextBuilder};
use crate::text::{AnnotatedText, AnnotatedTextBuilder};

static ENTITY_OR_LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z][A-Za-z0-9]*);| *\r?\n *")
        .expect("valid entity regex")
});

/// Elements whose text is never prose.
const IGNORED_ELEMENTS: &[&str] = &["script", "style"];

/// Elements without an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Plain text standing in for a start tag.
fn interpretation(element: &str) -> &'static str {
    match element {
        "body" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "table" | "tr" => {
            "\n\n"
        }
        "br" | "li" => "\n",
        _ => "",
    }
}

fn element_name(local_name: &[u8]) -> String {
    String::from_utf8_lossy(local_name).to_ascii_lowercase()
}

/// HTML and XHTML over the `quick-xml` event stream.
///
/// Tags, comments and declarations are markup; block-level start tags read
/// as paragraph or line breaks. Character references are decoded. Line
/// breaks inside text collapse to one space. Input the tokenizer rejects is
/// left as prose from the point of the error.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlAnnotatedTextBuilder;

impl CodeAnnotatedTextBuilder for HtmlAnnotatedTextBuilder {
    fn annotate(&self, code: &str) -> Result<AnnotatedText, AnnotateError> {
        let mut out = AnnotatedTextBuilder::new(code);
        let mut elements: Vec<String> = Vec::new();

        let mut reader = Reader::from_str(code);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;

        loop {
            let event = reader.read_event();
            let end = usize::try_from(reader.buffer_position())
                .map_or(code.len(), |end| end.min(code.len()));

            match event {
                Ok(Event::Eof) => break,
                Ok(Event::Start(start)) => {
                    let name = element_name(start.local_name().as_ref());
                    out.add_markup_as(end.saturating_sub(out.pos()), interpretation(&name));
                    if !VOID_ELEMENTS.contains(&name.as_str()) {
                        elements.push(name);
                    }
                }
                Ok(Event::Empty(empty)) => {
                    let name = element_name(empty.local_name().as_ref());
                    out.add_markup_as(end.saturating_sub(out.pos()), interpretation(&name));
                }
                Ok(Event::End(close)) => {
                    let name = element_name(close.local_name().as_ref());
                    if let Some(index) = elements.iter().rposition(|open| *open == name) {
                        elements.truncate(index);
                    }
                    out.add_markup_until(end);
                }
                Ok(
                    Event::Comment(_)
                    | Event::CData(_)
                    | Event::Decl(_)
                    | Event::PI(_)
                    | Event::DocType(_),
                ) => out.add_markup_until(end),
                Ok(_) => {
                    if elements.iter().any(|e| IGNORED_ELEMENTS.contains(&e.as_str())) {
                        out.add_markup_until(end);
                    } else {
                        add_text_until(&mut out, end);
                    }
                }
                Err(err) => {
                    log::debug!(
                        "HTML tokenizer stopped at offset {}: {err}",
                        reader.error_position()
                    );
                    break;
                }
            }
        }

        add_text_until(&mut out, code.len());
        Ok(out.build())
    }
}

/// Text up to `end`, with character references decoded and line breaks
/// collapsed. Breaks at either end of the run vanish.
fn add_text_until(out: &mut AnnotatedTextBuilder<'_>, end: usize) {
    let start = out.pos();
    if end <= start {
        return;
    }
    let text = &out.source()[start..end];
    let mut last = 0;

    for m in ENTITY_OR_LINE_BREAK.find_iter(text) {
        out.add_text(m.start() - last);
        let raw = m.as_str();
        if raw.starts_with('&') {
            let decoded = html_escape::decode_html_entities(raw);
            if decoded == raw {
                out.add_text(raw.len());
            } else {
                out.add_markup_as(raw.len(), decoded.into_owned());
            }
        } else if m.start() == 0 || m.end() == text.len() {
            out.add_markup(raw.len());
        } else {
            out.add_markup_as(raw.len(), " ");
        }
        last = m.end();
    }

    out.add_text(text.len() - last);
}
