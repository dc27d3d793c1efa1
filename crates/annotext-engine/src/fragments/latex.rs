use std::collections::HashSet;
use std::sync::LazyLock;

use annotext_config::Settings;
use regex::Regex;

use super::babel::{environment_names, to_language_code};
use super::{
    CodeFragment, CodeFragmentizer, SettingsChange, Split, child_fragments,
    magic_comment_splits, split_at,
};
use crate::parsing::latex::defaults::babel_command_prototypes;
use crate::parsing::latex::signature::{ArgumentKind, match_argument};
use crate::parsing::latex::{CommandSignature, CommandSignatureMatcher, SignatureAction};
use crate::text::Span;

static MAGIC_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*%[ \t]*(?i:annotext):(.*?)$").expect("valid magic comment regex")
});
static SELECT_LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\selectlanguage\{([^}]*)\}").expect("valid selectlanguage regex")
});
static BEGIN_ENVIRONMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\begin\{([^}]+)\}").expect("valid begin regex"));
static BEGIN_OR_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(begin|end)\{([^}]+)\}").expect("valid begin/end regex")
});

const EXTRACTED_COMMANDS: &[&str] = &[
    r"\footnote{}",
    r"\footnote[]{}",
    r"\todo{}",
    r"\todo[]{}",
];

fn signatures<'p>(prototypes: impl IntoIterator<Item = &'p str>) -> Vec<CommandSignature> {
    prototypes
        .into_iter()
        .filter_map(|prototype| {
            CommandSignature::parse(prototype, SignatureAction::Default)
                .map_err(|err| log::warn!("{err}"))
                .ok()
        })
        .collect()
}

/// Inside the braces of an argument span.
fn inner(argument: Span) -> Span {
    Span::new(argument.start + 1, argument.end.saturating_sub(1).max(argument.start + 1))
}

/// A language or embedded-format environment with a closing `\end`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EnvironmentRegion {
    /// From `\begin` to the end of `\end{name}`.
    span: Span,
    body: Span,
    content: EnvironmentContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EnvironmentContent {
    Language(String),
    Markdown,
}

/// Fragmentizer for LaTeX and RSweave.
///
/// A document is first cut at `% annotext:` comments and `\selectlanguage`.
/// From each piece, babel inline commands, babel environments, embedded
/// Markdown and footnote-like commands are then extracted as children.
#[derive(Debug, Clone)]
pub struct LatexFragmentizer {
    code_language_id: String,
    babel_commands: CommandSignatureMatcher,
    language_environments: HashSet<String>,
}

impl LatexFragmentizer {
    pub fn new(code_language_id: &str) -> Self {
        let prototypes = babel_command_prototypes();

        Self {
            code_language_id: code_language_id.to_string(),
            babel_commands: CommandSignatureMatcher::new(signatures(
                prototypes.iter().map(String::as_str),
            )),
            language_environments: environment_names().into_iter().collect(),
        }
    }

    fn children(&self, piece: &CodeFragment) -> Vec<CodeFragment> {
        let code = piece.code.as_str();
        let mut extracted: Vec<Span> = Vec::new();
        let mut children = Vec::new();
        let is_extracted =
            |extracted: &[Span], offset: usize| extracted.iter().any(|s| s.contains(offset));

        for (signature, m) in self.babel_commands.find_all(code) {
            if is_extracted(&extracted, m.span.start) {
                continue;
            }
            let Some(&text) = m.arguments.last() else {
                continue;
            };
            let language = match signature.name().strip_prefix(r"\text") {
                Some(suffix) => suffix.to_string(),
                None => {
                    let argument = m.arguments[m.arguments.len() - 2];
                    let argument = inner(argument);
                    code[argument.start..argument.end].to_string()
                }
            };
            extracted.push(m.span);
            let settings = piece.settings.with_language(to_language_code(&language));
            children.extend(child_fragments(
                piece,
                inner(text),
                &self.code_language_id,
                &settings,
            ));
        }

        for region in self.environments(code) {
            if is_extracted(&extracted, region.span.start) {
                continue;
            }
            extracted.push(region.span);
            match region.content {
                EnvironmentContent::Language(language) => {
                    let settings = piece.settings.with_language(to_language_code(&language));
                    children.extend(child_fragments(
                        piece,
                        region.body,
                        &self.code_language_id,
                        &settings,
                    ));
                }
                EnvironmentContent::Markdown => {
                    children.extend(child_fragments(
                        piece,
                        region.body,
                        "markdown",
                        &piece.settings,
                    ));
                }
            }
        }

        let extracted_commands = CommandSignatureMatcher::new(signatures(
            EXTRACTED_COMMANDS.iter().copied(),
        ))
        .ignoring(piece.settings.ignored_command_prototypes());

        for (_, m) in extracted_commands.find_all(code) {
            if is_extracted(&extracted, m.span.start) {
                continue;
            }
            let Some(&text) = m.arguments.last() else {
                continue;
            };
            extracted.push(m.span);
            children.extend(child_fragments(
                piece,
                inner(text),
                &self.code_language_id,
                &piece.settings,
            ));
        }

        children
    }

    /// Language and Markdown environments in document order, including
    /// nested ones.
    fn environments(&self, code: &str) -> Vec<EnvironmentRegion> {
        let mut regions = Vec::new();

        for caps in BEGIN_ENVIRONMENT.captures_iter(code) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            let mut header_end = whole.end();

            let content = if name == "otherlanguage" || name == "otherlanguage*" {
                let Some(end) = match_argument(code, header_end, ArgumentKind::Brace) else {
                    continue;
                };
                let language = inner(Span::new(header_end, end));
                header_end = end;
                EnvironmentContent::Language(code[language.start..language.end].to_string())
            } else if name == "markdown" {
                EnvironmentContent::Markdown
            } else if self.language_environments.contains(name) {
                if let Some(end) = match_argument(code, header_end, ArgumentKind::Bracket) {
                    header_end = end;
                }
                EnvironmentContent::Language(name.to_string())
            } else {
                continue;
            };

            if let Some(end) = find_environment_end(code, name, whole.end()) {
                regions.push(EnvironmentRegion {
                    span: Span::new(whole.start(), end.end),
                    body: Span::new(header_end, end.start.max(header_end)),
                    content,
                });
            }
        }

        regions
    }
}

/// The `\end{name}` closing an environment opened before `from`, skipping
/// nested environments of the same name.
fn find_environment_end(code: &str, name: &str, from: usize) -> Option<Span> {
    let mut depth = 1usize;
    for caps in BEGIN_OR_END.captures_iter(&code[from..]) {
        if caps.get(2).map(|m| m.as_str()) != Some(name) {
            continue;
        }
        let whole = caps.get(0)?;
        if &caps[1] == "begin" {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(Span::new(from + whole.start(), from + whole.end()));
            }
        }
    }
    None
}

impl CodeFragmentizer for LatexFragmentizer {
    fn fragmentize(&self, code: &str, settings: &Settings) -> Vec<CodeFragment> {
        let mut splits = magic_comment_splits(code, &MAGIC_COMMENT);
        splits.extend(SELECT_LANGUAGE.captures_iter(code).filter_map(|caps| {
            Some(Split {
                start: caps.get(0)?.start(),
                change: SettingsChange::Language(to_language_code(caps.get(1)?.as_str())),
            })
        }));

        let mut fragments = Vec::new();
        for piece in split_at(code, &self.code_language_id, settings, splits) {
            fragments.extend(self.children(&piece));
            fragments.push(piece);
        }
        fragments
    }
}
