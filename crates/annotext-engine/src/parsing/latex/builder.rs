use std::sync::LazyLock;

use annotext_config::Settings;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::defaults::{command_catalog, environment_catalog};
use super::signature::{
    ArgumentKind, COMMAND, CommandSignature, EnvironmentSignature, SignatureAction, SignatureCatalog,
    match_argument,
};
use crate::dummy::DummyGenerator;
use crate::parsing::{AnnotateError, CodeAnnotatedTextBuilder, ProgressGuard};
use crate::text::{AnnotatedText, AnnotatedTextBuilder};

static ARGUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{[^}]*?\}").expect("valid argument regex"));
static COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^%[^\r\n]*(?:(?:\r\n|\n|\r)[ \n\r\t]*)?").expect("valid comment regex")
});
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \n\r\t]+(?:%[^\r\n]*(?:(?:\r\n|\n|\r)[ \n\r\t]*)?)?")
        .expect("valid whitespace regex")
});
static LENGTH_IN_BRACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{-?[0-9]*(?:\.[0-9]+)?(?:pt|mm|cm|ex|em|bp|dd|pc|in)\}")
        .expect("valid length regex")
});
static LENGTH_IN_BRACKET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[-?[0-9]*(?:\.[0-9]+)?(?:pt|mm|cm|ex|em|bp|dd|pc|in)\]")
        .expect("valid length regex")
});
static ACCENT_SYMBOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\\[`'^~"=.])(?:([A-Za-z]|\\i|\\j)|\{([A-Za-z]|\\i|\\j)\})"#)
        .expect("valid accent regex")
});
static ACCENT_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\\[Hbcdkruv])(?: *([A-Za-z]|\\i|\\j)|\{([A-Za-z]|\\i|\\j)\})")
        .expect("valid accent regex")
});
static RSWEAVE_BEGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<<.*?>>=").expect("valid rsweave regex"));

const MATH_ENVIRONMENTS: &[&str] = &[
    "align",
    "align*",
    "alignat",
    "alignat*",
    "displaymath",
    "eqnarray",
    "eqnarray*",
    "equation",
    "equation*",
    "flalign",
    "flalign*",
    "gather",
    "gather*",
    "math",
    "multline",
    "multline*",
];

const SECTIONING_COMMANDS: &[&str] = &[
    r"\part",
    r"\chapter",
    r"\section",
    r"\subsection",
    r"\subsubsection",
    r"\paragraph",
    r"\subparagraph",
    r"\part*",
    r"\chapter*",
    r"\section*",
    r"\subsection*",
    r"\subsubsection*",
    r"\paragraph*",
    r"\subparagraph*",
];

const SPACING_COMMANDS: &[&str] = &[
    r"\ ", r"\,", r"\;", r"\\", r"\hfill", r"\hspace", r"\hspace*", r"\quad", r"\qquad",
    r"\newline",
];

/// Font selection commands in math that do not decide how the formula reads.
const MATH_FONT_COMMANDS: &[&str] = &[
    r"\mathbb",
    r"\mathbf",
    r"\mathcal",
    r"\mathfrak",
    r"\mathit",
    r"\mathnormal",
    r"\mathsf",
    r"\mathtt",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    ParagraphText,
    InlineText,
    Heading,
    InlineMath,
    DisplayMath,
    IgnoreEnvironment,
    Rsweave,
}

impl Mode {
    fn is_math(self) -> bool {
        matches!(self, Self::InlineMath | Self::DisplayMath)
    }

    fn is_text(self) -> bool {
        !self.is_math() && self != Self::IgnoreEnvironment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MathVowelState {
    Undecided,
    StartsWithVowel,
    StartsWithConsonant,
}

fn is_punctuation(ch: char) -> bool {
    matches!(ch, '.' | ',' | ':' | ';' | '\u{2026}')
}

/// Letters whose English name starts with a vowel sound ("an x", "an f").
fn is_vowel(ch: char) -> bool {
    matches!(
        ch.to_ascii_lowercase(),
        'a' | 'e' | 'f' | 'h' | 'i' | 'l' | 'm' | 'n' | 'o' | 'r' | 's' | 'x'
    )
}

fn contains_two_ends_of_line(text: &str) -> bool {
    text.contains("\n\n") || text.contains("\r\r") || text.contains("\r\n\r\n")
}

fn letter_command(command: &str) -> Option<char> {
    Some(match command {
        r"\AA" => '\u{c5}',
        r"\L" => '\u{141}',
        r"\O" => '\u{d8}',
        r"\SS" => '\u{1e9e}',
        r"\aa" => '\u{e5}',
        r"\i" => '\u{131}',
        r"\j" => '\u{237}',
        r"\l" => '\u{142}',
        r"\o" => '\u{f8}',
        r"\ss" => '\u{df}',
        _ => return None,
    })
}

fn text_shortcut(command: &str) -> Option<&'static str> {
    Some(match command {
        r"\dots" => "\u{2026}",
        r"\eg" => "e.g.",
        r"\egc" => "e.g.,",
        r"\euro" => "\u{20ac}",
        r"\ie" => "i.e.",
        r"\iec" => "i.e.,",
        _ => return None,
    })
}

/// Combines an accent command and its letter into one NFC character.
fn accent_to_unicode(accent_command: &str, letter: &str) -> String {
    let base = match letter {
        r"\i" => '\u{131}',
        r"\j" => '\u{237}',
        other => other.chars().next().unwrap_or(' '),
    };
    let mark = match accent_command.as_bytes().get(1) {
        Some(b'`') => Some('\u{300}'),
        Some(b'\'') => Some('\u{301}'),
        Some(b'^') => Some('\u{302}'),
        Some(b'~') => Some('\u{303}'),
        Some(b'"') => Some('\u{308}'),
        Some(b'=') => Some('\u{304}'),
        Some(b'.') => Some('\u{307}'),
        Some(b'H') => Some('\u{30b}'),
        Some(b'b') => Some('\u{331}'),
        Some(b'c') => Some('\u{327}'),
        Some(b'd') => Some('\u{323}'),
        Some(b'k') => Some('\u{328}'),
        Some(b'r') => Some('\u{30a}'),
        Some(b'u') => Some('\u{306}'),
        Some(b'v') => Some('\u{30c}'),
        _ => None,
    };
    std::iter::once(base).chain(mark).nfc().collect()
}

/// LaTeX builder. Also handles RSweave documents, where `<<...>>=` code
/// chunks up to `@` are skipped.
#[derive(Debug, Clone)]
pub struct LatexAnnotatedTextBuilder {
    language: String,
    rsweave: bool,
    strict: bool,
    commands: SignatureCatalog<CommandSignature>,
    environments: SignatureCatalog<EnvironmentSignature>,
}

impl LatexAnnotatedTextBuilder {
    pub fn new(settings: &Settings) -> Self {
        Self {
            language: settings.language.clone(),
            rsweave: false,
            strict: false,
            commands: command_catalog(settings),
            environments: environment_catalog(settings),
        }
    }

    pub fn rsweave(settings: &Settings) -> Self {
        Self {
            rsweave: true,
            ..Self::new(settings)
        }
    }

    /// In strict mode a stalled scan is an error instead of a warning.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl CodeAnnotatedTextBuilder for LatexAnnotatedTextBuilder {
    fn annotate(&self, code: &str) -> Result<AnnotatedText, AnnotateError> {
        Scan::new(self, code).run()
    }
}

/// Per-call scan state.
struct Scan<'b, 'a> {
    config: &'b LatexAnnotatedTextBuilder,
    code: &'a str,
    out: AnnotatedTextBuilder<'a>,
    guard: ProgressGuard,

    dummy_counter: usize,
    last_space: &'a str,
    last_punctuation: &'a str,
    dummy_last_space: &'a str,
    dummy_last_punctuation: &'a str,
    is_math_empty: bool,
    math_vowel_state: MathVowelState,
    preserve_dummy_last: bool,
    can_insert_space_before_dummy: bool,
    is_math_char_trivial: bool,
    ignore_environment_end: Option<String>,
    modes: Vec<Mode>,

    cur_char: char,
    cur_mode: Mode,
}

impl<'b, 'a> Scan<'b, 'a> {
    fn new(config: &'b LatexAnnotatedTextBuilder, code: &'a str) -> Self {
        Self {
            config,
            code,
            out: AnnotatedTextBuilder::new(code),
            guard: ProgressGuard::new("LaTeX", config.strict),
            dummy_counter: 0,
            last_space: "",
            last_punctuation: "",
            dummy_last_space: "",
            dummy_last_punctuation: "",
            is_math_empty: true,
            math_vowel_state: MathVowelState::Undecided,
            preserve_dummy_last: false,
            can_insert_space_before_dummy: false,
            is_math_char_trivial: false,
            ignore_environment_end: None,
            modes: vec![Mode::ParagraphText],
            cur_char: ' ',
            cur_mode: Mode::ParagraphText,
        }
    }

    fn run(mut self) -> Result<AnnotatedText, AnnotateError> {
        while let Some(ch) = self.out.peek() {
            let started_at = self.out.pos();
            self.cur_char = ch;
            self.cur_mode = self.top_mode();
            self.is_math_char_trivial = false;

            match self.cur_mode {
                Mode::IgnoreEnvironment => {
                    let Some(end) = self.ignore_environment_end.clone() else {
                        log::warn!("Ignored environment without an end marker, leaving it");
                        self.pop_mode();
                        continue;
                    };
                    if self.out.starts_with(&end) {
                        self.pop_mode();
                        self.add_markup(end.len());
                    } else {
                        self.add_markup(ch.len_utf8());
                    }
                }
                Mode::Rsweave => {
                    if ch == '@' {
                        self.pop_mode();
                    }
                    self.add_markup(ch.len_utf8());
                }
                _ => match ch {
                    '\\' => self.process_backslash(),
                    '{' => self.process_opening_brace(),
                    '}' => self.process_closing_brace(),
                    '$' => self.process_dollar(),
                    '%' => self.process_percentage(),
                    ' ' | '&' | '~' | '\n' | '\r' | '\t' => self.process_whitespace(),
                    '`' | '\'' | '"' => self.process_quotation_mark(),
                    _ => self.process_default_character(),
                },
            }

            if !self.is_math_char_trivial {
                self.can_insert_space_before_dummy = false;
                self.is_math_empty = false;
            }

            self.guard.check(&mut self.out, started_at)?;
        }

        Ok(self.out.build())
    }

    fn top_mode(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::ParagraphText)
    }

    fn pop_mode(&mut self) {
        self.modes.pop();
        if self.modes.is_empty() {
            self.modes.push(Mode::ParagraphText);
        }
    }

    fn rest(&self) -> &'a str {
        self.out.rest()
    }

    fn match_here(&self, regex: &Regex) -> &'a str {
        regex.find(self.rest()).map_or("", |m| m.as_str())
    }

    fn add_text(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let text = &self.rest()[..len];
        self.out.add_text(len);
        self.text_added(text);
    }

    fn add_markup(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.out.add_markup(len);

        if self.preserve_dummy_last {
            self.preserve_dummy_last = false;
        } else {
            self.dummy_last_space = "";
            self.dummy_last_punctuation = "";
        }
    }

    fn add_markup_as(&mut self, len: usize, interpret_as: &str) {
        if interpret_as.is_empty() {
            self.add_markup(len);
            return;
        }
        self.out.add_markup_as(len, interpret_as);
        self.preserve_dummy_last = false;
        self.text_added(interpret_as);
    }

    fn text_added(&mut self, text: &str) {
        let Some(last) = text.chars().next_back() else {
            return;
        };
        self.last_space = if matches!(last, ' ' | '\n' | '\r') { " " } else { "" };
        self.last_punctuation = if is_punctuation(last) { " " } else { "" };
    }

    fn enter_display_math(&mut self) {
        self.modes.push(Mode::DisplayMath);
        self.is_math_empty = true;
        self.math_vowel_state = MathVowelState::Undecided;
        self.can_insert_space_before_dummy = true;
    }

    fn enter_inline_math(&mut self) {
        self.modes.push(Mode::InlineMath);
        self.is_math_empty = true;
        self.math_vowel_state = MathVowelState::Undecided;
        self.can_insert_space_before_dummy = true;
        self.is_math_char_trivial = true;
    }

    fn generate_dummy(&mut self, generator: DummyGenerator) -> String {
        let starts_with_vowel = self.math_vowel_state == MathVowelState::StartsWithVowel;
        let language = self.config.language.as_str();

        let dummy = if self.cur_mode.is_text() {
            self.dummy_counter += 1;
            generator.generate(language, self.dummy_counter - 1, starts_with_vowel)
        } else if self.is_math_empty {
            if self.cur_mode == Mode::DisplayMath && self.last_space.is_empty() {
                " ".to_string()
            } else {
                String::new()
            }
        } else if self.cur_mode == Mode::DisplayMath {
            self.dummy_counter += 1;
            let leading = if self.last_space.is_empty() { " " } else { "" };
            let trailing = if self.top_mode() == Mode::InlineText {
                self.dummy_last_space
            } else {
                " "
            };
            format!(
                "{leading}{}{}{trailing}",
                generator.generate(language, self.dummy_counter - 1, false),
                self.dummy_last_punctuation
            )
        } else {
            self.dummy_counter += 1;
            format!(
                "{}{}{}",
                generator.generate(language, self.dummy_counter - 1, starts_with_vowel),
                self.dummy_last_punctuation,
                self.dummy_last_space
            )
        };

        self.dummy_last_space = "";
        self.dummy_last_punctuation = "";
        self.math_vowel_state = MathVowelState::Undecided;
        dummy
    }

    fn process_backslash(&mut self) {
        let command = self.match_here(&COMMAND);
        let in_math = self.cur_mode.is_math();

        if command.is_empty() {
            // A lone backslash at the end of the input.
            self.add_markup(1);
        } else if command == r"\begin" || command == r"\end" {
            self.process_environment_command(command);
        } else if matches!(command, r"\$" | r"\%" | r"\&") {
            self.add_markup_as(command.len(), &command[1..]);
        } else if command == r"\[" {
            self.enter_display_math();
            self.add_markup(command.len());
        } else if command == r"\(" {
            self.enter_inline_math();
            self.add_markup(command.len());
        } else if command == r"\]" || command == r"\)" {
            self.pop_mode();
            let dummy = self.generate_dummy(DummyGenerator::new());
            self.add_markup_as(command.len(), &dummy);
        } else if let Some(letter) = letter_command(command) {
            let interpret_as = if in_math { String::new() } else { letter.to_string() };
            self.add_markup_as(command.len(), &interpret_as);
        } else if matches!(
            command,
            r"\`" | r"\'" | r"\^" | r"\~" | "\\\"" | r"\=" | r"\."
        ) {
            self.process_accent(command, &ACCENT_SYMBOL, in_math);
        } else if matches!(
            command,
            r"\H" | r"\b" | r"\c" | r"\d" | r"\k" | r"\r" | r"\u" | r"\v"
        ) {
            self.process_accent(command, &ACCENT_LETTER, in_math);
        } else if command == r"\-" {
            self.add_markup(command.len());
        } else if SPACING_COMMANDS.contains(&command) {
            self.process_spacing_command(command, in_math);
        } else if let Some(shortcut) = text_shortcut(command) {
            let interpret_as = if in_math { "" } else { shortcut };
            self.add_markup_as(command.len(), interpret_as);
        } else if command == r"\notag" || command == r"\qed" {
            self.preserve_dummy_last = true;
            self.add_markup(command.len());
        } else if SECTIONING_COMMANDS.contains(&command) && self.opens_heading(command) {
            self.add_markup(command.len());
            let pos = self.out.pos();
            if let Some(end) = match_argument(self.code, pos, ArgumentKind::Bracket) {
                self.add_markup(end - pos);
            }
            self.modes.push(Mode::Heading);
            self.add_markup(1);
        } else if (command == r"\text" || command == r"\intertext")
            && self.rest()[command.len()..].starts_with('{')
        {
            self.modes.push(Mode::InlineText);
            let interpret_as = if in_math {
                self.generate_dummy(DummyGenerator::new())
            } else {
                String::new()
            };
            self.add_markup_as(command.len() + 1, &interpret_as);
        } else if command == r"\verb" || command == r"\verb*" {
            let len = self.verb_length(command.len());
            let dummy = self.generate_dummy(DummyGenerator::new());
            self.add_markup_as(len, &dummy);
        } else {
            self.process_generic_command(command, in_math);
        }
    }

    /// Whether a sectioning command is followed by an optional `[...]` and
    /// then `{`.
    fn opens_heading(&self, command: &str) -> bool {
        let mut pos = self.out.pos() + command.len();
        if let Some(end) = match_argument(self.code, pos, ArgumentKind::Bracket) {
            pos = end;
        }
        self.code[pos..].starts_with('{')
    }

    /// Length of `\verb<d>...<d>` on one line, or of the bare command when the
    /// closing delimiter is missing.
    fn verb_length(&self, command_len: usize) -> usize {
        let after = &self.rest()[command_len..];
        let Some(delimiter) = after.chars().next().filter(|&c| c != '\n' && c != '\r') else {
            return command_len;
        };
        let body = &after[delimiter.len_utf8()..];
        let line = body.split(['\n', '\r']).next().unwrap_or("");
        match line.find(delimiter) {
            Some(end) => command_len + delimiter.len_utf8() + end + delimiter.len_utf8(),
            None => command_len,
        }
    }

    fn process_environment_command(&mut self, command: &'a str) {
        self.preserve_dummy_last = true;

        let argument_start = self.out.pos() + command.len();
        let argument = ARGUMENT
            .find(&self.code[argument_start..])
            .map_or("", |m| m.as_str());
        let environment_name = if argument.len() >= 2 {
            &argument[1..argument.len() - 1]
        } else {
            ""
        };
        let is_begin = command == r"\begin";
        let mut arguments_processed = false;
        let mut interpret_as = String::new();

        if MATH_ENVIRONMENTS.contains(&environment_name) {
            self.add_markup(command.len());

            if is_begin {
                if environment_name == "math" {
                    self.enter_inline_math();
                } else {
                    self.enter_display_math();
                }
            } else {
                self.pop_mode();
                interpret_as = self.generate_dummy(DummyGenerator::new());
            }
        } else if is_begin {
            let key = format!("{command}{argument}");
            let found = self
                .config
                .environments
                .best_match(&key, self.code, self.out.pos())
                .map(|(signature, m)| {
                    (
                        signature.action(),
                        signature.ignores_all_arguments(),
                        m.span.len(),
                    )
                });

            match found {
                Some((action, ignores_all_arguments, match_len)) => {
                    if action == SignatureAction::Ignore {
                        self.modes.push(Mode::IgnoreEnvironment);
                        self.ignore_environment_end = Some(format!(r"\end{{{environment_name}}}"));
                    }

                    if ignores_all_arguments {
                        self.add_markup(command.len());
                    } else {
                        self.add_markup(match_len);
                        arguments_processed = true;
                    }
                }
                None => {
                    self.add_markup(command.len());
                    self.modes.push(self.cur_mode);
                }
            }
        } else {
            self.add_markup(command.len());
            self.pop_mode();
        }

        if self.top_mode() != Mode::IgnoreEnvironment {
            self.is_math_char_trivial = true;
            self.preserve_dummy_last = true;

            if !arguments_processed {
                self.add_markup_as(argument.len(), &interpret_as);
                if is_begin {
                    self.process_environment_arguments();
                }
            }
        }
    }

    fn process_environment_arguments(&mut self) {
        loop {
            let pos = self.out.pos();
            let end = [
                ArgumentKind::Brace,
                ArgumentKind::Bracket,
                ArgumentKind::Parenthesis,
            ]
            .into_iter()
            .find_map(|kind| match_argument(self.code, pos, kind));

            match end {
                Some(end) => self.add_markup(end - pos),
                None => break,
            }
        }
    }

    fn process_accent(&mut self, command: &str, regex: &Regex, in_math: bool) {
        let caps = if in_math {
            None
        } else {
            regex.captures(self.rest())
        };

        match caps {
            Some(caps) => {
                let accent = caps.get(1).map_or("", |m| m.as_str());
                let letter = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
                let interpret_as = accent_to_unicode(accent, letter);
                let len = caps.get(0).map_or(command.len(), |m| m.len());
                self.add_markup_as(len, &interpret_as);
            }
            None => self.add_markup(command.len()),
        }
    }

    fn process_spacing_command(&mut self, command: &str, in_math: bool) {
        let mut len = command.len();
        if command == r"\hspace" || command == r"\hspace*" {
            len += ARGUMENT
                .find(&self.rest()[len..])
                .map_or(0, |m| m.len());
        }

        if in_math && self.last_space.is_empty() && self.can_insert_space_before_dummy {
            self.add_markup_as(len, " ");
        } else {
            self.preserve_dummy_last = true;

            if in_math {
                self.add_markup(len);
                self.dummy_last_space = " ";
            } else {
                let space = if !self.last_space.is_empty() {
                    ""
                } else if command == r"\," {
                    "\u{202f}"
                } else {
                    " "
                };
                self.add_markup_as(len, space);
            }
        }
    }

    fn process_generic_command(&mut self, command: &str, in_math: bool) {
        let found = self
            .config
            .commands
            .best_match(command, self.code, self.out.pos())
            .map(|(signature, m)| (signature.action(), signature.dummy_generator(), m.span.len()));

        match found {
            Some((SignatureAction::Ignore, _, len)) => self.add_markup(len),
            Some((SignatureAction::Dummy, generator, len)) => {
                let dummy = self.generate_dummy(generator);
                self.add_markup_as(len, &dummy);
            }
            _ => {
                if in_math && self.math_vowel_state == MathVowelState::Undecided {
                    if MATH_FONT_COMMANDS.contains(&command) {
                        // the font command's argument decides
                    } else if command == r"\ell" {
                        self.math_vowel_state = MathVowelState::StartsWithVowel;
                    } else {
                        self.math_vowel_state = MathVowelState::StartsWithConsonant;
                    }
                }
                self.add_markup(command.len());
            }
        }
    }

    fn process_opening_brace(&mut self) {
        let length = self.match_here(&LENGTH_IN_BRACE);

        if !length.is_empty() {
            self.add_markup(length.len());
        } else {
            self.modes.push(self.cur_mode);
            self.add_markup(1);
        }
    }

    fn process_closing_brace(&mut self) {
        let interpret_as = if self.cur_mode == Mode::Heading && self.last_punctuation.is_empty() {
            "."
        } else if self.cur_mode.is_text() && self.rest()[1..].starts_with('{') {
            " "
        } else {
            ""
        };

        self.pop_mode();
        self.add_markup_as(1, interpret_as);
        self.can_insert_space_before_dummy = true;

        if self.cur_mode.is_text() && self.top_mode().is_math() {
            self.is_math_empty = true;
        }

        self.is_math_char_trivial = true;
    }

    fn process_dollar(&mut self) {
        if self.out.starts_with("$$") {
            if self.cur_mode == Mode::DisplayMath {
                self.pop_mode();
                let dummy = self.generate_dummy(DummyGenerator::new());
                self.add_markup_as(2, &dummy);
            } else {
                self.enter_display_math();
                self.add_markup(2);
            }
        } else if self.cur_mode == Mode::InlineMath {
            self.pop_mode();
            let dummy = self.generate_dummy(DummyGenerator::new());
            self.add_markup_as(1, &dummy);
        } else {
            self.enter_inline_math();
            self.add_markup(1);
        }
    }

    fn process_percentage(&mut self) {
        let comment = self.match_here(&COMMENT);
        self.preserve_dummy_last = true;
        self.is_math_char_trivial = true;
        let interpret_as = if contains_two_ends_of_line(comment) {
            "\n\n"
        } else {
            ""
        };
        self.add_markup_as(comment.len(), interpret_as);
    }

    fn process_whitespace(&mut self) {
        let is_single = matches!(self.cur_char, '~' | '&');
        let whitespace = if is_single {
            &self.rest()[..1]
        } else {
            self.match_here(&WHITESPACE)
        };
        self.preserve_dummy_last = true;
        self.is_math_char_trivial = true;

        if self.cur_mode.is_text() {
            let interpret_as = if contains_two_ends_of_line(whitespace) {
                "\n\n"
            } else if !self.last_space.is_empty() {
                ""
            } else if self.cur_char == '~' {
                "\u{a0}"
            } else {
                " "
            };
            self.add_markup_as(whitespace.len(), interpret_as);
        } else {
            self.add_markup(whitespace.len());
        }

        if is_single {
            self.dummy_last_space = " ";
        }
    }

    fn process_quotation_mark(&mut self) {
        if !self.cur_mode.is_text() {
            self.add_markup(1);
            return;
        }

        let rest = self.rest();
        let smart_quote = if rest.starts_with("``") || rest.starts_with("\"'") {
            Some("\u{201c}")
        } else if rest.starts_with("''") {
            Some("\u{201d}")
        } else if rest.starts_with("\"`") {
            Some("\u{201e}")
        } else if rest.starts_with("\"-") || rest.starts_with("\"\"") || rest.starts_with("\"|") {
            Some("")
        } else if rest.starts_with("\"=") || rest.starts_with("\"~") {
            Some("-")
        } else {
            None
        };

        match smart_quote {
            Some(quote) => self.add_markup_as(2, quote),
            None => self.add_text(1),
        }
    }

    fn process_default_character(&mut self) {
        let ch = self.cur_char;

        if ch == '-' && self.cur_mode.is_text() {
            if self.out.starts_with("---") {
                self.add_markup_as(3, "\u{2014}");
                return;
            } else if self.out.starts_with("--") {
                self.add_markup_as(2, "\u{2013}");
                return;
            }
        } else if ch == '[' {
            let length = self.match_here(&LENGTH_IN_BRACKET);
            if !length.is_empty() {
                self.is_math_char_trivial = true;
                self.preserve_dummy_last = true;
                self.add_markup(length.len());
                return;
            }
        } else if ch == '<' && self.config.rsweave {
            let chunk_start = self.match_here(&RSWEAVE_BEGIN);
            if !chunk_start.is_empty() {
                self.modes.push(Mode::Rsweave);
                self.add_markup(chunk_start.len());
                return;
            }
        }

        let len = ch.len_utf8();
        if self.cur_mode.is_text() {
            let punctuation = &self.rest()[..len];
            self.add_text(len);
            if is_punctuation(ch) {
                self.last_punctuation = punctuation;
            }
        } else {
            let punctuation = &self.rest()[..len];
            self.add_markup(len);
            if is_punctuation(ch) {
                self.dummy_last_punctuation = punctuation;
            }

            if self.math_vowel_state == MathVowelState::Undecided {
                self.math_vowel_state = if is_vowel(ch) {
                    MathVowelState::StartsWithVowel
                } else {
                    MathVowelState::StartsWithConsonant
                };
            }
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
        let text = LatexAnnotatedTextBuilder::new(&Settings::default())
            .strict(true)
            .annotate(code)
            .unwrap();
        invariants::check(code, &text);
        text.plain_text().to_string()
    }

    #[rstest]
    #[case(r"This equals $b^{c}$.", "This equals Dummy0.")]
    #[case(r"This equals $a^{b}$.", "This equals Ina0.")]
    #[case(r"Let $\ell$ be given.", "Let Ina0 be given.")]
    #[case(r"Let $\mathbb{R}$ be given.", "Let Ina0 be given.")]
    #[case(r"Let $\alpha$ be given.", "Let Dummy0 be given.")]
    #[case(r"A \textbf{bold} word.", "A bold word.")]
    #[case(r"See \cite{knuth} and \ref{fig}.", "See Dummy0 and Dummy1.")]
    #[case(r"See \cite[p.~4]{knuth}.", "See Dummy0.")]
    #[case(r"Text\label{sec:x} more.", "Text more.")]
    fn commands_and_inline_math(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(plain(code), expected);
    }

    #[rstest]
    #[case(r#"\"a"#, "\u{e4}")]
    #[case(r"\'{e}", "\u{e9}")]
    #[case(r"\c c", "\u{e7}")]
    #[case(r"\v{s}", "\u{161}")]
    #[case(r"\^\i", "\u{131}\u{302}")]
    #[case(r"\ss", "\u{df}")]
    #[case(r"\AA", "\u{c5}")]
    fn accents_and_special_letters(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(plain(code), expected);
    }

    #[rstest]
    #[case("``Hi''", "\u{201c}Hi\u{201d}")]
    #[case("\"`Hallo\"'", "\u{201e}Hallo\u{201c}")]
    #[case("pages 3--4", "pages 3\u{2013}4")]
    #[case("wait---what", "wait\u{2014}what")]
    #[case("Dr.~Who", "Dr.\u{a0}Who")]
    #[case(r"a\,b", "a\u{202f}b")]
    #[case(r"costs 5\euro{} \dots", "costs 5\u{20ac} \u{2026}")]
    #[case(r"\eg this, \ie that", "e.g. this, i.e. that")]
    #[case(r"50\% of \$3", "50% of $3")]
    fn text_substitutions(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(plain(code), expected);
    }

    #[test]
    fn comments_and_paragraph_breaks() {
        assert_eq!(plain("One % comment\ntwo"), "One two");
        assert_eq!(plain("One\n\nTwo"), "One\n\nTwo");
        assert_eq!(plain("One%\n\nTwo"), "One\n\nTwo");
    }

    #[test]
    fn headings_end_with_a_period() {
        assert_eq!(plain("\\section{Intro}\nText"), "Intro. Text");
        assert_eq!(plain("\\section[Short]{Intro}\nText"), "Intro. Text");
    }

    #[test]
    fn display_math_in_sentence_becomes_one_dummy() {
        let code = "We have\n\\begin{equation}\n  a = b.\n\\end{equation}\nThus";
        assert_eq!(plain(code), "We have Dummy0. Thus");
    }

    #[test]
    fn display_dollars_keep_trailing_punctuation() {
        assert_eq!(plain("We have $$x,$$ and"), "We have Dummy0, and");
    }

    #[test]
    fn text_inside_math_is_checked() {
        assert_eq!(
            plain(r"Let $x \text{ for all } y$."),
            "Let Ina0 for all Dummy1."
        );
    }

    #[test]
    fn ignored_environment_is_skipped() {
        let code = "A\n\\begin{tikzpicture}\n\\draw (0,0);\n\\end{tikzpicture}\nB";
        assert_eq!(plain(code), "A B");
    }

    #[test]
    fn unterminated_ignored_environment_runs_to_end() {
        assert_eq!(plain("A \\begin{verbatim}\nraw $ text"), "A ");
    }

    #[test]
    fn unknown_environment_arguments_are_markup() {
        let code = "\\begin{itemize}[label=x]\n\\item One\n\\end{itemize}";
        assert_eq!(plain(code), " One ");
    }

    #[test]
    fn verb_is_one_dummy() {
        assert_eq!(plain(r"Use \verb|x_1| here."), "Use Dummy0 here.");
        assert_eq!(plain(r"Use \verb"), "Use Dummy0");
    }

    #[test]
    fn settings_add_commands() {
        let mut settings = Settings::default();
        settings
            .latex
            .commands
            .insert(r"\mycmd{}".to_string(), annotext_config::CommandAction::PluralDummy);
        settings
            .latex
            .commands
            .insert(r"\cite{}".to_string(), annotext_config::CommandAction::Ignore);
        let builder = LatexAnnotatedTextBuilder::new(&settings).strict(true);

        let text = builder.annotate(r"The \mycmd{a} and \cite{b}.").unwrap();
        assert_eq!(text.plain_text(), "The Dummies0 and .");
    }

    #[test]
    fn french_dummies() {
        let settings = Settings::default().with_language("fr");
        let builder = LatexAnnotatedTextBuilder::new(&settings);
        let text = builder.annotate(r"Voir $x$.").unwrap();
        assert_eq!(text.plain_text(), "Voir Jimmy-0.");
    }

    #[test]
    fn rsweave_chunks_are_skipped() {
        let builder = LatexAnnotatedTextBuilder::rsweave(&Settings::default()).strict(true);
        let code = "Before\n<<chunk, echo=FALSE>>=\nx <- 1\n@\nAfter";
        let text = builder.annotate(code).unwrap();
        assert_eq!(text.plain_text(), "Before After");

        let plain_latex = LatexAnnotatedTextBuilder::new(&Settings::default());
        assert!(plain_latex
            .annotate(code)
            .unwrap()
            .plain_text()
            .contains("<<chunk"));
    }

    #[test]
    fn annotate_twice_gives_same_result() {
        let builder = LatexAnnotatedTextBuilder::new(&Settings::default());
        let code = r"A $x$ and \cite{y}.";
        assert_eq!(builder.annotate(code), builder.annotate(code));
    }

    #[test]
    fn inverse_mapping_points_into_source() {
        let builder = LatexAnnotatedTextBuilder::new(&Settings::default());
        let code = r"Hi \textbf{you} $x$.";
        let text = builder.annotate(code).unwrap();
        assert_eq!(text.plain_text(), "Hi you Dummy0.");
        assert_eq!(text.original_offset_for(3), 11);
        assert_eq!(text.original_offset_for(7), 18);
        assert_eq!(text.original_offset_for(13), 19);
    }
}
