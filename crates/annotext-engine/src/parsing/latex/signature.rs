//! Command and environment prototypes with balanced argument matching.
//!
//! A prototype such as `\cite[]{}` declares a literal command name followed by
//! the kinds of its arguments. Matching consumes the name and then one
//! balanced argument per declared kind, optionally preceded by a line comment.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::dummy::DummyGenerator;
use crate::text::Span;

static PROTOTYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\\.+?)((?:\{\}|\[\]|\(\))*)$").expect("valid prototype regex")
});
/// A command name: backslash plus one non-letter or a run of letters, with
/// an optional star.
pub(crate) static COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\\(?:[^A-Za-z@]|[A-Za-z@]+)\*?").expect("valid command regex")
});
static ARGUMENT_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%[^\n]*(?:\n[ \n\r\t]*)?").expect("valid comment regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid command prototype: {0:?}")]
    InvalidPrototype(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Brace,
    Bracket,
    Parenthesis,
}

impl ArgumentKind {
    fn open(self) -> u8 {
        match self {
            Self::Brace => b'{',
            Self::Bracket => b'[',
            Self::Parenthesis => b'(',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAction {
    Default,
    Ignore,
    Dummy,
}

/// Result of matching a signature at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatch {
    /// From the backslash to the end of the last argument.
    pub span: Span,
    /// Each argument including its delimiters.
    pub arguments: Vec<Span>,
}

/// Matches one balanced argument of `kind` starting exactly at `from`.
///
/// Returns the exclusive end offset. A backslash always skips the following
/// character. A closing bracket that does not match the innermost open one
/// aborts the match. Nested parentheses are not counted: the first `)` seen
/// while no brace or bracket is open ends a parenthesis argument.
pub fn match_argument(code: &str, from: usize, kind: ArgumentKind) -> Option<usize> {
    let bytes = code.as_bytes();
    if bytes.get(from) != Some(&kind.open()) {
        return None;
    }

    let mut stack = vec![kind];
    let mut pos = from + 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => {
                if pos + 1 < bytes.len() {
                    pos += 1;
                }
            }
            b'{' => stack.push(ArgumentKind::Brace),
            b'[' => stack.push(ArgumentKind::Bracket),
            b'}' => {
                if stack.last() != Some(&ArgumentKind::Brace) {
                    return None;
                } else if stack.len() == 1 {
                    return Some(pos + 1);
                }
                stack.pop();
            }
            b']' => {
                if stack.last() != Some(&ArgumentKind::Bracket) {
                    return None;
                } else if stack.len() == 1 {
                    return Some(pos + 1);
                }
                stack.pop();
            }
            b')' => {
                if stack.len() == 1 && stack[0] == ArgumentKind::Parenthesis {
                    return Some(pos + 1);
                }
            }
            _ => {}
        }
        pos += 1;
    }

    None
}

/// A parsed command prototype together with what to do on a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSignature {
    prototype: String,
    name: String,
    arguments: Vec<ArgumentKind>,
    action: SignatureAction,
    dummy_generator: DummyGenerator,
}

impl CommandSignature {
    pub fn parse(prototype: &str, action: SignatureAction) -> Result<Self, SignatureError> {
        Self::with_generator(prototype, action, DummyGenerator::new())
    }

    pub fn with_generator(
        prototype: &str,
        action: SignatureAction,
        dummy_generator: DummyGenerator,
    ) -> Result<Self, SignatureError> {
        let caps = PROTOTYPE
            .captures(prototype)
            .ok_or_else(|| SignatureError::InvalidPrototype(prototype.to_string()))?;
        let arguments = caps[2]
            .as_bytes()
            .chunks(2)
            .map(|pair| match pair[0] {
                b'[' => ArgumentKind::Bracket,
                b'(' => ArgumentKind::Parenthesis,
                _ => ArgumentKind::Brace,
            })
            .collect();

        Ok(Self {
            prototype: prototype.to_string(),
            name: caps[1].to_string(),
            arguments,
            action,
            dummy_generator,
        })
    }

    pub fn prototype(&self) -> &str {
        &self.prototype
    }

    /// Literal command name including the backslash, e.g. `\cite`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[ArgumentKind] {
        &self.arguments
    }

    pub fn action(&self) -> SignatureAction {
        self.action
    }

    pub fn dummy_generator(&self) -> DummyGenerator {
        self.dummy_generator
    }

    /// Matches the whole signature at `from`. Never returns a partial match.
    pub fn match_at(&self, code: &str, from: usize) -> Option<SignatureMatch> {
        if !code[from..].starts_with(self.name.as_str()) {
            return None;
        }
        let mut pos = from + self.name.len();
        let mut arguments = Vec::with_capacity(self.arguments.len());

        for &kind in &self.arguments {
            if let Some(comment) = ARGUMENT_COMMENT.find(&code[pos..]) {
                pos += comment.end();
            }
            let end = match_argument(code, pos, kind)?;
            arguments.push(Span::new(pos, end));
            pos = end;
        }

        Some(SignatureMatch {
            span: Span::new(from, pos),
            arguments,
        })
    }
}

/// An environment prototype, given either as a bare name or as
/// `\begin{name}` followed by argument kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentSignature {
    signature: CommandSignature,
    environment: String,
    ignores_all_arguments: bool,
}

impl EnvironmentSignature {
    pub fn parse(prototype: &str, action: SignatureAction) -> Result<Self, SignatureError> {
        if let Some(rest) = prototype.strip_prefix(r"\begin{") {
            let environment = rest
                .split_once('}')
                .map(|(name, _)| name.to_string())
                .ok_or_else(|| SignatureError::InvalidPrototype(prototype.to_string()))?;
            Ok(Self {
                signature: CommandSignature::parse(prototype, action)?,
                environment,
                ignores_all_arguments: false,
            })
        } else {
            let full = format!(r"\begin{{{prototype}}}");
            Ok(Self {
                signature: CommandSignature::parse(&full, action)?,
                environment: prototype.to_string(),
                ignores_all_arguments: true,
            })
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// True when declared as a bare name: arguments are left to the caller.
    pub fn ignores_all_arguments(&self) -> bool {
        self.ignores_all_arguments
    }

    pub fn action(&self) -> SignatureAction {
        self.signature.action()
    }

    pub fn signature(&self) -> &CommandSignature {
        &self.signature
    }

    pub fn match_at(&self, code: &str, from: usize) -> Option<SignatureMatch> {
        self.signature.match_at(code, from)
    }
}

/// Signatures indexed by literal name. Inserting a prototype that is
/// already present replaces the earlier entry in place.
#[derive(Debug, Clone, Default)]
pub struct SignatureCatalog<S> {
    by_name: HashMap<String, Vec<S>>,
}

pub trait Named {
    fn key(&self) -> &str;
    fn prototype(&self) -> &str;
    fn match_at(&self, code: &str, from: usize) -> Option<SignatureMatch>;
}

impl Named for CommandSignature {
    fn key(&self) -> &str {
        self.name()
    }
    fn prototype(&self) -> &str {
        CommandSignature::prototype(self)
    }
    fn match_at(&self, code: &str, from: usize) -> Option<SignatureMatch> {
        CommandSignature::match_at(self, code, from)
    }
}

impl Named for EnvironmentSignature {
    fn key(&self) -> &str {
        self.signature.name()
    }
    fn prototype(&self) -> &str {
        self.signature.prototype()
    }
    fn match_at(&self, code: &str, from: usize) -> Option<SignatureMatch> {
        self.signature.match_at(code, from)
    }
}

impl<S: Named> SignatureCatalog<S> {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    pub fn insert(&mut self, signature: S) {
        let entries = self.by_name.entry(signature.key().to_string()).or_default();
        match entries
            .iter_mut()
            .find(|existing| existing.prototype() == signature.prototype())
        {
            Some(existing) => *existing = signature,
            None => entries.push(signature),
        }
    }

    /// All signatures sharing the literal name, in catalog order.
    pub fn candidates(&self, name: &str) -> &[S] {
        self.by_name.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Longest full match among the signatures keyed `key` at `from`.
    /// Ties keep the earlier signature, so a bare environment name only
    /// wins when no prototype with arguments matches further.
    pub fn best_match(&self, key: &str, code: &str, from: usize) -> Option<(&S, SignatureMatch)> {
        let mut best: Option<(&S, SignatureMatch)> = None;
        for signature in self.candidates(key) {
            if let Some(m) = signature.match_at(code, from) {
                if best.as_ref().is_none_or(|(_, b)| m.span.len() > b.span.len()) {
                    best = Some((signature, m));
                }
            }
        }
        best
    }
}

impl<S: Named> FromIterator<S> for SignatureCatalog<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for signature in iter {
            catalog.insert(signature);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sig(prototype: &str) -> CommandSignature {
        CommandSignature::parse(prototype, SignatureAction::Ignore).unwrap()
    }

    #[test]
    fn parses_name_and_argument_kinds() {
        let signature = sig(r"\foo[]{}()");
        assert_eq!(signature.name(), r"\foo");
        assert_eq!(
            signature.arguments(),
            &[
                ArgumentKind::Bracket,
                ArgumentKind::Brace,
                ArgumentKind::Parenthesis
            ]
        );
    }

    #[rstest]
    #[case("foo{}")]
    #[case(r"\")]
    #[case("")]
    fn rejects_invalid_prototypes(#[case] prototype: &str) {
        assert_eq!(
            CommandSignature::parse(prototype, SignatureAction::Ignore),
            Err(SignatureError::InvalidPrototype(prototype.to_string()))
        );
    }

    #[test]
    fn matches_nested_arguments() {
        let code = r"\cmd{a{b}c}[d] rest";
        let m = sig(r"\cmd{}[]").match_at(code, 0).unwrap();
        assert_eq!(m.span, Span::new(0, 14));
        assert_eq!(m.arguments, vec![Span::new(4, 11), Span::new(11, 14)]);
    }

    #[test]
    fn unterminated_argument_is_no_match() {
        assert_eq!(sig(r"\cmd{}").match_at(r"\cmd{a", 0), None);
    }

    #[test]
    fn mismatched_close_is_no_match() {
        assert_eq!(sig(r"\cmd{}").match_at(r"\cmd{a]b}", 0), None);
        assert_eq!(sig(r"\cmd[]").match_at(r"\cmd[a}b]", 0), None);
    }

    #[test]
    fn escaped_delimiters_are_skipped() {
        let m = sig(r"\cmd{}").match_at(r"\cmd{a\}b}", 0).unwrap();
        assert_eq!(m.span, Span::new(0, 10));
    }

    #[test]
    fn comment_between_arguments_is_skipped() {
        let code = "\\cmd{a}% note\n  {b}";
        let m = sig(r"\cmd{}{}").match_at(code, 0).unwrap();
        assert_eq!(m.arguments[1], Span::new(16, 19));
        assert_eq!(m.span.end, code.len());
    }

    #[test]
    fn parenthesis_ignores_nested_parentheses() {
        let code = r"\draw(a(b)c)";
        let m = sig(r"\draw()").match_at(code, 0).unwrap();
        assert_eq!(m.span, Span::new(0, 10));
    }

    #[test]
    fn catalog_prefers_longest_match() {
        let catalog: SignatureCatalog<CommandSignature> =
            [sig(r"\cite{}"), sig(r"\cite[]{}")].into_iter().collect();
        let code = r"\cite[p. 4]{key} text";
        let (signature, m) = catalog.best_match(r"\cite", code, 0).unwrap();
        assert_eq!(signature.prototype(), r"\cite[]{}");
        assert_eq!(m.span.end, 16);
    }

    #[test]
    fn catalog_insert_replaces_same_prototype() {
        let mut catalog = SignatureCatalog::new();
        catalog.insert(sig(r"\todo{}"));
        catalog.insert(CommandSignature::parse(r"\todo{}", SignatureAction::Default).unwrap());
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.candidates(r"\todo")[0].action(),
            SignatureAction::Default
        );
    }

    fn env(prototype: &str, action: SignatureAction) -> EnvironmentSignature {
        EnvironmentSignature::parse(prototype, action).unwrap()
    }

    #[rstest]
    #[case(r"\begin{minted}{python}code\end{minted}", r"\begin{minted}{}", 22)]
    #[case(r"\begin{minted}code\end{minted}", "minted", 14)]
    #[case(r"\begin{minted}[opt]{python}x", r"\begin{minted}[]{}", 27)]
    fn environment_catalog_prefers_longest_match(
        #[case] code: &str,
        #[case] expected: &str,
        #[case] end: usize,
    ) {
        let catalog: SignatureCatalog<EnvironmentSignature> = [
            env("minted", SignatureAction::Ignore),
            env(r"\begin{minted}{}", SignatureAction::Default),
            env(r"\begin{minted}[]{}", SignatureAction::Default),
        ]
        .into_iter()
        .collect();

        let (signature, m) = catalog.best_match(r"\begin{minted}", code, 0).unwrap();
        assert_eq!(Named::prototype(signature), expected);
        assert_eq!(m.span.end, end);
    }

    #[test]
    fn environment_tie_keeps_catalog_order() {
        let catalog: SignatureCatalog<EnvironmentSignature> = [
            env(r"\begin{x}", SignatureAction::Default),
            env("x", SignatureAction::Ignore),
        ]
        .into_iter()
        .collect();

        let (signature, _) = catalog.best_match(r"\begin{x}", r"\begin{x}y", 0).unwrap();
        assert_eq!(signature.action(), SignatureAction::Default);
    }

    #[test]
    fn bare_environment_ignores_arguments() {
        let env = EnvironmentSignature::parse("tikzpicture", SignatureAction::Ignore).unwrap();
        assert!(env.ignores_all_arguments());
        assert_eq!(env.signature().name(), r"\begin{tikzpicture}");

        let env = EnvironmentSignature::parse(r"\begin{minted}{}", SignatureAction::Ignore).unwrap();
        assert!(!env.ignores_all_arguments());
        assert_eq!(env.environment(), "minted");
        assert_eq!(env.signature().name(), r"\begin{minted}");
    }
}
