use std::collections::HashSet;

use super::signature::{COMMAND, CommandSignature, SignatureCatalog, SignatureMatch};

/// Finds every occurrence of a set of command signatures in a document.
///
/// Scanning resumes right after the command name of each match, so commands
/// nested inside the arguments of an earlier match are reported as well.
#[derive(Debug, Clone)]
pub struct CommandSignatureMatcher {
    catalog: SignatureCatalog<CommandSignature>,
    ignored_prototypes: HashSet<String>,
}

impl CommandSignatureMatcher {
    pub fn new(signatures: impl IntoIterator<Item = CommandSignature>) -> Self {
        Self {
            catalog: signatures.into_iter().collect(),
            ignored_prototypes: HashSet::new(),
        }
    }

    /// Matches whose best signature has one of these prototypes are dropped.
    #[must_use]
    pub fn ignoring<'p>(mut self, prototypes: impl IntoIterator<Item = &'p str>) -> Self {
        self.ignored_prototypes
            .extend(prototypes.into_iter().map(str::to_string));
        self
    }

    /// All matches in document order.
    pub fn find_all<'s>(&'s self, code: &str) -> Vec<(&'s CommandSignature, SignatureMatch)> {
        let mut matches = Vec::new();
        let mut pos = 0;

        while let Some(offset) = code[pos..].find('\\') {
            let start = pos + offset;
            let Some(name) = COMMAND.find(&code[start..]) else {
                // trailing backslash
                break;
            };
            pos = start + name.len();

            if let Some((signature, m)) = self.catalog.best_match(name.as_str(), code, start) {
                if !self.ignored_prototypes.contains(signature.prototype()) {
                    matches.push((signature, m));
                }
            }
        }

        matches
    }
}
