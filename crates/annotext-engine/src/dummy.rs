/// Produces deterministic placeholder words for substituted markup.
///
/// The same counter always yields the same word and distinct counters yield
/// distinct words, so a checker sees each substitution as its own token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyGenerator {
    plural: bool,
}

impl DummyGenerator {
    pub const fn new() -> Self {
        Self { plural: false }
    }

    /// A generator whose words read as plural nouns.
    pub const fn plural() -> Self {
        Self { plural: true }
    }

    pub fn is_plural(&self) -> bool {
        self.plural
    }

    /// Generates the placeholder for `number` in `language`.
    ///
    /// `starts_with_vowel` is a hint from math content such as `$a$` so that
    /// articles in front of the placeholder still read correctly.
    pub fn generate(&self, language: &str, number: usize, starts_with_vowel: bool) -> String {
        if language.starts_with("fr") {
            format!("Jimmy-{number}")
        } else if self.plural {
            format!("Dummies{number}")
        } else if starts_with_vowel {
            format!("Ina{number}")
        } else {
            format!("Dummy{number}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DummyGenerator::new(), "en-US", false, "Dummy3")]
    #[case(DummyGenerator::new(), "en-US", true, "Ina3")]
    #[case(DummyGenerator::plural(), "de-DE", false, "Dummies3")]
    #[case(DummyGenerator::plural(), "en-US", true, "Dummies3")]
    #[case(DummyGenerator::new(), "fr", true, "Jimmy-3")]
    #[case(DummyGenerator::plural(), "fr-CA", false, "Jimmy-3")]
    fn generates_language_aware_words(
        #[case] generator: DummyGenerator,
        #[case] language: &str,
        #[case] vowel: bool,
        #[case] expected: &str,
    ) {
        assert_eq!(generator.generate(language, 3, vowel), expected);
    }

    #[test]
    fn words_are_stable_and_distinct() {
        let generator = DummyGenerator::new();
        assert_eq!(
            generator.generate("en-US", 7, false),
            generator.generate("en-US", 7, false)
        );
        assert_ne!(
            generator.generate("en-US", 1, false),
            generator.generate("en-US", 11, false)
        );
    }
}
