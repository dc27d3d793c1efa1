use super::{AnnotateError, CodeAnnotatedTextBuilder};
use crate::text::{AnnotatedText, AnnotatedTextBuilder};

/// Treats the whole input as prose.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextAnnotatedTextBuilder;

impl CodeAnnotatedTextBuilder for PlaintextAnnotatedTextBuilder {
    fn annotate(&self, code: &str) -> Result<AnnotatedText, AnnotateError> {
        let mut out = AnnotatedTextBuilder::new(code);
        out.add_text(code.len());
        Ok(out.build())
    }
}
