//! Prose extraction from LaTeX, Markdown, reStructuredText, HTML and the
//! comments of source code.
//!
//! A document is split into [`fragments`], each fragment is annotated by a
//! format builder from [`parsing`], and the resulting [`AnnotatedText`] maps
//! every plain text offset back to the source.

pub mod checking;
pub mod dummy;
pub mod fragments;
pub mod parsing;
pub mod position;
pub mod text;

// Re-export key types for easier usage
pub use checking::{
    AnnotatedDocument, AnnotatedTextFragment, CheckError, DocumentMatch, RuleMatch, TextChecker,
};
pub use dummy::DummyGenerator;
pub use fragments::{CodeFragment, CodeFragmentizer, create_fragmentizer, fragmentize};
pub use parsing::{AnnotateError, CodeAnnotatedTextBuilder, create_builder};
pub use position::{DocumentPositionIndex, Position};
pub use text::{AnnotatedText, PartKind, Span, TextPart};

pub use annotext_config::Settings;
