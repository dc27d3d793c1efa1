//! # Annotated Text
//!
//! The output model shared by every format builder.
//!
//! ## Modules
//!
//! - [`span`]: byte ranges into source and plain text
//! - [`annotated`]: parts, plain text and the inverse offset mapping
//! - [`builder`]: incremental construction while scanning a source
//! - [`invariants`]: structural checks used by tests and benchmarks
//!
//! ## Key Invariants
//!
//! - Parts are contiguous: concatenating their consumed source reproduces the
//!   input exactly once.
//! - Plain offsets map back to source offsets monotonically.

pub mod annotated;
pub mod builder;
pub mod invariants;
pub mod span;

pub use annotated::{AnnotatedText, PartKind, TextPart};
pub use builder::AnnotatedTextBuilder;
pub use span::Span;
