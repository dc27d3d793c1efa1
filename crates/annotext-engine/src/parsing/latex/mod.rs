//! LaTeX and RSweave annotation.
//!
//! [`LatexAnnotatedTextBuilder`] walks the source once with a stack of modes
//! (paragraph text, inline text, heading, inline math, display math, ignored
//! environment, RSweave chunk). Commands are looked up in a
//! [`SignatureCatalog`](signature::SignatureCatalog) built from
//! [`defaults`] plus the user's settings.

pub mod builder;
pub mod defaults;
pub mod matcher;
pub mod signature;

pub use builder::LatexAnnotatedTextBuilder;
pub use matcher::CommandSignatureMatcher;
pub use signature::{CommandSignature, EnvironmentSignature, SignatureAction};
