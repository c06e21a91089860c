//! Formatter-facing value types: the option set handed to the engine, the
//! builder that produces it from raw control values, and the errors a
//! format request can end in.

pub mod config;
pub mod error;
pub mod preview;

pub use config::{build, FormatterConfig, IfStyle, OptionField, RawOptions, TupleStyle};
pub use error::FormatError;
pub use preview::PreviewKind;
