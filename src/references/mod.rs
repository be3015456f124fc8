//! Alias extraction and cross-reference resolution.

pub mod aliases;
pub mod resolver;

pub use aliases::{extract_alias, extract_aliases};
pub use resolver::{CrossReferenceResolver, NO_SIMILAR_ALIAS};
