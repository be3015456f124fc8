//! Expression security: benign-shape allow-list plus signature scanning.

pub mod allowlist;
pub mod classifier;
pub mod signatures;

pub use classifier::{normalize, Classification, ExpressionSecurityClassifier, SignatureMatch, INCOMPLETE_NOTE};
pub use signatures::{builtin_signatures, SecuritySignature, SignatureKind};
