//! Validation: the rule engine, the built-in rules and the profiles that
//! select them.
//!
//! A [`Validators`] instance runs a [`Profile`] (or an explicit category
//! list) over a document and returns a `ValidationResult`. Job-level runs
//! are kept in a bounded [`ValidationHistory`].

pub mod engine;
pub mod history;
pub mod profiles;
pub mod report;
pub mod rules;
pub mod validators;

pub use engine::{RuleDescriptor, RuleEngine, RuleFn};
pub use history::{HistoryEntry, ValidationHistory};
pub use profiles::Profile;
pub use report::ValidationReport;
pub use rules::{builtin_rules, selector, RuleServices};
pub use validators::{MappingOutcome, MappingOutcomes, Validators, ValidatorsBuilder};
