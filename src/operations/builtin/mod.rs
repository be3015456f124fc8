//! Built-in operation specifications.
//!
//! This module contains the standard operations that ship with Mapguard.

mod advanced;
mod conditional;
mod conversion;
mod datetime;
mod numeric;
mod string;

use crate::operations::registry::OperationRegistry;

/// Register all built-in operations.
pub fn register_all(registry: &OperationRegistry) {
    string::register(registry);
    numeric::register(registry);
    datetime::register(registry);
    conditional::register(registry);
    conversion::register(registry);
    advanced::register(registry);
}

/// Names of the built-in categories, in registration order.
pub const CATEGORIES: [&str; 6] = ["string", "numeric", "datetime", "conditional", "conversion", "advanced"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_categories_registered() {
        let registry = OperationRegistry::new();
        register_all(&registry);
        assert_eq!(registry.categories(), CATEGORIES.map(String::from).to_vec());
        for category in CATEGORIES {
            assert!(!registry.get_by_category(category).is_empty(), "{}", category);
        }
    }

    #[test]
    fn test_every_builtin_has_description() {
        let registry = OperationRegistry::with_builtins();
        for name in registry.names() {
            let spec = registry.get(&name).unwrap();
            assert!(!spec.description.is_empty(), "{} has no description", name);
        }
    }
}
