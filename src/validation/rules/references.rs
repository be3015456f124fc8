//! Alias collection and reference resolution.

use super::{alias_note_key, known_aliases, selector, RuleServices};
use crate::core::context::ValidationContext;
use crate::core::result::{Diagnostic, Severity};
use crate::core::types::Value;
use crate::validation::engine::RuleDescriptor;
use std::sync::Arc;

/// Record each mapping's alias set for the reference rules.
pub fn collect_source_aliases(services: &RuleServices) -> RuleDescriptor {
    let resolver = Arc::clone(&services.resolver);
    RuleDescriptor::new(
        "collect_source_aliases",
        "Extract the aliases bound by each mapping's source columns",
        Severity::Info,
        [selector::CROSS_REFERENCE],
        move |ctx: &mut ValidationContext<'_>| {
            for view in ctx.mappings() {
                let Some(section) = view.get("source_columns_interested").and_then(Value::as_sequence) else {
                    continue;
                };
                let aliases: Vec<String> = resolver.extract_aliases(section).into_iter().collect();
                ctx.set_note(alias_note_key(&view), aliases);
            }
            Ok(Vec::new())
        },
    )
}

/// Every `source_alias` names a known alias.
pub fn transformation_references(services: &RuleServices) -> RuleDescriptor {
    let resolver = Arc::clone(&services.resolver);
    RuleDescriptor::new(
        "transformation_references",
        "Transformation source aliases refer to extracted source columns",
        Severity::Error,
        [selector::CROSS_REFERENCE],
        move |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                let Some(known) = known_aliases(ctx, &view, &resolver)? else {
                    continue;
                };
                let mapping = view.name();
                diagnostics.extend(
                    resolver
                        .check_references(
                            view.list("column_transformations"),
                            "source_alias",
                            &view.field_path("column_transformations"),
                            &known,
                        )
                        .into_iter()
                        .map(|d| d.with_mapping(mapping.clone())),
                );
            }
            Ok(diagnostics)
        },
    )
}

/// `columns_mapping` keys and duplication sources name known aliases.
pub fn column_mapping_references(services: &RuleServices) -> RuleDescriptor {
    let resolver = Arc::clone(&services.resolver);
    RuleDescriptor::new(
        "column_mapping_references",
        "Column mapping and duplication sources refer to extracted source columns",
        Severity::Error,
        [selector::CROSS_REFERENCE],
        move |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                let Some(known) = known_aliases(ctx, &view, &resolver)? else {
                    continue;
                };
                let mapping = view.name();

                if let Some(entries) = view.get("columns_mapping").and_then(Value::as_mapping) {
                    let base = view.field_path("columns_mapping");
                    for source in entries.keys() {
                        let path = format!("{}.{}", base, source);
                        if let Some(found) = resolver.check_reference(source, "columns_mapping", &path, &known) {
                            diagnostics.push(found.with_mapping(mapping.clone()));
                        }
                    }
                }

                diagnostics.extend(
                    resolver
                        .check_references(
                            view.list("column_duplications"),
                            "source_column",
                            &view.field_path("column_duplications"),
                            &known,
                        )
                        .into_iter()
                        .map(|d| d.with_mapping(mapping.clone())),
                );
            }
            Ok(diagnostics)
        },
    )
}
