//! Quality advisories: duplicate targets and transformation chains.

use super::{operation_sites, selector, OperationSite, RuleServices};
use crate::core::context::{MappingView, ValidationContext};
use crate::core::result::{category, Diagnostic, Severity};
use crate::core::types::Value;
use crate::validation::engine::RuleDescriptor;
use indexmap::IndexMap;
use std::sync::Arc;

const ROUNDING_OPS: [&str; 3] = ["round", "ceil", "floor"];
const ARITHMETIC_OPS: [&str; 4] = ["add", "subtract", "multiply", "divide"];

/// No two transformations of a mapping write the same target column.
pub fn duplicate_targets() -> RuleDescriptor {
    RuleDescriptor::new(
        "duplicate_targets",
        "Each target column is produced by one transformation",
        Severity::Error,
        [selector::QUALITY],
        |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                let mut seen: IndexMap<&str, usize> = IndexMap::new();
                for (t, transformation) in view.list("column_transformations").iter().enumerate() {
                    let Some(target) = transformation.get("target_column").and_then(Value::as_str) else {
                        continue;
                    };
                    match seen.get(target) {
                        Some(first) => diagnostics.push(
                            Diagnostic::error(
                                category::QUALITY,
                                "duplicate_target_column",
                                format!("Target column \"{}\" is already produced by column_transformations[{}]", target, first),
                            )
                            .with_path(format!("{}[{}].target_column", view.field_path("column_transformations"), t))
                            .with_mapping(view.name())
                            .with_suggestion("Merge the transformations or write to a different target column")
                            .with_extra("column", target),
                        ),
                        None => {
                            seen.insert(target, t);
                        }
                    }
                }
            }
            Ok(diagnostics)
        },
    )
}

/// Long chains, repeated rounding, arithmetic chains and cancelling pairs.
pub fn transformation_chains(services: &RuleServices) -> RuleDescriptor {
    let config = Arc::clone(&services.config);
    RuleDescriptor::new(
        "transformation_chains",
        "Transformation chains stay short and free of redundant steps",
        Severity::Warning,
        [selector::QUALITY],
        move |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                let sites = operation_sites(&view);
                let mut chains: IndexMap<usize, Vec<&OperationSite<'_>>> = IndexMap::new();
                for site in &sites {
                    chains.entry(site.transformation).or_default().push(site);
                }
                for (t, chain) in chains {
                    check_chain(&view, t, &chain, config.max_chain_length, config.max_arithmetic_chain, &mut diagnostics);
                }
            }
            Ok(diagnostics)
        },
    )
}

fn check_chain(
    view: &MappingView<'_>,
    t: usize,
    chain: &[&OperationSite<'_>],
    max_chain: usize,
    max_arithmetic: usize,
    out: &mut Vec<Diagnostic>,
) {
    let path = format!("{}[{}]", view.field_path("column_transformations"), t);
    let advisory = |d: Diagnostic| d.with_path(path.clone()).with_mapping(view.name());
    let types: Vec<&str> = chain.iter().filter_map(|s| s.op_type()).collect();

    if chain.len() > max_chain {
        out.push(
            advisory(Diagnostic::warning(
                category::QUALITY,
                "complex_transformation_chain",
                format!("Complex transformation chain with {} operations", chain.len()),
            ))
            .with_suggestion("Consider using sql_expression for complex calculations or breaking into multiple transformations")
            .with_extra("operation_count", chain.len()),
        );
    }

    let rounding: Vec<&str> = types.iter().copied().filter(|t| ROUNDING_OPS.contains(t)).collect();
    if rounding.len() > 1 {
        out.push(
            advisory(Diagnostic::warning(
                category::QUALITY,
                "redundant_rounding",
                format!("Multiple rounding operations detected: {}", rounding.join(", ")),
            ))
            .with_suggestion("Keep a single rounding step; only the last one takes effect")
            .with_extra("rounding_operations", rounding),
        );
    }

    let arithmetic: Vec<&str> = types.iter().copied().filter(|t| ARITHMETIC_OPS.contains(t)).collect();
    if arithmetic.len() > max_arithmetic {
        out.push(
            advisory(Diagnostic::info(
                category::QUALITY,
                "complex_arithmetic_chain",
                format!("Complex arithmetic chain with {} operations", arithmetic.len()),
            ))
            .with_suggestion("Consider using sql_expression for complex calculations")
            .with_extra("arithmetic_operations", arithmetic),
        );
    }

    for pair in chain.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if first.op_type() != Some("divide") || second.op_type() != Some("multiply") {
            continue;
        }
        let (Some(divisor), Some(multiplier)) = (first.parameter("factor"), second.parameter("factor")) else {
            continue;
        };
        if same_factor(divisor, multiplier) {
            out.push(
                Diagnostic::warning(
                    category::QUALITY,
                    "canceling_operations",
                    format!(
                        "Division by {} followed by multiplication by {} cancel out",
                        divisor.display_scalar(),
                        multiplier.display_scalar()
                    ),
                )
                .with_path(first.path.clone())
                .with_mapping(view.name())
                .with_suggestion("Remove both operations"),
            );
        }
    }
}

fn same_factor(a: &Value, b: &Value) -> bool {
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => x == y,
        _ => a.loose_eq(b),
    }
}
