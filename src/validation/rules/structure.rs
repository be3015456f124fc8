//! Structural rules: document, mapping, transformation and column sections,
//! plus operation calls checked against the registry.

use super::{operation_sites, parameter_map, selector, RuleServices};
use crate::core::context::{MappingView, ValidationContext};
use crate::core::result::{category, Diagnostic, Severity};
use crate::core::similarity::closest_match;
use crate::core::types::Value;
use crate::validation::engine::RuleDescriptor;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Accepted `transformation_type` values.
pub const TRANSFORMATION_TYPES: [&str; 12] = [
    "direct_mapping",
    "string_manipulation",
    "date_formatting",
    "value_mapping",
    "data_type_conversion",
    "conditional",
    "expression",
    "complex",
    "type_conversion",
    "numeric_transformation",
    "financial_calculation",
    "mathematical_operation",
];

const REQUIRED_TRANSFORMATION_FIELDS: [&str; 4] = ["source_alias", "target_column", "data_type", "transformation_type"];

static MAPPING_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("invalid mapping name pattern"));

static DATA_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(VARCHAR|CHAR|TEXT|STRING|INTEGER|INT|BIGINT|SMALLINT|DECIMAL|NUMERIC|FLOAT|DOUBLE|BOOLEAN|BOOL|DATE|TIMESTAMP|DATETIME|TIME|BINARY|VARBINARY|ARRAY|MAP|STRUCT)\s*(?:\([^)]*\))?\s*$",
    )
    .expect("invalid data type pattern")
});

static COLUMN_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("invalid column name pattern"));

fn structural(view: &MappingView<'_>, code: &str, message: String, path: String) -> Diagnostic {
    Diagnostic::error(category::STRUCTURAL, code, message)
        .with_path(path)
        .with_mapping(view.name())
}

fn structural_warning(view: &MappingView<'_>, code: &str, message: String, path: String) -> Diagnostic {
    Diagnostic::warning(category::STRUCTURAL, code, message)
        .with_path(path)
        .with_mapping(view.name())
}

/// `mappings` exists, is a list, and mapping names are unique.
pub fn document_structure() -> RuleDescriptor {
    RuleDescriptor::new(
        "document_structure",
        "The document has a mappings list with unique mapping names",
        Severity::Error,
        [selector::STRUCTURE, selector::DOCUMENT],
        |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            match ctx.document().get("mappings") {
                None => {
                    diagnostics.push(
                        Diagnostic::error(category::STRUCTURAL, "missing_required_field", "Missing required section \"mappings\"")
                            .with_path("mappings")
                            .with_suggestion("Add a \"mappings\" list with at least one mapping"),
                    );
                    return Ok(diagnostics);
                }
                Some(Value::Sequence(items)) if items.is_empty() => {
                    diagnostics.push(
                        Diagnostic::warning(category::STRUCTURAL, "empty_mappings", "The \"mappings\" list is empty")
                            .with_path("mappings"),
                    );
                }
                Some(Value::Sequence(_)) => {}
                Some(other) => {
                    diagnostics.push(
                        Diagnostic::error(
                            category::STRUCTURAL,
                            "invalid_mappings_type",
                            format!("\"mappings\" must be a list, got {}", other.type_name()),
                        )
                        .with_path("mappings"),
                    );
                    return Ok(diagnostics);
                }
            }

            let mut seen: IndexMap<&str, usize> = IndexMap::new();
            for view in ctx.mappings() {
                let Some(name) = view.get("mapping_name").and_then(Value::as_str) else {
                    continue;
                };
                if let Some(first) = seen.get(name) {
                    diagnostics.push(
                        structural(
                            &view,
                            "duplicate_mapping_name",
                            format!("Duplicate mapping_name \"{}\" (first used by mappings[{}])", name, first),
                            view.field_path("mapping_name"),
                        )
                        .with_suggestion("Give every mapping a unique mapping_name"),
                    );
                } else {
                    seen.insert(name, view.index);
                }
            }
            Ok(diagnostics)
        },
    )
}

/// Each mapping is a mapping with a valid name and well-typed sections.
pub fn mapping_structure() -> RuleDescriptor {
    RuleDescriptor::new(
        "mapping_structure",
        "Mappings have a valid name and correctly typed column sections",
        Severity::Error,
        [selector::STRUCTURE],
        |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                if !view.is_mapping() {
                    diagnostics.push(structural(
                        &view,
                        "invalid_mapping_entry",
                        format!("Mapping must be a dict, got {}", view.node.type_name()),
                        view.path(),
                    ));
                    continue;
                }

                if let Some(name) = view.get("mapping_name") {
                    let valid = name.as_str().is_some_and(|n| MAPPING_NAME.is_match(n));
                    if !valid {
                        diagnostics.push(
                            structural(
                                &view,
                                "invalid_mapping_name",
                                format!("Invalid mapping_name pattern: {}", name.display_scalar()),
                                view.field_path("mapping_name"),
                            )
                            .with_suggestion("Use only letters, numbers, underscores, and hyphens"),
                        );
                    }
                }

                match view.get("source_columns_interested") {
                    None => {}
                    Some(Value::Sequence(columns)) => {
                        for (i, column) in columns.iter().enumerate() {
                            if column.as_str().is_none() {
                                diagnostics.push(structural(
                                    &view,
                                    "invalid_column_type",
                                    format!("Source column must be a string, got {}", column.type_name()),
                                    format!("{}[{}]", view.field_path("source_columns_interested"), i),
                                ));
                            }
                        }
                    }
                    Some(_) => diagnostics.push(structural(
                        &view,
                        "invalid_source_columns_type",
                        format!("source_columns_interested must be a list in mapping: {}", view.name()),
                        view.field_path("source_columns_interested"),
                    )),
                }

                if let Some(transformations) = view.get("column_transformations") {
                    if transformations.as_sequence().is_none() {
                        diagnostics.push(structural(
                            &view,
                            "invalid_transformations_type",
                            format!("column_transformations must be a list in mapping: {}", view.name()),
                            view.field_path("column_transformations"),
                        ));
                    }
                }
            }
            Ok(diagnostics)
        },
    )
}

/// Required transformation fields, known types and operation lists.
pub fn transformation_structure() -> RuleDescriptor {
    RuleDescriptor::new(
        "transformation_structure",
        "Column transformations carry required fields and valid operation lists",
        Severity::Error,
        [selector::STRUCTURE],
        |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                for (t, transformation) in view.list("column_transformations").iter().enumerate() {
                    let path = format!("{}[{}]", view.field_path("column_transformations"), t);
                    check_transformation(&view, transformation, &path, &mut diagnostics);
                }
            }
            Ok(diagnostics)
        },
    )
}

fn check_transformation(view: &MappingView<'_>, transformation: &Value, path: &str, out: &mut Vec<Diagnostic>) {
    if transformation.as_mapping().is_none() {
        out.push(structural(
            view,
            "invalid_transformation_entry",
            format!("Transformation must be a dict, got {}", transformation.type_name()),
            path.to_string(),
        ));
        return;
    }

    for field in REQUIRED_TRANSFORMATION_FIELDS {
        if transformation.get(field).map_or(true, Value::is_null) {
            out.push(
                structural(
                    view,
                    "missing_required_field",
                    format!("Missing required field \"{}\" in transformation", field),
                    path.to_string(),
                )
                .with_suggestion(format!("Add the required \"{}\" field to the transformation", field))
                .with_extra("field", field),
            );
        }
    }

    let transformation_type = transformation.get("transformation_type").and_then(Value::as_str);
    if let Some(kind) = transformation_type {
        if !TRANSFORMATION_TYPES.contains(&kind) {
            let suggestion = match closest_match(kind, TRANSFORMATION_TYPES, 0.5) {
                Some(close) => format!("Did you mean \"{}\"?", close),
                None => format!("Use one of: {}", TRANSFORMATION_TYPES.join(", ")),
            };
            out.push(
                structural(
                    view,
                    "invalid_transformation_type",
                    format!("Invalid transformation_type \"{}\"", kind),
                    format!("{}.transformation_type", path),
                )
                .with_suggestion(suggestion)
                .with_extra("valid_values", TRANSFORMATION_TYPES.to_vec()),
            );
        }
    }

    if let Some(data_type) = transformation.get("data_type") {
        let valid = data_type.as_str().is_some_and(|d| DATA_TYPE.is_match(d));
        if !valid {
            out.push(
                structural_warning(
                    view,
                    "invalid_data_type_pattern",
                    format!("Potentially invalid data_type pattern: \"{}\"", data_type.display_scalar()),
                    format!("{}.data_type", path),
                )
                .with_suggestion("Use a standard SQL type such as VARCHAR(50) or DECIMAL(10,2)"),
            );
        }
    }

    let ops_path = format!("{}.transformations", path);
    match transformation.get("transformations") {
        None if transformation_type.is_some_and(|k| k != "direct_mapping") => out.push(
            structural(
                view,
                "missing_transformations_array",
                "Non-direct mappings require a \"transformations\" list".to_string(),
                path.to_string(),
            )
            .with_suggestion("Add a \"transformations\" list with the required operations"),
        ),
        None => {}
        Some(Value::Sequence(ops)) if ops.is_empty() => out.push(
            structural_warning(view, "empty_transformations", "Empty transformations list".to_string(), ops_path)
                .with_suggestion("Remove the empty list or add the required operations"),
        ),
        Some(Value::Sequence(ops)) => {
            for (k, op) in ops.iter().enumerate() {
                let op_path = format!("{}[{}]", ops_path, k);
                if op.as_mapping().is_none() {
                    out.push(structural(
                        view,
                        "invalid_operation_entry",
                        format!("Operation must be a dict, got {}", op.type_name()),
                        op_path,
                    ));
                } else if op.get("type").and_then(Value::as_str).is_none() {
                    out.push(
                        structural(
                            view,
                            "missing_operation_type",
                            "Operation is missing the required \"type\" field".to_string(),
                            op_path,
                        )
                        .with_suggestion("Add a \"type\" field naming the operation"),
                    );
                }
            }
        }
        Some(other) => out.push(structural(
            view,
            "invalid_operations_type",
            format!("\"transformations\" must be a list, got {}", other.type_name()),
            ops_path,
        )),
    }
}

/// `columns_mapping` and `column_duplications` are well formed.
pub fn column_sections() -> RuleDescriptor {
    RuleDescriptor::new(
        "column_sections",
        "Column mapping and duplication sections are well formed",
        Severity::Error,
        [selector::STRUCTURE],
        |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                check_columns_mapping(&view, &mut diagnostics);
                check_duplications(&view, &mut diagnostics);
            }
            Ok(diagnostics)
        },
    )
}

fn check_columns_mapping(view: &MappingView<'_>, out: &mut Vec<Diagnostic>) {
    let Some(section) = view.get("columns_mapping") else {
        return;
    };
    let path = view.field_path("columns_mapping");
    let Some(entries) = section.as_mapping() else {
        out.push(structural(
            view,
            "invalid_column_mapping_type",
            format!("columns_mapping must be a dict in mapping: {}", view.name()),
            path,
        ));
        return;
    };

    let mut targets: IndexMap<String, usize> = IndexMap::new();
    for (source, target) in entries {
        let entry_path = format!("{}.{}", path, source);
        if !COLUMN_NAME.is_match(source) {
            out.push(
                structural_warning(
                    view,
                    "invalid_source_column_name",
                    format!("Source column name contains invalid characters: {}", source),
                    entry_path.clone(),
                )
                .with_suggestion("Use only letters, numbers, and underscores in column names"),
            );
        }
        let target = target.display_scalar();
        if !COLUMN_NAME.is_match(&target) {
            out.push(
                structural_warning(
                    view,
                    "invalid_target_column_name",
                    format!("Target column name contains invalid characters: {}", target),
                    entry_path,
                )
                .with_suggestion("Use only letters, numbers, and underscores in column names"),
            );
        }
        *targets.entry(target).or_insert(0) += 1;
    }

    for (target, count) in targets.into_iter().filter(|(_, count)| *count > 1) {
        out.push(
            structural(
                view,
                "duplicate_target_column_mapping",
                format!("Target column \"{}\" is mapped from {} source columns", target, count),
                path.clone(),
            )
            .with_suggestion("Map each target column from exactly one source column")
            .with_extra("column", target),
        );
    }
}

fn check_duplications(view: &MappingView<'_>, out: &mut Vec<Diagnostic>) {
    let Some(section) = view.get("column_duplications") else {
        return;
    };
    let path = view.field_path("column_duplications");
    let Some(entries) = section.as_sequence() else {
        out.push(structural(
            view,
            "invalid_column_duplications_type",
            format!("column_duplications must be a list in mapping: {}", view.name()),
            path,
        ));
        return;
    };

    for (i, entry) in entries.iter().enumerate() {
        let entry_path = format!("{}[{}]", path, i);
        if entry.as_mapping().is_none() {
            out.push(structural(
                view,
                "invalid_duplication_entry",
                "Duplication entry must be a dict".to_string(),
                entry_path,
            ));
            continue;
        }
        if entry.get("source_column").map_or(true, Value::is_null) {
            out.push(structural(
                view,
                "missing_source_column",
                "Missing source_column in duplication entry".to_string(),
                entry_path.clone(),
            ));
        }
        match entry.get("additional_columns") {
            None => out.push(structural(
                view,
                "missing_additional_columns",
                "Missing additional_columns in duplication entry".to_string(),
                entry_path,
            )),
            Some(Value::Sequence(columns)) if columns.is_empty() => out.push(
                structural_warning(
                    view,
                    "empty_additional_columns",
                    "additional_columns list cannot be empty".to_string(),
                    format!("{}.additional_columns", entry_path),
                )
                .with_suggestion("Add at least one additional column or remove the duplication entry"),
            ),
            Some(Value::Sequence(_)) => {}
            Some(_) => out.push(structural(
                view,
                "invalid_additional_columns_type",
                "additional_columns must be a list".to_string(),
                format!("{}.additional_columns", entry_path),
            )),
        }
    }
}

/// Every operation call is checked against the registry.
pub fn operation_parameters(services: &RuleServices) -> RuleDescriptor {
    let registry = Arc::clone(&services.registry);
    RuleDescriptor::new(
        "operation_parameters",
        "Operation calls use known operations with valid parameters",
        Severity::Error,
        [selector::OPERATIONS],
        move |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            for view in ctx.mappings() {
                let mapping = view.name();
                for site in operation_sites(&view) {
                    let Some(op_type) = site.op_type() else {
                        continue;
                    };
                    if let Some(params) = site.node.get("parameters").filter(|p| !p.is_null()) {
                        if params.as_mapping().is_none() {
                            diagnostics.push(
                                Diagnostic::error(
                                    category::OPERATION_PARAMETER,
                                    "invalid_parameters_type",
                                    format!("Parameters of \"{}\" must be a dict, got {}", op_type, params.type_name()),
                                )
                                .with_path(format!("{}.parameters", site.path))
                                .with_mapping(mapping.clone()),
                            );
                            continue;
                        }
                    }
                    let report = registry.validate_call(op_type, &parameter_map(site.node));
                    diagnostics.extend(
                        report
                            .into_diagnostics()
                            .map(|d| d.rebase(&site.path).with_mapping(mapping.clone())),
                    );
                }
            }
            Ok(diagnostics)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ValidatorConfig;
    use crate::operations::registry::OperationRegistry;
    use crate::validation::rules::fixtures::{doc, valid_job};

    fn run(rule: RuleDescriptor, yaml: &str) -> Vec<Diagnostic> {
        let document = doc(yaml);
        let mut ctx = ValidationContext::new(&document);
        rule.call(&mut ctx).unwrap()
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    fn services() -> RuleServices {
        RuleServices::new(ValidatorConfig::default(), Arc::new(OperationRegistry::with_builtins()))
    }

    #[test]
    fn test_valid_job_is_clean() {
        let document = valid_job();
        let rules = [
            document_structure(),
            mapping_structure(),
            transformation_structure(),
            column_sections(),
            operation_parameters(&services()),
        ];
        for rule in rules {
            let mut ctx = ValidationContext::new(&document);
            let found = rule.call(&mut ctx).unwrap();
            assert!(found.is_empty(), "{}: {:?}", rule.name, found);
        }
    }

    #[test]
    fn test_document_structure() {
        assert_eq!(codes(&run(document_structure(), "settings: {}")), vec!["missing_required_field"]);
        assert_eq!(codes(&run(document_structure(), "mappings: 3")), vec!["invalid_mappings_type"]);
        assert_eq!(codes(&run(document_structure(), "mappings: []")), vec!["empty_mappings"]);
        let found = run(
            document_structure(),
            "mappings:\n  - mapping_name: a\n  - mapping_name: b\n  - mapping_name: a\n",
        );
        assert_eq!(codes(&found), vec!["duplicate_mapping_name"]);
        assert_eq!(found[0].path, "mappings[2].mapping_name");
    }

    #[test]
    fn test_mapping_structure() {
        let found = run(
            mapping_structure(),
            "mappings:\n  - mapping_name: 'bad name!'\n    source_columns_interested: [id, 5]\n    column_transformations: {}\n  - just text\n",
        );
        assert_eq!(
            codes(&found),
            vec!["invalid_mapping_name", "invalid_column_type", "invalid_transformations_type", "invalid_mapping_entry"]
        );
        assert_eq!(found[1].path, "mappings[0].source_columns_interested[1]");
        assert_eq!(found[0].mapping.as_deref(), Some("bad name!"));
    }

    #[test]
    fn test_transformation_structure() {
        let found = run(
            transformation_structure(),
            r#"
mappings:
  - mapping_name: m
    column_transformations:
      - source_alias: a
        target_column: b
        data_type: WIDGET
        transformation_type: string_manipulaton
      - source_alias: a
        target_column: c
        data_type: INT
        transformation_type: string_manipulation
        transformations: []
      - source_alias: a
        target_column: d
        data_type: INT
        transformation_type: conditional
        transformations: [{parameters: {}}, 7]
      - target_column: e
"#,
        );
        assert_eq!(
            codes(&found),
            vec![
                "invalid_transformation_type",
                "invalid_data_type_pattern",
                "missing_transformations_array",
                "empty_transformations",
                "missing_operation_type",
                "invalid_operation_entry",
                "missing_required_field",
                "missing_required_field",
                "missing_required_field",
            ]
        );
        assert_eq!(found[0].suggestion.as_deref(), Some("Did you mean \"string_manipulation\"?"));
        assert_eq!(found[1].severity, Severity::Warning);
        assert_eq!(found[4].path, "mappings[0].column_transformations[2].transformations[0]");
    }

    #[test]
    fn test_column_sections() {
        let found = run(
            column_sections(),
            r#"
mappings:
  - mapping_name: m
    columns_mapping:
      a: x
      "b c": x
    column_duplications:
      - source_column: a
        additional_columns: []
      - additional_columns: [z]
      - source_column: a
"#,
        );
        assert_eq!(
            codes(&found),
            vec![
                "invalid_source_column_name",
                "duplicate_target_column_mapping",
                "empty_additional_columns",
                "missing_source_column",
                "missing_additional_columns",
            ]
        );
    }

    #[test]
    fn test_operation_parameters_rebased() {
        let found = run(
            operation_parameters(&services()),
            r#"
mappings:
  - mapping_name: m
    column_transformations:
      - source_alias: a
        transformations:
          - type: divide
            parameters: {factor: 0}
          - type: uppr
          - type: round
            parameters: [2]
"#,
        );
        assert_eq!(codes(&found), vec!["zero_not_allowed", "unknown_operation", "invalid_parameters_type"]);
        assert_eq!(found[0].path, "mappings[0].column_transformations[0].transformations[0].parameters.factor");
        assert_eq!(found[0].mapping.as_deref(), Some("m"));
        assert_eq!(found[1].path, "mappings[0].column_transformations[0].transformations[1].type");
        assert!(found[1].suggestion.as_deref().unwrap_or("").contains("uppercase"));
    }
}
