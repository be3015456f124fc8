//! Job-level `settings` checks.

use super::selector;
use crate::core::context::ValidationContext;
use crate::core::result::{category, Diagnostic, Severity};
use crate::validation::engine::RuleDescriptor;

const LOAD_MODES: [&str; 3] = ["full", "delta", "incremental"];
const ENVIRONMENTS: [&str; 5] = ["dev", "test", "stage", "prod", "production"];

const PARTITION_KEYS: [&str; 12] = [
    "partition_enabled",
    "dynamic_partition_calculation",
    "partition_refresh_frequency",
    "average_row_size",
    "target_partition_size_mb",
    "partition_buffer_percent",
    "num_partitions",
    "num_partitions_for_delta",
    "partition_lowerbound",
    "partition_upperbound",
    "allow_num_partitions_adjustment",
    "allow_num_partitions_for_delta_adjustment",
];

const NUMERIC_RANGES: [(&str, f64, f64); 5] = [
    ("average_row_size", 1.0, 1_000_000.0),
    ("target_partition_size_mb", 1.0, 1000.0),
    ("partition_buffer_percent", 0.0, 100.0),
    ("num_partitions", 1.0, 10_000.0),
    ("num_partitions_for_delta", 1.0, 10_000.0),
];

fn settings_error(code: &str, message: String, path: &str) -> Diagnostic {
    Diagnostic::error(category::STRUCTURAL, code, message).with_path(format!("settings.{}", path))
}

/// `settings.load` and `settings.environment` take known values.
pub fn job_settings() -> RuleDescriptor {
    RuleDescriptor::new(
        "job_settings",
        "Load mode and environment take known values",
        Severity::Error,
        [selector::SETTINGS, selector::DOCUMENT],
        |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            let Some(settings) = ctx.document().settings() else {
                return Ok(diagnostics);
            };
            if settings.as_mapping().is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        category::STRUCTURAL,
                        "invalid_settings_type",
                        format!("\"settings\" must be a dict, got {}", settings.type_name()),
                    )
                    .with_path("settings"),
                );
                return Ok(diagnostics);
            }

            if let Some(load) = settings.get("load") {
                if !load.as_str().is_some_and(|l| LOAD_MODES.contains(&l)) {
                    diagnostics.push(
                        settings_error(
                            "invalid_load_mode",
                            format!("Invalid load mode: {}", load.display_scalar()),
                            "load",
                        )
                        .with_suggestion(format!("Use one of: {}", LOAD_MODES.join(", "))),
                    );
                }
            }

            if let Some(environment) = settings.get("environment") {
                if !environment.as_str().is_some_and(|e| ENVIRONMENTS.contains(&e)) {
                    diagnostics.push(
                        Diagnostic::warning(
                            category::STRUCTURAL,
                            "invalid_environment",
                            format!("Unknown environment: {}", environment.display_scalar()),
                        )
                        .with_path("settings.environment")
                        .with_suggestion(format!("Use one of: {}", ENVIRONMENTS.join(", "))),
                    );
                }
            }
            Ok(diagnostics)
        },
    )
}

/// `settings.default_partition_settings` keys and values.
pub fn partition_settings() -> RuleDescriptor {
    RuleDescriptor::new(
        "partition_settings",
        "Default partition settings use known keys and in-range values",
        Severity::Error,
        [selector::SETTINGS, selector::DOCUMENT],
        |ctx: &mut ValidationContext<'_>| {
            let mut diagnostics = Vec::new();
            let Some(section) = ctx
                .document()
                .settings()
                .and_then(|s| s.get("default_partition_settings"))
            else {
                return Ok(diagnostics);
            };
            let Some(entries) = section.as_mapping() else {
                diagnostics.push(settings_error(
                    "invalid_partition_settings_type",
                    format!("default_partition_settings must be a dict, got {}", section.type_name()),
                    "default_partition_settings",
                ));
                return Ok(diagnostics);
            };

            for key in entries.keys().filter(|k| !PARTITION_KEYS.contains(&k.as_str())) {
                diagnostics.push(
                    Diagnostic::warning(
                        category::STRUCTURAL,
                        "unknown_partition_setting",
                        format!("Unknown partition setting: {}", key),
                    )
                    .with_path(format!("settings.default_partition_settings.{}", key))
                    .with_suggestion(format!("Remove unknown setting \"{}\" or check for typos", key))
                    .with_extra("setting", key.as_str()),
                );
            }

            if let Some(enabled) = entries.get("partition_enabled") {
                if !matches!(enabled.as_str(), Some("Y" | "N")) {
                    diagnostics.push(
                        settings_error(
                            "invalid_partition_enabled_value",
                            format!("partition_enabled must be Y or N, got: {}", enabled.display_scalar()),
                            "default_partition_settings.partition_enabled",
                        )
                        .with_suggestion("Quote the flag as \"Y\" or \"N\""),
                    );
                }
            }

            for (setting, min, max) in NUMERIC_RANGES {
                let Some(value) = entries.get(setting) else {
                    continue;
                };
                let in_range = value.is_number() && value.as_f64().is_some_and(|v| (min..=max).contains(&v));
                if !in_range {
                    diagnostics.push(
                        settings_error(
                            "invalid_numeric_setting",
                            format!("{} must be between {} and {}, got: {}", setting, min, max, value.display_scalar()),
                            &format!("default_partition_settings.{}", setting),
                        )
                        .with_extra("setting", setting)
                        .with_extra("min_value", min)
                        .with_extra("max_value", max),
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
    use crate::validation::rules::fixtures::{doc, valid_job};

    fn run(rule: RuleDescriptor, yaml: &str) -> Vec<Diagnostic> {
        let document = doc(yaml);
        let mut ctx = ValidationContext::new(&document);
        rule.call(&mut ctx).unwrap()
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn test_valid_settings() {
        let document = valid_job();
        for rule in [job_settings(), partition_settings()] {
            let mut ctx = ValidationContext::new(&document);
            assert!(rule.call(&mut ctx).unwrap().is_empty());
        }
    }

    #[test]
    fn test_missing_settings_is_fine() {
        assert!(run(job_settings(), "mappings: []").is_empty());
        assert!(run(partition_settings(), "mappings: []").is_empty());
    }

    #[test]
    fn test_load_and_environment() {
        let found = run(job_settings(), "settings:\n  load: partial\n  environment: qa\n");
        assert_eq!(codes(&found), vec!["invalid_load_mode", "invalid_environment"]);
        assert!(found[0].is_blocking());
        assert_eq!(found[1].severity, Severity::Warning);
        assert_eq!(found[1].path, "settings.environment");
    }

    #[test]
    fn test_settings_must_be_mapping() {
        assert_eq!(codes(&run(job_settings(), "settings: [1]")), vec!["invalid_settings_type"]);
    }

    #[test]
    fn test_partition_settings() {
        let found = run(
            partition_settings(),
            r#"
settings:
  default_partition_settings:
    partition_enabled: true
    num_partitions: 0
    partition_buffer_percent: 100
    average_row_size: "large"
    partitions_count: 3
"#,
        );
        assert_eq!(
            codes(&found),
            vec![
                "unknown_partition_setting",
                "invalid_partition_enabled_value",
                "invalid_numeric_setting",
                "invalid_numeric_setting",
            ]
        );
        assert_eq!(found[2].path, "settings.default_partition_settings.average_row_size");
        assert_eq!(found[3].path, "settings.default_partition_settings.num_partitions");
    }
}
