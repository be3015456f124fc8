//! Numeric operations.

use crate::core::types::Value;
use crate::operations::registry::OperationRegistry;
use crate::operations::spec::{violation, Constraint, OperationSpec, ParameterSpec, ParameterType};

/// Rounding modes accepted by `round`.
pub const ROUNDING_MODES: [&str; 7] = ["HALF_UP", "HALF_DOWN", "HALF_EVEN", "UP", "DOWN", "CEILING", "FLOOR"];

/// Register numeric operations.
pub fn register(registry: &OperationRegistry) {
    registry.register(
        OperationSpec::builder("round", "numeric")
            .description("Round a number to a fixed number of decimal places")
            .parameter(
                ParameterSpec::optional("precision", ParameterType::Integer)
                    .with_default(0_i64)
                    .with_range(0.0, 15.0)
                    .with_description("Decimal places to keep"),
            )
            .parameter(
                ParameterSpec::optional("mode", ParameterType::Choice)
                    .with_default("HALF_UP")
                    .with_allowed(ROUNDING_MODES)
                    .with_description("Rounding mode"),
            )
            .example("{type: round, parameters: {precision: 2}}")
            .build(),
    );

    for (name, description) in [
        ("ceil", "Round up to a fixed number of decimal places"),
        ("floor", "Round down to a fixed number of decimal places"),
    ] {
        registry.register(
            OperationSpec::builder(name, "numeric")
                .description(description)
                .parameter(
                    ParameterSpec::optional("precision", ParameterType::Integer)
                        .with_default(0_i64)
                        .with_min(0.0)
                        .with_description("Decimal places to keep"),
                )
                .build(),
        );
    }

    for (name, description) in [
        ("add", "Add a constant or another column"),
        ("subtract", "Subtract a constant or another column"),
    ] {
        registry.register(
            OperationSpec::builder(name, "numeric")
                .description(description)
                .parameter(
                    ParameterSpec::required("value", ParameterType::ColumnReference)
                        .with_description("Number or column name"),
                )
                .example(format!("{{type: {}, parameters: {{value: 10}}}}", name))
                .build(),
        );
    }

    registry.register(
        OperationSpec::builder("multiply", "numeric")
            .description("Multiply by a constant or another column")
            .parameter(
                ParameterSpec::required("factor", ParameterType::ColumnReference)
                    .with_description("Number or column name"),
            )
            .example("{type: multiply, parameters: {factor: 100}}")
            .build(),
    );

    registry.register(
        OperationSpec::builder("divide", "numeric")
            .description("Divide by a constant or another column")
            .parameter(
                ParameterSpec::required("factor", ParameterType::ColumnReference)
                    .with_constraint(Constraint::NonZero)
                    .with_description("Non-zero number or column name"),
            )
            .example("{type: divide, parameters: {factor: 100}}")
            .build(),
    );

    registry.register(
        OperationSpec::builder("parse_currency", "numeric")
            .description("Parse a formatted currency string into a number")
            .parameter(
                ParameterSpec::optional("currency_symbol", ParameterType::String)
                    .with_description("Symbol to strip, e.g. $"),
            )
            .parameter(ParameterSpec::optional("thousands_separator", ParameterType::String).with_default(","))
            .parameter(ParameterSpec::optional("decimal_separator", ParameterType::String).with_default("."))
            .parameter(
                ParameterSpec::optional("default_value", ParameterType::StringOrNumber)
                    .with_default(0.0)
                    .with_description("Value used when parsing fails"),
            )
            .build(),
    );

    registry.register(
        OperationSpec::builder("parse_number", "numeric")
            .description("Parse text into a number")
            .parameter(ParameterSpec::optional("default_value", ParameterType::StringOrNumber).with_default(0_i64))
            .parameter(
                ParameterSpec::optional("base", ParameterType::Integer)
                    .with_default(10_i64)
                    .with_range(2.0, 36.0)
                    .with_description("Numeric base of the input"),
            )
            .parameter(
                ParameterSpec::optional("number_type", ParameterType::Choice)
                    .with_default("auto")
                    .with_allowed(["auto", "integer", "float", "decimal"]),
            )
            .build(),
    );

    registry.register(
        OperationSpec::builder("min_value", "numeric")
            .description("Raise values below a lower bound to that bound")
            .parameter(ParameterSpec::required("min_value", ParameterType::ColumnReference))
            .build(),
    );

    registry.register(
        OperationSpec::builder("max_value", "numeric")
            .description("Lower values above an upper bound to that bound")
            .parameter(ParameterSpec::required("max_value", ParameterType::ColumnReference))
            .build(),
    );

    registry.register(
        OperationSpec::builder("clamp", "numeric")
            .description("Limit values to a range")
            .parameter(ParameterSpec::optional("min_value", ParameterType::ColumnReference))
            .parameter(ParameterSpec::optional("max_value", ParameterType::ColumnReference))
            .check("bounds", |params| {
                let present = |key: &str| params.get(key).filter(|v| !v.is_null());
                let (min, max) = (present("min_value"), present("max_value"));
                if min.is_none() && max.is_none() {
                    return Err(violation(
                        "missing_bound",
                        "at least one of min_value or max_value is required",
                    ));
                }
                if let (Some(lo), Some(hi)) = (min.and_then(Value::as_f64), max.and_then(Value::as_f64)) {
                    if lo > hi {
                        return Err(violation(
                            "invalid_range",
                            format!("min_value ({}) must not exceed max_value ({})", lo, hi),
                        ));
                    }
                }
                Ok(())
            })
            .example("{type: clamp, parameters: {min_value: 0, max_value: 100}}")
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use crate::core::types::Value;
    use crate::operations::registry::OperationRegistry;
    use indexmap::IndexMap;

    fn call(name: &str, pairs: &[(&str, Value)]) -> Vec<String> {
        let registry = OperationRegistry::with_builtins();
        let params: IndexMap<String, Value> = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        registry
            .validate_call(name, &params)
            .errors
            .into_iter()
            .map(|d| d.code)
            .collect()
    }

    #[test]
    fn test_round_precision_range() {
        assert!(call("round", &[("precision", Value::Integer(15))]).is_empty());
        assert_eq!(call("round", &[("precision", Value::Integer(16))]), vec!["parameter_above_maximum"]);
        assert_eq!(call("round", &[("precision", Value::Integer(-1))]), vec!["parameter_below_minimum"]);
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(call("divide", &[("factor", Value::Integer(0))]), vec!["zero_not_allowed"]);
        assert!(call("divide", &[("factor", Value::from("rate"))]).is_empty());
    }

    #[test]
    fn test_multiply_accepts_column_name() {
        assert!(call("multiply", &[("factor", Value::from("exchange_rate"))]).is_empty());
        assert_eq!(call("multiply", &[("factor", Value::Bool(true))]), vec!["invalid_parameter_type"]);
    }

    #[test]
    fn test_parse_number_base() {
        assert!(call("parse_number", &[("base", Value::Integer(16))]).is_empty());
        assert_eq!(call("parse_number", &[("base", Value::Integer(40))]), vec!["parameter_above_maximum"]);
    }

    #[test]
    fn test_clamp_bounds() {
        assert!(call("clamp", &[("min_value", Value::Integer(0))]).is_empty());
        assert!(call("clamp", &[("min_value", Value::Integer(0)), ("max_value", Value::Float(9.5))]).is_empty());
        assert_eq!(call("clamp", &[("min_value", Value::Null)]), vec!["missing_bound"]);
        // column references are not compared
        assert!(call("clamp", &[("min_value", Value::from("hi")), ("max_value", Value::Integer(1))]).is_empty());
    }
}
