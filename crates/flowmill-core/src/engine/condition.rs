//! Condition DSL evaluation for Condition nodes.
//!
//! A condition is a list of [`ConditionTerm`]s combined left-to-right: the
//! first term seeds the accumulator, and each term's `logic` says how the
//! *next* term joins the running result. Missing fields resolve to null,
//! which compares as falsy rather than erroring.

use serde_json::Value;
use tracing::warn;

use flowmill_types::workflow::{ConditionOperator, ConditionTerm, LogicOp};

use super::template::resolve_path;

/// Evaluate a condition term list against the execution namespace.
///
/// `namespace` is the merged JSON object the terms' `field` paths resolve
/// into. An empty list yields `default_empty`.
pub fn evaluate_conditions(
    conditions: &[ConditionTerm],
    namespace: &Value,
    default_empty: bool,
) -> bool {
    let mut terms = conditions.iter();
    let Some(first) = terms.next() else {
        return default_empty;
    };

    let mut acc = evaluate_term(first, namespace);
    let mut logic = first.logic;

    for term in terms {
        let rhs = evaluate_term(term, namespace);
        acc = match logic.unwrap_or(LogicOp::And) {
            LogicOp::And => acc && rhs,
            LogicOp::Or => acc || rhs,
        };
        logic = term.logic;
    }

    acc
}

/// Evaluate one term. A missing field resolves to null.
fn evaluate_term(term: &ConditionTerm, namespace: &Value) -> bool {
    let field = resolve_path(namespace, &term.field)
        .cloned()
        .unwrap_or(Value::Null);
    apply_operator(term.operator, &field, &term.value)
}

fn apply_operator(op: ConditionOperator, field: &Value, operand: &Value) -> bool {
    match op {
        ConditionOperator::Equals => json_eq(field, operand),
        ConditionOperator::NotEquals => !json_eq(field, operand),
        ConditionOperator::GreaterThan => compare(field, operand).is_some_and(|o| o.is_gt()),
        ConditionOperator::GreaterThanOrEqual => compare(field, operand).is_some_and(|o| o.is_ge()),
        ConditionOperator::LessThan => compare(field, operand).is_some_and(|o| o.is_lt()),
        ConditionOperator::LessThanOrEqual => compare(field, operand).is_some_and(|o| o.is_le()),
        ConditionOperator::Contains => contains(field, operand),
        ConditionOperator::NotContains => !contains(field, operand),
        ConditionOperator::StartsWith => match (field.as_str(), operand.as_str()) {
            (Some(s), Some(prefix)) => s.starts_with(prefix),
            _ => false,
        },
        ConditionOperator::EndsWith => match (field.as_str(), operand.as_str()) {
            (Some(s), Some(suffix)) => s.ends_with(suffix),
            _ => false,
        },
        ConditionOperator::IsEmpty => is_empty(field),
        ConditionOperator::IsNotEmpty => !is_empty(field),
        ConditionOperator::In => operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| json_eq(field, item))),
        ConditionOperator::NotIn => !operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| json_eq(field, item))),
        ConditionOperator::Regex => regex_matches(field, operand),
    }
}

/// Equality with numeric normalization so `1` and `1.0` compare equal.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering for numbers and strings; other type pairs do not compare.
fn compare(field: &Value, operand: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (field.as_f64(), operand.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (field.as_str(), operand.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

/// `contains` over strings (substring), arrays (membership), and objects
/// (key presence).
fn contains(field: &Value, operand: &Value) -> bool {
    match field {
        Value::String(s) => operand.as_str().is_some_and(|needle| s.contains(needle)),
        Value::Array(items) => items.iter().any(|item| json_eq(item, operand)),
        Value::Object(map) => operand.as_str().is_some_and(|key| map.contains_key(key)),
        _ => false,
    }
}

fn is_empty(field: &Value) -> bool {
    match field {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Regex match on string fields. An invalid pattern is a configuration
/// mistake, not an execution failure, so it logs and evaluates false.
fn regex_matches(field: &Value, operand: &Value) -> bool {
    let (Some(subject), Some(pattern)) = (field.as_str(), operand.as_str()) else {
        return false;
    };
    match regex::Regex::new(pattern) {
        Ok(re) => re.is_match(subject),
        Err(err) => {
            warn!(pattern, error = %err, "invalid regex in condition, evaluating false");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn term(field: &str, operator: ConditionOperator, value: Value) -> ConditionTerm {
        ConditionTerm {
            field: field.to_string(),
            operator,
            value,
            logic: None,
        }
    }

    fn term_with_logic(
        field: &str,
        operator: ConditionOperator,
        value: Value,
        logic: LogicOp,
    ) -> ConditionTerm {
        ConditionTerm {
            field: field.to_string(),
            operator,
            value,
            logic: Some(logic),
        }
    }

    // -----------------------------------------------------------------------
    // Single operators
    // -----------------------------------------------------------------------

    #[test]
    fn test_equals_with_numeric_normalization() {
        let ns = json!({ "count": 3 });
        assert!(evaluate_conditions(
            &[term("count", ConditionOperator::Equals, json!(3.0))],
            &ns,
            false
        ));
        assert!(evaluate_conditions(
            &[term("count", ConditionOperator::NotEquals, json!(4))],
            &ns,
            false
        ));
    }

    #[test]
    fn test_numeric_ordering() {
        let ns = json!({ "total": 150 });
        assert!(evaluate_conditions(
            &[term("total", ConditionOperator::GreaterThan, json!(100))],
            &ns,
            false
        ));
        assert!(!evaluate_conditions(
            &[term("total", ConditionOperator::LessThanOrEqual, json!(100))],
            &ns,
            false
        ));
        assert!(evaluate_conditions(
            &[term(
                "total",
                ConditionOperator::GreaterThanOrEqual,
                json!(150)
            )],
            &ns,
            false
        ));
    }

    #[test]
    fn test_string_ordering() {
        let ns = json!({ "name": "beta" });
        assert!(evaluate_conditions(
            &[term("name", ConditionOperator::GreaterThan, json!("alpha"))],
            &ns,
            false
        ));
    }

    #[test]
    fn test_mismatched_types_do_not_compare() {
        let ns = json!({ "name": "alpha" });
        assert!(!evaluate_conditions(
            &[term("name", ConditionOperator::GreaterThan, json!(5))],
            &ns,
            false
        ));
    }

    #[test]
    fn test_contains_variants() {
        let ns = json!({
            "msg": "critical error occurred",
            "tags": ["alpha", "beta"],
            "meta": { "env": "prod" }
        });
        assert!(evaluate_conditions(
            &[term("msg", ConditionOperator::Contains, json!("error"))],
            &ns,
            false
        ));
        assert!(evaluate_conditions(
            &[term("tags", ConditionOperator::Contains, json!("beta"))],
            &ns,
            false
        ));
        assert!(evaluate_conditions(
            &[term("meta", ConditionOperator::Contains, json!("env"))],
            &ns,
            false
        ));
        assert!(evaluate_conditions(
            &[term("msg", ConditionOperator::NotContains, json!("warning"))],
            &ns,
            false
        ));
    }

    #[test]
    fn test_starts_and_ends_with() {
        let ns = json!({ "path": "/api/v1/users" });
        assert!(evaluate_conditions(
            &[term("path", ConditionOperator::StartsWith, json!("/api"))],
            &ns,
            false
        ));
        assert!(evaluate_conditions(
            &[term("path", ConditionOperator::EndsWith, json!("users"))],
            &ns,
            false
        ));
        assert!(!evaluate_conditions(
            &[term("path", ConditionOperator::StartsWith, json!("/web"))],
            &ns,
            false
        ));
    }

    #[test]
    fn test_emptiness() {
        let ns = json!({ "a": "", "b": [], "c": {}, "d": "x", "e": 0 });
        for field in ["a", "b", "c", "missing"] {
            assert!(
                evaluate_conditions(
                    &[term(field, ConditionOperator::IsEmpty, Value::Null)],
                    &ns,
                    false
                ),
                "{field} should be empty"
            );
        }
        assert!(evaluate_conditions(
            &[term("d", ConditionOperator::IsNotEmpty, Value::Null)],
            &ns,
            false
        ));
        // Zero is a value, not emptiness.
        assert!(evaluate_conditions(
            &[term("e", ConditionOperator::IsNotEmpty, Value::Null)],
            &ns,
            false
        ));
    }

    #[test]
    fn test_in_and_not_in() {
        let ns = json!({ "status": "shipped" });
        assert!(evaluate_conditions(
            &[term(
                "status",
                ConditionOperator::In,
                json!(["pending", "shipped"])
            )],
            &ns,
            false
        ));
        assert!(evaluate_conditions(
            &[term(
                "status",
                ConditionOperator::NotIn,
                json!(["cancelled"])
            )],
            &ns,
            false
        ));
        // Non-array operand never matches `in`.
        assert!(!evaluate_conditions(
            &[term("status", ConditionOperator::In, json!("shipped"))],
            &ns,
            false
        ));
    }

    #[test]
    fn test_regex() {
        let ns = json!({ "email": "alice@example.com" });
        assert!(evaluate_conditions(
            &[term(
                "email",
                ConditionOperator::Regex,
                json!("^[^@]+@example\\.com$")
            )],
            &ns,
            false
        ));
    }

    #[test]
    fn test_invalid_regex_evaluates_false() {
        let ns = json!({ "email": "alice@example.com" });
        assert!(!evaluate_conditions(
            &[term("email", ConditionOperator::Regex, json!("([unclosed"))],
            &ns,
            false
        ));
    }

    // -----------------------------------------------------------------------
    // Combination and defaults
    // -----------------------------------------------------------------------

    #[test]
    fn test_empty_list_uses_default() {
        let ns = json!({});
        assert!(!evaluate_conditions(&[], &ns, false));
        assert!(evaluate_conditions(&[], &ns, true));
    }

    #[test]
    fn test_missing_field_is_null() {
        let ns = json!({});
        assert!(!evaluate_conditions(
            &[term("nope", ConditionOperator::Equals, json!(1))],
            &ns,
            false
        ));
        assert!(evaluate_conditions(
            &[term("nope", ConditionOperator::Equals, Value::Null)],
            &ns,
            false
        ));
    }

    #[test]
    fn test_left_fold_and_or() {
        let ns = json!({ "a": 1, "b": 2, "c": 3 });
        // (a==1 AND b==9) OR c==3  folds left: (false) OR true = true
        let conditions = vec![
            term_with_logic("a", ConditionOperator::Equals, json!(1), LogicOp::And),
            term_with_logic("b", ConditionOperator::Equals, json!(9), LogicOp::Or),
            term("c", ConditionOperator::Equals, json!(3)),
        ];
        assert!(evaluate_conditions(&conditions, &ns, false));

        // a==1 AND b==2 AND c==9 = false
        let conditions = vec![
            term_with_logic("a", ConditionOperator::Equals, json!(1), LogicOp::And),
            term_with_logic("b", ConditionOperator::Equals, json!(2), LogicOp::And),
            term("c", ConditionOperator::Equals, json!(9)),
        ];
        assert!(!evaluate_conditions(&conditions, &ns, false));
    }

    #[test]
    fn test_missing_logic_defaults_to_and() {
        let ns = json!({ "a": 1, "b": 2 });
        let conditions = vec![
            term("a", ConditionOperator::Equals, json!(1)),
            term("b", ConditionOperator::Equals, json!(9)),
        ];
        assert!(!evaluate_conditions(&conditions, &ns, false));
    }
}
