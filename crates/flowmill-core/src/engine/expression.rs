//! JEXL expression evaluator for edge guards, Transform operations, and
//! Action `calculate` steps.
//!
//! Wraps `jexl_eval::Evaluator` with a small set of pre-registered
//! transforms. Context data is always passed as a JSON object, never
//! interpolated into expression strings.

use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from expression evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    #[error("expression evaluation failed: {0}")]
    EvalFailed(String),

    #[error("invalid expression context: {0}")]
    InvalidContext(String),
}

// ---------------------------------------------------------------------------
// FlowEvaluator
// ---------------------------------------------------------------------------

/// JEXL evaluator with standard transforms registered.
///
/// Used for:
/// - Edge guard conditions (e.g. `conditionMet`, `trigger.kind == 'push'`)
/// - Transform node expressions (e.g. `item.price * 1.2`)
/// - Action `calculate` expressions
pub struct FlowEvaluator {
    evaluator: jexl_eval::Evaluator<'static>,
}

impl FlowEvaluator {
    pub fn new() -> Self {
        let evaluator = jexl_eval::Evaluator::new()
            .with_transform("lower", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_lowercase()))
            })
            .with_transform("upper", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_uppercase()))
            })
            .with_transform("trim", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.trim()))
            })
            .with_transform("length", |args: &[Value]| {
                let val = args.first().cloned().unwrap_or(Value::Null);
                let len = match &val {
                    Value::String(s) => s.len(),
                    Value::Array(a) => a.len(),
                    Value::Object(o) => o.len(),
                    _ => 0,
                };
                Ok(json!(len as f64))
            })
            .with_transform("contains", |args: &[Value]| {
                let subject = args.first().and_then(|v| v.as_str()).unwrap_or("");
                let search = args.get(1).and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(subject.contains(search)))
            })
            .with_transform("round", |args: &[Value]| {
                let n = args.first().and_then(|v| v.as_f64()).unwrap_or(0.0);
                Ok(json!(n.round()))
            })
            .with_transform("abs", |args: &[Value]| {
                let n = args.first().and_then(|v| v.as_f64()).unwrap_or(0.0);
                Ok(json!(n.abs()))
            })
            .with_transform("string", |args: &[Value]| {
                let val = args.first().cloned().unwrap_or(Value::Null);
                let s = match &val {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Ok(json!(s))
            });

        Self { evaluator }
    }

    /// Evaluate an expression and return the raw JSON result.
    pub fn evaluate(&self, expression: &str, context: &Value) -> Result<Value, ExpressionError> {
        if !context.is_object() {
            return Err(ExpressionError::InvalidContext(
                "context must be a JSON object".to_string(),
            ));
        }

        self.evaluator
            .eval_in_context(expression, context)
            .map_err(|e| ExpressionError::EvalFailed(e.to_string()))
    }

    /// Evaluate an expression and coerce the result to a boolean using
    /// JavaScript-like truthiness.
    pub fn evaluate_bool(&self, expression: &str, context: &Value) -> Result<bool, ExpressionError> {
        Ok(truthy(&self.evaluate(expression, context)?))
    }
}

impl Default for FlowEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// JavaScript-like truthiness for JSON values.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> FlowEvaluator {
        FlowEvaluator::new()
    }

    #[test]
    fn test_dot_notation() {
        let ctx = json!({ "order": { "customer": { "name": "Alice" } } });
        let result = evaluator().evaluate("order.customer.name", &ctx).unwrap();
        assert_eq!(result, json!("Alice"));
    }

    #[test]
    fn test_arithmetic() {
        let ctx = json!({ "price": 40.0, "qty": 3.0 });
        let result = evaluator().evaluate("price * qty", &ctx).unwrap();
        assert_eq!(result, json!(120.0));
    }

    #[test]
    fn test_boolean_connectives() {
        let ctx = json!({ "kind": "push", "branch": "main" });
        let eval = evaluator();
        assert!(eval
            .evaluate_bool("kind == 'push' && branch == 'main'", &ctx)
            .unwrap());
        assert!(!eval
            .evaluate_bool("kind == 'push' && branch == 'dev'", &ctx)
            .unwrap());
        assert!(eval
            .evaluate_bool("branch == 'dev' || kind == 'push'", &ctx)
            .unwrap());
    }

    #[test]
    fn test_ternary() {
        let ctx = json!({ "count": 10.0 });
        let result = evaluator()
            .evaluate("(count > 5) ? 'high' : 'low'", &ctx)
            .unwrap();
        assert_eq!(result, json!("high"));
    }

    #[test]
    fn test_transforms() {
        let eval = evaluator();
        let ctx = json!({ "name": "  Hello  ", "items": ["a", "b", "c"] });
        assert_eq!(eval.evaluate("name|trim|lower", &ctx).unwrap(), json!("hello"));
        assert_eq!(eval.evaluate("items|length", &ctx).unwrap(), json!(3.0));
        assert_eq!(eval.evaluate("(0 - 4.5)|abs", &ctx).unwrap(), json!(4.5));
    }

    #[test]
    fn test_missing_property_is_null() {
        let ctx = json!({ "order": {} });
        let result = evaluator().evaluate("order.missing", &ctx).unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_truthiness() {
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!([])));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&Value::Null));
    }

    #[test]
    fn test_invalid_context_rejected() {
        let err = evaluator().evaluate("true", &json!("not an object"));
        assert!(err.is_err());
    }
}
