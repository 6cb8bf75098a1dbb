// Copyright 2025 the Servicemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data-driven paint values.
//!
//! Paint properties are either literals or expressions in the MapLibre JSON
//! array form (`["get", "status"]`, `["match", ...]`). [`Expression`] builds
//! the subset this workspace uses and [`evaluate`] interprets it, so a
//! headless engine can report the colour a feature would actually render with.
//!
//! Supported operators: `literal`, `get`, `feature-state`, `boolean`, `case`,
//! `match`. Unknown operators evaluate to `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A paint property value: a literal or an expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaintValue(Value);

impl PaintValue {
    /// A literal value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// The JSON form handed to the engine.
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Whether this is an expression rather than a literal.
    pub fn is_expression(&self) -> bool {
        matches!(self.0.as_array().and_then(|a| a.first()), Some(Value::String(_)))
    }

    /// Evaluate against one feature.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Value {
        evaluate(&self.0, ctx)
    }
}

impl From<&str> for PaintValue {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_owned()))
    }
}

impl From<f64> for PaintValue {
    fn from(value: f64) -> Self {
        Self(Value::from(value))
    }
}

impl From<Expression> for PaintValue {
    fn from(value: Expression) -> Self {
        Self(value.0)
    }
}

/// Builder for the expression subset used by the layer presets.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression(Value);

impl Expression {
    /// `["get", key]`: a feature property.
    pub fn get(key: &str) -> Self {
        Self(Value::Array(vec!["get".into(), key.into()]))
    }

    /// `["feature-state", key]`: a transient per-feature attribute.
    pub fn feature_state(key: &str) -> Self {
        Self(Value::Array(vec!["feature-state".into(), key.into()]))
    }

    /// `["boolean", input, fallback]`: `input` if it is a boolean, else `fallback`.
    pub fn boolean(input: Self, fallback: bool) -> Self {
        Self(Value::Array(vec!["boolean".into(), input.0, fallback.into()]))
    }

    /// `["case", cond, out, ..., fallback]`.
    pub fn case(
        branches: impl IntoIterator<Item = (Self, PaintValue)>,
        fallback: impl Into<PaintValue>,
    ) -> Self {
        let mut items = vec![Value::from("case")];
        for (cond, out) in branches {
            items.push(cond.0);
            items.push(out.0);
        }
        items.push(fallback.into().0);
        Self(Value::Array(items))
    }

    /// `["match", input, label, out, ..., fallback]` with string labels.
    pub fn match_str<'a>(
        input: Self,
        arms: impl IntoIterator<Item = (&'a str, PaintValue)>,
        fallback: impl Into<PaintValue>,
    ) -> Self {
        let mut items = vec![Value::from("match"), input.0];
        for (label, out) in arms {
            items.push(label.into());
            items.push(out.0);
        }
        items.push(fallback.into().0);
        Self(Value::Array(items))
    }

    /// The JSON form.
    pub fn into_json(self) -> Value {
        self.0
    }
}

/// What an expression is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext<'a> {
    /// Feature properties.
    pub properties: &'a Map<String, Value>,
    /// Feature state, if any has been set.
    pub state: Option<&'a Map<String, Value>>,
}

impl<'a> EvalContext<'a> {
    /// Context for a feature with no state.
    pub fn new(properties: &'a Map<String, Value>) -> Self {
        Self {
            properties,
            state: None,
        }
    }

    /// Attach feature state.
    pub fn with_state(mut self, state: &'a Map<String, Value>) -> Self {
        self.state = Some(state);
        self
    }
}

/// Evaluate a literal or expression.
pub fn evaluate(expr: &Value, ctx: &EvalContext<'_>) -> Value {
    let Some(items) = expr.as_array() else {
        return expr.clone();
    };
    let Some((Value::String(op), args)) = items.split_first() else {
        return expr.clone();
    };
    match op.as_str() {
        "literal" => args.first().cloned().unwrap_or(Value::Null),
        "get" => lookup(ctx.properties, args, ctx),
        "feature-state" => ctx
            .state
            .map(|state| lookup(state, args, ctx))
            .unwrap_or(Value::Null),
        "boolean" => args
            .iter()
            .map(|a| evaluate(a, ctx))
            .find(Value::is_boolean)
            .unwrap_or(Value::Bool(false)),
        "case" => eval_case(args, ctx),
        "match" => eval_match(args, ctx),
        _ => Value::Null,
    }
}

fn lookup(source: &Map<String, Value>, args: &[Value], ctx: &EvalContext<'_>) -> Value {
    let Some(key) = args.first().map(|k| evaluate(k, ctx)) else {
        return Value::Null;
    };
    key.as_str()
        .and_then(|k| source.get(k))
        .cloned()
        .unwrap_or(Value::Null)
}

fn eval_case(args: &[Value], ctx: &EvalContext<'_>) -> Value {
    let Some((fallback, pairs)) = args.split_last() else {
        return Value::Null;
    };
    for pair in pairs.chunks_exact(2) {
        if evaluate(&pair[0], ctx) == Value::Bool(true) {
            return evaluate(&pair[1], ctx);
        }
    }
    evaluate(fallback, ctx)
}

fn eval_match(args: &[Value], ctx: &EvalContext<'_>) -> Value {
    let Some((input, rest)) = args.split_first() else {
        return Value::Null;
    };
    let Some((fallback, arms)) = rest.split_last() else {
        return Value::Null;
    };
    let input = evaluate(input, ctx);
    for arm in arms.chunks_exact(2) {
        let hit = match &arm[0] {
            Value::Array(labels) => labels.iter().any(|l| labels_equal(l, &input)),
            label => labels_equal(label, &input),
        };
        if hit {
            return evaluate(&arm[1], ctx);
        }
    }
    evaluate(fallback, ctx)
}

fn labels_equal(label: &Value, input: &Value) -> bool {
    match (label.as_f64(), input.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => label == input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn literals_pass_through() {
        let p = Map::new();
        let ctx = EvalContext::new(&p);
        assert_eq!(PaintValue::from("#fff").evaluate(&ctx), json!("#fff"));
        assert_eq!(PaintValue::from(0.5).evaluate(&ctx), json!(0.5));
        assert!(!PaintValue::from("#fff").is_expression());
    }

    #[test]
    fn match_on_property() {
        let expr = PaintValue::from(Expression::match_str(
            Expression::get("status"),
            [("added", "#0f0".into()), ("error", "#f00".into())],
            "#ccc",
        ));
        assert!(expr.is_expression());

        let added = props(json!({ "status": "added" }));
        let other = props(json!({ "status": "available" }));
        let missing = Map::new();
        assert_eq!(expr.evaluate(&EvalContext::new(&added)), json!("#0f0"));
        assert_eq!(expr.evaluate(&EvalContext::new(&other)), json!("#ccc"));
        assert_eq!(expr.evaluate(&EvalContext::new(&missing)), json!("#ccc"));
    }

    #[test]
    fn case_on_feature_state() {
        let hover = Expression::boolean(Expression::feature_state("hover"), false);
        let expr = PaintValue::from(Expression::case([(hover, 3.0.into())], 2.0));

        let p = Map::new();
        let on = props(json!({ "hover": true }));
        let off = props(json!({ "hover": false }));
        assert_eq!(expr.evaluate(&EvalContext::new(&p)), json!(2.0), "no state");
        assert_eq!(expr.evaluate(&EvalContext::new(&p).with_state(&on)), json!(3.0));
        assert_eq!(expr.evaluate(&EvalContext::new(&p).with_state(&off)), json!(2.0));
    }

    #[test]
    fn match_accepts_label_lists_and_numbers() {
        let expr = json!(["match", ["get", "n"], [1, 2], "low", 3, "three", "other"]);
        let one = props(json!({ "n": 1 }));
        let three = props(json!({ "n": 3.0 }));
        let nine = props(json!({ "n": 9 }));
        assert_eq!(evaluate(&expr, &EvalContext::new(&one)), json!("low"));
        assert_eq!(evaluate(&expr, &EvalContext::new(&three)), json!("three"));
        assert_eq!(evaluate(&expr, &EvalContext::new(&nine)), json!("other"));
    }

    #[test]
    fn unknown_operator_is_null() {
        let p = Map::new();
        assert_eq!(evaluate(&json!(["zoom"]), &EvalContext::new(&p)), Value::Null);
        // Arrays that do not start with an operator are literals.
        assert_eq!(evaluate(&json!([1, 2]), &EvalContext::new(&p)), json!([1, 2]));
    }

    #[test]
    fn serializes_as_plain_json() {
        let v = PaintValue::from(Expression::get("status"));
        assert_eq!(serde_json::to_value(&v).unwrap(), json!(["get", "status"]));
        let back: PaintValue = serde_json::from_value(json!("#123456")).unwrap();
        assert_eq!(back, PaintValue::from("#123456"));
    }
}
