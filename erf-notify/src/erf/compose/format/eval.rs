//! Evaluator for email templates

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::ast::*;
use crate::erf::Value;

/// Template evaluation failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
}

impl RenderError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Named values a template is rendered against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Unknown names are null
    pub fn get(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Apply `f` to every string value
    pub fn map_strings(&mut self, f: impl Fn(&str) -> String) {
        for value in self.values.values_mut() {
            if let Value::String(s) = value {
                *s = f(s);
            }
        }
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Evaluate a template against a context
pub fn evaluate(template: &FormatTemplate, ctx: &Context) -> Result<String, RenderError> {
    let mut result = String::new();

    for part in &template.parts {
        match part {
            FormatPart::Literal(s) => result.push_str(s),
            FormatPart::Expr(expr) => {
                let value = eval_expr(expr, ctx)?;
                result.push_str(&value.to_string());
            }
        }
    }

    Ok(result)
}

fn eval_expr(expr: &FormatExpr, ctx: &Context) -> Result<Value, RenderError> {
    match expr {
        FormatExpr::Field(name) => Ok(ctx.get(name)),

        FormatExpr::Constant(value) => Ok(value.clone()),

        FormatExpr::Compare { left, op, right } => {
            let left_val = eval_expr(left, ctx)?;
            let right_val = eval_expr(right, ctx)?;
            Ok(Value::Bool(eval_compare(&left_val, *op, &right_val)?))
        }

        FormatExpr::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            if is_truthy(&eval_expr(condition, ctx)?) {
                eval_expr(then_expr, ctx)
            } else {
                eval_expr(else_expr, ctx)
            }
        }

        FormatExpr::Coalesce { exprs } => {
            // Blank cells count as missing
            for e in exprs {
                let val = eval_expr(e, ctx)?;
                if !val.is_blank() {
                    return Ok(val);
                }
            }
            Ok(Value::Null)
        }

        FormatExpr::Formatted { expr, spec } => {
            let val = eval_expr(expr, ctx)?;
            Ok(Value::String(apply_format_spec(&val, spec)?))
        }
    }
}

fn eval_compare(left: &Value, op: CompareOp, right: &Value) -> Result<bool, RenderError> {
    // null == null is true, null == anything else is false
    if left.is_null() || right.is_null() {
        let both = left.is_null() && right.is_null();
        return Ok(match op {
            CompareOp::Eq => both,
            CompareOp::Ne => !both,
            _ => false,
        });
    }

    match op {
        CompareOp::Eq => Ok(values_equal(left, right)),
        CompareOp::Ne => Ok(!values_equal(left, right)),
        _ => {
            let ordering = compare_ordered(left, right).ok_or_else(|| {
                RenderError::new(format!(
                    "cannot compare {} and {} with {}",
                    type_name(left),
                    type_name(right),
                    op
                ))
            })?;
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

/// Equality with Int/Float coercion. Strings compare the way statuses are
/// matched: trimmed and ignoring case.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(a), Value::String(b)) => a.trim().to_lowercase() == b.trim().to_lowercase(),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            match (left.as_float(), right.as_float()) {
                (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                _ => false,
            }
        }
        _ => left == right,
    }
}

fn compare_ordered(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            left.as_float()?.partial_cmp(&right.as_float()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn is_truthy(val: &Value) -> bool {
    match val {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(n) => *n != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::DateTime(_) => true,
    }
}

fn type_name(val: &Value) -> &'static str {
    match val {
        Value::Null => "null",
        Value::String(_) => "string",
        Value::Int(_) => "integer",
        Value::Float(_) => "float",
        Value::Bool(_) => "boolean",
        Value::DateTime(_) => "datetime",
    }
}

fn apply_format_spec(val: &Value, spec: &FormatSpec) -> Result<String, RenderError> {
    if val.is_null() {
        return Ok(String::new());
    }

    match spec.format_type {
        FormatType::Auto => match val {
            Value::Float(n) => Ok(format_float(*n, spec)),
            Value::Int(n) if spec.precision.is_some() => Ok(format_float(*n as f64, spec)),
            Value::Int(n) => Ok(format_int(*n, spec)),
            _ => Ok(val.to_string()),
        },
        FormatType::Float => Ok(format_float(to_float(val)?, spec)),
        FormatType::Integer => Ok(format_int(to_float(val)?.round() as i64, spec)),
        FormatType::Date => match val {
            Value::DateTime(dt) => Ok(dt.format("%Y-%m-%d").to_string()),
            _ => Err(RenderError::new(format!(
                "cannot format {} as date",
                type_name(val)
            ))),
        },
        FormatType::DateTime => match val {
            Value::DateTime(dt) => Ok(dt.format("%Y-%m-%d %H:%M").to_string()),
            _ => Err(RenderError::new(format!(
                "cannot format {} as datetime",
                type_name(val)
            ))),
        },
    }
}

/// Numbers, or strings that parse as numbers (CSV quantities)
fn to_float(val: &Value) -> Result<f64, RenderError> {
    if let Some(n) = val.as_float() {
        return Ok(n);
    }
    val.as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or_else(|| RenderError::new(format!("cannot format {} as number", type_name(val))))
}

fn format_float(n: f64, spec: &FormatSpec) -> String {
    let precision = spec.precision.unwrap_or(2) as usize;
    let formatted = format!("{:.prec$}", n, prec = precision);
    if spec.thousands_sep {
        add_thousands_sep(&formatted)
    } else {
        formatted
    }
}

fn format_int(n: i64, spec: &FormatSpec) -> String {
    let formatted = n.to_string();
    if spec.thousands_sep {
        add_thousands_sep(&formatted)
    } else {
        formatted
    }
}

fn add_thousands_sep(s: &str) -> String {
    let (int_part, dec_part) = match s.find('.') {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, ""),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}{}", sign, grouped, dec_part)
}
