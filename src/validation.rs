//! Shape validation for analyze requests
//!
//! Runs before the core sees anything. Each item is checked field by field;
//! a valid item is rebuilt with only the known keys and their defaults
//! filled in.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::models::{RawTask, Weights};
use crate::normalize::{
    DATE_FORMAT, DEFAULT_ESTIMATED_HOURS, DEFAULT_IMPORTANCE, MAX_IMPORTANCE, MIN_IMPORTANCE,
};

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
const BAD_NUMBER: &str = "A valid number is required.";
const BAD_INTEGER: &str = "A valid integer is required.";

/// What is wrong with one field.
///
/// List fields whose elements fail report them by position, e.g.
/// `{"1": ["This field may not be blank."]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldError {
    Messages(Vec<String>),
    Items(BTreeMap<usize, Vec<String>>),
}

impl From<Vec<String>> for FieldError {
    fn from(messages: Vec<String>) -> Self {
        FieldError::Messages(messages)
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        FieldError::Messages(vec![message])
    }
}

/// Field name to what is wrong with it
pub type FieldErrors = BTreeMap<String, FieldError>;

/// Validation failures of the item at `index`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemErrors {
    pub index: usize,
    pub errors: FieldErrors,
}

/// Validates every item, returning either all cleaned tasks or every item's errors
pub fn validate_tasks(items: &[Value]) -> Result<Vec<RawTask>, Vec<ItemErrors>> {
    let mut valid = Vec::with_capacity(items.len());
    let mut failures = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match validate_task(item) {
            Ok(task) => valid.push(task),
            Err(errors) => failures.push(ItemErrors { index, errors }),
        }
    }

    if failures.is_empty() {
        Ok(valid)
    } else {
        Err(failures)
    }
}

/// Validates a single item
pub fn validate_task(item: &Value) -> Result<RawTask, FieldErrors> {
    let mut errors = FieldErrors::new();

    let Value::Object(fields) = item else {
        errors.insert(
            "non_field_errors".to_string(),
            format!(
                "Invalid data. Expected an object, but got {}.",
                type_name(item)
            )
            .into(),
        );
        return Err(errors);
    };

    let mut cleaned = Map::new();
    let mut check = |name: &str, result: Result<Option<Value>, FieldError>| match result {
        Ok(Some(value)) => {
            cleaned.insert(name.to_string(), value);
        }
        Ok(None) => {}
        Err(messages) => {
            errors.insert(name.to_string(), messages);
        }
    };

    check("id", optional(fields.get("id"), |v| string_like(v, true)));
    check("title", required(fields.get("title"), |v| string_like(v, false)));
    check("due_date", due_date(fields.get("due_date")));
    check(
        "estimated_hours",
        with_default(fields.get("estimated_hours"), float_value, || {
            number(DEFAULT_ESTIMATED_HOURS)
        }),
    );
    check(
        "importance",
        with_default(fields.get("importance"), importance, || {
            Value::from(DEFAULT_IMPORTANCE)
        }),
    );
    check("dependencies", dependencies(fields.get("dependencies")));

    if errors.is_empty() {
        Ok(RawTask::new(cleaned))
    } else {
        Err(errors)
    }
}

fn optional(
    value: Option<&Value>,
    parse: impl Fn(&Value) -> Result<Value, String>,
) -> Result<Option<Value>, FieldError> {
    match value {
        None => Ok(None),
        Some(Value::Null) => Err(NOT_NULL.to_string().into()),
        Some(v) => parse(v).map(Some).map_err(FieldError::from),
    }
}

fn required(
    value: Option<&Value>,
    parse: impl Fn(&Value) -> Result<Value, String>,
) -> Result<Option<Value>, FieldError> {
    match value {
        None => Err(REQUIRED.to_string().into()),
        other => optional(other, parse),
    }
}

fn with_default(
    value: Option<&Value>,
    parse: impl Fn(&Value) -> Result<Value, String>,
    default: impl FnOnce() -> Value,
) -> Result<Option<Value>, FieldError> {
    match value {
        None => Ok(Some(default())),
        other => optional(other, parse),
    }
}

/// Strings and numbers are accepted and trimmed; anything else is rejected
fn string_like(value: &Value, allow_blank: bool) -> Result<Value, String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(NOT_A_STRING.to_string()),
    };
    if text.is_empty() && !allow_blank {
        return Err(NOT_BLANK.to_string());
    }
    Ok(Value::String(text))
}

fn due_date(value: Option<&Value>) -> Result<Option<Value>, FieldError> {
    match value {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(Value::Null)),
        Some(Value::String(s)) if NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).is_ok() => {
            Ok(Some(Value::String(s.trim().to_string())))
        }
        Some(_) => Err(BAD_DATE.to_string().into()),
    }
}

fn float_value(value: &Value) -> Result<Value, String> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .map(number)
        .ok_or_else(|| BAD_NUMBER.to_string())
}

fn importance(value: &Value) -> Result<Value, String> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    };

    let importance = parsed.ok_or_else(|| BAD_INTEGER.to_string())?;
    if importance < MIN_IMPORTANCE {
        return Err(format!(
            "Ensure this value is greater than or equal to {}.",
            MIN_IMPORTANCE
        ));
    }
    if importance > MAX_IMPORTANCE {
        return Err(format!(
            "Ensure this value is less than or equal to {}.",
            MAX_IMPORTANCE
        ));
    }
    Ok(Value::from(importance))
}

fn dependencies(value: Option<&Value>) -> Result<Option<Value>, FieldError> {
    let items = match value {
        None => return Ok(Some(Value::Array(Vec::new()))),
        Some(Value::Null) => return Err(NOT_NULL.to_string().into()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(format!(
                "Expected a list of items but got type \"{}\".",
                type_name(other)
            )
            .into())
        }
    };

    let mut cleaned = Vec::with_capacity(items.len());
    let mut failed = BTreeMap::new();
    for (i, item) in items.iter().enumerate() {
        let result = match item {
            Value::Null => Err(NOT_NULL.to_string()),
            other => string_like(other, false),
        };
        match result {
            Ok(id) => cleaned.push(id),
            Err(e) => {
                failed.insert(i, vec![e]);
            }
        }
    }

    if failed.is_empty() {
        Ok(Some(Value::Array(cleaned)))
    } else {
        Err(FieldError::Items(failed))
    }
}

fn number(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deserializes an optional `weights` object, reporting a readable message on failure
pub fn validate_weights(value: Option<&Value>) -> Result<Option<Weights>, String> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let weights: Weights = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    weights.validate().map_err(|e| e.to_string())?;
    Ok(Some(weights))
}
