//! Normalization of raw task records
//!
//! Every field has exactly one coercion rule and one default, so normalizing
//! never fails: values that cannot be interpreted fall back to the default.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{RawTask, Task};

pub const DEFAULT_ESTIMATED_HOURS: f64 = 1.0;
pub const MIN_ESTIMATED_HOURS: f64 = 0.1;
pub const DEFAULT_IMPORTANCE: i64 = 5;
pub const MIN_IMPORTANCE: i64 = 1;
pub const MAX_IMPORTANCE: i64 = 10;

/// Date format accepted for `due_date`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalizes a batch, preserving length and order
pub fn normalize(raw: &[RawTask]) -> Vec<Task> {
    raw.iter()
        .enumerate()
        .map(|(index, task)| normalize_task(index, task))
        .collect()
}

/// Normalizes the record found at position `index` of its batch
pub fn normalize_task(index: usize, raw: &RawTask) -> Task {
    let id = raw
        .get("id")
        .map(value_to_string)
        .unwrap_or_else(|| index.to_string());

    let title = raw
        .get("title")
        .map(value_to_string)
        .unwrap_or_else(|| format!("Task {}", index));

    let due_date = raw.get("due_date").and_then(parse_date);

    let estimated_hours = raw
        .get("estimated_hours")
        .and_then(as_float)
        .filter(|hours| *hours != 0.0)
        .unwrap_or(DEFAULT_ESTIMATED_HOURS)
        .max(MIN_ESTIMATED_HOURS);

    let importance = raw
        .get("importance")
        .and_then(as_integer)
        .filter(|importance| *importance != 0)
        .unwrap_or(DEFAULT_IMPORTANCE)
        .clamp(MIN_IMPORTANCE, MAX_IMPORTANCE);

    let dependencies = match raw.get("dependencies") {
        Some(Value::Array(items)) => items.iter().map(value_to_string).collect(),
        _ => Vec::new(),
    };

    Task {
        id,
        title,
        due_date,
        estimated_hours,
        importance,
        dependencies,
    }
}

/// Parses a `YYYY-MM-DD` string; anything else means "no deadline"
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) if !s.is_empty() => NaiveDate::parse_from_str(s, DATE_FORMAT).ok(),
        _ => None,
    }
}

/// Ids that appear on more than one task, in first-seen order
pub fn duplicate_ids(tasks: &[Task]) -> Vec<&str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for task in tasks {
        *counts.entry(task.id.as_str()).or_default() += 1;
    }

    let mut seen = HashSet::new();
    tasks
        .iter()
        .map(|task| task.id.as_str())
        .filter(|id| counts[id] > 1 && seen.insert(*id))
        .collect()
}

/// Renders an identifier-like value as text
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(true) => Some(1.0),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(true) => Some(1),
        _ => None,
    }
}
