//! Core models for the taskrank library
//!
//! This module contains the data types shared by the normalizer, the cycle
//! detector, the scorer and the API layer.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An untrusted task record as received from a caller.
///
/// Any key may be missing or carry a value of the wrong type; the normalizer
/// decides what each field ends up as.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTask(Map<String, Value>);

impl RawTask {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns the value stored under `key`, treating an explicit `null` as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawTask {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for RawTask {
    type Error = Value;

    /// Only JSON objects are tasks; anything else is handed back unchanged
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}

/// A task after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// `None` means the task has no deadline
    pub due_date: Option<NaiveDate>,
    /// Always at least 0.1
    pub estimated_hours: f64,
    /// Always within 1..=10
    pub importance: i64,
    /// Ids of the tasks this one waits on
    pub dependencies: Vec<String>,
}

/// Relative contribution of each scoring factor.
///
/// The fields need not sum to one, but each must be a non-negative finite number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    pub urgency: f64,
    pub importance: f64,
    pub effort: f64,
    pub dependency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            urgency: 0.35,
            importance: 0.35,
            effort: 0.15,
            dependency: 0.15,
        }
    }
}

impl Weights {
    /// Creates a validated weight set
    pub fn new(
        urgency: f64,
        importance: f64,
        effort: f64,
        dependency: f64,
    ) -> Result<Self, WeightsError> {
        let weights = Self {
            urgency,
            importance,
            effort,
            dependency,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Checks every field is a non-negative finite number
    pub fn validate(&self) -> Result<(), WeightsError> {
        let fields = [
            ("urgency", self.urgency),
            ("importance", self.importance),
            ("effort", self.effort),
            ("dependency", self.dependency),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::Invalid { name, value });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Weights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "urgency={}, importance={}, effort={}, dependency={}",
            self.urgency, self.importance, self.effort, self.dependency
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightsError {
    #[error("weight '{name}' must be a non-negative finite number, got {value}")]
    Invalid { name: &'static str, value: f64 },
}

/// A task with its priority score and a line-per-factor explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTask {
    #[serde(flatten)]
    pub task: Task,
    /// Rounded to 4 decimal places
    pub score: f64,
    /// Urgency, importance, effort, dependency and weights lines, in that order
    pub explanation: Vec<String>,
}

/// A condensed ranking entry returned by the suggest operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub title: String,
    pub score: f64,
    pub reason_summary: String,
}

impl From<&ScoredTask> for Suggestion {
    fn from(scored: &ScoredTask) -> Self {
        let reason_summary = scored
            .explanation
            .iter()
            .take(2)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            id: scored.task.id.clone(),
            title: scored.task.title.clone(),
            score: scored.score,
            reason_summary,
        }
    }
}

/// Ranking policy for suggestions.
///
/// Every strategy other than `Smart` replaces the configured weights with a
/// preset that isolates a single factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Smart,
    Fastest,
    HighImpact,
    Deadline,
}

impl Strategy {
    /// Returns the weights this strategy ranks with
    pub fn weights(self, configured: &Weights) -> Weights {
        let only = |urgency, importance, effort, dependency| Weights {
            urgency,
            importance,
            effort,
            dependency,
        };
        match self {
            Strategy::Smart => *configured,
            Strategy::Fastest => only(0.0, 0.0, 1.0, 0.0),
            Strategy::HighImpact => only(0.0, 1.0, 0.0, 0.0),
            Strategy::Deadline => only(1.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Smart => "smart",
            Strategy::Fastest => "fastest",
            Strategy::HighImpact => "high_impact",
            Strategy::Deadline => "deadline",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(Strategy::Smart),
            "fastest" => Ok(Strategy::Fastest),
            "high_impact" | "highimpact" | "impact" => Ok(Strategy::HighImpact),
            "deadline" => Ok(Strategy::Deadline),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy '{0}' (expected smart, fastest, high_impact or deadline)")]
pub struct UnknownStrategy(pub String);

/// The only failure the scoring core produces
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    /// Carries the offending id path, first id repeated at the end
    #[error("circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
}

impl ScoringError {
    /// Stable machine-readable code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            ScoringError::CircularDependency(_) => "circular_dependency_detected",
        }
    }
}
