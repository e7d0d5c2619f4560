//! Weighted multi-factor scoring
//!
//! Each task gets four sub-scores on a roughly 0..10 scale (urgency,
//! importance, quick-win effort and how many tasks it blocks). The weighted
//! sum, rounded to four decimals, is the task's priority score.

use std::collections::{HashMap, HashSet};

use chrono::{Local, NaiveDate};

use crate::graph::find_cycle;
use crate::models::{
    RawTask, ScoredTask, ScoringError, Strategy, Suggestion, Task, Weights, WeightsError,
};
use crate::normalize::{duplicate_ids, normalize};

/// Urgency of anything due today or already overdue
pub const MAX_URGENCY: f64 = 10.0;
/// Upper bound of the dependency sub-score
pub const MAX_BLOCKED_SCORE: f64 = 10.0;
/// Number of entries returned by the suggest operation
pub const SUGGESTION_LIMIT: usize = 3;

/// A sub-score together with the phrase explaining it
#[derive(Debug, Clone, PartialEq)]
struct Factor {
    value: f64,
    reason: String,
}

fn urgency(due_date: Option<NaiveDate>, today: NaiveDate) -> Factor {
    let Some(due_date) = due_date else {
        return Factor {
            value: 0.0,
            reason: "no due date".to_string(),
        };
    };

    let days = (due_date - today).num_days();
    if days < 0 {
        Factor {
            value: MAX_URGENCY,
            reason: format!("overdue by {} day(s)", -days),
        }
    } else {
        Factor {
            value: (MAX_URGENCY - days as f64).max(0.0),
            reason: format!("due in {} day(s)", days),
        }
    }
}

fn importance(importance: i64) -> Factor {
    Factor {
        value: importance as f64,
        reason: format!("importance {}/10", importance),
    }
}

fn quick_win(estimated_hours: f64) -> Factor {
    Factor {
        value: 10.0 / (1.0 + estimated_hours),
        reason: format!("estimated {:?} hour(s)", estimated_hours),
    }
}

fn dependency(blocked: usize) -> Factor {
    Factor {
        value: (blocked as f64).min(MAX_BLOCKED_SCORE),
        reason: format!("blocks {} task(s)", blocked),
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// How many tasks of the batch list each task id as a dependency.
///
/// A task counts once per target however often it repeats the id. References
/// to ids outside the batch are ignored, and tasks sharing an id share a count.
fn blocked_counts(tasks: &[Task]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = tasks.iter().map(|t| (t.id.as_str(), 0)).collect();
    for task in tasks {
        let targets: HashSet<&str> = task.dependencies.iter().map(String::as_str).collect();
        for dependency in targets {
            if let Some(count) = counts.get_mut(dependency) {
                *count += 1;
            }
        }
    }
    counts
}

fn score_task(task: &Task, blocked: usize, weights: &Weights, today: NaiveDate) -> ScoredTask {
    let urgency = urgency(task.due_date, today);
    let importance = importance(task.importance);
    let effort = quick_win(task.estimated_hours);
    let dependency = dependency(blocked);

    let score = weights.urgency * urgency.value
        + weights.importance * importance.value
        + weights.effort * effort.value
        + weights.dependency * dependency.value;

    let explanation = vec![
        format!("urgency: {:.2} ({})", urgency.value, urgency.reason),
        format!("importance: {:.2} ({})", importance.value, importance.reason),
        format!("effort(quick-win): {:.2} ({})", effort.value, effort.reason),
        format!("dependency: {:.2} ({})", dependency.value, dependency.reason),
        format!("weights: {}", weights),
    ];

    ScoredTask {
        task: task.clone(),
        score: round4(score),
        explanation,
    }
}

/// Scores already-normalized, acyclic tasks and sorts them by score, highest first.
///
/// The sort is stable: equal scores keep their input order.
pub fn score_tasks(tasks: &[Task], weights: &Weights, today: NaiveDate) -> Vec<ScoredTask> {
    let blocked = blocked_counts(tasks);

    let mut results: Vec<ScoredTask> = tasks
        .iter()
        .map(|task| {
            let count = blocked.get(task.id.as_str()).copied().unwrap_or(0);
            score_task(task, count, weights, today)
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results
}

/// Normalizes, rejects cyclic batches and ranks what remains, relative to today's date
pub fn calculate_scores(
    tasks: &[RawTask],
    weights: &Weights,
) -> Result<Vec<ScoredTask>, ScoringError> {
    calculate_scores_on(tasks, weights, Local::now().date_naive())
}

/// Same as [`calculate_scores`] with an explicit reference date
pub fn calculate_scores_on(
    tasks: &[RawTask],
    weights: &Weights,
    today: NaiveDate,
) -> Result<Vec<ScoredTask>, ScoringError> {
    tracing::debug!(tasks = tasks.len(), weights = %weights, %today, "scoring batch");

    let normalized = normalize(tasks);

    let duplicates = duplicate_ids(&normalized);
    if !duplicates.is_empty() {
        tracing::warn!(
            ?duplicates,
            "batch contains duplicate task ids; their dependency counts are merged"
        );
    }

    if let Some(cycle) = find_cycle(&normalized) {
        tracing::warn!(cycle = %cycle.join(" -> "), "rejecting batch with circular dependency");
        return Err(ScoringError::CircularDependency(cycle));
    }

    Ok(score_tasks(&normalized, weights, today))
}

/// Entry point shared by the HTTP server and the in-process client.
///
/// Holds the configured default weights; every call is otherwise independent.
#[derive(Debug, Clone, Default)]
pub struct Core {
    weights: Weights,
}

impl Core {
    /// Fails on negative or non-finite weights
    pub fn new(weights: Weights) -> Result<Self, WeightsError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// The weights used when a request does not bring its own
    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Ranks a batch, using `weights` instead of the configured ones when given.
    ///
    /// Request weights are not checked here; callers run [`Weights::validate`]
    /// first, as the server and the in-process client do.
    pub fn analyze(
        &self,
        tasks: &[RawTask],
        weights: Option<Weights>,
    ) -> Result<Vec<ScoredTask>, ScoringError> {
        self.analyze_on(tasks, weights, Local::now().date_naive())
    }

    pub fn analyze_on(
        &self,
        tasks: &[RawTask],
        weights: Option<Weights>,
        today: NaiveDate,
    ) -> Result<Vec<ScoredTask>, ScoringError> {
        let weights = weights.unwrap_or(self.weights);
        calculate_scores_on(tasks, &weights, today)
    }

    /// Returns the top three tasks under the given strategy
    pub fn suggest(
        &self,
        tasks: &[RawTask],
        strategy: Strategy,
    ) -> Result<Vec<Suggestion>, ScoringError> {
        self.suggest_on(tasks, strategy, Local::now().date_naive())
    }

    pub fn suggest_on(
        &self,
        tasks: &[RawTask],
        strategy: Strategy,
        today: NaiveDate,
    ) -> Result<Vec<Suggestion>, ScoringError> {
        let weights = strategy.weights(&self.weights);
        tracing::debug!(%strategy, "building suggestions");

        let ranked = calculate_scores_on(tasks, &weights, today)?;
        Ok(ranked
            .iter()
            .take(SUGGESTION_LIMIT)
            .map(Suggestion::from)
            .collect())
    }
}
