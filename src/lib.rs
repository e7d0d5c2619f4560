//! taskrank library crate
//!
//! Ranks to-do items by a weighted score over due date, importance,
//! estimated effort and how many other tasks they block. Raw task records are
//! normalized, rejected if their dependencies form a cycle, then scored and
//! sorted with a per-factor explanation.

pub mod api;
pub mod cli;
pub mod graph;
pub mod models;
pub mod normalize;
pub mod scoring;
pub mod validation;

pub use graph::{find_cycle, has_cycle};
pub use models::{RawTask, ScoredTask, ScoringError, Strategy, Suggestion, Task, Weights};
pub use normalize::normalize;
pub use scoring::{calculate_scores, calculate_scores_on, score_tasks, Core};
