//! Judging pipeline
//!
//! Language recipes, the keyword gate, verdict mapping and the workers that
//! turn a queued submission into its terminal state.

pub mod keywords;
pub mod languages;
pub mod pool;
pub mod runner;
pub mod verdict;
pub mod worker;

pub use keywords::{KeywordGate, KeywordViolation};
pub use languages::{LanguageHandler, RecipeSettings};
pub use pool::WorkerPool;
pub use runner::CaseRunner;
pub use verdict::{CaseLimits, CaseOutcome, VerdictAccumulator};
pub use worker::JudgeWorker;
