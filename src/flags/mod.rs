//! Flag records, their compilation and evaluation.
//!
//! A [`Flag`] and its ordered [`TargetingRule`]s are compiled into a [`CompiledFlag`] once per
//! configuration snapshot. Evaluating a compiled flag for a [`Context`](crate::Context) then only
//! walks pre-validated data: conditions with parsed operators and compiled regexes, and rollouts
//! with their hashing salt already applied.
mod compiled;
mod error;
mod eval;
mod eval_details;
mod eval_details_builder;
mod eval_visitor;
mod models;
mod rollout;
mod rules;

pub use compiled::CompiledFlag;
pub use error::{InvalidFlagError, InvalidRuleError};
pub use eval::{evaluate, evaluate_details, EvaluationReason, EvaluationResult};
pub use eval_details::{
    ConditionEvaluationDetails, EvaluationDetails, RuleEvaluationCode, RuleEvaluationDetails,
};
pub use models::*;
pub use rollout::{in_bucket, TOTAL_BUCKETS};
