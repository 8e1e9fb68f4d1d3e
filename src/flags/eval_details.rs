//! Evaluation details: an explanation of how an [`EvaluationResult`](super::EvaluationResult)
//! was reached.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AttributeValue, Attributes};

use super::{ConditionOperator, EvaluationReason, VariationValue};

/// Details about a flag evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct EvaluationDetails {
    pub flag_key: String,
    pub context_attributes: Attributes,
    /// Sticky key used for bucketing. `None` for anonymous contexts or if no rule was evaluated.
    pub sticky_key: Option<String>,
    /// Timestamp when the flag was evaluated.
    pub timestamp: DateTime<Utc>,

    pub variation: Option<VariationValue>,
    pub rule_id: Option<String>,
    pub reason: Option<EvaluationReason>,

    /// Evaluation details for all rules, in rule order.
    pub rules: Vec<RuleEvaluationDetails>,
}

/// How a single targeting rule was evaluated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct RuleEvaluationDetails {
    pub rule_id: String,
    /// 1-based position of the rule.
    pub order_position: usize,
    pub rule_evaluation_code: RuleEvaluationCode,
    /// Why the rule could not be evaluated (only for [`RuleEvaluationCode::InvalidRule`]).
    pub error: Option<String>,
    /// Conditions up to and including the first failing one.
    pub evaluated_conditions: Vec<ConditionEvaluationDetails>,
    /// Rollout bucket of the context, if one was computed.
    pub bucket: Option<u32>,
}

/// Outcome of a single targeting rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleEvaluationCode {
    /// The rule was not evaluated because a previous rule matched, or the flag is archived or has
    /// targeting disabled.
    Unevaluated,
    /// The context matched all conditions and fell into the rollout.
    Match,
    /// One of the conditions did not match.
    FailingCondition,
    /// The context matched all conditions but fell outside of the rollout.
    RolloutMiss,
    /// The rule is malformed and was skipped.
    InvalidRule,
}

/// How a single condition was evaluated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ConditionEvaluationDetails {
    pub attribute: String,
    pub operator: ConditionOperator,
    /// Attribute value seen in the context. `None` if absent.
    pub attribute_value: Option<AttributeValue>,
    pub matched: bool,
}
