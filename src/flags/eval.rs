use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{Context, DEFAULT_STICKY_KEY_ATTRIBUTES};

use super::{
    compiled::CompiledFlag,
    eval_details::{EvaluationDetails, RuleEvaluationCode},
    eval_details_builder::EvalDetailsBuilder,
    eval_visitor::{EvalRuleVisitor, EvalVisitor, NoopEvalVisitor},
    Flag, FlagStatus, InvalidFlagError, TargetingRule, VariationValue,
};

/// Result of evaluating a flag for a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Served payload.
    pub variation: VariationValue,
    /// Id of the rule that produced `variation`. `None` when the default was served.
    pub rule_id: Option<String>,
    #[allow(missing_docs)]
    pub reason: EvaluationReason,
}

/// Why a particular variation was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationReason {
    /// A targeting rule matched and the context fell into its rollout.
    RuleMatch,
    /// No rule activated; the flag default was served.
    Default,
    /// The flag is archived; the flag default was served without looking at rules.
    FlagArchived,
    /// Targeting is disabled; the flag default was served without looking at rules.
    TargetingDisabled,
    /// No rule activated and at least one malformed rule was skipped; the flag default was
    /// served.
    Error,
}

/// Compile `flag` with its ordered `rules` and evaluate it for `context`.
///
/// The sticky key is resolved from [`DEFAULT_STICKY_KEY_ATTRIBUTES`] unless the context carries an
/// explicit one. Fails only if the flag itself is malformed.
pub fn evaluate(
    flag: &Flag,
    rules: &[TargetingRule],
    context: &Context,
) -> Result<EvaluationResult, InvalidFlagError> {
    Ok(CompiledFlag::compile(flag, rules)?.evaluate(context, &DEFAULT_STICKY_KEY_ATTRIBUTES))
}

/// Same as [`evaluate`] but also explains how the result was reached.
pub fn evaluate_details(
    flag: &Flag,
    rules: &[TargetingRule],
    context: &Context,
) -> Result<(EvaluationResult, EvaluationDetails), InvalidFlagError> {
    Ok(CompiledFlag::compile(flag, rules)?
        .evaluate_details(context, &DEFAULT_STICKY_KEY_ATTRIBUTES))
}

impl CompiledFlag {
    /// Evaluate the flag for `context`.
    ///
    /// Rules are tried in order; the first one whose conditions all match and whose rollout
    /// includes the context wins. Evaluation never fails: malformed rules are skipped and
    /// reported through [`EvaluationReason::Error`] if the default ends up being served.
    pub fn evaluate<S: AsRef<str>>(
        &self,
        context: &Context,
        sticky_key_attributes: &[S],
    ) -> EvaluationResult {
        self.evaluate_with_visitor(context, sticky_key_attributes, &mut NoopEvalVisitor)
    }

    /// Evaluate the flag for `context`, recording how every rule was evaluated.
    pub fn evaluate_details<S: AsRef<str>>(
        &self,
        context: &Context,
        sticky_key_attributes: &[S],
    ) -> (EvaluationResult, EvaluationDetails) {
        let mut builder = EvalDetailsBuilder::new(
            self.key.clone(),
            context.attributes().clone(),
            Utc::now(),
        );
        let result = self.evaluate_with_visitor(context, sticky_key_attributes, &mut builder);
        (result, builder.build())
    }

    fn evaluate_with_visitor<S: AsRef<str>, V: EvalVisitor>(
        &self,
        context: &Context,
        sticky_key_attributes: &[S],
        visitor: &mut V,
    ) -> EvaluationResult {
        visitor.on_flag(self);

        let result = self.eval(context, sticky_key_attributes, visitor);

        visitor.on_result(&result);

        log::trace!(target: "flagforge",
                    flag_key:display = self.key,
                    rule_id:serde = result.rule_id,
                    reason:serde = result.reason,
                    variation:serde = result.variation;
                    "evaluated a flag");

        result
    }

    fn eval<S: AsRef<str>, V: EvalVisitor>(
        &self,
        context: &Context,
        sticky_key_attributes: &[S],
        visitor: &mut V,
    ) -> EvaluationResult {
        if self.status == FlagStatus::Archived {
            return self.default_result(EvaluationReason::FlagArchived);
        }
        if !self.targeting_enabled {
            return self.default_result(EvaluationReason::TargetingDisabled);
        }

        let sticky_key = context.sticky_key(sticky_key_attributes);
        visitor.on_sticky_key(sticky_key.as_deref());

        let mut skipped_invalid_rule = false;
        for rule in self.rules.iter() {
            let mut rule_visitor = visitor.visit_rule(rule);

            let target = match &rule.result {
                Ok(target) => target,
                Err(err) => {
                    log::trace!(target: "flagforge",
                                flag_key:display = self.key,
                                rule_id:display = rule.id;
                                "skipping invalid targeting rule: {err}");
                    skipped_invalid_rule = true;
                    rule_visitor.on_result(RuleEvaluationCode::InvalidRule);
                    continue;
                }
            };

            if !target.matches_with_visitor(context, &mut rule_visitor) {
                rule_visitor.on_result(RuleEvaluationCode::FailingCondition);
                continue;
            }

            let bucketing = target.rollout.bucket(sticky_key.as_deref());
            rule_visitor.on_bucketing(bucketing);
            if !bucketing.included {
                rule_visitor.on_result(RuleEvaluationCode::RolloutMiss);
                continue;
            }

            rule_visitor.on_result(RuleEvaluationCode::Match);
            return EvaluationResult {
                variation: target.value.clone(),
                rule_id: Some(rule.id.clone()),
                reason: EvaluationReason::RuleMatch,
            };
        }

        self.default_result(if skipped_invalid_rule {
            EvaluationReason::Error
        } else {
            EvaluationReason::Default
        })
    }

    fn default_result(&self, reason: EvaluationReason) -> EvaluationResult {
        EvaluationResult {
            variation: self.default_value.clone(),
            rule_id: None,
            reason,
        }
    }
}
