use crate::AttributeValue;

use super::{
    compiled::{CompiledCondition, CompiledFlag, CompiledRule},
    eval_details::RuleEvaluationCode,
    rollout::Bucketing,
    EvaluationResult,
};

pub(super) trait EvalVisitor {
    // Type-foo here basically means that RuleVisitor may hold references to EvalVisitor but should
    // not outlive it.
    type RuleVisitor<'a>: EvalRuleVisitor + 'a
    where
        Self: 'a;

    #[allow(unused_variables)]
    #[inline]
    fn on_flag(&mut self, flag: &CompiledFlag) {}

    /// Called once the sticky key has been resolved (only if any rule may be evaluated).
    #[allow(unused_variables)]
    #[inline]
    fn on_sticky_key(&mut self, sticky_key: Option<&str>) {}

    fn visit_rule<'a>(&'a mut self, rule: &CompiledRule) -> Self::RuleVisitor<'a>;

    /// Called with evaluation result.
    #[allow(unused_variables)]
    #[inline]
    fn on_result(&mut self, result: &EvaluationResult) {}
}

pub(super) trait EvalRuleVisitor {
    #[allow(unused_variables)]
    #[inline]
    fn on_condition(
        &mut self,
        condition: &CompiledCondition,
        attribute_value: Option<&AttributeValue>,
        matched: bool,
    ) {
    }

    #[allow(unused_variables)]
    #[inline]
    fn on_bucketing(&mut self, bucketing: Bucketing) {}

    #[allow(unused_variables)]
    #[inline]
    fn on_result(&mut self, code: RuleEvaluationCode) {}
}

/// Dummy visitor that does nothing.
///
/// It is designed so that all calls to it are optimized away (zero-cost).
pub(super) struct NoopEvalVisitor;

impl EvalVisitor for NoopEvalVisitor {
    type RuleVisitor<'a> = NoopEvalVisitor where Self: 'a;

    #[inline]
    fn visit_rule<'a>(&'a mut self, _rule: &CompiledRule) -> Self::RuleVisitor<'a> {
        NoopEvalVisitor
    }
}

impl EvalRuleVisitor for NoopEvalVisitor {}
