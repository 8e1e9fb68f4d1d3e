use chrono::{DateTime, Utc};

use crate::{AttributeValue, Attributes};

use super::{
    compiled::{CompiledCondition, CompiledFlag, CompiledRule},
    eval_details::*,
    eval_visitor::*,
    rollout::Bucketing,
    EvaluationResult,
};

pub(super) struct EvalDetailsBuilder {
    flag_key: String,
    context_attributes: Attributes,
    now: DateTime<Utc>,

    sticky_key: Option<String>,
    result: Option<EvaluationResult>,

    /// `(rule_id, error)` of every rule in order. Used to fill in unevaluated rules.
    rule_order: Vec<(String, Option<String>)>,
    rules: Vec<RuleEvaluationDetails>,
}

pub(super) struct EvalRuleDetailsBuilder<'a> {
    rule_details: &'a mut RuleEvaluationDetails,
}

impl EvalDetailsBuilder {
    pub fn new(
        flag_key: String,
        context_attributes: Attributes,
        now: DateTime<Utc>,
    ) -> EvalDetailsBuilder {
        EvalDetailsBuilder {
            flag_key,
            context_attributes,
            now,
            sticky_key: None,
            result: None,
            rule_order: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn build(self) -> EvaluationDetails {
        let mut evaluated = self.rules.into_iter();
        let rules = self
            .rule_order
            .into_iter()
            .enumerate()
            .map(|(i, (rule_id, error))| match evaluated.next() {
                Some(details) => details,
                None => RuleEvaluationDetails {
                    rule_id,
                    order_position: i + 1,
                    rule_evaluation_code: RuleEvaluationCode::Unevaluated,
                    error,
                    evaluated_conditions: Vec::new(),
                    bucket: None,
                },
            })
            .collect();

        let (variation, rule_id, reason) = match self.result {
            Some(result) => (Some(result.variation), result.rule_id, Some(result.reason)),
            None => (None, None, None),
        };

        EvaluationDetails {
            flag_key: self.flag_key,
            context_attributes: self.context_attributes,
            sticky_key: self.sticky_key,
            timestamp: self.now,
            variation,
            rule_id,
            reason,
            rules,
        }
    }
}

impl EvalVisitor for EvalDetailsBuilder {
    type RuleVisitor<'a> = EvalRuleDetailsBuilder<'a> where Self: 'a;

    fn on_flag(&mut self, flag: &CompiledFlag) {
        self.rule_order = flag
            .rules
            .iter()
            .map(|rule| {
                (
                    rule.id.clone(),
                    rule.result.as_ref().err().map(|err| err.to_string()),
                )
            })
            .collect();
    }

    fn on_sticky_key(&mut self, sticky_key: Option<&str>) {
        self.sticky_key = sticky_key.map(str::to_owned);
    }

    fn visit_rule<'a>(&'a mut self, rule: &CompiledRule) -> Self::RuleVisitor<'a> {
        let order_position = self.rules.len() + 1;
        self.rules.push(RuleEvaluationDetails {
            rule_id: rule.id.clone(),
            order_position,
            rule_evaluation_code: RuleEvaluationCode::Unevaluated,
            error: rule.result.as_ref().err().map(|err| err.to_string()),
            evaluated_conditions: Vec::new(),
            bucket: None,
        });
        EvalRuleDetailsBuilder {
            rule_details: self
                .rules
                .last_mut()
                .expect("we just inserted an element, so there must be last"),
        }
    }

    fn on_result(&mut self, result: &EvaluationResult) {
        self.result = Some(result.clone());
    }
}

impl<'a> EvalRuleVisitor for EvalRuleDetailsBuilder<'a> {
    fn on_condition(
        &mut self,
        condition: &CompiledCondition,
        attribute_value: Option<&AttributeValue>,
        matched: bool,
    ) {
        self.rule_details
            .evaluated_conditions
            .push(ConditionEvaluationDetails {
                attribute: condition.attribute.clone(),
                operator: condition.operator,
                attribute_value: attribute_value.cloned(),
                matched,
            });
    }

    fn on_bucketing(&mut self, bucketing: Bucketing) {
        self.rule_details.bucket = bucketing.bucket;
    }

    fn on_result(&mut self, code: RuleEvaluationCode) {
        self.rule_details.rule_evaluation_code = code;
    }
}
