use crate::{AttributeValue, Context};

use super::{
    compiled::{compile_condition, CompiledCondition, ConditionCheck, RuleTarget},
    eval_visitor::EvalRuleVisitor,
    Condition, InvalidRuleError, TargetingRule, Value,
};

impl RuleTarget {
    /// Return `true` if all conditions match `context`. Stops at the first failing condition.
    pub(super) fn matches_with_visitor<V: EvalRuleVisitor>(
        &self,
        context: &Context,
        visitor: &mut V,
    ) -> bool {
        self.conditions.iter().all(|condition| {
            let attribute = context.get(&condition.attribute);
            let matched = condition.check.eval(attribute);
            visitor.on_condition(condition, attribute, matched);
            matched
        })
    }
}

impl CompiledCondition {
    pub(crate) fn eval(&self, context: &Context) -> bool {
        self.check.eval(context.get(&self.attribute))
    }
}

impl Condition {
    /// Compile and evaluate a single condition against `context`.
    ///
    /// Fails only if the condition itself is malformed. A missing attribute is a non-match.
    pub fn evaluate(&self, context: &Context) -> Result<bool, InvalidRuleError> {
        Ok(compile_condition(self)?.eval(context))
    }
}

impl TargetingRule {
    /// Return `true` if every condition of the rule matches `context`, ignoring the rollout.
    ///
    /// Fails if any condition is malformed.
    pub fn matches(&self, context: &Context) -> Result<bool, InvalidRuleError> {
        let conditions = self
            .conditions
            .iter()
            .map(compile_condition)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conditions.iter().all(|condition| condition.eval(context)))
    }
}

impl ConditionCheck {
    /// Apply the check to an attribute. Absent attributes only satisfy `not_exists`.
    fn eval(&self, attribute: Option<&AttributeValue>) -> bool {
        let Some(attribute) = attribute else {
            return matches!(self, Self::NotExists);
        };

        match self {
            Self::Exists => true,
            Self::NotExists => false,

            Self::Equals(value) => equals(attribute, value),
            Self::NotEquals(value) => !equals(attribute, value),

            Self::Contains(needle) => match attribute {
                AttributeValue::String(s) => s.contains(needle.as_str()),
                AttributeValue::List(items) => items.iter().any(|item| item == needle),
                _ => false,
            },

            Self::In(values) => is_one_of(attribute, values),
            Self::NotIn(values) => !is_one_of(attribute, values),

            Self::GreaterThan(n) => attribute.as_number().is_some_and(|a| a > *n),
            Self::GreaterThanOrEqual(n) => attribute.as_number().is_some_and(|a| a >= *n),
            Self::LessThan(n) => attribute.as_number().is_some_and(|a| a < *n),
            Self::LessThanOrEqual(n) => attribute.as_number().is_some_and(|a| a <= *n),

            Self::Matches(regex) => attribute.as_str().is_some_and(|s| regex.is_match(s)),
            Self::NotMatches(regex) => attribute.as_str().is_some_and(|s| !regex.is_match(s)),
        }
    }
}

/// Type-aware equality. Values of different types are never equal.
fn equals(attribute: &AttributeValue, value: &Value) -> bool {
    match (attribute, value) {
        (AttributeValue::String(a), Value::String(b)) => a == b,
        (AttributeValue::Number(a), Value::Number(b)) => a == b,
        (AttributeValue::Boolean(a), Value::Boolean(b)) => a == b,
        _ => false,
    }
}

/// Scalars are members if equal to one of `values`; lists if any of their elements is.
fn is_one_of(attribute: &AttributeValue, values: &[Value]) -> bool {
    match attribute {
        AttributeValue::List(items) => items
            .iter()
            .any(|item| values.iter().any(|v| matches!(v, Value::String(s) if s == item))),
        _ => values.iter().any(|v| equals(attribute, v)),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        flags::{
            compiled::{compile_condition, ConditionCheck},
            Condition, ConditionOperator, ConditionValue, Flag, FlagType, TargetingRule, Value,
        },
        AttributeValue, Context,
    };

    fn check(operator: ConditionOperator, value: impl Into<ConditionValue>) -> ConditionCheck {
        compile_condition(&Condition::new("attribute", operator, value))
            .unwrap()
            .check
    }

    fn list(values: &[&str]) -> AttributeValue {
        AttributeValue::List(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn equals() {
        let us = check(ConditionOperator::Equals, "US");
        assert!(us.eval(Some(&"US".into())));
        assert!(!us.eval(Some(&"us".into())));
        assert!(!us.eval(Some(&1.0.into())));

        let ten = check(ConditionOperator::Equals, 10.0);
        assert!(ten.eval(Some(&10.0.into())));
        assert!(!ten.eval(Some(&"10".into())));

        assert!(check(ConditionOperator::Equals, true).eval(Some(&true.into())));
    }

    #[test]
    fn not_equals() {
        let us = check(ConditionOperator::NotEquals, "US");
        assert!(!us.eval(Some(&"US".into())));
        assert!(us.eval(Some(&"CA".into())));
        assert!(us.eval(Some(&5.0.into())));
        assert!(!us.eval(None));
    }

    #[test]
    fn contains() {
        let gmail = check(ConditionOperator::Contains, "@gmail.");
        assert!(gmail.eval(Some(&"alice@gmail.com".into())));
        assert!(!gmail.eval(Some(&"alice@example.com".into())));

        let beta = check(ConditionOperator::Contains, "beta");
        assert!(beta.eval(Some(&list(&["staff", "beta"]))));
        assert!(!beta.eval(Some(&list(&["staff", "beta-2"]))));
        assert!(!beta.eval(Some(&true.into())));
    }

    #[test]
    fn in_list() {
        let countries = check(
            ConditionOperator::In,
            vec![Value::from("US"), Value::from("CA")],
        );
        assert!(countries.eval(Some(&"US".into())));
        assert!(countries.eval(Some(&"CA".into())));
        assert!(!countries.eval(Some(&"MX".into())));

        let numbers = check(ConditionOperator::In, vec![Value::from(1.0), Value::from(2.0)]);
        assert!(numbers.eval(Some(&2.0.into())));
        assert!(!numbers.eval(Some(&"2".into())));

        let groups = check(ConditionOperator::In, vec![Value::from("admins")]);
        assert!(groups.eval(Some(&list(&["staff", "admins"]))));
        assert!(!groups.eval(Some(&list(&["staff"]))));
    }

    #[test]
    fn not_in_list() {
        let countries = check(
            ConditionOperator::NotIn,
            vec![Value::from("US"), Value::from("CA")],
        );
        assert!(!countries.eval(Some(&"US".into())));
        assert!(countries.eval(Some(&"MX".into())));

        // NOT_IN fails when attribute is not specified
        assert!(!countries.eval(None));
    }

    #[test]
    fn greater_than() {
        assert!(check(ConditionOperator::GreaterThan, 18.0).eval(Some(&19.0.into())));
        assert!(!check(ConditionOperator::GreaterThan, 18.0).eval(Some(&18.0.into())));
        assert!(check(ConditionOperator::GreaterThanOrEqual, 18.0).eval(Some(&18.0.into())));
        assert!(!check(ConditionOperator::GreaterThanOrEqual, 18.0).eval(Some(&17.0.into())));
    }

    #[test]
    fn less_than() {
        assert!(check(ConditionOperator::LessThan, 18.0).eval(Some(&17.0.into())));
        assert!(!check(ConditionOperator::LessThan, 18.0).eval(Some(&18.0.into())));
        assert!(check(ConditionOperator::LessThanOrEqual, 18.0).eval(Some(&18.0.into())));
        assert!(!check(ConditionOperator::LessThanOrEqual, 18.0).eval(Some(&19.0.into())));
    }

    #[test]
    fn comparison_fails_closed_for_non_numbers() {
        for operator in [
            ConditionOperator::GreaterThan,
            ConditionOperator::GreaterThanOrEqual,
            ConditionOperator::LessThan,
            ConditionOperator::LessThanOrEqual,
        ] {
            let check = check(operator, 18.0);
            assert!(!check.eval(Some(&"20".into())));
            assert!(!check.eval(Some(&"10".into())));
            assert!(!check.eval(Some(&true.into())));
            assert!(!check.eval(Some(&list(&["20"]))));
        }
    }

    #[test]
    fn matches_regex() {
        let test = check(ConditionOperator::MatchesRegex, "^test.*");
        assert!(test.eval(Some(&"test@example.com".into())));
        assert!(!test.eval(Some(&"example@test.com".into())));
        assert!(!test.eval(Some(&10.0.into())));
    }

    #[test]
    fn not_matches_regex() {
        let test = check(ConditionOperator::NotMatchesRegex, "^test.*");
        assert!(!test.eval(Some(&"test@example.com".into())));
        assert!(!test.eval(None));
        assert!(test.eval(Some(&"example@test.com".into())));
    }

    #[test]
    fn exists() {
        let exists = compile_condition(&Condition::presence("email", ConditionOperator::Exists))
            .unwrap()
            .check;
        assert!(exists.eval(Some(&"a@b.c".into())));
        assert!(!exists.eval(None));

        let not_exists =
            compile_condition(&Condition::presence("email", ConditionOperator::NotExists))
                .unwrap()
                .check;
        assert!(!not_exists.eval(Some(&"a@b.c".into())));
        assert!(not_exists.eval(None));
    }

    #[test]
    fn absent_attribute_is_non_match() {
        let checks = [
            check(ConditionOperator::Equals, "x"),
            check(ConditionOperator::NotEquals, "x"),
            check(ConditionOperator::Contains, "x"),
            check(ConditionOperator::In, vec![Value::from("x")]),
            check(ConditionOperator::NotIn, vec![Value::from("x")]),
            check(ConditionOperator::GreaterThan, 1.0),
            check(ConditionOperator::GreaterThanOrEqual, 1.0),
            check(ConditionOperator::LessThan, 1.0),
            check(ConditionOperator::LessThanOrEqual, 1.0),
            check(ConditionOperator::MatchesRegex, ".*"),
            check(ConditionOperator::NotMatchesRegex, "x"),
            check(ConditionOperator::Exists, true),
        ];
        for check in checks {
            assert!(!check.eval(None), "{check:?} should not match");
        }
    }

    #[test]
    fn null_attribute_is_absent() {
        let context = Context::from([("plan", AttributeValue::Null)]);
        let condition = Condition::new("plan", ConditionOperator::NotEquals, "pro");
        assert!(!condition.evaluate(&context).unwrap());
        let condition = Condition::presence("plan", ConditionOperator::NotExists);
        assert!(condition.evaluate(&context).unwrap());
    }

    #[test]
    fn unknown_operator_is_an_error() {
        let condition = Condition {
            attribute: "country".to_owned(),
            operator: "approximately".to_owned(),
            value: Some("US".into()),
        };
        assert!(condition.evaluate(&Context::default()).is_err());
    }

    fn rule(conditions: Vec<Condition>) -> TargetingRule {
        let flag = Flag::new("f", "F", FlagType::Boolean, "p", "production", "alice");
        TargetingRule {
            conditions,
            ..TargetingRule::new(&flag, "rule", true)
        }
    }

    #[test]
    fn empty_rule() {
        let rule = rule(vec![]);
        assert!(rule.matches(&Context::default()).unwrap());
    }

    #[test]
    fn single_condition_rule() {
        let rule = rule(vec![Condition::new(
            "age",
            ConditionOperator::GreaterThan,
            10.0,
        )]);
        assert!(rule.matches(&Context::from([("age", 11.0)])).unwrap());
    }

    #[test]
    fn two_condition_rule() {
        let rule = rule(vec![
            Condition::new("age", ConditionOperator::GreaterThan, 18.0),
            Condition::new("age", ConditionOperator::LessThan, 100.0),
        ]);
        assert!(rule.matches(&Context::from([("age", 20.0)])).unwrap());
        assert!(!rule.matches(&Context::from([("age", 17.0)])).unwrap());
        assert!(!rule.matches(&Context::from([("age", 110.0)])).unwrap());
    }

    #[test]
    fn missing_attribute() {
        let rule = rule(vec![Condition::new(
            "age",
            ConditionOperator::GreaterThan,
            10.0,
        )]);
        assert!(!rule.matches(&Context::from([("name", "alice")])).unwrap());
    }
}
