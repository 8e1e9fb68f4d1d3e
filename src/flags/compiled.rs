//! Compilation of flag records into their evaluation-ready form.
//!
//! Compilation is where configuration defects are caught: unknown operators, invalid regex
//! patterns, badly shaped condition values, out-of-range rollouts, and payloads that do not match
//! the flag type. The result is immutable and can be shared between threads.
use regex::Regex;

use super::{
    rollout::CompiledRollout, Condition, ConditionOperator, ConditionValue, DefaultState, Flag,
    FlagStatus, FlagType, InvalidFlagError, InvalidRuleError, TargetingRule, TryParse, Value,
    VariationValue,
};

/// A flag together with its ordered targeting rules, validated and ready for evaluation.
#[derive(Debug)]
pub struct CompiledFlag {
    pub(crate) id: String,
    pub(crate) key: String,
    pub(crate) flag_type: FlagType,
    pub(crate) status: FlagStatus,
    pub(crate) targeting_enabled: bool,
    /// Payload selected by the flag's default state.
    pub(crate) default_value: VariationValue,
    /// Rules in authored order. Invalid rules keep their position so that evaluation details can
    /// report them.
    pub(crate) rules: Box<[CompiledRule]>,
}

#[derive(Debug)]
pub(crate) struct CompiledRule {
    pub id: String,
    pub result: Result<RuleTarget, InvalidRuleError>,
}

#[derive(Debug)]
pub(crate) struct RuleTarget {
    pub conditions: Box<[CompiledCondition]>,
    pub rollout: CompiledRollout,
    pub value: VariationValue,
}

#[derive(Debug)]
pub(crate) struct CompiledCondition {
    pub attribute: String,
    pub operator: ConditionOperator,
    pub check: ConditionCheck,
}

#[derive(Debug)]
pub(crate) enum ConditionCheck {
    Equals(Value),
    NotEquals(Value),
    Contains(String),
    In(Box<[Value]>),
    NotIn(Box<[Value]>),
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
    Matches(Regex),
    NotMatches(Regex),
    Exists,
    NotExists,
}

impl CompiledFlag {
    /// Compile `flag` with its `rules` in evaluation order.
    ///
    /// Malformed rules do not fail compilation; they are kept as invalid and skipped during
    /// evaluation. Only a malformed flag is an error.
    pub fn compile(flag: &Flag, rules: &[TargetingRule]) -> Result<CompiledFlag, InvalidFlagError> {
        compile_flag(flag, rules.iter().map(Ok))
    }

    pub(crate) fn compile_partially_parsed(
        flag: &Flag,
        rules: &[TryParse<TargetingRule>],
    ) -> Result<CompiledFlag, InvalidFlagError> {
        compile_flag(flag, rules.iter().map(Into::into))
    }

    /// Key of the flag.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Id of the flag.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declared type of the flag.
    pub fn flag_type(&self) -> FlagType {
        self.flag_type
    }

    /// Rules that failed to compile, as `(rule_id, error)` pairs in rule order.
    pub fn invalid_rules(&self) -> impl Iterator<Item = (&str, &InvalidRuleError)> {
        self.rules
            .iter()
            .filter_map(|rule| rule.result.as_ref().err().map(|err| (rule.id.as_str(), err)))
    }
}

fn compile_flag<'a>(
    flag: &Flag,
    rules: impl IntoIterator<Item = Result<&'a TargetingRule, &'a serde_json::Value>>,
) -> Result<CompiledFlag, InvalidFlagError> {
    let default_value = {
        // Both payloads must be valid, not only the served one.
        let on = compile_default(flag.flag_type, &flag.default_on, "default_on")?;
        let off = compile_default(flag.flag_type, &flag.default_off, "default_off")?;
        match flag.default_state {
            DefaultState::On => on,
            DefaultState::Off => off,
        }
    };

    let rules = rules
        .into_iter()
        .map(|rule| {
            let compiled = match rule {
                Ok(rule) => CompiledRule {
                    id: rule.id.clone(),
                    result: compile_rule(flag, rule),
                },
                Err(json) => CompiledRule {
                    id: json
                        .get("id")
                        .and_then(|id| id.as_str())
                        .unwrap_or_default()
                        .to_owned(),
                    result: Err(InvalidRuleError::ParseFailed),
                },
            };
            if let Err(err) = &compiled.result {
                log::warn!(target: "flagforge",
                           flag_key:display = flag.key,
                           rule_id:display = compiled.id;
                           "targeting rule will be skipped: {err}");
            }
            compiled
        })
        .collect();

    Ok(CompiledFlag {
        id: flag.id.clone(),
        key: flag.key.clone(),
        flag_type: flag.flag_type,
        status: flag.status,
        targeting_enabled: flag.targeting_enabled,
        default_value,
        rules,
    })
}

fn compile_default(
    flag_type: FlagType,
    payload: &serde_json::Value,
    which: &'static str,
) -> Result<VariationValue, InvalidFlagError> {
    flag_type
        .parse_payload(payload)
        .ok_or(InvalidFlagError::DefaultTypeMismatch {
            which,
            expected: flag_type,
        })
}

fn compile_rule(flag: &Flag, rule: &TargetingRule) -> Result<RuleTarget, InvalidRuleError> {
    if rule.flag_id != flag.id {
        return Err(InvalidRuleError::ForeignRule {
            rule_flag_id: rule.flag_id.clone(),
            flag_id: flag.id.clone(),
        });
    }

    // Every variation must match the flag type, not only the served one.
    for (key, payload) in &rule.variations {
        if flag.flag_type.parse_payload(payload).is_none() {
            return Err(InvalidRuleError::VariationTypeMismatch {
                key: key.clone(),
                expected: flag.flag_type,
            });
        }
    }
    let value = rule
        .variations
        .get(&rule.variation_key)
        .and_then(|payload| flag.flag_type.parse_payload(payload))
        .ok_or_else(|| InvalidRuleError::MissingVariation(rule.variation_key.clone()))?;

    let conditions = rule
        .conditions
        .iter()
        .map(compile_condition)
        .collect::<Result<_, _>>()?;

    let rollout = CompiledRollout::compile(&flag.key, &rule.id, &rule.rollout)?;

    Ok(RuleTarget {
        conditions,
        rollout,
        value,
    })
}

pub(super) fn compile_condition(
    condition: &Condition,
) -> Result<CompiledCondition, InvalidRuleError> {
    let operator: ConditionOperator = condition
        .operator
        .parse()
        .map_err(|()| InvalidRuleError::UnknownOperator(condition.operator.clone()))?;

    let invalid = || InvalidRuleError::InvalidConditionValue {
        operator: operator.as_str(),
    };

    // Presence checks don't look at the value at all.
    let value = match operator {
        ConditionOperator::Exists | ConditionOperator::NotExists => None,
        _ => Some(
            condition
                .value
                .as_ref()
                .ok_or(InvalidRuleError::MissingConditionValue {
                    operator: operator.as_str(),
                })?,
        ),
    };

    let check = match (operator, value) {
        (ConditionOperator::Exists, _) => ConditionCheck::Exists,
        (ConditionOperator::NotExists, _) => ConditionCheck::NotExists,

        (ConditionOperator::Equals, Some(ConditionValue::Single(v))) => {
            ConditionCheck::Equals(v.clone())
        }
        (ConditionOperator::NotEquals, Some(ConditionValue::Single(v))) => {
            ConditionCheck::NotEquals(v.clone())
        }

        (ConditionOperator::Contains, Some(ConditionValue::Single(Value::String(s)))) => {
            ConditionCheck::Contains(s.clone())
        }

        (ConditionOperator::In, Some(ConditionValue::Multiple(values))) => {
            ConditionCheck::In(values.clone().into())
        }
        (ConditionOperator::NotIn, Some(ConditionValue::Multiple(values))) => {
            ConditionCheck::NotIn(values.clone().into())
        }

        (
            ConditionOperator::GreaterThan
            | ConditionOperator::GreaterThanOrEqual
            | ConditionOperator::LessThan
            | ConditionOperator::LessThanOrEqual,
            Some(ConditionValue::Single(Value::Number(n))),
        ) if n.is_finite() => match operator {
            ConditionOperator::GreaterThan => ConditionCheck::GreaterThan(*n),
            ConditionOperator::GreaterThanOrEqual => ConditionCheck::GreaterThanOrEqual(*n),
            ConditionOperator::LessThan => ConditionCheck::LessThan(*n),
            _ => ConditionCheck::LessThanOrEqual(*n),
        },

        (
            ConditionOperator::MatchesRegex | ConditionOperator::NotMatchesRegex,
            Some(ConditionValue::Single(Value::String(pattern))),
        ) => {
            let regex = Regex::new(pattern).map_err(|source| InvalidRuleError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            if operator == ConditionOperator::MatchesRegex {
                ConditionCheck::Matches(regex)
            } else {
                ConditionCheck::NotMatches(regex)
            }
        }

        _ => return Err(invalid()),
    };

    Ok(CompiledCondition {
        attribute: condition.attribute.clone(),
        operator,
        check,
    })
}
