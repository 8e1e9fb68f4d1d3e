use super::FlagType;

/// A targeting rule that cannot be evaluated.
///
/// Rule errors are detected when a flag is compiled. At evaluation time the offending rule is
/// skipped and the remaining rules are still evaluated.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum InvalidRuleError {
    /// The rule record could not be parsed.
    #[error("rule record could not be parsed")]
    ParseFailed,

    /// The rule belongs to a different flag.
    #[error("rule belongs to flag {rule_flag_id:?}, not {flag_id:?}")]
    ForeignRule {
        #[allow(missing_docs)]
        rule_flag_id: String,
        #[allow(missing_docs)]
        flag_id: String,
    },

    /// Operator is not one of the supported operators.
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),

    /// Operator requires a condition value but none was given.
    #[error("operator {operator:?} requires a value")]
    MissingConditionValue {
        #[allow(missing_docs)]
        operator: &'static str,
    },

    /// Condition value has the wrong shape for the operator (e.g., a scalar for `in`).
    #[error("invalid value for operator {operator:?}")]
    InvalidConditionValue {
        #[allow(missing_docs)]
        operator: &'static str,
    },

    /// Regex pattern of `matches_regex`/`not_matches_regex` does not compile.
    #[error("invalid pattern {pattern:?}")]
    InvalidPattern {
        #[allow(missing_docs)]
        pattern: String,
        #[allow(missing_docs)]
        #[source]
        source: regex::Error,
    },

    /// Rollout percentage is outside of `[0, 100]`.
    #[error("rollout percentage {0} is outside of [0, 100]")]
    InvalidRolloutPercentage(f64),

    /// `variation_key` does not name one of the rule's variations.
    #[error("variation {0:?} is missing")]
    MissingVariation(String),

    /// Variation payload does not match the flag type.
    #[error("variation {key:?} is not a valid {expected:?} payload")]
    VariationTypeMismatch {
        #[allow(missing_docs)]
        key: String,
        #[allow(missing_docs)]
        expected: FlagType,
    },
}

/// A flag definition that cannot be evaluated at all.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum InvalidFlagError {
    /// One of the default payloads does not match the flag type.
    #[error("default payload {which:?} is not a valid {expected:?} payload")]
    DefaultTypeMismatch {
        /// `"default_on"` or `"default_off"`.
        which: &'static str,
        #[allow(missing_docs)]
        expected: FlagType,
    },
}
