use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use derive_more::From;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[allow(missing_docs)]
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Key of the rule variation served when a rule has no explicit `variation_key`.
pub const DEFAULT_RULE_VARIATION_KEY: &str = "on";

/// Declared type of a flag's variation payloads.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum FlagType {
    Boolean,
    String,
    Number,
    Json,
}

impl FlagType {
    /// Try to convert a raw JSON payload into a [`VariationValue`] of this type.
    pub(crate) fn parse_payload(self, payload: &serde_json::Value) -> Option<VariationValue> {
        Some(match self {
            FlagType::Boolean => VariationValue::Boolean(payload.as_bool()?),
            FlagType::String => VariationValue::String(payload.as_str()?.to_owned()),
            FlagType::Number => VariationValue::Number(payload.as_f64()?),
            FlagType::Json => VariationValue::Json(Arc::new(payload.clone())),
        })
    }

    /// Payloads a freshly created flag of this type starts with, as `(on, off)`.
    fn initial_payloads(self) -> (serde_json::Value, serde_json::Value) {
        match self {
            FlagType::Boolean => (true.into(), false.into()),
            FlagType::String => ("on".into(), "off".into()),
            FlagType::Number => (1.into(), 0.into()),
            FlagType::Json => (serde_json::json!({}), serde_json::json!({})),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum FlagStatus {
    #[default]
    Active,
    Archived,
}

/// Which of the flag's two default payloads is served when no rule activates.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum DefaultState {
    On,
    #[default]
    Off,
}

/// A variation payload, typed according to the flag's [`FlagType`].
///
/// Serialized untagged, so it reads as the plain payload. Deserializing picks the first variant
/// that fits the payload, which loses the flag type: a `Json` scalar such as `1` comes back as
/// `Number`. Evaluation never deserializes variations directly; payloads are typed against the
/// flag's [`FlagType`] when the flag is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariationValue {
    /// Payload of a boolean flag.
    Boolean(bool),
    /// Payload of a number flag.
    Number(f64),
    /// Payload of a string flag.
    String(String),
    /// Payload of a JSON flag.
    Json(Arc<serde_json::Value>),
}

impl VariationValue {
    #[allow(missing_docs)]
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[allow(missing_docs)]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

/// A feature flag scoped to a project and environment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Flag {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    #[serde(default)]
    pub status: FlagStatus,
    /// When `false`, targeting rules are ignored and the default is served.
    #[serde(default = "default_targeting_enabled")]
    pub targeting_enabled: bool,
    #[serde(default)]
    pub default_state: DefaultState,
    pub default_on: serde_json::Value,
    pub default_off: serde_json::Value,
    pub project_id: String,
    pub environment: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub updated_by: String,
}

fn default_targeting_enabled() -> bool {
    true
}

impl Flag {
    /// Create a new active flag with a generated id, `off` default state and type-appropriate
    /// default payloads.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        flag_type: FlagType,
        project_id: impl Into<String>,
        environment: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Flag {
        let now = Utc::now();
        let created_by = created_by.into();
        let (default_on, default_off) = flag_type.initial_payloads();
        Flag {
            id: Uuid::new_v4().to_string(),
            key: key.into(),
            name: name.into(),
            description: String::new(),
            flag_type,
            status: FlagStatus::Active,
            targeting_enabled: true,
            default_state: DefaultState::Off,
            default_on,
            default_off,
            project_id: project_id.into(),
            environment: environment.into(),
            created_at: now,
            updated_at: now,
            updated_by: created_by.clone(),
            created_by,
        }
    }

    /// Replace the mutable part of the flag with `next`, keeping identity, ownership and creation
    /// fields of `self` and bumping `updated_at`.
    pub fn replaced_with(&self, next: Flag, updated_by: impl Into<String>) -> Flag {
        Flag {
            id: self.id.clone(),
            key: self.key.clone(),
            project_id: self.project_id.clone(),
            environment: self.environment.clone(),
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            updated_at: Utc::now().max(self.updated_at),
            updated_by: updated_by.into(),
            ..next
        }
    }

    /// Return an archived copy of the flag. Flags are never deleted.
    pub fn archived(&self, updated_by: impl Into<String>) -> Flag {
        self.replaced_with(
            Flag {
                status: FlagStatus::Archived,
                ..self.clone()
            },
            updated_by,
        )
    }

    /// Raw payload selected by `default_state`.
    pub fn default_payload(&self) -> &serde_json::Value {
        match self.default_state {
            DefaultState::On => &self.default_on,
            DefaultState::Off => &self.default_off,
        }
    }
}

/// An ordered, conditional override of a flag's default.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct TargetingRule {
    pub id: String,
    pub flag_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// All conditions must match. An empty list matches every context.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub variations: HashMap<String, serde_json::Value>,
    /// Key into `variations` served when the rule activates.
    #[serde(default = "default_variation_key")]
    pub variation_key: String,
    #[serde(default)]
    pub rollout: Rollout,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn default_variation_key() -> String {
    DEFAULT_RULE_VARIATION_KEY.to_owned()
}

impl TargetingRule {
    /// Create a rule for `flag` serving `payload` under the default variation key, with no
    /// conditions and a 100% rollout.
    pub fn new(flag: &Flag, name: impl Into<String>, payload: impl Into<serde_json::Value>) -> Self {
        let now = Utc::now();
        TargetingRule {
            id: Uuid::new_v4().to_string(),
            flag_id: flag.id.clone(),
            name: name.into(),
            description: String::new(),
            conditions: Vec::new(),
            variations: [(default_variation_key(), payload.into())].into(),
            variation_key: default_variation_key(),
            rollout: Rollout::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[allow(missing_docs)]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[allow(missing_docs)]
    pub fn with_rollout(mut self, percentage: f64, seed: i64) -> Self {
        self.rollout = Rollout { percentage, seed };
        self
    }
}

/// `Condition` is a check that the context `attribute` matches the condition `value` under the
/// given `operator`.
///
/// The operator is kept as authored; it is parsed into a [`ConditionOperator`] when the rule is
/// compiled, so an unknown operator only invalidates its own rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Condition {
    pub attribute: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
}

impl Condition {
    #[allow(missing_docs)]
    pub fn new(
        attribute: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Condition {
        Condition {
            attribute: attribute.into(),
            operator: operator.as_str().to_owned(),
            value: Some(value.into()),
        }
    }

    /// Create a condition without a value (`exists`/`not_exists`).
    pub fn presence(attribute: impl Into<String>, operator: ConditionOperator) -> Condition {
        Condition {
            attribute: attribute.into(),
            operator: operator.as_str().to_owned(),
            value: None,
        }
    }
}

/// Supported condition operators.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Type-aware equality.
    Equals,
    /// Attribute is present and not equal.
    NotEquals,
    /// Substring of a string attribute or element of a list attribute.
    Contains,
    /// Attribute is one of the listed values.
    In,
    /// Attribute is present and none of the listed values.
    NotIn,
    /// Numeric comparison.
    GreaterThan,
    /// Numeric comparison.
    GreaterThanOrEqual,
    /// Numeric comparison.
    LessThan,
    /// Numeric comparison.
    LessThanOrEqual,
    /// String attribute matches the regex.
    MatchesRegex,
    /// String attribute does not match the regex.
    NotMatchesRegex,
    /// Attribute is present. Condition value is ignored.
    Exists,
    /// Attribute is absent. Condition value is ignored.
    NotExists,
}

impl ConditionOperator {
    #[allow(missing_docs)]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThan => "less_than",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::MatchesRegex => "matches_regex",
            Self::NotMatchesRegex => "not_matches_regex",
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
        }
    }
}

impl std::str::FromStr for ConditionOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "contains" => Self::Contains,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "greater_than" => Self::GreaterThan,
            "greater_than_or_equal" => Self::GreaterThanOrEqual,
            "less_than" => Self::LessThan,
            "less_than_or_equal" => Self::LessThanOrEqual,
            "matches_regex" => Self::MatchesRegex,
            "not_matches_regex" => Self::NotMatchesRegex,
            "exists" => Self::Exists,
            "not_exists" => Self::NotExists,
            _ => return Err(()),
        })
    }
}

/// Scalar value a condition compares against.
#[derive(Debug, Serialize, Deserialize, PartialEq, From, Clone)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum ConditionValue {
    Single(Value),
    Multiple(Vec<Value>),
}

impl From<Value> for ConditionValue {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}
impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        Self::Single(value.into())
    }
}
impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        Self::Single(value.into())
    }
}
impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        Self::Single(value.into())
    }
}
impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Single(value.into())
    }
}
impl From<Vec<Value>> for ConditionValue {
    fn from(value: Vec<Value>) -> Self {
        Self::Multiple(value)
    }
}

/// Percentage-based gradual activation of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rollout {
    /// Share of matching contexts that activate the rule, in `[0.0, 100.0]`.
    pub percentage: f64,
    /// Decorrelates bucketing of independent rollouts over the same population.
    #[serde(default)]
    pub seed: i64,
}

impl Default for Rollout {
    fn default() -> Self {
        Rollout {
            percentage: 100.0,
            seed: 0,
        }
    }
}

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
///
/// This isolates errors in a subtree: if one flag record (or one rule) is malformed, the rest of
/// the configuration is still usable.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}
impl<T> From<T> for TryParse<T> {
    fn from(value: T) -> Self {
        TryParse::Parsed(value)
    }
}
impl<'a, T> From<&'a TryParse<T>> for Result<&'a T, &'a serde_json::Value> {
    fn from(value: &'a TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Ok(v),
            TryParse::ParseFailed(v) => Err(v),
        }
    }
}
