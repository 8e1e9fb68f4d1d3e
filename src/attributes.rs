use std::{borrow::Cow, collections::HashMap};

use derive_more::From;
use serde::{Deserialize, Serialize};

/// Type alias for a HashMap representing key-value pairs of context attributes.
///
/// # Examples
/// ```
/// # use flagforge::{Attributes, AttributeValue};
/// let attributes = [
///     ("userId".to_owned(), "u1".into()),
///     ("age".to_owned(), 30.0.into()),
///     ("beta".to_owned(), true.into()),
/// ].into_iter().collect::<Attributes>();
/// ```
pub type Attributes = HashMap<String, AttributeValue>;

/// Attributes that are consulted, in order, when a context does not carry an explicit sticky key.
pub const DEFAULT_STICKY_KEY_ATTRIBUTES: [&str; 3] = ["userId", "deviceId", "sessionId"];

/// Enum representing possible values of a context attribute.
///
/// Conveniently implements `From` conversions for `String`, `&str`, `f64`, `bool`, and
/// `Vec<String>`.
#[derive(Debug, Serialize, Deserialize, PartialEq, PartialOrd, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// An ordered list of strings (e.g., a user's groups).
    List(Vec<String>),
    /// A null value. Treated the same as an absent attribute.
    Null,
}

impl AttributeValue {
    /// Return the string slice if the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    /// Return the number if the value is a number.
    pub fn as_number(&self) -> Option<f64> {
        if let AttributeValue::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// The entity (user, device, session) a flag is evaluated for.
///
/// A context is assembled by the caller from request attributes and is only ever read by the
/// engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default)]
    attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sticky_key: Option<String>,
}

impl Context {
    /// Create a context from the given attributes.
    pub fn new(attributes: Attributes) -> Context {
        Context {
            attributes,
            sticky_key: None,
        }
    }

    /// Use `sticky_key` for rollout bucketing instead of deriving it from attributes.
    pub fn with_sticky_key(mut self, sticky_key: impl Into<String>) -> Context {
        self.sticky_key = Some(sticky_key.into());
        self
    }

    /// Look up an attribute. Null attributes are reported as absent.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .get(key)
            .filter(|value| **value != AttributeValue::Null)
    }

    /// All attributes of the context, as supplied by the caller.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Resolve the stable identifier used for rollout bucketing.
    ///
    /// An explicit sticky key always wins. Otherwise, the first attribute from `precedence` that
    /// holds a string or a number is used. Returns `None` for anonymous contexts.
    pub fn sticky_key<S: AsRef<str>>(&self, precedence: &[S]) -> Option<Cow<'_, str>> {
        if let Some(key) = &self.sticky_key {
            return Some(Cow::Borrowed(key));
        }

        precedence
            .iter()
            .find_map(|attribute| match self.get(attribute.as_ref())? {
                AttributeValue::String(s) => Some(Cow::Borrowed(s.as_str())),
                AttributeValue::Number(n) => Some(Cow::Owned(n.to_string())),
                _ => None,
            })
    }
}

impl From<Attributes> for Context {
    fn from(attributes: Attributes) -> Self {
        Context::new(attributes)
    }
}

impl<K: Into<String>, V: Into<AttributeValue>, const N: usize> From<[(K, V); N]> for Context {
    fn from(value: [(K, V); N]) -> Self {
        Context::new(
            value
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
