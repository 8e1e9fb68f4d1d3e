use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    flags::{EvaluationReason, EvaluationResult, VariationValue},
    Attributes,
};

/// A flag evaluation served by [`Client`](crate::Client).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationEvent {
    /// Key of the evaluated flag.
    pub flag_key: String,
    /// Id of the matching rule. `None` if the default was served.
    pub rule_id: Option<String>,
    #[allow(missing_docs)]
    pub reason: EvaluationReason,
    /// Served payload.
    pub variation: VariationValue,
    /// Sticky key the context was bucketed by.
    pub sticky_key: Option<String>,
    /// Attributes of the evaluated context.
    pub context_attributes: Attributes,
    /// RFC 3339 timestamp of the evaluation.
    pub timestamp: String,
    /// Library metadata (e.g., `flagforgeVersion`).
    pub meta_data: HashMap<String, String>,
}

impl EvaluationEvent {
    pub(crate) fn new(
        flag_key: &str,
        result: &EvaluationResult,
        sticky_key: Option<String>,
        context_attributes: Attributes,
    ) -> EvaluationEvent {
        EvaluationEvent {
            flag_key: flag_key.to_owned(),
            rule_id: result.rule_id.clone(),
            reason: result.reason,
            variation: result.variation.clone(),
            sticky_key,
            context_attributes,
            timestamp: chrono::Utc::now().to_rfc3339(),
            meta_data: [(
                "flagforgeVersion".to_owned(),
                env!("CARGO_PKG_VERSION").to_owned(),
            )]
            .into(),
        }
    }
}

/// Receiver of [`EvaluationEvent`]s, e.g. to record exposures in a data warehouse.
///
/// Implemented for closures taking an event.
pub trait EvaluationLogger {
    /// Called for every evaluation served by the client.
    fn log_evaluation(&self, event: EvaluationEvent);
}

pub(crate) struct NoopEvaluationLogger;
impl EvaluationLogger for NoopEvaluationLogger {
    fn log_evaluation(&self, _event: EvaluationEvent) {}
}

impl<T: Fn(EvaluationEvent)> EvaluationLogger for T {
    fn log_evaluation(&self, event: EvaluationEvent) {
        self(event);
    }
}
