use std::sync::Arc;

use crate::{
    configuration_store::ConfigurationStore,
    evaluation_logger::EvaluationEvent,
    flags::{CompiledFlag, EvaluationDetails, EvaluationResult},
    ClientConfig, Context, Error, Result,
};

/// A client evaluating flags against the active configuration snapshot.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// # Examples
/// ```
/// # use flagforge::{Client, ClientConfig};
/// Client::new(ClientConfig::new());
/// ```
pub struct Client<'a> {
    configuration_store: Arc<ConfigurationStore>,
    config: ClientConfig<'a>,
}

impl<'a> Client<'a> {
    /// Create a new `Client` with an empty configuration store.
    ///
    /// ```
    /// # use flagforge::{ClientConfig, Client};
    /// let client = Client::new(ClientConfig::new());
    /// ```
    pub fn new(config: ClientConfig<'a>) -> Self {
        Client::with_configuration_store(config, Arc::new(ConfigurationStore::new()))
    }

    /// Create a new `Client` reading snapshots from a store shared with the code that publishes
    /// them.
    pub fn with_configuration_store(
        config: ClientConfig<'a>,
        configuration_store: Arc<ConfigurationStore>,
    ) -> Self {
        Self {
            configuration_store,
            config,
        }
    }

    /// Store the client reads snapshots from. Publish new snapshots with
    /// [`ConfigurationStore::set_configuration`].
    pub fn configuration_store(&self) -> &Arc<ConfigurationStore> {
        &self.configuration_store
    }

    /// Evaluate flag `flag_key` for `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationMissing`](crate::Error::ConfigurationMissing) before a
    /// snapshot has been published and [`Error::FlagNotFound`](crate::Error::FlagNotFound) for
    /// unknown flags. Both are normal conditions (see [`Error::is_normal`](crate::Error::is_normal))
    /// and the caller should serve its own default.
    pub fn evaluate(&self, flag_key: &str, context: &Context) -> Result<EvaluationResult> {
        self.evaluate_inner(flag_key, context, |flag| {
            let result = flag.evaluate(context, &self.config.sticky_key_attributes);
            (result.clone(), result)
        })
    }

    /// Same as [`Client::evaluate`] but also explains how the result was reached.
    pub fn evaluate_details(
        &self,
        flag_key: &str,
        context: &Context,
    ) -> Result<(EvaluationResult, EvaluationDetails)> {
        self.evaluate_inner(flag_key, context, |flag| {
            let (result, details) =
                flag.evaluate_details(context, &self.config.sticky_key_attributes);
            (result.clone(), (result, details))
        })
    }

    fn evaluate_inner<T>(
        &self,
        flag_key: &str,
        context: &Context,
        evaluate: impl FnOnce(&CompiledFlag) -> (EvaluationResult, T),
    ) -> Result<T> {
        let result = self
            .configuration_store
            .get_configuration()
            .ok_or(Error::ConfigurationMissing)
            .and_then(|configuration| {
                let flag = configuration.get_flag(flag_key)?;
                Ok(evaluate(flag))
            });

        let (result, value) = result.inspect_err(|err| {
            if err.is_normal() {
                log::trace!(target: "flagforge",
                            flag_key,
                            context:serde = context;
                            "flag not evaluated: {err}");
            } else {
                log::warn!(target: "flagforge",
                           flag_key,
                           context:serde = context;
                           "error occurred while evaluating a flag: {err:?}");
            }
        })?;

        let event = EvaluationEvent::new(
            flag_key,
            &result,
            context
                .sticky_key(&self.config.sticky_key_attributes)
                .map(|key| key.into_owned()),
            context.attributes().clone(),
        );
        log::trace!(target: "flagforge",
                    event:serde;
                    "logging evaluation");
        self.config.evaluation_logger.log_evaluation(event);

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::{
        configuration::Configuration,
        configuration_store::ConfigurationStore,
        flags::{
            Condition, ConditionOperator, EvaluationReason, Flag, FlagType, RuleEvaluationCode,
            TargetingRule, VariationValue,
        },
        Client, ClientConfig, Context, Error, EvaluationEvent,
    };

    fn configuration() -> Configuration {
        let flag = Flag::new("checkout", "Checkout", FlagType::Boolean, "p1", "production", "alice");
        let rule = TargetingRule::new(&flag, "beta", true).with_condition(Condition::new(
            "plan",
            ConditionOperator::Equals,
            "beta",
        ));
        Configuration::from_flags(1, [(flag, vec![rule])])
    }

    #[test]
    fn fails_while_no_configuration() {
        let client = Client::new(ClientConfig::new());
        let err = client
            .evaluate("checkout", &Context::default())
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationMissing));
        assert!(err.is_normal());
    }

    #[test]
    fn returns_proper_result_once_configuration_is_set() {
        let configuration_store = Arc::new(ConfigurationStore::new());
        let client =
            Client::with_configuration_store(ClientConfig::new(), configuration_store.clone());

        // updating configuration after client is created
        configuration_store.set_configuration(configuration());

        let result = client
            .evaluate("checkout", &Context::from([("plan", "beta")]))
            .unwrap();
        assert_eq!(result.variation, VariationValue::Boolean(true));
        assert_eq!(result.reason, EvaluationReason::RuleMatch);

        let result = client
            .evaluate("checkout", &Context::from([("plan", "free")]))
            .unwrap();
        assert_eq!(result.variation, VariationValue::Boolean(false));
        assert_eq!(result.reason, EvaluationReason::Default);

        assert!(matches!(
            client.evaluate("missing", &Context::default()),
            Err(Error::FlagNotFound)
        ));
    }

    #[test]
    fn logs_evaluations() {
        let events = Mutex::new(Vec::new());
        let mut config = ClientConfig::new();
        config.evaluation_logger(|event: EvaluationEvent| events.lock().unwrap().push(event));
        let client = config.to_client();
        client.configuration_store().set_configuration(configuration());

        client
            .evaluate("checkout", &Context::from([("plan", "beta"), ("userId", "u1")]))
            .unwrap();
        let _ = client.evaluate("missing", &Context::default());
        drop(client);

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].flag_key, "checkout");
        assert_eq!(events[0].reason, EvaluationReason::RuleMatch);
        assert_eq!(events[0].sticky_key.as_deref(), Some("u1"));
        assert!(events[0].meta_data.contains_key("flagforgeVersion"));
    }

    #[test]
    fn custom_sticky_key_attributes() {
        let events = Mutex::new(Vec::new());
        let mut config = ClientConfig::new();
        config
            .sticky_key_attributes(["accountId"])
            .evaluation_logger(|event: EvaluationEvent| events.lock().unwrap().push(event));
        let client = config.to_client();
        client.configuration_store().set_configuration(configuration());

        client
            .evaluate(
                "checkout",
                &Context::from([("accountId", "a1"), ("userId", "u1")]),
            )
            .unwrap();
        drop(client);

        let events = events.into_inner().unwrap();
        assert_eq!(events[0].sticky_key.as_deref(), Some("a1"));
    }

    #[test]
    fn evaluation_details() {
        let client = ClientConfig::new().to_client();
        client.configuration_store().set_configuration(configuration());

        let (result, details) = client
            .evaluate_details("checkout", &Context::from([("plan", "free")]))
            .unwrap();
        assert_eq!(result.reason, EvaluationReason::Default);
        assert_eq!(details.reason, Some(EvaluationReason::Default));
        assert_eq!(
            details.rules[0].rule_evaluation_code,
            RuleEvaluationCode::FailingCondition
        );
    }
}
