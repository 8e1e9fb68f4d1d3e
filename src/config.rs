use crate::{
    evaluation_logger::NoopEvaluationLogger, Client, EvaluationLogger,
    DEFAULT_STICKY_KEY_ATTRIBUTES,
};

/// Configuration for [`Client`].
pub struct ClientConfig<'a> {
    pub(crate) sticky_key_attributes: Vec<String>,
    pub(crate) evaluation_logger: Box<dyn EvaluationLogger + Send + Sync + 'a>,
}

impl<'a> Default for ClientConfig<'a> {
    fn default() -> Self {
        ClientConfig::new()
    }
}

impl<'a> ClientConfig<'a> {
    /// Create a default configuration.
    ///
    /// ```
    /// # use flagforge::ClientConfig;
    /// ClientConfig::new();
    /// ```
    pub fn new() -> Self {
        ClientConfig {
            sticky_key_attributes: DEFAULT_STICKY_KEY_ATTRIBUTES
                .iter()
                .map(|attribute| attribute.to_string())
                .collect(),
            evaluation_logger: Box::new(NoopEvaluationLogger),
        }
    }

    /// Set the attributes a sticky key is derived from, in order of precedence. Defaults to
    /// [`DEFAULT_STICKY_KEY_ATTRIBUTES`].
    ///
    /// An explicit [`Context::with_sticky_key`](crate::Context::with_sticky_key) always wins.
    ///
    /// ```
    /// # use flagforge::ClientConfig;
    /// let mut config = ClientConfig::new();
    /// config.sticky_key_attributes(["accountId", "userId"]);
    /// ```
    pub fn sticky_key_attributes(
        &mut self,
        attributes: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.sticky_key_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Set evaluation logger to pass served variations to your data warehouse.
    ///
    /// ```
    /// # use flagforge::ClientConfig;
    /// let mut config = ClientConfig::new();
    /// config.evaluation_logger(|event| {
    ///   println!("{:?}", event);
    /// });
    /// ```
    pub fn evaluation_logger(
        &mut self,
        evaluation_logger: impl EvaluationLogger + Send + Sync + 'a,
    ) -> &mut Self {
        self.evaluation_logger = Box::new(evaluation_logger);
        self
    }

    /// Create a new [`Client`] using the specified configuration.
    ///
    /// ```
    /// # use flagforge::{ClientConfig, Client};
    /// let client: Client = ClientConfig::new().to_client();
    /// ```
    pub fn to_client(self) -> Client<'a> {
        Client::new(self)
    }
}
