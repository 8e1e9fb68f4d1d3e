use std::sync::Arc;

use flagforge::{Client, ClientConfig, Configuration, ConfigurationStore, Context};

const FLAGS: &str = r#"{
  "version": 1,
  "flags": [{
    "flag": {
      "id": "f1",
      "key": "new-checkout",
      "type": "boolean",
      "default_on": true,
      "default_off": false,
      "project_id": "web",
      "environment": "production",
      "created_at": "2024-05-01T10:00:00Z",
      "updated_at": "2024-05-01T10:00:00Z"
    },
    "rules": [{
      "id": "us-half",
      "flag_id": "f1",
      "conditions": [{ "attribute": "country", "operator": "equals", "value": "US" }],
      "variations": { "on": true },
      "rollout": { "percentage": 50, "seed": 1 },
      "created_at": "2024-05-01T10:00:00Z",
      "updated_at": "2024-05-01T10:00:00Z"
    }]
  }]
}"#;

pub fn main() {
    env_logger::init();

    let store = Arc::new(ConfigurationStore::new());
    let mut config = ClientConfig::new();
    config.evaluation_logger(|event| println!("Evaluation: {:?}", event));
    let client = Client::with_configuration_store(config, store.clone());

    // Until a snapshot is published, the client returns ConfigurationMissing.
    store.set_configuration(Configuration::from_json(FLAGS.as_bytes()).unwrap());

    for user in ["u1", "u2", "u3", "u4"] {
        let context = Context::from([("country", "US"), ("userId", user)]);
        let enabled = client
            .evaluate("new-checkout", &context)
            .ok()
            .and_then(|result| result.variation.as_boolean())
            // default value
            .unwrap_or(false);

        println!("{user}: new-checkout = {enabled}");
    }
}
