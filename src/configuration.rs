use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    flags::{CompiledFlag, Flag, TargetingRule, TryParse},
    Error, Result,
};

/// An immutable, version-tagged snapshot of compiled flags.
///
/// A snapshot is built once by ingesting a storage export and is then shared between readers
/// through [`ConfigurationStore`](crate::configuration_store::ConfigurationStore).
#[derive(Debug)]
pub struct Configuration {
    /// Version of the flag set as reported by storage.
    pub version: u64,
    /// Timestamp when the snapshot was built.
    pub fetched_at: DateTime<Utc>,
    /// For flags that failed to parse or compile, we store the error directly.
    flags: HashMap<String, Result<CompiledFlag>>,
}

/// Storage export of a flag set.
#[derive(Debug, Deserialize)]
struct FlagSetWire {
    version: u64,
    #[serde(default)]
    flags: Vec<TryParse<FlagRecordWire>>,
}

#[derive(Debug, Deserialize)]
struct FlagRecordWire {
    flag: Flag,
    /// Rules in evaluation order.
    #[serde(default)]
    rules: Vec<TryParse<TargetingRule>>,
}

impl Configuration {
    /// Ingest a storage export of the form
    /// `{ "version": 1, "flags": [ { "flag": {..}, "rules": [..] } ] }`.
    ///
    /// A flag record that cannot be parsed or compiled only poisons its own key. A rule that
    /// cannot be parsed is kept as an invalid rule of its flag. Fails only if the document as a
    /// whole is not a flag set.
    pub fn from_json(json: &[u8]) -> Result<Configuration> {
        let wire: FlagSetWire = serde_json::from_slice(json).map_err(|err| {
            log::warn!(target: "flagforge", "failed to parse flag configuration: {err:?}");
            err
        })?;

        let mut flags = HashMap::with_capacity(wire.flags.len());
        for record in wire.flags {
            let (key, flag) = match record {
                TryParse::Parsed(record) => (
                    record.flag.key.clone(),
                    CompiledFlag::compile_partially_parsed(&record.flag, &record.rules)
                        .map_err(Error::from),
                ),
                TryParse::ParseFailed(json) => {
                    let Some(key) = json
                        .get("flag")
                        .and_then(|flag| flag.get("key"))
                        .and_then(|key| key.as_str())
                    else {
                        log::warn!(target: "flagforge", "skipping flag record without a key");
                        continue;
                    };
                    (key.to_owned(), Err(Error::ConfigurationParseError))
                }
            };

            if let Err(err) = &flag {
                log::warn!(target: "flagforge", flag_key:display = key; "flag will not be evaluated: {err}");
            }
            if flags.insert(key.clone(), flag).is_some() {
                log::warn!(target: "flagforge", flag_key:display = key; "duplicate flag key, keeping the last record");
            }
        }

        Ok(Configuration {
            version: wire.version,
            fetched_at: Utc::now(),
            flags,
        })
    }

    /// Build a snapshot from in-memory records. Each flag comes with its rules in evaluation
    /// order.
    pub fn from_flags(
        version: u64,
        flags: impl IntoIterator<Item = (Flag, Vec<TargetingRule>)>,
    ) -> Configuration {
        let mut compiled_flags = HashMap::new();
        for (flag, rules) in flags {
            let compiled = CompiledFlag::compile(&flag, &rules).map_err(Error::from);
            if compiled_flags.insert(flag.key.clone(), compiled).is_some() {
                log::warn!(target: "flagforge", flag_key:display = flag.key; "duplicate flag key, keeping the last record");
            }
        }

        Configuration {
            version,
            fetched_at: Utc::now(),
            flags: compiled_flags,
        }
    }

    /// Return the compiled flag for `flag_key`.
    ///
    /// Fails with [`Error::FlagNotFound`] if the snapshot has no such flag, or with the error the
    /// flag failed to ingest with.
    pub fn get_flag(&self, flag_key: &str) -> Result<&CompiledFlag> {
        match self.flags.get(flag_key) {
            Some(Ok(flag)) => Ok(flag),
            Some(Err(err)) => Err(err.clone()),
            None => Err(Error::FlagNotFound),
        }
    }

    /// Get a set of all available flags. Note that this may return both archived flags and flags
    /// with bad configuration.
    pub fn flag_keys(&self) -> HashSet<String> {
        self.flags.keys().cloned().collect()
    }
}
