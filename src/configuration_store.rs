use std::sync::{Arc, RwLock};

use crate::configuration::Configuration;

/// `ConfigurationStore` provides a Sync storage for the active flag snapshot that allows
/// concurrent access for readers and writers.
///
/// Readers get an `Arc` to the whole snapshot and evaluate against it without holding the lock,
/// so a concurrent swap never exposes a partially updated flag set.
#[derive(Default)]
pub struct ConfigurationStore {
    configuration: RwLock<Option<Arc<Configuration>>>,
}

impl ConfigurationStore {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self {
            configuration: RwLock::new(None),
        }
    }

    /// Return the active snapshot, if any has been published.
    pub fn get_configuration(&self) -> Option<Arc<Configuration>> {
        // self.configuration.read() should always return Ok(). Err() is possible only if the lock
        // is poisoned (writer panicked while holding the lock), which should never happen. Still,
        // using .ok()? here to not crash the app.
        let configuration = self.configuration.read().ok()?;
        configuration.clone()
    }

    /// Publish a new snapshot, returning the previous one.
    pub fn set_configuration(&self, configuration: Configuration) -> Option<Arc<Configuration>> {
        log::debug!(target: "flagforge",
                    version = configuration.version;
                    "swapping flag configuration");

        // Constructing new value before requesting the lock to minimize lock span.
        let new_value = Some(Arc::new(configuration));

        let mut configuration_slot = self.configuration.write().ok()?;
        std::mem::replace(&mut configuration_slot, new_value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::configuration::Configuration;

    use super::ConfigurationStore;

    #[test]
    fn can_set_configuration_from_another_thread() {
        let store = Arc::new(ConfigurationStore::new());

        {
            let store = store.clone();
            let _ = std::thread::spawn(move || {
                store.set_configuration(Configuration::from_flags(1, []));
            })
            .join();
        }

        assert!(store.get_configuration().is_some());
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let store = ConfigurationStore::new();
        assert!(store.get_configuration().is_none());

        store.set_configuration(Configuration::from_flags(1, []));
        let snapshot = store.get_configuration().unwrap();

        let previous = store.set_configuration(Configuration::from_flags(2, []));
        assert_eq!(previous.map(|c| c.version), Some(1));
        assert_eq!(snapshot.version, 1);
        assert_eq!(store.get_configuration().unwrap().version, 2);
    }

    #[test]
    fn concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(ConfigurationStore::new());
        store.set_configuration(Configuration::from_flags(0, []));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for version in 1..=100 {
                    store.set_configuration(Configuration::from_flags(version, []));
                }
            })
        };

        let readers = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..1000 {
                        let version = store.get_configuration().unwrap().version;
                        assert!(version >= last);
                        last = version;
                    }
                })
            })
            .collect::<Vec<_>>();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.get_configuration().unwrap().version, 100);
    }
}
