//! Sled-backed model store.
//!
//! Key format: `models/{scenario}`. Values are JSON-serialized
//! [`TrainedModel`] artifacts. Saving replaces the previous artifact for the
//! scenario in a single insert.

use std::path::Path;

use sled::Db;
use tracing::{debug, info};

use super::StorageError;
use crate::nn::TrainedModel;

const KEY_PREFIX: &str = "models/";

pub struct ModelStore {
    db: Db,
}

impl ModelStore {
    /// Open or create the model database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), models = db.scan_prefix(KEY_PREFIX).count(), "Model store opened");
        Ok(Self { db })
    }

    /// In-memory database, discarded on drop
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn key(scenario: &str) -> String {
        format!("{KEY_PREFIX}{scenario}")
    }

    pub fn save(&self, model: &TrainedModel) -> Result<(), StorageError> {
        let key = Self::key(&model.scenario);
        let value = serde_json::to_vec(model)?;
        self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;

        debug!(key = %key, trained_at = %model.trained_at, "Stored model artifact");
        Ok(())
    }

    /// Load the artifact for `scenario`; `Ok(None)` when nothing is stored.
    pub fn load(&self, scenario: &str) -> Result<Option<TrainedModel>, StorageError> {
        let key = Self::key(scenario);
        let Some(bytes) = self.db.get(key.as_bytes())? else {
            return Ok(None);
        };

        let model: TrainedModel = serde_json::from_slice(&bytes)?;
        model
            .validate()
            .map_err(|reason| StorageError::Corrupt { key: key.clone(), reason })?;
        if model.scenario != scenario {
            return Err(StorageError::Corrupt {
                key,
                reason: format!("artifact belongs to scenario '{}'", model.scenario),
            });
        }
        Ok(Some(model))
    }

    /// Remove the artifact for `scenario`. Returns whether one existed.
    pub fn delete(&self, scenario: &str) -> Result<bool, StorageError> {
        let removed = self.db.remove(Self::key(scenario).as_bytes())?;
        Ok(removed.is_some())
    }

    /// Scenario names with a stored artifact, sorted.
    pub fn scenarios(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in self.db.scan_prefix(KEY_PREFIX) {
            let (key, _) = entry?;
            if let Ok(k) = std::str::from_utf8(&key) {
                names.push(k.trim_start_matches(KEY_PREFIX).to_string());
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::nn::model::tests::{toy_examples, toy_spec};

    fn trained() -> TrainedModel {
        let spec = toy_spec(10, false);
        let config = TrainingConfig { epochs: 3, ..TrainingConfig::default() };
        spec.fit(&toy_examples(&spec, 20), &config, &mut ()).unwrap()
    }

    #[test]
    fn test_missing_model_is_none() {
        let store = ModelStore::temporary().unwrap();
        assert!(store.load("admission").unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let store = ModelStore::temporary().unwrap();
        let model = trained();
        store.save(&model).unwrap();

        let loaded = store.load("toy").unwrap().unwrap();
        assert_eq!(loaded.scenario, model.scenario);
        assert_eq!(loaded.output_labels, model.output_labels);
        let v = model.schema.vector(vec![3.0, 4.0]).unwrap();
        let (a, b) = (model.predict(&v).unwrap(), loaded.predict(&v).unwrap());
        assert!((a[0] - b[0]).abs() < 1e-9);
        assert_eq!(store.scenarios().unwrap(), vec!["toy".to_string()]);
    }

    #[test]
    fn test_save_replaces_previous() {
        let store = ModelStore::temporary().unwrap();
        let mut model = trained();
        store.save(&model).unwrap();
        model.metrics.final_loss = 0.123;
        store.save(&model).unwrap();
        assert_eq!(store.load("toy").unwrap().unwrap().metrics.final_loss, 0.123);
        assert_eq!(store.scenarios().unwrap().len(), 1);
    }

    #[test]
    fn test_delete() {
        let store = ModelStore::temporary().unwrap();
        store.save(&trained()).unwrap();
        assert!(store.delete("toy").unwrap());
        assert!(!store.delete("toy").unwrap());
        assert!(store.load("toy").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_artifact_reported() {
        let store = ModelStore::temporary().unwrap();
        store.db.insert("models/toy", b"{}".to_vec()).unwrap();
        assert!(store.load("toy").is_err());
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let model = trained();
        {
            let store = ModelStore::open(dir.path().join("models")).unwrap();
            store.save(&model).unwrap();
        }
        let store = ModelStore::open(dir.path().join("models")).unwrap();
        assert!(store.load("toy").unwrap().is_some());
    }
}
