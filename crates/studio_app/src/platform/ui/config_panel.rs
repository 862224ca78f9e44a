//! Shell-side view of the configuration store.
//!
//! The panel keeps a rendered field list that the store refreshes through a
//! subscription, so edits made anywhere show up on the next `config show`.

use std::sync::{Arc, Mutex, PoisonError};

use studio_core::{Config, ConfigError, ConfigKey, ConfigStore, KeyValueStorage, Subscription};
use studio_logging::studio_info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    pub key: ConfigKey,
    pub value: String,
}

pub struct ConfigPanel {
    store: ConfigStore,
    rows: Arc<Mutex<Vec<FieldRow>>>,
    subscription: Option<Subscription>,
}

impl ConfigPanel {
    pub fn attach(store: ConfigStore) -> Self {
        let rows = Arc::new(Mutex::new(Vec::new()));
        let target = rows.clone();
        let subscription = store.subscribe(move |config| {
            *target.lock().unwrap_or_else(PoisonError::into_inner) = visible_rows(config);
        });
        Self {
            store,
            rows,
            subscription: Some(subscription),
        }
    }

    pub fn rows(&self) -> Vec<FieldRow> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Field list for display, with the API key masked.
    pub fn lines(&self) -> Vec<String> {
        self.rows()
            .into_iter()
            .map(|row| {
                let value = if row.key == ConfigKey::ApiKey {
                    mask_secret(&row.value)
                } else if row.value.is_empty() {
                    "(backend default)".to_string()
                } else {
                    row.value
                };
                format!("  {:<26} {}", row.key.name(), value)
            })
            .collect()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.store.set(key, value.trim())
    }

    pub fn save(&self, storage: &mut dyn KeyValueStorage) -> Result<(), ConfigError> {
        self.store.persist(storage)?;
        studio_info!("Configuration saved");
        Ok(())
    }

    pub fn env(&self) -> String {
        self.store.get().env_export()
    }

    pub fn detach(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

/// Vision parameters are hidden while the vision model is disabled.
fn visible_rows(config: &Config) -> Vec<FieldRow> {
    ConfigKey::ALL
        .into_iter()
        .filter(|key| !(config.disable_vision && key.is_vision_param()))
        .map(|key| FieldRow {
            key,
            value: config.display_value(key),
        })
        .collect()
}

fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    match count {
        0 => "(unset)".to_string(),
        1..=4 => "****".to_string(),
        _ => {
            let tail: String = secret.chars().skip(count - 4).collect();
            format!("****{tail}")
        }
    }
}
