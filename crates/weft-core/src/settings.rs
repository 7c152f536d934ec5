//! Durable settings: the registered connection types and their ordering.
//!
//! Settings are a single JSON document with a plain lifecycle: load at
//! startup, persist after every registry mutation, drop at shutdown. No
//! hidden statics.

use crate::types::{ConnectionTypeId, MappedConnectionType, UnmappedConnectionType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Current settings schema version. Older files are stamped forward on load.
pub const CONFIG_VERSION: u32 = 1;

fn default_config_version() -> u32 {
    CONFIG_VERSION
}

/// The durable state of the connection feature.
///
/// Invariants (enforced by [`crate::registry::TypeRegistry`]):
/// `map_property` is unique across `mapped_types`, `connection_text` is
/// unique across `unmapped_types`, and ids are unique across the union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionsSettings {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub next_connection_type_id: u64,
    #[serde(default)]
    pub unmapped_types: Vec<UnmappedConnectionType>,
    #[serde(default)]
    pub mapped_types: Vec<MappedConnectionType>,
    /// Most-recently-used ordering of type ids; a UI affordance, never
    /// consulted for correctness.
    #[serde(default)]
    pub connection_order: Vec<ConnectionTypeId>,
}

impl Default for ConnectionsSettings {
    fn default() -> Self {
        ConnectionsSettings {
            config_version: CONFIG_VERSION,
            next_connection_type_id: 0,
            unmapped_types: Vec::new(),
            mapped_types: Vec::new(),
            connection_order: Vec::new(),
        }
    }
}

impl ConnectionsSettings {
    /// Hands out the next id from the monotonic counter.
    pub fn allocate_type_id(&mut self) -> ConnectionTypeId {
        let id = ConnectionTypeId(self.next_connection_type_id);
        self.next_connection_type_id += 1;
        id
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] serde_json::Error),
}

/// Durable key-value persistence for [`ConnectionsSettings`].
pub trait SettingsStore {
    fn load(&self) -> Result<Option<ConnectionsSettings>, SettingsError>;
    fn save(&self, settings: &ConnectionsSettings) -> Result<(), SettingsError>;
}

impl<S: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<ConnectionsSettings>, SettingsError> {
        (**self).load()
    }

    fn save(&self, settings: &ConnectionsSettings) -> Result<(), SettingsError> {
        (**self).save(settings)
    }
}

/// Settings as a pretty-printed JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSettingsStore { path: path.into() }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Option<ConnectionsSettings>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, settings: &ConnectionsSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store for tests and embedding hosts with their own persistence.
#[derive(Default)]
pub struct MemorySettingsStore {
    slot: Mutex<Option<ConnectionsSettings>>,
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<ConnectionsSettings>, SettingsError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, settings: &ConnectionsSettings) -> Result<(), SettingsError> {
        *self.slot.lock() = Some(settings.clone());
        Ok(())
    }
}
