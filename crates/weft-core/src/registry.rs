//! The Type Registry: single source of truth for which connection types
//! exist.
//!
//! Types are created here and nowhere else; deletion never rewrites header
//! data that already references a type, so such records surface as orphaned
//! unmapped-looking connections on later resolution.

use crate::settings::{ConnectionsSettings, SettingsError, SettingsStore, CONFIG_VERSION};
use crate::types::{
    ConnectionType, ConnectionTypeDef, ConnectionTypeId, MappedConnectionType,
    UnmappedConnectionType,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The def's natural key (mapped property, or connection text for
    /// unmapped defs) is already registered. Reported, never fatal.
    #[error("connection type already registered: {0:?}")]
    Duplicate(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Owns the durable list of connection-type definitions and their ids.
///
/// Explicitly constructed and passed by reference to the locator and
/// mutator; persists through its [`SettingsStore`] after each mutation.
pub struct TypeRegistry {
    settings: ConnectionsSettings,
    store: Box<dyn SettingsStore>,
}

impl TypeRegistry {
    /// Loads settings from the store, starting fresh when nothing is
    /// persisted yet and stamping older settings forward.
    pub fn load(store: Box<dyn SettingsStore>) -> Result<Self, SettingsError> {
        let mut settings = store.load()?.unwrap_or_default();
        if settings.config_version < CONFIG_VERSION {
            tracing::info!(
                from = settings.config_version,
                to = CONFIG_VERSION,
                "migrating connection settings"
            );
            settings.config_version = CONFIG_VERSION;
        }
        Ok(TypeRegistry { settings, store })
    }

    pub fn settings(&self) -> &ConnectionsSettings {
        &self.settings
    }

    pub fn mapped_types(&self) -> &[MappedConnectionType] {
        &self.settings.mapped_types
    }

    pub fn unmapped_types(&self) -> &[UnmappedConnectionType] {
        &self.settings.unmapped_types
    }

    /// Registers a definition: duplicate check by natural key, fresh id from
    /// the monotonic counter, most-recent position in the recency order,
    /// persist.
    pub fn add_type(&mut self, def: ConnectionTypeDef) -> Result<ConnectionType, RegistryError> {
        if self.contains_def(&def) {
            return Err(RegistryError::Duplicate(def.natural_key().to_string()));
        }
        let id = self.settings.allocate_type_id();
        let registered = match def {
            ConnectionTypeDef::Unmapped { connection_text } => {
                let ty = UnmappedConnectionType {
                    id,
                    connection_text,
                };
                self.settings.unmapped_types.push(ty.clone());
                ConnectionType::Unmapped(ty)
            }
            ConnectionTypeDef::Mapped {
                connection_text,
                map_property,
                subject,
            } => {
                let ty = MappedConnectionType {
                    id,
                    connection_text,
                    map_property,
                    subject,
                };
                self.settings.mapped_types.push(ty.clone());
                ConnectionType::Mapped(ty)
            }
        };
        self.settings.connection_order.insert(0, id);
        self.persist()?;
        Ok(registered)
    }

    /// Removes a type by id. Returns whether a removal occurred; settings
    /// are persisted either way. Header data referencing the type is left
    /// alone.
    pub fn delete_type(&mut self, id: ConnectionTypeId) -> Result<bool, RegistryError> {
        let before =
            self.settings.unmapped_types.len() + self.settings.mapped_types.len();
        self.settings.unmapped_types.retain(|t| t.id != id);
        self.settings.mapped_types.retain(|t| t.id != id);
        let removed =
            self.settings.unmapped_types.len() + self.settings.mapped_types.len() < before;
        self.settings.connection_order.retain(|&o| o != id);
        self.persist()?;
        Ok(removed)
    }

    /// Exact lookup by id.
    pub fn find_type(&self, id: ConnectionTypeId) -> Option<ConnectionType> {
        if let Some(t) = self.settings.unmapped_types.iter().find(|t| t.id == id) {
            return Some(ConnectionType::Unmapped(t.clone()));
        }
        self.settings
            .mapped_types
            .iter()
            .find(|t| t.id == id)
            .map(|t| ConnectionType::Mapped(t.clone()))
    }

    /// Whether a definition with the same natural key is already registered.
    pub fn contains_def(&self, def: &ConnectionTypeDef) -> bool {
        match def {
            ConnectionTypeDef::Unmapped { connection_text } => self
                .settings
                .unmapped_types
                .iter()
                .any(|t| t.connection_text == *connection_text),
            ConnectionTypeDef::Mapped { map_property, .. } => self
                .settings
                .mapped_types
                .iter()
                .any(|t| t.map_property == *map_property),
        }
    }

    /// The registered unmapped type with this text, if any. Used when
    /// re-materializing connections from header records.
    pub fn unmapped_by_text(&self, connection_text: &str) -> Option<&UnmappedConnectionType> {
        self.settings
            .unmapped_types
            .iter()
            .find(|t| t.connection_text == connection_text)
    }

    /// Moves `id` to the front of the recency order and persists. Ids the
    /// registry does not know are ignored.
    pub fn touch(&mut self, id: ConnectionTypeId) -> Result<(), RegistryError> {
        if self.find_type(id).is_none() {
            tracing::debug!(%id, "touch for unregistered connection type ignored");
            return Ok(());
        }
        self.settings.connection_order.retain(|&o| o != id);
        self.settings.connection_order.insert(0, id);
        self.persist()?;
        Ok(())
    }

    /// Registered types, most recently used first. A UI affordance.
    pub fn types_by_recency(&self) -> Vec<ConnectionType> {
        let mut ordered: Vec<ConnectionType> = self
            .settings
            .connection_order
            .iter()
            .filter_map(|&id| self.find_type(id))
            .collect();
        // Types missing from the order (legacy settings) go last, stably.
        for t in self.settings.unmapped_types.iter() {
            if !self.settings.connection_order.contains(&t.id) {
                ordered.push(ConnectionType::Unmapped(t.clone()));
            }
        }
        for t in self.settings.mapped_types.iter() {
            if !self.settings.connection_order.contains(&t.id) {
                ordered.push(ConnectionType::Mapped(t.clone()));
            }
        }
        ordered
    }

    fn persist(&self) -> Result<(), SettingsError> {
        self.store.save(&self.settings)
    }
}
