//! The write path: the only component that rewrites headers on behalf of
//! the connection feature.
//!
//! Every mutation is one scoped atomic header edit of the owning document.
//! The promotion rule (absent → list, scalar → list, never drop a value) is
//! enforced on add; delete refuses to touch data the feature does not own.
//! Stale state between locate and mutate is expected: "property not found"
//! and "connection not found" are recoverable outcomes, not faults.

use crate::header::{push_entry, Header, PropertyShape, CONNECTIONS_KEY, RECORD_TARGET_KEY, RECORD_TEXT_KEY};
use crate::host::{HostError, HostVault};
use crate::links::{strip_link, wrap_link};
use crate::registry::{RegistryError, TypeRegistry};
use crate::types::{Connection, ConnectionKind, DocId, DocumentRef, MappedKind};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MutateError {
    /// The mapped property (or the `connections` list) is not present in the
    /// owner's header. Recoverable; the header may have changed since the
    /// connection was located.
    #[error("property {0:?} not present in the document header")]
    PropertyNotFound(String),
    /// Nothing in the property matched the connection to delete.
    #[error("no matching connection found")]
    ConnectionNotFound,
    /// The property holds a record or nested structure this engine did not
    /// write; deleting is refused and the header left untouched.
    #[error("connection in property {0:?} is embedded in an object")]
    EmbeddedObject(String),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub struct ConnectionMutator<'a, V: HostVault + ?Sized> {
    vault: &'a V,
}

impl<'a, V: HostVault + ?Sized> ConnectionMutator<'a, V> {
    pub fn new(vault: &'a V) -> Self {
        ConnectionMutator { vault }
    }

    /// Adds `connection` to its owner's header, materializing the owner
    /// first when it is an unresolved reference (re-resolve, then create
    /// the document). Returns the connection with the owner resolved.
    ///
    /// On success the connection's type is moved to the front of the
    /// registry's recency order.
    pub fn add_connection(
        &self,
        registry: &mut TypeRegistry,
        connection: &Connection,
    ) -> Result<Connection, MutateError> {
        let mut connection = connection.clone();
        let owner = self.materialize(connection.owner())?;
        connection.set_owner(DocumentRef::Resolved(owner.clone()));
        let link = self.link_for(connection.other());

        match &connection.kind {
            ConnectionKind::Mapped(mk) => {
                let property = mk.map_property.clone();
                self.vault.edit_header(&owner, &mut |header| {
                    push_entry(header, &property, Value::String(link.clone()));
                })?;
            }
            ConnectionKind::Unmapped { connection_text } => {
                let mut record = serde_json::Map::new();
                record.insert(
                    RECORD_TEXT_KEY.to_string(),
                    Value::String(connection_text.clone()),
                );
                record.insert(RECORD_TARGET_KEY.to_string(), Value::String(link.clone()));
                let record = Value::Object(record);
                self.vault.edit_header(&owner, &mut |header| {
                    push_entry(header, CONNECTIONS_KEY, record.clone());
                })?;
            }
        }

        if let Some(id) = connection.type_id {
            registry.touch(id)?;
        }
        Ok(connection)
    }

    /// Removes every entry matching `connection` from its owner's header,
    /// deleting the property entirely when it empties. A connection whose
    /// owner was never created has nothing to delete.
    pub fn delete_connection(&self, connection: &Connection) -> Result<(), MutateError> {
        let owner = match connection.owner() {
            DocumentRef::Resolved(doc) => doc.clone(),
            DocumentRef::Unresolved(_) => return Err(MutateError::ConnectionNotFound),
        };
        match &connection.kind {
            ConnectionKind::Mapped(mk) => self.delete_mapped(&owner, mk, connection.other()),
            ConnectionKind::Unmapped { connection_text } => {
                self.delete_unmapped(&owner, connection_text, connection.other())
            }
        }
    }

    fn delete_mapped(
        &self,
        owner: &DocId,
        mk: &MappedKind,
        target: &DocumentRef,
    ) -> Result<(), MutateError> {
        let property = mk.map_property.clone();
        let mut outcome: Result<(), MutateError> = Ok(());
        self.vault.edit_header(owner, &mut |header| {
            outcome = self.delete_mapped_in(header, &property, target);
        })?;
        outcome
    }

    /// The shape-aware removal. Scans before mutating so a refusal leaves
    /// the header bit-for-bit unchanged.
    fn delete_mapped_in(
        &self,
        header: &mut Header,
        property: &str,
        target: &DocumentRef,
    ) -> Result<(), MutateError> {
        match PropertyShape::of(header, property) {
            PropertyShape::Absent => Err(MutateError::PropertyNotFound(property.to_string())),
            PropertyShape::Scalar(value) => {
                if value.is_object() {
                    return Err(MutateError::EmbeddedObject(property.to_string()));
                }
                match value.as_str() {
                    Some(text) if self.entry_matches(text, target) => {
                        header.remove(property);
                        Ok(())
                    }
                    _ => Err(MutateError::ConnectionNotFound),
                }
            }
            PropertyShape::List(entries) => {
                if entries.iter().any(|e| e.is_object() || e.is_array()) {
                    return Err(MutateError::EmbeddedObject(property.to_string()));
                }
                let kept: Vec<Value> = entries
                    .iter()
                    .filter(|e| {
                        !e.as_str()
                            .is_some_and(|text| self.entry_matches(text, target))
                    })
                    .cloned()
                    .collect();
                if kept.len() == entries.len() {
                    return Err(MutateError::ConnectionNotFound);
                }
                if kept.is_empty() {
                    header.remove(property);
                } else {
                    header.insert(property.to_string(), Value::Array(kept));
                }
                Ok(())
            }
        }
    }

    fn delete_unmapped(
        &self,
        owner: &DocId,
        connection_text: &str,
        target: &DocumentRef,
    ) -> Result<(), MutateError> {
        let mut outcome: Result<(), MutateError> = Ok(());
        self.vault.edit_header(owner, &mut |header| {
            outcome = self.delete_unmapped_in(header, connection_text, target);
        })?;
        outcome
    }

    fn delete_unmapped_in(
        &self,
        header: &mut Header,
        connection_text: &str,
        target: &DocumentRef,
    ) -> Result<(), MutateError> {
        let entries = match PropertyShape::of(header, CONNECTIONS_KEY) {
            PropertyShape::Absent => {
                return Err(MutateError::PropertyNotFound(CONNECTIONS_KEY.to_string()))
            }
            shape => shape.promoted(),
        };
        let kept: Vec<Value> = entries
            .iter()
            .filter(|entry| !self.record_matches(entry, connection_text, target))
            .cloned()
            .collect();
        if kept.len() == entries.len() {
            return Err(MutateError::ConnectionNotFound);
        }
        if kept.is_empty() {
            header.remove(CONNECTIONS_KEY);
        } else {
            header.insert(CONNECTIONS_KEY.to_string(), Value::Array(kept));
        }
        Ok(())
    }

    fn record_matches(&self, entry: &Value, connection_text: &str, target: &DocumentRef) -> bool {
        let Some(record) = entry.as_object() else {
            return false;
        };
        if record.get(RECORD_TEXT_KEY).and_then(|v| v.as_str()) != Some(connection_text) {
            return false;
        }
        record
            .get(RECORD_TARGET_KEY)
            .and_then(|v| v.as_str())
            .is_some_and(|text| self.entry_matches(text, target))
    }

    /// Whether a header's raw link text refers to `target`, by resolved
    /// handle or by raw stripped text.
    fn entry_matches(&self, raw: &str, target: &DocumentRef) -> bool {
        let stripped = strip_link(raw);
        match target {
            DocumentRef::Resolved(doc) => {
                self.vault.resolve_link_text(stripped).as_ref() == Some(doc)
            }
            DocumentRef::Unresolved(text) => stripped == strip_link(text),
        }
    }

    fn link_for(&self, other: &DocumentRef) -> String {
        match other {
            DocumentRef::Resolved(doc) => wrap_link(&self.vault.link_text(doc)),
            DocumentRef::Unresolved(text) => wrap_link(strip_link(text)),
        }
    }

    /// Resolves the owner endpoint to an existing document, creating one
    /// (with `.md` appended when absent) if the link text still resolves to
    /// nothing.
    fn materialize(&self, owner: &DocumentRef) -> Result<DocId, MutateError> {
        match owner {
            DocumentRef::Resolved(doc) => Ok(doc.clone()),
            DocumentRef::Unresolved(raw) => {
                let text = strip_link(raw);
                if let Some(doc) = self.vault.resolve_link_text(text) {
                    return Ok(doc);
                }
                let path = if text.to_ascii_lowercase().ends_with(".md") {
                    text.to_string()
                } else {
                    format!("{text}.md")
                };
                Ok(self.vault.create_document(&path)?)
            }
        }
    }
}
