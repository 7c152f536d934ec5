//! Read-only connection resolution.
//!
//! Given a document, combine its own header (forward direction) with the
//! host's reverse-link index (backward direction) into the full set of
//! connections touching it. Pure computation over live state: nothing is
//! cached, nothing is mutated. Malformed or missing header data is skipped,
//! never an error; only host I/O failures propagate.
//!
//! No promise is made about result ordering.

use crate::header::{Header, PropertyShape, CONNECTIONS_KEY, RECORD_TARGET_KEY, RECORD_TEXT_KEY};
use crate::host::{HostError, HostVault};
use crate::links::strip_link;
use crate::registry::TypeRegistry;
use crate::types::{
    Connection, ConnectionBond, ConnectionKind, ConnectionTypeId, DocId, DocumentRef,
    MappedConnectionType,
};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Matches reverse-index keys pointing into the generic connections list.
fn connections_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^connections\.(\d+)\.target$").unwrap())
}

/// Whether a reverse-index key addresses `property` itself or one of its
/// list entries (`property.3`).
fn key_addresses_property(key: &str, property: &str) -> bool {
    match key.strip_prefix(property) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('.')
            .is_some_and(|idx| !idx.is_empty() && idx.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

pub struct ConnectionLocator<'a, V: HostVault + ?Sized> {
    registry: &'a TypeRegistry,
    vault: &'a V,
}

impl<'a, V: HostVault + ?Sized> ConnectionLocator<'a, V> {
    pub fn new(registry: &'a TypeRegistry, vault: &'a V) -> Self {
        ConnectionLocator { registry, vault }
    }

    /// Every connection where `doc` is either endpoint.
    pub fn connections(&self, doc: &DocId) -> Result<Vec<Connection>, HostError> {
        let mut found = self.forward_filtered(doc, None)?;
        found.extend(self.backward_filtered(doc, None)?);
        Ok(found)
    }

    /// Connections between `doc` and one specific other document. Unresolved
    /// endpoints cannot match the filter and are excluded.
    pub fn connections_between(
        &self,
        doc: &DocId,
        other: &DocId,
    ) -> Result<Vec<Connection>, HostError> {
        let mut found = self.forward_filtered(doc, Some(other))?;
        found.extend(self.backward_filtered(doc, Some(other))?);
        Ok(found)
    }

    /// Connections stored in `doc`'s own header.
    pub fn forward_connections(&self, doc: &DocId) -> Result<Vec<Connection>, HostError> {
        self.forward_filtered(doc, None)
    }

    /// Connections stored in other documents' headers that point at `doc`.
    pub fn backward_connections(&self, doc: &DocId) -> Result<Vec<Connection>, HostError> {
        self.backward_filtered(doc, None)
    }

    fn forward_filtered(
        &self,
        doc: &DocId,
        filter: Option<&DocId>,
    ) -> Result<Vec<Connection>, HostError> {
        let Some(header) = self.vault.read_header(doc)? else {
            return Ok(Vec::new());
        };
        let mut found = self.unmapped_forward(&header, doc, filter);
        for ty in self.registry.mapped_types() {
            if header.contains_key(&ty.map_property) {
                found.extend(self.mapped_forward_for_type(&header, ty, doc, filter));
            }
        }
        Ok(found)
    }

    fn unmapped_forward(
        &self,
        header: &Header,
        doc: &DocId,
        filter: Option<&DocId>,
    ) -> Vec<Connection> {
        let mut found = Vec::new();
        for entry in PropertyShape::of(header, CONNECTIONS_KEY).promoted() {
            let Some(record) = entry.as_object() else {
                tracing::debug!(doc = %doc, "skipping non-record connections entry");
                continue;
            };
            let Some(text) = record
                .get(RECORD_TEXT_KEY)
                .and_then(|v| v.as_str())
                .filter(|t| !t.is_empty())
            else {
                tracing::debug!(doc = %doc, "skipping connections record without a type text");
                continue;
            };
            let Some(raw_target) = record.get(RECORD_TARGET_KEY).and_then(|v| v.as_str()) else {
                continue;
            };
            let target = self.resolve_ref(raw_target);
            if let Some(wanted) = filter {
                if !target.is_doc(wanted) {
                    continue;
                }
            }
            found.push(Connection {
                type_id: self.registry.unmapped_by_text(text).map(|t| t.id),
                kind: ConnectionKind::Unmapped {
                    connection_text: text.to_string(),
                },
                bond: ConnectionBond {
                    source: DocumentRef::Resolved(doc.clone()),
                    target,
                },
            });
        }
        found
    }

    /// Materializes one mapped type's connections out of the owner's header,
    /// applying the subject flip through the bond constructor.
    fn mapped_forward_for_type(
        &self,
        header: &Header,
        ty: &MappedConnectionType,
        owner: &DocId,
        filter: Option<&DocId>,
    ) -> Vec<Connection> {
        let mut found = Vec::new();
        for entry in PropertyShape::of(header, &ty.map_property).promoted() {
            let Some(raw) = entry.as_str().filter(|s| !s.trim().is_empty()) else {
                tracing::debug!(
                    doc = %owner,
                    property = %ty.map_property,
                    "skipping non-link mapped entry"
                );
                continue;
            };
            let other = self.resolve_ref(raw);
            if let Some(wanted) = filter {
                if !other.is_doc(wanted) {
                    continue;
                }
            }
            let bond = ty
                .kind()
                .bond_from_owner(DocumentRef::Resolved(owner.clone()), other);
            found.push(Connection {
                kind: ConnectionKind::Mapped(ty.kind()),
                type_id: Some(ty.id),
                bond,
            });
        }
        found
    }

    fn backward_filtered(
        &self,
        doc: &DocId,
        only_from: Option<&DocId>,
    ) -> Result<Vec<Connection>, HostError> {
        let mut found = Vec::new();
        for (source, keys) in self.vault.backlinks_of(doc)? {
            if let Some(wanted) = only_from {
                if source != *wanted {
                    continue;
                }
            }

            // Mapped: each matched type is re-derived through the forward
            // path once, so the flip and normalization logic is not
            // duplicated here. Keys `prop` and `prop.N` both address `prop`.
            let matched: BTreeSet<ConnectionTypeId> = self
                .registry
                .mapped_types()
                .iter()
                .filter(|ty| {
                    keys.iter()
                        .any(|key| key_addresses_property(key, &ty.map_property))
                })
                .map(|ty| ty.id)
                .collect();

            let record_indexes: BTreeSet<usize> = keys
                .iter()
                .filter_map(|key| connections_key_regex().captures(key))
                .filter_map(|caps| caps[1].parse().ok())
                .collect();

            if matched.is_empty() && record_indexes.is_empty() {
                continue;
            }
            let Some(header) = self.vault.read_header(&source)? else {
                continue;
            };

            for ty in self.registry.mapped_types() {
                if matched.contains(&ty.id) {
                    found.extend(self.mapped_forward_for_type(&header, ty, &source, Some(doc)));
                }
            }

            let entries = PropertyShape::of(&header, CONNECTIONS_KEY).promoted();
            for idx in record_indexes {
                let Some(record) = entries.get(idx).and_then(|e| e.as_object()) else {
                    continue;
                };
                let Some(text) = record
                    .get(RECORD_TEXT_KEY)
                    .and_then(|v| v.as_str())
                    .filter(|t| !t.is_empty())
                else {
                    continue;
                };
                found.push(Connection {
                    type_id: self.registry.unmapped_by_text(text).map(|t| t.id),
                    kind: ConnectionKind::Unmapped {
                        connection_text: text.to_string(),
                    },
                    bond: ConnectionBond {
                        source: DocumentRef::Resolved(source.clone()),
                        target: DocumentRef::Resolved(doc.clone()),
                    },
                });
            }
        }
        Ok(found)
    }

    fn resolve_ref(&self, raw: &str) -> DocumentRef {
        let text = strip_link(raw);
        match self.vault.resolve_link_text(text) {
            Some(doc) => DocumentRef::Resolved(doc),
            None => DocumentRef::Unresolved(text.to_string()),
        }
    }
}
