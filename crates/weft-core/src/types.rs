//! Data model for connection types, documents, and connections.
//!
//! Mapped vs. unmapped is decided once, at construction, via tagged unions;
//! nothing downstream re-checks structural shape. The source/target swap for
//! mapped types whose declared subject is the *target* of the relation lives
//! in exactly one place ([`MappedKind::bond_from_owner`] and its accessors),
//! so the locator and the mutator can never disagree about it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an existing document (vault-relative path).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub fn new(path: impl Into<String>) -> Self {
        DocId(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A connection endpoint: either an existing document or a link whose target
/// has not been created yet. Both are valid endpoints; unresolved ones carry
/// the stripped link text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentRef {
    Resolved(DocId),
    Unresolved(String),
}

impl DocumentRef {
    pub fn resolved(&self) -> Option<&DocId> {
        match self {
            DocumentRef::Resolved(doc) => Some(doc),
            DocumentRef::Unresolved(_) => None,
        }
    }

    pub fn is_doc(&self, doc: &DocId) -> bool {
        self.resolved() == Some(doc)
    }
}

/// Which endpoint of the semantic relation holds the mapped property. The
/// same declared type can be authored from either side, so materialized
/// bonds must be flipped accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapSubject {
    Source,
    Target,
}

/// Stable identity of a registered connection type, assigned from the
/// settings' monotonic counter. Survives renames of the mutable fields.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionTypeId(pub u64);

impl fmt::Display for ConnectionTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection-type-{}", self.0)
    }
}

/// A user-declared connection type, before registration assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionTypeDef {
    Unmapped {
        connection_text: String,
    },
    Mapped {
        connection_text: String,
        map_property: String,
        subject: MapSubject,
    },
}

impl ConnectionTypeDef {
    pub fn connection_text(&self) -> &str {
        match self {
            ConnectionTypeDef::Unmapped { connection_text }
            | ConnectionTypeDef::Mapped {
                connection_text, ..
            } => connection_text,
        }
    }

    /// The natural key a duplicate check runs against: the mapped property
    /// for mapped defs (a header property maps to exactly one type), the
    /// connection text for unmapped ones.
    pub fn natural_key(&self) -> &str {
        match self {
            ConnectionTypeDef::Unmapped { connection_text } => connection_text,
            ConnectionTypeDef::Mapped { map_property, .. } => map_property,
        }
    }
}

/// A registered free-form type. Instances live in the generic `connections`
/// list property of the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmappedConnectionType {
    pub id: ConnectionTypeId,
    pub connection_text: String,
}

/// A registered type bound to a dedicated header property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedConnectionType {
    pub id: ConnectionTypeId,
    pub connection_text: String,
    pub map_property: String,
    pub subject: MapSubject,
}

impl MappedConnectionType {
    pub fn kind(&self) -> MappedKind {
        MappedKind {
            connection_text: self.connection_text.clone(),
            map_property: self.map_property.clone(),
            subject: self.subject,
        }
    }
}

/// A registered connection type of either flavor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionType {
    Unmapped(UnmappedConnectionType),
    Mapped(MappedConnectionType),
}

impl ConnectionType {
    pub fn id(&self) -> ConnectionTypeId {
        match self {
            ConnectionType::Unmapped(t) => t.id,
            ConnectionType::Mapped(t) => t.id,
        }
    }

    pub fn connection_text(&self) -> &str {
        match self {
            ConnectionType::Unmapped(t) => &t.connection_text,
            ConnectionType::Mapped(t) => &t.connection_text,
        }
    }
}

/// The two endpoints of a connection, in semantic relation order: `source`
/// relates to `target`, regardless of which document's header stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionBond {
    pub source: DocumentRef,
    pub target: DocumentRef,
}

/// The type half of a located connection.
///
/// Distinct from [`ConnectionType`]: a located connection may reference a
/// type that has since been deleted from the registry (its header data is
/// never rewritten retroactively), so the id is carried separately and
/// optionally on [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionKind {
    Unmapped { connection_text: String },
    Mapped(MappedKind),
}

impl ConnectionKind {
    pub fn connection_text(&self) -> &str {
        match self {
            ConnectionKind::Unmapped { connection_text } => connection_text,
            ConnectionKind::Mapped(mk) => &mk.connection_text,
        }
    }
}

/// Shape of a mapped connection: text, owning property, and declared subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedKind {
    pub connection_text: String,
    pub map_property: String,
    pub subject: MapSubject,
}

impl MappedKind {
    /// Builds the semantic bond from the header owner's point of view.
    ///
    /// When the declared subject is [`MapSubject::Target`], the header owner
    /// is semantically the target of the relation and the bond is swapped
    /// relative to the raw header direction.
    pub fn bond_from_owner(&self, owner: DocumentRef, other: DocumentRef) -> ConnectionBond {
        match self.subject {
            MapSubject::Source => ConnectionBond {
                source: owner,
                target: other,
            },
            MapSubject::Target => ConnectionBond {
                source: other,
                target: owner,
            },
        }
    }

    /// The endpoint whose header stores this connection.
    pub fn owner_of<'a>(&self, bond: &'a ConnectionBond) -> &'a DocumentRef {
        match self.subject {
            MapSubject::Source => &bond.source,
            MapSubject::Target => &bond.target,
        }
    }

    /// The endpoint the header's link text points at.
    pub fn other_of<'a>(&self, bond: &'a ConnectionBond) -> &'a DocumentRef {
        match self.subject {
            MapSubject::Source => &bond.target,
            MapSubject::Target => &bond.source,
        }
    }
}

/// A typed relation between two documents. Ephemeral: computed on demand by
/// the locator, never persisted as an object; only its effect on a header
/// persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub kind: ConnectionKind,
    /// Registry identity, when the kind corresponds to a registered type.
    pub type_id: Option<ConnectionTypeId>,
    pub bond: ConnectionBond,
}

impl Connection {
    pub fn unmapped(ty: &UnmappedConnectionType, source: DocumentRef, target: DocumentRef) -> Self {
        Connection {
            kind: ConnectionKind::Unmapped {
                connection_text: ty.connection_text.clone(),
            },
            type_id: Some(ty.id),
            bond: ConnectionBond { source, target },
        }
    }

    pub fn mapped(ty: &MappedConnectionType, bond: ConnectionBond) -> Self {
        Connection {
            kind: ConnectionKind::Mapped(ty.kind()),
            type_id: Some(ty.id),
            bond,
        }
    }

    pub fn connection_text(&self) -> &str {
        self.kind.connection_text()
    }

    /// The endpoint whose header stores this connection.
    pub fn owner(&self) -> &DocumentRef {
        match &self.kind {
            ConnectionKind::Mapped(mk) => mk.owner_of(&self.bond),
            ConnectionKind::Unmapped { .. } => &self.bond.source,
        }
    }

    /// The endpoint the stored link text points at.
    pub fn other(&self) -> &DocumentRef {
        match &self.kind {
            ConnectionKind::Mapped(mk) => mk.other_of(&self.bond),
            ConnectionKind::Unmapped { .. } => &self.bond.target,
        }
    }

    pub(crate) fn set_owner(&mut self, owner: DocumentRef) {
        match &self.kind {
            ConnectionKind::Mapped(mk) => match mk.subject {
                MapSubject::Source => self.bond.source = owner,
                MapSubject::Target => self.bond.target = owner,
            },
            ConnectionKind::Unmapped { .. } => self.bond.source = owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped_kind(subject: MapSubject) -> MappedKind {
        MappedKind {
            connection_text: "supports".to_string(),
            map_property: "supports".to_string(),
            subject,
        }
    }

    #[test]
    fn bond_keeps_direction_for_source_subject() {
        let owner = DocumentRef::Resolved(DocId::new("a.md"));
        let other = DocumentRef::Resolved(DocId::new("b.md"));
        let bond = mapped_kind(MapSubject::Source).bond_from_owner(owner.clone(), other.clone());
        assert_eq!(bond.source, owner);
        assert_eq!(bond.target, other);
    }

    #[test]
    fn bond_flips_for_target_subject() {
        let owner = DocumentRef::Resolved(DocId::new("a.md"));
        let other = DocumentRef::Unresolved("b".to_string());
        let kind = mapped_kind(MapSubject::Target);
        let bond = kind.bond_from_owner(owner.clone(), other.clone());
        assert_eq!(bond.source, other);
        assert_eq!(bond.target, owner);
        // The accessors invert the flip.
        assert_eq!(kind.owner_of(&bond), &owner);
        assert_eq!(kind.other_of(&bond), &bond.source);
    }

    #[test]
    fn owner_and_other_agree_with_set_owner() {
        let ty = MappedConnectionType {
            id: ConnectionTypeId(3),
            connection_text: "supports".to_string(),
            map_property: "supports".to_string(),
            subject: MapSubject::Target,
        };
        let bond = ty.kind().bond_from_owner(
            DocumentRef::Unresolved("a".to_string()),
            DocumentRef::Resolved(DocId::new("b.md")),
        );
        let mut conn = Connection::mapped(&ty, bond);
        conn.set_owner(DocumentRef::Resolved(DocId::new("a.md")));
        assert_eq!(conn.owner(), &DocumentRef::Resolved(DocId::new("a.md")));
        assert_eq!(conn.other(), &DocumentRef::Resolved(DocId::new("b.md")));
        // Subject = Target, so semantically b is the source.
        assert_eq!(conn.bond.source, DocumentRef::Resolved(DocId::new("b.md")));
    }

    #[test]
    fn natural_key_per_variant() {
        let unmapped = ConnectionTypeDef::Unmapped {
            connection_text: "related-to".to_string(),
        };
        assert_eq!(unmapped.natural_key(), "related-to");
        let mapped = ConnectionTypeDef::Mapped {
            connection_text: "supports".to_string(),
            map_property: "supported-by".to_string(),
            subject: MapSubject::Target,
        };
        assert_eq!(mapped.natural_key(), "supported-by");
    }
}
