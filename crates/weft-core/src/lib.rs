//! Weft connection engine
//!
//! Typed, bidirectional "connections" between documents, stored inside each
//! document's own structured header rather than in a side database:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      CONNECTION ENGINE                   │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │   ┌──────────────┐        ┌───────────────┐              │
//! │   │ TypeRegistry │◄───────│ SettingsStore │ (durable)    │
//! │   └──────┬───────┘        └───────────────┘              │
//! │          │ consults                                      │
//! │   ┌──────┴───────┐   reads    ┌───────────┐              │
//! │   │   Locator    │───────────►│           │              │
//! │   └──────────────┘            │ HostVault │ (documents,  │
//! │   ┌──────────────┐   rewrites │           │  backlinks)  │
//! │   │   Mutator    │───────────►│           │              │
//! │   └──────────────┘            └───────────┘              │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Two storage representations coexist in a header: *mapped* connection types
//! own a dedicated property holding link text (scalar or list), and *unmapped*
//! types share a generic `connections` list of `{connectionText, target}`
//! records. The [`ConnectionLocator`] reconciles both (plus the host's
//! reverse-link index) into one view; the [`ConnectionMutator`] is the only
//! writer and preserves whatever shape a property already had.
//!
//! There is no cached graph: every locate recomputes from the live headers.

pub mod header;
pub mod host;
pub mod links;
pub mod locator;
pub mod mutator;
pub mod registry;
pub mod settings;
pub mod types;

pub use header::{string_leaves, Header, PropertyShape, CONNECTIONS_KEY};
pub use host::{BacklinkKeys, HostError, HostVault};
pub use links::{is_wiki_link, strip_link, wrap_link};
pub use locator::ConnectionLocator;
pub use mutator::{ConnectionMutator, MutateError};
pub use registry::{RegistryError, TypeRegistry};
pub use settings::{
    ConnectionsSettings, JsonSettingsStore, MemorySettingsStore, SettingsError, SettingsStore,
};
pub use types::{
    Connection, ConnectionBond, ConnectionKind, ConnectionType, ConnectionTypeDef,
    ConnectionTypeId, DocId, DocumentRef, MapSubject, MappedConnectionType, MappedKind,
    UnmappedConnectionType,
};

#[cfg(test)]
pub(crate) mod testutil;
