//! The host document store, as the engine needs to see it.
//!
//! The engine never touches files or caches directly; everything goes
//! through [`HostVault`]. Header writes happen only inside
//! [`HostVault::edit_header`], the host's scoped atomic read-modify-write,
//! which either persists all of the closure's mutations or none of them.

use crate::header::Header;
use crate::types::DocId;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failures from the host document store. Only this class of error is
/// potentially fatal to an engine operation; it is propagated unmodified.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("document not found: {0}")]
    DocumentNotFound(DocId),
    #[error("invalid document path: {0:?}")]
    InvalidPath(String),
    #[error("document already exists: {0:?}")]
    AlreadyExists(String),
    #[error("refusing to rewrite malformed header of {0}")]
    MalformedHeader(DocId),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reverse-link entry keys: header key paths such as `prop`, `prop.2`, or
/// `connections.0.target`, one per link a source document's header holds to
/// the queried document.
pub type BacklinkKeys = BTreeMap<DocId, Vec<String>>;

/// Everything the engine consumes from the host.
pub trait HostVault {
    /// Parsed header of `doc`, or `None` when the document has no (usable)
    /// header. Malformed headers degrade to `None` on the read path.
    fn read_header(&self, doc: &DocId) -> Result<Option<Header>, HostError>;

    /// Scoped atomic read-modify-write of a document's header. The closure
    /// receives the current header (empty map when absent) and its final
    /// state is persisted as one transaction; an emptied header removes the
    /// block entirely.
    fn edit_header(
        &self,
        doc: &DocId,
        edit: &mut dyn FnMut(&mut Header),
    ) -> Result<(), HostError>;

    /// Creates an empty document at `path`. Fails if the path is invalid or
    /// already occupied.
    fn create_document(&self, path: &str) -> Result<DocId, HostError>;

    /// Resolves bare link text (no brackets) to an existing document.
    fn resolve_link_text(&self, text: &str) -> Option<DocId>;

    /// The canonical bare link text for an existing document, such that
    /// `resolve_link_text(link_text(doc)) == Some(doc)`.
    fn link_text(&self, doc: &DocId) -> String;

    /// Which documents link to `doc` from their headers, and through which
    /// header keys.
    fn backlinks_of(&self, doc: &DocId) -> Result<BacklinkKeys, HostError>;
}
