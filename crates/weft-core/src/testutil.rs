//! In-memory host double for engine unit tests.

use crate::header::{string_leaves, Header};
use crate::host::{BacklinkKeys, HostError, HostVault};
use crate::links::{is_wiki_link, strip_link};
use crate::types::DocId;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Minimal `HostVault` over parsed headers. Link text resolves by exact
/// path, path with `.md` appended, or unique file stem.
#[derive(Default)]
pub(crate) struct MockVault {
    docs: RefCell<BTreeMap<DocId, Header>>,
}

impl MockVault {
    pub fn with_doc(self, path: &str, header: Header) -> Self {
        self.docs.borrow_mut().insert(DocId::new(path), header);
        self
    }

    pub fn header(&self, path: &str) -> Option<Header> {
        self.docs.borrow().get(&DocId::new(path)).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.docs.borrow().contains_key(&DocId::new(path))
    }

    fn stem(path: &str) -> &str {
        let name = path.rsplit('/').next().unwrap_or(path);
        name.strip_suffix(".md").unwrap_or(name)
    }
}

impl HostVault for MockVault {
    fn read_header(&self, doc: &DocId) -> Result<Option<Header>, HostError> {
        Ok(self.docs.borrow().get(doc).cloned())
    }

    fn edit_header(
        &self,
        doc: &DocId,
        edit: &mut dyn FnMut(&mut Header),
    ) -> Result<(), HostError> {
        // Snapshot first: the closure is allowed to call back into the vault.
        let mut header = self
            .docs
            .borrow()
            .get(doc)
            .cloned()
            .ok_or_else(|| HostError::DocumentNotFound(doc.clone()))?;
        edit(&mut header);
        self.docs.borrow_mut().insert(doc.clone(), header);
        Ok(())
    }

    fn create_document(&self, path: &str) -> Result<DocId, HostError> {
        if path.is_empty() {
            return Err(HostError::InvalidPath(path.to_string()));
        }
        let doc = DocId::new(path);
        if self.docs.borrow().contains_key(&doc) {
            return Err(HostError::AlreadyExists(path.to_string()));
        }
        self.docs.borrow_mut().insert(doc.clone(), Header::new());
        Ok(doc)
    }

    fn resolve_link_text(&self, text: &str) -> Option<DocId> {
        let docs = self.docs.borrow();
        let exact = DocId::new(text);
        if docs.contains_key(&exact) {
            return Some(exact);
        }
        let with_md = DocId::new(format!("{text}.md"));
        if docs.contains_key(&with_md) {
            return Some(with_md);
        }
        let mut matches = docs.keys().filter(|d| Self::stem(d.as_str()) == text);
        match (matches.next(), matches.next()) {
            (Some(doc), None) => Some(doc.clone()),
            _ => None,
        }
    }

    fn link_text(&self, doc: &DocId) -> String {
        Self::stem(doc.as_str()).to_string()
    }

    fn backlinks_of(&self, doc: &DocId) -> Result<BacklinkKeys, HostError> {
        let snapshot: Vec<(DocId, Header)> = self
            .docs
            .borrow()
            .iter()
            .map(|(d, h)| (d.clone(), h.clone()))
            .collect();
        let mut backlinks = BacklinkKeys::new();
        for (source, header) in snapshot {
            let mut keys = Vec::new();
            for (key, text) in string_leaves(&header) {
                if is_wiki_link(&text)
                    && self.resolve_link_text(strip_link(&text)).as_ref() == Some(doc)
                {
                    keys.push(key);
                }
            }
            if !keys.is_empty() {
                backlinks.insert(source, keys);
            }
        }
        Ok(backlinks)
    }
}
