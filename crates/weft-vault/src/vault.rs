use crate::frontmatter::{self, HeaderBlock};
use anyhow::Context;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use weft_core::{
    is_wiki_link, string_leaves, strip_link, BacklinkKeys, DocId, Header, HostError, HostVault,
};

/// A directory of markdown documents, mirrored in memory.
///
/// All reads are served from the in-memory mirror; mutations update the
/// mirror first and are then written through to disk when the vault was
/// opened from a directory. Document ids are root-relative paths with `/`
/// separators.
pub struct Vault {
    docs: RwLock<BTreeMap<DocId, String>>,
    root: Option<PathBuf>,
}

impl Vault {
    /// A vault with no backing directory. Used in tests and by embedders
    /// that manage persistence themselves.
    pub fn in_memory() -> Self {
        Vault {
            docs: RwLock::new(BTreeMap::new()),
            root: None,
        }
    }

    /// Opens a vault rooted at `root`, loading every `*.md` file beneath it.
    pub fn open(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut docs = BTreeMap::new();
        for entry in walkdir::WalkDir::new(&root) {
            let entry = entry.with_context(|| format!("scanning {}", root.display()))?;
            if !entry.file_type().is_file()
                || entry.path().extension().and_then(|e| e.to_str()) != Some("md")
            {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let content = std::fs::read_to_string(entry.path())
                .with_context(|| format!("reading {}", entry.path().display()))?;
            docs.insert(DocId::new(relative), content);
        }
        tracing::info!(root = %root.display(), documents = docs.len(), "opened vault");
        Ok(Vault {
            docs: RwLock::new(docs),
            root: Some(root),
        })
    }

    /// Adds or replaces a document without touching disk.
    pub fn insert_document(&self, path: &str, content: &str) {
        self.docs
            .write()
            .insert(DocId::new(path), content.to_string());
    }

    /// The full text of a document, body included.
    pub fn content(&self, doc: &DocId) -> Option<String> {
        self.docs.read().get(doc).cloned()
    }

    pub fn document_ids(&self) -> Vec<DocId> {
        self.docs.read().keys().cloned().collect()
    }

    fn commit(&self, doc: &DocId, content: String) -> Result<(), HostError> {
        if let Some(root) = &self.root {
            let path = root.join(doc.as_str());
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &content)?;
        }
        self.docs.write().insert(doc.clone(), content);
        Ok(())
    }

    fn stem(path: &str) -> &str {
        let name = path.rsplit('/').next().unwrap_or(path);
        name.strip_suffix(".md").unwrap_or(name)
    }

    fn resolve_in(docs: &BTreeMap<DocId, String>, text: &str) -> Option<DocId> {
        let exact = DocId::new(text);
        if docs.contains_key(&exact) {
            return Some(exact);
        }
        let with_md = DocId::new(format!("{text}.md"));
        if docs.contains_key(&with_md) {
            return Some(with_md);
        }
        let mut by_stem = docs.keys().filter(|d| Self::stem(d.as_str()) == text);
        if let (Some(doc), None) = (by_stem.next(), by_stem.next()) {
            return Some(doc.clone());
        }
        // Last rung: unique case-insensitive stem match.
        let folded = text.to_lowercase();
        let mut ci = docs
            .keys()
            .filter(|d| Self::stem(d.as_str()).to_lowercase() == folded);
        match (ci.next(), ci.next()) {
            (Some(doc), None) => Some(doc.clone()),
            _ => None,
        }
    }
}

impl HostVault for Vault {
    /// Missing documents and unparseable frontmatter both read as "no
    /// header"; the latter is logged. A document without a frontmatter
    /// block has an empty header.
    fn read_header(&self, doc: &DocId) -> Result<Option<Header>, HostError> {
        let docs = self.docs.read();
        let Some(content) = docs.get(doc) else {
            return Ok(None);
        };
        match frontmatter::split(content) {
            HeaderBlock::Absent { .. } => Ok(Some(Header::new())),
            HeaderBlock::Parsed { header, .. } => Ok(Some(header)),
            HeaderBlock::Malformed => {
                tracing::warn!(doc = %doc, "ignoring document with malformed frontmatter");
                Ok(None)
            }
        }
    }

    fn edit_header(
        &self,
        doc: &DocId,
        edit: &mut dyn FnMut(&mut Header),
    ) -> Result<(), HostError> {
        // Snapshot outside the lock: the closure may resolve links through
        // this vault.
        let content = self
            .content(doc)
            .ok_or_else(|| HostError::DocumentNotFound(doc.clone()))?;
        let (mut header, body) = match frontmatter::split(&content) {
            HeaderBlock::Absent { body } => (Header::new(), body.to_string()),
            HeaderBlock::Parsed { header, body } => (header, body.to_string()),
            HeaderBlock::Malformed => return Err(HostError::MalformedHeader(doc.clone())),
        };
        let before = header.clone();
        edit(&mut header);
        // A no-op edit never rewrites the document, even when re-rendering
        // the block would normalize its formatting.
        if header == before {
            return Ok(());
        }
        self.commit(doc, frontmatter::render(&header, &body))
    }

    fn create_document(&self, path: &str) -> Result<DocId, HostError> {
        if path.is_empty() || path.starts_with('/') || path.split('/').any(|c| c == "..") {
            return Err(HostError::InvalidPath(path.to_string()));
        }
        let doc = DocId::new(path);
        if self.docs.read().contains_key(&doc) {
            return Err(HostError::AlreadyExists(path.to_string()));
        }
        self.commit(&doc, String::new())?;
        Ok(doc)
    }

    fn resolve_link_text(&self, text: &str) -> Option<DocId> {
        Self::resolve_in(&self.docs.read(), text)
    }

    /// The shortest text that resolves back to `doc`: its stem when that is
    /// unambiguous, otherwise the full path without the `.md` suffix.
    fn link_text(&self, doc: &DocId) -> String {
        let docs = self.docs.read();
        let stem = Self::stem(doc.as_str());
        if Self::resolve_in(&docs, stem).as_ref() == Some(doc) {
            return stem.to_string();
        }
        doc.as_str()
            .strip_suffix(".md")
            .unwrap_or(doc.as_str())
            .to_string()
    }

    fn backlinks_of(&self, doc: &DocId) -> Result<BacklinkKeys, HostError> {
        let snapshot: Vec<(DocId, String)> = self
            .docs
            .read()
            .iter()
            .map(|(d, c)| (d.clone(), c.clone()))
            .collect();
        let mut backlinks = BacklinkKeys::new();
        for (source, content) in snapshot {
            if source == *doc {
                continue;
            }
            let HeaderBlock::Parsed { header, .. } = frontmatter::split(&content) else {
                continue;
            };
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
