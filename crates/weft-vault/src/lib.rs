//! Markdown-vault host for the connection engine.
//!
//! Documents are markdown files whose header is a YAML frontmatter block.
//! [`Vault`] implements `weft_core::HostVault` over a directory of such
//! files (or purely in memory), including link-text resolution and the
//! reverse-link index the locator's backward pass consumes.

mod frontmatter;
mod vault;

pub use vault::Vault;
