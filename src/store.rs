//! Author-partitioned storage for filed replies.
//!
//! Each reply is stored under the author of the item it replies to, keyed by
//! the reply's own id, so "all replies to user X" is a single directory
//! listing. On disk the layout is:
//!
//! ```text
//! data/
//!     username0/
//!         29977271
//!         29977272
//!     username1/
//!         29977276
//! ```
//!
//! where each file holds the raw item JSON. Writing the same `(author, id,
//! body)` again leaves the store unchanged.

use crate::error::{Error, Result};
use crate::types::ItemId;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::trace;

/// Destination for resolved replies
#[async_trait]
pub trait ReplyStore: Send + Sync {
    /// File `body` as reply `id` to `author`, replacing any earlier body for `id`
    async fn put(&self, author: &str, id: ItemId, body: &str) -> Result<()>;

    /// Up to `limit` bodies filed under `author`, highest id first
    ///
    /// An author with nothing filed yields an empty list.
    async fn replies(&self, author: &str, limit: usize) -> Result<Vec<String>>;
}

/// Reject names that would escape or alias the store root
pub fn validate_author(author: &str) -> Result<()> {
    let invalid = author.is_empty()
        || author == "."
        || author == ".."
        || author.contains(['/', '\\', '\0']);

    if invalid {
        return Err(Error::InvalidAuthor(author.to_string()));
    }
    Ok(())
}

/// [`ReplyStore`] keeping one directory per author and one file per reply
#[derive(Clone, Debug)]
pub struct FsReplyStore {
    root: PathBuf,
}

impl FsReplyStore {
    /// Create a store rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn author_dir(&self, author: &str) -> Result<PathBuf> {
        validate_author(author)?;
        Ok(self.root.join(author))
    }
}

#[async_trait]
impl ReplyStore for FsReplyStore {
    async fn put(&self, author: &str, id: ItemId, body: &str) -> Result<()> {
        let dir = self.author_dir(author)?;
        tokio::fs::create_dir_all(&dir).await?;

        let mut contents = String::with_capacity(body.len() + 1);
        contents.push_str(body);
        contents.push('\n');

        // Write aside and rename so readers never see a half-written reply
        let path = dir.join(id.to_string());
        let staging = dir.join(format!(".{}.tmp", id));
        tokio::fs::write(&staging, contents).await?;
        tokio::fs::rename(&staging, &path).await?;

        trace!(author, item_id = %id, path = %path.display(), "Reply filed");
        Ok(())
    }

    async fn replies(&self, author: &str, limit: usize) -> Result<Vec<String>> {
        let dir = self.author_dir(author)?;

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<ItemId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.truncate(limit);

        let mut bodies = Vec::with_capacity(ids.len());
        for id in ids {
            let contents = tokio::fs::read_to_string(dir.join(id.to_string())).await?;
            bodies.push(contents.trim_end_matches('\n').to_string());
        }
        Ok(bodies)
    }
}

/// In-memory [`ReplyStore`] with the same semantics as [`FsReplyStore`]
#[derive(Debug, Default)]
pub struct MemoryReplyStore {
    replies: Mutex<HashMap<String, BTreeMap<ItemId, String>>>,
}

impl MemoryReplyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Body filed for `(author, id)`
    pub fn get(&self, author: &str, id: ItemId) -> Option<String> {
        self.lock().get(author).and_then(|by_id| by_id.get(&id).cloned())
    }

    /// Total number of filed replies
    pub fn len(&self) -> usize {
        self.lock().values().map(BTreeMap::len).sum()
    }

    /// True when nothing has been filed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Authors that have at least one reply
    pub fn authors(&self) -> Vec<String> {
        let mut authors: Vec<String> = self.lock().keys().cloned().collect();
        authors.sort();
        authors
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, BTreeMap<ItemId, String>>> {
        // A panic while holding the lock cannot leave a map half-updated
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ReplyStore for MemoryReplyStore {
    async fn put(&self, author: &str, id: ItemId, body: &str) -> Result<()> {
        validate_author(author)?;
        self.lock()
            .entry(author.to_string())
            .or_default()
            .insert(id, body.to_string());
        Ok(())
    }

    async fn replies(&self, author: &str, limit: usize) -> Result<Vec<String>> {
        validate_author(author)?;
        Ok(self
            .lock()
            .get(author)
            .map(|by_id| by_id.values().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
