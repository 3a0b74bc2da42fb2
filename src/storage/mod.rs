//! Object store capability used by every stage.
//!
//! Keys are `/`-separated and listed in lexicographic order, the way S3
//! compatible stores return them.

pub mod local;
pub mod memory;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use crate::error::Result;
use bytes::Bytes;

/// One page of a prefix listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Present when more keys remain after this page
    pub continuation: Option<String>,
}

pub trait ObjectStore: Send + Sync {
    /// Write an object. A reader never observes a partially written body.
    fn put(&self, bucket: &str, key: &str, body: &[u8], content_type: &str) -> Result<()>;

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    fn head(&self, bucket: &str, key: &str) -> Result<bool>;

    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage>;

    /// All keys under `prefix`, following continuation tokens until exhausted
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.list_page(bucket, prefix, token.as_deref())?;
            keys.extend(page.keys);

            match page.continuation {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(keys)
    }
}

/// Paginate an already sorted key set, resuming strictly after `continuation`.
pub(crate) fn paginate(
    sorted_keys: impl IntoIterator<Item = String>,
    continuation: Option<&str>,
    page_size: usize,
) -> ListPage {
    let page_size = page_size.max(1);
    let mut remaining = sorted_keys
        .into_iter()
        .filter(|k| continuation.map_or(true, |token| k.as_str() > token));

    let keys: Vec<String> = remaining.by_ref().take(page_size).collect();
    let continuation = if remaining.next().is_some() {
        keys.last().cloned()
    } else {
        None
    };

    ListPage { keys, continuation }
}
