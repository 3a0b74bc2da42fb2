use crate::error::{ProcessingError, Result};
use crate::storage::{paginate, ListPage, ObjectStore};
use crate::utils::constants::DEFAULT_LIST_PAGE_SIZE;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
}

/// In-process object store, used by tests and dry runs.
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
    page_size: usize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }

    /// Small pages exercise continuation handling
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .read()
            .ok()?
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8], content_type: &str) -> Result<()> {
        let mut objects = self
            .objects
            .write()
            .map_err(|e| ProcessingError::store("put", bucket, key, e))?;

        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: Bytes::copy_from_slice(body),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let objects = self
            .objects
            .read()
            .map_err(|e| ProcessingError::store("get", bucket, key, e))?;

        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
            .ok_or_else(|| ProcessingError::store("get", bucket, key, "no such key"))
    }

    fn head(&self, bucket: &str, key: &str) -> Result<bool> {
        let objects = self
            .objects
            .read()
            .map_err(|e| ProcessingError::store("head", bucket, key, e))?;
        Ok(objects.contains_key(&(bucket.to_string(), key.to_string())))
    }

    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage> {
        let objects = self
            .objects
            .read()
            .map_err(|e| ProcessingError::store("list", bucket, prefix, e))?;

        let keys = objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone());

        Ok(paginate(keys, continuation, self.page_size))
    }
}
