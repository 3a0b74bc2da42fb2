use crate::error::{ProcessingError, Result};
use crate::storage::{paginate, ListPage, ObjectStore};
use crate::utils::constants::DEFAULT_LIST_PAGE_SIZE;
use bytes::Bytes;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

const TEMP_PREFIX: &str = ".tmp";

/// Filesystem-backed object store: `<root>/<bucket>/<key>`.
///
/// Writes go to a temporary file in the destination directory and are
/// renamed into place, so readers see either the old or the new object.
/// Content types are not persisted.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    page_size: usize,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if bucket.is_empty() || bucket.contains('/') || !is_plain {
            return Err(ProcessingError::store(
                "resolve",
                bucket,
                key,
                "invalid bucket or key",
            ));
        }

        Ok(self.root.join(bucket).join(relative))
    }

    fn collect_keys(dir: &Path, base: &Path, keys: &mut Vec<String>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                continue;
            }

            if entry.file_type()?.is_dir() {
                Self::collect_keys(&path, base, keys)?;
            } else if let Ok(relative) = path.strip_prefix(base) {
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                keys.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalObjectStore {
    fn put(&self, bucket: &str, key: &str, body: &[u8], _content_type: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        let parent = path
            .parent()
            .ok_or_else(|| ProcessingError::store("put", bucket, key, "key has no parent"))?;
        fs::create_dir_all(parent)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(body)?;
        temp.as_file().sync_all()?;
        temp.persist(&path)
            .map_err(|e| ProcessingError::store("put", bucket, key, e.error))?;

        tracing::debug!(message = "object written", bucket = bucket, key = key, bytes = body.len());
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path)
            .map(Bytes::from)
            .map_err(|e| ProcessingError::store("get", bucket, key, e))
    }

    fn head(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self.object_path(bucket, key)?.is_file())
    }

    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage> {
        let base = self.root.join(bucket);
        if !base.is_dir() {
            return Ok(ListPage::default());
        }

        let mut keys = Vec::new();
        Self::collect_keys(&base, &base, &mut keys)
            .map_err(|e| ProcessingError::store("list", bucket, prefix, e))?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();

        Ok(paginate(keys, continuation, self.page_size))
    }
}
