//! Filesystem-backed partition store.
//!
//! Each partition is a directory under the store root. Each entry is a pair of
//! files keyed by a digest of the request identity (method + URL): `<key>.json`
//! holds the response metadata, `<key>.body` the raw bytes. Writes go through a
//! temp file and rename, so concurrent puts of the same entry resolve to
//! last-write-wins and readers never observe a torn entry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::http::{FetchRequest, FetchResponse, Method, ResponseKind};

/// Stored response metadata. The body lives in a sibling `.body` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    method: Method,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    kind: ResponseKind,
    stored_at: DateTime<Utc>,
}

/// Root of all cache partitions.
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache root: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a partition, creating its directory if needed.
    pub fn partition(&self, name: &str) -> Result<Partition> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create partition: {}", name))?;
        Ok(Partition {
            name: name.to_string(),
            dir,
        })
    }

    /// Names of all partitions currently on disk.
    pub fn partition_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).context("Failed to read cache root")? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a partition and everything in it. Missing partitions are a no-op.
    pub fn delete_partition(&self, name: &str) -> Result<()> {
        let dir = self.root.join(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to delete partition: {}", name))?;
        }
        Ok(())
    }
}

/// A named key→response scope within the store.
pub struct Partition {
    name: String,
    dir: PathBuf,
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Digest of the canonical request identity.
    fn entry_key(request: &FetchRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.method.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(request.url.as_bytes());
        hex_encode(&hasher.finalize())
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.body", key))
    }

    /// Store a response snapshot under the request's identity, replacing any
    /// previous entry. Only GET requests are ever stored.
    pub fn put(&self, request: &FetchRequest, response: &FetchResponse) -> Result<()> {
        if !request.method.is_get() {
            anyhow::bail!("Refusing to cache non-GET request: {}", request.method);
        }

        let key = Self::entry_key(request);
        let meta = EntryMeta {
            method: request.method,
            url: request.url.clone(),
            status: response.status,
            headers: response.headers.clone(),
            kind: response.kind,
            stored_at: Utc::now(),
        };

        // Body first, then metadata: a visible meta file always has its body.
        write_atomic(&self.body_path(&key), &response.body)?;
        let contents = serde_json::to_vec(&meta)?;
        write_atomic(&self.meta_path(&key), &contents)?;
        Ok(())
    }

    /// Look up the exact request identity. Corrupt or partial entries are
    /// treated as a miss and logged, never surfaced as errors.
    pub fn get(&self, request: &FetchRequest) -> Option<FetchResponse> {
        let key = Self::entry_key(request);
        match self.read_entry(&key) {
            Ok(found) => found,
            Err(e) => {
                debug!(partition = %self.name, url = %request.url, error = %e,
                       "Failed to read cache entry, treating as miss");
                None
            }
        }
    }

    fn read_entry(&self, key: &str) -> Result<Option<FetchResponse>> {
        let meta_path = self.meta_path(key);
        if !meta_path.exists() {
            return Ok(None);
        }

        let contents = fs::read(&meta_path)
            .with_context(|| format!("Failed to read cache entry: {}", key))?;
        let meta: EntryMeta = serde_json::from_slice(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", key))?;
        let body = fs::read(self.body_path(key))
            .with_context(|| format!("Failed to read cache entry body: {}", key))?;

        Ok(Some(FetchResponse {
            status: meta.status,
            headers: meta.headers,
            body,
            url: meta.url,
            kind: meta.kind,
        }))
    }

    /// Remove an entry, returning whether it existed.
    pub fn delete(&self, request: &FetchRequest) -> bool {
        let key = Self::entry_key(request);
        let existed = self.meta_path(&key).exists();
        let _ = fs::remove_file(self.meta_path(&key));
        let _ = fs::remove_file(self.body_path(&key));
        existed
    }

    /// URLs of all entries in this partition.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read partition: {}", self.name))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&path)
                .map_err(anyhow::Error::from)
                .and_then(|c| serde_json::from_slice::<EntryMeta>(&c).map_err(Into::into))
            {
                Ok(meta) => urls.push(meta.url),
                Err(e) => {
                    debug!(partition = %self.name, path = %path.display(), error = %e,
                           "Skipping unreadable cache entry");
                }
            }
        }
        urls.sort();
        Ok(urls)
    }

    pub fn len(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| {
                        e.path().extension().and_then(|x| x.to_str()) == Some("json")
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write via temp file and rename so readers never see a partial file.
/// The temp name carries the pid and a counter so concurrent writers of
/// the same key never share a temp file.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let tmp = PathBuf::from(tmp_name);
    fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to finalize cache file: {}", path.display()))?;
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ============================================================================
// Tests
// ============================================================================
