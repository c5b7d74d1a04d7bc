use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore};

use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Route prefix under which stored documents are served back to clients.
pub const FILES_ROUTE_PREFIX: &str = "files";

/// Object storage for uploaded source documents.
///
/// Every stored object has a public URL of the form
/// `{public_base_url}/files/{location}`, which is what notes keep as their
/// content reference.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
    local_base: Option<PathBuf>,
    public_base_url: String,
}

impl StorageManager {
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let backend_kind = cfg.storage.clone();
        let (store, local_base) = create_storage_backend(cfg).await?;

        Ok(Self {
            store,
            backend_kind,
            local_base,
            public_base_url: normalize_base_url(&cfg.public_base_url),
        })
    }

    /// Wrap an existing backend, e.g. an `InMemory` store in tests.
    pub fn with_backend(store: DynStore, backend_kind: StorageKind, public_base_url: &str) -> Self {
        Self {
            store,
            backend_kind,
            local_base: None,
            public_base_url: normalize_base_url(public_base_url),
        }
    }

    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    /// Store bytes and return the public URL they are reachable at.
    pub async fn upload(&self, location: &str, data: Bytes) -> object_store::Result<String> {
        self.put(location, data).await?;
        Ok(self.public_url(location))
    }

    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }

    /// Delete all objects below `prefix`. Local backends also drop the emptied directories.
    pub async fn delete_prefix(&self, prefix: &str) -> object_store::Result<()> {
        let prefix_path = ObjPath::from(prefix);
        let locations = self
            .store
            .list(Some(&prefix_path))
            .map_ok(|m| m.location)
            .boxed();
        self.store
            .delete_stream(locations)
            .try_collect::<Vec<_>>()
            .await?;

        if matches!(self.backend_kind, StorageKind::Local) {
            self.cleanup_filesystem_directories(prefix).await;
        }

        Ok(())
    }

    pub fn public_url(&self, location: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url,
            FILES_ROUTE_PREFIX,
            location.trim_start_matches('/')
        )
    }

    /// Inverse of [`public_url`](Self::public_url). Returns `None` for URLs this store did not hand out.
    pub fn location_for_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base_url)?;
        let location = rest
            .strip_prefix('/')?
            .strip_prefix(FILES_ROUTE_PREFIX)?
            .strip_prefix('/')?;
        if location.is_empty() || !is_safe_relative(location) {
            return None;
        }
        Some(location.to_string())
    }

    async fn cleanup_filesystem_directories(&self, prefix: &str) {
        let Some(base) = &self.local_base else {
            return;
        };

        if !is_safe_relative(prefix) {
            tracing::warn!(
                prefix = %prefix,
                "Skipping directory cleanup for unsupported prefix components"
            );
            return;
        }

        let mut current = base.join(prefix);

        while current.starts_with(base) && current.as_path() != base.as_path() {
            if let Err(err) = tokio::fs::remove_dir(&current).await {
                match err.kind() {
                    ErrorKind::NotFound => {}
                    ErrorKind::DirectoryNotEmpty => break,
                    _ => tracing::debug!(
                        error = %err,
                        path = %current.display(),
                        "Failed to remove directory during cleanup"
                    ),
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// True when `location` stays below the storage root.
pub fn is_safe_relative(location: &str) -> bool {
    let relative = Path::new(location);
    !relative.is_absolute()
        && !relative
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
}

async fn create_storage_backend(
    cfg: &AppConfig,
) -> object_store::Result<(DynStore, Option<PathBuf>)> {
    match cfg.storage {
        StorageKind::Local => {
            let base = resolve_base_dir(cfg);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await.map_err(|e| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: e.into(),
                    }
                })?;
            }
            let store = LocalFileSystem::new_with_prefix(base.clone())?;
            Ok((Arc::new(store), Some(base)))
        }
        StorageKind::Memory => Ok((Arc::new(InMemory::new()), None)),
    }
}

/// Resolve the absolute base directory used for local storage.
///
/// A relative `data_dir` is resolved against the current working directory.
pub fn resolve_base_dir(cfg: &AppConfig) -> PathBuf {
    if cfg.data_dir.starts_with('/') {
        PathBuf::from(&cfg.data_dir)
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&cfg.data_dir)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;

    pub const TEST_PUBLIC_BASE_URL: &str = "http://files.test";

    /// In-memory storage with a fixed public base URL.
    pub fn memory_storage() -> StorageManager {
        StorageManager::with_backend(
            Arc::new(InMemory::new()),
            StorageKind::Memory,
            TEST_PUBLIC_BASE_URL,
        )
    }
}
