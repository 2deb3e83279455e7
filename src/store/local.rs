//! Filesystem backend: each sub-directory of the root is a container and every
//! regular file below it is an object named by its `/`-separated relative path.
//!
//! Symlinks are followed. Dangling links and files whose names are not UTF-8
//! are left out of the listing with a warning.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use futures::stream::{self, StreamExt, TryStreamExt};

use super::{ObjectListing, ObjectReader, ObjectStore, ensure_container_name};
use crate::error::StoreError;
use crate::types::ObjectId;

/// [`ObjectStore`] backed by a local directory tree
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory backing `container`
    fn container_dir(&self, container: &str) -> Result<PathBuf, StoreError> {
        ensure_container_name(container)?;
        if container.contains(['/', '\\']) || container == "." || container == ".." {
            return Err(StoreError::InvalidName {
                name: container.to_string(),
                reason: "container must be a single path component".to_string(),
            });
        }
        Ok(self.root.join(container))
    }

    /// All object names in `container`, sorted lexicographically.
    async fn scan(&self, container: &str) -> Result<Vec<ObjectId>, StoreError> {
        let base = self.container_dir(container)?;
        match tokio::fs::metadata(&base).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(StoreError::ContainerNotFound(container.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::ContainerNotFound(container.to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        }

        let mut names = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![base.clone()];
        while let Some(dir) = pending.pop() {
            // Symlinked directories can form cycles; walk each real directory once.
            if !visited.insert(tokio::fs::canonicalize(&dir).await?) {
                tracing::debug!(path = %dir.display(), "Directory already walked, skipping");
                continue;
            }

            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let mut file_type = entry.file_type().await?;
                if file_type.is_symlink() {
                    match tokio::fs::metadata(&path).await {
                        Ok(target) => file_type = target.file_type(),
                        Err(e) => {
                            tracing::warn!(
                                path = %path.display(),
                                error = %e,
                                "Skipping dangling symlink"
                            );
                            continue;
                        }
                    }
                }

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    match object_name(&base, &path) {
                        Some(name) => names.push(ObjectId::from(name)),
                        None => tracing::warn!(
                            path = %path.display(),
                            "Skipping object with non-UTF-8 name"
                        ),
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Relative path of `path` under `base`, joined with `/`
fn object_name(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Option<Vec<&str>> = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    Some(parts?.join("/"))
}

/// Map an object name back to a path, refusing anything that escapes the container.
fn object_path(base: &Path, object: &ObjectId) -> Result<PathBuf, StoreError> {
    let invalid = |reason: &str| StoreError::InvalidName {
        name: object.to_string(),
        reason: reason.to_string(),
    };

    if object.is_empty() {
        return Err(invalid("object name must not be empty"));
    }

    let mut path = base.to_path_buf();
    for part in object.as_str().split('/') {
        match part {
            "" | "." => return Err(invalid("empty or '.' path segment")),
            ".." => return Err(invalid("'..' is not allowed")),
            _ => {
                let mut components = Path::new(part).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => path.push(part),
                    _ => return Err(invalid("segment is not a plain file name")),
                }
            }
        }
    }
    Ok(path)
}

#[async_trait::async_trait]
impl ObjectStore for LocalStore {
    fn list<'a>(&'a self, container: &'a str, prefix: &'a str) -> ObjectListing<'a> {
        stream::once(self.scan(container))
            .map_ok(move |names| {
                stream::iter(
                    names
                        .into_iter()
                        .filter(move |name| name.as_str().starts_with(prefix))
                        .map(Ok::<_, StoreError>),
                )
            })
            .try_flatten()
            .boxed()
    }

    async fn open(
        &self,
        container: &str,
        object: &ObjectId,
    ) -> Result<ObjectReader, StoreError> {
        let base = self.container_dir(container)?;
        let path = object_path(&base, object)?;

        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::ObjectNotFound(object.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
