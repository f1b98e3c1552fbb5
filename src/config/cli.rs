use crate::domain::model::{StoredObject, UploadReceipt};
use crate::domain::ports::{DrawingStore, ObjectPattern};
use crate::utils::error::{CutsheetError, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Drawing store on the local filesystem: every folder is a sub-directory of
/// `root`, every object a file inside it.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    pattern: ObjectPattern,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, pattern: ObjectPattern) -> Self {
        Self {
            root: root.into(),
            pattern,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DrawingStore for LocalStore {
    async fn resolve(&self, folder: &str, identifier: &str) -> Result<StoredObject> {
        let dir = self.root.join(folder);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CutsheetError::ObjectNotFound {
                    folder: folder.to_string(),
                    identifier: identifier.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            objects.push(StoredObject {
                id: format!("{}/{}", folder, name),
                name,
            });
        }

        self.pattern
            .select(objects, identifier)
            .ok_or_else(|| CutsheetError::ObjectNotFound {
                folder: folder.to_string(),
                identifier: identifier.to_string(),
            })
    }

    async fn fetch(&self, object: &StoredObject) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.root.join(&object.id)).await?;
        Ok(data)
    }

    async fn upload(&self, folder: &str, name: &str, data: &[u8]) -> Result<UploadReceipt> {
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let full_path = dir.join(name);
        tokio::fs::write(&full_path, data).await?;

        let absolute = std::path::absolute(&full_path)?;
        let url = Url::from_file_path(&absolute).map_err(|_| CutsheetError::StorageError {
            message: format!("Cannot express '{}' as a file URL", absolute.display()),
        })?;

        Ok(UploadReceipt {
            id: format!("{}/{}", folder, name),
            url: url.to_string(),
        })
    }
}
