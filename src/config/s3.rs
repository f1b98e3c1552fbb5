use crate::domain::model::{StoredObject, UploadReceipt};
use crate::domain::ports::{DrawingStore, ObjectPattern};
use crate::utils::error::{CutsheetError, Result};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use url::Url;

/// Drawing store backed by an S3 bucket. Folders are key prefixes.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: S3Client,
    bucket: String,
    region: String,
    pattern: ObjectPattern,
}

impl S3Store {
    pub fn new(client: S3Client, bucket: String, region: String, pattern: ObjectPattern) -> Self {
        Self {
            client,
            bucket,
            region,
            pattern,
        }
    }

    /// Builds a client from the ambient AWS configuration.
    pub async fn from_env(bucket: String, region: Option<String>, pattern: ObjectPattern) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region.clone() {
            loader = loader.region(aws_config::Region::new(region));
        }
        let shared = loader.load().await;
        let region = region
            .or_else(|| shared.region().map(|r| r.to_string()))
            .unwrap_or_else(|| "us-east-1".to_string());
        Self::new(S3Client::new(&shared), bucket, region, pattern)
    }

    fn key(folder: &str, name: &str) -> String {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", folder, name)
        }
    }

    fn object_url(&self, key: &str) -> Result<String> {
        let mut url = Url::parse(&format!(
            "https://{}.s3.{}.amazonaws.com/",
            self.bucket, self.region
        ))
        .map_err(|e| Self::storage_error("build an object URL for", e))?;
        url.path_segments_mut()
            .map_err(|_| Self::storage_error("build an object URL for", key))?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url.to_string())
    }

    fn storage_error(action: &str, e: impl std::fmt::Display) -> CutsheetError {
        CutsheetError::StorageError {
            message: format!("Failed to {} S3: {}", action, e),
        }
    }
}

impl DrawingStore for S3Store {
    async fn resolve(&self, folder: &str, identifier: &str) -> Result<StoredObject> {
        let prefix = Self::key(folder, identifier);
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| Self::storage_error("list", e))?;

            for object in resp.contents() {
                let Some(key) = object.key() else { continue };
                let name = key.rsplit('/').next().unwrap_or(key).to_string();
                objects.push(StoredObject {
                    id: key.to_string(),
                    name,
                });
            }

            match resp.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        self.pattern
            .select(objects, identifier)
            .ok_or_else(|| CutsheetError::ObjectNotFound {
                folder: folder.to_string(),
                identifier: identifier.to_string(),
            })
    }

    async fn fetch(&self, object: &StoredObject) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object.id)
            .send()
            .await
            .map_err(|e| Self::storage_error("read from", e))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| Self::storage_error("collect data from", e))?;

        Ok(data.into_bytes().to_vec())
    }

    async fn upload(&self, folder: &str, name: &str, data: &[u8]) -> Result<UploadReceipt> {
        let key = Self::key(folder, name);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/dxf")
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| Self::storage_error("write to", e))?;
        tracing::debug!("uploaded {} bytes to s3://{}/{}", data.len(), self.bucket, key);

        let url = self.object_url(&key)?;
        Ok(UploadReceipt { id: key, url })
    }
}
