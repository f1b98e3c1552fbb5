use crate::domain::model::{StoredObject, UploadReceipt};
use crate::domain::ports::{DrawingStore, ObjectPattern};
use crate::utils::error::{CutsheetError, Result};
use reqwest::{Client, StatusCode};
use url::Url;

/// Drawing store behind a small REST API:
///
/// - `GET  {base}/folders/{folder}/objects?prefix={id}` lists `[{id, name}]`
/// - `GET  {base}/objects/{id}/content` returns the raw drawing
/// - `POST {base}/folders/{folder}/objects?name={name}` stores a body, returns `{id, url}`
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: Url,
    pattern: ObjectPattern,
}

impl HttpStore {
    pub fn new(base_url: &str, pattern: ObjectPattern) -> Result<Self> {
        Self::with_client(Client::new(), base_url, pattern)
    }

    pub fn with_client(client: Client, base_url: &str, pattern: ObjectPattern) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| CutsheetError::InvalidConfigValueError {
            field: "storage.base_url".to_string(),
            value: base_url.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CutsheetError::InvalidConfigValueError {
                field: "storage.base_url".to_string(),
                value: base_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }
        Ok(Self {
            client,
            base_url,
            pattern,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CutsheetError::StorageError {
                message: format!("'{}' cannot be used as a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl DrawingStore for HttpStore {
    async fn resolve(&self, folder: &str, identifier: &str) -> Result<StoredObject> {
        let mut url = self.endpoint(&["folders", folder, "objects"])?;
        url.query_pairs_mut().append_pair("prefix", identifier);
        tracing::debug!("listing {}", url);

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CutsheetError::ObjectNotFound {
                folder: folder.to_string(),
                identifier: identifier.to_string(),
            });
        }
        let objects: Vec<StoredObject> = response.error_for_status()?.json().await?;

        self.pattern
            .select(objects, identifier)
            .ok_or_else(|| CutsheetError::ObjectNotFound {
                folder: folder.to_string(),
                identifier: identifier.to_string(),
            })
    }

    async fn fetch(&self, object: &StoredObject) -> Result<Vec<u8>> {
        let url = self.endpoint(&["objects", object.id.as_str(), "content"])?;
        tracing::debug!("downloading '{}' from {}", object.name, url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn upload(&self, folder: &str, name: &str, data: &[u8]) -> Result<UploadReceipt> {
        let mut url = self.endpoint(&["folders", folder, "objects"])?;
        url.query_pairs_mut().append_pair("name", name);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/dxf")
            .body(data.to_vec())
            .send()
            .await?
            .error_for_status()?;

        let receipt: UploadReceipt = response.json().await?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let store = HttpStore::new("https://api.example.com/v1/", ObjectPattern::default()).unwrap();

        let url = store.endpoint(&["folders", "orders 2024", "objects"]).unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/folders/orders%202024/objects"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(HttpStore::new("not a url", ObjectPattern::default()).is_err());
        assert!(HttpStore::new("mailto:someone@example.com", ObjectPattern::default()).is_err());
    }
}
