use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use super::{StoreError, SubmissionStore};

const STORAGE_API: &str = "https://storage.googleapis.com";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

/// Google Cloud Storage bucket accessed through the JSON API with the
/// service account of the runtime environment.
#[derive(Debug, Clone)]
pub struct GcsStore {
    bucket: String,
    api_base: String,
    client: reqwest::Client,
}

impl GcsStore {
    pub fn new(bucket: String) -> Result<Self, StoreError> {
        Self::with_api_base(bucket, STORAGE_API)
    }

    pub fn with_api_base(bucket: String, api_base: &str) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            bucket,
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn upload_url(&self, key: &str) -> Result<Url, StoreError> {
        let mut url = self.parse(format!(
            "{}/upload/storage/v1/b/{}/o",
            self.api_base, self.bucket
        ))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        Ok(url)
    }

    fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        let mut url = self.parse(format!("{}/storage/v1/b/{}/o", self.api_base, self.bucket))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(self.api_base.clone()))?
            .push(key);
        Ok(url)
    }

    fn parse(&self, raw: String) -> Result<Url, StoreError> {
        Url::parse(&raw).map_err(|err| StoreError::InvalidUrl(format!("{raw}: {err}")))
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        let response = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .map_err(|err| {
                StoreError::Credentials(format!("metadata token request failed: {err}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Credentials(format!(
                "metadata token request failed (status={status}): {body}"
            )));
        }

        let token: AccessToken = response
            .json()
            .await
            .map_err(|err| StoreError::Credentials(format!("metadata token read failed: {err}")))?;
        Ok(token.access_token)
    }

    async fn fetch(&self, key: &str, media: bool) -> Result<Option<reqwest::Response>, StoreError> {
        let mut url = self.object_url(key)?;
        if media {
            url.query_pairs_mut().append_pair("alt", "media");
        }
        let token = self.access_token().await?;
        let response = self.client.get(url).bearer_auth(token).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response)),
            status => Err(StoreError::Status {
                key: key.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl SubmissionStore for GcsStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(self.upload_url(key)?)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(StoreError::Status {
            key: key.to_string(),
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.fetch(key, false).await?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .fetch(key, true)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_json_api_urls() {
        let store = GcsStore::new("call-archive".to_string()).expect("client");
        assert_eq!(
            store.upload_url("1792065600000-0042.json").expect("url").as_str(),
            "https://storage.googleapis.com/upload/storage/v1/b/call-archive/o?uploadType=media&name=1792065600000-0042.json"
        );
        assert_eq!(
            store.object_url("1792065600000-0042.json").expect("url").as_str(),
            "https://storage.googleapis.com/storage/v1/b/call-archive/o/1792065600000-0042.json"
        );
    }

    #[test]
    fn object_names_are_percent_encoded() {
        let store = GcsStore::with_api_base("b".to_string(), "http://localhost:4443/").expect("client");
        assert_eq!(
            store.object_url("dir/a b.json").expect("url").as_str(),
            "http://localhost:4443/storage/v1/b/b/o/dir%2Fa%20b.json"
        );
    }
}
