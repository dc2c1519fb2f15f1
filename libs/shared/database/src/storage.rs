use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

/// Object-storage client: given a binary blob and a folder hint, returns a
/// public URL. Used once per appointment creation when a medical report is
/// attached; the upload happens before the booking transaction opens, so a
/// failed booking can leave an orphaned object behind (accepted trade-off).
pub struct BlobStorage {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BlobStorage {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.storage_url.clone(),
            api_key: config.storage_api_key.clone(),
        }
    }

    pub async fn upload(&self, data: Vec<u8>, folder: &str, content_type: &str) -> Result<String> {
        let object_name = Uuid::new_v4().to_string();
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, folder, object_name);
        debug!("Uploading {} bytes to {}", data.len(), url);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Storage upload failed ({}): {}", status, error_text);
            return Err(anyhow!("Storage upload failed ({}): {}", status, error_text));
        }

        Ok(self.public_url(folder, &object_name))
    }

    pub fn public_url(&self, folder: &str, object_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, folder, object_name
        )
    }
}
