pub mod error;
pub mod types;

pub use error::{ContentfulError, Result};
pub use types::{
    Asset, AssetFields, AssetFile, Environment, Link, LinkSys, Localized, Space, Sys, Upload,
};

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use types::CreateAssetRequest;

const API_URL: &str = "https://api.contentful.com";
const UPLOAD_URL: &str = "https://upload.contentful.com";

const MANAGEMENT_JSON: &str = "application/vnd.contentful.management.v1+json";
const VERSION_HEADER: &str = "X-Contentful-Version";

/// How long to wait between processing checks, and how many checks to make per locale.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingOptions {
    pub check_wait: Duration,
    pub check_retries: u32,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            check_wait: Duration::from_millis(3000),
            check_retries: 10,
        }
    }
}

pub struct ContentfulClient {
    client: reqwest::Client,
    api_url: String,
    upload_url: String,
    token: String,
    processing: ProcessingOptions,
}

impl ContentfulClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: API_URL.to_string(),
            upload_url: UPLOAD_URL.to_string(),
            token,
            processing: ProcessingOptions::default(),
        }
    }

    /// Point the client at different hosts (staging, local stubs).
    pub fn with_base_urls(mut self, api_url: &str, upload_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self.upload_url = upload_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_processing(mut self, processing: ProcessingOptions) -> Self {
        self.processing = processing;
        self
    }

    fn environment_path(&self, env: &Environment) -> String {
        format!(
            "{}/spaces/{}/environments/{}",
            self.api_url,
            env.space_id,
            env.id()
        )
    }

    fn asset_path(&self, env: &Environment, asset_id: &str) -> String {
        format!("{}/assets/{}", self.environment_path(env), asset_id)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
    }

    /// Turn a response into `T`, mapping non-2xx statuses to `ContentfulError::Api`.
    async fn read<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ContentfulError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get_space(&self, space_id: &str) -> Result<Space> {
        let url = format!("{}/spaces/{}", self.api_url, space_id);
        let resp = self.authorized(self.client.get(&url)).send().await?;
        let space: Space = Self::read(resp).await?;
        tracing::debug!(space_id = %space.id(), "Resolved space");
        Ok(space)
    }

    pub async fn get_environment(&self, space: &Space, environment_id: &str) -> Result<Environment> {
        let url = format!(
            "{}/spaces/{}/environments/{}",
            self.api_url,
            space.id(),
            environment_id
        );
        let resp = self.authorized(self.client.get(&url)).send().await?;
        let mut env: Environment = Self::read(resp).await?;
        env.space_id = space.id().to_string();
        tracing::debug!(space_id = %env.space_id, environment = %env.id(), "Resolved environment");
        Ok(env)
    }

    /// Stage raw bytes on the upload host. The returned upload is linked from a new asset.
    pub async fn create_upload(&self, env: &Environment, bytes: Vec<u8>) -> Result<Upload> {
        let url = format!(
            "{}/spaces/{}/environments/{}/uploads",
            self.upload_url,
            env.space_id,
            env.id()
        );
        let size = bytes.len();
        let resp = self
            .authorized(self.client.post(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        let upload: Upload = Self::read(resp).await?;
        tracing::info!(upload_id = %upload.sys.id, size, "Upload staged");
        Ok(upload)
    }

    pub async fn create_asset(&self, env: &Environment, fields: &AssetFields) -> Result<Asset> {
        let url = format!("{}/assets", self.environment_path(env));
        let resp = self
            .authorized(self.client.post(&url))
            .header(reqwest::header::CONTENT_TYPE, MANAGEMENT_JSON)
            .json(&CreateAssetRequest { fields })
            .send()
            .await?;

        let asset: Asset = Self::read(resp).await?;
        tracing::info!(asset_id = %asset.id(), version = asset.version(), "Asset created");
        Ok(asset)
    }

    pub async fn get_asset(&self, env: &Environment, asset_id: &str) -> Result<Asset> {
        let url = self.asset_path(env, asset_id);
        let resp = self.authorized(self.client.get(&url)).send().await?;
        Self::read(resp).await
    }

    /// Trigger processing for one locale. Contentful answers 204 and processes asynchronously.
    async fn process_locale(&self, env: &Environment, asset: &Asset, locale: &str) -> Result<()> {
        let url = format!("{}/files/{}/process", self.asset_path(env, asset.id()), locale);
        let resp = self
            .authorized(self.client.put(&url))
            .header(VERSION_HEADER, asset.version())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ContentfulError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }

    /// Poll until the locale's file has a URL.
    async fn wait_for_processing(
        &self,
        env: &Environment,
        asset_id: &str,
        locale: &str,
    ) -> Result<Asset> {
        for attempt in 1..=self.processing.check_retries {
            tokio::time::sleep(self.processing.check_wait).await;
            let asset = self.get_asset(env, asset_id).await?;
            if asset.is_processed(locale) {
                return Ok(asset);
            }
            tracing::debug!(asset_id, locale, attempt, "Asset still processing");
        }

        Err(ContentfulError::ProcessingTimeout {
            asset_id: asset_id.to_string(),
            locale: locale.to_string(),
            attempts: self.processing.check_retries,
        })
    }

    /// Process every locale that carries a file and wait for each to finish.
    pub async fn process_for_all_locales(&self, env: &Environment, asset: Asset) -> Result<Asset> {
        let locales = asset.file_locales();
        if locales.is_empty() {
            return Err(ContentfulError::MissingFile {
                asset_id: asset.id().to_string(),
                locale: "*".to_string(),
            });
        }

        let mut current = asset;
        for locale in &locales {
            if current.is_processed(locale) {
                continue;
            }
            self.process_locale(env, &current, locale).await?;
            current = self.wait_for_processing(env, current.id(), locale).await?;
        }

        tracing::info!(
            asset_id = %current.id(),
            locales = ?locales,
            version = current.version(),
            "Asset processed"
        );
        Ok(current)
    }

    /// Publish the asset at `version`, which must be its current version.
    pub async fn publish_asset(
        &self,
        env: &Environment,
        asset_id: &str,
        version: u32,
    ) -> Result<Asset> {
        let url = format!("{}/published", self.asset_path(env, asset_id));
        let resp = self
            .authorized(self.client.put(&url))
            .header(VERSION_HEADER, version)
            .send()
            .await?;

        let published: Asset = Self::read(resp).await?;
        tracing::info!(
            asset_id = %published.id(),
            published_version = ?published.sys.published_version,
            "Asset published"
        );
        Ok(published)
    }
}
