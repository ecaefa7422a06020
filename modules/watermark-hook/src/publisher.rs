use async_trait::async_trait;
use contentful_client::{AssetFields, AssetFile, ContentfulClient, Environment, Link};
use tracing::info;

use crate::config::HookConfig;
use crate::error::Result;

/// An asset about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Where a created asset lives and which version it is at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    pub space_id: String,
    pub environment_id: String,
    pub asset_id: String,
    pub version: u32,
    pub published: bool,
}

/// The three asset lifecycle steps the hook drives, in order.
///
/// Nothing is rolled back: if `process` or `publish` fails, the draft created
/// by `create_asset` stays in the CMS.
#[async_trait]
pub trait AssetPublisher: Send + Sync {
    async fn create_asset(&self, asset: NewAsset) -> Result<AssetHandle>;

    async fn process(&self, handle: AssetHandle) -> Result<AssetHandle>;

    async fn publish(&self, handle: AssetHandle) -> Result<AssetHandle>;
}

/// Publishes into a single Contentful space/environment under one locale.
pub struct ContentfulPublisher {
    client: ContentfulClient,
    space_id: String,
    environment_id: String,
    locale: String,
}

impl ContentfulPublisher {
    pub fn new(client: ContentfulClient, config: &HookConfig) -> Self {
        Self {
            client,
            space_id: config.space_id.clone(),
            environment_id: config.environment_id.clone(),
            locale: config.locale.clone(),
        }
    }

    pub fn from_config(config: &HookConfig) -> Self {
        Self::new(ContentfulClient::new(config.cma_access_token.clone()), config)
    }

    fn environment(handle: &AssetHandle) -> Environment {
        Environment::reference(&handle.space_id, &handle.environment_id)
    }
}

#[async_trait]
impl AssetPublisher for ContentfulPublisher {
    async fn create_asset(&self, asset: NewAsset) -> Result<AssetHandle> {
        let space = self.client.get_space(&self.space_id).await?;
        let env = self
            .client
            .get_environment(&space, &self.environment_id)
            .await?;

        let upload = self.client.create_upload(&env, asset.bytes).await?;

        let file = AssetFile {
            content_type: asset.content_type,
            file_name: asset.file_name,
            upload_from: Some(Link::upload(upload.sys.id)),
            url: None,
            details: None,
        };
        let fields = AssetFields::single_locale(
            &self.locale,
            &asset.title,
            asset.description.as_deref(),
            file,
        );

        let created = self.client.create_asset(&env, &fields).await?;
        info!(asset_id = %created.id(), locale = %self.locale, "Draft asset created");

        Ok(AssetHandle {
            space_id: env.space_id.clone(),
            environment_id: env.id().to_string(),
            asset_id: created.id().to_string(),
            version: created.version(),
            published: false,
        })
    }

    async fn process(&self, handle: AssetHandle) -> Result<AssetHandle> {
        let env = Self::environment(&handle);
        let asset = self.client.get_asset(&env, &handle.asset_id).await?;
        let processed = self.client.process_for_all_locales(&env, asset).await?;

        Ok(AssetHandle {
            version: processed.version(),
            ..handle
        })
    }

    async fn publish(&self, handle: AssetHandle) -> Result<AssetHandle> {
        let env = Self::environment(&handle);
        let published = self
            .client
            .publish_asset(&env, &handle.asset_id, handle.version)
            .await?;

        Ok(AssetHandle {
            version: published.version(),
            published: published.is_published(),
            ..handle
        })
    }
}
