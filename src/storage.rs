use anyhow::Context;
use aws_config::{defaults, BehaviorVersion, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;

use crate::config::S3Config;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    /// Public location recorded alongside the object's metadata.
    fn object_url(&self, key: &str) -> String;
}

/// Shared AWS config for S3 and SNS. Static credentials are used only when
/// both keys are configured, otherwise the default provider chain applies.
pub async fn load_aws_config(cfg: &S3Config) -> SdkConfig {
    let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));
    if let (Some(access), Some(secret)) = (&cfg.access_key, &cfg.secret_key) {
        loader = loader.credentials_provider(Credentials::new(
            access, secret, None, None, "static",
        ));
    }
    loader.load().await
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    endpoint: Option<String>,
}

impl Storage {
    pub fn new(shared: &SdkConfig, cfg: &S3Config) -> Self {
        let mut builder = S3ConfigBuilder::from(shared);
        if let Some(endpoint) = &cfg.endpoint {
            // MinIO and friends
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: cfg.bucket.clone(),
            endpoint: cfg.endpoint.clone(),
        }
    }
}

pub fn object_url(bucket: &str, endpoint: Option<&str>, key: &str) -> String {
    match endpoint {
        Some(ep) => format!("{}/{}/{}", ep.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.amazonaws.com/{}", bucket, key),
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        object_url(&self.bucket, self.endpoint.as_deref(), key)
    }
}
