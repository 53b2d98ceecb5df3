use anyhow::Context;
use axum::async_trait;
use aws_config::SdkConfig;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

/// Published once per created account so a mailer can send the verify link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreatedEvent {
    pub user_id: Uuid,
    pub email: String,
    pub verify_token: String,
    pub verify_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn user_created(&self, event: &UserCreatedEvent) -> anyhow::Result<()>;
}

pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(shared: &SdkConfig, topic_arn: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_sns::Client::new(shared),
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn user_created(&self, event: &UserCreatedEvent) -> anyhow::Result<()> {
        let message = serde_json::to_string(event).context("encode user created event")?;
        let out = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(message)
            .send()
            .await
            .context("sns publish")?;
        info!(
            user_id = %event.user_id,
            message_id = out.message_id().unwrap_or_default(),
            "user created event published"
        );
        Ok(())
    }
}

/// Used when no topic is configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn user_created(&self, event: &UserCreatedEvent) -> anyhow::Result<()> {
        debug!(user_id = %event.user_id, "no SNS topic configured; event dropped");
        Ok(())
    }
}
