use std::sync::Arc;

use crate::auth::password::PasswordHasher;
use crate::config::AppConfig;
use crate::images::repo::{ImageRepo, PgImageRepo};
use crate::metrics::ApiMetrics;
use crate::notify::{DisabledNotifier, Notifier, SnsNotifier};
use crate::storage::{self, Storage, StorageClient};
use crate::users::repo::{PgUserRepo, UserRepo};
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub images: Arc<dyn ImageRepo>,
    pub storage: Arc<dyn StorageClient>,
    pub notifier: Arc<dyn Notifier>,
    pub hasher: PasswordHasher,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect(&config).await?;
        if let Err(e) = db::migrate(&pool).await {
            tracing::warn!(error = %format!("{e:#}"), "migration failed; continuing");
        }

        let aws = storage::load_aws_config(&config.s3).await;
        let storage = Arc::new(Storage::new(&aws, &config.s3)) as Arc<dyn StorageClient>;

        let notifier: Arc<dyn Notifier> = match &config.sns_topic_arn {
            Some(arn) => Arc::new(SnsNotifier::new(&aws, arn)),
            None => {
                tracing::warn!("SNS_TOPIC_ARN not set; verification emails will not be requested");
                Arc::new(DisabledNotifier)
            }
        };

        let hasher = PasswordHasher::new(&config.hash)?;

        Ok(Self::from_parts(
            config,
            Arc::new(PgUserRepo::new(pool.clone())),
            Arc::new(PgImageRepo::new(pool)),
            storage,
            notifier,
            hasher,
            Arc::new(ApiMetrics::new()?),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        images: Arc<dyn ImageRepo>,
        storage: Arc<dyn StorageClient>,
        notifier: Arc<dyn Notifier>,
        hasher: PasswordHasher,
        metrics: Arc<ApiMetrics>,
    ) -> Self {
        Self {
            config,
            users,
            images,
            storage,
            notifier,
            hasher,
            metrics,
        }
    }
}
