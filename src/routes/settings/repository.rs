use async_trait::async_trait;
use sqlx::PgPool;

use super::model::FeatureSettings;

/// 功能设置的持久化接口
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<FeatureSettings>, sqlx::Error>;

    async fn save(&self, user_id: &str, settings: &FeatureSettings) -> Result<(), sqlx::Error>;
}

pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn load(&self, user_id: &str) -> Result<Option<FeatureSettings>, sqlx::Error> {
        tracing::debug!("Loading settings for user: {}", user_id);

        sqlx::query_as::<_, FeatureSettings>(
            r#"
            SELECT ai_memory_enabled, ai_summaries_enabled, ai_tips_enabled, mood_tracking_enabled
            FROM user_settings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn save(&self, user_id: &str, settings: &FeatureSettings) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_settings
                (user_id, ai_memory_enabled, ai_summaries_enabled, ai_tips_enabled, mood_tracking_enabled, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                ai_memory_enabled = EXCLUDED.ai_memory_enabled,
                ai_summaries_enabled = EXCLUDED.ai_summaries_enabled,
                ai_tips_enabled = EXCLUDED.ai_tips_enabled,
                mood_tracking_enabled = EXCLUDED.mood_tracking_enabled,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(settings.ai_memory_enabled)
        .bind(settings.ai_summaries_enabled)
        .bind(settings.ai_tips_enabled)
        .bind(settings.mood_tracking_enabled)
        .execute(&self.pool)
        .await?;

        tracing::info!("Saved settings for user: {}", user_id);
        Ok(())
    }
}
