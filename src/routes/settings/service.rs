use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::{TtlCache, keys::settings_key};

use super::model::{FeatureSettings, SettingsPatch};
use super::repository::SettingsRepository;

/// 读取走缓存，写入先落库再失效缓存
///
/// 读取在加载前记下代数，写入时在同一把锁内递增代数并失效缓存。
/// 加载期间若有写入发生，加载结果只返回给调用方，不回填缓存，
/// 避免旧值覆盖刚失效的条目。
#[derive(Clone)]
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    cache: Arc<TtlCache<FeatureSettings>>,
    generation: Arc<Mutex<u64>>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, cache: Arc<TtlCache<FeatureSettings>>) -> Self {
        Self {
            repo,
            cache,
            generation: Arc::new(Mutex::new(0)),
        }
    }

    fn generation(&self) -> std::sync::MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache(&self) -> &Arc<TtlCache<FeatureSettings>> {
        &self.cache
    }

    pub async fn get(&self, user_id: &str) -> Result<FeatureSettings, sqlx::Error> {
        let key = settings_key(user_id);
        if let Some(settings) = self.cache.get(&key) {
            return Ok(settings);
        }

        let observed = *self.generation();
        let settings = self.repo.load(user_id).await?.unwrap_or_default();

        // 锁不跨 await
        let generation = self.generation();
        if *generation == observed {
            self.cache.set(&key, settings.clone());
        } else {
            tracing::debug!("Settings for user {} changed during load, not caching", user_id);
        }
        drop(generation);
        Ok(settings)
    }

    /// 合并部分更新。以数据库为准读取当前值，不使用缓存副本
    pub async fn update(
        &self,
        user_id: &str,
        patch: &SettingsPatch,
    ) -> Result<FeatureSettings, sqlx::Error> {
        let current = self.repo.load(user_id).await?.unwrap_or_default();
        let updated = current.apply(patch);
        self.repo.save(user_id, &updated).await?;

        let mut generation = self.generation();
        *generation = generation.wrapping_add(1);
        self.cache.invalidate(&settings_key(user_id));
        drop(generation);
        Ok(updated)
    }
}
