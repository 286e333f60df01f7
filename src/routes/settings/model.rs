use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 用户功能开关
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FeatureSettings {
    pub ai_memory_enabled: bool,
    pub ai_summaries_enabled: bool,
    pub ai_tips_enabled: bool,
    pub mood_tracking_enabled: bool,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            ai_memory_enabled: true,
            ai_summaries_enabled: true,
            ai_tips_enabled: true,
            mood_tracking_enabled: true,
        }
    }
}

/// 部分更新请求，缺省字段保持原值
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub ai_memory_enabled: Option<bool>,
    pub ai_summaries_enabled: Option<bool>,
    pub ai_tips_enabled: Option<bool>,
    pub mood_tracking_enabled: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.ai_memory_enabled.is_none()
            && self.ai_summaries_enabled.is_none()
            && self.ai_tips_enabled.is_none()
            && self.mood_tracking_enabled.is_none()
    }
}

impl FeatureSettings {
    pub fn apply(self, patch: &SettingsPatch) -> Self {
        Self {
            ai_memory_enabled: patch.ai_memory_enabled.unwrap_or(self.ai_memory_enabled),
            ai_summaries_enabled: patch
                .ai_summaries_enabled
                .unwrap_or(self.ai_summaries_enabled),
            ai_tips_enabled: patch.ai_tips_enabled.unwrap_or(self.ai_tips_enabled),
            mood_tracking_enabled: patch
                .mood_tracking_enabled
                .unwrap_or(self.mood_tracking_enabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_only_touches_given_fields() {
        let patch = SettingsPatch {
            ai_memory_enabled: Some(false),
            ..Default::default()
        };
        let updated = FeatureSettings::default().apply(&patch);

        assert!(!updated.ai_memory_enabled);
        assert!(updated.ai_summaries_enabled);
        assert!(updated.mood_tracking_enabled);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(SettingsPatch::default().is_empty());
        let patch: SettingsPatch = serde_json::from_str(r#"{"ai_tips_enabled":false}"#).unwrap();
        assert!(!patch.is_empty());
    }
}
