use crate::application::EpisodeInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One watched stream, keyed by url.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackHistory {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u64>,
    pub current_time: f64,
    pub duration: f64,
    /// 0 to 100.
    pub watch_progress: f64,
    pub last_watched: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSettings {
    pub auto_play: bool,
    /// 0 to 1.
    pub default_volume: f64,
    pub preferred_quality: String,
    pub auto_next: bool,
    pub resume_playback: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            auto_play: false,
            default_volume: 0.8,
            preferred_quality: String::from("auto"),
            auto_next: false,
            resume_playback: true,
        }
    }
}

/// Partial update of [`PlayerSettings`]; `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerSettingsPatch {
    pub auto_play: Option<bool>,
    pub default_volume: Option<f64>,
    pub preferred_quality: Option<String>,
    pub auto_next: Option<bool>,
    pub resume_playback: Option<bool>,
}

impl PlayerSettings {
    pub fn merge(self, patch: PlayerSettingsPatch) -> Self {
        Self {
            auto_play: patch.auto_play.unwrap_or(self.auto_play),
            default_volume: patch.default_volume.unwrap_or(self.default_volume),
            preferred_quality: patch.preferred_quality.unwrap_or(self.preferred_quality),
            auto_next: patch.auto_next.unwrap_or(self.auto_next),
            resume_playback: patch.resume_playback.unwrap_or(self.resume_playback),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub current_url: Option<String>,
    pub current_episode: Option<EpisodeInfo>,
    pub current_time: f64,
    pub last_updated: DateTime<Utc>,
}

/// Export/import envelope.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageData {
    pub playback_history: Vec<PlaybackHistory>,
    pub player_settings: PlayerSettings,
    pub last_updated: DateTime<Utc>,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub available: bool,
    pub history_count: usize,
    pub estimated_size: usize,
    pub history_size: usize,
    pub settings_size: usize,
}
