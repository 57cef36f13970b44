//! Player persistence on top of a pluggable key-value store.
//!
//! Everything is kept as JSON strings under a handful of fixed keys so the
//! same data can live in a browser's local storage or in per-user files.

mod error;
mod file;
mod memory;
pub mod models;

use crate::application::EpisodeInfo;
use chrono::{TimeDelta, Utc};
pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;
use models::{
    PlaybackHistory, PlayerSettings, PlayerSettingsPatch, SessionState, StorageData, StorageStats,
};
use serde::{Serialize, de::DeserializeOwned};

pub const PLAYBACK_HISTORY_KEY: &str = "hls-player-history";
pub const PLAYER_SETTINGS_KEY: &str = "hls-player-settings";
pub const CURRENT_SESSION_KEY: &str = "hls-player-session";
pub const DATA_VERSION_KEY: &str = "hls-player-version";

pub const CURRENT_VERSION: &str = "1.0.0";
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// History size kept when a write runs out of space.
const PRUNED_HISTORY_LEN: usize = 50;
const SESSION_MAX_AGE_HOURS: i64 = 24;
const AVAILABILITY_PROBE_KEY: &str = "__storage_test__";

/// String key-value storage, e.g. browser local storage or a directory.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    fn is_available(&mut self) -> bool {
        self.set(AVAILABILITY_PROBE_KEY, AVAILABILITY_PROBE_KEY)
            .and_then(|_| self.remove(AVAILABILITY_PROBE_KEY))
            .is_ok()
    }
}

pub struct PlayerStorage<S> {
    store: S,
    history_limit: usize,
}

impl<S: KeyValueStore> PlayerStorage<S> {
    pub fn new(store: S) -> Self {
        Self::with_history_limit(store, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(store: S, history_limit: usize) -> Self {
        Self {
            store,
            history_limit,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Inserts `entry` at the front, or updates the entry with the same url in
    /// place. Only the newest `history_limit` entries are kept.
    pub fn save_playback_history(&mut self, entry: PlaybackHistory) -> Result<(), StorageError> {
        let mut history = self.playback_history()?;
        let entry = PlaybackHistory {
            last_watched: Utc::now(),
            ..entry
        };

        match history.iter_mut().find(|item| item.url == entry.url) {
            Some(existing) => *existing = entry,
            None => history.insert(0, entry),
        }
        history.truncate(self.history_limit);

        self.safe_set(PLAYBACK_HISTORY_KEY, &history)
    }

    pub fn playback_history(&mut self) -> Result<Vec<PlaybackHistory>, StorageError> {
        self.migrate()?;
        self.read_or(PLAYBACK_HISTORY_KEY, Vec::new)
    }

    pub fn playback_history_item(
        &mut self,
        url: &str,
    ) -> Result<Option<PlaybackHistory>, StorageError> {
        Ok(self
            .playback_history()?
            .into_iter()
            .find(|item| item.url == url))
    }

    pub fn remove_playback_history_item(&mut self, id: &str) -> Result<(), StorageError> {
        let history: Vec<PlaybackHistory> = self
            .playback_history()?
            .into_iter()
            .filter(|item| item.id != id)
            .collect();

        self.safe_set(PLAYBACK_HISTORY_KEY, &history)
    }

    pub fn clear_playback_history(&mut self) -> Result<(), StorageError> {
        self.store.remove(PLAYBACK_HISTORY_KEY)
    }

    pub fn save_player_settings(
        &mut self,
        patch: PlayerSettingsPatch,
    ) -> Result<PlayerSettings, StorageError> {
        let settings = self.player_settings()?.merge(patch);
        self.safe_set(PLAYER_SETTINGS_KEY, &settings)?;

        Ok(settings)
    }

    pub fn player_settings(&mut self) -> Result<PlayerSettings, StorageError> {
        self.migrate()?;
        self.read_or(PLAYER_SETTINGS_KEY, PlayerSettings::default)
    }

    pub fn reset_player_settings(&mut self) -> Result<(), StorageError> {
        self.safe_set(PLAYER_SETTINGS_KEY, &PlayerSettings::default())
    }

    pub fn save_current_session(
        &mut self,
        url: Option<&str>,
        episode: Option<&EpisodeInfo>,
        current_time: f64,
    ) -> Result<(), StorageError> {
        let session = SessionState {
            current_url: url.map(str::to_string),
            current_episode: episode.cloned(),
            current_time,
            last_updated: Utc::now(),
        };

        self.safe_set(CURRENT_SESSION_KEY, &session)
    }

    /// The saved session, unless it is older than a day.
    pub fn current_session(&mut self) -> Result<Option<SessionState>, StorageError> {
        let Some(session) = self.read_or::<Option<SessionState>>(CURRENT_SESSION_KEY, || None)?
        else {
            return Ok(None);
        };

        if Utc::now() - session.last_updated > TimeDelta::hours(SESSION_MAX_AGE_HOURS) {
            log::info!("dropping stale session from {}", session.last_updated);
            self.clear_current_session()?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub fn clear_current_session(&mut self) -> Result<(), StorageError> {
        self.store.remove(CURRENT_SESSION_KEY)
    }

    pub fn clear_all_data(&mut self) -> Result<(), StorageError> {
        for key in [
            PLAYBACK_HISTORY_KEY,
            PLAYER_SETTINGS_KEY,
            CURRENT_SESSION_KEY,
            DATA_VERSION_KEY,
        ] {
            self.store.remove(key)?;
        }

        Ok(())
    }

    pub fn export_data(&mut self) -> Result<String, StorageError> {
        let data = StorageData {
            playback_history: self.playback_history()?,
            player_settings: self.player_settings()?,
            last_updated: Utc::now(),
            version: CURRENT_VERSION.to_string(),
        };

        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Replaces settings, and history when the import carries any, with the
    /// content of an [`export_data`](Self::export_data) document.
    pub fn import_data(&mut self, json: &str) -> Result<(), StorageError> {
        let data: StorageData = serde_json::from_str(json)
            .map_err(|err| StorageError::InvalidData(err.to_string()))?;
        if data.version.is_empty() {
            return Err(StorageError::InvalidData(String::from("missing version")));
        }

        if !data.playback_history.is_empty() {
            self.safe_set(PLAYBACK_HISTORY_KEY, &data.playback_history)?;
        }
        self.safe_set(PLAYER_SETTINGS_KEY, &data.player_settings)
    }

    pub fn stats(&mut self) -> Result<StorageStats, StorageError> {
        let available = self.store.is_available();
        let history = self.playback_history()?;
        let settings = self.player_settings()?;

        let history_size = serde_json::to_string(&history)?.len();
        let settings_size = serde_json::to_string(&settings)?.len();

        Ok(StorageStats {
            available,
            history_count: history.len(),
            estimated_size: history_size + settings_size,
            history_size,
            settings_size,
        })
    }

    fn migrate(&mut self) -> Result<(), StorageError> {
        let version = self.store.get(DATA_VERSION_KEY)?;
        if version.as_deref() != Some(CURRENT_VERSION) {
            log::info!(
                "migrating stored data from {} to {CURRENT_VERSION}",
                version.as_deref().unwrap_or("nothing")
            );
            self.store.set(DATA_VERSION_KEY, CURRENT_VERSION)?;
        }

        Ok(())
    }

    /// Reads `key`, falling back to `default` when it is absent or corrupt.
    fn read_or<T: DeserializeOwned>(
        &self,
        key: &str,
        default: impl FnOnce() -> T,
    ) -> Result<T, StorageError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(default());
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(err) => {
                log::warn!("ignoring corrupt value: key={key}, error={err}");
                Ok(default())
            }
        }
    }

    /// Writes `value`, pruning old history and retrying once when the store
    /// is out of space.
    fn safe_set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;

        match self.store.set(key, &json) {
            Err(StorageError::QuotaExceeded { .. }) => {
                log::error!("storage quota exceeded while writing {key}, pruning history");
                self.prune_history();
                self.store.set(key, &json)
            }
            result => result,
        }
    }

    fn prune_history(&mut self) {
        let mut history = match self.playback_history() {
            Ok(history) => history,
            Err(err) => {
                log::error!("failed to read history for pruning: {err}");
                return;
            }
        };
        if history.len() <= PRUNED_HISTORY_LEN {
            return;
        }

        history.sort_by(|a, b| b.last_watched.cmp(&a.last_watched));
        history.truncate(PRUNED_HISTORY_LEN);

        let result = serde_json::to_string(&history)
            .map_err(StorageError::from)
            .and_then(|json| self.store.set(PLAYBACK_HISTORY_KEY, &json));
        if let Err(err) = result {
            log::error!("failed to prune history: {err}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::application::detect;
    use chrono::DateTime;

    fn build_entry(id: &str, url: &str) -> PlaybackHistory {
        PlaybackHistory {
            id: id.to_string(),
            url: url.to_string(),
            title: None,
            series: None,
            episode: None,
            current_time: 10.0,
            duration: 100.0,
            watch_progress: 10.0,
            last_watched: DateTime::<Utc>::UNIX_EPOCH,
            thumbnail: None,
        }
    }

    fn build_storage() -> PlayerStorage<MemoryStore> {
        PlayerStorage::new(MemoryStore::new())
    }

    #[test]
    fn save_playback_history_fn_inserts_newest_first() {
        let mut storage = build_storage();

        storage.save_playback_history(build_entry("1", "https://a/1.m3u8")).unwrap();
        storage.save_playback_history(build_entry("2", "https://a/2.m3u8")).unwrap();

        let history = storage.playback_history().unwrap();
        let ids: Vec<&str> = history.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!(history[0].last_watched > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn save_playback_history_fn_updates_existing_url_in_place() {
        let mut storage = build_storage();
        storage.save_playback_history(build_entry("1", "https://a/1.m3u8")).unwrap();
        storage.save_playback_history(build_entry("2", "https://a/2.m3u8")).unwrap();

        let mut update = build_entry("3", "https://a/1.m3u8");
        update.current_time = 50.0;
        storage.save_playback_history(update).unwrap();

        let history = storage.playback_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].url, "https://a/1.m3u8");
        assert_eq!(history[1].current_time, 50.0);
    }

    #[test]
    fn save_playback_history_fn_keeps_history_limit() {
        let mut storage = PlayerStorage::with_history_limit(MemoryStore::new(), 3);

        for i in 0..5 {
            storage
                .save_playback_history(build_entry(&i.to_string(), &format!("https://a/{i}.m3u8")))
                .unwrap();
        }

        let history = storage.playback_history().unwrap();
        let ids: Vec<&str> = history.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["4", "3", "2"]);
    }

    #[test]
    fn playback_history_item_fn_finds_by_url() {
        let mut storage = build_storage();
        storage.save_playback_history(build_entry("1", "https://a/1.m3u8")).unwrap();

        assert_eq!(
            storage.playback_history_item("https://a/1.m3u8").unwrap().map(|i| i.id),
            Some("1".to_string())
        );
        assert_eq!(storage.playback_history_item("https://a/9.m3u8").unwrap(), None);
    }

    #[test]
    fn remove_and_clear_playback_history_fns_work_as_expected() {
        let mut storage = build_storage();
        storage.save_playback_history(build_entry("1", "https://a/1.m3u8")).unwrap();
        storage.save_playback_history(build_entry("2", "https://a/2.m3u8")).unwrap();

        storage.remove_playback_history_item("1").unwrap();
        assert_eq!(storage.playback_history().unwrap().len(), 1);

        storage.clear_playback_history().unwrap();
        assert!(storage.playback_history().unwrap().is_empty());
    }

    #[test]
    fn playback_history_fn_ignores_corrupt_json() {
        let mut store = MemoryStore::new();
        store.set(PLAYBACK_HISTORY_KEY, "{not json").unwrap();
        let mut storage = PlayerStorage::new(store);

        assert!(storage.playback_history().unwrap().is_empty());
    }

    #[test]
    fn reading_stamps_current_data_version() {
        let mut storage = build_storage();

        storage.playback_history().unwrap();

        assert_eq!(
            storage.store().get(DATA_VERSION_KEY).unwrap().as_deref(),
            Some(CURRENT_VERSION)
        );
    }

    #[test]
    fn player_settings_fns_merge_and_reset() {
        let mut storage = build_storage();
        assert_eq!(storage.player_settings().unwrap(), PlayerSettings::default());

        let saved = storage
            .save_player_settings(PlayerSettingsPatch {
                auto_next: Some(true),
                ..PlayerSettingsPatch::default()
            })
            .unwrap();
        assert!(saved.auto_next);
        assert!(storage.player_settings().unwrap().auto_next);

        storage.reset_player_settings().unwrap();
        assert!(!storage.player_settings().unwrap().auto_next);
    }

    #[test]
    fn current_session_fn_returns_saved_session() {
        let mut storage = build_storage();
        let url = "https://cdn.example.com/naruto/12/index.m3u8";
        let episode = detect(url).unwrap();

        storage.save_current_session(Some(url), Some(&episode), 42.0).unwrap();

        let session = storage.current_session().unwrap().unwrap();
        assert_eq!(session.current_url.as_deref(), Some(url));
        assert_eq!(session.current_episode, Some(episode));
        assert_eq!(session.current_time, 42.0);
    }

    #[test]
    fn current_session_fn_drops_sessions_older_than_a_day() {
        let mut store = MemoryStore::new();
        let stale = SessionState {
            current_url: Some("https://a/1.m3u8".to_string()),
            current_episode: None,
            current_time: 0.0,
            last_updated: Utc::now() - TimeDelta::hours(25),
        };
        store
            .set(CURRENT_SESSION_KEY, &serde_json::to_string(&stale).unwrap())
            .unwrap();
        let mut storage = PlayerStorage::new(store);

        assert_eq!(storage.current_session().unwrap(), None);
        assert_eq!(storage.store().get(CURRENT_SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn clear_all_data_fn_removes_every_key() {
        let mut storage = build_storage();
        storage.save_playback_history(build_entry("1", "https://a/1.m3u8")).unwrap();
        storage.reset_player_settings().unwrap();
        storage.save_current_session(None, None, 0.0).unwrap();

        storage.clear_all_data().unwrap();

        for key in [
            PLAYBACK_HISTORY_KEY,
            PLAYER_SETTINGS_KEY,
            CURRENT_SESSION_KEY,
            DATA_VERSION_KEY,
        ] {
            assert_eq!(storage.store().get(key).unwrap(), None, "{key} still set");
        }
    }

    #[test]
    fn export_data_fn_output_can_be_imported() {
        let mut source = build_storage();
        source.save_playback_history(build_entry("1", "https://a/1.m3u8")).unwrap();
        source
            .save_player_settings(PlayerSettingsPatch {
                preferred_quality: Some("720p".to_string()),
                ..PlayerSettingsPatch::default()
            })
            .unwrap();

        let exported = source.export_data().unwrap();
        let mut target = build_storage();
        target.import_data(&exported).unwrap();

        assert_eq!(target.playback_history().unwrap().len(), 1);
        assert_eq!(target.player_settings().unwrap().preferred_quality, "720p");
    }

    #[test]
    fn import_data_fn_rejects_invalid_structure() {
        let mut storage = build_storage();

        assert!(matches!(
            storage.import_data(r#"{"playerSettings":{}}"#),
            Err(StorageError::InvalidData(_))
        ));
        assert!(matches!(
            storage.import_data("[]"),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn import_data_fn_keeps_history_when_import_has_none() {
        let mut storage = build_storage();
        storage.save_playback_history(build_entry("1", "https://a/1.m3u8")).unwrap();

        let json = r#"{
            "playbackHistory": [],
            "playerSettings": {"autoPlay": true},
            "lastUpdated": "2024-05-01T10:00:00Z",
            "version": "1.0.0"
        }"#;
        storage.import_data(json).unwrap();

        assert_eq!(storage.playback_history().unwrap().len(), 1);
        assert!(storage.player_settings().unwrap().auto_play);
    }

    #[test]
    fn stats_fn_reports_sizes() {
        let mut storage = build_storage();
        storage.save_playback_history(build_entry("1", "https://a/1.m3u8")).unwrap();

        let stats = storage.stats().unwrap();

        assert!(stats.available);
        assert_eq!(stats.history_count, 1);
        assert_eq!(stats.estimated_size, stats.history_size + stats.settings_size);
        assert!(stats.history_size > 0);
    }

    #[test]
    fn quota_exceeded_write_prunes_history_and_retries() {
        let mut storage = PlayerStorage::new(MemoryStore::new());
        for i in 0..60 {
            storage
                .save_playback_history(build_entry(&i.to_string(), &format!("https://a/{i}.m3u8")))
                .unwrap();
        }
        let used: usize = [PLAYBACK_HISTORY_KEY, DATA_VERSION_KEY]
            .iter()
            .map(|key| key.len() + storage.store().get(key).unwrap().unwrap_or_default().len())
            .sum();

        // room for everything stored so far plus a little, not for a session
        let mut store = MemoryStore::with_quota(used + 16);
        for key in [PLAYBACK_HISTORY_KEY, DATA_VERSION_KEY] {
            let value = storage.store().get(key).unwrap().unwrap();
            store.set(key, &value).unwrap();
        }
        let mut storage = PlayerStorage::new(store);

        storage.save_current_session(Some("https://a/1.m3u8"), None, 1.0).unwrap();

        assert_eq!(storage.playback_history().unwrap().len(), 50);
        assert!(storage.current_session().unwrap().is_some());
    }
}
