use super::{
    episode::{EpisodeInfo, TemplateAnchor, detect_with},
    error::Error,
};
use crate::storage::{
    KeyValueStore, PlayerStorage,
    models::{PlaybackHistory, PlayerSettings, PlayerSettingsPatch},
};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Error,
}

/// Playback session of one user: the open stream, its episode and the
/// persisted history and settings.
pub struct Player<S> {
    storage: PlayerStorage<S>,
    anchor: TemplateAnchor,
    current_url: Option<String>,
    current_episode: Option<EpisodeInfo>,
    state: PlayerState,
    settings: PlayerSettings,
}

impl<S: KeyValueStore> Player<S> {
    pub fn new(mut storage: PlayerStorage<S>, anchor: TemplateAnchor) -> Result<Self, Error> {
        let settings = storage.player_settings()?;

        Ok(Self {
            storage,
            anchor,
            current_url: None,
            current_episode: None,
            state: PlayerState::Idle,
            settings,
        })
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    pub fn current_episode(&self) -> Option<&EpisodeInfo> {
        self.current_episode.as_ref()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn set_state(&mut self, state: PlayerState) {
        self.state = state;
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn storage(&mut self) -> &mut PlayerStorage<S> {
        &mut self.storage
    }

    /// Starts a new stream, detecting its episode from the url.
    pub fn open_url(&mut self, url: &str) -> Result<Option<&EpisodeInfo>, Error> {
        let episode = detect_with(url, self.anchor);
        self.load(url.to_string(), episode)?;

        Ok(self.current_episode.as_ref())
    }

    /// Reopens a history entry. Returns the position to resume from when
    /// resuming is enabled.
    pub fn open_history_item(&mut self, item: &PlaybackHistory) -> Result<Option<f64>, Error> {
        let episode = match &item.series {
            Some(series) => Some(EpisodeInfo::from_history(
                &item.url,
                series,
                item.episode.unwrap_or(1),
                item.title.clone(),
                self.anchor,
            )),
            None => detect_with(&item.url, self.anchor),
        };
        self.load(item.url.clone(), episode)?;

        if self.settings.resume_playback && item.current_time > 0.0 {
            Ok(Some(item.current_time))
        } else {
            Ok(None)
        }
    }

    pub fn next_episode(&mut self) -> Result<&str, Error> {
        let current = self.current_episode.as_ref().ok_or(Error::NoEpisodeDetected)?;
        let next = current.with_episode(current.episode.saturating_add(1));

        self.navigate(next)
    }

    /// Refuses to go below episode 1.
    pub fn previous_episode(&mut self) -> Result<&str, Error> {
        let current = self.current_episode.as_ref().ok_or(Error::NoEpisodeDetected)?;
        if current.episode <= 1 {
            return Err(Error::NoPreviousEpisode);
        }
        let previous = current.with_episode(current.episode - 1);

        self.navigate(previous)
    }

    /// Called when the stream finished. Returns the url of the next episode
    /// when auto-next is enabled and the stream is episodic.
    pub fn on_episode_end(&mut self) -> Result<Option<&str>, Error> {
        self.state = PlayerState::Ended;

        if !self.settings.auto_next || self.current_episode.is_none() {
            return Ok(None);
        }

        self.next_episode().map(Some)
    }

    /// Records the position in the current stream. Ignored while nothing is
    /// open or the duration is not known yet.
    pub fn save_progress(&mut self, current_time: f64, duration: f64) -> Result<(), Error> {
        let Some(url) = self.current_url.clone() else {
            return Ok(());
        };
        if duration == 0.0 {
            return Ok(());
        }

        let watch_progress = current_time / duration * 100.0;
        let entry = self.build_history_entry(url, current_time, duration, watch_progress);
        self.storage.save_playback_history(entry)?;
        self.storage.save_current_session(
            self.current_url.as_deref(),
            self.current_episode.as_ref(),
            current_time,
        )?;

        Ok(())
    }

    /// Records the current stream as fully watched. A known duration is kept
    /// and the position moves to its end.
    pub fn mark_watched(&mut self) -> Result<(), Error> {
        let Some(url) = self.current_url.clone() else {
            return Ok(());
        };

        let duration = self
            .storage
            .playback_history_item(&url)?
            .map_or(0.0, |item| item.duration);
        let entry = self.build_history_entry(url, duration, duration, 100.0);
        self.storage.save_playback_history(entry)?;

        Ok(())
    }

    pub fn set_auto_next(&mut self, auto_next: bool) -> Result<(), Error> {
        self.update_settings(PlayerSettingsPatch {
            auto_next: Some(auto_next),
            ..PlayerSettingsPatch::default()
        })
    }

    pub fn update_settings(&mut self, patch: PlayerSettingsPatch) -> Result<(), Error> {
        self.settings = self.storage.save_player_settings(patch)?;

        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), Error> {
        self.current_url = None;
        self.current_episode = None;
        self.state = PlayerState::Idle;
        self.storage.save_current_session(None, None, 0.0)?;

        Ok(())
    }

    /// Reloads the stream of the last session, if it is recent enough.
    pub fn restore_session(&mut self) -> Result<(&str, f64), Error> {
        let session = self.storage.current_session()?;
        let Some((url, episode, current_time)) = session.and_then(|session| {
            session
                .current_url
                .map(|url| (url, session.current_episode, session.current_time))
        }) else {
            return Err(Error::NothingToRestore);
        };

        self.current_url = Some(url);
        self.current_episode = episode;
        self.state = PlayerState::Loading;

        Ok((self.current_url.as_deref().unwrap_or_default(), current_time))
    }

    fn navigate(&mut self, episode: EpisodeInfo) -> Result<&str, Error> {
        let url = episode.url();
        log::debug!("navigating to episode {}: {url}", episode.episode);
        self.load(url, Some(episode))?;

        Ok(self.current_url.as_deref().unwrap_or_default())
    }

    fn load(&mut self, url: String, episode: Option<EpisodeInfo>) -> Result<(), Error> {
        self.storage
            .save_current_session(Some(&url), episode.as_ref(), 0.0)?;
        self.current_url = Some(url);
        self.current_episode = episode;
        self.state = PlayerState::Loading;

        Ok(())
    }

    fn build_history_entry(
        &self,
        url: String,
        current_time: f64,
        duration: f64,
        watch_progress: f64,
    ) -> PlaybackHistory {
        let episode = self.current_episode.as_ref();

        PlaybackHistory {
            id: build_history_id(),
            url,
            title: episode.and_then(|e| e.title.clone()),
            series: episode.map(|e| e.series.clone()),
            episode: episode.map(|e| e.episode),
            current_time,
            duration,
            watch_progress,
            last_watched: Utc::now(),
            thumbnail: None,
        }
    }
}

fn build_history_id() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();

    format!("{}-{suffix}", Utc::now().timestamp_millis())
}
