pub mod episode;
pub mod error;
mod patterns;
pub mod player;
pub mod validation;

pub use episode::{EpisodeInfo, TemplateAnchor, detect, detect_with};
use error::Error;
pub use player::{Player, PlayerState};
use std::{fmt::Display, path::PathBuf};

use crate::storage::{FileStore, PlayerStorage};

pub fn new(
    storage_path: PathBuf,
    template_anchor: TemplateAnchor,
    history_limit: usize,
) -> Application {
    Application {
        storage_path,
        template_anchor,
        history_limit,
    }
}

pub struct UserID(u64);

impl UserID {
    pub fn new(user_id: u64) -> Self {
        Self(user_id)
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct Application {
    storage_path: PathBuf,
    template_anchor: TemplateAnchor,
    history_limit: usize,
}

impl Application {
    pub fn template_anchor(&self) -> TemplateAnchor {
        self.template_anchor
    }

    /// Player backed by the user's own storage directory.
    pub fn open_player(&self, user_id: UserID) -> Result<Player<FileStore>, Error> {
        let store = FileStore::new(self.build_user_storage_path(user_id));
        let storage = PlayerStorage::with_history_limit(store, self.history_limit);

        Player::new(storage, self.template_anchor)
    }

    fn build_user_storage_path(&self, user_id: UserID) -> PathBuf {
        self.storage_path.join(user_id.to_string())
    }
}
