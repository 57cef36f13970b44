use crate::{application::TemplateAnchor, storage::DEFAULT_HISTORY_LIMIT};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub bot_token: String,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default)]
    pub template_anchor: TemplateAnchor,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("storage")
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

pub fn new(path: &Path) -> Result<Config, config::ConfigError> {
    let path_str = match path.to_str() {
        Some(str) => str,
        None => {
            return Err(config::ConfigError::Message(String::from(
                "cannot parse path parameter",
            )));
        }
    };

    config::Config::builder()
        .add_source(config::File::with_name(path_str).required(true))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn config_new_fn_applies_defaults() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"bot_token": "123:abc"}}"#).unwrap();

        let config = new(file.path()).unwrap();

        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.storage_path, PathBuf::from("storage"));
        assert_eq!(config.template_anchor, TemplateAnchor::FirstOccurrence);
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn config_new_fn_reads_template_anchor() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"bot_token": "t", "storage_path": "/var/lib/hls", "template_anchor": "matched_position", "history_limit": 20}}"#
        )
        .unwrap();

        let config = new(file.path()).unwrap();

        assert_eq!(config.storage_path, PathBuf::from("/var/lib/hls"));
        assert_eq!(config.template_anchor, TemplateAnchor::MatchedPosition);
        assert_eq!(config.history_limit, 20);
    }

    #[test]
    fn config_new_fn_fails_on_missing_file() {
        assert!(new(Path::new("does_not_exist.json")).is_err());
    }
}
