use super::episode::{EpisodeInfo, TemplateAnchor, detect_with};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

// Manifests and segments a player can open directly, optionally followed by
// a query string.
static HLS_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\.m3u8($|\?)",
        r"(?i)/playlist\.m3u8($|\?)",
        r"(?i)/index\.m3u8($|\?)",
        r"(?i)master\.txt($|\?)",
        r"(?i)cf-master\.txt($|\?)",
        r"(?i)index\.txt($|\?)",
        r"(?i)playlist\.txt($|\?)",
        r"(?i)\.ts($|\?)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap_or_else(|err| panic!("{pattern}: {err}")))
    .collect()
});

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    Empty,
    InvalidFormat,
    NotHls,
}

impl std::error::Error for ValidationError {}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let as_str = match self {
            ValidationError::Empty => "URL is empty",
            ValidationError::InvalidFormat => "Invalid URL format",
            ValidationError::NotHls => "URL must be an HLS stream (.m3u8, .txt, or .ts)",
        };

        write!(f, "{as_str}")
    }
}

/// A url accepted as an HLS stream.
#[derive(Debug, PartialEq, Eq)]
pub struct HlsUrl {
    pub url: String,
    pub episode: Option<EpisodeInfo>,
}

pub fn validate_hls_url(url: &str, anchor: TemplateAnchor) -> Result<HlsUrl, ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::Empty);
    }

    if Url::parse(url).is_err() {
        return Err(ValidationError::InvalidFormat);
    }

    if !HLS_URL_PATTERNS.iter().any(|pattern| pattern.is_match(url)) {
        return Err(ValidationError::NotHls);
    }

    Ok(HlsUrl {
        url: url.to_string(),
        episode: detect_with(url, anchor),
    })
}
