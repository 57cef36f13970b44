use super::patterns::EPISODE_PATTERNS;
use regex::Match;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use url::{Position, Url};

pub const EPISODE_PLACEHOLDER: &str = "{episode}";
pub const UNKNOWN_SERIES: &str = "Unknown Series";

/// Which occurrence of the episode digits becomes the placeholder in
/// [`EpisodeInfo::url_pattern`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateAnchor {
    /// The first textual occurrence anywhere in the url, even when it sits in
    /// the host or an unrelated path segment.
    #[default]
    FirstOccurrence,
    /// Exactly the digits the pattern matched.
    MatchedPosition,
}

/// A stream url recognised as one episode of a series.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeInfo {
    pub series: String,
    pub episode: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub base_url: String,
    pub url_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_episodes: Option<u64>,
    /// Width of a zero-padded episode number ("05" is 2), 0 when unpadded.
    #[serde(default)]
    pub padding: usize,
}

/// Same as [`detect_with`] using [`TemplateAnchor::FirstOccurrence`].
pub fn detect(url: &str) -> Option<EpisodeInfo> {
    detect_with(url, TemplateAnchor::default())
}

/// Tries every known url layout in order and returns the episode of the first
/// one that matches. Unparseable urls and urls without an episode number
/// produce `None`.
pub fn detect_with(url: &str, anchor: TemplateAnchor) -> Option<EpisodeInfo> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!(%url, %err, "not an absolute url");
            return None;
        }
    };
    let path = parsed.path();

    for pattern in EPISODE_PATTERNS.iter() {
        let Some(captures) = pattern.regex.captures(path) else {
            continue;
        };
        let Some(digits) = captures.get(pattern.episode_group) else {
            continue;
        };
        let Ok(episode) = digits.as_str().parse::<u64>() else {
            tracing::debug!(
                pattern = pattern.name,
                digits = digits.as_str(),
                "episode out of range"
            );
            continue;
        };

        let series = pattern
            .series_group
            .and_then(|group| captures.get(group))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| series_from_path(path));

        tracing::debug!(pattern = pattern.name, %series, episode, "episode detected");

        return Some(EpisodeInfo {
            series,
            episode,
            title: None,
            base_url: base_url(url),
            url_pattern: url_pattern(url, &parsed, digits, anchor),
            total_episodes: None,
            padding: padding(digits.as_str()),
        });
    }

    None
}

impl EpisodeInfo {
    /// Rebuilds episode info for a url whose series and episode are already
    /// known, e.g. from playback history. The template and padding come from
    /// detection when it finds the same episode, otherwise the raw url is the
    /// template and every adjacent url is the url itself.
    pub fn from_history(
        url: &str,
        series: &str,
        episode: u64,
        title: Option<String>,
        anchor: TemplateAnchor,
    ) -> Self {
        let (url_pattern, padding) = match detect_with(url, anchor) {
            Some(detected) if detected.episode == episode => (detected.url_pattern, detected.padding),
            _ => {
                tracing::debug!(%url, episode, "stored episode not found in url");
                (url.to_string(), 0)
            }
        };

        Self {
            series: series.to_string(),
            episode,
            title,
            base_url: base_url(url),
            url_pattern,
            total_episodes: None,
            padding,
        }
    }

    /// Url of `target` in the same series. The target is not range checked.
    pub fn build_adjacent_url(&self, target: i64) -> String {
        self.fill_pattern(target)
    }

    pub fn with_episode(&self, episode: u64) -> Self {
        Self {
            episode,
            ..self.clone()
        }
    }

    pub fn url(&self) -> String {
        self.fill_pattern(self.episode)
    }

    fn fill_pattern(&self, episode: impl Display) -> String {
        let episode = format!("{episode:0width$}", width = self.padding);
        self.url_pattern.replacen(EPISODE_PLACEHOLDER, &episode, 1)
    }
}

fn series_from_path(path: &str) -> String {
    path.split('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.replace(['_', '-'], " "))
        .unwrap_or_else(|| UNKNOWN_SERIES.to_string())
}

fn base_url(url: &str) -> String {
    match url.rfind('/') {
        Some(index) => url[..=index].to_string(),
        None => String::new(),
    }
}

fn padding(digits: &str) -> usize {
    if digits.len() > 1 && digits.starts_with('0') {
        digits.len()
    } else {
        0
    }
}

fn url_pattern(url: &str, parsed: &Url, digits: Match<'_>, anchor: TemplateAnchor) -> String {
    if anchor == TemplateAnchor::MatchedPosition {
        // match offsets are relative to the normalized path
        if parsed.as_str() == url {
            let offset = parsed[..Position::BeforePath].len();
            let mut pattern = url.to_string();
            pattern.replace_range(
                offset + digits.start()..offset + digits.end(),
                EPISODE_PLACEHOLDER,
            );
            return pattern;
        }
        tracing::debug!(%url, "url is not normalized, anchoring on first occurrence");
    }

    url.replacen(digits.as_str(), EPISODE_PLACEHOLDER, 1)
}
