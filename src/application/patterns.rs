use regex::Regex;
use std::sync::LazyLock;

/// One entry of the detection table: which capture groups hold the series
/// name and the episode number.
pub struct EpisodePattern {
    pub name: &'static str,
    pub regex: Regex,
    pub series_group: Option<usize>,
    pub episode_group: usize,
}

impl EpisodePattern {
    fn new(
        name: &'static str,
        pattern: &str,
        series_group: Option<usize>,
        episode_group: usize,
    ) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap_or_else(|err| panic!("{name}: {err}")),
            series_group,
            episode_group,
        }
    }
}

// Order matters: the first matching pattern wins.
pub static EPISODE_PATTERNS: LazyLock<Vec<EpisodePattern>> = LazyLock::new(|| {
    vec![
        // /naruto/12/
        EpisodePattern::new("slash", r"(?i)/([A-Za-z0-9_]+)/([0-9]+)/", Some(1), 2),
        // /episode-5, /episode_5, /episode5
        EpisodePattern::new("episode prefix", r"(?i)/episode[_-]?([0-9]+)", None, 1),
        // /ep-5, /ep_5, /ep5
        EpisodePattern::new("ep prefix", r"(?i)/ep[_-]?([0-9]+)", None, 1),
        // show_5_, show-5-
        EpisodePattern::new("underscore", r"[_-]([0-9]+)[_-]", None, 1),
        // 98/720p/index.m3u8
        EpisodePattern::new("quality", r"(?i)([0-9]+)/[0-9]+p?/index\.m3u8", None, 1),
        // /98/anything.m3u8
        EpisodePattern::new("simple number", r"(?i)/([0-9]+)/[^/]*\.m3u8", None, 1),
    ]
});

#[cfg(test)]
mod test {
    use super::*;

    fn first_match(path: &str) -> Option<&'static str> {
        EPISODE_PATTERNS
            .iter()
            .find(|p| p.regex.is_match(path))
            .map(|p| p.name)
    }

    #[test]
    fn patterns_are_evaluated_in_priority_order() {
        assert_eq!(first_match("/naruto/12/index.m3u8"), Some("slash"));
        assert_eq!(first_match("/stream/Episode_5.m3u8"), Some("episode prefix"));
        assert_eq!(first_match("/stream/EP-5.m3u8"), Some("ep prefix"));
        assert_eq!(first_match("/show_5_hd.m3u8"), Some("underscore"));
        assert_eq!(first_match("98/720p/index.m3u8"), Some("quality"));
        assert_eq!(first_match("/98/master.m3u8"), Some("simple number"));
        assert_eq!(first_match("/video/master.m3u8"), None);
    }

    #[test]
    fn patterns_do_not_treat_unicode_digits_as_episode_numbers() {
        assert_eq!(first_match("/show/١٢/index.m3u8"), None);
    }
}
