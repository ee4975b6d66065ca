//! `/play/:type/:id` routes, the only externally addressable surface.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::RouteError;
use crate::types::{ContentRef, TitleKind};

static PLAY_ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/play/([a-z]+)/([A-Za-z0-9_-]+)/?(?:\?(.*))?$").unwrap()
});

/// Build a `ContentRef` from a play route.
///
/// TV routes take `season`/`episode` from the query string and start at
/// S1E1 when either is missing.
pub fn parse_play_route(path: &str) -> Result<ContentRef, RouteError> {
    let caps = PLAY_ROUTE_RE
        .captures(path.trim())
        .ok_or_else(|| RouteError::NotAPlayRoute(path.to_string()))?;

    let kind = TitleKind::from_str(&caps[1])
        .ok_or_else(|| RouteError::UnsupportedType(caps[1].to_string()))?;
    let id = &caps[2];

    match kind {
        TitleKind::Movie => Ok(ContentRef::movie(id)?),
        TitleKind::Tv => {
            let mut season = None;
            let mut episode = None;
            if let Some(query) = caps.get(3) {
                for (key, value) in url::form_urlencoded::parse(query.as_str().as_bytes()) {
                    match key.as_ref() {
                        "season" => season = Some(parse_coordinate("season", &value)?),
                        "episode" => episode = Some(parse_coordinate("episode", &value)?),
                        _ => {}
                    }
                }
            }
            Ok(ContentRef::episode(
                id,
                season.unwrap_or(1),
                episode.unwrap_or(1),
            )?)
        }
    }
}

/// Render the play route for a `ContentRef`.
pub fn play_route(content: &ContentRef) -> String {
    match content.episode_key() {
        Some(key) => format!(
            "/play/tv/{}?season={}&episode={}",
            content.native_id(),
            key.season,
            key.episode
        ),
        None => format!("/play/movie/{}", content.native_id()),
    }
}

fn parse_coordinate(param: &'static str, value: &str) -> Result<u32, RouteError> {
    value.parse().map_err(|_| RouteError::InvalidParam {
        param,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContentRefError;
    use crate::types::{ContentKind, EpisodeKey};

    #[test]
    fn parses_movie_route() {
        let content = parse_play_route("/play/movie/27205").unwrap();
        assert_eq!(content.kind(), ContentKind::Movie);
        assert_eq!(content.native_id(), "27205");
        assert_eq!(content.episode_key(), None);
    }

    #[test]
    fn tv_route_defaults_to_first_episode() {
        let content = parse_play_route("/play/tv/1396").unwrap();
        assert_eq!(content.kind(), ContentKind::Episode);
        assert_eq!(content.episode_key(), Some(EpisodeKey::new(1, 1)));
    }

    #[test]
    fn tv_route_reads_query() {
        let content = parse_play_route("/play/tv/1396?season=3&episode=7").unwrap();
        assert_eq!(content.episode_key(), Some(EpisodeKey::new(3, 7)));
        assert_eq!(play_route(&content), "/play/tv/1396?season=3&episode=7");
    }

    #[test]
    fn rejects_bad_routes() {
        assert!(matches!(
            parse_play_route("/movie/27205"),
            Err(RouteError::NotAPlayRoute(_))
        ));
        assert!(matches!(
            parse_play_route("/play/person/31"),
            Err(RouteError::UnsupportedType(t)) if t == "person"
        ));
        assert!(matches!(
            parse_play_route("/play/tv/1396?season=two"),
            Err(RouteError::InvalidParam { param: "season", .. })
        ));
        assert_eq!(
            parse_play_route("/play/tv/1396?season=0&episode=1"),
            Err(RouteError::Content(ContentRefError::NonPositiveCoordinates {
                season: 0,
                episode: 1
            }))
        );
    }
}
