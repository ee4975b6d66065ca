//! Embed URL formats of the supported provider families.

use reelroute_core::{ContentKind, ContentRef};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::EmbedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedScheme {
    VidsrcCc,
    GodrivePlayer,
    EmbedSu,
    TwoEmbed,
    Vidsrc,
}

impl EmbedScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VidsrcCc => "vidsrc_cc",
            Self::GodrivePlayer => "godrive_player",
            Self::EmbedSu => "embed_su",
            Self::TwoEmbed => "two_embed",
            Self::Vidsrc => "vidsrc",
        }
    }

    /// Whether the embed URL is keyed by the external (IMDb) id.
    pub fn requires_external_id(self) -> bool {
        matches!(self, Self::GodrivePlayer)
    }

    /// Build the embed URL for `content` on `host`.
    pub fn embed_url(self, content: &ContentRef, host: &str) -> Result<Url, EmbedError> {
        let mut url = Url::parse(&format!("https://{host}/"))
            .map_err(|_| EmbedError::InvalidUrl(host.to_string()))?;
        let id = content.native_id();
        let episode = content.episode_key();

        match self {
            Self::VidsrcCc => {
                let path = match episode {
                    Some(key) => format!("/v2/embed/tv/{id}/{}/{}", key.season, key.episode),
                    None => format!("/v2/embed/movie/{id}"),
                };
                url.set_path(&path);
                url.query_pairs_mut()
                    .append_pair("autoplay", "1")
                    .append_pair("autonext", "1");
            }
            Self::GodrivePlayer => {
                let imdb = content
                    .external_id()
                    .ok_or(EmbedError::MissingExternalId(self))?;
                let imdb = if imdb.starts_with("tt") {
                    imdb.to_string()
                } else {
                    format!("tt{imdb}")
                };
                url.set_path("/player.php");
                let mut query = url.query_pairs_mut();
                query.append_pair("imdb", &imdb);
                if let Some(key) = episode {
                    query
                        .append_pair("s", &key.season.to_string())
                        .append_pair("e", &key.episode.to_string());
                }
            }
            Self::EmbedSu => {
                let mut query = url.query_pairs_mut();
                query.append_pair("video_id", id);
                if let Some(key) = episode {
                    query
                        .append_pair("s", &key.season.to_string())
                        .append_pair("e", &key.episode.to_string());
                }
                query.append_pair("tmdb", "1").append_pair("check", "1");
            }
            Self::TwoEmbed => {
                url.set_path("/v.php");
                let mut query = url.query_pairs_mut();
                query.append_pair("id", &format!("tmdb-{id}"));
                if let Some(key) = episode {
                    query
                        .append_pair("s", &key.season.to_string())
                        .append_pair("e", &key.episode.to_string());
                }
            }
            Self::Vidsrc => {
                let path = match (content.kind(), episode) {
                    (ContentKind::Episode, Some(key)) => {
                        format!("/embed/tv/{id}/{}/{}", key.season, key.episode)
                    }
                    _ => format!("/embed/movie/{id}"),
                };
                url.set_path(&path);
            }
        }

        Ok(url)
    }
}

impl std::fmt::Display for EmbedScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie() -> ContentRef {
        ContentRef::movie("27205").unwrap()
    }

    fn episode() -> ContentRef {
        ContentRef::episode("1396", 2, 5).unwrap()
    }

    #[test]
    fn vidsrc_cc_urls() {
        assert_eq!(
            EmbedScheme::VidsrcCc
                .embed_url(&movie(), "vidsrc.cc")
                .unwrap()
                .as_str(),
            "https://vidsrc.cc/v2/embed/movie/27205?autoplay=1&autonext=1"
        );
        assert_eq!(
            EmbedScheme::VidsrcCc
                .embed_url(&episode(), "vidsrc.xyz")
                .unwrap()
                .as_str(),
            "https://vidsrc.xyz/v2/embed/tv/1396/2/5?autoplay=1&autonext=1"
        );
    }

    #[test]
    fn godrive_needs_imdb_and_prefixes_tt() {
        assert_eq!(
            EmbedScheme::GodrivePlayer.embed_url(&movie(), "godriveplayer.com"),
            Err(EmbedError::MissingExternalId(EmbedScheme::GodrivePlayer))
        );

        let bare = movie().with_external_id("1375666");
        assert_eq!(
            EmbedScheme::GodrivePlayer
                .embed_url(&bare, "godriveplayer.com")
                .unwrap()
                .as_str(),
            "https://godriveplayer.com/player.php?imdb=tt1375666"
        );

        let ep = episode().with_external_id("tt0903747");
        assert_eq!(
            EmbedScheme::GodrivePlayer
                .embed_url(&ep, "godriveplayer.com")
                .unwrap()
                .as_str(),
            "https://godriveplayer.com/player.php?imdb=tt0903747&s=2&e=5"
        );
    }

    #[test]
    fn embed_su_urls() {
        assert_eq!(
            EmbedScheme::EmbedSu
                .embed_url(&movie(), "multiembed.mov")
                .unwrap()
                .as_str(),
            "https://multiembed.mov/?video_id=27205&tmdb=1&check=1"
        );
        assert_eq!(
            EmbedScheme::EmbedSu
                .embed_url(&episode(), "embed.su")
                .unwrap()
                .as_str(),
            "https://embed.su/?video_id=1396&s=2&e=5&tmdb=1&check=1"
        );
    }

    #[test]
    fn two_embed_and_vidsrc_urls() {
        assert_eq!(
            EmbedScheme::TwoEmbed
                .embed_url(&episode(), "2embed.cc")
                .unwrap()
                .as_str(),
            "https://2embed.cc/v.php?id=tmdb-1396&s=2&e=5"
        );
        assert_eq!(
            EmbedScheme::Vidsrc
                .embed_url(&movie(), "vidsrc.to")
                .unwrap()
                .as_str(),
            "https://vidsrc.to/embed/movie/27205"
        );
        assert_eq!(
            EmbedScheme::Vidsrc
                .embed_url(&episode(), "vidsrc.to")
                .unwrap()
                .as_str(),
            "https://vidsrc.to/embed/tv/1396/2/5"
        );
    }
}
