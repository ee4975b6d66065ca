//! HLS manifest download and quality-variant extraction.

use m3u8_rs::Playlist;
use reelroute_sources::ManifestError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Content-Type for HLS master/variant playlists.
pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// One selectable rendition of a master playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityVariant {
    /// `WIDTHxHEIGHT`, or `{kbps}kbps` when the playlist omits resolution.
    pub name: String,
    pub url: Url,
    pub bandwidth: u64,
    pub resolution: Option<(u64, u64)>,
}

/// Fetches manifest text.
#[async_trait::async_trait]
pub trait ManifestLoader: Send + Sync {
    async fn load(&self, url: &Url) -> Result<String, ManifestError>;
}

pub struct HttpManifestLoader {
    client: reqwest::Client,
}

impl HttpManifestLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ManifestLoader for HttpManifestLoader {
    async fn load(&self, url: &Url) -> Result<String, ManifestError> {
        let resp = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, PLAYLIST_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| ManifestError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ManifestError::Network(format!(
                "manifest returned {}",
                resp.status()
            )));
        }

        resp.text()
            .await
            .map_err(|e| ManifestError::Network(e.to_string()))
    }
}

/// Parse quality variants, highest bandwidth first.
///
/// A media playlist has a single rendition and yields no variants. Relative
/// variant URIs are resolved against `manifest_url`; I-frame-only streams
/// and unresolvable URIs are skipped.
pub fn parse_variants(manifest_url: &Url, text: &str) -> Result<Vec<QualityVariant>, ManifestError> {
    if !text.trim_start().starts_with("#EXTM3U") {
        return Err(ManifestError::Parse("missing #EXTM3U header".into()));
    }

    let playlist = m3u8_rs::parse_playlist_res(text.as_bytes())
        .map_err(|e| ManifestError::Parse(e.to_string()))?;

    let master = match playlist {
        Playlist::MasterPlaylist(master) => master,
        Playlist::MediaPlaylist(_) => return Ok(Vec::new()),
    };

    let mut variants: Vec<QualityVariant> = master
        .variants
        .iter()
        .filter(|v| !v.is_i_frame)
        .filter_map(|v| {
            let url = manifest_url.join(&v.uri).ok()?;
            let resolution = v.resolution.as_ref().map(|r| (r.width, r.height));
            let name = match resolution {
                Some((w, h)) => format!("{w}x{h}"),
                None => format!("{}kbps", v.bandwidth / 1000),
            };
            Some(QualityVariant {
                name,
                url,
                bandwidth: v.bandwidth,
                resolution,
            })
        })
        .collect();

    variants.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));
    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
360p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
https://cdn.example/1080p/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720
720p/index.m3u8
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=90000,URI=\"iframes.m3u8\"
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXTINF:6.0,
seg_00001.ts
#EXTINF:6.0,
seg_00002.ts
#EXT-X-ENDLIST
";

    fn base() -> Url {
        Url::parse("https://stream.example/movie/master.m3u8").unwrap()
    }

    #[test]
    fn master_variants_sorted_by_bandwidth_desc() {
        let variants = parse_variants(&base(), MASTER).unwrap();
        let names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["1920x1080", "1280x720", "640x360"]);
        assert_eq!(
            variants[1].url.as_str(),
            "https://stream.example/movie/720p/index.m3u8"
        );
        assert_eq!(
            variants[0].url.as_str(),
            "https://cdn.example/1080p/index.m3u8"
        );
        assert_eq!(variants[2].resolution, Some((640, 360)));
    }

    #[test]
    fn variant_without_resolution_named_by_bitrate() {
        let text = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1500000
audio_video.m3u8
";
        let variants = parse_variants(&base(), text).unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].name, "1500kbps");
        assert_eq!(variants[0].resolution, None);
    }

    #[test]
    fn media_playlist_has_no_variants() {
        assert!(parse_variants(&base(), MEDIA).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_variants(&base(), "<html>blocked</html>"),
            Err(ManifestError::Parse(_))
        ));
    }
}
