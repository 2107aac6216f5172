/// Track domain type
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Image descriptor attached to a track (cover art, thumbnails)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    /// Image URI
    pub src: String,

    /// Size hint, e.g. "512x512"
    #[serde(default)]
    pub sizes: Option<String>,

    /// MIME type, e.g. "image/png"
    #[serde(default, alias = "type")]
    pub mime_type: Option<String>,
}

impl Artwork {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            sizes: None,
            mime_type: None,
        }
    }
}

/// Playable media item
///
/// Identity is `id`: two tracks with the same id are the same logical item
/// even when their other fields differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Caller-assigned identifier
    pub id: String,

    /// Track title
    pub title: String,

    /// Artist name
    #[serde(default)]
    pub artist: Option<String>,

    /// Album name
    #[serde(default)]
    pub album: Option<String>,

    /// Genre
    #[serde(default)]
    pub genre: Option<String>,

    /// Media locator. May point at an adaptive-stream manifest (`.m3u8`).
    /// `None` means the source is resolved lazily by a fetcher.
    #[serde(default)]
    pub source: Option<String>,

    /// Artwork, in preference order
    #[serde(default)]
    pub artwork: Vec<Artwork>,

    /// Track duration in milliseconds
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: None,
            album: None,
            genre: None,
            source: None,
            artwork: Vec::new(),
            duration_ms: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    #[must_use]
    pub fn with_artwork(mut self, artwork: Artwork) -> Self {
        self.artwork.push(artwork);
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.set_duration(duration);
        self
    }

    /// Get the track duration as a Duration
    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }

    /// Set the track duration from a Duration
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_ms = Some(duration.as_millis() as u64);
    }

    /// Whether the source denotes an HLS manifest
    ///
    /// Query strings and fragments are ignored, so signed manifest URLs
    /// (`.../master.m3u8?token=...`) are recognised too.
    pub fn is_manifest(&self) -> bool {
        self.source.as_deref().is_some_and(is_manifest_uri)
    }
}

/// Whether a URI points at an HLS manifest
pub fn is_manifest_uri(uri: &str) -> bool {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.to_ascii_lowercase().ends_with(".m3u8")
}
