use std::time::Duration;

use tracing::debug;

use crate::bus::{PropMap, PropValue};

/// Track id players report when nothing is loaded
const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

/// Tags of one track.
///
/// Immutable once decoded: a new track produces a new value, shared as
/// `Arc<Metadata>` with consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    track_id: Option<String>,
    title: Option<String>,
    artists: Vec<String>,
    album: Option<String>,
    album_artists: Vec<String>,
    art_url: Option<String>,
    url: Option<String>,
    length: Option<i64>,
    track_number: Option<i32>,
    disc_number: Option<i32>,
    genres: Vec<String>,
    extra: PropMap,
}

impl Metadata {
    /// Decode the `Metadata` property dictionary.
    ///
    /// Known keys with an unexpected type are skipped. Unknown keys end up
    /// in [`extra`](Self::extra).
    pub fn from_properties(properties: &PropMap) -> Self {
        let mut metadata = Self::default();

        for (key, value) in properties {
            let decoded = match key.as_str() {
                "mpris:trackid" => value.as_str().map(|id| {
                    if id != NO_TRACK {
                        metadata.track_id = Some(id.to_string());
                    }
                }),
                "xesam:title" => value
                    .as_str()
                    .map(|title| metadata.title = Some(title.to_string())),
                "xesam:artist" => value
                    .as_string_list()
                    .map(|artists| metadata.artists = artists),
                "xesam:album" => value
                    .as_str()
                    .map(|album| metadata.album = Some(album.to_string())),
                "xesam:albumArtist" => value
                    .as_string_list()
                    .map(|artists| metadata.album_artists = artists),
                "mpris:artUrl" => value
                    .as_str()
                    .map(|url| metadata.art_url = Some(url.to_string())),
                "xesam:url" => value
                    .as_str()
                    .map(|url| metadata.url = Some(url.to_string())),
                "mpris:length" => value.as_i64().map(|length| {
                    if length > 0 {
                        metadata.length = Some(length);
                    }
                }),
                "xesam:trackNumber" => small_int(value).map(|n| metadata.track_number = Some(n)),
                "xesam:discNumber" => small_int(value).map(|n| metadata.disc_number = Some(n)),
                "xesam:genre" => value
                    .as_string_list()
                    .map(|genres| metadata.genres = genres),
                _ => {
                    metadata.extra.insert(key.clone(), value.clone());
                    Some(())
                }
            };

            if decoded.is_none() {
                debug!(key = %key, ?value, "Skipping metadata field with unexpected type");
            }
        }

        metadata
    }

    /// Opaque track identifier (`mpris:trackid`)
    pub fn track_id(&self) -> Option<&str> {
        self.track_id.as_deref()
    }

    /// Track title
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Track artists in reported order
    pub fn artists(&self) -> &[String] {
        &self.artists
    }

    /// Artists joined for display, empty when unknown
    pub fn artist_display(&self) -> String {
        self.artists.join(", ")
    }

    /// Album name
    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    /// Album artists in reported order
    pub fn album_artists(&self) -> &[String] {
        &self.album_artists
    }

    /// Artwork URL
    pub fn art_url(&self) -> Option<&str> {
        self.art_url.as_deref()
    }

    /// Location of the media file
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Track length in microseconds, `None` when unknown
    pub fn length(&self) -> Option<i64> {
        self.length
    }

    /// Track length as a duration, `None` when unknown
    pub fn length_duration(&self) -> Option<Duration> {
        self.length
            .and_then(|micros| u64::try_from(micros).ok())
            .map(Duration::from_micros)
    }

    /// Track number on the album
    pub fn track_number(&self) -> Option<i32> {
        self.track_number
    }

    /// Disc number on the album
    pub fn disc_number(&self) -> Option<i32> {
        self.disc_number
    }

    /// Genres
    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    /// Fields not decoded into a dedicated accessor
    pub fn extra(&self) -> &PropMap {
        &self.extra
    }

    /// Look up any field not decoded into a dedicated accessor
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.extra.get(key)
    }

    /// Whether no field at all was reported
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether `other` describes a different track.
    ///
    /// Compares track ids. Players that report no id on either side are
    /// compared by title, artists, album and URL instead.
    pub fn is_different_track(&self, other: &Metadata) -> bool {
        match (&self.track_id, &other.track_id) {
            (None, None) => {
                self.title != other.title
                    || self.artists != other.artists
                    || self.album != other.album
                    || self.url != other.url
            }
            (ours, theirs) => ours != theirs,
        }
    }
}

fn small_int(value: &PropValue) -> Option<i32> {
    value.as_i64().and_then(|n| i32::try_from(n).ok())
}
