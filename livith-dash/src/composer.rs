//! Setlist Composer
//!
//! One-shot workflow behind `POST /dashboard/create-setlist`: create a
//! setlist for a concert, link the two, then create (if needed) and attach
//! each song in order.
//!
//! Steps run strictly one after another. The workflow is not atomic: the
//! first failing step aborts the rest and earlier writes stay in place.

use livith_common::Table;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{DashError, DashResult};
use crate::store::{record_id, Record, RecordStore};

/// Kind of concert ↔ setlist link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
    Ongoing,
    Past,
    #[default]
    Expected,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Ongoing => "ONGOING",
            LinkType::Past => "PAST",
            LinkType::Expected => "EXPECTED",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONGOING" => Ok(LinkType::Ongoing),
            "PAST" => Ok(LinkType::Past),
            "EXPECTED" => Ok(LinkType::Expected),
            other => Err(DashError::Validation(format!("Invalid setlist type: {}", other))),
        }
    }
}

/// Setlist fields supplied by the operator; gaps fall back to the concert
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetlistDescriptor {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub venue: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub img_url: Option<String>,
}

/// A song to attach: an existing song by `id`, or a new song to create
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongEntry {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub youtube_id: Option<String>,
    pub img_url: Option<String>,
    pub lyrics: Option<String>,
    pub pronunciation: Option<String>,
    pub translation: Option<String>,
    pub fanchant: Option<String>,
    pub fanchant_point: Option<String>,
}

/// Body of `POST /dashboard/create-setlist`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSetlistRequest {
    #[serde(default, deserialize_with = "lenient_id")]
    pub concert_id: Option<i64>,
    pub setlist: Option<SetlistDescriptor>,
    pub songs: Option<Vec<SongEntry>>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
}

/// Result of a successful composition
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedSetlist {
    pub setlist: Record,
    pub songs_created: usize,
    pub total_songs: usize,
}

/// Accepts `7`, `"7"`, `null`; `0` and `""` count as absent
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0))
}

/// Non-empty string, else `None`
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// First non-empty of the operator's value and the concert's value
fn or_concert(value: &Option<String>, concert: &Record, field: &str) -> Value {
    match present(value) {
        Some(v) => Value::from(v),
        None => concert.get(field).cloned().unwrap_or(Value::Null),
    }
}

fn opt(value: &Option<String>) -> Value {
    present(value).map(Value::from).unwrap_or(Value::Null)
}

fn object(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// Validate the request, then compose the setlist
///
/// `Validation` when concert, setlist or songs are missing (or songs is
/// empty), `NotFound` when the concert does not exist. Failures after that
/// point are reported as `Persistence("Failed to create setlist: ...")`.
pub async fn compose(
    store: &dyn RecordStore,
    request: &CreateSetlistRequest,
) -> DashResult<ComposedSetlist> {
    let (concert_id, descriptor, songs) = match (
        request.concert_id,
        request.setlist.as_ref(),
        request.songs.as_deref(),
    ) {
        (Some(concert_id), Some(descriptor), Some(songs)) if !songs.is_empty() => {
            (concert_id, descriptor, songs)
        }
        _ => return Err(DashError::Validation("Missing required fields".to_string())),
    };

    let link_type = match request.link_type.as_deref().filter(|t| !t.is_empty()) {
        Some(t) => t.parse::<LinkType>()?,
        None => LinkType::default(),
    };

    let concert = match store.get(Table::Concerts, concert_id).await {
        Ok(concert) => concert,
        Err(DashError::NotFound(_)) => {
            return Err(DashError::NotFound("Concert not found".to_string()))
        }
        Err(e) => return Err(e),
    };

    let result = compose_steps(store, concert_id, &concert, descriptor, songs, link_type).await;
    if let Err(e) = &result {
        warn!("Create setlist for concert {} failed: {}", concert_id, e);
    }
    result.map_err(|e| DashError::Persistence(format!("Failed to create setlist: {}", e)))
}

async fn compose_steps(
    store: &dyn RecordStore,
    concert_id: i64,
    concert: &Record,
    descriptor: &SetlistDescriptor,
    songs: &[SongEntry],
    link_type: LinkType,
) -> DashResult<ComposedSetlist> {
    let setlist = store
        .create(
            Table::Setlists,
            &object(json!({
                "title": or_concert(&descriptor.title, concert, "title"),
                "artist": or_concert(&descriptor.artist, concert, "artist"),
                "start_date": or_concert(&descriptor.start_date, concert, "start_date"),
                "end_date": or_concert(&descriptor.end_date, concert, "end_date"),
                "venue": or_concert(&descriptor.venue, concert, "venue"),
                "img_url": opt(&descriptor.img_url),
            })),
        )
        .await?;
    let setlist_id = record_id(&setlist)
        .ok_or_else(|| DashError::Persistence("Created setlist has no id".to_string()))?;
    let setlist_title = setlist.get("title").cloned().unwrap_or(Value::Null);
    let setlist_date = setlist.get("start_date").cloned().unwrap_or(Value::Null);

    store
        .create(
            Table::ConcertSetlists,
            &object(json!({
                "concert_id": concert_id,
                "setlist_id": setlist_id,
                "type": link_type.as_str(),
                "status": "",
                "concert_title": concert.get("title").cloned().unwrap_or(Value::Null),
                "setlist_title": setlist_title,
            })),
        )
        .await?;

    let mut songs_created = 0;
    for (position, song) in songs.iter().enumerate() {
        let song_id = match song.id {
            Some(id) => id,
            None => {
                let created = store
                    .create(
                        Table::Songs,
                        &object(json!({
                            "title": opt(&song.title),
                            "artist": or_concert(&song.artist, concert, "artist"),
                            "youtube_id": opt(&song.youtube_id),
                            "img_url": opt(&song.img_url),
                            "lyrics": opt(&song.lyrics),
                            "pronunciation": opt(&song.pronunciation),
                            "translation": opt(&song.translation),
                        })),
                    )
                    .await?;
                songs_created += 1;
                record_id(&created)
                    .ok_or_else(|| DashError::Persistence("Created song has no id".to_string()))?
            }
        };

        store
            .create(
                Table::SetlistSongs,
                &object(json!({
                    "setlist_id": setlist_id,
                    "song_id": song_id,
                    "order_index": position,
                    "setlist_date": setlist_date,
                    "setlist_title": setlist_title,
                    "song_title": opt(&song.title),
                    "fanchant": opt(&song.fanchant),
                    "fanchant_point": opt(&song.fanchant_point),
                })),
            )
            .await?;
    }

    info!(
        "Created setlist {} for concert {}: {} songs ({} new)",
        setlist_id,
        concert_id,
        songs.len(),
        songs_created
    );

    Ok(ComposedSetlist {
        setlist,
        songs_created,
        total_songs: songs.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_type_parse() {
        assert_eq!("PAST".parse::<LinkType>().unwrap(), LinkType::Past);
        assert_eq!(LinkType::default(), LinkType::Expected);
        assert!("past".parse::<LinkType>().is_err());
    }

    #[test]
    fn test_request_ids_are_lenient() {
        let request: CreateSetlistRequest = serde_json::from_value(json!({
            "concert_id": "12",
            "setlist": {},
            "songs": [{"id": 0, "title": "New"}, {"id": "5"}]
        }))
        .unwrap();

        assert_eq!(request.concert_id, Some(12));
        let songs = request.songs.unwrap();
        assert_eq!(songs[0].id, None);
        assert_eq!(songs[1].id, Some(5));
    }

    #[test]
    fn test_empty_descriptor_field_falls_back_to_concert() {
        let mut concert = Record::new();
        concert.insert("venue".into(), json!("KSPO Dome"));

        assert_eq!(or_concert(&Some(String::new()), &concert, "venue"), json!("KSPO Dome"));
        assert_eq!(or_concert(&Some("Olympic Hall".into()), &concert, "venue"), json!("Olympic Hall"));
        assert_eq!(or_concert(&None, &concert, "artist"), Value::Null);
    }
}
