use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A raw voice post joined with its author's profile, as returned by the
/// data layer.
///
/// Only identity, ownership, the engagement counts, and the creation time
/// are guaranteed to be present. Every presentational field may be absent
/// and is resolved to a fallback by the feed formatter. The ranking
/// subsystem never mutates rows.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct VoiceRow {
    /// The ID of the voice post.
    pub id: Uuid,

    /// The ID of the user who recorded it.
    pub user_id: Uuid,

    /// The URL of the audio file.
    pub audio_url: Option<String>,

    /// The display duration, e.g. "1:24".
    pub duration: Option<String>,

    /// The mood label.
    pub mood: Option<String>,

    /// The display color for the mood.
    pub mood_color: Option<String>,

    /// The language label.
    pub language: Option<String>,

    /// The date and time it was created. Immutable once set.
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,

    /// The number of likes. Never negative.
    pub likes: i32,

    /// The number of comments. Never negative.
    pub comments: i32,

    /// The author's username.
    pub username: Option<String>,

    /// The author's avatar URL.
    pub avatar_url: Option<String>,

    /// The author's country.
    pub country: Option<String>,
}

/// The author of a voice post.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Profile {
    /// The ID of the user.
    pub id: Uuid,

    /// The username, if one was chosen.
    pub username: Option<String>,

    /// The avatar URL, if one was uploaded.
    pub avatar_url: Option<String>,

    /// The country, if given.
    pub country: Option<String>,

    /// The preferred language, if given.
    pub language: Option<String>,
}

/// The mood and language of a voice post, used to tally a user's listening
/// preferences.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VoiceAttributes {
    pub mood: Option<String>,
    pub language: Option<String>,
}

/// A like or comment on a voice post. The ranking subsystem only ever reads
/// these; it never creates or mutates them.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngagementEvent {
    /// The user who liked or commented.
    pub actor: Uuid,

    /// The voice post they engaged with.
    pub voice_id: Uuid,

    /// Whether this was a like or a comment.
    pub kind: EngagementKind,

    /// The date and time of the engagement.
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    Like,
    Comment,
}

/// A display-ready feed entry. Every field is fully resolved; consumers
/// never see a missing value.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
    pub time_ago: String,
    pub language: String,
    pub country: String,
    pub mood: String,
    pub mood_color: String,
    pub duration: String,
    pub likes: i32,
    pub comments: i32,
    pub audio_url: String,
}
