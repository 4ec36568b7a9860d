//! Converts raw storage rows into display-ready feed entries.
//!
//! Formatting is a pure function of the rows and a caller-supplied `now`;
//! nothing here touches the data layer.

use time::OffsetDateTime;
use url::form_urlencoded;

use crate::voice::{FeedItem, VoiceRow};

const DEFAULT_USERNAME: &str = "Unknown User";
const DEFAULT_LANGUAGE: &str = "English";
const DEFAULT_COUNTRY: &str = "United States";
const DEFAULT_MOOD: &str = "Neutral";
const DEFAULT_MOOD_COLOR: &str = "#9E9E9E";
const DEFAULT_DURATION: &str = "0:00";

/// Formats raw rows for display, preserving order and cardinality.
pub fn format_feed(rows: Vec<VoiceRow>, now: OffsetDateTime) -> Vec<FeedItem> {
    rows.into_iter().map(|row| format_row(row, now)).collect()
}

/// Formats a single row, resolving every optional field to its fallback.
pub fn format_row(row: VoiceRow, now: OffsetDateTime) -> FeedItem {
    let username = row
        .username
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_owned());

    let avatar_url = row
        .avatar_url
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| placeholder_avatar(&username));

    FeedItem {
        id: row.id,
        avatar_url,
        time_ago: time_ago(row.created_at, now),
        language: fall_back(row.language, DEFAULT_LANGUAGE),
        country: fall_back(row.country, DEFAULT_COUNTRY),
        mood: fall_back(row.mood, DEFAULT_MOOD),
        mood_color: fall_back(row.mood_color, DEFAULT_MOOD_COLOR),
        duration: fall_back(row.duration, DEFAULT_DURATION),
        likes: row.likes,
        comments: row.comments,
        audio_url: row.audio_url.unwrap_or_default(),
        username,
    }
}

/// Renders the age of a post as a coarse relative-time string. Each bucket
/// uses floor division; a post from the future reads as "0 seconds ago".
pub fn time_ago(created_at: OffsetDateTime, now: OffsetDateTime) -> String {
    let seconds = (now - created_at).whole_seconds().max(0);

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else {
        format!("{} days ago", seconds / 86400)
    }
}

fn fall_back(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

fn placeholder_avatar(username: &str) -> String {
    let name: String = form_urlencoded::byte_serialize(username.as_bytes()).collect();

    format!("https://ui-avatars.com/api/?name={}", name)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    use super::*;
    use crate::voice::VoiceRow;

    fn bare_row(created_at: OffsetDateTime) -> VoiceRow {
        VoiceRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            audio_url: None,
            duration: None,
            mood: None,
            mood_color: None,
            language: None,
            created_at,
            likes: 0,
            comments: 0,
            username: None,
            avatar_url: None,
            country: None,
        }
    }

    #[test]
    fn every_missing_field_gets_a_fallback() {
        let now = OffsetDateTime::now_utc();
        let item = format_row(bare_row(now), now);

        assert_eq!(item.username, "Unknown User");
        assert_eq!(item.language, "English");
        assert_eq!(item.country, "United States");
        assert_eq!(item.mood, "Neutral");
        assert_eq!(item.mood_color, "#9E9E9E");
        assert_eq!(item.duration, "0:00");
        assert!(!item.avatar_url.is_empty());
        assert!(!item.time_ago.is_empty());
    }

    #[test]
    fn empty_strings_are_treated_as_missing() {
        let now = OffsetDateTime::now_utc();
        let mut row = bare_row(now);
        row.username = Some(String::new());
        row.mood = Some(String::new());

        let item = format_row(row, now);

        assert_eq!(item.username, "Unknown User");
        assert_eq!(item.mood, "Neutral");
    }

    #[test]
    fn present_fields_pass_through() {
        let now = OffsetDateTime::now_utc();
        let mut row = bare_row(now);
        row.username = Some("amara".to_owned());
        row.avatar_url = Some("https://example.com/amara.png".to_owned());
        row.mood = Some("Happy".to_owned());
        row.language = Some("Spanish".to_owned());
        row.duration = Some("1:24".to_owned());
        row.likes = 7;
        row.comments = 2;

        let item = format_row(row, now);

        assert_eq!(item.username, "amara");
        assert_eq!(item.avatar_url, "https://example.com/amara.png");
        assert_eq!(item.mood, "Happy");
        assert_eq!(item.language, "Spanish");
        assert_eq!(item.duration, "1:24");
        assert_eq!(item.likes, 7);
        assert_eq!(item.comments, 2);
    }

    #[test]
    fn placeholder_avatar_encodes_the_username() {
        let now = OffsetDateTime::now_utc();
        let mut row = bare_row(now);
        row.username = Some("Ana Lu".to_owned());

        let item = format_row(row, now);

        assert_eq!(item.avatar_url, "https://ui-avatars.com/api/?name=Ana+Lu");
    }

    #[test]
    fn time_ago_buckets() {
        let now = OffsetDateTime::now_utc();

        assert_eq!(time_ago(now, now), "0 seconds ago");
        assert_eq!(time_ago(now - Duration::seconds(59), now), "59 seconds ago");
        assert_eq!(time_ago(now - Duration::seconds(60), now), "1 minutes ago");
        assert_eq!(time_ago(now - Duration::seconds(3599), now), "59 minutes ago");
        assert_eq!(time_ago(now - Duration::seconds(3600), now), "1 hours ago");
        assert_eq!(time_ago(now - Duration::seconds(86399), now), "23 hours ago");
        assert_eq!(time_ago(now - Duration::seconds(86400), now), "1 days ago");
        assert_eq!(time_ago(now - Duration::days(12), now), "12 days ago");
    }

    #[test]
    fn future_timestamps_clamp_to_zero() {
        let now = OffsetDateTime::now_utc();

        assert_eq!(time_ago(now + Duration::seconds(30), now), "0 seconds ago");
    }

    /// Parses "{n} {unit} ago" back into the lower bound of the denoted
    /// duration, in seconds.
    fn denoted_seconds(rendered: &str) -> i64 {
        let mut parts = rendered.split(' ');
        let n: i64 = parts.next().unwrap().parse().unwrap();
        let unit = parts.next().unwrap();

        let scale = match unit {
            "seconds" => 1,
            "minutes" => 60,
            "hours" => 3600,
            "days" => 86400,
            other => panic!("unexpected unit {}", other),
        };

        n * scale
    }

    proptest! {
        #[test]
        fn time_ago_is_monotonic(a in 0i64..10_000_000, b in 0i64..10_000_000) {
            let now = OffsetDateTime::now_utc();
            let (older, newer) = (a.max(b), a.min(b));

            let older_denoted = denoted_seconds(&time_ago(now - Duration::seconds(older), now));
            let newer_denoted = denoted_seconds(&time_ago(now - Duration::seconds(newer), now));

            prop_assert!(older_denoted >= newer_denoted);
        }

        #[test]
        fn formatter_preserves_order_and_cardinality(ages in proptest::collection::vec(0i64..1_000_000, 0..32)) {
            let now = OffsetDateTime::now_utc();
            let rows: Vec<_> = ages
                .iter()
                .map(|age| bare_row(now - Duration::seconds(*age)))
                .collect();
            let ids: Vec<_> = rows.iter().map(|row| row.id).collect();

            let items = format_feed(rows, now);

            prop_assert_eq!(items.len(), ids.len());
            prop_assert_eq!(items.into_iter().map(|item| item.id).collect::<Vec<_>>(), ids);
        }
    }
}
