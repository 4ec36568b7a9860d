//! Personalized selection with graceful degradation.
//!
//! The cascade is compiled into an ordered plan of fallback strategies,
//! evaluated until one yields a non-empty result, so exactly one path
//! produces the feed on every call.

use std::collections::BTreeMap;
use std::time::Duration;

use uuid::Uuid;

use super::{bounded, DynDb};
use crate::errors::FeedError;
use crate::voice::VoiceRow;

/// One stage of the recommendation cascade.
#[derive(Clone, Debug, PartialEq)]
enum Strategy {
    /// Unseen, unauthored posts matching the user's dominant liked mood and
    /// language, most liked first.
    MoodAndLanguage {
        user: Uuid,
        liked: Vec<Uuid>,
        mood: String,
        language: String,
    },

    /// Unseen, unauthored posts, most liked first.
    PopularUnseen { user: Uuid, liked: Vec<Uuid> },

    /// Posts by authors from the user's profile country.
    AuthorCountry { user: Uuid, country: String },

    /// Posts in the user's preferred language.
    PreferredLanguage { user: Uuid, language: String },

    /// Most recent posts, skipping the user's own.
    RecentExcludingOwn { user: Uuid },

    /// Most recent posts, no personalization.
    Recent,
}

/// Returns up to `limit` posts personalized for `user`, or the most recent
/// posts when no user is given.
///
/// Guarantees: the user's own posts are never recommended, and once a liked
/// history exists, neither are posts the user has already liked.
pub async fn recommended(
    db: &DynDb,
    user: Option<Uuid>,
    limit: i64,
    deadline: Duration,
) -> Result<Vec<VoiceRow>, FeedError> {
    bounded(deadline, select(db, user, limit)).await
}

async fn select(db: &DynDb, user: Option<Uuid>, limit: i64) -> Result<Vec<VoiceRow>, FeedError> {
    let plan = match user {
        Some(user) => plan_for(db, user).await?,
        None => vec![Strategy::Recent],
    };

    let mut rows = Vec::new();

    for strategy in plan {
        rows = strategy.candidates(db, limit).await?;

        if !rows.is_empty() {
            break;
        }
    }

    Ok(rows)
}

/// Builds the ordered fallback plan for a known user.
async fn plan_for(db: &DynDb, user: Uuid) -> Result<Vec<Strategy>, FeedError> {
    let liked = db.liked_ids(&user).await?;

    if liked.is_empty() {
        return profile_plan(db, user).await;
    }

    let attributes = db.liked_attributes(&liked).await?;
    let mood = dominant(attributes.iter().filter_map(|a| a.mood.as_deref()));
    let language = dominant(attributes.iter().filter_map(|a| a.language.as_deref()));

    let mut plan = Vec::new();

    if let (Some(mood), Some(language)) = (mood, language) {
        plan.push(Strategy::MoodAndLanguage {
            user,
            liked: liked.clone(),
            mood,
            language,
        });
    }

    plan.push(Strategy::PopularUnseen { user, liked });

    Ok(plan)
}

/// Builds the plan for a user with no liked history: country affinity first,
/// preferred language next, recency last.
async fn profile_plan(db: &DynDb, user: Uuid) -> Result<Vec<Strategy>, FeedError> {
    let profile = db.profile(&user).await?;
    let mut plan = Vec::new();

    if let Some(profile) = profile {
        if let Some(country) = profile.country.filter(|c| !c.is_empty()) {
            plan.push(Strategy::AuthorCountry { user, country });
        } else if let Some(language) = profile.language.filter(|l| !l.is_empty()) {
            plan.push(Strategy::PreferredLanguage { user, language });
        }
    }

    plan.push(Strategy::RecentExcludingOwn { user });

    Ok(plan)
}

/// Returns the most frequent label. Count ties break toward the
/// lexicographically smallest label so the result does not depend on store
/// iteration order.
fn dominant<'a>(labels: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

    for label in labels.filter(|l| !l.is_empty()) {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut top: Option<(&str, usize)> = None;

    for (label, count) in counts {
        match top {
            Some((_, best)) if count <= best => {}
            _ => top = Some((label, count)),
        }
    }

    top.map(|(label, _)| label.to_owned())
}

impl Strategy {
    async fn candidates(&self, db: &DynDb, limit: i64) -> Result<Vec<VoiceRow>, FeedError> {
        match self {
            Strategy::MoodAndLanguage {
                user,
                liked,
                mood,
                language,
            } => db.matching_candidates(mood, language, liked, user, limit).await,
            Strategy::PopularUnseen { user, liked } => {
                db.popular_candidates(liked, user, limit).await
            }
            Strategy::AuthorCountry { user, country } => {
                db.by_author_country(country, user, limit).await
            }
            Strategy::PreferredLanguage { user, language } => {
                db.by_language(language, user, limit).await
            }
            Strategy::RecentExcludingOwn { user } => db.recent_excluding(user, limit).await,
            Strategy::Recent => db.recent(limit).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::super::DynDb;
    use super::dominant;
    use crate::db::mock::MockDb;
    use crate::voice::{EngagementKind, Profile, VoiceRow};

    const DEADLINE: Duration = Duration::from_secs(5);

    struct VoiceBuilder {
        row: VoiceRow,
    }

    impl VoiceBuilder {
        fn by(user_id: Uuid) -> Self {
            Self {
                row: VoiceRow {
                    id: Uuid::new_v4(),
                    user_id,
                    audio_url: None,
                    duration: None,
                    mood: None,
                    mood_color: None,
                    language: None,
                    created_at: OffsetDateTime::now_utc(),
                    likes: 0,
                    comments: 0,
                    username: None,
                    avatar_url: None,
                    country: None,
                },
            }
        }

        fn mood(mut self, mood: &str) -> Self {
            self.row.mood = Some(mood.to_owned());
            self
        }

        fn language(mut self, language: &str) -> Self {
            self.row.language = Some(language.to_owned());
            self
        }

        fn country(mut self, country: &str) -> Self {
            self.row.country = Some(country.to_owned());
            self
        }

        fn likes(mut self, likes: i32) -> Self {
            self.row.likes = likes;
            self
        }

        fn age_hours(mut self, hours: i64) -> Self {
            self.row.created_at = OffsetDateTime::now_utc() - time::Duration::hours(hours);
            self
        }

        fn build(self) -> VoiceRow {
            self.row
        }
    }

    fn profile(id: Uuid, country: Option<&str>, language: Option<&str>) -> Profile {
        Profile {
            id,
            username: None,
            avatar_url: None,
            country: country.map(str::to_owned),
            language: language.map(str::to_owned),
        }
    }

    fn like(db: &MockDb, user: Uuid, voice: &VoiceRow) {
        db.add_engagement(
            user,
            voice.id,
            EngagementKind::Like,
            OffsetDateTime::now_utc(),
        );
    }

    #[tokio::test]
    async fn anonymous_callers_get_the_recent_feed() {
        let mock = MockDb::new();
        let old = VoiceBuilder::by(Uuid::new_v4()).age_hours(5).build();
        let new = VoiceBuilder::by(Uuid::new_v4()).age_hours(1).build();
        mock.add_voice(old.clone());
        mock.add_voice(new.clone());
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, None, 10, DEADLINE).await.unwrap();

        assert_eq!(rows[0].id, new.id);
        assert_eq!(rows[1].id, old.id);
    }

    #[tokio::test]
    async fn preferred_mood_and_language_win() {
        let user = Uuid::new_v4();
        let mock = MockDb::new();

        let liked = VoiceBuilder::by(Uuid::new_v4())
            .mood("Happy")
            .language("English")
            .build();
        let matching = VoiceBuilder::by(Uuid::new_v4())
            .mood("Happy")
            .language("English")
            .likes(3)
            .build();
        let off_mood = VoiceBuilder::by(Uuid::new_v4())
            .mood("Sad")
            .language("English")
            .likes(50)
            .build();

        mock.add_voice(liked.clone());
        mock.add_voice(matching.clone());
        mock.add_voice(off_mood);
        like(&mock, user, &liked);
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, Some(user), 10, DEADLINE).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, matching.id);
    }

    #[tokio::test]
    async fn never_recommends_own_or_already_liked_posts() {
        let user = Uuid::new_v4();
        let mock = MockDb::new();

        let own = VoiceBuilder::by(user)
            .mood("Happy")
            .language("English")
            .likes(99)
            .build();
        let liked = VoiceBuilder::by(Uuid::new_v4())
            .mood("Happy")
            .language("English")
            .likes(80)
            .build();
        let fresh = VoiceBuilder::by(Uuid::new_v4())
            .mood("Happy")
            .language("English")
            .likes(1)
            .build();

        mock.add_voice(own.clone());
        mock.add_voice(liked.clone());
        mock.add_voice(fresh.clone());
        like(&mock, user, &liked);
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, Some(user), 10, DEADLINE).await.unwrap();

        assert!(rows.iter().all(|row| row.user_id != user));
        assert!(rows.iter().all(|row| row.id != liked.id));
        assert_eq!(rows, vec![fresh]);
    }

    #[tokio::test]
    async fn falls_back_to_global_popularity_when_nothing_matches() {
        let user = Uuid::new_v4();
        let mock = MockDb::new();

        let liked = VoiceBuilder::by(Uuid::new_v4())
            .mood("Happy")
            .language("English")
            .build();
        // no unseen post matches both attributes
        let popular = VoiceBuilder::by(Uuid::new_v4())
            .mood("Sad")
            .language("French")
            .likes(10)
            .build();
        let quiet = VoiceBuilder::by(Uuid::new_v4())
            .mood("Calm")
            .language("German")
            .likes(2)
            .build();

        mock.add_voice(liked.clone());
        mock.add_voice(popular.clone());
        mock.add_voice(quiet.clone());
        like(&mock, user, &liked);
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, Some(user), 10, DEADLINE).await.unwrap();

        assert_eq!(rows[0].id, popular.id);
        assert_eq!(rows[1].id, quiet.id);
        assert!(rows.iter().all(|row| row.id != liked.id));
    }

    #[tokio::test]
    async fn country_affinity_applies_without_liked_history() {
        let user = Uuid::new_v4();
        let mock = MockDb::new();

        let compatriot = VoiceBuilder::by(Uuid::new_v4()).country("Brazil").build();
        let foreigner = VoiceBuilder::by(Uuid::new_v4()).country("Japan").build();

        mock.add_voice(compatriot.clone());
        mock.add_voice(foreigner);
        mock.add_profile(profile(user, Some("Brazil"), Some("Portuguese")));
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, Some(user), 10, DEADLINE).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, compatriot.id);
    }

    #[tokio::test]
    async fn language_affinity_applies_when_profile_has_no_country() {
        let user = Uuid::new_v4();
        let mock = MockDb::new();

        let same_language = VoiceBuilder::by(Uuid::new_v4()).language("Portuguese").build();
        let other = VoiceBuilder::by(Uuid::new_v4()).language("English").build();

        mock.add_voice(same_language.clone());
        mock.add_voice(other);
        mock.add_profile(profile(user, None, Some("Portuguese")));
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, Some(user), 10, DEADLINE).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, same_language.id);
    }

    #[tokio::test]
    async fn empty_affinity_falls_back_to_recent_excluding_own() {
        let user = Uuid::new_v4();
        let mock = MockDb::new();

        let own = VoiceBuilder::by(user).country("Brazil").build();
        let foreign = VoiceBuilder::by(Uuid::new_v4()).country("Japan").build();

        mock.add_voice(own.clone());
        mock.add_voice(foreign.clone());
        // the only compatriot post is the user's own, so country affinity
        // yields nothing
        mock.add_profile(profile(user, Some("Brazil"), None));
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, Some(user), 10, DEADLINE).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, foreign.id);
    }

    #[tokio::test]
    async fn missing_profile_falls_back_to_recent_excluding_own() {
        let user = Uuid::new_v4();
        let mock = MockDb::new();

        let own = VoiceBuilder::by(user).build();
        let other = VoiceBuilder::by(Uuid::new_v4()).build();

        mock.add_voice(own);
        mock.add_voice(other.clone());
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, Some(user), 10, DEADLINE).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, other.id);
    }

    #[tokio::test]
    async fn limit_is_respected() {
        let user = Uuid::new_v4();
        let mock = MockDb::new();

        for _ in 0..8 {
            mock.add_voice(VoiceBuilder::by(Uuid::new_v4()).build());
        }
        let db: DynDb = Arc::new(mock);

        let rows = super::recommended(&db, Some(user), 3, DEADLINE).await.unwrap();

        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn dominant_counts_and_breaks_ties_lexicographically() {
        let labels = ["Happy", "Sad", "Happy", "Calm"];
        assert_eq!(dominant(labels.iter().copied()), Some("Happy".to_owned()));

        // equal counts resolve to the smallest label
        let tied = ["Sad", "Happy"];
        assert_eq!(dominant(tied.iter().copied()), Some("Happy".to_owned()));

        assert_eq!(dominant(std::iter::empty()), None);
        assert_eq!(dominant(["", ""].iter().copied()), None);
    }
}
