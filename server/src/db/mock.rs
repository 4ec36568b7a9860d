//! An in-memory [`Db`] used by unit and HTTP tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::Db;
use crate::errors::FeedError;
use crate::voice::{EngagementEvent, EngagementKind, Profile, VoiceAttributes, VoiceRow};

/// Mirrors the query semantics of the Postgres implementation over plain
/// vectors. Flip [`MockDb::fail_queries`] to make every operation report an
/// upstream failure.
#[derive(Default)]
pub struct MockDb {
    inner: RwLock<Inner>,
    failing: AtomicBool,
}

#[derive(Default)]
struct Inner {
    voices: Vec<VoiceRow>,
    profiles: Vec<Profile>,
    engagements: Vec<EngagementEvent>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_voice(&self, row: VoiceRow) {
        self.inner.write().unwrap().voices.push(row);
    }

    pub fn add_profile(&self, profile: Profile) {
        self.inner.write().unwrap().profiles.push(profile);
    }

    pub fn add_engagement(
        &self,
        actor: Uuid,
        voice_id: Uuid,
        kind: EngagementKind,
        created_at: OffsetDateTime,
    ) {
        self.inner.write().unwrap().engagements.push(EngagementEvent {
            actor,
            voice_id,
            kind,
            created_at,
        });
    }

    /// Makes every subsequent query fail with an upstream error.
    pub fn fail_queries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn read<T>(&self, select: impl FnOnce(&Inner) -> T) -> Result<T, FeedError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedError::Sqlx {
                source: sqlx::Error::PoolClosed,
            });
        }

        Ok(select(&self.inner.read().unwrap()))
    }
}

fn truncated(mut rows: Vec<VoiceRow>, limit: i64) -> Vec<VoiceRow> {
    rows.truncate(limit.max(0) as usize);
    rows
}

fn newest_first(rows: &mut Vec<VoiceRow>) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn most_liked_first(rows: &mut Vec<VoiceRow>) {
    rows.sort_by(|a, b| {
        b.likes
            .cmp(&a.likes)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

impl Db for MockDb {
    fn popular(&self, limit: i64) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
        let result = self.read(|inner| {
            let mut rows = inner.voices.clone();
            rows.sort_by(|a, b| {
                (b.likes * 2 + b.comments * 3)
                    .cmp(&(a.likes * 2 + a.comments * 3))
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });

            truncated(rows, limit)
        });

        async move { result }.boxed()
    }

    fn recent(&self, limit: i64) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
        let result = self.read(|inner| {
            let mut rows = inner.voices.clone();
            newest_first(&mut rows);

            truncated(rows, limit)
        });

        async move { result }.boxed()
    }

    fn recent_excluding(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
        let user_id = *user_id;

        let result = self.read(|inner| {
            let mut rows: Vec<_> = inner
                .voices
                .iter()
                .filter(|row| row.user_id != user_id)
                .cloned()
                .collect();
            newest_first(&mut rows);

            truncated(rows, limit)
        });

        async move { result }.boxed()
    }

    fn engaged_ids_since(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<Result<Vec<Uuid>, FeedError>> {
        let result = self.read(|inner| {
            let mut ids: Vec<Uuid> = Vec::new();

            for engagement in &inner.engagements {
                if engagement.created_at >= cutoff && !ids.contains(&engagement.voice_id) {
                    ids.push(engagement.voice_id);
                }
            }

            ids
        });

        async move { result }.boxed()
    }

    fn by_ids(&self, ids: &[Uuid], limit: i64) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
        let ids = ids.to_vec();

        let result = self.read(|inner| {
            let mut rows: Vec<_> = inner
                .voices
                .iter()
                .filter(|row| ids.contains(&row.id))
                .cloned()
                .collect();
            newest_first(&mut rows);

            truncated(rows, limit)
        });

        async move { result }.boxed()
    }

    fn liked_ids(&self, user_id: &Uuid) -> BoxFuture<Result<Vec<Uuid>, FeedError>> {
        let user_id = *user_id;

        let result = self.read(|inner| {
            inner
                .engagements
                .iter()
                .filter(|e| e.kind == EngagementKind::Like && e.actor == user_id)
                .map(|e| e.voice_id)
                .collect()
        });

        async move { result }.boxed()
    }

    fn profile(&self, user_id: &Uuid) -> BoxFuture<Result<Option<Profile>, FeedError>> {
        let user_id = *user_id;

        let result = self.read(|inner| {
            inner
                .profiles
                .iter()
                .find(|profile| profile.id == user_id)
                .cloned()
        });

        async move { result }.boxed()
    }

    fn liked_attributes(
        &self,
        ids: &[Uuid],
    ) -> BoxFuture<Result<Vec<VoiceAttributes>, FeedError>> {
        let ids = ids.to_vec();

        let result = self.read(|inner| {
            inner
                .voices
                .iter()
                .filter(|row| ids.contains(&row.id))
                .map(|row| VoiceAttributes {
                    mood: row.mood.clone(),
                    language: row.language.clone(),
                })
                .collect()
        });

        async move { result }.boxed()
    }

    fn by_author_country(
        &self,
        country: &str,
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
        let country = country.to_owned();
        let user_id = *user_id;

        let result = self.read(|inner| {
            let mut rows: Vec<_> = inner
                .voices
                .iter()
                .filter(|row| {
                    row.user_id != user_id && row.country.as_deref() == Some(country.as_str())
                })
                .cloned()
                .collect();
            newest_first(&mut rows);

            truncated(rows, limit)
        });

        async move { result }.boxed()
    }

    fn by_language(
        &self,
        language: &str,
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
        let language = language.to_owned();
        let user_id = *user_id;

        let result = self.read(|inner| {
            let mut rows: Vec<_> = inner
                .voices
                .iter()
                .filter(|row| {
                    row.user_id != user_id && row.language.as_deref() == Some(language.as_str())
                })
                .cloned()
                .collect();
            newest_first(&mut rows);

            truncated(rows, limit)
        });

        async move { result }.boxed()
    }

    fn matching_candidates(
        &self,
        mood: &str,
        language: &str,
        exclude: &[Uuid],
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
        let mood = mood.to_owned();
        let language = language.to_owned();
        let exclude = exclude.to_vec();
        let user_id = *user_id;

        let result = self.read(|inner| {
            let mut rows: Vec<_> = inner
                .voices
                .iter()
                .filter(|row| {
                    row.user_id != user_id
                        && !exclude.contains(&row.id)
                        && row.mood.as_deref() == Some(mood.as_str())
                        && row.language.as_deref() == Some(language.as_str())
                })
                .cloned()
                .collect();
            most_liked_first(&mut rows);

            truncated(rows, limit)
        });

        async move { result }.boxed()
    }

    fn popular_candidates(
        &self,
        exclude: &[Uuid],
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
        let exclude = exclude.to_vec();
        let user_id = *user_id;

        let result = self.read(|inner| {
            let mut rows: Vec<_> = inner
                .voices
                .iter()
                .filter(|row| row.user_id != user_id && !exclude.contains(&row.id))
                .cloned()
                .collect();
            most_liked_first(&mut rows);

            truncated(rows, limit)
        });

        async move { result }.boxed()
    }
}
