use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::FeedError;
use crate::voice::{Profile, VoiceAttributes, VoiceRow};

pub mod mock;

/// The read-only data collaborator the rankers run against.
///
/// Handles are injected explicitly (`Arc<dyn Db + Send + Sync>`) so tests
/// can substitute [`mock::MockDb`]; there is no global client.
pub trait Db {
    /// Returns up to `limit` posts ordered by the aggregate popularity
    /// score. The score is computed by the data layer and treated as an
    /// opaque total order here.
    fn popular(&self, limit: i64) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>>;

    /// Returns up to `limit` posts, most recent first.
    fn recent(&self, limit: i64) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>>;

    /// Like [`Db::recent`], but skips posts authored by `user_id`.
    fn recent_excluding(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>>;

    /// Returns the deduplicated IDs of posts with any like or comment
    /// created at or after `cutoff`.
    fn engaged_ids_since(
        &self,
        cutoff: OffsetDateTime,
    ) -> BoxFuture<Result<Vec<Uuid>, FeedError>>;

    /// Returns the posts in `ids`, most recent first, truncated to `limit`.
    fn by_ids(&self, ids: &[Uuid], limit: i64) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>>;

    /// Returns the IDs of every post `user_id` has liked.
    fn liked_ids(&self, user_id: &Uuid) -> BoxFuture<Result<Vec<Uuid>, FeedError>>;

    /// Returns the profile for `user_id`, if one exists.
    fn profile(&self, user_id: &Uuid) -> BoxFuture<Result<Option<Profile>, FeedError>>;

    /// Returns the mood and language of each post in `ids`.
    fn liked_attributes(
        &self,
        ids: &[Uuid],
    ) -> BoxFuture<Result<Vec<VoiceAttributes>, FeedError>>;

    /// Returns posts by authors from `country`, excluding posts authored by
    /// `user_id`, most recent first.
    fn by_author_country(
        &self,
        country: &str,
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>>;

    /// Returns posts in `language`, excluding posts authored by `user_id`,
    /// most recent first.
    fn by_language(
        &self,
        language: &str,
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>>;

    /// Returns posts matching both `mood` and `language`, excluding the
    /// posts in `exclude` and those authored by `user_id`, most liked
    /// first.
    fn matching_candidates(
        &self,
        mood: &str,
        language: &str,
        exclude: &[Uuid],
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>>;

    /// Returns posts excluding those in `exclude` and those authored by
    /// `user_id`, most liked first.
    fn popular_candidates(
        &self,
        exclude: &[Uuid],
        user_id: &Uuid,
        limit: i64,
    ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
    };
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::errors::FeedError;
    use crate::voice::{Profile, VoiceAttributes, VoiceRow};

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn popular(&self, limit: i64) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
            async move {
                let query = sqlx::query(include_str!("queries/popular.sql"));

                let rows = query
                    .bind(limit)
                    .try_map(|row: PgRow| voice_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
        }

        fn recent(&self, limit: i64) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
            async move {
                let query = sqlx::query(include_str!("queries/recent.sql"));

                let rows = query
                    .bind(limit)
                    .try_map(|row: PgRow| voice_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
        }

        fn recent_excluding(
            &self,
            user_id: &Uuid,
            limit: i64,
        ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
            let user_id = *user_id;

            async move {
                let query = sqlx::query(include_str!("queries/recent_excluding.sql"));

                let rows = query
                    .bind(user_id)
                    .bind(limit)
                    .try_map(|row: PgRow| voice_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
        }

        fn engaged_ids_since(
            &self,
            cutoff: OffsetDateTime,
        ) -> BoxFuture<Result<Vec<Uuid>, FeedError>> {
            async move {
                let query = sqlx::query_as::<_, (Uuid,)>(include_str!(
                    "queries/engaged_ids_since.sql"
                ));

                let ids = query
                    .bind(cutoff)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(ids.into_iter().map(|(id,)| id).collect())
            }
            .boxed()
        }

        fn by_ids(
            &self,
            ids: &[Uuid],
            limit: i64,
        ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
            let ids = ids.to_vec();

            async move {
                let query = sqlx::query(include_str!("queries/by_ids.sql"));

                let rows = query
                    .bind(ids)
                    .bind(limit)
                    .try_map(|row: PgRow| voice_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
        }

        fn liked_ids(&self, user_id: &Uuid) -> BoxFuture<Result<Vec<Uuid>, FeedError>> {
            let user_id = *user_id;

            async move {
                let query = sqlx::query_as::<_, (Uuid,)>(include_str!("queries/liked_ids.sql"));

                let ids = query
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(ids.into_iter().map(|(id,)| id).collect())
            }
            .boxed()
        }

        fn profile(&self, user_id: &Uuid) -> BoxFuture<Result<Option<Profile>, FeedError>> {
            let user_id = *user_id;

            async move {
                let query = sqlx::query(include_str!("queries/profile.sql"));

                let profile = query
                    .bind(user_id)
                    .try_map(|row: PgRow| {
                        Ok(Profile {
                            id: try_get(&row, "id")?,
                            username: try_get(&row, "username")?,
                            avatar_url: try_get(&row, "avatar_url")?,
                            country: try_get(&row, "country")?,
                            language: try_get(&row, "language")?,
                        })
                    })
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(profile)
            }
            .boxed()
        }

        fn liked_attributes(
            &self,
            ids: &[Uuid],
        ) -> BoxFuture<Result<Vec<VoiceAttributes>, FeedError>> {
            let ids = ids.to_vec();

            async move {
                let query = sqlx::query(include_str!("queries/liked_attributes.sql"));

                let attributes = query
                    .bind(ids)
                    .try_map(|row: PgRow| {
                        Ok(VoiceAttributes {
                            mood: try_get(&row, "mood")?,
                            language: try_get(&row, "language")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(attributes)
            }
            .boxed()
        }

        fn by_author_country(
            &self,
            country: &str,
            user_id: &Uuid,
            limit: i64,
        ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
            let country = country.to_owned();
            let user_id = *user_id;

            async move {
                let query = sqlx::query(include_str!("queries/by_author_country.sql"));

                let rows = query
                    .bind(country)
                    .bind(user_id)
                    .bind(limit)
                    .try_map(|row: PgRow| voice_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
        }

        fn by_language(
            &self,
            language: &str,
            user_id: &Uuid,
            limit: i64,
        ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
            let language = language.to_owned();
            let user_id = *user_id;

            async move {
                let query = sqlx::query(include_str!("queries/by_language.sql"));

                let rows = query
                    .bind(language)
                    .bind(user_id)
                    .bind(limit)
                    .try_map(|row: PgRow| voice_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
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

            async move {
                let query = sqlx::query(include_str!("queries/matching_candidates.sql"));

                let rows = query
                    .bind(mood)
                    .bind(language)
                    .bind(exclude)
                    .bind(user_id)
                    .bind(limit)
                    .try_map(|row: PgRow| voice_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
        }

        fn popular_candidates(
            &self,
            exclude: &[Uuid],
            user_id: &Uuid,
            limit: i64,
        ) -> BoxFuture<Result<Vec<VoiceRow>, FeedError>> {
            let exclude = exclude.to_vec();
            let user_id = *user_id;

            async move {
                let query = sqlx::query(include_str!("queries/popular_candidates.sql"));

                let rows = query
                    .bind(exclude)
                    .bind(user_id)
                    .bind(limit)
                    .try_map(|row: PgRow| voice_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
        }
    }

    fn voice_row(row: &PgRow) -> Result<VoiceRow, sqlx::Error> {
        Ok(VoiceRow {
            id: try_get(row, "id")?,
            user_id: try_get(row, "user_id")?,
            audio_url: try_get(row, "audio_url")?,
            duration: try_get(row, "duration")?,
            mood: try_get(row, "mood")?,
            mood_color: try_get(row, "mood_color")?,
            language: try_get(row, "language")?,
            created_at: try_get(row, "created_at")?,
            likes: try_get(row, "likes")?,
            comments: try_get(row, "comments")?,
            username: try_get(row, "username")?,
            avatar_url: try_get(row, "avatar_url")?,
            country: try_get(row, "country")?,
        })
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> FeedError {
        FeedError::Sqlx { source: error }
    }
}
