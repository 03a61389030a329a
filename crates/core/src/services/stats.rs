//! Admin statistics.
//!
//! Each statistic is memoized for a fixed TTL measured on an injected clock.
//! Writes never invalidate the cache, so readers may see counts up to one
//! TTL old.

use std::{future::Future, sync::Arc};

use agora_common::{AppResult, SharedClock};
use agora_db::repositories::{PostRepository, UserRepository};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

/// A single memoized value with an expiry.
pub struct TtlCache<T> {
    clock: SharedClock,
    ttl: Duration,
    slot: Mutex<Option<(T, DateTime<Utc>)>>,
}

impl<T: Clone> TtlCache<T> {
    #[must_use]
    pub fn new(clock: SharedClock, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The cached value, if it was stored less than one TTL ago.
    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.lock().await;
        self.fresh(slot.as_ref())
    }

    /// Return the cached value or compute, store, and return a new one.
    ///
    /// Callers arriving while a value is being computed wait for it instead
    /// of computing their own. Errors are returned and not cached.
    pub async fn get_or_try_insert_with<F, Fut>(&self, compute: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(value) = self.fresh(slot.as_ref()) {
            return Ok(value);
        }

        let value = compute().await?;
        *slot = Some((value.clone(), self.clock.now()));
        Ok(value)
    }

    fn fresh(&self, slot: Option<&(T, DateTime<Utc>)>) -> Option<T> {
        slot.filter(|(_, stored_at)| self.clock.now() - *stored_at < self.ttl)
            .map(|(value, _)| value.clone())
    }
}

/// User counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: u64,
    /// Accounts created since midnight UTC.
    pub new_today: u64,
    /// Enabled accounts.
    pub active: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostStats {
    pub total: u64,
}

/// Posts created since midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodayPosts {
    pub count: u64,
}

/// All dashboard statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub users: UserStats,
    pub posts: PostStats,
    pub today_posts: TodayPosts,
}

/// Statistics service for the admin dashboard.
#[derive(Clone)]
pub struct StatsService {
    user_repo: UserRepository,
    post_repo: PostRepository,
    clock: SharedClock,
    user_stats: Arc<TtlCache<UserStats>>,
    post_stats: Arc<TtlCache<PostStats>>,
    today_posts: Arc<TtlCache<TodayPosts>>,
}

impl StatsService {
    /// Create a new stats service whose caches expire after `ttl`.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        post_repo: PostRepository,
        clock: SharedClock,
        ttl: Duration,
    ) -> Self {
        Self {
            user_repo,
            post_repo,
            user_stats: Arc::new(TtlCache::new(clock.clone(), ttl)),
            post_stats: Arc::new(TtlCache::new(clock.clone(), ttl)),
            today_posts: Arc::new(TtlCache::new(clock.clone(), ttl)),
            clock,
        }
    }

    pub async fn user_stats(&self) -> AppResult<UserStats> {
        self.user_stats
            .get_or_try_insert_with(|| async move {
                let since = self.start_of_today();
                Ok(UserStats {
                    total: self.user_repo.count().await?,
                    new_today: self.user_repo.count_created_since(since).await?,
                    active: self.user_repo.count_enabled().await?,
                })
            })
            .await
    }

    pub async fn post_stats(&self) -> AppResult<PostStats> {
        self.post_stats
            .get_or_try_insert_with(|| async move {
                Ok(PostStats {
                    total: self.post_repo.count().await?,
                })
            })
            .await
    }

    pub async fn today_posts(&self) -> AppResult<TodayPosts> {
        self.today_posts
            .get_or_try_insert_with(|| async move {
                Ok(TodayPosts {
                    count: self
                        .post_repo
                        .count_created_since(self.start_of_today())
                        .await?,
                })
            })
            .await
    }

    /// Compute the three statistics concurrently.
    pub async fn dashboard(&self) -> AppResult<DashboardStats> {
        let (users, posts, today_posts) =
            tokio::try_join!(self.user_stats(), self.post_stats(), self.today_posts())?;

        Ok(DashboardStats {
            users,
            posts,
            today_posts,
        })
    }

    fn start_of_today(&self) -> DateTime<Utc> {
        self.clock
            .now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_common::{AppError, ManualClock};
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::{
        collections::BTreeMap,
        sync::atomic::{AtomicU32, Ordering},
    };

    fn count(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap())
    }

    fn service(db: MockDatabase, clock: &ManualClock) -> StatsService {
        let db = Arc::new(db.into_connection());
        StatsService::new(
            UserRepository::new(db.clone()),
            PostRepository::new(db),
            Arc::new(clock.clone()),
            Duration::minutes(5),
        )
    }

    #[tokio::test]
    async fn test_ttl_cache_expires_after_ttl() {
        let clock = clock();
        let cache = TtlCache::new(Arc::new(clock.clone()), Duration::minutes(5));
        let calls = &AtomicU32::new(0);

        let compute = || async move { Ok::<_, AppError>(calls.fetch_add(1, Ordering::SeqCst) + 1) };

        assert_eq!(cache.get_or_try_insert_with(compute).await.unwrap(), 1);

        clock.advance(Duration::minutes(5) - Duration::seconds(1));
        assert_eq!(cache.get_or_try_insert_with(compute).await.unwrap(), 1);

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get().await, None);
        assert_eq!(cache.get_or_try_insert_with(compute).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ttl_cache_does_not_store_errors() {
        let cache: TtlCache<u64> = TtlCache::new(Arc::new(clock()), Duration::minutes(5));

        let err = cache
            .get_or_try_insert_with(|| async move { Err(AppError::Database("down".to_string())) })
            .await;
        assert!(err.is_err());
        assert_eq!(cache.get().await, None);

        assert_eq!(
            cache.get_or_try_insert_with(|| async move { Ok(7) }).await.unwrap(),
            7
        );
    }

    #[tokio::test]
    async fn test_user_stats_are_cached() {
        let clock = clock();
        // Only one round of counts is queued; a second round would fail.
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(10)], [count(2)], [count(9)]]),
            &clock,
        );

        let first = svc.user_stats().await.unwrap();
        clock.advance(Duration::minutes(4));
        let second = svc.user_stats().await.unwrap();

        assert_eq!(
            first,
            UserStats {
                total: 10,
                new_today: 2,
                active: 9,
            }
        );
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_post_stats_refresh_after_ttl() {
        let clock = clock();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(40)], [count(41)]]),
            &clock,
        );

        assert_eq!(svc.post_stats().await.unwrap().total, 40);
        clock.advance(Duration::minutes(6));
        assert_eq!(svc.post_stats().await.unwrap().total, 41);
    }

    #[tokio::test]
    async fn test_dashboard_joins_all_stats() {
        let clock = clock();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([
                [count(10)],
                [count(2)],
                [count(9)],
                [count(40)],
                [count(3)],
            ]),
            &clock,
        );

        let stats = svc.dashboard().await.unwrap();

        assert_eq!(stats.users.total, 10);
        assert_eq!(stats.posts.total, 40);
        assert_eq!(stats.today_posts.count, 3);

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["users"]["newToday"], 2);
        assert_eq!(json["todayPosts"]["count"], 3);
    }

    #[test]
    fn test_start_of_today_is_utc_midnight() {
        let clock = clock();
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres), &clock);

        assert_eq!(
            svc.start_of_today(),
            Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap()
        );
    }
}
