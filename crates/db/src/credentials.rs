//! Short-lived database credentials with TTL-based rotation.
//!
//! The platform issues Postgres passwords that expire (typically after an
//! hour). [`CredentialCache`] keeps the current one, renews it ahead of
//! expiry and makes sure concurrent callers trigger a single platform call.
//! [`spawn_rotation`] pushes each renewed password into the pool's connect
//! options so that new connections always authenticate with a live token.

use std::sync::Arc;
use std::time::Duration;

use lpt_platform::WorkspaceApi;
use sqlx::postgres::PgConnectOptions;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::DbError;

/// Delay before retrying a failed rotation, and the shortest gap between two.
const ROTATION_RETRY: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct CachedCredential {
    token: String,
    refresh_at: Instant,
}

pub struct CredentialCache {
    api: Arc<dyn WorkspaceApi>,
    instance_names: Vec<String>,
    ttl: Duration,
    refresh_margin: Duration,
    state: Mutex<Option<CachedCredential>>,
}

impl CredentialCache {
    /// `ttl` is assumed when the platform does not report an expiry;
    /// credentials are renewed `refresh_margin` before they expire.
    pub fn new(
        api: Arc<dyn WorkspaceApi>,
        instance_names: Vec<String>,
        ttl: Duration,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            api,
            instance_names,
            ttl,
            refresh_margin,
            state: Mutex::new(None),
        }
    }

    /// The cached token, renewed first if it is inside the refresh margin.
    pub async fn current(&self) -> Result<String, DbError> {
        // The lock is held across the platform call: callers arriving during a
        // refresh wait for it instead of issuing their own.
        let mut state = self.state.lock().await;
        if let Some(cached) = state.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *state = Some(fresh);
        Ok(token)
    }

    /// Unconditionally fetch a new credential.
    pub async fn refresh(&self) -> Result<String, DbError> {
        let mut state = self.state.lock().await;
        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *state = Some(fresh);
        Ok(token)
    }

    /// When the cached credential is due for renewal; `None` before the first fetch.
    pub async fn refresh_at(&self) -> Option<Instant> {
        self.state.lock().await.as_ref().map(|c| c.refresh_at)
    }

    async fn fetch(&self) -> Result<CachedCredential, DbError> {
        let credential = self
            .api
            .generate_database_credential(&self.instance_names)
            .await?;

        let lifetime = match credential.expiration_time {
            Some(expires) => Duration::try_from(expires - OffsetDateTime::now_utc())
                .unwrap_or(Duration::ZERO),
            None => self.ttl,
        };

        // Short-lived tokens still get half their life before renewal.
        let margin = self.refresh_margin.min(lifetime / 2);

        tracing::debug!(
            instances = ?self.instance_names,
            lifetime_secs = lifetime.as_secs(),
            "generated database credential"
        );

        Ok(CachedCredential {
            token: credential.token,
            refresh_at: Instant::now() + lifetime.saturating_sub(margin),
        })
    }
}

/// Keep `pool` supplied with fresh passwords until the task is aborted.
///
/// Connections already open keep the password they were opened with; they are
/// recycled by the pool's max lifetime.
pub fn spawn_rotation(
    cache: Arc<CredentialCache>,
    pool: PgPool,
    base: PgConnectOptions,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let earliest = Instant::now() + ROTATION_RETRY;
            let due = cache
                .refresh_at()
                .await
                .map_or(earliest, |at| at.max(earliest));
            tokio::time::sleep_until(due).await;

            match cache.refresh().await {
                Ok(token) => {
                    pool.set_connect_options(base.clone().password(&token));
                    tracing::info!("database credential rotated");
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        retry_secs = ROTATION_RETRY.as_secs(),
                        "database credential rotation failed"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWorkspace;

    fn cache(api: &Arc<FakeWorkspace>, ttl: u64, margin: u64) -> CredentialCache {
        CredentialCache::new(
            api.clone(),
            vec!["LPT-LKB-2".to_string()],
            Duration::from_secs(ttl),
            Duration::from_secs(margin),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn token_is_reused_until_the_refresh_margin() {
        let api = Arc::new(FakeWorkspace::new());
        let cache = cache(&api, 3600, 600);

        assert_eq!(cache.current().await.unwrap(), "token-1");
        tokio::time::advance(Duration::from_secs(2999)).await;
        assert_eq!(cache.current().await.unwrap(), "token-1");
        assert_eq!(api.credential_calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.current().await.unwrap(), "token-2");
        assert_eq!(api.credential_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn margin_is_capped_at_half_the_lifetime() {
        let api = Arc::new(FakeWorkspace::new());
        let cache = cache(&api, 60, 600);

        let before = Instant::now();
        cache.current().await.unwrap();
        let due = cache.refresh_at().await.unwrap();
        assert_eq!(due - before, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_refresh() {
        let api = Arc::new(FakeWorkspace::new().with_latency(Duration::from_millis(50)));
        let cache = Arc::new(cache(&api, 3600, 600));

        let calls: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.current().await })
            })
            .collect();

        for call in calls {
            assert_eq!(call.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(api.credential_calls(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_does_not_poison_the_cache() {
        let api = Arc::new(FakeWorkspace::new());
        let cache = cache(&api, 3600, 600);

        api.fail_credentials(true);
        assert!(matches!(cache.current().await, Err(DbError::Platform(_))));
        assert!(cache.refresh_at().await.is_none());

        api.fail_credentials(false);
        assert_eq!(cache.current().await.unwrap(), "token-1");
    }

    #[tokio::test]
    async fn refresh_always_fetches() {
        let api = Arc::new(FakeWorkspace::new());
        let cache = cache(&api, 3600, 600);

        assert_eq!(cache.current().await.unwrap(), "token-1");
        assert_eq!(cache.refresh().await.unwrap(), "token-2");
        assert_eq!(cache.current().await.unwrap(), "token-2");
    }
}
