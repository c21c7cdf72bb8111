// ── Bearer-token cache ──
//
// The cloud issues time-bounded access tokens. The cache returns the
// stored token while it is fresh and refreshes on demand otherwise.
// The interior mutex is held across the refresh await, so concurrent
// callers during a refresh wait for the in-flight result instead of
// issuing duplicate issuance requests.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Error;
use crate::types::TokenGrant;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Cache for the cloud bearer token: `Empty -> Valid -> Expired -> Valid`.
///
/// The cache never performs I/O itself; [`get`](Self::get) takes the
/// issuance future from the caller so the signed request stays with the
/// HTTP client. A failed issuance caches nothing -- the next call
/// retries from scratch.
#[derive(Debug, Default)]
pub struct TokenCache {
    inner: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token, refreshing through `issue` if the cache
    /// is empty or expired. At most one refresh is in flight at a time.
    pub async fn get<F, Fut>(&self, issue: F) -> Result<String, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenGrant, Error>>,
    {
        let mut guard = self.inner.lock().await;

        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh(Utc::now()) {
                return Ok(cached.access_token.clone());
            }
            debug!("access token expired, refreshing");
        } else {
            debug!("no access token cached, requesting one");
        }

        // Lock stays held: overlapping callers await this refresh.
        let grant = issue().await?;
        let cached = CachedToken {
            access_token: grant.access_token,
            expires_at: Utc::now() + Duration::seconds(grant.expire_time),
        };
        let token = cached.access_token.clone();
        *guard = Some(cached);
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn grant(token: &str, expire_time: i64) -> TokenGrant {
        TokenGrant {
            access_token: token.to_owned(),
            expire_time,
            refresh_token: None,
            uid: None,
        }
    }

    #[tokio::test]
    async fn fresh_token_skips_issuance() {
        let cache = TokenCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let token = cache
                .get(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(grant("tok-1", 3600)) }
                })
                .await
                .unwrap();
            assert_eq!(token, "tok-1");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_is_replaced() {
        let cache = TokenCache::new();

        let first = cache.get(|| async { Ok(grant("tok-1", 0)) }).await.unwrap();
        assert_eq!(first, "tok-1");

        // expire_time of zero is already stale on the next call.
        let second = cache
            .get(|| async { Ok(grant("tok-2", 3600)) })
            .await
            .unwrap();
        assert_eq!(second, "tok-2");
    }

    #[tokio::test]
    async fn failed_issuance_caches_nothing() {
        let cache = TokenCache::new();

        let err = cache
            .get(|| async {
                Err::<TokenGrant, _>(Error::Token {
                    message: "denied".into(),
                })
            })
            .await;
        assert!(err.is_err());

        // Retry succeeds from scratch.
        let token = cache
            .get(|| async { Ok(grant("tok-1", 3600)) })
            .await
            .unwrap();
        assert_eq!(token, "tok-1");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let cache = Arc::new(TokenCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get(|| async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                            Ok(grant("tok-1", 3600))
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), "tok-1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
