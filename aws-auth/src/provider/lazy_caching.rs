/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Lazy, caching, credentials provider implementation

use crate::provider::{self, future, CredentialsError, ProvideCredentials};
use crate::Credentials;
use smithy_async::future::timeout::Timeout;
use smithy_async::rt::sleep::AsyncSleep;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{OnceCell, RwLock};
use tracing::{trace_span, Instrument};

const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CREDENTIAL_EXPIRATION: Duration = Duration::from_secs(15 * 60);
const DEFAULT_BUFFER_TIME: Duration = Duration::from_secs(10);

/// `LazyCachingCredentialsProvider` implements [`ProvideCredentials`] by caching
/// credentials that it loads by calling a user-provided [`ProvideCredentials`] implementation.
///
/// For example, you can provide a [`ProvideCredentials`] implementation that calls the
/// instance metadata service, and `LazyCachingCredentialsProvider` will cache those
/// credentials until they are about to expire.
///
/// Credentials are reloaded `buffer_time` before they expire. Each load is bounded by
/// `load_timeout`; exceeding it fails with [`CredentialsError::ProviderTimedOut`]. Concurrent
/// callers that find the cache empty share a single load.
#[derive(Debug)]
pub struct LazyCachingCredentialsProvider {
    time: Arc<dyn TimeSource>,
    sleeper: Arc<dyn AsyncSleep>,
    cache: Cache,
    loader: Arc<dyn ProvideCredentials>,
    load_timeout: Duration,
    default_credential_expiration: Duration,
}

impl LazyCachingCredentialsProvider {
    /// Returns a new `Builder` that can be used to construct the `LazyCachingCredentialsProvider`.
    pub fn builder() -> builder::Builder {
        builder::Builder::new()
    }

    async fn credentials(&self) -> provider::Result {
        let now = self.time.now();
        if let Some(credentials) = self.cache.yield_or_clear_if_expired(now).await {
            tracing::debug!("loaded credentials from cache");
            return Ok(credentials);
        }
        let future = Timeout::new(
            self.loader.provide_credentials(),
            self.sleeper.sleep(self.load_timeout),
        );
        let time = self.time.clone();
        let load_timeout = self.load_timeout;
        let default_credential_expiration = self.default_credential_expiration;
        self.cache
            .get_or_load(|| async move {
                let credentials = future
                    .await
                    .map_err(|_| CredentialsError::ProviderTimedOut(load_timeout))??;
                tracing::info!(provider = credentials.provider_name(), "refreshed cached credentials");
                // credentials without an expiration get a default one so they are eventually reloaded
                Ok::<_, CredentialsError>(match credentials.expiry() {
                    Some(_) => credentials,
                    None => {
                        credentials.with_expiry(Some(time.now() + default_credential_expiration))
                    }
                })
            })
            .instrument(trace_span!("lazy_load_credentials"))
            .await
    }
}

impl ProvideCredentials for LazyCachingCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }
}

pub mod builder {
    use super::{
        LazyCachingCredentialsProvider, SystemTimeSource, TimeSource, DEFAULT_BUFFER_TIME,
        DEFAULT_CREDENTIAL_EXPIRATION, DEFAULT_LOAD_TIMEOUT,
    };
    use crate::provider::lazy_caching::Cache;
    use crate::provider::ProvideCredentials;
    use smithy_async::rt::sleep::{default_async_sleep, AsyncSleep};
    use std::sync::Arc;
    use std::time::Duration;

    /// Builder for constructing a [`LazyCachingCredentialsProvider`].
    ///
    /// # Example
    ///
    /// ```
    /// use aws_auth::Credentials;
    /// use aws_auth::provider::provide_credentials_fn;
    /// use aws_auth::provider::lazy_caching::LazyCachingCredentialsProvider;
    /// use std::time::Duration;
    ///
    /// let provider = LazyCachingCredentialsProvider::builder()
    ///     .load(provide_credentials_fn(|| async {
    ///         // An async process to retrieve credentials would go here:
    ///         Ok(Credentials::from_keys("example", "example", None))
    ///     }))
    ///     .load_timeout(Duration::from_secs(30))
    ///     .build()
    ///     .expect("rt-tokio provides a sleep implementation");
    /// ```
    #[derive(Default)]
    pub struct Builder {
        sleep: Option<Arc<dyn AsyncSleep>>,
        time_source: Option<Arc<dyn TimeSource>>,
        load: Option<Arc<dyn ProvideCredentials>>,
        load_timeout: Option<Duration>,
        buffer_time: Option<Duration>,
        default_credential_expiration: Option<Duration>,
    }

    /// The builder was missing something it needs
    #[derive(Debug)]
    pub struct BuildError(&'static str);

    impl std::fmt::Display for BuildError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "invalid lazy caching configuration: {}", self.0)
        }
    }

    impl std::error::Error for BuildError {}

    impl Builder {
        pub fn new() -> Self {
            Default::default()
        }

        /// An implementation of [`ProvideCredentials`] that will be used to load
        /// the cached credentials once they're expired.
        pub fn load(mut self, loader: impl ProvideCredentials + 'static) -> Self {
            self.load = Some(Arc::new(loader));
            self
        }

        /// Implementation of [`AsyncSleep`] to use for timeouts.
        ///
        /// This enables use of the `LazyCachingCredentialsProvider` with other async runtimes.
        /// If using Tokio as the async runtime, this should be set to an instance of
        /// [`TokioSleep`](smithy_async::rt::sleep::TokioSleep).
        pub fn sleep(mut self, sleep: Arc<dyn AsyncSleep>) -> Self {
            self.sleep = Some(sleep);
            self
        }

        #[doc(hidden)]
        pub fn time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
            self.time_source = Some(time_source);
            self
        }

        /// (Optional) Timeout for the given [`ProvideCredentials`] implementation.
        /// Defaults to 5 seconds.
        pub fn load_timeout(mut self, timeout: Duration) -> Self {
            self.load_timeout = Some(timeout);
            self
        }

        /// (Optional) Amount of time before the actual credential expiration time
        /// where credentials are considered expired. For example, if credentials are expiring
        /// in 15 minutes, and the buffer time is 10 seconds, then any requests made after
        /// 14 minutes and 50 seconds will load new credentials. Defaults to 10 seconds.
        pub fn buffer_time(mut self, buffer_time: Duration) -> Self {
            self.buffer_time = Some(buffer_time);
            self
        }

        /// (Optional) Default expiration time to set on credentials if they don't
        /// have an expiration time. This is only used if the given [`ProvideCredentials`]
        /// returns [`Credentials`](crate::Credentials) that don't have their `expiry` set.
        /// This must be at least 15 minutes.
        pub fn default_credential_expiration(mut self, duration: Duration) -> Self {
            self.default_credential_expiration = Some(duration);
            self
        }

        /// Creates the [`LazyCachingCredentialsProvider`].
        pub fn build(self) -> Result<LazyCachingCredentialsProvider, BuildError> {
            let default_credential_expiration = self
                .default_credential_expiration
                .unwrap_or(DEFAULT_CREDENTIAL_EXPIRATION);
            if default_credential_expiration < DEFAULT_CREDENTIAL_EXPIRATION {
                return Err(BuildError(
                    "default_credential_expiration must be at least 15 minutes",
                ));
            }
            let loader = self.load.ok_or(BuildError("a credentials provider to load from is required"))?;
            let sleeper = self
                .sleep
                .or_else(default_async_sleep)
                .ok_or(BuildError("no sleep implementation was configured and `rt-tokio` is disabled"))?;
            Ok(LazyCachingCredentialsProvider {
                time: self.time_source.unwrap_or_else(|| Arc::new(SystemTimeSource)),
                sleeper,
                cache: Cache::new(self.buffer_time.unwrap_or(DEFAULT_BUFFER_TIME)),
                loader,
                load_timeout: self.load_timeout.unwrap_or(DEFAULT_LOAD_TIMEOUT),
                default_credential_expiration,
            })
        }
    }
}

/// Source of the current time, replaceable in tests
pub trait TimeSource: Debug + Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Copy, Clone)]
struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Clone)]
struct Cache {
    value: Arc<RwLock<OnceCell<(Credentials, SystemTime)>>>,
    buffer_time: Duration,
}

impl Debug for Cache {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("buffer_time", &self.buffer_time)
            .finish()
    }
}

impl Cache {
    fn new(buffer_time: Duration) -> Self {
        Cache {
            value: Arc::new(RwLock::new(OnceCell::new())),
            buffer_time,
        }
    }

    #[cfg(test)]
    async fn get(&self) -> Option<Credentials> {
        self.value.read().await.get().cloned().map(|(creds, _)| creds)
    }

    /// Load credentials with `f` unless another caller already did
    ///
    /// Concurrent callers wait for the first load; a failed load leaves the cache empty.
    async fn get_or_load<F, Fut>(&self, f: F) -> provider::Result
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = provider::Result>,
    {
        let lock = self.value.read().await;
        let buffer_time = self.buffer_time;
        let future = lock.get_or_try_init(|| async move {
            let credentials = f().await?;
            let expiry = credentials
                .expiry()
                .ok_or_else(|| CredentialsError::Unhandled("loaded credentials have no expiry".into()))?;
            // cache until `buffer_time` before expiry so that callers never receive credentials
            // that are about to expire
            let refresh_at = expiry.checked_sub(buffer_time).unwrap_or(expiry);
            Ok::<_, CredentialsError>((credentials, refresh_at))
        });
        future.await.map(|(credentials, _)| credentials.clone())
    }

    /// The cached credentials, or `None` after clearing them if they are due for a refresh
    async fn yield_or_clear_if_expired(&self, now: SystemTime) -> Option<Credentials> {
        // Short-circuit if the credential is not expired
        if let Some((credentials, refresh_at)) = self.value.read().await.get() {
            if now < *refresh_at {
                return Some(credentials.clone());
            }
        }

        // Acquire a write lock to clear the cache, but then once the lock is acquired,
        // check again that the credential is not already cleared. If it has been cleared,
        // then another thread is loading new credentials.
        let mut lock = self.value.write().await;
        if let Some((_credentials, refresh_at)) = lock.get() {
            if now >= *refresh_at {
                tracing::debug!("cached credentials are due for a refresh");
                *lock = OnceCell::new();
            }
        }
        None
    }
}
