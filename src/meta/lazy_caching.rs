/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::credentials::{self, Credentials};
use crate::provider::{future, ProvideCredentials, SharedCredentialsProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{OnceCell, RwLock};
use tracing::{trace_span, warn, Instrument};

const DEFAULT_CREDENTIAL_EXPIRATION: Duration = Duration::from_secs(15 * 60);

/// Caching decorator around a single upstream credential provider
///
/// Retrieval short-circuits while the cached credentials are still valid. When they
/// expire, the refresh is single-flight: at most one upstream retrieval is in flight
/// at a time and every concurrent caller observes the refreshed value once it lands.
/// The cached value and its expiry check are owned exclusively by this type.
///
/// Credentials returned without an expiry are given a default one so the cache always
/// has a refresh point.
pub struct LazyCachingCredentialsProvider {
    time: Arc<dyn TimeSource>,
    loader: SharedCredentialsProvider,
    cache: Cache,
    default_credential_expiration: Duration,
}

impl LazyCachingCredentialsProvider {
    pub fn builder() -> Builder {
        Builder::new()
    }

    async fn credentials(&self) -> credentials::Result {
        let now = self.time.now();
        if let Some(creds) = self.cache.get().await {
            if !expired(&creds, now) {
                return Ok(creds);
            }
            self.cache.clear_if_expired(now).await;
        }
        let span = trace_span!("lazy_refresh_credentials");
        self.refresh(now).instrument(span).await
    }

    async fn refresh(&self, now: SystemTime) -> credentials::Result {
        let default_expiration = self.default_credential_expiration;
        let loader = &self.loader;
        self.cache
            .get_or_refresh(|| async move {
                let creds = loader.provide_credentials().await?;
                // a cached value must carry a refresh point
                let creds = if creds.expiry().is_none() {
                    creds.with_expiry(now + default_expiration)
                } else {
                    creds
                };
                Ok(creds)
            })
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

/// Builder for [`LazyCachingCredentialsProvider`]
#[derive(Default)]
pub struct Builder {
    loader: Option<SharedCredentialsProvider>,
    default_credential_expiration: Option<Duration>,
    time: Option<Arc<dyn TimeSource>>,
}

impl Builder {
    pub fn new() -> Self {
        Default::default()
    }

    /// The upstream provider whose credentials will be cached
    pub fn load(mut self, loader: impl ProvideCredentials + 'static) -> Self {
        self.loader = Some(SharedCredentialsProvider::new(loader));
        self
    }

    /// (Optional) Expiration assigned to credentials that don't carry one.
    /// Defaults to 15 minutes.
    pub fn default_credential_expiration(mut self, duration: Duration) -> Self {
        self.default_credential_expiration = Some(duration);
        self
    }

    #[doc(hidden)]
    /// Override the clock, for tests
    pub fn time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Some(Arc::new(time));
        self
    }

    pub fn build(self) -> LazyCachingCredentialsProvider {
        LazyCachingCredentialsProvider {
            time: self.time.unwrap_or_else(|| Arc::new(SystemTimeSource)),
            loader: self.loader.expect("a loader provider is required"),
            cache: Cache::new(),
            default_credential_expiration: self
                .default_credential_expiration
                .unwrap_or(DEFAULT_CREDENTIAL_EXPIRATION),
        }
    }
}

/// Clock abstraction so expiry can be tested without waiting
pub trait TimeSource: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

fn expired(credentials: &Credentials, now: SystemTime) -> bool {
    match credentials.expiry() {
        Some(expiration) => now > expiration,
        None => {
            warn!("cached credentials are missing an expiration time");
            false
        }
    }
}

struct Cache {
    value: RwLock<OnceCell<Credentials>>,
}

impl Cache {
    fn new() -> Self {
        Cache {
            value: RwLock::new(OnceCell::new()),
        }
    }

    async fn get(&self) -> Option<Credentials> {
        self.value.read().await.get().cloned()
    }

    /// Single-flight load: when the cell is empty, exactly one caller runs `f` while
    /// the rest wait for its result.
    async fn get_or_refresh<F, Fut>(&self, f: F) -> credentials::Result
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = credentials::Result>,
    {
        let lock = self.value.read().await;
        let result = lock.get_or_try_init(f).await;
        result.map(|creds| creds.clone())
    }

    /// Clear the cache unless another caller already did
    async fn clear_if_expired(&self, now: SystemTime) -> bool {
        let mut lock = self.value.write().await;
        match lock.get() {
            Some(credentials) if expired(credentials, now) => {
                *lock = OnceCell::new();
                true
            }
            _ => false,
        }
    }
}
