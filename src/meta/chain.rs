/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::credentials::{self, CredentialsError};
use crate::provider::{future, ProvideCredentials, SharedCredentialsProvider};
use std::borrow::Cow;
use tracing::Instrument;

/// Credentials provider that checks a series of inner providers
///
/// Each provider is checked in turn. The first provider that returns credentials
/// wins; a provider that reports [`CredentialsError::CredentialsNotLoaded`] passes
/// its turn, any other error is authoritative and stops the chain.
///
/// ## Example
/// ```rust
/// use aws_base::meta::chain::ProviderChain;
/// use aws_base::Credentials;
/// let provider = ProviderChain::first_try("Static", Credentials::from_keys("akid", "secret", None))
///     .or_else("Fallback", Credentials::from_keys("other", "secret", None));
/// ```
pub struct ProviderChain {
    providers: Vec<(Cow<'static, str>, SharedCredentialsProvider)>,
}

impl ProviderChain {
    pub fn first_try(
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        ProviderChain {
            providers: vec![(name.into(), SharedCredentialsProvider::new(provider))],
        }
    }

    pub fn or_else(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.providers
            .push((name.into(), SharedCredentialsProvider::new(provider)));
        self
    }

    pub(crate) fn entries(
        &self,
    ) -> impl Iterator<Item = &(Cow<'static, str>, SharedCredentialsProvider)> {
        self.providers.iter()
    }

    async fn credentials(&self) -> credentials::Result {
        for (name, provider) in &self.providers {
            let span = tracing::info_span!("load_credentials", provider = %name);
            match provider.provide_credentials().instrument(span).await {
                Ok(credentials) => {
                    tracing::info!(provider = %name, "loaded credentials");
                    return Ok(credentials);
                }
                Err(CredentialsError::CredentialsNotLoaded) => {
                    tracing::info!(provider = %name, "provider in chain did not provide credentials");
                }
                Err(e) => {
                    tracing::warn!(provider = %name, error = %e, "provider failed to provide credentials");
                    return Err(e);
                }
            }
        }
        Err(CredentialsError::CredentialsNotLoaded)
    }
}

impl ProvideCredentials for ProviderChain {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }
}

#[cfg(test)]
mod test {
    use super::ProviderChain;
    use crate::credentials::{self, Credentials, CredentialsError};
    use crate::provider::{future, ProvideCredentials};
    use tracing_test::traced_test;

    struct Unloaded;

    impl ProvideCredentials for Unloaded {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            future::ProvideCredentials::ready(Err(CredentialsError::CredentialsNotLoaded))
        }
    }

    struct Broken;

    impl ProvideCredentials for Broken {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            future::ProvideCredentials::ready(Err(CredentialsError::ProviderError(
                "terminal failure".into(),
            )))
        }
    }

    fn keys(akid: &str) -> Credentials {
        Credentials::from_keys(akid, "secret", None)
    }

    async fn resolve(chain: &ProviderChain) -> credentials::Result {
        chain.provide_credentials().await
    }

    #[tokio::test]
    async fn first_applicable_provider_wins() {
        let chain = ProviderChain::first_try("A", keys("a")).or_else("B", keys("b"));
        assert_eq!(resolve(&chain).await.unwrap().access_key_id(), "a");
    }

    #[tokio::test]
    async fn unloaded_providers_fall_through() {
        let chain = ProviderChain::first_try("A", Unloaded).or_else("B", keys("b"));
        assert_eq!(resolve(&chain).await.unwrap().access_key_id(), "b");
    }

    #[tokio::test]
    async fn authoritative_errors_stop_the_chain() {
        let chain = ProviderChain::first_try("A", Broken).or_else("B", keys("b"));
        match resolve(&chain).await.expect_err("chain must stop") {
            CredentialsError::ProviderError(_) => {}
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn empty_handed_chain_reports_not_loaded() {
        let chain = ProviderChain::first_try("A", Unloaded).or_else("B", Unloaded);
        assert!(resolve(&chain)
            .await
            .expect_err("nothing to load")
            .is_credentials_not_loaded());
    }

    #[traced_test]
    #[tokio::test]
    async fn fallthrough_is_logged() {
        let chain = ProviderChain::first_try("A", Unloaded).or_else("B", keys("b"));
        resolve(&chain).await.unwrap();
        assert!(logs_contain("provider in chain did not provide credentials"));
        assert!(logs_contain("loaded credentials"));
    }
}
