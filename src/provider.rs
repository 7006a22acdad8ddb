/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The credential provider capability
//!
//! Everything that can produce credentials — static keys, shared config files, the
//! instance metadata service, STS — implements [`ProvideCredentials`]. The resolution
//! chain depends only on this capability, never on a concrete provider type.
//!
//! ## Implementing your own provider
//!
//! Define an inherent `async fn` on your type, then wrap it in the trait
//! implementation:
//! ```rust
//! use aws_base::credentials::{self, Credentials};
//! use aws_base::provider::{future, ProvideCredentials};
//!
//! struct SubprocessCredentialsProvider;
//!
//! impl SubprocessCredentialsProvider {
//!     async fn load_credentials(&self) -> credentials::Result {
//!         # fn invoke_command() -> (String, String) { ("a".to_string(), "b".to_string()) }
//!         let (akid, secret) = invoke_command();
//!         Ok(Credentials::new(akid, secret, None, None, "CustomCommand"))
//!     }
//! }
//!
//! impl ProvideCredentials for SubprocessCredentialsProvider {
//!     fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
//!     where
//!         Self: 'a,
//!     {
//!         future::ProvideCredentials::new(self.load_credentials())
//!     }
//! }
//! ```

use crate::credentials::Credentials;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub mod future {
    //! Named future returned by [`ProvideCredentials`](super::ProvideCredentials)

    use super::BoxFuture;
    use crate::credentials;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    enum Inner<'a> {
        Ready(Option<credentials::Result>),
        Boxed(BoxFuture<'a, credentials::Result>),
    }

    /// Future returned from [`ProvideCredentials::provide_credentials`](super::ProvideCredentials::provide_credentials)
    pub struct ProvideCredentials<'a>(Inner<'a>);

    impl<'a> ProvideCredentials<'a> {
        pub fn new(future: impl Future<Output = credentials::Result> + Send + 'a) -> Self {
            ProvideCredentials(Inner::Boxed(Box::pin(future)))
        }

        /// A future that resolves immediately, for providers that don't perform I/O
        pub fn ready(result: credentials::Result) -> Self {
            ProvideCredentials(Inner::Ready(Some(result)))
        }
    }

    impl Future for ProvideCredentials<'_> {
        type Output = credentials::Result;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            match &mut self.get_mut().0 {
                Inner::Ready(result) => {
                    Poll::Ready(result.take().expect("polled after completion"))
                }
                Inner::Boxed(future) => future.as_mut().poll(cx),
            }
        }
    }
}

/// Asynchronous credential provider
pub trait ProvideCredentials: Send + Sync {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a;
}

impl ProvideCredentials for Credentials {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(Ok(self.clone()))
    }
}

impl ProvideCredentials for Arc<dyn ProvideCredentials> {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.as_ref().provide_credentials()
    }
}

/// Reference-counted handle to a credential provider
///
/// This is the form providers take once resolved: cheap to clone and shareable across
/// whatever concurrency context the caller provides.
#[derive(Clone)]
pub struct SharedCredentialsProvider(Arc<dyn ProvideCredentials>);

impl std::fmt::Debug for SharedCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedCredentialsProvider")
    }
}

impl SharedCredentialsProvider {
    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        SharedCredentialsProvider(Arc::new(provider))
    }
}

impl ProvideCredentials for SharedCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        self.0.provide_credentials()
    }
}

#[cfg(test)]
mod test {
    use super::{ProvideCredentials, SharedCredentialsProvider};
    use crate::credentials::Credentials;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn providers_are_send_sync() {
        assert_send_sync::<Credentials>();
        assert_send_sync::<SharedCredentialsProvider>();
    }

    #[tokio::test]
    async fn static_credentials_provide_themselves() {
        let creds = Credentials::from_keys("akid", "secret", None);
        let provider = SharedCredentialsProvider::new(creds.clone());
        let loaded = provider.provide_credentials().await.unwrap();
        assert_eq!(loaded, creds);
    }
}
