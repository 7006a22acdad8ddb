/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Container (ECS) credentials provider
//!
//! Applicable only when the container runtime advertises a credentials endpoint via
//! `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`. The HTTP exchange itself is performed by
//! an injected [`EcsCredentialsClient`].

use crate::credentials::{self, CredentialsError};
use crate::os_shim::Env;
use crate::provider::{future, BoxFuture, ProvideCredentials};
use crate::retry::{ErrorKind, ProvideErrorKind, RetryPolicy};
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Name reported by credentials sourced from the container endpoint
pub const ECS_PROVIDER_NAME: &str = "EcsContainerCredentials";

pub(crate) const ENV_CONTAINER_CREDENTIALS_RELATIVE_URI: &str =
    "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";

/// Failure of a container credentials fetch
#[derive(Debug)]
pub enum EcsCredentialsError {
    /// The endpoint could not be reached
    Transport(Box<dyn Error + Send + Sync + 'static>),
    /// The endpoint answered with something other than credentials
    Response { message: String },
}

impl Display for EcsCredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EcsCredentialsError::Transport(err) => {
                write!(f, "failed to reach the container credentials endpoint: {}", err)
            }
            EcsCredentialsError::Response { message } => {
                write!(f, "invalid response from the container credentials endpoint: {}", message)
            }
        }
    }
}

impl Error for EcsCredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EcsCredentialsError::Transport(err) => Some(err.as_ref() as _),
            _ => None,
        }
    }
}

impl ProvideErrorKind for EcsCredentialsError {
    fn retryable_error_kind(&self) -> Option<ErrorKind> {
        match self {
            EcsCredentialsError::Transport(_) => Some(ErrorKind::TransientError),
            EcsCredentialsError::Response { .. } => None,
        }
    }
}

/// The container credentials endpoint, implemented outside this crate
pub trait EcsCredentialsClient: Send + Sync {
    fn fetch_credentials<'a>(
        &'a self,
        relative_uri: &'a str,
    ) -> BoxFuture<'a, Result<credentials::Credentials, EcsCredentialsError>>;
}

pub struct EcsCredentialsProvider {
    env: Env,
    client: Option<Arc<dyn EcsCredentialsClient>>,
    retry: RetryPolicy,
}

impl EcsCredentialsProvider {
    pub fn new(
        env: Env,
        client: Option<Arc<dyn EcsCredentialsClient>>,
        retry: RetryPolicy,
    ) -> Self {
        EcsCredentialsProvider { env, client, retry }
    }

    async fn credentials(&self) -> credentials::Result {
        let relative_uri = self
            .env
            .get(ENV_CONTAINER_CREDENTIALS_RELATIVE_URI)
            .map_err(|_| CredentialsError::CredentialsNotLoaded)?;
        let client = self.client.as_ref().ok_or_else(|| {
            CredentialsError::ProviderError(
                "a container credentials endpoint is advertised but no client was supplied".into(),
            )
        })?;
        match self
            .retry
            .call(|| client.fetch_credentials(&relative_uri))
            .await
        {
            Ok(creds) => Ok(creds.with_provider_name(ECS_PROVIDER_NAME)),
            Err(err) => Err(CredentialsError::ProviderError(Box::new(err))),
        }
    }
}

impl ProvideCredentials for EcsCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }
}
