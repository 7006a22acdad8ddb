/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! EC2 instance metadata (IMDS) credentials provider
//!
//! Last resort of the default chain. The metadata protocol (security-credentials
//! listing, detail fetch, instance identity document) lives behind the injected
//! [`ImdsClient`]; a failure to reach it means this source is unavailable and the
//! chain falls through rather than aborting.

use crate::credentials::{self, CredentialsError};
use crate::provider::{future, BoxFuture, ProvideCredentials};
use crate::retry::{ErrorKind, ProvideErrorKind, RetryPolicy};
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Name reported by credentials sourced from the instance metadata service
pub const IMDS_PROVIDER_NAME: &str = "Ec2InstanceMetadata";

/// Failure of an instance metadata fetch
#[derive(Debug)]
pub enum ImdsError {
    /// The metadata endpoint could not be reached
    Transport(Box<dyn Error + Send + Sync + 'static>),
    /// The metadata endpoint answered with something other than role credentials
    Response { message: String },
}

impl Display for ImdsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ImdsError::Transport(err) => {
                write!(f, "failed to reach the instance metadata service: {}", err)
            }
            ImdsError::Response { message } => {
                write!(f, "invalid response from the instance metadata service: {}", message)
            }
        }
    }
}

impl Error for ImdsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImdsError::Transport(err) => Some(err.as_ref() as _),
            _ => None,
        }
    }
}

impl ProvideErrorKind for ImdsError {
    fn retryable_error_kind(&self) -> Option<ErrorKind> {
        match self {
            ImdsError::Transport(_) => Some(ErrorKind::TransientError),
            ImdsError::Response { .. } => None,
        }
    }
}

/// The instance metadata endpoint, implemented outside this crate
pub trait ImdsClient: Send + Sync {
    fn fetch_credentials(&self) -> BoxFuture<'_, Result<credentials::Credentials, ImdsError>>;
}

pub struct ImdsCredentialsProvider {
    client: Option<Arc<dyn ImdsClient>>,
    retry: RetryPolicy,
}

impl ImdsCredentialsProvider {
    pub fn new(client: Option<Arc<dyn ImdsClient>>, retry: RetryPolicy) -> Self {
        ImdsCredentialsProvider { client, retry }
    }

    async fn credentials(&self) -> credentials::Result {
        let client = match &self.client {
            Some(client) => client,
            None => {
                tracing::debug!("no instance metadata client was supplied");
                return Err(CredentialsError::CredentialsNotLoaded);
            }
        };
        match self.retry.call(|| client.fetch_credentials()).await {
            Ok(creds) => Ok(creds.with_provider_name(IMDS_PROVIDER_NAME)),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load credentials from the instance metadata service");
                Err(CredentialsError::CredentialsNotLoaded)
            }
        }
    }
}

impl ProvideCredentials for ImdsCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }
}
