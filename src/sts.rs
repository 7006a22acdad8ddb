/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credential provider augmentation through the AWS Security Token Service (STS)
//!
//! The wire protocol lives outside this crate: [`StsClient`] is the seam through
//! which an actual STS implementation (or a mock) is injected. Providers here decide
//! *when* to call it, with which inputs, and how its failures are classified.

use crate::config::AssumeRole;
use crate::credentials::{self, Credentials, CredentialsError};
use crate::provider::{future, BoxFuture, ProvideCredentials, SharedCredentialsProvider};
use crate::retry::{ErrorKind, ProvideErrorKind, RetryPolicy};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Name reported by credentials derived through `AssumeRole`
pub const ASSUME_ROLE_PROVIDER_NAME: &str = "AssumeRoleProvider";

/// Name reported by credentials derived through `AssumeRoleWithWebIdentity`
pub const WEB_IDENTITY_PROVIDER_NAME: &str = "WebIdentityCredentials";

/// Inputs for one `AssumeRole` call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub duration: Option<Duration>,
    pub external_id: Option<String>,
    pub policy: Option<String>,
    pub policy_arns: Vec<String>,
    pub tags: HashMap<String, String>,
    pub transitive_tag_keys: Vec<String>,
}

impl AssumeRoleRequest {
    pub(crate) fn from_spec(spec: &AssumeRole) -> Self {
        AssumeRoleRequest {
            role_arn: spec.role_arn.clone(),
            session_name: spec
                .session_name
                .clone()
                .unwrap_or_else(|| default_session_name("aws-base-session")),
            duration: spec.duration,
            external_id: spec.external_id.clone(),
            policy: spec.policy.clone(),
            policy_arns: spec.policy_arns.clone(),
            tags: spec.tags.clone(),
            transitive_tag_keys: spec.transitive_tag_keys.clone(),
        }
    }
}

/// Inputs for one `AssumeRoleWithWebIdentity` call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WebIdentityRequest {
    pub role_arn: String,
    pub session_name: String,
    pub token: String,
}

/// Response of a `GetCallerIdentity` call
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallerIdentity {
    pub account_id: String,
    pub arn: String,
    pub user_id: String,
}

/// The three STS operations this crate consumes, implemented outside it
pub trait StsClient: Send + Sync {
    /// Exchange `source` credentials for time-limited role credentials
    fn assume_role<'a>(
        &'a self,
        source: &'a Credentials,
        request: &'a AssumeRoleRequest,
    ) -> BoxFuture<'a, Result<Credentials, StsError>>;

    /// Exchange an external identity token for time-limited role credentials
    fn assume_role_with_web_identity<'a>(
        &'a self,
        request: &'a WebIdentityRequest,
    ) -> BoxFuture<'a, Result<Credentials, StsError>>;

    /// Confirm `credentials` are usable and report who they belong to
    fn get_caller_identity<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<CallerIdentity, StsError>>;
}

/// Failure of an STS operation
///
/// Transport failures are transient and may be retried; a service rejection is an
/// answer, not an outage, and is never retried.
#[derive(Debug)]
pub enum StsError {
    /// STS received the request and rejected it (e.g. `AccessDenied`,
    /// `InvalidClientTokenId`)
    Service { code: String, message: String },
    /// The request never produced an STS answer
    Transport(Box<dyn Error + Send + Sync + 'static>),
}

impl StsError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        StsError::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(err: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        StsError::Transport(err.into())
    }

    pub fn is_service(&self) -> bool {
        matches!(self, StsError::Service { .. })
    }
}

impl Display for StsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StsError::Service { code, message } => write!(f, "{}: {}", code, message),
            StsError::Transport(err) => write!(f, "transport error: {}", err),
        }
    }
}

impl Error for StsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StsError::Transport(err) => Some(err.as_ref() as _),
            _ => None,
        }
    }
}

impl ProvideErrorKind for StsError {
    fn retryable_error_kind(&self) -> Option<ErrorKind> {
        match self {
            StsError::Transport(_) => Some(ErrorKind::TransientError),
            StsError::Service { code, .. } => match code.as_str() {
                "Throttling" | "ThrottlingException" | "RequestLimitExceeded" => {
                    Some(ErrorKind::ThrottlingError)
                }
                _ => None,
            },
        }
    }

    fn code(&self) -> Option<&str> {
        match self {
            StsError::Service { code, .. } => Some(code),
            StsError::Transport(_) => None,
        }
    }
}

/// Session name used when the configuration doesn't provide one
pub(crate) fn default_session_name(base: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("the unix epoch is in the past");
    format!("{}-{}", base, now.as_millis())
}

/// Run one role assumption through the retry policy and classify its failure.
///
/// Transport errors are retried; a service rejection (or an exhausted retry budget)
/// surfaces as [`CredentialsError::CannotAssumeRole`] with the cause preserved.
pub(crate) async fn assume_role_with_retry(
    sts: &dyn StsClient,
    retry: &RetryPolicy,
    source: &Credentials,
    request: &AssumeRoleRequest,
) -> credentials::Result {
    tracing::debug!(role_arn = %request.role_arn, "assuming role");
    match retry.call(|| sts.assume_role(source, request)).await {
        Ok(creds) => Ok(creds.with_provider_name(ASSUME_ROLE_PROVIDER_NAME)),
        Err(err) => Err(CredentialsError::CannotAssumeRole {
            role_arn: request.role_arn.clone(),
            source: Box::new(err),
        }),
    }
}

/// Like [`assume_role_with_retry`], for the web-identity variant.
pub(crate) async fn assume_role_with_web_identity_retry(
    sts: &dyn StsClient,
    retry: &RetryPolicy,
    request: &WebIdentityRequest,
) -> credentials::Result {
    tracing::debug!(role_arn = %request.role_arn, "assuming role with web identity");
    match retry
        .call(|| sts.assume_role_with_web_identity(request))
        .await
    {
        Ok(creds) => Ok(creds.with_provider_name(WEB_IDENTITY_PROVIDER_NAME)),
        Err(err) => Err(CredentialsError::CannotAssumeRole {
            role_arn: request.role_arn.clone(),
            source: Box::new(err),
        }),
    }
}

/// Decorator that wraps a resolved base provider with an STS `AssumeRole` call
///
/// Produces a derived, time-limited credential set. Expired sets are not renewed
/// here; re-invoking `provide_credentials` performs another STS call, which the
/// caching decorator at the outer layer is expected to gate.
pub struct AssumeRoleProvider {
    base: SharedCredentialsProvider,
    sts: Arc<dyn StsClient>,
    spec: AssumeRole,
    retry: RetryPolicy,
}

impl AssumeRoleProvider {
    pub fn new(
        base: SharedCredentialsProvider,
        sts: Arc<dyn StsClient>,
        spec: AssumeRole,
        retry: RetryPolicy,
    ) -> Self {
        AssumeRoleProvider {
            base,
            sts,
            spec,
            retry,
        }
    }

    async fn credentials(&self) -> credentials::Result {
        let source = self.base.provide_credentials().await?;
        let request = AssumeRoleRequest::from_spec(&self.spec);
        assume_role_with_retry(self.sts.as_ref(), &self.retry, &source, &request).await
    }
}

impl ProvideCredentials for AssumeRoleProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }
}
