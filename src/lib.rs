/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! `aws-base` — credential resolution, validation and retry classification for AWS
//! service clients
//!
//! Given an immutable [`Config`] snapshot, this crate determines which credential
//! source to use (static keys, web identity, shared files, environment, container
//! endpoint, instance metadata — in that order), optionally layers STS role
//! assumption on top, validates the result with a caller-identity check, and
//! produces the retry and user-agent configuration for every call made with those
//! credentials.
//!
//! The HTTP transport and the STS/metadata wire protocols live outside this crate:
//! they are injected through [`ProviderConfig`] as implementations of
//! [`sts::StsClient`], [`imds::ImdsClient`] and [`ecs::EcsCredentialsClient`].
//!
//! # Example
//! ```no_run
//! use aws_base::{Config, ProviderConfig};
//!
//! # async fn docs() -> Result<(), aws_base::CredentialsError> {
//! let config = Config::builder()
//!     .credentials("AKIDEXAMPLE", "secret")
//!     .skip_credentials_validation(true)
//!     .build();
//! let client_config = aws_base::load_client_config(&config, &ProviderConfig::new()).await?;
//! println!("credentials come from {}", client_config.credentials_source());
//! # Ok(()) }
//! ```

pub mod build_metadata;
pub mod config;
pub mod credentials;
pub mod default_chain;
pub mod ecs;
pub mod environment;
pub mod imds;
pub mod meta;
pub mod os_shim;
pub mod profile;
pub mod provider;
pub mod provider_config;
pub mod retry;
pub mod sts;
pub mod user_agent;
pub mod validation;
pub mod web_identity;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use config::{AssumeRole, AssumeRoleWithWebIdentity, Config, Region};
pub use credentials::{Credentials, CredentialsError};
pub use default_chain::resolve_credentials_provider;
pub use provider::{ProvideCredentials, SharedCredentialsProvider};
pub use provider_config::ProviderConfig;
pub use user_agent::{AwsUserAgent, UserAgentProduct};

use crate::meta::lazy_caching::LazyCachingCredentialsProvider;
use crate::retry::{RetryConfig, RetryPolicy};
use crate::sts::{AssumeRoleProvider, CallerIdentity};
use crate::validation::{partition_for_region, partition_from_arn};

/// Everything a service client needs to make calls with the resolved credentials
#[derive(Clone, Debug)]
pub struct ClientConfig {
    credentials_provider: SharedCredentialsProvider,
    credentials_source: String,
    region: Option<Region>,
    retry_config: RetryConfig,
    user_agent: AwsUserAgent,
    caller_identity: Option<CallerIdentity>,
    partition: Option<String>,
}

impl ClientConfig {
    pub fn credentials_provider(&self) -> &SharedCredentialsProvider {
        &self.credentials_provider
    }

    /// Label of the source that produced the credentials
    pub fn credentials_source(&self) -> &str {
        &self.credentials_source
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    pub fn user_agent(&self) -> &AwsUserAgent {
        &self.user_agent
    }

    pub fn caller_identity(&self) -> Option<&CallerIdentity> {
        self.caller_identity.as_ref()
    }

    pub fn account_id(&self) -> Option<&str> {
        self.caller_identity
            .as_ref()
            .map(|identity| identity.account_id.as_str())
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }
}

/// Resolve credentials, apply role assumption, validate, and assemble the
/// client-facing configuration
///
/// This is the top-level entry point. Resolution walks the default provider chain;
/// when [`Config::assume_role`] is set the resolved provider is wrapped with an STS
/// `AssumeRole` decorator and a fresh cache; unless skipped, the result is validated
/// with a `GetCallerIdentity` call, which also yields the account ID and partition.
pub async fn load_client_config(
    config: &Config,
    provider_config: &ProviderConfig,
) -> Result<ClientConfig, CredentialsError> {
    let retry_config = match config.max_retries() {
        Some(max_retries) => provider_config
            .retry_config()
            .clone()
            .with_max_attempts(max_retries),
        None => provider_config.retry_config().clone(),
    };
    let retry_policy = RetryPolicy::new(retry_config.clone());

    let (provider, source) = resolve_credentials_provider(config, provider_config).await?;

    let provider = match config.assume_role() {
        Some(spec) => {
            let sts = provider_config.sts_client().ok_or_else(|| {
                CredentialsError::ProviderError(
                    "role assumption was configured but no STS client was supplied".into(),
                )
            })?;
            let decorated =
                AssumeRoleProvider::new(provider, sts, spec.clone(), retry_policy.clone());
            SharedCredentialsProvider::new(
                LazyCachingCredentialsProvider::builder().load(decorated).build(),
            )
        }
        None => provider,
    };

    let mut caller_identity = None;
    if !config.skip_credentials_validation() {
        let sts = provider_config.sts_client().ok_or_else(|| {
            CredentialsError::ValidationFailed(
                "credential validation requires an STS client".into(),
            )
        })?;
        caller_identity = Some(
            validation::validate_credentials(&provider, sts.as_ref(), &retry_policy).await?,
        );
    } else if !config.skip_requesting_account_id() {
        // best effort: the account id is informational here, a failure to fetch it
        // must not fail configuration loading
        if let Some(sts) = provider_config.sts_client() {
            match validation::validate_credentials(&provider, sts.as_ref(), &retry_policy).await {
                Ok(identity) => caller_identity = Some(identity),
                Err(err) => {
                    tracing::warn!(error = %err, "could not determine the caller account id")
                }
            }
        }
    }

    let region = config
        .region()
        .or_else(|| provider_config.region())
        .cloned();
    let partition = caller_identity
        .as_ref()
        .and_then(|identity| partition_from_arn(&identity.arn))
        .map(ToString::to_string)
        .or_else(|| {
            region
                .as_ref()
                .map(|region| partition_for_region(region).to_string())
        });

    let user_agent = AwsUserAgent::new_from_environment(
        provider_config.env(),
        config.user_agent_products().to_vec(),
    );

    Ok(ClientConfig {
        credentials_provider: provider,
        credentials_source: source,
        region,
        retry_config,
        user_agent,
        caller_identity,
        partition,
    })
}
