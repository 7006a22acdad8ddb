/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Default credential provider chain
//!
//! Resolution order, first match wins:
//! 1. Static credentials supplied in configuration
//! 2. Assume role with web identity (configured spec or ambient environment contract)
//! 3. Shared config/credentials files
//! 4. Environment variables
//! 5. Container credentials endpoint
//! 6. EC2 instance metadata (unless the metadata probe is disabled)
//!
//! A provider that reports `CredentialsNotLoaded` passes its turn; any other error
//! is authoritative and aborts resolution. The winning provider is returned wrapped
//! in a caching decorator, primed with the retrieval that proved it works, together
//! with the label of the source that produced the credentials.

use crate::config::Config;
use crate::credentials::{Credentials, CredentialsError};
use crate::ecs::EcsCredentialsProvider;
use crate::environment::EnvironmentVariableCredentialsProvider;
use crate::imds::ImdsCredentialsProvider;
use crate::meta::chain::ProviderChain;
use crate::meta::lazy_caching::LazyCachingCredentialsProvider;
use crate::profile::ProfileFileCredentialsProvider;
use crate::provider::{ProvideCredentials, SharedCredentialsProvider};
use crate::provider_config::ProviderConfig;
use crate::web_identity::WebIdentityTokenCredentialsProvider;
use tracing::Instrument;

/// Resolve the credential provider a client should use
///
/// Returns the first applicable provider, wrapped in a caching decorator, along with
/// the label of the source that produced the credentials.
pub async fn resolve_credentials_provider(
    config: &Config,
    provider_config: &ProviderConfig,
) -> Result<(SharedCredentialsProvider, String), CredentialsError> {
    let chain = build_chain(config, provider_config)?;
    for (name, provider) in chain.entries() {
        let cached = LazyCachingCredentialsProvider::builder()
            .load(provider.clone())
            .build();
        let span = tracing::info_span!("resolve_credentials", candidate = %name);
        match cached.provide_credentials().instrument(span).await {
            Ok(creds) => {
                tracing::info!(candidate = %name, source = %creds.provider_name(), "resolved credentials");
                return Ok((
                    SharedCredentialsProvider::new(cached),
                    creds.provider_name().to_string(),
                ));
            }
            Err(CredentialsError::CredentialsNotLoaded) => {
                tracing::info!(candidate = %name, "candidate did not provide credentials");
            }
            Err(err) => {
                tracing::warn!(candidate = %name, error = %err, "candidate failed to provide credentials");
                return Err(err);
            }
        }
    }
    Err(CredentialsError::NoValidCredentialSources)
}

fn build_chain(
    config: &Config,
    provider_config: &ProviderConfig,
) -> Result<ProviderChain, CredentialsError> {
    let retry = provider_config.retry_policy();

    let static_provider = static_credentials(config)?;
    let mut web_identity_builder = WebIdentityTokenCredentialsProvider::builder()
        .env(provider_config.env().clone())
        .fs(provider_config.fs().clone())
        .retry_policy(retry.clone());
    web_identity_builder.set_spec(config.assume_role_with_web_identity().cloned());
    web_identity_builder.set_sts_client(provider_config.sts_client());

    let mut profile_builder = ProfileFileCredentialsProvider::builder()
        .env(provider_config.env().clone())
        .fs(provider_config.fs().clone())
        .shared_config_files(config.shared_config_files().to_vec())
        .shared_credentials_files(config.shared_credentials_files().to_vec())
        .retry_policy(retry.clone());
    profile_builder.set_profile(config.profile().map(ToString::to_string));
    profile_builder.set_sts_client(provider_config.sts_client());
    profile_builder.set_imds_client(provider_config.imds_client());
    profile_builder.set_ecs_client(provider_config.ecs_client());

    let mut chain = ProviderChain::first_try("Static", static_provider)
        .or_else("WebIdentityToken", web_identity_builder.build())
        .or_else("Profile", profile_builder.build())
        .or_else(
            "Environment",
            EnvironmentVariableCredentialsProvider::new_with_env(provider_config.env().clone()),
        )
        .or_else(
            "EcsContainer",
            EcsCredentialsProvider::new(
                provider_config.env().clone(),
                provider_config.ecs_client(),
                retry.clone(),
            ),
        );
    if config.skip_metadata_api_check() {
        tracing::debug!("instance metadata probing is disabled");
    } else {
        chain = chain.or_else(
            "Ec2InstanceMetadata",
            ImdsCredentialsProvider::new(provider_config.imds_client(), retry),
        );
    }
    Ok(chain)
}

/// Static credentials from configuration; an inapplicable candidate when no keys are
/// configured, an invalid configuration when only half a key pair is
fn static_credentials(config: &Config) -> Result<StaticCandidate, CredentialsError> {
    match (config.access_key(), config.secret_key()) {
        (Some(access_key), Some(secret_key)) => Ok(StaticCandidate {
            credentials: Some(Credentials::from_keys(
                access_key,
                secret_key,
                config.token().map(ToString::to_string),
            )),
        }),
        (None, None) => Ok(StaticCandidate { credentials: None }),
        _ => Err(CredentialsError::InvalidConfiguration(
            "both an access key and a secret key must be configured, got only one".into(),
        )),
    }
}

struct StaticCandidate {
    credentials: Option<Credentials>,
}

impl ProvideCredentials for StaticCandidate {
    fn provide_credentials<'a>(&'a self) -> crate::provider::future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        crate::provider::future::ProvideCredentials::ready(
            self.credentials
                .clone()
                .ok_or(CredentialsError::CredentialsNotLoaded),
        )
    }
}

