/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Shared-config-file based credentials provider
//!
//! This provider loads credentials from `~/.aws/config` and `~/.aws/credentials`
//! (locations configurable, see [`source`]). It combines two pieces:
//!
//! 1. Parsing and resolution of the assume role chain described by the profile
//! 2. A user-modifiable map of named credential sources
//!
//! The selected profile is first resolved into an abstract chain ([`repr`]), then
//! executed: load the base credentials, apply each role assumption in order.
//!
//! **Note:** this provider does not cache. It reloads and reparses the files on
//! every call; see [`lazy_caching`](crate::meta::lazy_caching) for caching.
//!
//! Supported formats:
//!
//! ### Credentials defined explicitly within the file
//! ```ini
//! [default]
//! aws_access_key_id = 123
//! aws_secret_access_key = 456
//! ```
//!
//! ### Assume role credentials loaded from a credential source
//! ```ini
//! [default]
//! role_arn = arn:aws:iam::123456789:role/RoleA
//! credential_source = Ec2InstanceMetadata
//! ```
//!
//! ### Assume role credentials from a source profile
//! ```ini
//! [default]
//! role_arn = arn:aws:iam::123456789:role/RoleA
//! source_profile = base
//!
//! [profile base]
//! aws_access_key_id = 123
//! aws_secret_access_key = 456
//! ```

use crate::credentials::{self, Credentials, CredentialsError};
use crate::ecs::EcsCredentialsClient;
use crate::environment::EnvironmentVariableCredentialsProvider;
use crate::imds::ImdsClient;
use crate::os_shim::{Env, Fs};
use crate::provider::{future, ProvideCredentials, SharedCredentialsProvider};
use crate::retry::RetryPolicy;
use crate::sts::{self, AssumeRoleRequest, StsClient};
use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

pub mod parser;
mod repr;
pub mod source;

/// Name reported by credentials sourced from the shared files
pub const SHARED_CONFIG_PROVIDER_NAME: &str = "SharedConfigCredentials";

/// Failed to resolve a provider chain from the shared files
#[derive(Debug)]
#[non_exhaustive]
pub enum ProfileFileError {
    CouldNotParseProfile(parser::ProfileParseError),
    NoProfilesDefined,
    CredentialLoop {
        profiles: Vec<String>,
        next: String,
    },
    MissingCredentialSource {
        profile: String,
        message: Cow<'static, str>,
    },
    InvalidCredentialSource {
        profile: String,
        message: Cow<'static, str>,
    },
    MissingProfile {
        profile: String,
        message: Cow<'static, str>,
    },
    UnknownProvider {
        name: String,
    },
}

impl Display for ProfileFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProfileFileError::CouldNotParseProfile(err) => {
                write!(f, "could not parse profile file: {}", err)
            }
            ProfileFileError::NoProfilesDefined => write!(f, "no profiles were defined"),
            ProfileFileError::CredentialLoop { profiles, next } => write!(
                f,
                "profile formed an infinite loop: first we loaded {:?}, \
                 then attempted to reload {}",
                profiles, next
            ),
            ProfileFileError::MissingCredentialSource { profile, message } => {
                write!(f, "missing credential source in `{}`: {}", profile, message)
            }
            ProfileFileError::InvalidCredentialSource { profile, message } => {
                write!(f, "invalid credential source in `{}`: {}", profile, message)
            }
            ProfileFileError::MissingProfile { profile, message } => {
                write!(f, "profile `{}` was not defined: {}", profile, message)
            }
            ProfileFileError::UnknownProvider { name } => write!(
                f,
                "profile referenced `{}` provider but that provider is not supported",
                name
            ),
        }
    }
}

impl Error for ProfileFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProfileFileError::CouldNotParseProfile(err) => Some(err),
            _ => None,
        }
    }
}

impl ProfileFileError {
    fn into_credentials_error(self) -> CredentialsError {
        match self {
            ProfileFileError::NoProfilesDefined => CredentialsError::CredentialsNotLoaded,
            other => CredentialsError::InvalidConfiguration(Box::new(other)),
        }
    }
}

/// Named credential sources a `credential_source` directive may reference
struct NamedProviderFactory {
    providers: HashMap<Cow<'static, str>, SharedCredentialsProvider>,
}

impl NamedProviderFactory {
    fn get(&self, name: &str) -> Option<&SharedCredentialsProvider> {
        self.providers.get(name)
    }
}

/// AWS profile-file based credentials provider
pub struct ProfileFileCredentialsProvider {
    fs: Fs,
    env: Env,
    profile: Option<String>,
    shared_config_files: Vec<PathBuf>,
    shared_credentials_files: Vec<PathBuf>,
    factory: NamedProviderFactory,
    sts: Option<Arc<dyn StsClient>>,
    retry: RetryPolicy,
}

impl ProfileFileCredentialsProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    async fn load_credentials(&self) -> credentials::Result {
        let source = source::load(
            &self.fs,
            &self.env,
            &self.shared_config_files,
            &self.shared_credentials_files,
            self.profile.as_deref(),
        );
        let profile_set = parser::parse(&source).map_err(|err| {
            tracing::warn!(error = %err, "failed to parse profile");
            ProfileFileError::CouldNotParseProfile(err).into_credentials_error()
        })?;
        let chain = repr::resolve_chain(&profile_set, &source.profile, source.profile_overridden)
            .map_err(ProfileFileError::into_credentials_error)?;
        tracing::debug!(chain = ?chain, "resolved abstract provider chain from shared files");

        let mut creds = match &chain.base {
            repr::BaseProvider::ProfileKeys {
                access_key_id,
                secret_access_key,
                session_token,
            } => Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                SHARED_CONFIG_PROVIDER_NAME,
            ),
            repr::BaseProvider::NamedSource(name) => {
                let provider = self.factory.get(name).ok_or_else(|| {
                    ProfileFileError::UnknownProvider { name: name.clone() }
                        .into_credentials_error()
                })?;
                let span = tracing::info_span!("load_base_credentials", provider = %name);
                match provider.provide_credentials().instrument(span).await {
                    Ok(creds) => creds,
                    Err(CredentialsError::CredentialsNotLoaded) => {
                        return Err(CredentialsError::ProviderError(
                            format!("credential_source `{}` did not provide credentials", name)
                                .into(),
                        ))
                    }
                    Err(other) => return Err(other),
                }
            }
        };
        for step in &chain.chain {
            let sts = self.sts.as_ref().ok_or_else(|| {
                CredentialsError::ProviderError(
                    "the profile requires role assumption but no STS client was supplied".into(),
                )
            })?;
            let request = AssumeRoleRequest {
                role_arn: step.role_arn.clone(),
                session_name: step
                    .session_name
                    .clone()
                    .unwrap_or_else(|| sts::default_session_name("aws-base-session")),
                external_id: step.external_id.clone(),
                ..Default::default()
            };
            let span = tracing::info_span!("load_assume_role", role_arn = %request.role_arn);
            creds = sts::assume_role_with_retry(sts.as_ref(), &self.retry, &creds, &request)
                .instrument(span)
                .await?;
        }
        Ok(creds)
    }
}

impl ProvideCredentials for ProfileFileCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.load_credentials().instrument(
            tracing::info_span!("load_credentials", provider = "Profile"),
        ))
    }
}

#[derive(Default)]
pub struct Builder {
    fs: Fs,
    env: Env,
    profile: Option<String>,
    shared_config_files: Vec<PathBuf>,
    shared_credentials_files: Vec<PathBuf>,
    sts: Option<Arc<dyn StsClient>>,
    imds: Option<Arc<dyn ImdsClient>>,
    ecs: Option<Arc<dyn EcsCredentialsClient>>,
    retry: Option<RetryPolicy>,
    custom_providers: HashMap<Cow<'static, str>, SharedCredentialsProvider>,
}

impl Builder {
    pub fn fs(mut self, fs: Fs) -> Self {
        self.fs = fs;
        self
    }

    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Select a profile explicitly instead of `$AWS_PROFILE` / `default`
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn set_profile(&mut self, profile: Option<String>) -> &mut Self {
        self.profile = profile;
        self
    }

    pub fn shared_config_files(mut self, files: Vec<PathBuf>) -> Self {
        self.shared_config_files = files;
        self
    }

    pub fn shared_credentials_files(mut self, files: Vec<PathBuf>) -> Self {
        self.shared_credentials_files = files;
        self
    }

    pub fn sts_client(mut self, sts: Arc<dyn StsClient>) -> Self {
        self.sts = Some(sts);
        self
    }

    pub fn set_sts_client(&mut self, sts: Option<Arc<dyn StsClient>>) -> &mut Self {
        self.sts = sts;
        self
    }

    pub fn imds_client(mut self, imds: Arc<dyn ImdsClient>) -> Self {
        self.imds = Some(imds);
        self
    }

    pub fn set_imds_client(&mut self, imds: Option<Arc<dyn ImdsClient>>) -> &mut Self {
        self.imds = imds;
        self
    }

    pub fn ecs_client(mut self, ecs: Arc<dyn EcsCredentialsClient>) -> Self {
        self.ecs = Some(ecs);
        self
    }

    pub fn set_ecs_client(&mut self, ecs: Option<Arc<dyn EcsCredentialsClient>>) -> &mut Self {
        self.ecs = ecs;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Register an additional named credential source for `credential_source`
    /// directives
    pub fn with_custom_provider(
        mut self,
        name: impl Into<Cow<'static, str>>,
        provider: impl ProvideCredentials + 'static,
    ) -> Self {
        self.custom_providers
            .insert(name.into(), SharedCredentialsProvider::new(provider));
        self
    }

    pub fn build(self) -> ProfileFileCredentialsProvider {
        let retry = self
            .retry
            .unwrap_or_else(|| RetryPolicy::new(Default::default()));
        let env = self.env;
        let imds = self.imds;
        let ecs = self.ecs;
        let mut providers = self.custom_providers;
        providers.entry("Environment".into()).or_insert_with(|| {
            SharedCredentialsProvider::new(EnvironmentVariableCredentialsProvider::new_with_env(
                env.clone(),
            ))
        });
        providers
            .entry("Ec2InstanceMetadata".into())
            .or_insert_with(|| {
                SharedCredentialsProvider::new(crate::imds::ImdsCredentialsProvider::new(
                    imds.clone(),
                    retry.clone(),
                ))
            });
        providers.entry("EcsContainer".into()).or_insert_with(|| {
            SharedCredentialsProvider::new(crate::ecs::EcsCredentialsProvider::new(
                env.clone(),
                ecs.clone(),
                retry.clone(),
            ))
        });
        ProfileFileCredentialsProvider {
            fs: self.fs,
            env,
            profile: self.profile,
            shared_config_files: self.shared_config_files,
            shared_credentials_files: self.shared_credentials_files,
            factory: NamedProviderFactory { providers },
            sts: self.sts,
            retry,
        }
    }
}
