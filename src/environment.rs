/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Load credentials from the process environment

use crate::credentials::{self, Credentials, CredentialsError};
use crate::os_shim::Env;
use crate::provider::{future, ProvideCredentials};

/// Name reported by credentials sourced from environment variables
pub const ENVIRONMENT_PROVIDER_NAME: &str = "EnvConfigCredentials";

pub(crate) const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub(crate) const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub(crate) const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Credentials provider backed by `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
/// `AWS_SESSION_TOKEN`
#[derive(Clone, Debug)]
pub struct EnvironmentVariableCredentialsProvider {
    env: Env,
}

impl EnvironmentVariableCredentialsProvider {
    pub fn new() -> Self {
        Self::new_with_env(Env::real())
    }

    pub fn new_with_env(env: Env) -> Self {
        EnvironmentVariableCredentialsProvider { env }
    }

    fn credentials(&self) -> credentials::Result {
        let access_key = self.env.get(ENV_ACCESS_KEY_ID).ok();
        let secret_key = self.env.get(ENV_SECRET_ACCESS_KEY).ok();
        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(Credentials::new(
                access_key,
                secret_key,
                self.env.get(ENV_SESSION_TOKEN).ok(),
                None,
                ENVIRONMENT_PROVIDER_NAME,
            )),
            (None, None) => Err(CredentialsError::CredentialsNotLoaded),
            (Some(_), None) => Err(CredentialsError::InvalidConfiguration(
                format!("{} was set but {} was not", ENV_ACCESS_KEY_ID, ENV_SECRET_ACCESS_KEY)
                    .into(),
            )),
            (None, Some(_)) => Err(CredentialsError::InvalidConfiguration(
                format!("{} was set but {} was not", ENV_SECRET_ACCESS_KEY, ENV_ACCESS_KEY_ID)
                    .into(),
            )),
        }
    }
}

impl Default for EnvironmentVariableCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvideCredentials for EnvironmentVariableCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::ready(self.credentials())
    }
}
