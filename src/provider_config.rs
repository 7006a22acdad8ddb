/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Shared runtime configuration for credential providers
//!
//! Carries the ambient-environment shims and the external collaborators (STS,
//! instance metadata, container endpoint) that providers need. Collaborators are
//! injected here once and reused by every provider the chain constructs.

use crate::config::Region;
use crate::ecs::EcsCredentialsClient;
use crate::imds::ImdsClient;
use crate::os_shim::{Env, Fs};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::sts::StsClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProviderConfig {
    env: Env,
    fs: Fs,
    region: Option<Region>,
    sts: Option<Arc<dyn StsClient>>,
    imds: Option<Arc<dyn ImdsClient>>,
    ecs: Option<Arc<dyn EcsCredentialsClient>>,
    retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            env: Env::real(),
            fs: Fs::real(),
            region: None,
            sts: None,
            imds: None,
            ecs: None,
            retry: RetryConfig::standard(),
        }
    }
}

impl ProviderConfig {
    pub fn new() -> Self {
        Default::default()
    }

    /// A config with fake environment and file system, for tests
    pub fn no_ambient_configuration() -> Self {
        ProviderConfig {
            env: Env::from_slice(&[]),
            fs: Fs::from_slice(&[]),
            ..Default::default()
        }
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn with_fs(mut self, fs: Fs) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    pub fn with_sts_client(mut self, sts: Arc<dyn StsClient>) -> Self {
        self.sts = Some(sts);
        self
    }

    pub fn with_imds_client(mut self, imds: Arc<dyn ImdsClient>) -> Self {
        self.imds = Some(imds);
        self
    }

    pub fn with_ecs_client(mut self, ecs: Arc<dyn EcsCredentialsClient>) -> Self {
        self.ecs = Some(ecs);
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn fs(&self) -> &Fs {
        &self.fs
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub fn sts_client(&self) -> Option<Arc<dyn StsClient>> {
        self.sts.clone()
    }

    pub fn imds_client(&self) -> Option<Arc<dyn ImdsClient>> {
        self.imds.clone()
    }

    pub fn ecs_client(&self) -> Option<Arc<dyn EcsCredentialsClient>> {
        self.ecs.clone()
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.clone())
    }
}
