/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Immutable configuration snapshot consumed by the credential provider chain
//!
//! A [`Config`] is built once per top-level resolution call and read-only afterwards.
//! Exactly one credential source wins for a given snapshot: precedence between the
//! candidate sources is total-ordered, values are never merged across tiers.

use crate::user_agent::UserAgentProduct;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// An AWS region, e.g. `us-east-1`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Region(Cow<'static, str>);

impl Region {
    pub fn new(region: impl Into<Cow<'static, str>>) -> Self {
        Region(region.into())
    }

    pub const fn from_static(region: &'static str) -> Self {
        Region(Cow::Borrowed(region))
    }

    pub fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instructions to exchange resolved base credentials for role credentials
#[derive(Clone, Debug, Default)]
pub struct AssumeRole {
    pub role_arn: String,
    pub session_name: Option<String>,
    pub duration: Option<Duration>,
    pub external_id: Option<String>,
    pub policy: Option<String>,
    pub policy_arns: Vec<String>,
    pub tags: HashMap<String, String>,
    pub transitive_tag_keys: Vec<String>,
}

impl AssumeRole {
    pub fn new(role_arn: impl Into<String>) -> Self {
        AssumeRole {
            role_arn: role_arn.into(),
            ..Default::default()
        }
    }
}

/// Instructions to obtain role credentials from an external identity token
///
/// The token is sourced in order: the literal `token` value, the contents of
/// `token_file`, then the ambient web-identity environment contract.
#[derive(Clone, Debug, Default)]
pub struct AssumeRoleWithWebIdentity {
    pub role_arn: String,
    pub session_name: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
}

impl AssumeRoleWithWebIdentity {
    pub fn new(role_arn: impl Into<String>) -> Self {
        AssumeRoleWithWebIdentity {
            role_arn: role_arn.into(),
            ..Default::default()
        }
    }
}

/// Resolved configuration inputs for one credential resolution
#[derive(Clone, Debug, Default)]
pub struct Config {
    access_key: Option<String>,
    secret_key: Option<String>,
    token: Option<String>,
    profile: Option<String>,
    shared_credentials_files: Vec<PathBuf>,
    shared_config_files: Vec<PathBuf>,
    region: Option<Region>,
    sts_endpoint: Option<String>,
    assume_role: Option<AssumeRole>,
    assume_role_with_web_identity: Option<AssumeRoleWithWebIdentity>,
    max_retries: Option<u32>,
    skip_credentials_validation: bool,
    skip_metadata_api_check: bool,
    skip_requesting_account_id: bool,
    user_agent_products: Vec<UserAgentProduct>,
}

impl Config {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn access_key(&self) -> Option<&str> {
        self.access_key.as_deref()
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn shared_credentials_files(&self) -> &[PathBuf] {
        &self.shared_credentials_files
    }

    pub fn shared_config_files(&self) -> &[PathBuf] {
        &self.shared_config_files
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    /// Custom STS endpoint, passed through to the STS collaborator
    pub fn sts_endpoint(&self) -> Option<&str> {
        self.sts_endpoint.as_deref()
    }

    pub fn assume_role(&self) -> Option<&AssumeRole> {
        self.assume_role.as_ref()
    }

    pub fn assume_role_with_web_identity(&self) -> Option<&AssumeRoleWithWebIdentity> {
        self.assume_role_with_web_identity.as_ref()
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    pub fn skip_credentials_validation(&self) -> bool {
        self.skip_credentials_validation
    }

    pub fn skip_metadata_api_check(&self) -> bool {
        self.skip_metadata_api_check
    }

    pub fn skip_requesting_account_id(&self) -> bool {
        self.skip_requesting_account_id
    }

    pub fn user_agent_products(&self) -> &[UserAgentProduct] {
        &self.user_agent_products
    }
}

/// Builder for [`Config`]
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    /// Statically configured credentials; highest precedence of all sources
    pub fn credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.config.access_key = Some(access_key.into());
        self.config.secret_key = Some(secret_key.into());
        self
    }

    pub fn set_access_key(&mut self, access_key: Option<String>) -> &mut Self {
        self.config.access_key = access_key;
        self
    }

    pub fn set_secret_key(&mut self, secret_key: Option<String>) -> &mut Self {
        self.config.secret_key = secret_key;
        self
    }

    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config.profile = Some(profile.into());
        self
    }

    pub fn set_profile(&mut self, profile: Option<String>) -> &mut Self {
        self.config.profile = profile;
        self
    }

    /// Explicit shared credentials file locations; overrides
    /// `AWS_SHARED_CREDENTIALS_FILE` and the default location
    pub fn shared_credentials_files(mut self, files: Vec<PathBuf>) -> Self {
        self.config.shared_credentials_files = files;
        self
    }

    /// Explicit shared config file locations; overrides `AWS_CONFIG_FILE` and the
    /// default location
    pub fn shared_config_files(mut self, files: Vec<PathBuf>) -> Self {
        self.config.shared_config_files = files;
        self
    }

    pub fn region(mut self, region: impl Into<Option<Region>>) -> Self {
        self.config.region = region.into();
        self
    }

    pub fn sts_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.sts_endpoint = Some(endpoint.into());
        self
    }

    pub fn assume_role(mut self, assume_role: AssumeRole) -> Self {
        self.config.assume_role = Some(assume_role);
        self
    }

    pub fn assume_role_with_web_identity(mut self, spec: AssumeRoleWithWebIdentity) -> Self {
        self.config.assume_role_with_web_identity = Some(spec);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = Some(max_retries);
        self
    }

    pub fn skip_credentials_validation(mut self, skip: bool) -> Self {
        self.config.skip_credentials_validation = skip;
        self
    }

    pub fn skip_metadata_api_check(mut self, skip: bool) -> Self {
        self.config.skip_metadata_api_check = skip;
        self
    }

    pub fn skip_requesting_account_id(mut self, skip: bool) -> Self {
        self.config.skip_requesting_account_id = skip;
        self
    }

    pub fn user_agent_product(mut self, product: UserAgentProduct) -> Self {
        self.config.user_agent_products.push(product);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod test {
    use super::{AssumeRole, Config, Region};

    #[test]
    fn builder_produces_snapshot() {
        let config = Config::builder()
            .credentials("akid", "secret")
            .session_token("tok")
            .region(Some(Region::from_static("us-east-1")))
            .assume_role(AssumeRole::new("arn:aws:iam::123456789012:role/role"))
            .max_retries(10)
            .build();
        assert_eq!(config.access_key(), Some("akid"));
        assert_eq!(config.token(), Some("tok"));
        assert_eq!(config.region().unwrap().as_ref(), "us-east-1");
        assert_eq!(
            config.assume_role().unwrap().role_arn,
            "arn:aws:iam::123456789012:role/role"
        );
        assert_eq!(config.max_retries(), Some(10));
        assert!(!config.skip_metadata_api_check());
    }
}
