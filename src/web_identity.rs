/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Web identity token credential provider
//!
//! Exchanges an external identity token for role credentials. The token comes from,
//! in order: the literal value on the configured spec, the spec's token file, then
//! the ambient environment contract (`AWS_WEB_IDENTITY_TOKEN_FILE` + `AWS_ROLE_ARN`).

use crate::config::AssumeRoleWithWebIdentity;
use crate::credentials::{self, CredentialsError};
use crate::os_shim::{Env, Fs};
use crate::provider::{future, ProvideCredentials};
use crate::retry::RetryPolicy;
use crate::sts::{self, StsClient, WebIdentityRequest};
use std::path::Path;
use std::sync::Arc;

const ENV_VAR_TOKEN_FILE: &str = "AWS_WEB_IDENTITY_TOKEN_FILE";
const ENV_VAR_ROLE_ARN: &str = "AWS_ROLE_ARN";
const ENV_VAR_SESSION_NAME: &str = "AWS_ROLE_SESSION_NAME";

pub struct WebIdentityTokenCredentialsProvider {
    env: Env,
    fs: Fs,
    spec: Option<AssumeRoleWithWebIdentity>,
    sts: Option<Arc<dyn StsClient>>,
    retry: RetryPolicy,
}

impl WebIdentityTokenCredentialsProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    fn read_token(&self, path: &Path) -> Result<String, CredentialsError> {
        let bytes = self
            .fs
            .read_to_end(path)
            .map_err(|err| CredentialsError::ProviderError(err.into()))?;
        String::from_utf8(bytes).map_err(|_utf8_error| {
            CredentialsError::Unhandled("web identity token was not valid UTF-8".into())
        })
    }

    fn request(&self) -> Result<WebIdentityRequest, CredentialsError> {
        match &self.spec {
            Some(spec) => {
                let token = if let Some(token) = &spec.token {
                    token.clone()
                } else if let Some(file) = &spec.token_file {
                    self.read_token(file)?
                } else if let Ok(file) = self.env.get(ENV_VAR_TOKEN_FILE) {
                    self.read_token(file.as_ref())?
                } else {
                    return Err(CredentialsError::InvalidConfiguration(
                        "a web identity role was configured but no token was supplied".into(),
                    ));
                };
                Ok(WebIdentityRequest {
                    role_arn: spec.role_arn.clone(),
                    session_name: spec
                        .session_name
                        .clone()
                        .unwrap_or_else(|| self.ambient_session_name()),
                    token,
                })
            }
            None => {
                let token_file = self
                    .env
                    .get(ENV_VAR_TOKEN_FILE)
                    .map_err(|_| CredentialsError::CredentialsNotLoaded)?;
                let role_arn = self.env.get(ENV_VAR_ROLE_ARN).map_err(|_| {
                    CredentialsError::InvalidConfiguration(
                        format!("{} environment variable must be set", ENV_VAR_ROLE_ARN).into(),
                    )
                })?;
                Ok(WebIdentityRequest {
                    role_arn,
                    session_name: self.ambient_session_name(),
                    token: self.read_token(token_file.as_ref())?,
                })
            }
        }
    }

    fn ambient_session_name(&self) -> String {
        self.env
            .get(ENV_VAR_SESSION_NAME)
            .unwrap_or_else(|_| sts::default_session_name("aws-base-web-identity"))
    }

    async fn credentials(&self) -> credentials::Result {
        let request = self.request()?;
        let sts = self.sts.as_ref().ok_or_else(|| {
            CredentialsError::ProviderError(
                "a web identity role was configured but no STS client was supplied".into(),
            )
        })?;
        sts::assume_role_with_web_identity_retry(sts.as_ref(), &self.retry, &request).await
    }
}

impl ProvideCredentials for WebIdentityTokenCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.credentials())
    }
}

#[derive(Default)]
pub struct Builder {
    env: Env,
    fs: Fs,
    spec: Option<AssumeRoleWithWebIdentity>,
    sts: Option<Arc<dyn StsClient>>,
    retry: Option<RetryPolicy>,
}

impl Builder {
    pub fn env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    pub fn fs(mut self, fs: Fs) -> Self {
        self.fs = fs;
        self
    }

    /// Role/token instructions from configuration; when unset, only the ambient
    /// environment contract is consulted
    pub fn spec(mut self, spec: AssumeRoleWithWebIdentity) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn set_spec(&mut self, spec: Option<AssumeRoleWithWebIdentity>) -> &mut Self {
        self.spec = spec;
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

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn build(self) -> WebIdentityTokenCredentialsProvider {
        WebIdentityTokenCredentialsProvider {
            env: self.env,
            fs: self.fs,
            spec: self.spec,
            sts: self.sts,
            retry: self
                .retry
                .unwrap_or_else(|| RetryPolicy::new(Default::default())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Builder, ENV_VAR_ROLE_ARN, ENV_VAR_SESSION_NAME, ENV_VAR_TOKEN_FILE};
    use crate::config::AssumeRoleWithWebIdentity;
    use crate::credentials::{Credentials, CredentialsError};
    use crate::mock::MockSts;
    use crate::os_shim::{Env, Fs};
    use crate::provider::ProvideCredentials;
    use crate::retry::{RetryConfig, RetryPolicy};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    const ROLE_ARN: &str = "arn:aws:iam::123456789123:role/test-role";

    fn role_credentials() -> Credentials {
        Credentials::new(
            "AKIDTEST",
            "SECRETKEYTEST",
            Some("SESSIONTOKEN_TEST".to_string()),
            Some(UNIX_EPOCH + Duration::from_secs(1629147173)),
            "Sts",
        )
    }

    fn sts_returning_role_creds() -> Arc<MockSts> {
        Arc::new(MockSts::default().with_web_identity_results(vec![Ok(role_credentials())]))
    }

    fn zero_backoff() -> RetryPolicy {
        RetryPolicy::new(RetryConfig::standard().with_static_base(|| 0.0))
    }

    #[tokio::test]
    async fn ambient_environment_contract() {
        let sts = sts_returning_role_creds();
        let provider = Builder::default()
            .env(Env::from_slice(&[
                (ENV_VAR_TOKEN_FILE, "/token.jwt"),
                (ENV_VAR_ROLE_ARN, ROLE_ARN),
                (ENV_VAR_SESSION_NAME, "test-session"),
            ]))
            .fs(Fs::from_slice(&[("/token.jwt", "jwt-token-contents")]))
            .sts_client(sts.clone())
            .retry_policy(zero_backoff())
            .build();
        let creds = provider.provide_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKIDTEST");
        assert_eq!(creds.provider_name(), "WebIdentityCredentials");

        let request = sts.web_identity_calls()[0].clone();
        assert_eq!(request.role_arn, ROLE_ARN);
        assert_eq!(request.session_name, "test-session");
        assert_eq!(request.token, "jwt-token-contents");
    }

    #[tokio::test]
    async fn literal_token_wins_over_file() {
        let sts = sts_returning_role_creds();
        let mut spec = AssumeRoleWithWebIdentity::new(ROLE_ARN);
        spec.session_name = Some("spec-session".to_string());
        spec.token = Some("literal-token".to_string());
        spec.token_file = Some(PathBuf::from("/token.jwt"));
        let provider = Builder::default()
            .env(Env::from_slice(&[]))
            .fs(Fs::from_slice(&[("/token.jwt", "file-token")]))
            .spec(spec)
            .sts_client(sts.clone())
            .retry_policy(zero_backoff())
            .build();
        provider.provide_credentials().await.unwrap();
        assert_eq!(sts.web_identity_calls()[0].token, "literal-token");
    }

    #[tokio::test]
    async fn token_file_from_spec() {
        let sts = sts_returning_role_creds();
        let mut spec = AssumeRoleWithWebIdentity::new(ROLE_ARN);
        spec.session_name = Some("spec-session".to_string());
        spec.token_file = Some(PathBuf::from("/token.jwt"));
        let provider = Builder::default()
            .env(Env::from_slice(&[]))
            .fs(Fs::from_slice(&[("/token.jwt", "file-token")]))
            .spec(spec)
            .sts_client(sts.clone())
            .retry_policy(zero_backoff())
            .build();
        provider.provide_credentials().await.unwrap();
        assert_eq!(sts.web_identity_calls()[0].token, "file-token");
    }

    #[tokio::test]
    async fn unloaded_without_configuration() {
        let provider = Builder::default().env(Env::from_slice(&[])).build();
        let err = provider
            .provide_credentials()
            .await
            .expect_err("provider not configured");
        assert!(err.is_credentials_not_loaded());
    }

    #[tokio::test]
    async fn missing_role_arn_is_invalid() {
        let provider = Builder::default()
            .env(Env::from_slice(&[(ENV_VAR_TOKEN_FILE, "/token.jwt")]))
            .fs(Fs::from_slice(&[("/token.jwt", "token")]))
            .build();
        let err = provider
            .provide_credentials()
            .await
            .expect_err("role arn missing");
        assert!(err.is_invalid_configuration());
        assert!(format!("{}", err).contains(ENV_VAR_ROLE_ARN));
    }

    #[tokio::test]
    async fn missing_token_file_is_a_provider_error() {
        let provider = Builder::default()
            .env(Env::from_slice(&[
                (ENV_VAR_TOKEN_FILE, "/token.jwt"),
                (ENV_VAR_ROLE_ARN, ROLE_ARN),
            ]))
            .fs(Fs::from_slice(&[]))
            .build();
        let err = provider
            .provide_credentials()
            .await
            .expect_err("no token file");
        match err {
            CredentialsError::ProviderError(_) => {}
            other => panic!("unexpected error variant: {}", other),
        }
    }
}
