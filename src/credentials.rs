/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! AWS credentials and the errors produced while resolving them

use std::borrow::Cow;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::time::SystemTime;

/// Name reported by credentials supplied directly in configuration
pub const STATIC_CREDENTIALS_NAME: &str = "StaticCredentials";

pub(crate) type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// An immutable set of AWS credentials
///
/// A fresh set is produced by a provider on every retrieval; credentials are replaced
/// when they expire, never mutated in place.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expiry: Option<SystemTime>,
    provider_name: Cow<'static, str>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("provider_name", &self.provider_name)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expiry: Option<SystemTime>,
        provider_name: impl Into<Cow<'static, str>>,
    ) -> Self {
        Credentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiry,
            provider_name: provider_name.into(),
        }
    }

    /// Credentials from a statically configured key pair
    ///
    /// ```rust
    /// use aws_base::Credentials;
    /// let creds = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
    /// assert_eq!(creds.access_key_id(), "AKIDEXAMPLE");
    /// assert!(creds.session_token().is_none());
    /// ```
    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            None,
            STATIC_CREDENTIALS_NAME,
        )
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expiry(&self) -> Option<SystemTime> {
        self.expiry
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// A copy of these credentials attributed to a different provider
    pub(crate) fn with_provider_name(self, provider_name: impl Into<Cow<'static, str>>) -> Self {
        Credentials {
            provider_name: provider_name.into(),
            ..self
        }
    }

    /// A copy of these credentials with an expiry backfilled
    pub(crate) fn with_expiry(self, expiry: SystemTime) -> Self {
        Credentials {
            expiry: Some(expiry),
            ..self
        }
    }
}

/// Error produced while resolving or retrieving credentials
///
/// Callers should match on the variant or use the `is_*` predicates rather than
/// inspecting rendered messages.
#[derive(Debug)]
#[non_exhaustive]
pub enum CredentialsError {
    /// This provider was not applicable; the next provider in the chain may be tried.
    CredentialsNotLoaded,

    /// No candidate provider was applicable, or every candidate fell through.
    NoValidCredentialSources,

    /// The provider was given an invalid configuration
    ///
    /// For example:
    /// - a syntax error in `~/.aws/config`
    /// - an assume role profile that forms an infinite loop
    InvalidConfiguration(BoxError),

    /// STS rejected a role-assumption request
    CannotAssumeRole { role_arn: String, source: BoxError },

    /// The resolved credentials failed the identity check
    ValidationFailed(BoxError),

    /// The provider experienced an error during credential resolution
    ///
    /// This may include errors like a 503 from STS or a file system error when
    /// attempting to read a token file.
    ProviderError(BoxError),

    /// An unexpected error occurred during credential resolution
    Unhandled(BoxError),
}

impl CredentialsError {
    pub fn is_credentials_not_loaded(&self) -> bool {
        matches!(self, CredentialsError::CredentialsNotLoaded)
    }

    pub fn is_no_valid_credential_sources(&self) -> bool {
        matches!(self, CredentialsError::NoValidCredentialSources)
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, CredentialsError::InvalidConfiguration(_))
    }

    pub fn is_cannot_assume_role(&self) -> bool {
        matches!(self, CredentialsError::CannotAssumeRole { .. })
    }

    pub fn is_validation_failed(&self) -> bool {
        matches!(self, CredentialsError::ValidationFailed(_))
    }
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::CredentialsNotLoaded => write!(
                f,
                "the provider could not provide credentials or required configuration was not set"
            ),
            CredentialsError::NoValidCredentialSources => {
                write!(f, "no valid credential sources found")
            }
            CredentialsError::InvalidConfiguration(err) => {
                write!(f, "the credential provider was not properly configured: {}", err)
            }
            CredentialsError::CannotAssumeRole { role_arn, source } => {
                write!(f, "cannot assume IAM role {}: {}", role_arn, source)
            }
            CredentialsError::ValidationFailed(err) => {
                write!(f, "credential validation failed: {}", err)
            }
            CredentialsError::ProviderError(err) => {
                write!(f, "an error occurred while loading credentials: {}", err)
            }
            CredentialsError::Unhandled(err) => {
                write!(f, "unexpected credentials error: {}", err)
            }
        }
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CredentialsError::InvalidConfiguration(err)
            | CredentialsError::ValidationFailed(err)
            | CredentialsError::ProviderError(err)
            | CredentialsError::Unhandled(err) => Some(err.as_ref() as _),
            CredentialsError::CannotAssumeRole { source, .. } => Some(source.as_ref() as _),
            _ => None,
        }
    }
}

pub type Result = std::result::Result<Credentials, CredentialsError>;
