/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! User agent assembly
//!
//! The user agent identifies this library, the toolchain and the platform, and lets
//! callers prepend their own product identifiers. An environment-supplied suffix
//! (`AWS_APPEND_USER_AGENT`) is appended verbatim.

use crate::build_metadata::{OsFamily, BUILD_METADATA};
use crate::os_shim::Env;
use http::header::{HeaderValue, InvalidHeaderValue};
use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

pub(crate) const APPEND_USER_AGENT_ENV_VAR: &str = "AWS_APPEND_USER_AGENT";

/// A product entry prepended to the user agent, e.g. `terraform/1.5.0`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserAgentProduct {
    name: Cow<'static, str>,
    version: Cow<'static, str>,
    comment: Option<Cow<'static, str>>,
}

impl UserAgentProduct {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        version: impl Into<Cow<'static, str>>,
    ) -> Self {
        UserAgentProduct {
            name: name.into(),
            version: version.into(),
            comment: None,
        }
    }

    /// Attach a parenthesized comment, e.g. a project URL
    pub fn with_comment(mut self, comment: impl Into<Cow<'static, str>>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl Display for UserAgentProduct {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let Some(comment) = &self.comment {
            write!(f, " ({})", comment)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct SdkMetadata {
    name: &'static str,
    version: &'static str,
}

impl Display for SdkMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

#[derive(Clone, Copy, Debug)]
struct OsMetadata {
    os_family: OsFamily,
}

impl Display for OsMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "os/{}", self.os_family.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
struct LanguageMetadata {
    lang: &'static str,
    version: &'static str,
}

impl Display for LanguageMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "lang/{}/{}", self.lang, self.version)
    }
}

/// The assembled user agent for all calls made with the resolved configuration
///
/// Format: configured products, the library identifier, normalized OS, language
/// runtime, target metadata pairs, then the appended suffix:
///
/// `myapp/1.2 aws-base/0.1.0 os/linux lang/rust/1.54.0 md/os/linux md/arch/x86_64 suffix`
#[derive(Clone, Debug)]
pub struct AwsUserAgent {
    products: Vec<UserAgentProduct>,
    sdk_metadata: SdkMetadata,
    os_metadata: OsMetadata,
    language_metadata: LanguageMetadata,
    target_os: &'static str,
    target_arch: &'static str,
    append: Option<String>,
}

impl AwsUserAgent {
    /// Build a user agent from the build metadata and the given environment
    pub fn new_from_environment(env: &Env, products: Vec<UserAgentProduct>) -> Self {
        AwsUserAgent {
            products,
            sdk_metadata: SdkMetadata {
                name: "aws-base",
                version: BUILD_METADATA.core_pkg_version,
            },
            os_metadata: OsMetadata {
                os_family: BUILD_METADATA.os_family,
            },
            language_metadata: LanguageMetadata {
                lang: "rust",
                version: BUILD_METADATA.rust_version,
            },
            target_os: std::env::consts::OS,
            target_arch: std::env::consts::ARCH,
            append: env.get(APPEND_USER_AGENT_ENV_VAR).ok(),
        }
    }

    /// An environment-independent user agent, so tests don't vary by platform
    pub fn for_tests() -> Self {
        AwsUserAgent {
            products: Vec::new(),
            sdk_metadata: SdkMetadata {
                name: "aws-base",
                version: "0.123.test",
            },
            os_metadata: OsMetadata {
                os_family: OsFamily::Linux,
            },
            language_metadata: LanguageMetadata {
                lang: "rust",
                version: "1.50.0",
            },
            target_os: "linux",
            target_arch: "x86_64",
            append: None,
        }
    }

    /// Render the `User-Agent` header value
    pub fn ua_header(&self) -> String {
        use std::fmt::Write;
        let mut value = String::new();
        // write! to a String cannot fail
        for product in &self.products {
            write!(value, "{} ", product).unwrap();
        }
        write!(value, "{} ", self.sdk_metadata).unwrap();
        write!(value, "{} ", self.os_metadata).unwrap();
        write!(value, "{} ", self.language_metadata).unwrap();
        write!(value, "md/os/{} ", self.target_os).unwrap();
        write!(value, "md/arch/{}", self.target_arch).unwrap();
        if let Some(append) = &self.append {
            write!(value, " {}", append).unwrap();
        }
        value
    }

    /// The user agent as a validated HTTP header value
    pub fn header_value(&self) -> Result<HeaderValue, UserAgentError> {
        HeaderValue::try_from(self.ua_header()).map_err(UserAgentError::InvalidHeader)
    }
}

#[derive(Debug, Error)]
pub enum UserAgentError {
    #[error("user agent is not a valid HTTP header value: {0}")]
    InvalidHeader(#[source] InvalidHeaderValue),
}
