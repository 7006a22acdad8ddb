/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Abstract representation of the provider chain described by a profile
//!
//! Before any credentials are loaded, the selected profile is resolved into a
//! validated [`ProfileChain`]: a base provider (static keys or a named ambient
//! source) plus the ordered role assumptions layered on top of it. Resolution
//! happens eagerly so that configuration mistakes (dangling `source_profile`,
//! cycles) surface before any network call is made.

use crate::profile::parser::ProfileSet;
use crate::profile::ProfileFileError;

const ROLE_ARN: &str = "role_arn";
const SOURCE_PROFILE: &str = "source_profile";
const CREDENTIAL_SOURCE: &str = "credential_source";
const EXTERNAL_ID: &str = "external_id";
const ROLE_SESSION_NAME: &str = "role_session_name";
const ACCESS_KEY_ID: &str = "aws_access_key_id";
const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
const SESSION_TOKEN: &str = "aws_session_token";

/// Where the innermost credentials of a profile chain come from
#[derive(Debug, Eq, PartialEq)]
pub(super) enum BaseProvider {
    ProfileKeys {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// A `credential_source` directive naming an ambient provider
    /// (`Environment`, `Ec2InstanceMetadata`, `EcsContainer`, or custom)
    NamedSource(String),
}

/// One role assumption within a profile chain
#[derive(Debug, Eq, PartialEq)]
pub(super) struct RoleChainStep {
    pub(super) role_arn: String,
    pub(super) external_id: Option<String>,
    pub(super) session_name: Option<String>,
}

/// A fully resolved profile: base credentials plus role assumptions, innermost first
#[derive(Debug, Eq, PartialEq)]
pub(super) struct ProfileChain {
    pub(super) base: BaseProvider,
    pub(super) chain: Vec<RoleChainStep>,
}

/// Resolve the chain rooted at `profile_name`
///
/// `profile_overridden` distinguishes "the user asked for this profile" (a missing
/// profile is then a configuration error) from "we looked for `default`" (a missing
/// profile just means this source has nothing to offer).
pub(super) fn resolve_chain(
    profile_set: &ProfileSet,
    profile_name: &str,
    profile_overridden: bool,
) -> Result<ProfileChain, ProfileFileError> {
    if profile_set.is_empty() {
        return Err(ProfileFileError::NoProfilesDefined);
    }
    let mut visited: Vec<String> = vec![];
    let mut roles: Vec<RoleChainStep> = vec![];
    let mut name = profile_name;
    let base = loop {
        let profile = match profile_set.get_profile(name) {
            Some(profile) => profile,
            None if visited.is_empty() && !profile_overridden => {
                return Err(ProfileFileError::NoProfilesDefined)
            }
            None => {
                return Err(ProfileFileError::MissingProfile {
                    profile: name.to_string(),
                    message: if visited.is_empty() {
                        "the selected profile was not defined".into()
                    } else {
                        "a source_profile referenced a profile that was not defined".into()
                    },
                })
            }
        };
        visited.push(name.to_string());
        let static_keys = (profile.get(ACCESS_KEY_ID), profile.get(SECRET_ACCESS_KEY));
        if let Some(role_arn) = profile.get(ROLE_ARN) {
            roles.push(RoleChainStep {
                role_arn: role_arn.to_string(),
                external_id: profile.get(EXTERNAL_ID).map(ToString::to_string),
                session_name: profile.get(ROLE_SESSION_NAME).map(ToString::to_string),
            });
            match (profile.get(SOURCE_PROFILE), profile.get(CREDENTIAL_SOURCE)) {
                (Some(_), Some(_)) => {
                    return Err(ProfileFileError::InvalidCredentialSource {
                        profile: name.to_string(),
                        message: "both source_profile and credential_source were set".into(),
                    })
                }
                (None, Some(credential_source)) => {
                    break BaseProvider::NamedSource(credential_source.to_string())
                }
                (Some(source_profile), None) => {
                    if visited.iter().any(|seen| seen == source_profile) {
                        return Err(ProfileFileError::CredentialLoop {
                            profiles: visited,
                            next: source_profile.to_string(),
                        });
                    }
                    name = source_profile;
                }
                (None, None) => match static_keys {
                    (Some(access_key_id), Some(secret_access_key)) => {
                        break BaseProvider::ProfileKeys {
                            access_key_id: access_key_id.to_string(),
                            secret_access_key: secret_access_key.to_string(),
                            session_token: profile.get(SESSION_TOKEN).map(ToString::to_string),
                        }
                    }
                    _ => {
                        return Err(ProfileFileError::MissingCredentialSource {
                            profile: name.to_string(),
                            message: "a role_arn requires source_profile, credential_source, \
                                      or credentials in the same profile"
                                .into(),
                        })
                    }
                },
            }
        } else {
            if profile.get(SOURCE_PROFILE).is_some() || profile.get(CREDENTIAL_SOURCE).is_some() {
                return Err(ProfileFileError::MissingCredentialSource {
                    profile: name.to_string(),
                    message: "source_profile and credential_source require role_arn".into(),
                });
            }
            match static_keys {
                (Some(access_key_id), Some(secret_access_key)) => {
                    break BaseProvider::ProfileKeys {
                        access_key_id: access_key_id.to_string(),
                        secret_access_key: secret_access_key.to_string(),
                        session_token: profile.get(SESSION_TOKEN).map(ToString::to_string),
                    }
                }
                (None, None) if visited.len() == 1 => {
                    // a profile carrying only settings like `region` is not an error;
                    // this source simply has nothing to offer
                    return Err(ProfileFileError::NoProfilesDefined);
                }
                _ => {
                    return Err(ProfileFileError::MissingCredentialSource {
                        profile: name.to_string(),
                        message: "profile must contain aws_access_key_id and aws_secret_access_key"
                            .into(),
                    })
                }
            }
        }
    };
    // roles were collected from the outside in; execution applies them onto the base
    roles.reverse();
    Ok(ProfileChain { base, chain: roles })
}
