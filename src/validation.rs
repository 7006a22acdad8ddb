/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Credential validation via `GetCallerIdentity`
//!
//! A lightweight identity check confirms that resolved credentials are actually
//! usable and yields the account ID and partition they belong to. Validation can be
//! skipped, in which case the partition can still be inferred from the region.

use crate::config::Region;
use crate::credentials::CredentialsError;
use crate::provider::{ProvideCredentials, SharedCredentialsProvider};
use crate::retry::RetryPolicy;
use crate::sts::{CallerIdentity, StsClient};

/// Partition embedded in an ARN: `arn:<partition>:service:...`
pub fn partition_from_arn(arn: &str) -> Option<&str> {
    let mut parts = arn.splitn(3, ':');
    match (parts.next(), parts.next()) {
        (Some("arn"), Some(partition)) if !partition.is_empty() => Some(partition),
        _ => None,
    }
}

/// Partition inferred from a region name, used when no ARN is available
pub fn partition_for_region(region: &Region) -> &'static str {
    let name = region.as_ref();
    if name.starts_with("cn-") {
        "aws-cn"
    } else if name.starts_with("us-gov-") {
        "aws-us-gov"
    } else if name.starts_with("us-iso-") {
        "aws-iso"
    } else if name.starts_with("us-isob-") {
        "aws-iso-b"
    } else {
        "aws"
    }
}

/// Exercise the resolved credentials once through `GetCallerIdentity`
///
/// A failed check surfaces as [`CredentialsError::ValidationFailed`]; it is never
/// downgraded to empty credentials.
pub async fn validate_credentials(
    provider: &SharedCredentialsProvider,
    sts: &dyn StsClient,
    retry: &RetryPolicy,
) -> Result<CallerIdentity, CredentialsError> {
    let credentials = provider.provide_credentials().await?;
    let identity = retry
        .call(|| sts.get_caller_identity(&credentials))
        .await
        .map_err(|err| CredentialsError::ValidationFailed(Box::new(err)))?;
    tracing::debug!(account_id = %identity.account_id, "validated credentials");
    Ok(identity)
}

#[cfg(test)]
mod test {
    use super::{partition_for_region, partition_from_arn, validate_credentials};
    use crate::config::Region;
    use crate::credentials::Credentials;
    use crate::mock::MockSts;
    use crate::provider::SharedCredentialsProvider;
    use crate::retry::{RetryConfig, RetryPolicy};
    use crate::sts::{CallerIdentity, StsError};

    fn zero_backoff() -> RetryPolicy {
        RetryPolicy::new(RetryConfig::standard().with_static_base(|| 0.0))
    }

    #[test]
    fn partition_parsing() {
        assert_eq!(
            partition_from_arn("arn:aws:iam::222222222222:user/Alice"),
            Some("aws")
        );
        assert_eq!(
            partition_from_arn("arn:aws-cn:iam::222222222222:user/Alice"),
            Some("aws-cn")
        );
        assert_eq!(partition_from_arn("not-an-arn"), None);
    }

    #[test]
    fn partition_by_region_prefix() {
        assert_eq!(partition_for_region(&Region::from_static("us-east-1")), "aws");
        assert_eq!(
            partition_for_region(&Region::from_static("cn-north-1")),
            "aws-cn"
        );
        assert_eq!(
            partition_for_region(&Region::from_static("us-gov-west-1")),
            "aws-us-gov"
        );
    }

    #[tokio::test]
    async fn validation_returns_identity() {
        let sts = MockSts::default().with_caller_identity_results(vec![Ok(CallerIdentity {
            account_id: "222222222222".to_string(),
            arn: "arn:aws:iam::222222222222:user/Alice".to_string(),
            user_id: "AIDAEXAMPLE".to_string(),
        })]);
        let provider =
            SharedCredentialsProvider::new(Credentials::from_keys("akid", "secret", None));
        let identity = validate_credentials(&provider, &sts, &zero_backoff())
            .await
            .unwrap();
        assert_eq!(identity.account_id, "222222222222");
    }

    #[tokio::test]
    async fn failed_validation_surfaces() {
        let sts = MockSts::default().with_caller_identity_results(vec![Err(StsError::service(
            "InvalidClientTokenId",
            "The security token included in the request is invalid.",
        ))]);
        let provider =
            SharedCredentialsProvider::new(Credentials::from_keys("akid", "secret", None));
        let err = validate_credentials(&provider, &sts, &zero_backoff())
            .await
            .expect_err("invalid token");
        assert!(err.is_validation_failed());
    }
}
