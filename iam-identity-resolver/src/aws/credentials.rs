//! Role-assumption credential provider
//!
//! Every call loads the base credential chain for the configured profile and
//! exchanges it through STS for credentials of the identity role in the
//! principal's account. Nothing is cached between calls.

use std::time::SystemTime;

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use aws_sdk_iam::Client as IamClient;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;
use log::debug;

use crate::aws::sts::caller_identity;
use crate::config::ResolverConfig;
use crate::error::{CredentialError, ResolveResult};
use crate::types::{CallerIdentity, Identity};

const SESSION_NAME: &str = "iam-identity-resolver";
const CREDENTIALS_PROVIDER_NAME: &str = "IdentityAssumeRole";

/// Short-lived credentials for one role in one account.
///
/// A session is handed to a single fetch operation and dropped afterwards.
#[derive(Debug, Clone)]
pub struct RoleSession {
    base: SdkConfig,
    credentials: Credentials,
}

impl RoleSession {
    /// IAM client signing with this session's credentials
    pub fn iam_client(&self) -> IamClient {
        let config = aws_sdk_iam::config::Builder::from(&self.base)
            .credentials_provider(self.credentials.clone())
            .build();
        IamClient::from_conf(config)
    }
}

/// Produces [`RoleSession`]s for the role named in [`ResolverConfig`].
#[derive(Debug, Clone)]
pub struct RoleAssumer {
    config: ResolverConfig,
}

impl RoleAssumer {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Load the base AWS configuration for the configured profile.
    pub async fn load_base_config(&self) -> SdkConfig {
        let region = RegionProviderChain::default_provider()
            .or_else(aws_config::Region::new(self.config.region_fallback.clone()));

        aws_config::defaults(BehaviorVersion::latest())
            .profile_name(&self.config.profile)
            .region(region)
            .load()
            .await
    }

    /// Who the base credentials belong to, via STS GetCallerIdentity.
    pub async fn caller_identity(&self) -> ResolveResult<CallerIdentity> {
        let base = self.load_base_config().await;
        caller_identity(&StsClient::new(&base)).await
    }

    /// Assume the identity role in `identity`'s account.
    pub async fn assume_role_for(&self, identity: &Identity) -> Result<RoleSession, CredentialError> {
        let role_arn = self.config.role_arn(identity.account());
        let base = self.load_base_config().await;

        ensure_base_credentials(&base, &self.config.profile).await?;

        debug!("Assuming {} for {}", role_arn, identity.name());

        let output = StsClient::new(&base)
            .assume_role()
            .role_arn(&role_arn)
            .role_session_name(SESSION_NAME)
            .send()
            .await
            .map_err(|e| CredentialError::AssumeRole {
                role_arn: role_arn.clone(),
                source: Box::new(e),
            })?;

        let assumed = output
            .credentials()
            .ok_or_else(|| CredentialError::AssumeRole {
                role_arn: role_arn.clone(),
                source: "STS AssumeRole returned no credentials".into(),
            })?;

        let credentials = Credentials::new(
            assumed.access_key_id(),
            assumed.secret_access_key(),
            Some(assumed.session_token().to_string()),
            SystemTime::try_from(*assumed.expiration()).ok(),
            CREDENTIALS_PROVIDER_NAME,
        );

        Ok(RoleSession {
            base,
            credentials,
        })
    }
}

/// Check that `base` can produce credentials before they are exchanged through STS.
async fn ensure_base_credentials(base: &SdkConfig, profile: &str) -> Result<(), CredentialError> {
    let provider = base.credentials_provider().ok_or_else(|| {
        CredentialError::ConfigLoad(format!(
            "no credential provider available for profile '{profile}'"
        ))
    })?;
    provider
        .provide_credentials()
        .await
        .map_err(|e| CredentialError::ConfigLoad(DisplayErrorContext(&e).to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::provider::error::CredentialsError;
    use aws_credential_types::provider::{future, SharedCredentialsProvider};

    #[derive(Debug)]
    struct ExpiredProvider;

    impl ProvideCredentials for ExpiredProvider {
        fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
        where
            Self: 'a,
        {
            future::ProvideCredentials::ready(Err(CredentialsError::not_loaded(
                "profile has no credentials",
            )))
        }
    }

    #[tokio::test]
    async fn test_missing_provider_is_config_load() {
        let base = SdkConfig::builder().build();
        match ensure_base_credentials(&base, "basic").await {
            Err(CredentialError::ConfigLoad(reason)) => assert!(reason.contains("'basic'")),
            other => panic!("expected ConfigLoad, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failing_provider_is_config_load() {
        let base = SdkConfig::builder()
            .credentials_provider(SharedCredentialsProvider::new(ExpiredProvider))
            .build();
        assert!(matches!(
            ensure_base_credentials(&base, "basic").await,
            Err(CredentialError::ConfigLoad(_))
        ));
    }

    #[tokio::test]
    async fn test_static_credentials_pass_the_check() {
        let base = SdkConfig::builder()
            .credentials_provider(SharedCredentialsProvider::new(Credentials::new(
                "AKIDEXAMPLE",
                "secret",
                None,
                None,
                "static",
            )))
            .build();
        assert!(ensure_base_credentials(&base, "basic").await.is_ok());
    }
}
