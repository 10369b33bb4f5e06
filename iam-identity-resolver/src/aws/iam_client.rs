//! IAM read operations used to collect a principal's policies
//!
//! [`PolicyFetchClient`] is the seam the resolver aggregates through;
//! [`AwsPolicyFetchClient`] implements it against the IAM API with a fresh
//! role session per operation.

use std::error::Error as StdError;
use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_iam::Client as IamClient;
use log::{debug, error};

use crate::aws::credentials::RoleAssumer;
use crate::config::ResolverConfig;
use crate::error::{FetchError, FetchResult};
use crate::types::{AttachedPolicyRef, Identity, PrincipalKind};

const NO_SUCH_ENTITY: &str = "NoSuchEntity";
const SERVICE_FAILURE: &str = "ServiceFailure";

/// Read operations against the identity-and-access API.
///
/// Documents are returned already percent-decoded, ready for
/// [`parse_policy`](crate::parse_policy). Implementations must not retry.
#[async_trait]
pub trait PolicyFetchClient: Send + Sync {
    /// Names of the inline policies embedded in a user, group, or role
    async fn fetch_inline_policy_names(&self, identity: &Identity) -> FetchResult<Vec<String>>;

    /// Managed policies attached to a user, group, or role
    async fn fetch_attached_policies(
        &self,
        identity: &Identity,
    ) -> FetchResult<Vec<AttachedPolicyRef>>;

    async fn fetch_inline_policy_document(
        &self,
        identity: &Identity,
        policy_name: &str,
    ) -> FetchResult<String>;

    /// Document of the default version of a managed policy
    async fn fetch_managed_policy_document(
        &self,
        policy_arn: &str,
        identity: &Identity,
    ) -> FetchResult<String>;

    /// Groups a user belongs to, as group identities in the user's account
    async fn fetch_group_memberships(&self, identity: &Identity) -> FetchResult<Vec<Identity>>;
}

/// [`PolicyFetchClient`] backed by the AWS IAM API.
#[derive(Debug, Clone)]
pub struct AwsPolicyFetchClient {
    roles: RoleAssumer,
}

impl AwsPolicyFetchClient {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            roles: RoleAssumer::new(config),
        }
    }

    pub fn role_assumer(&self) -> &RoleAssumer {
        &self.roles
    }

    async fn client_for(&self, identity: &Identity) -> FetchResult<IamClient> {
        let session = self.roles.assume_role_for(identity).await?;
        Ok(session.iam_client())
    }
}

#[async_trait]
impl PolicyFetchClient for AwsPolicyFetchClient {
    async fn fetch_inline_policy_names(&self, identity: &Identity) -> FetchResult<Vec<String>> {
        let client = self.client_for(identity).await?;
        let name = identity.name();
        debug!("Listing inline policies of {} {}", identity.kind(), name);
        let entity = principal_entity(identity);

        let names = match identity.kind() {
            PrincipalKind::User => {
                client
                    .list_user_policies()
                    .user_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("ListUserPolicies", &entity, e))?
                    .policy_names
            }
            PrincipalKind::Group => {
                client
                    .list_group_policies()
                    .group_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("ListGroupPolicies", &entity, e))?
                    .policy_names
            }
            PrincipalKind::Role => {
                client
                    .list_role_policies()
                    .role_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("ListRolePolicies", &entity, e))?
                    .policy_names
            }
        };
        Ok(names)
    }

    async fn fetch_attached_policies(
        &self,
        identity: &Identity,
    ) -> FetchResult<Vec<AttachedPolicyRef>> {
        let client = self.client_for(identity).await?;
        let name = identity.name();
        debug!("Listing attached policies of {} {}", identity.kind(), name);
        let entity = principal_entity(identity);

        let attached = match identity.kind() {
            PrincipalKind::User => {
                client
                    .list_attached_user_policies()
                    .user_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("ListAttachedUserPolicies", &entity, e))?
                    .attached_policies
            }
            PrincipalKind::Group => {
                client
                    .list_attached_group_policies()
                    .group_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("ListAttachedGroupPolicies", &entity, e))?
                    .attached_policies
            }
            PrincipalKind::Role => {
                client
                    .list_attached_role_policies()
                    .role_name(name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("ListAttachedRolePolicies", &entity, e))?
                    .attached_policies
            }
        };

        attached
            .unwrap_or_default()
            .into_iter()
            .map(|policy| -> FetchResult<AttachedPolicyRef> {
                let arn = policy.policy_arn.ok_or_else(|| {
                    FetchError::IncompleteResponse(format!(
                        "attached policy of {} {} has no ARN",
                        identity.kind(),
                        name
                    ))
                })?;
                Ok(AttachedPolicyRef {
                    name: policy.policy_name.unwrap_or_else(|| arn.clone()),
                    arn,
                })
            })
            .collect()
    }

    async fn fetch_inline_policy_document(
        &self,
        identity: &Identity,
        policy_name: &str,
    ) -> FetchResult<String> {
        let client = self.client_for(identity).await?;
        let name = identity.name();
        debug!("Fetching inline policy {} of {} {}", policy_name, identity.kind(), name);
        let entity = format!("{} policy {}", principal_entity(identity), policy_name);

        let document = match identity.kind() {
            PrincipalKind::User => {
                client
                    .get_user_policy()
                    .user_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("GetUserPolicy", &entity, e))?
                    .policy_document
            }
            PrincipalKind::Group => {
                client
                    .get_group_policy()
                    .group_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("GetGroupPolicy", &entity, e))?
                    .policy_document
            }
            PrincipalKind::Role => {
                client
                    .get_role_policy()
                    .role_name(name)
                    .policy_name(policy_name)
                    .send()
                    .await
                    .map_err(|e| sdk_failure("GetRolePolicy", &entity, e))?
                    .policy_document
            }
        };

        decode_policy_document(&document)
    }

    async fn fetch_managed_policy_document(
        &self,
        policy_arn: &str,
        identity: &Identity,
    ) -> FetchResult<String> {
        let client = self.client_for(identity).await?;
        debug!("Fetching managed policy {}", policy_arn);

        let policy = client
            .get_policy()
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| sdk_failure("GetPolicy", policy_arn, e))?
            .policy
            .ok_or_else(|| {
                FetchError::IncompleteResponse(format!("GetPolicy returned no policy for {policy_arn}"))
            })?;

        let version_id = policy.default_version_id.ok_or_else(|| {
            FetchError::IncompleteResponse(format!("policy {policy_arn} has no default version"))
        })?;

        let document = client
            .get_policy_version()
            .policy_arn(policy.arn.as_deref().unwrap_or(policy_arn))
            .version_id(&version_id)
            .send()
            .await
            .map_err(|e| sdk_failure("GetPolicyVersion", policy_arn, e))?
            .policy_version
            .and_then(|version| version.document)
            .ok_or_else(|| {
                FetchError::IncompleteResponse(format!(
                    "version {version_id} of {policy_arn} has no document"
                ))
            })?;

        decode_policy_document(&document)
    }

    async fn fetch_group_memberships(&self, identity: &Identity) -> FetchResult<Vec<Identity>> {
        if identity.kind() != PrincipalKind::User {
            return Err(FetchError::UnsupportedPrincipal(identity.kind()));
        }

        let client = self.client_for(identity).await?;
        debug!("Listing groups of user {}", identity.name());
        let entity = principal_entity(identity);

        let groups = client
            .list_groups_for_user()
            .user_name(identity.name())
            .send()
            .await
            .map_err(|e| sdk_failure("ListGroupsForUser", &entity, e))?
            .groups;

        Ok(groups
            .iter()
            .map(|group| identity.group_in_same_account(group.group_name()))
            .collect())
    }
}

/// URL decode a policy document (IAM returns URL-encoded JSON)
pub fn decode_policy_document(encoded: &str) -> FetchResult<String> {
    percent_encoding::percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| FetchError::Decode(e.to_string()))
}

fn principal_entity(identity: &Identity) -> String {
    format!("{} {}", identity.kind(), identity.name())
}

/// Map an SDK failure onto [`FetchError`]. `entity` names what the call looked up.
fn sdk_failure<E, R>(api: &str, entity: &str, err: SdkError<E, R>) -> FetchError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code());
    let message = err
        .as_service_error()
        .and_then(|e| e.message())
        .unwrap_or_default()
        .to_string();

    match code {
        Some(NO_SUCH_ENTITY) => {
            error!("{api}: iam exception NoSuchEntity {message}");
            FetchError::NotFound {
                entity: entity.to_string(),
                message,
            }
        }
        Some(SERVICE_FAILURE) => {
            error!("{api}: iam exception ServiceFailure {message}");
            FetchError::Service(format!("{api}: {message}"))
        }
        _ => {
            error!("{api} failed: {}", DisplayErrorContext(&err));
            FetchError::Service(format!("{api}: {}", DisplayErrorContext(&err)))
        }
    }
}
