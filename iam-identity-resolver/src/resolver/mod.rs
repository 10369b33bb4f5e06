//! Identity resolution: classify a caller ARN, then aggregate every policy
//! that applies to the principal.
//!
//! Aggregation is all-or-nothing. Policies are collected into a local list and
//! only attached to the returned [`Identity`] once every fetch and parse has
//! succeeded; any failure discards the partial result.

mod context;

pub use context::ResolveContext;

use futures::future::try_join_all;
use log::{debug, info};

use crate::aws::credentials::RoleAssumer;
use crate::aws::iam_client::PolicyFetchClient;
use crate::aws::principal::classify_principal;
use crate::error::{FetchError, Operation, ResolveError, ResolveResult};
use crate::parsing::parse_policy;
use crate::types::{Identity, Policy, PolicySource, PrincipalKind};

/// Drives a [`PolicyFetchClient`] to build the full policy set of a principal.
#[derive(Debug, Clone)]
pub struct IdentityResolver<C> {
    client: C,
}

impl<C: PolicyFetchClient> IdentityResolver<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Resolve the principal behind `caller_arn` in `account`.
    pub async fn resolve(
        &self,
        ctx: &ResolveContext,
        caller_arn: &str,
        account: &str,
    ) -> ResolveResult<Identity> {
        let principal = classify_principal(caller_arn)?;
        debug!(
            "Classified {} as {} '{}'",
            caller_arn, principal.kind, principal.name
        );

        let mut identity = Identity::new(principal.name, account, principal.kind);
        let policies = self.aggregate(ctx, &identity).await?;
        identity.append_policies(policies);

        info!("Resolved {}", identity);
        Ok(identity)
    }

    /// Look up the principal behind the base credentials of `roles` and resolve it.
    pub async fn resolve_caller(
        &self,
        ctx: &ResolveContext,
        roles: &RoleAssumer,
    ) -> ResolveResult<Identity> {
        let caller = ctx.guard(roles.caller_identity()).await?;
        self.resolve(ctx, &caller.arn, &caller.account).await
    }

    async fn aggregate(&self, ctx: &ResolveContext, identity: &Identity) -> ResolveResult<Vec<Policy>> {
        match identity.kind() {
            PrincipalKind::User => {
                let mut policies = self.collect_direct(ctx, identity).await?;
                policies.extend(self.collect_group_policies(ctx, identity).await?);
                Ok(policies)
            }
            PrincipalKind::Group | PrincipalKind::Role => self.collect_direct(ctx, identity).await,
        }
    }

    /// Policies embedded in or attached to `identity` itself, in its kind's source order.
    async fn collect_direct(
        &self,
        ctx: &ResolveContext,
        identity: &Identity,
    ) -> ResolveResult<Vec<Policy>> {
        let mut policies = Vec::new();
        for source in identity.kind().direct_sources() {
            let collected = match source {
                PolicySource::Inline => self.collect_inline(ctx, identity).await?,
                PolicySource::Attached => self.collect_attached(ctx, identity).await?,
            };
            policies.extend(collected);
        }
        Ok(policies)
    }

    async fn collect_inline(
        &self,
        ctx: &ResolveContext,
        identity: &Identity,
    ) -> ResolveResult<Vec<Policy>> {
        let names = ctx
            .guard(async {
                self.client
                    .fetch_inline_policy_names(identity)
                    .await
                    .map_err(|source| fetch_error(Operation::ListInlinePolicies, identity, source))
            })
            .await?;

        let mut policies = Vec::with_capacity(names.len());
        for name in &names {
            let raw = ctx
                .guard(async {
                    self.client
                        .fetch_inline_policy_document(identity, name)
                        .await
                        .map_err(|source| fetch_error(Operation::GetInlinePolicy, identity, source))
                })
                .await?;
            policies.push(parse_fetched(name, identity, &raw)?);
        }
        Ok(policies)
    }

    async fn collect_attached(
        &self,
        ctx: &ResolveContext,
        identity: &Identity,
    ) -> ResolveResult<Vec<Policy>> {
        let attached = ctx
            .guard(async {
                self.client
                    .fetch_attached_policies(identity)
                    .await
                    .map_err(|source| {
                        fetch_error(Operation::ListAttachedPolicies, identity, source)
                    })
            })
            .await?;

        let mut policies = Vec::with_capacity(attached.len());
        for reference in &attached {
            let raw = ctx
                .guard(async {
                    self.client
                        .fetch_managed_policy_document(&reference.arn, identity)
                        .await
                        .map_err(|source| fetch_error(Operation::GetManagedPolicy, identity, source))
                })
                .await?;
            policies.push(parse_fetched(&reference.arn, identity, &raw)?);
        }
        Ok(policies)
    }

    /// Direct policies of every group `user` belongs to, concatenated in membership order.
    async fn collect_group_policies(
        &self,
        ctx: &ResolveContext,
        user: &Identity,
    ) -> ResolveResult<Vec<Policy>> {
        let groups = ctx
            .guard(async {
                self.client
                    .fetch_group_memberships(user)
                    .await
                    .map_err(|source| fetch_error(Operation::ListGroupsForUser, user, source))
            })
            .await?;
        debug!("User {} is a member of {} groups", user.name(), groups.len());

        let per_group =
            try_join_all(groups.iter().map(|group| self.collect_direct(ctx, group))).await?;
        Ok(per_group.into_iter().flatten().collect())
    }
}

fn principal_label(identity: &Identity) -> String {
    format!("{}/{}", identity.kind(), identity.name())
}

fn fetch_error(
    operation: Operation,
    identity: &Identity,
    source: FetchError,
) -> ResolveError {
    ResolveError::Fetch {
        operation,
        principal: principal_label(identity),
        source,
    }
}

fn parse_fetched(policy: &str, identity: &Identity, raw: &str) -> ResolveResult<Policy> {
    parse_policy(raw).map_err(|source| ResolveError::Parse {
        policy: policy.to_string(),
        principal: principal_label(identity),
        source,
    })
}
