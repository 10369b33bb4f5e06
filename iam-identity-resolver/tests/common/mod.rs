//! In-memory IAM backend shared by the integration tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use iam_identity_resolver::{
    AttachedPolicyRef, FetchError, FetchResult, Identity, PolicyFetchClient, PrincipalKind,
};

pub const ACCOUNT: &str = "680235478471";

/// Policy document with a single statement whose Sid identifies it
pub fn document(sid: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": {"Sid": sid, "Effect": "Allow", "Action": "s3:GetObject", "Resource": "*"},
    })
    .to_string()
}

/// Sids of every first statement, in policy order
pub fn sids(identity: &Identity) -> Vec<String> {
    identity
        .policies()
        .iter()
        .map(|p| p.statements[0].sid.clone())
        .collect()
}

type PrincipalKey = (PrincipalKind, String);

#[derive(Default)]
pub struct MockIam {
    inline: HashMap<PrincipalKey, Vec<(String, String)>>,
    attached: HashMap<PrincipalKey, Vec<AttachedPolicyRef>>,
    managed: HashMap<String, String>,
    groups: HashMap<String, Vec<String>>,
    unavailable: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockIam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inline(mut self, kind: PrincipalKind, principal: &str, name: &str, doc: String) -> Self {
        self.inline
            .entry((kind, principal.to_string()))
            .or_default()
            .push((name.to_string(), doc));
        self
    }

    pub fn with_attached(mut self, kind: PrincipalKind, principal: &str, arn: &str, doc: String) -> Self {
        self.attached
            .entry((kind, principal.to_string()))
            .or_default()
            .push(AttachedPolicyRef {
                name: arn.rsplit('/').next().unwrap_or(arn).to_string(),
                arn: arn.to_string(),
            });
        self.managed.insert(arn.to_string(), doc);
        self
    }

    pub fn with_membership(mut self, user: &str, group: &str) -> Self {
        self.groups
            .entry(user.to_string())
            .or_default()
            .push(group.to_string());
        self
    }

    /// Make every fetch of this managed policy fail with a service error
    pub fn with_unavailable(mut self, arn: &str) -> Self {
        self.unavailable.insert(arn.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn key(identity: &Identity) -> PrincipalKey {
        (identity.kind(), identity.name().to_string())
    }
}

#[async_trait]
impl PolicyFetchClient for MockIam {
    async fn fetch_inline_policy_names(&self, identity: &Identity) -> FetchResult<Vec<String>> {
        self.record(format!("list-inline {}", identity.name()));
        Ok(self
            .inline
            .get(&Self::key(identity))
            .map(|policies| policies.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default())
    }

    async fn fetch_attached_policies(
        &self,
        identity: &Identity,
    ) -> FetchResult<Vec<AttachedPolicyRef>> {
        self.record(format!("list-attached {}", identity.name()));
        Ok(self
            .attached
            .get(&Self::key(identity))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_inline_policy_document(
        &self,
        identity: &Identity,
        policy_name: &str,
    ) -> FetchResult<String> {
        self.record(format!("get-inline {} {}", identity.name(), policy_name));
        self.inline
            .get(&Self::key(identity))
            .and_then(|policies| policies.iter().find(|(name, _)| name == policy_name))
            .map(|(_, doc)| doc.clone())
            .ok_or_else(|| FetchError::NotFound {
                entity: format!("policy {policy_name}"),
                message: "The policy does not exist.".to_string(),
            })
    }

    async fn fetch_managed_policy_document(
        &self,
        policy_arn: &str,
        _identity: &Identity,
    ) -> FetchResult<String> {
        self.record(format!("get-managed {policy_arn}"));
        if self.unavailable.contains(policy_arn) {
            return Err(FetchError::Service("ServiceFailure".to_string()));
        }
        self.managed
            .get(policy_arn)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                entity: policy_arn.to_string(),
                message: "Policy was not found.".to_string(),
            })
    }

    async fn fetch_group_memberships(&self, identity: &Identity) -> FetchResult<Vec<Identity>> {
        self.record(format!("list-groups {}", identity.name()));
        if identity.kind() != PrincipalKind::User {
            return Err(FetchError::UnsupportedPrincipal(identity.kind()));
        }
        Ok(self
            .groups
            .get(identity.name())
            .map(|groups| {
                groups
                    .iter()
                    .map(|group| identity.group_in_same_account(group.as_str()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
