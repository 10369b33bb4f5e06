//! Core data types for resolved principals and their normalized policies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of IAM principal an identity resolves to.
///
/// There is deliberately no `Unknown` variant: an ARN that cannot be
/// classified produces [`ResolveError::Classification`](crate::ResolveError)
/// instead of a defaulted kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Group,
    Role,
}

impl PrincipalKind {
    /// Path segment that marks this kind inside an IAM ARN, e.g. `:user/`.
    pub const fn arn_marker(self) -> &'static str {
        match self {
            Self::User => ":user/",
            Self::Group => ":group/",
            Self::Role => ":role/",
        }
    }

    /// Sources of policies attached directly to a principal of this kind, in fetch order.
    ///
    /// Groups fetch attached policies before inline ones; users and roles do the opposite.
    pub const fn direct_sources(self) -> &'static [PolicySource] {
        match self {
            Self::User | Self::Role => &[PolicySource::Inline, PolicySource::Attached],
            Self::Group => &[PolicySource::Attached, PolicySource::Inline],
        }
    }

    /// Whether policies of the groups this principal belongs to count towards its own.
    pub const fn inherits_group_policies(self) -> bool {
        matches!(self, Self::User)
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Group => write!(f, "group"),
            Self::Role => write!(f, "role"),
        }
    }
}

/// Where a principal's policy comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySource {
    /// Embedded directly on the principal
    Inline,
    /// Standalone managed policy referenced by the principal
    Attached,
}

/// A resolved AWS principal together with every policy that applies to it.
///
/// `kind` is fixed at construction and `policies` only ever grows, so the
/// fields are private and exposed through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "Kind")]
    kind: PrincipalKind,
    #[serde(rename = "Policies", default)]
    policies: Vec<Policy>,
}

impl Identity {
    pub fn new(name: impl Into<String>, account: impl Into<String>, kind: PrincipalKind) -> Self {
        Self {
            name: name.into(),
            account: account.into(),
            kind,
            policies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Identity of a group in the same account, as listed for a user's memberships.
    pub fn group_in_same_account(&self, group_name: impl Into<String>) -> Self {
        Self::new(group_name, self.account.clone(), PrincipalKind::Group)
    }

    pub(crate) fn append_policies(&mut self, policies: impl IntoIterator<Item = Policy>) {
        self.policies.extend(policies);
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' in account {} ({} policies)",
            self.kind,
            self.name,
            self.account,
            self.policies.len()
        )
    }
}

/// Normalized IAM policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Statement")]
    pub statements: Vec<Statement>,
}

/// One effect/action/resource clause of a policy.
///
/// `action` and `resource` are always sequences, whatever shape the source
/// document used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Sid", default)]
    pub sid: String,
    #[serde(rename = "Effect")]
    pub effect: String,
    #[serde(rename = "Action")]
    pub action: Vec<String>,
    #[serde(rename = "Resource")]
    pub resource: Vec<String>,
}

/// Reference to a managed policy attached to a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedPolicyRef {
    pub name: String,
    pub arn: String,
}

/// Result of the STS "who am I" lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub arn: String,
    pub account: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identity() -> Identity {
        let mut identity = Identity::new("alice", "680235478471", PrincipalKind::User);
        identity.append_policies([Policy {
            version: "2012-10-17".to_string(),
            statements: vec![Statement {
                sid: "VisualEditor0".to_string(),
                effect: "Allow".to_string(),
                action: vec!["ssm:DescribePatchBaselines".to_string()],
                resource: vec!["*".to_string()],
            }],
        }]);
        identity
    }

    #[test]
    fn test_identity_serializes_with_aws_field_names() {
        let json = serde_json::to_value(sample_identity()).unwrap();
        assert_eq!(json["Name"], "alice");
        assert_eq!(json["Account"], "680235478471");
        assert_eq!(json["Kind"], "user");
        assert_eq!(json["Policies"][0]["Version"], "2012-10-17");
        assert_eq!(json["Policies"][0]["Statement"][0]["Sid"], "VisualEditor0");
        assert_eq!(
            json["Policies"][0]["Statement"][0]["Action"][0],
            "ssm:DescribePatchBaselines"
        );
    }

    #[test]
    fn test_identity_survives_serializer() {
        let identity = sample_identity();
        let json = serde_json::to_string(&identity).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, identity);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"{"Name":"x","Account":"1","Kind":"bogus","Policies":[]}"#;
        assert!(serde_json::from_str::<Identity>(json).is_err());
    }

    #[test]
    fn test_direct_source_order_per_kind() {
        assert_eq!(
            PrincipalKind::User.direct_sources(),
            &[PolicySource::Inline, PolicySource::Attached]
        );
        assert_eq!(
            PrincipalKind::Role.direct_sources(),
            &[PolicySource::Inline, PolicySource::Attached]
        );
        assert_eq!(
            PrincipalKind::Group.direct_sources(),
            &[PolicySource::Attached, PolicySource::Inline]
        );
        assert!(PrincipalKind::User.inherits_group_policies());
        assert!(!PrincipalKind::Group.inherits_group_policies());
        assert!(!PrincipalKind::Role.inherits_group_policies());
    }

    #[test]
    fn test_group_in_same_account() {
        let user = Identity::new("alice", "680235478471", PrincipalKind::User);
        let group = user.group_in_same_account("devs");
        assert_eq!(group.name(), "devs");
        assert_eq!(group.account(), "680235478471");
        assert_eq!(group.kind(), PrincipalKind::Group);
        assert!(group.policies().is_empty());
    }
}
