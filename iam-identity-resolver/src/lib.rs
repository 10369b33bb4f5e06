//! This crate provides the core business logic for IAM Identity:
//! - Principal classification from a caller ARN
//! - Cross-account role assumption for IAM reads
//! - Aggregation of inline, attached, and group-inherited policies
//! - Normalization of heterogeneous policy documents
//!

mod aws;
mod config;
mod error;
mod parsing;
mod resolver;
mod types;

// Re-exports for a small, focused public API
pub use aws::credentials::{RoleAssumer, RoleSession};
pub use aws::iam_client::{decode_policy_document, AwsPolicyFetchClient, PolicyFetchClient};
pub use aws::principal::{classify_principal, extract_account_from_arn, PrincipalInfo};
pub use aws::sts::caller_identity;
pub use config::{
    ResolverConfig, DEFAULT_PROFILE, DEFAULT_REGION, DEFAULT_ROLE_NAME, PROFILE_ENV, REGION_ENV,
    ROLE_NAME_ENV,
};
pub use error::{
    CredentialError, FetchError, FetchResult, Operation, ParseError, ParseResult, ResolveError,
    ResolveResult,
};
pub use parsing::parse_policy;
pub use resolver::{IdentityResolver, ResolveContext};
pub use types::{
    AttachedPolicyRef, CallerIdentity, Identity, Policy, PolicySource, PrincipalKind, Statement,
};
