//! Error types for policy parsing, credential acquisition, fetching, and resolution

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use crate::types::PrincipalKind;

/// Errors produced while normalizing a raw policy document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot parse an empty policy document")]
    Empty,

    #[error("policy document is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("policy document has no string Version field")]
    MissingVersion,

    #[error("statement {index} has no string Effect field")]
    MissingEffect { index: usize },

    #[error("statement {index} is malformed: {reason}")]
    MalformedStatement { index: usize, reason: String },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Errors produced while obtaining role-scoped credentials.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to load base AWS credentials: {0}")]
    ConfigLoad(String),

    #[error("failed to assume role {role_arn}")]
    AssumeRole {
        role_arn: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Errors produced by the IAM read operations.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{entity} not found: {message}")]
    NotFound { entity: String, message: String },

    #[error("IAM service error: {0}")]
    Service(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("incomplete IAM response: {0}")]
    IncompleteResponse(String),

    #[error("failed to URL decode policy document: {0}")]
    Decode(String),

    #[error("operation is not supported for a {0} principal")]
    UnsupportedPrincipal(PrincipalKind),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// The IAM read operation a fetch failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListInlinePolicies,
    ListAttachedPolicies,
    GetInlinePolicy,
    GetManagedPolicy,
    ListGroupsForUser,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ListInlinePolicies => "failed to list inline policies",
            Self::ListAttachedPolicies => "failed to list attached policies",
            Self::GetInlinePolicy => "failed to get inline policy document",
            Self::GetManagedPolicy => "failed to get managed policy document",
            Self::ListGroupsForUser => "failed to list groups for user",
        };
        f.write_str(text)
    }
}

/// Errors returned by [`IdentityResolver`](crate::IdentityResolver).
///
/// No partially aggregated identity accompanies any of these.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unable to determine iam type for {0}")]
    Classification(String),

    #[error("failed to get caller identity: {0}")]
    CallerIdentity(String),

    #[error("{operation} for {principal}: {source}")]
    Fetch {
        operation: Operation,
        principal: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to parse policy '{policy}' of {principal}: {source}")]
    Parse {
        policy: String,
        principal: String,
        #[source]
        source: ParseError,
    },

    #[error("resolution was cancelled")]
    Cancelled,

    #[error("resolution deadline exceeded")]
    DeadlineExceeded,
}

pub type ResolveResult<T> = Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_message_names_operation() {
        let err = ResolveError::Fetch {
            operation: Operation::ListAttachedPolicies,
            principal: "user/alice".to_string(),
            source: FetchError::Service("throttled".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to list attached policies for user/alice: IAM service error: throttled"
        );
    }

    #[test]
    fn test_credential_error_is_transparent_inside_fetch_error() {
        let err: FetchError = CredentialError::AssumeRole {
            role_arn: "arn:aws:iam::680235478471:role/identity".to_string(),
            source: "AccessDenied".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "failed to assume role arn:aws:iam::680235478471:role/identity"
        );
        // The STS failure stays reachable through the source chain
        let cause = err.source().map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("AccessDenied"));
    }

    #[test]
    fn test_empty_parse_error_message() {
        assert_eq!(
            ParseError::Empty.to_string(),
            "cannot parse an empty policy document"
        );
    }
}
