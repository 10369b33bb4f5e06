//! Principal classification from caller ARNs

use crate::error::{ResolveError, ResolveResult};
use crate::types::PrincipalKind;

/// Kind and bare name of a principal, as read from its ARN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalInfo {
    pub kind: PrincipalKind,
    pub name: String,
}

/// Markers are checked in this order; the first one present wins.
const CLASSIFICATION_ORDER: [PrincipalKind; 3] =
    [PrincipalKind::User, PrincipalKind::Group, PrincipalKind::Role];

/// Classify a caller ARN as a user, group, or role and extract the principal name.
///
/// The name is everything after the first matching path marker, so
/// `arn:aws:iam::680235478471:user/alice` yields `User` / `alice`.
pub fn classify_principal(arn: &str) -> ResolveResult<PrincipalInfo> {
    CLASSIFICATION_ORDER
        .iter()
        .find_map(|kind| {
            arn.split_once(kind.arn_marker())
                .map(|(_, name)| (*kind, name))
        })
        .filter(|(_, name)| !name.is_empty())
        .map(|(kind, name)| PrincipalInfo {
            kind,
            name: name.to_string(),
        })
        .ok_or_else(|| ResolveError::Classification(arn.to_string()))
}

/// Extract 12-digit account ID from ARN (field 5 in colon-delimited format)
pub fn extract_account_from_arn(arn: &str) -> Option<String> {
    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() >= 6 {
        let account_id = parts[4];
        if account_id.len() == 12 && account_id.chars().all(|c| c.is_ascii_digit()) {
            return Some(account_id.to_string());
        }
    }
    None
}
