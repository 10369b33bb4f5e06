use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;

use crate::error::{ResolveError, ResolveResult};
use crate::types::CallerIdentity;

/// Look up the ARN and account of the current caller using STS GetCallerIdentity.
///
/// # Arguments
///
/// * `client` - STS client built from the base (non-assumed) credentials
pub async fn caller_identity(client: &StsClient) -> ResolveResult<CallerIdentity> {
    let out = client.get_caller_identity().send().await.map_err(|e| {
        ResolveError::CallerIdentity(format!(
            "STS GetCallerIdentity failed: {}",
            DisplayErrorContext(&e)
        ))
    })?;

    let arn = out.arn().map(|s| s.to_string()).ok_or_else(|| {
        ResolveError::CallerIdentity("STS GetCallerIdentity missing Arn".to_string())
    })?;
    let account = out.account().map(|s| s.to_string()).ok_or_else(|| {
        ResolveError::CallerIdentity("STS GetCallerIdentity missing Account".to_string())
    })?;

    Ok(CallerIdentity { arn, account })
}
