//! AWS SDK integration: role assumption, IAM reads, principal parsing, caller lookup.

pub mod credentials;
pub mod iam_client;
pub mod principal;
pub mod sts;
