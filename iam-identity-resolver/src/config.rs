//! Resolver configuration: role name, profile, and region fallback

/// Role assumed in the principal's account to read its policies.
pub const DEFAULT_ROLE_NAME: &str = "identity";
/// Shared-config profile used for the base credential chain.
pub const DEFAULT_PROFILE: &str = "basic";
/// Region for STS when neither the profile nor the environment carries one.
pub const DEFAULT_REGION: &str = "us-east-1";

pub const ROLE_NAME_ENV: &str = "IDENTITY_ROLE_NAME";
pub const PROFILE_ENV: &str = "AWS_PROFILE";
pub const REGION_ENV: &str = "IDENTITY_REGION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub role_name: String,
    pub profile: String,
    pub region_fallback: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            role_name: DEFAULT_ROLE_NAME.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            region_fallback: DEFAULT_REGION.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Build a configuration from a lookup keyed by the `*_ENV` names. Empty values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            role_name: get(ROLE_NAME_ENV, DEFAULT_ROLE_NAME),
            profile: get(PROFILE_ENV, DEFAULT_PROFILE),
            region_fallback: get(REGION_ENV, DEFAULT_REGION),
        }
    }

    /// ARN of the configured role inside `account`.
    pub fn role_arn(&self, account: &str) -> String {
        format!("arn:aws:iam::{}:role/{}", account, self.role_name)
    }
}
