//! IAM Identity CLI
//!
//! Resolves the effective policy set of the calling AWS principal (or of an
//! explicitly named one) and prints it as JSON on stdout.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use iam_identity_resolver::{
    extract_account_from_arn, AwsPolicyFetchClient, Identity, IdentityResolver, ResolveContext,
    ResolverConfig, PROFILE_ENV, REGION_ENV, ROLE_NAME_ENV,
};
use log::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "iam-identity",
    version,
    about = "Resolve every IAM policy that applies to an AWS user, group, or role"
)]
struct Cli {
    /// ARN of the principal to resolve. Defaults to the caller reported by STS
    #[arg(long, value_name = "ARN")]
    caller_arn: Option<String>,

    /// Account the principal lives in. Derived from --caller-arn when omitted
    #[arg(long, requires = "caller_arn")]
    account: Option<String>,

    /// Shared-config profile for the base credentials [default: basic]
    #[arg(long, env = PROFILE_ENV)]
    profile: Option<String>,

    /// Role assumed in the principal's account to read its policies [default: identity]
    #[arg(long, env = ROLE_NAME_ENV)]
    role_name: Option<String>,

    /// Region used for STS when the profile does not set one [default: us-east-1]
    #[arg(long, env = REGION_ENV)]
    region: Option<String>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Print single-line JSON instead of pretty-printed output
    #[arg(long)]
    compact: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Flags and their env fallbacks, with blank or missing values left to the defaults
    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::from_lookup(|key| match key {
            ROLE_NAME_ENV => self.role_name.clone(),
            PROFILE_ENV => self.profile.clone(),
            REGION_ENV => self.region.clone(),
            _ => None,
        })
    }

    fn context(&self) -> ResolveContext {
        let ctx = ResolveContext::new();
        match self.timeout {
            Some(seconds) => ctx.with_timeout(Duration::from_secs(seconds)),
            None => ctx,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn resolve(cli: &Cli, ctx: &ResolveContext) -> Result<Identity> {
    let config = cli.resolver_config();
    let profile = config.profile.clone();
    let resolver = IdentityResolver::new(AwsPolicyFetchClient::new(config));

    let identity = match &cli.caller_arn {
        Some(arn) => {
            let account = match &cli.account {
                Some(account) => account.clone(),
                None => extract_account_from_arn(arn).with_context(|| {
                    format!("cannot derive an account id from '{arn}'; pass --account")
                })?,
            };
            debug!("Resolving {} in account {}", arn, account);
            resolver.resolve(ctx, arn, &account).await?
        }
        None => {
            debug!("Resolving caller of profile {}", profile);
            resolver
                .resolve_caller(ctx, resolver.client().role_assumer())
                .await?
        }
    };
    Ok(identity)
}

fn render(identity: &Identity, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(identity)
    } else {
        serde_json::to_string_pretty(identity)
    };
    json.context("failed to serialize identity")
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = cli.context();
    let cancel = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = resolve(&cli, &ctx)
        .await
        .context("failed to resolve identity")
        .and_then(|identity| {
            info!("Identity {}", identity);
            render(&identity, cli.compact)
        });

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
