//! DynamoDB client construction.
//!
//! Activities never build clients themselves: they ask a [`ClientFactory`]
//! for one, handing over the experiment's configuration and secrets.
//! [`AwsClientFactory`] supports multiple credential sources:
//! - Secrets (access key, secret key, session token)
//! - AWS profiles
//! - The default chain (environment variables, instance profile, etc.)
//!
//! Any of them can be wrapped in an assumed role.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::retry::RetryConfig;
use aws_config::sts::AssumeRoleProvider;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::{Credentials, Region};
use aws_sdk_dynamodb::Client;
use std::time::Duration;

use crate::api::{DynamoDbApi, SdkDynamoDb};
use crate::config::{AwsConfig, Configuration, Secrets};
use crate::errors::ActivityFailure;

/// Region used when neither configuration nor environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Session name for assumed roles when configuration gives none.
pub const DEFAULT_ROLE_SESSION_NAME: &str = "chaosdynamo";

/// Produces an authenticated client for one activity invocation.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    type Client: DynamoDbApi;

    async fn client(
        &self,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<Self::Client, ActivityFailure>;
}

/// Builds a fresh SDK client from the `aws_*` configuration and secrets keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsClientFactory;

#[async_trait]
impl ClientFactory for AwsClientFactory {
    type Client = SdkDynamoDb;

    async fn client(
        &self,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<SdkDynamoDb, ActivityFailure> {
        let config = AwsConfig::from_activity(configuration, secrets)?;
        let client = build_client(&config).await?;
        Ok(SdkDynamoDb::new(client))
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, ActivityFailure> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ActivityFailure::new(format!("Failed to create DynamoDB client: invalid {name} {secs}"))
    })
}

/// Build the AWS SDK DynamoDB client with the given configuration.
///
/// Credentials priority: secrets > profile > default chain. When a role ARN
/// is configured, the resolved credentials are used to assume it.
pub async fn build_client(config: &AwsConfig) -> Result<Client, ActivityFailure> {
    // Region priority: configuration > env var / profile > default
    let region_provider = RegionProviderChain::first_try(config.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(DEFAULT_REGION);

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

    if let (Some(ak), Some(sk)) = (&config.access_key, &config.secret_key) {
        let creds = Credentials::new(
            ak.clone(),
            sk.clone(),
            config.session_token.clone(),
            None,
            "chaosdynamo-secrets",
        );
        config_loader = config_loader.credentials_provider(creds);
    } else if let Some(profile_name) = &config.profile {
        let profile_provider = ProfileFileCredentialsProvider::builder()
            .profile_name(profile_name)
            .build();
        config_loader = config_loader.credentials_provider(profile_provider);
    }

    if config.connect_timeout.is_some() || config.read_timeout.is_some() {
        let mut timeouts = TimeoutConfig::builder();
        if let Some(secs) = config.connect_timeout {
            timeouts = timeouts.connect_timeout(seconds("connect timeout", secs)?);
        }
        if let Some(secs) = config.read_timeout {
            timeouts = timeouts.read_timeout(seconds("read timeout", secs)?);
        }
        config_loader = config_loader.timeout_config(timeouts.build());
    }

    if let Some(retries) = config.max_retries {
        let attempts = retries.saturating_add(1);
        config_loader = config_loader.retry_config(RetryConfig::standard().with_max_attempts(attempts));
    }

    let sdk_config = config_loader.load().await;
    let mut dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config);

    if let Some(role_arn) = &config.role_arn {
        let session_name = config
            .role_session_name
            .as_deref()
            .unwrap_or(DEFAULT_ROLE_SESSION_NAME);
        tracing::debug!(role_arn = %role_arn, session_name, "assuming role for DynamoDB client");

        let mut role = AssumeRoleProvider::builder(role_arn.as_str()).session_name(session_name);
        if let Some(external_id) = &config.external_id {
            role = role.external_id(external_id.as_str());
        }
        let provider = role.configure(&sdk_config).build().await;
        dynamo_config = dynamo_config.credentials_provider(provider);
    }

    if let Some(url) = &config.endpoint_url {
        dynamo_config = dynamo_config.endpoint_url(url);
    }

    Ok(Client::from_conf(dynamo_config.build()))
}
