//! Activity configuration and secrets.
//!
//! Experiment runners hand every activity two string-keyed maps. Actions and
//! probes pass them through untouched; only the client factory and the
//! backup wait read the keys below.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::ActivityFailure;
use crate::wait::PollSettings;

/// Experiment configuration block.
pub type Configuration = HashMap<String, Value>;

/// Experiment secrets block.
pub type Secrets = HashMap<String, Value>;

pub const REGION: &str = "aws_region";
pub const PROFILE_NAME: &str = "aws_profile_name";
pub const ASSUME_ROLE_ARN: &str = "aws_assume_role_arn";
pub const ASSUME_ROLE_SESSION_NAME: &str = "aws_assume_role_session_name";
pub const ASSUME_ROLE_EXTERNAL_ID: &str = "aws_assume_role_external_id";
pub const ENDPOINT_URL: &str = "aws_endpoint_url";
pub const CONNECT_TIMEOUT: &str = "aws_connect_timeout";
pub const READ_TIMEOUT: &str = "aws_read_timeout";
pub const MAX_RETRIES: &str = "aws_max_retries";

pub const BACKUP_POLL_INTERVAL: &str = "dynamodb_backup_poll_interval";
pub const BACKUP_TIMEOUT: &str = "dynamodb_backup_timeout";
pub const BACKUP_MAX_ATTEMPTS: &str = "dynamodb_backup_max_attempts";

pub const ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const SESSION_TOKEN: &str = "aws_session_token";

/// Client settings resolved from an activity's configuration and secrets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    pub profile: Option<String>,
    pub role_arn: Option<String>,
    pub role_session_name: Option<String>,
    pub external_id: Option<String>,
    pub endpoint_url: Option<String>,
    pub connect_timeout: Option<f64>,
    pub read_timeout: Option<f64>,
    pub max_retries: Option<u32>,
}

impl AwsConfig {
    /// Read the `aws_*` keys from configuration and secrets.
    pub fn from_activity(
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<Self, ActivityFailure> {
        let access_key = string_value(secrets, ACCESS_KEY_ID)?;
        let secret_key = string_value(secrets, SECRET_ACCESS_KEY)?;
        if access_key.is_some() != secret_key.is_some() {
            return Err(ActivityFailure::new(format!(
                "both \"{ACCESS_KEY_ID}\" and \"{SECRET_ACCESS_KEY}\" must be set in secrets"
            )));
        }

        Ok(Self {
            region: string_value(configuration, REGION)?,
            access_key,
            secret_key,
            session_token: string_value(secrets, SESSION_TOKEN)?,
            profile: string_value(configuration, PROFILE_NAME)?,
            role_arn: string_value(configuration, ASSUME_ROLE_ARN)?,
            role_session_name: string_value(configuration, ASSUME_ROLE_SESSION_NAME)?,
            external_id: string_value(configuration, ASSUME_ROLE_EXTERNAL_ID)?,
            endpoint_url: string_value(configuration, ENDPOINT_URL)?,
            connect_timeout: float_value(configuration, CONNECT_TIMEOUT)?,
            read_timeout: float_value(configuration, READ_TIMEOUT)?,
            max_retries: uint_value(configuration, MAX_RETRIES)?,
        })
    }
}

/// Apply the `dynamodb_backup_*` keys on top of `base`.
///
/// Keys that are absent leave the base value alone, so the default stays an
/// unbounded wait polled every five seconds.
pub fn poll_settings(
    configuration: &Configuration,
    base: &PollSettings,
) -> Result<PollSettings, ActivityFailure> {
    let mut settings = base.clone();
    if let Some(secs) = float_value(configuration, BACKUP_POLL_INTERVAL)? {
        settings = settings.with_interval(seconds(BACKUP_POLL_INTERVAL, secs)?);
    }
    if let Some(secs) = float_value(configuration, BACKUP_TIMEOUT)? {
        settings = settings.with_timeout(seconds(BACKUP_TIMEOUT, secs)?);
    }
    match uint_value(configuration, BACKUP_MAX_ATTEMPTS)? {
        Some(0) => {
            return Err(ActivityFailure::new(format!(
                "\"{BACKUP_MAX_ATTEMPTS}\" must be at least 1"
            )));
        }
        Some(attempts) => settings = settings.with_max_attempts(attempts),
        None => {}
    }
    Ok(settings)
}

fn seconds(key: &str, secs: f64) -> Result<Duration, ActivityFailure> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ActivityFailure::new(format!("\"{key}\" must be a non-negative number of seconds")))
}

fn string_value(map: &HashMap<String, Value>, key: &str) -> Result<Option<String>, ActivityFailure> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ActivityFailure::new(format!(
            "\"{key}\" must be a string, got {other}"
        ))),
    }
}

// Experiment files often quote numbers, so strings are parsed too.
fn float_value(map: &HashMap<String, Value>, key: &str) -> Result<Option<f64>, ActivityFailure> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ActivityFailure::new(format!("\"{key}\" must be a number, got \"{s}\""))),
        Some(other) => Err(ActivityFailure::new(format!(
            "\"{key}\" must be a number, got {other}"
        ))),
    }
}

fn uint_value(map: &HashMap<String, Value>, key: &str) -> Result<Option<u32>, ActivityFailure> {
    let invalid = || ActivityFailure::new(format!("\"{key}\" must be a non-negative integer"));
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<u32>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}
