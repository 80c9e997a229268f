//! Chaos engineering actions and probes for Amazon DynamoDB.
//!
//! Actions:
//! - `delete_table` - Delete a table, optionally backing it up first
//! - `backup_table` - Create a backup and wait until it is available
//! - `set_continuous_backups` - Toggle point-in-time recovery
//!
//! Probes:
//! - `describe_table`
//! - `describe_continuous_backups`
//! - `describe_backup`
//!
//! The async functions in [`actions`] and [`probes`] take any
//! [`DynamoDbApi`]. [`DynamoDbActivities`] is the blocking front door that
//! gets its client from a [`ClientFactory`]. With the `python` feature the
//! same activities are exported as a Python extension module.

pub mod actions;
pub mod activity;
pub mod api;
pub mod client;
pub mod config;
pub mod conversions;
pub mod errors;
pub mod logging;
pub mod probes;
pub mod responses;
pub mod shared;
pub mod wait;

#[cfg(feature = "python")]
mod python;

pub use activity::DynamoDbActivities;
pub use api::{DynamoDbApi, SdkDynamoDb};
pub use client::{AwsClientFactory, ClientFactory};
pub use config::{AwsConfig, Configuration, Secrets};
pub use errors::{ActivityFailure, ProviderError};
pub use logging::init_logging;
pub use wait::{CancelToken, PollSettings};
