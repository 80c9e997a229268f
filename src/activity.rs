//! Blocking entry points for experiment runners.
//!
//! Each call acquires a client from the factory, then drives the async
//! action or probe to completion on a shared Tokio runtime. The calling
//! thread is blocked for the whole call, including any backup wait.

use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::actions;
use crate::client::{AwsClientFactory, ClientFactory};
use crate::config::{poll_settings, Configuration, Secrets};
use crate::errors::ActivityFailure;
use crate::probes;
use crate::responses::{
    BackupDescription, ContinuousBackupsResponse, CreateBackupResponse, DeleteTableResponse,
    DescribeTableResponse,
};
use crate::wait::{CancelToken, PollSettings};

/// Global shared Tokio runtime.
static RUNTIME: Lazy<Arc<Runtime>> =
    Lazy::new(|| Arc::new(Runtime::new().expect("Failed to create global Tokio runtime")));

/// The six DynamoDB activities, bound to a client factory.
pub struct DynamoDbActivities<F = AwsClientFactory> {
    factory: F,
    runtime: Arc<Runtime>,
    poll: PollSettings,
}

impl DynamoDbActivities<AwsClientFactory> {
    /// Activities backed by real AWS clients.
    pub fn new() -> Self {
        Self::with_factory(AwsClientFactory)
    }
}

impl Default for DynamoDbActivities<AwsClientFactory> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ClientFactory> DynamoDbActivities<F> {
    pub fn with_factory(factory: F) -> Self {
        Self {
            factory,
            runtime: RUNTIME.clone(),
            poll: PollSettings::default(),
        }
    }

    /// Use `runtime` instead of the shared one.
    pub fn with_runtime(mut self, runtime: Arc<Runtime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Default backup wait settings. Configuration keys still override them.
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Attach a token that aborts any backup wait started by these activities.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.poll = self.poll.with_cancel_token(token);
        self
    }

    // ========== ACTIONS ==========

    /// Delete a table, optionally backing it up first.
    pub fn delete_table(
        &self,
        table_name: &str,
        create_backup: bool,
        backup_name: Option<&str>,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<DeleteTableResponse, ActivityFailure> {
        // Fail on a missing backup name before a client is even built.
        actions::backup_name_for_delete(create_backup, backup_name)?;
        let poll = poll_settings(configuration, &self.poll)?;

        self.runtime.block_on(async {
            let client = self.factory.client(configuration, secrets).await?;
            actions::delete_table(&client, table_name, create_backup, backup_name, &poll).await
        })
    }

    /// Back up a table and block until the backup is available.
    pub fn backup_table(
        &self,
        table_name: &str,
        backup_name: &str,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<CreateBackupResponse, ActivityFailure> {
        let poll = poll_settings(configuration, &self.poll)?;

        self.runtime.block_on(async {
            let client = self.factory.client(configuration, secrets).await?;
            actions::backup_table(&client, table_name, backup_name, &poll).await
        })
    }

    /// Toggle point-in-time recovery.
    pub fn set_continuous_backups(
        &self,
        table_name: &str,
        point_in_time_enabled: bool,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<ContinuousBackupsResponse, ActivityFailure> {
        self.runtime.block_on(async {
            let client = self.factory.client(configuration, secrets).await?;
            actions::set_continuous_backups(&client, table_name, point_in_time_enabled).await
        })
    }

    // ========== PROBES ==========

    pub fn describe_table(
        &self,
        table_name: &str,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<DescribeTableResponse, ActivityFailure> {
        self.runtime.block_on(async {
            let client = self.factory.client(configuration, secrets).await?;
            probes::describe_table(&client, table_name).await
        })
    }

    pub fn describe_continuous_backups(
        &self,
        table_name: &str,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<ContinuousBackupsResponse, ActivityFailure> {
        self.runtime.block_on(async {
            let client = self.factory.client(configuration, secrets).await?;
            probes::describe_continuous_backups(&client, table_name).await
        })
    }

    pub fn describe_backup(
        &self,
        backup_arn: &str,
        configuration: &Configuration,
        secrets: &Secrets,
    ) -> Result<BackupDescription, ActivityFailure> {
        self.runtime.block_on(async {
            let client = self.factory.client(configuration, secrets).await?;
            probes::describe_backup(&client, backup_arn).await
        })
    }
}
