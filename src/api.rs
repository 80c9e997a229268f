//! The DynamoDB management calls the activities issue.
//!
//! [`DynamoDbApi`] is the seam between activities and the provider:
//! [`SdkDynamoDb`] talks to AWS, tests plug in a fake.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::PointInTimeRecoverySpecification;
use aws_sdk_dynamodb::Client;

use crate::errors::{map_sdk_error, ProviderError};
use crate::responses::{
    ContinuousBackupsResponse, CreateBackupResponse, DeleteTableResponse,
    DescribeBackupResponse, DescribeTableResponse,
};

#[async_trait]
pub trait DynamoDbApi: Send + Sync {
    /// DeleteTable(TableName)
    async fn delete_table(&self, table_name: &str) -> Result<DeleteTableResponse, ProviderError>;

    /// CreateBackup(TableName, BackupName)
    async fn create_backup(
        &self,
        table_name: &str,
        backup_name: &str,
    ) -> Result<CreateBackupResponse, ProviderError>;

    /// DescribeBackup(BackupArn)
    async fn describe_backup(&self, backup_arn: &str)
    -> Result<DescribeBackupResponse, ProviderError>;

    /// DescribeTable(TableName)
    async fn describe_table(&self, table_name: &str)
    -> Result<DescribeTableResponse, ProviderError>;

    /// DescribeContinuousBackups(TableName)
    async fn describe_continuous_backups(
        &self,
        table_name: &str,
    ) -> Result<ContinuousBackupsResponse, ProviderError>;

    /// UpdateContinuousBackups(TableName, PointInTimeRecoverySpecification)
    async fn update_continuous_backups(
        &self,
        table_name: &str,
        point_in_time_enabled: bool,
    ) -> Result<ContinuousBackupsResponse, ProviderError>;
}

/// [`DynamoDbApi`] backed by the AWS SDK client.
#[derive(Debug, Clone)]
pub struct SdkDynamoDb {
    client: Client,
}

impl SdkDynamoDb {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DynamoDbApi for SdkDynamoDb {
    async fn delete_table(&self, table_name: &str) -> Result<DeleteTableResponse, ProviderError> {
        self.client
            .delete_table()
            .table_name(table_name)
            .send()
            .await
            .map(DeleteTableResponse::from)
            .map_err(map_sdk_error)
    }

    async fn create_backup(
        &self,
        table_name: &str,
        backup_name: &str,
    ) -> Result<CreateBackupResponse, ProviderError> {
        self.client
            .create_backup()
            .table_name(table_name)
            .backup_name(backup_name)
            .send()
            .await
            .map(CreateBackupResponse::from)
            .map_err(map_sdk_error)
    }

    async fn describe_backup(
        &self,
        backup_arn: &str,
    ) -> Result<DescribeBackupResponse, ProviderError> {
        self.client
            .describe_backup()
            .backup_arn(backup_arn)
            .send()
            .await
            .map(DescribeBackupResponse::from)
            .map_err(map_sdk_error)
    }

    async fn describe_table(
        &self,
        table_name: &str,
    ) -> Result<DescribeTableResponse, ProviderError> {
        self.client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map(DescribeTableResponse::from)
            .map_err(map_sdk_error)
    }

    async fn describe_continuous_backups(
        &self,
        table_name: &str,
    ) -> Result<ContinuousBackupsResponse, ProviderError> {
        self.client
            .describe_continuous_backups()
            .table_name(table_name)
            .send()
            .await
            .map(ContinuousBackupsResponse::from)
            .map_err(map_sdk_error)
    }

    async fn update_continuous_backups(
        &self,
        table_name: &str,
        point_in_time_enabled: bool,
    ) -> Result<ContinuousBackupsResponse, ProviderError> {
        let specification = PointInTimeRecoverySpecification::builder()
            .point_in_time_recovery_enabled(point_in_time_enabled)
            .build()
            .map_err(|e| ProviderError::new("ValidationException", e.to_string()))?;

        self.client
            .update_continuous_backups()
            .table_name(table_name)
            .point_in_time_recovery_specification(specification)
            .send()
            .await
            .map(ContinuousBackupsResponse::from)
            .map_err(map_sdk_error)
    }
}
