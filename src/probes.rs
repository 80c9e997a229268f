//! Read-only probes.

use crate::api::DynamoDbApi;
use crate::errors::{call_provider, ActivityFailure};
use crate::responses::{BackupDescription, ContinuousBackupsResponse, DescribeTableResponse};
use crate::shared::{describe_dynamo_backup, describe_dynamo_table};

/// Describe a DynamoDB table.
pub async fn describe_table<A>(
    client: &A,
    table_name: &str,
) -> Result<DescribeTableResponse, ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    describe_dynamo_table(client, table_name).await
}

/// Get the continuous backup (point-in-time recovery) status of a table.
pub async fn describe_continuous_backups<A>(
    client: &A,
    table_name: &str,
) -> Result<ContinuousBackupsResponse, ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    call_provider(
        "DescribeContinuousBackups",
        client.describe_continuous_backups(table_name),
    )
    .await
}

/// Describe one backup. Returns the `BackupDescription`, not the envelope.
pub async fn describe_backup<A>(
    client: &A,
    backup_arn: &str,
) -> Result<BackupDescription, ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    describe_dynamo_backup(client, backup_arn).await
}
