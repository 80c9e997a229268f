//! Describe calls used by both actions and probes.

use crate::api::DynamoDbApi;
use crate::errors::{call_provider, ActivityFailure};
use crate::responses::{BackupDescription, DescribeTableResponse};

/// DescribeTable, returning the provider response as is.
pub async fn describe_dynamo_table<A>(
    client: &A,
    table_name: &str,
) -> Result<DescribeTableResponse, ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    call_provider("DescribeTable", client.describe_table(table_name)).await
}

/// DescribeBackup, returning only the inner `BackupDescription`.
pub async fn describe_dynamo_backup<A>(
    client: &A,
    backup_arn: &str,
) -> Result<BackupDescription, ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    call_provider("DescribeBackup", client.describe_backup(backup_arn))
        .await?
        .backup_description
        .ok_or_else(|| {
            ActivityFailure::new(format!(
                "DescribeBackup returned no BackupDescription for {backup_arn}"
            ))
        })
}
