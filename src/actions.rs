//! Mutating actions: delete a table, back it up, toggle point-in-time recovery.

use crate::api::DynamoDbApi;
use crate::errors::{call_provider, ActivityFailure, BACKUP_NAME_REQUIRED};
use crate::responses::{
    BackupDetails, ContinuousBackupsResponse, CreateBackupResponse, DeleteTableResponse,
    BACKUP_STATUS_AVAILABLE,
};
use crate::shared::describe_dynamo_backup;
use crate::wait::{wait_until, PollSettings};

/// Resolve the backup name a delete needs before touching the provider.
///
/// Returns `Ok(None)` when no backup was requested.
pub fn backup_name_for_delete(
    create_backup: bool,
    backup_name: Option<&str>,
) -> Result<Option<&str>, ActivityFailure> {
    if !create_backup {
        return Ok(None);
    }
    match backup_name {
        Some(name) if !name.is_empty() => Ok(Some(name)),
        _ => Err(ActivityFailure::new(BACKUP_NAME_REQUIRED)),
    }
}

/// Delete a DynamoDB table and every item in it.
///
/// With `create_backup`, the table is first backed up under `backup_name`
/// and the delete only happens once that backup is `AVAILABLE`.
pub async fn delete_table<A>(
    client: &A,
    table_name: &str,
    create_backup: bool,
    backup_name: Option<&str>,
    poll: &PollSettings,
) -> Result<DeleteTableResponse, ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    if let Some(backup_name) = backup_name_for_delete(create_backup, backup_name)? {
        backup_table(client, table_name, backup_name, poll).await?;
    }

    tracing::info!(table_name, "deleting DynamoDB table");
    call_provider("DeleteTable", client.delete_table(table_name)).await
}

/// Create a backup of a table and wait until it is `AVAILABLE`.
///
/// Returns the CreateBackup response, not the last polled state.
pub async fn backup_table<A>(
    client: &A,
    table_name: &str,
    backup_name: &str,
    poll: &PollSettings,
) -> Result<CreateBackupResponse, ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    tracing::info!(table_name, backup_name, "creating DynamoDB backup");
    let response = call_provider("CreateBackup", client.create_backup(table_name, backup_name)).await?;

    let backup_arn = response
        .backup_details
        .as_ref()
        .map(|details| details.backup_arn.clone())
        .ok_or_else(|| {
            ActivityFailure::new(format!(
                "CreateBackup returned no BackupDetails for table {table_name}"
            ))
        })?;

    wait_for_backup_to_complete(client, &backup_arn, poll).await?;
    Ok(response)
}

/// Enable or disable point-in-time recovery for a table.
pub async fn set_continuous_backups<A>(
    client: &A,
    table_name: &str,
    point_in_time_enabled: bool,
) -> Result<ContinuousBackupsResponse, ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    tracing::info!(table_name, point_in_time_enabled, "updating continuous backups");
    call_provider(
        "UpdateContinuousBackups",
        client.update_continuous_backups(table_name, point_in_time_enabled),
    )
    .await
}

async fn wait_for_backup_to_complete<A>(
    client: &A,
    backup_arn: &str,
    poll: &PollSettings,
) -> Result<(), ActivityFailure>
where
    A: DynamoDbApi + ?Sized,
{
    let what = format!("backup {backup_arn} to become {BACKUP_STATUS_AVAILABLE}");
    wait_until(poll, &what, move || async move {
        let backup = describe_dynamo_backup(client, backup_arn).await?;
        tracing::debug!(backup_arn, status = backup.backup_status(), "polled backup status");
        // Missing BackupDetails means the provider has not settled yet.
        let available = backup
            .backup_details
            .as_ref()
            .is_some_and(BackupDetails::is_available);
        Ok(available.then_some(()))
    })
    .await
}
