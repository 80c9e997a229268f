//! Conversions from `aws-sdk-dynamodb` output types to the response records.

use aws_sdk_dynamodb::operation::create_backup::CreateBackupOutput;
use aws_sdk_dynamodb::operation::delete_table::DeleteTableOutput;
use aws_sdk_dynamodb::operation::describe_backup::DescribeBackupOutput;
use aws_sdk_dynamodb::operation::describe_continuous_backups::DescribeContinuousBackupsOutput;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableOutput;
use aws_sdk_dynamodb::operation::update_continuous_backups::UpdateContinuousBackupsOutput;
use aws_sdk_dynamodb::primitives::DateTime as SdkDateTime;
use aws_sdk_dynamodb::types as sdk;
use chrono::{DateTime, Utc};

use crate::responses::{
    AttributeDefinition, BackupDescription, BackupDetails, BillingModeSummary,
    ContinuousBackupsDescription, ContinuousBackupsResponse, CreateBackupResponse,
    DeleteTableResponse, DescribeBackupResponse, DescribeTableResponse, KeySchemaElement,
    PointInTimeRecoveryDescription, SourceTableDetails, TableDescription,
};

/// Convert a smithy timestamp to chrono. Out-of-range values are dropped.
pub fn to_chrono(dt: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

fn key_schema(elements: &[sdk::KeySchemaElement]) -> Vec<KeySchemaElement> {
    elements
        .iter()
        .map(|k| KeySchemaElement {
            attribute_name: k.attribute_name().to_string(),
            key_type: k.key_type().as_str().to_string(),
        })
        .collect()
}

pub fn table_description(table: &sdk::TableDescription) -> TableDescription {
    TableDescription {
        table_name: table.table_name().map(str::to_string),
        table_arn: table.table_arn().map(str::to_string),
        table_id: table.table_id().map(str::to_string),
        table_status: table.table_status().map(|s| s.as_str().to_string()),
        creation_date_time: table.creation_date_time().and_then(to_chrono),
        item_count: table.item_count(),
        table_size_bytes: table.table_size_bytes(),
        key_schema: key_schema(table.key_schema()),
        attribute_definitions: table
            .attribute_definitions()
            .iter()
            .map(|a| AttributeDefinition {
                attribute_name: a.attribute_name().to_string(),
                attribute_type: a.attribute_type().as_str().to_string(),
            })
            .collect(),
        billing_mode_summary: table.billing_mode_summary().map(|b| BillingModeSummary {
            billing_mode: b.billing_mode().map(|m| m.as_str().to_string()),
        }),
        deletion_protection_enabled: table.deletion_protection_enabled(),
    }
}

pub fn backup_details(details: &sdk::BackupDetails) -> BackupDetails {
    BackupDetails {
        backup_arn: details.backup_arn().to_string(),
        backup_name: details.backup_name().to_string(),
        backup_size_bytes: details.backup_size_bytes(),
        backup_status: details.backup_status().as_str().to_string(),
        backup_type: details.backup_type().as_str().to_string(),
        backup_creation_date_time: to_chrono(details.backup_creation_date_time()),
        backup_expiry_date_time: details.backup_expiry_date_time().and_then(to_chrono),
    }
}

fn source_table_details(source: &sdk::SourceTableDetails) -> SourceTableDetails {
    SourceTableDetails {
        table_name: source.table_name().to_string(),
        table_id: source.table_id().to_string(),
        table_arn: source.table_arn().map(str::to_string),
        table_size_bytes: source.table_size_bytes(),
        item_count: source.item_count(),
        table_creation_date_time: to_chrono(source.table_creation_date_time()),
        key_schema: key_schema(source.key_schema()),
        billing_mode: source.billing_mode().map(|m| m.as_str().to_string()),
    }
}

fn continuous_backups_description(
    description: &sdk::ContinuousBackupsDescription,
) -> ContinuousBackupsDescription {
    ContinuousBackupsDescription {
        continuous_backups_status: description.continuous_backups_status().as_str().to_string(),
        point_in_time_recovery_description: description
            .point_in_time_recovery_description()
            .map(|p| PointInTimeRecoveryDescription {
                point_in_time_recovery_status: p
                    .point_in_time_recovery_status()
                    .map(|s| s.as_str().to_string()),
                earliest_restorable_date_time: p.earliest_restorable_date_time().and_then(to_chrono),
                latest_restorable_date_time: p.latest_restorable_date_time().and_then(to_chrono),
            }),
    }
}

impl From<DeleteTableOutput> for DeleteTableResponse {
    fn from(output: DeleteTableOutput) -> Self {
        Self {
            table_description: output.table_description().map(table_description),
        }
    }
}

impl From<DescribeTableOutput> for DescribeTableResponse {
    fn from(output: DescribeTableOutput) -> Self {
        Self {
            table: output.table().map(table_description),
        }
    }
}

impl From<CreateBackupOutput> for CreateBackupResponse {
    fn from(output: CreateBackupOutput) -> Self {
        Self {
            backup_details: output.backup_details().map(backup_details),
        }
    }
}

impl From<DescribeBackupOutput> for DescribeBackupResponse {
    fn from(output: DescribeBackupOutput) -> Self {
        Self {
            backup_description: output.backup_description().map(|d| BackupDescription {
                backup_details: d.backup_details().map(backup_details),
                source_table_details: d.source_table_details().map(source_table_details),
            }),
        }
    }
}

impl From<DescribeContinuousBackupsOutput> for ContinuousBackupsResponse {
    fn from(output: DescribeContinuousBackupsOutput) -> Self {
        Self {
            continuous_backups_description: output
                .continuous_backups_description()
                .map(continuous_backups_description),
        }
    }
}

impl From<UpdateContinuousBackupsOutput> for ContinuousBackupsResponse {
    fn from(output: UpdateContinuousBackupsOutput) -> Self {
        Self {
            continuous_backups_description: output
                .continuous_backups_description()
                .map(continuous_backups_description),
        }
    }
}
