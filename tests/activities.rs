//! Actions, probes and the blocking facade against a recording fake provider.

use async_trait::async_trait;
use chaosdynamo::actions::{backup_table, delete_table, set_continuous_backups};
use chaosdynamo::errors::BACKUP_NAME_REQUIRED;
use chaosdynamo::probes::{describe_backup, describe_continuous_backups, describe_table};
use chaosdynamo::responses::{
    BackupDescription, BackupDetails, ContinuousBackupsDescription, ContinuousBackupsResponse,
    CreateBackupResponse, DeleteTableResponse, DescribeBackupResponse, DescribeTableResponse,
    PointInTimeRecoveryDescription, SourceTableDetails, TableDescription,
};
use chaosdynamo::{
    ActivityFailure, CancelToken, ClientFactory, Configuration, DynamoDbActivities, DynamoDbApi,
    PollSettings, ProviderError, Secrets,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TABLE: &str = "MyTestDynamoTable";
const BACKUP: &str = "MyTestDynamoTableBackup";
const BACKUP_ARN: &str =
    "arn:aws:dynamodb:us-east-1:123456789012:table/MyTestDynamoTable/backup/01489602797149-73d8d5bc";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    DeleteTable(String),
    CreateBackup(String, String),
    DescribeBackup(String),
    DescribeTable(String),
    DescribeContinuousBackups(String),
    UpdateContinuousBackups(String, bool),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    backup_statuses: VecDeque<&'static str>,
    failures: HashMap<&'static str, ProviderError>,
    envelope: Envelope,
}

/// Which part of a backup response the fake leaves out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Envelope {
    #[default]
    Complete,
    CreateWithoutDetails,
    DescribeWithoutDescription,
    DescriptionWithoutDetails,
}

/// Fake DynamoDB that records every call.
///
/// DescribeBackup answers with the queued statuses, then `CREATING` forever.
#[derive(Clone, Default)]
struct FakeDynamoDb {
    state: Arc<Mutex<State>>,
}

impl FakeDynamoDb {
    fn with_backup_statuses(statuses: &[&'static str]) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().backup_statuses = statuses.iter().copied().collect();
        fake
    }

    fn with_envelope(envelope: Envelope) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().envelope = envelope;
        fake
    }

    fn envelope(&self) -> Envelope {
        self.state.lock().unwrap().envelope
    }

    fn fail(&self, operation: &'static str, code: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, ProviderError::new(code, message));
    }

    fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn backup_details(status: &str) -> BackupDetails {
        BackupDetails {
            backup_arn: BACKUP_ARN.to_string(),
            backup_name: BACKUP.to_string(),
            backup_status: status.to_string(),
            backup_type: "USER".to_string(),
            ..Default::default()
        }
    }

    fn table(status: &str) -> TableDescription {
        TableDescription {
            table_name: Some(TABLE.to_string()),
            table_status: Some(status.to_string()),
            item_count: Some(0),
            ..Default::default()
        }
    }

    fn continuous_backups(enabled: bool) -> ContinuousBackupsResponse {
        let status = if enabled { "ENABLED" } else { "DISABLED" };
        ContinuousBackupsResponse {
            continuous_backups_description: Some(ContinuousBackupsDescription {
                continuous_backups_status: "ENABLED".to_string(),
                point_in_time_recovery_description: Some(PointInTimeRecoveryDescription {
                    point_in_time_recovery_status: Some(status.to_string()),
                    ..Default::default()
                }),
            }),
        }
    }
}

#[async_trait]
impl DynamoDbApi for FakeDynamoDb {
    async fn delete_table(&self, table_name: &str) -> Result<DeleteTableResponse, ProviderError> {
        self.record("DeleteTable", Call::DeleteTable(table_name.to_string()))?;
        Ok(DeleteTableResponse {
            table_description: Some(Self::table("DELETING")),
        })
    }

    async fn create_backup(
        &self,
        table_name: &str,
        backup_name: &str,
    ) -> Result<CreateBackupResponse, ProviderError> {
        self.record(
            "CreateBackup",
            Call::CreateBackup(table_name.to_string(), backup_name.to_string()),
        )?;
        if self.envelope() == Envelope::CreateWithoutDetails {
            return Ok(CreateBackupResponse::default());
        }
        Ok(CreateBackupResponse {
            backup_details: Some(Self::backup_details("CREATING")),
        })
    }

    async fn describe_backup(
        &self,
        backup_arn: &str,
    ) -> Result<DescribeBackupResponse, ProviderError> {
        self.record("DescribeBackup", Call::DescribeBackup(backup_arn.to_string()))?;
        let envelope = self.envelope();
        if envelope == Envelope::DescribeWithoutDescription {
            return Ok(DescribeBackupResponse::default());
        }
        let status = self
            .state
            .lock()
            .unwrap()
            .backup_statuses
            .pop_front()
            .unwrap_or("CREATING");
        Ok(DescribeBackupResponse {
            backup_description: Some(BackupDescription {
                backup_details: (envelope != Envelope::DescriptionWithoutDetails)
                    .then(|| Self::backup_details(status)),
                source_table_details: Some(SourceTableDetails {
                    table_name: TABLE.to_string(),
                    table_id: "e0ea5b1b-5a79-4c04-a2a6-0f0bd1e0bd8e".to_string(),
                    ..Default::default()
                }),
            }),
        })
    }

    async fn describe_table(
        &self,
        table_name: &str,
    ) -> Result<DescribeTableResponse, ProviderError> {
        self.record("DescribeTable", Call::DescribeTable(table_name.to_string()))?;
        Ok(DescribeTableResponse {
            table: Some(Self::table("ACTIVE")),
        })
    }

    async fn describe_continuous_backups(
        &self,
        table_name: &str,
    ) -> Result<ContinuousBackupsResponse, ProviderError> {
        self.record(
            "DescribeContinuousBackups",
            Call::DescribeContinuousBackups(table_name.to_string()),
        )?;
        Ok(Self::continuous_backups(false))
    }

    async fn update_continuous_backups(
        &self,
        table_name: &str,
        point_in_time_enabled: bool,
    ) -> Result<ContinuousBackupsResponse, ProviderError> {
        self.record(
            "UpdateContinuousBackups",
            Call::UpdateContinuousBackups(table_name.to_string(), point_in_time_enabled),
        )?;
        Ok(Self::continuous_backups(point_in_time_enabled))
    }
}

/// Hands out the same fake and counts how many clients were requested.
#[derive(Clone, Default)]
struct FakeFactory {
    fake: FakeDynamoDb,
    built: Arc<AtomicUsize>,
}

#[async_trait]
impl ClientFactory for FakeFactory {
    type Client = FakeDynamoDb;

    async fn client(
        &self,
        _configuration: &Configuration,
        _secrets: &Secrets,
    ) -> Result<FakeDynamoDb, ActivityFailure> {
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(self.fake.clone())
    }
}

fn configuration(value: serde_json::Value) -> Configuration {
    serde_json::from_value(value).unwrap()
}

// ========== ACTIONS ==========

#[tokio::test(start_paused = true)]
async fn test_delete_table_no_backup() {
    let fake = FakeDynamoDb::default();

    let response = delete_table(&fake, TABLE, false, None, &PollSettings::default())
        .await
        .unwrap();

    assert_eq!(fake.calls(), vec![Call::DeleteTable(TABLE.to_string())]);
    assert_eq!(
        response.table_description.unwrap().table_status.as_deref(),
        Some("DELETING")
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_table_with_backup_runs_in_order() {
    let fake = FakeDynamoDb::with_backup_statuses(&["CREATING", "AVAILABLE"]);
    let started = tokio::time::Instant::now();

    delete_table(&fake, TABLE, true, Some(BACKUP), &PollSettings::default())
        .await
        .unwrap();

    assert_eq!(
        fake.calls(),
        vec![
            Call::CreateBackup(TABLE.to_string(), BACKUP.to_string()),
            Call::DescribeBackup(BACKUP_ARN.to_string()),
            Call::DescribeBackup(BACKUP_ARN.to_string()),
            Call::DeleteTable(TABLE.to_string()),
        ]
    );
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_delete_table_no_backup_name() {
    let fake = FakeDynamoDb::default();

    for name in [None, Some("")] {
        let err = delete_table(&fake, TABLE, true, name, &PollSettings::default())
            .await
            .unwrap_err();
        assert_eq!(err.message(), BACKUP_NAME_REQUIRED);
    }
    assert!(fake.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delete_table_not_attempted_when_backup_fails() {
    let fake = FakeDynamoDb::default();
    fake.fail("CreateBackup", "TableNotFoundException", "Table not found: MyTestDynamoTable");

    let err = delete_table(&fake, TABLE, true, Some(BACKUP), &PollSettings::default())
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Table not found: MyTestDynamoTable");
    assert_eq!(
        fake.calls(),
        vec![Call::CreateBackup(TABLE.to_string(), BACKUP.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_table_not_attempted_when_poll_fails() {
    let fake = FakeDynamoDb::default();
    fake.fail("DescribeBackup", "BackupNotFoundException", "Backup not found");

    let err = delete_table(&fake, TABLE, true, Some(BACKUP), &PollSettings::default())
        .await
        .unwrap_err();

    assert_eq!(err.message(), "Backup not found");
    assert_eq!(err.code(), Some("BackupNotFoundException"));
    assert!(!fake.calls().contains(&Call::DeleteTable(TABLE.to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_backup_table_returns_create_response() {
    let fake = FakeDynamoDb::with_backup_statuses(&["CREATING", "CREATING", "AVAILABLE"]);
    let started = tokio::time::Instant::now();

    let response = backup_table(&fake, TABLE, BACKUP, &PollSettings::default())
        .await
        .unwrap();

    let details = response.backup_details.unwrap();
    assert_eq!(details.backup_status, "CREATING");
    assert_eq!(details.backup_arn, BACKUP_ARN);
    assert_eq!(fake.calls().len(), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_backup_table_gives_up_after_max_attempts() {
    let fake = FakeDynamoDb::default();
    let poll = PollSettings::default().with_max_attempts(3);

    let err = backup_table(&fake, TABLE, BACKUP, &poll).await.unwrap_err();

    assert!(err.message().contains(BACKUP_ARN));
    assert_eq!(fake.calls().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_backup_table_fails_without_backup_details() {
    let fake = FakeDynamoDb::with_envelope(Envelope::CreateWithoutDetails);

    let err = delete_table(&fake, TABLE, true, Some(BACKUP), &PollSettings::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.message(),
        format!("CreateBackup returned no BackupDetails for table {TABLE}")
    );
    assert_eq!(err.code(), None);
    assert_eq!(
        fake.calls(),
        vec![Call::CreateBackup(TABLE.to_string(), BACKUP.to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_backup_table_fails_without_backup_description() {
    let fake = FakeDynamoDb::with_envelope(Envelope::DescribeWithoutDescription);

    let err = delete_table(&fake, TABLE, true, Some(BACKUP), &PollSettings::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.message(),
        format!("DescribeBackup returned no BackupDescription for {BACKUP_ARN}")
    );
    assert!(!fake.calls().contains(&Call::DeleteTable(TABLE.to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_backup_without_details_is_not_yet_available() {
    let fake = FakeDynamoDb::with_envelope(Envelope::DescriptionWithoutDetails);
    let poll = PollSettings::default().with_max_attempts(3);
    let started = tokio::time::Instant::now();

    let err = backup_table(&fake, TABLE, BACKUP, &poll).await.unwrap_err();

    assert!(err.message().contains("after 3 attempts"));
    assert_eq!(
        fake.calls()
            .iter()
            .filter(|call| matches!(call, Call::DescribeBackup(_)))
            .count(),
        3
    );
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test]
async fn test_describe_backup_fails_without_backup_description() {
    let fake = FakeDynamoDb::with_envelope(Envelope::DescribeWithoutDescription);

    let err = describe_backup(&fake, BACKUP_ARN).await.unwrap_err();

    assert_eq!(
        err.message(),
        format!("DescribeBackup returned no BackupDescription for {BACKUP_ARN}")
    );
}

#[tokio::test(start_paused = true)]
async fn test_set_continuous_backups() {
    let fake = FakeDynamoDb::default();

    let response = set_continuous_backups(&fake, TABLE, true).await.unwrap();

    assert_eq!(
        fake.calls(),
        vec![Call::UpdateContinuousBackups(TABLE.to_string(), true)]
    );
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(
        value["ContinuousBackupsDescription"]["PointInTimeRecoveryDescription"]
            ["PointInTimeRecoveryStatus"],
        json!("ENABLED")
    );
}

// ========== PROBES ==========

#[tokio::test]
async fn test_describe_table() {
    let fake = FakeDynamoDb::default();

    let response = describe_table(&fake, TABLE).await.unwrap();

    assert_eq!(fake.calls(), vec![Call::DescribeTable(TABLE.to_string())]);
    assert_eq!(response.table.unwrap().table_name.as_deref(), Some(TABLE));
}

#[tokio::test]
async fn test_describe_continuous_backups() {
    let fake = FakeDynamoDb::default();

    let response = describe_continuous_backups(&fake, TABLE).await.unwrap();

    assert_eq!(
        fake.calls(),
        vec![Call::DescribeContinuousBackups(TABLE.to_string())]
    );
    assert_eq!(
        response
            .continuous_backups_description
            .unwrap()
            .continuous_backups_status,
        "ENABLED"
    );
}

#[tokio::test]
async fn test_describe_backup_returns_inner_description() {
    let fake = FakeDynamoDb::with_backup_statuses(&["AVAILABLE"]);

    let description = describe_backup(&fake, BACKUP_ARN).await.unwrap();

    assert_eq!(fake.calls(), vec![Call::DescribeBackup(BACKUP_ARN.to_string())]);
    assert_eq!(description.backup_status(), Some("AVAILABLE"));
    let value = serde_json::to_value(&description).unwrap();
    assert!(value.get("BackupDescription").is_none());
    assert_eq!(value["BackupDetails"]["BackupArn"], json!(BACKUP_ARN));
}

#[tokio::test]
async fn test_describe_probes_are_repeatable() {
    let fake = FakeDynamoDb::default();

    let first = describe_table(&fake, TABLE).await.unwrap();
    let second = describe_table(&fake, TABLE).await.unwrap();
    assert_eq!(first, second);

    let first = describe_backup(&fake, BACKUP_ARN).await.unwrap();
    let second = describe_backup(&fake, BACKUP_ARN).await.unwrap();
    assert_eq!(first, second);

    assert!(fake.calls().iter().all(|call| matches!(
        call,
        Call::DescribeTable(_) | Call::DescribeBackup(_)
    )));
}

#[tokio::test(start_paused = true)]
async fn test_provider_errors_are_reported_verbatim() {
    let message = "Requested resource not found";
    let fake = FakeDynamoDb::default();
    for operation in [
        "DeleteTable",
        "CreateBackup",
        "DescribeBackup",
        "DescribeTable",
        "DescribeContinuousBackups",
        "UpdateContinuousBackups",
    ] {
        fake.fail(operation, "ResourceNotFoundException", message);
    }
    let poll = PollSettings::default();

    let failures: Vec<ActivityFailure> = vec![
        delete_table(&fake, "MyInvalidTable", false, None, &poll)
            .await
            .unwrap_err(),
        backup_table(&fake, "MyInvalidTable", BACKUP, &poll)
            .await
            .unwrap_err(),
        set_continuous_backups(&fake, "MyInvalidTable", true)
            .await
            .unwrap_err(),
        describe_table(&fake, "MyInvalidTable").await.unwrap_err(),
        describe_continuous_backups(&fake, "MyInvalidTable")
            .await
            .unwrap_err(),
        describe_backup(&fake, "arn:invalid").await.unwrap_err(),
    ];

    for failure in failures {
        assert_eq!(failure.to_string(), message);
        assert_eq!(failure.code(), Some("ResourceNotFoundException"));
    }
}

// ========== BLOCKING FACADE ==========

#[test]
fn test_facade_validates_before_building_a_client() {
    let factory = FakeFactory::default();
    let activities = DynamoDbActivities::with_factory(factory.clone());

    let err = activities
        .delete_table(TABLE, true, None, &HashMap::new(), &HashMap::new())
        .unwrap_err();

    assert_eq!(err.message(), BACKUP_NAME_REQUIRED);
    assert_eq!(factory.built.load(Ordering::SeqCst), 0);
    assert!(factory.fake.calls().is_empty());
}

#[test]
fn test_facade_delete_with_backup_uses_configured_interval() {
    let factory = FakeFactory {
        fake: FakeDynamoDb::with_backup_statuses(&["CREATING", "CREATING", "AVAILABLE"]),
        ..Default::default()
    };
    let activities = DynamoDbActivities::with_factory(factory.clone());
    let configuration = configuration(json!({"dynamodb_backup_poll_interval": 0.01}));

    activities
        .delete_table(TABLE, true, Some(BACKUP), &configuration, &HashMap::new())
        .unwrap();

    assert_eq!(factory.built.load(Ordering::SeqCst), 1);
    assert_eq!(
        factory.fake.calls().last(),
        Some(&Call::DeleteTable(TABLE.to_string()))
    );
}

#[test]
fn test_facade_backup_timeout_from_configuration() {
    let factory = FakeFactory::default();
    let activities = DynamoDbActivities::with_factory(factory.clone());
    let configuration = configuration(json!({
        "dynamodb_backup_poll_interval": 0.01,
        "dynamodb_backup_max_attempts": 2
    }));

    let err = activities
        .backup_table(TABLE, BACKUP, &configuration, &HashMap::new())
        .unwrap_err();

    assert!(err.message().contains("after 2 attempts"));
}

#[test]
fn test_facade_huge_poll_durations_do_not_panic() {
    let factory = FakeFactory {
        fake: FakeDynamoDb::with_backup_statuses(&["AVAILABLE"]),
        ..Default::default()
    };
    let activities = DynamoDbActivities::with_factory(factory.clone());
    let configuration = configuration(json!({
        "dynamodb_backup_poll_interval": 1e19,
        "dynamodb_backup_timeout": 1e19
    }));

    activities
        .delete_table(TABLE, true, Some(BACKUP), &configuration, &HashMap::new())
        .unwrap();

    assert_eq!(
        factory.fake.calls().last(),
        Some(&Call::DeleteTable(TABLE.to_string()))
    );
}

#[test]
fn test_facade_rejects_zero_max_attempts() {
    let factory = FakeFactory::default();
    let activities = DynamoDbActivities::with_factory(factory.clone());
    let configuration = configuration(json!({"dynamodb_backup_max_attempts": 0}));

    let err = activities
        .backup_table(TABLE, BACKUP, &configuration, &HashMap::new())
        .unwrap_err();

    assert!(err.message().contains("dynamodb_backup_max_attempts"));
    assert!(factory.fake.calls().is_empty());
}

#[test]
fn test_facade_cancelled_wait_skips_delete() {
    let factory = FakeFactory::default();
    let token = CancelToken::new();
    let activities = DynamoDbActivities::with_factory(factory.clone()).with_cancel_token(token.clone());
    token.cancel();

    let err = activities
        .delete_table(TABLE, true, Some(BACKUP), &HashMap::new(), &HashMap::new())
        .unwrap_err();

    assert!(err.message().starts_with("cancelled"));
    assert_eq!(
        factory.fake.calls(),
        vec![Call::CreateBackup(TABLE.to_string(), BACKUP.to_string())]
    );
}

#[test]
fn test_facade_probes_and_toggle() {
    let factory = FakeFactory::default();
    let activities = DynamoDbActivities::with_factory(factory.clone());
    let (configuration, secrets) = (HashMap::new(), HashMap::new());

    activities
        .set_continuous_backups(TABLE, false, &configuration, &secrets)
        .unwrap();
    activities.describe_table(TABLE, &configuration, &secrets).unwrap();
    activities
        .describe_continuous_backups(TABLE, &configuration, &secrets)
        .unwrap();
    activities
        .describe_backup(BACKUP_ARN, &configuration, &secrets)
        .unwrap();

    assert_eq!(factory.built.load(Ordering::SeqCst), 4);
    assert_eq!(
        factory.fake.calls(),
        vec![
            Call::UpdateContinuousBackups(TABLE.to_string(), false),
            Call::DescribeTable(TABLE.to_string()),
            Call::DescribeContinuousBackups(TABLE.to_string()),
            Call::DescribeBackup(BACKUP_ARN.to_string()),
        ]
    );
}

#[test]
fn test_facade_rejects_bad_poll_configuration() {
    let factory = FakeFactory::default();
    let activities = DynamoDbActivities::with_factory(factory.clone());
    let configuration = configuration(json!({"dynamodb_backup_timeout": "soon"}));

    let err = activities
        .backup_table(TABLE, BACKUP, &configuration, &HashMap::new())
        .unwrap_err();

    assert!(err.message().contains("dynamodb_backup_timeout"));
    assert!(factory.fake.calls().is_empty());
}
