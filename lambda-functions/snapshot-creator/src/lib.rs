use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::operation::create_db_snapshot::CreateDbSnapshotOutput;
use aws_sdk_rds::types::Tag;
use aws_sdk_rds::Client as RdsClient;
use lambda_runtime::Error;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

mod config;

pub use config::{Config, ConfigError, SNAPSHOT_NAME_VAR, SOURCE_INSTANCE_VAR};

/// Labels every snapshot this function creates, so cleanup automation can find it.
pub const SNAPSHOT_TAGS: [(&str, &str); 4] = [
    ("Env", "Ephemeral"),
    ("Service", "Postgres"),
    ("Workspace", "Ephemeral"),
    ("Automation", "true"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSnapshotRequest {
    pub db_snapshot_identifier: String,
    pub db_instance_identifier: String,
    pub tags: Vec<Tag>,
}

impl CreateSnapshotRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            db_snapshot_identifier: config.snapshot_name.clone(),
            db_instance_identifier: config.source_instance.clone(),
            tags: snapshot_tags(),
        }
    }
}

pub fn snapshot_tags() -> Vec<Tag> {
    SNAPSHOT_TAGS
        .iter()
        .map(|(key, value)| Tag::builder().key(*key).value(*value).build())
        .collect()
}

/// The single control-plane call this function makes.
#[async_trait]
pub trait SnapshotCreatorApi: Send + Sync {
    async fn create_snapshot(
        &self,
        request: CreateSnapshotRequest,
    ) -> Result<CreateDbSnapshotOutput, Error>;
}

#[async_trait]
impl SnapshotCreatorApi for RdsClient {
    async fn create_snapshot(
        &self,
        request: CreateSnapshotRequest,
    ) -> Result<CreateDbSnapshotOutput, Error> {
        match self
            .create_db_snapshot()
            .db_snapshot_identifier(request.db_snapshot_identifier)
            .db_instance_identifier(request.db_instance_identifier)
            .set_tags(Some(request.tags))
            .send()
            .await
        {
            Ok(output) => Ok(output),
            Err(e) => {
                error!("CreateDBSnapshot failed: {}", DisplayErrorContext(&e));
                Err(Error::from(e))
            }
        }
    }
}

/// Lambda response, a serializable view of the control-plane acknowledgement.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub db_snapshot_identifier: Option<String>,
    pub db_instance_identifier: Option<String>,
    pub status: Option<String>,
    pub snapshot_type: Option<String>,
}

impl From<&CreateDbSnapshotOutput> for Response {
    fn from(output: &CreateDbSnapshotOutput) -> Self {
        let snapshot = output.db_snapshot();
        Self {
            db_snapshot_identifier: snapshot
                .and_then(|s| s.db_snapshot_identifier())
                .map(str::to_string),
            db_instance_identifier: snapshot
                .and_then(|s| s.db_instance_identifier())
                .map(str::to_string),
            status: snapshot.and_then(|s| s.status()).map(str::to_string),
            snapshot_type: snapshot.and_then(|s| s.snapshot_type()).map(str::to_string),
        }
    }
}

pub struct SnapshotCreatorService<C> {
    client: C,
    config: Config,
}

impl SnapshotCreatorService<RdsClient> {
    pub async fn new(config: Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::with_client(RdsClient::new(&sdk_config), config)
    }
}

impl<C: SnapshotCreatorApi> SnapshotCreatorService<C> {
    pub fn with_client(client: C, config: Config) -> Self {
        Self { client, config }
    }

    /// Requests the snapshot and returns the service acknowledgement as-is.
    ///
    /// Snapshot creation continues asynchronously after this returns.
    pub async fn run(&self) -> Result<CreateDbSnapshotOutput, Error> {
        let request = CreateSnapshotRequest::from_config(&self.config);

        info!(
            "Creating snapshot {} of instance {}",
            request.db_snapshot_identifier, request.db_instance_identifier
        );

        let output = self.client.create_snapshot(request).await?;

        info!(
            "Snapshot {} accepted with status {}",
            self.config.snapshot_name,
            output
                .db_snapshot()
                .and_then(|s| s.status())
                .unwrap_or("unknown")
        );

        Ok(output)
    }
}
