use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::operation::delete_db_snapshot::DeleteDbSnapshotOutput;
use aws_sdk_rds::Client as RdsClient;
use lambda_runtime::Error;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::{error, info};

pub const SNAPSHOT_NAME_VAR: &str = "snapshot_name";

#[derive(Debug, ThisError, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub snapshot_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(SNAPSHOT_NAME_VAR) {
            Some(snapshot_name) if !snapshot_name.trim().is_empty() => Ok(Self { snapshot_name }),
            _ => Err(ConfigError::MissingEnvVar {
                name: SNAPSHOT_NAME_VAR,
            }),
        }
    }
}

#[async_trait]
pub trait SnapshotDeletionApi: Send + Sync {
    async fn delete_snapshot(
        &self,
        db_snapshot_identifier: String,
    ) -> Result<DeleteDbSnapshotOutput, Error>;
}

#[async_trait]
impl SnapshotDeletionApi for RdsClient {
    async fn delete_snapshot(
        &self,
        db_snapshot_identifier: String,
    ) -> Result<DeleteDbSnapshotOutput, Error> {
        match self
            .delete_db_snapshot()
            .db_snapshot_identifier(db_snapshot_identifier)
            .send()
            .await
        {
            Ok(output) => Ok(output),
            Err(e) => {
                error!("DeleteDBSnapshot failed: {}", DisplayErrorContext(&e));
                Err(Error::from(e))
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub db_snapshot_identifier: Option<String>,
    pub db_instance_identifier: Option<String>,
    pub status: Option<String>,
    pub snapshot_type: Option<String>,
}

impl From<&DeleteDbSnapshotOutput> for Response {
    fn from(output: &DeleteDbSnapshotOutput) -> Self {
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

pub struct SnapshotDestroyerService<C> {
    client: C,
    config: Config,
}

impl SnapshotDestroyerService<RdsClient> {
    pub async fn new(config: Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::with_client(RdsClient::new(&sdk_config), config)
    }
}

impl<C: SnapshotDeletionApi> SnapshotDestroyerService<C> {
    pub fn with_client(client: C, config: Config) -> Self {
        Self { client, config }
    }

    pub async fn run(&self) -> Result<DeleteDbSnapshotOutput, Error> {
        info!("Deleting snapshot {}", self.config.snapshot_name);

        let output = self
            .client
            .delete_snapshot(self.config.snapshot_name.clone())
            .await?;

        info!(
            "Snapshot {} deletion accepted with status {}",
            self.config.snapshot_name,
            output
                .db_snapshot()
                .and_then(|s| s.status())
                .unwrap_or("unknown")
        );

        Ok(output)
    }
}
