use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rds::error::DisplayErrorContext;
use aws_sdk_rds::operation::delete_db_instance::DeleteDbInstanceOutput;
use aws_sdk_rds::Client as RdsClient;
use lambda_runtime::Error;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::{error, info};

pub const INSTANCE_NAME_VAR: &str = "ephemeral_instance_name";

#[derive(Debug, ThisError, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub instance_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instance_name = lookup(INSTANCE_NAME_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar {
                name: INSTANCE_NAME_VAR,
            })?;

        Ok(Self { instance_name })
    }
}

/// Deletion with no final snapshot and no retained automated backups.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteInstanceRequest {
    pub db_instance_identifier: String,
    pub skip_final_snapshot: bool,
    pub delete_automated_backups: bool,
}

impl DeleteInstanceRequest {
    pub fn for_instance(instance_name: impl Into<String>) -> Self {
        Self {
            db_instance_identifier: instance_name.into(),
            skip_final_snapshot: true,
            delete_automated_backups: true,
        }
    }
}

#[async_trait]
pub trait InstanceDeletionApi: Send + Sync {
    async fn delete_instance(
        &self,
        request: DeleteInstanceRequest,
    ) -> Result<DeleteDbInstanceOutput, Error>;
}

#[async_trait]
impl InstanceDeletionApi for RdsClient {
    async fn delete_instance(
        &self,
        request: DeleteInstanceRequest,
    ) -> Result<DeleteDbInstanceOutput, Error> {
        self.delete_db_instance()
            .db_instance_identifier(request.db_instance_identifier)
            .skip_final_snapshot(request.skip_final_snapshot)
            .delete_automated_backups(request.delete_automated_backups)
            .send()
            .await
            .map_err(|e| {
                error!("DeleteDBInstance failed: {}", DisplayErrorContext(&e));
                Error::from(e)
            })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    pub db_instance_identifier: Option<String>,
    pub db_instance_status: Option<String>,
    pub db_instance_class: Option<String>,
    pub engine: Option<String>,
    pub storage_type: Option<String>,
}

impl From<&DeleteDbInstanceOutput> for Response {
    fn from(output: &DeleteDbInstanceOutput) -> Self {
        match output.db_instance() {
            Some(instance) => Self {
                db_instance_identifier: instance.db_instance_identifier().map(str::to_string),
                db_instance_status: instance.db_instance_status().map(str::to_string),
                db_instance_class: instance.db_instance_class().map(str::to_string),
                engine: instance.engine().map(str::to_string),
                storage_type: instance.storage_type().map(str::to_string),
            },
            None => Self {
                db_instance_identifier: None,
                db_instance_status: None,
                db_instance_class: None,
                engine: None,
                storage_type: None,
            },
        }
    }
}

pub struct InstanceDestroyerService<C> {
    client: C,
    config: Config,
}

impl InstanceDestroyerService<RdsClient> {
    pub async fn new(config: Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::with_client(RdsClient::new(&sdk_config), config)
    }
}

impl<C: InstanceDeletionApi> InstanceDestroyerService<C> {
    pub fn with_client(client: C, config: Config) -> Self {
        Self { client, config }
    }

    pub async fn run(&self) -> Result<DeleteDbInstanceOutput, Error> {
        let request = DeleteInstanceRequest::for_instance(&self.config.instance_name);

        info!(
            "Deleting instance {} (skip final snapshot, drop automated backups)",
            request.db_instance_identifier
        );

        let output = self.client.delete_instance(request).await?;

        info!(
            "Instance {} deletion accepted with status {}",
            self.config.instance_name,
            output
                .db_instance()
                .and_then(|i| i.db_instance_status())
                .unwrap_or("unknown")
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_rds::types::DbInstance;

    #[test]
    fn test_delete_request_flags() {
        let request = DeleteInstanceRequest::for_instance("eph-1");
        assert_eq!(request.db_instance_identifier, "eph-1");
        assert!(request.skip_final_snapshot);
        assert!(request.delete_automated_backups);
    }

    #[test]
    fn test_config_from_lookup() {
        let config =
            Config::from_lookup(|name| (name == "ephemeral_instance_name").then(|| "eph-1".into()))
                .unwrap();
        assert_eq!(config.instance_name, "eph-1");

        let err = Config::from_lookup(|_| None).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingEnvVar {
                name: "ephemeral_instance_name"
            }
        );
    }

    #[test]
    fn test_response_from_output() {
        let output = DeleteDbInstanceOutput::builder()
            .db_instance(
                DbInstance::builder()
                    .db_instance_identifier("eph-1")
                    .db_instance_status("deleting")
                    .build(),
            )
            .build();

        let response = Response::from(&output);
        assert_eq!(response.db_instance_identifier.as_deref(), Some("eph-1"));
        assert_eq!(response.db_instance_status.as_deref(), Some("deleting"));
        assert_eq!(response.engine, None);
    }

    #[test]
    fn test_response_without_instance() {
        let response = Response::from(&DeleteDbInstanceOutput::builder().build());
        assert_eq!(response.db_instance_identifier, None);
        assert_eq!(response.db_instance_status, None);
    }
}
